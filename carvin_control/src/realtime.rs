//! Realtime event flags.
//!
//! Pending requests and alarms are written from any context (pin-change
//! handler, serial receive path, stepper, timers) and drained only by the
//! scheduler. Every operation is a single atomic read-modify-write, so a set
//! racing a clear of a disjoint bit is never lost and a drain leaves bits
//! raised after it for the next tick.

use std::marker::PhantomData;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};

use bitflags::Flags;
use carvin_common::control::flags::{AlarmFlags, ControlPins, ExecFlags};
use carvin_common::control::state::MachineState;
use static_assertions::assert_impl_all;

use crate::input::ControlPanel;

// ─── Atomic Flag Word ───────────────────────────────────────────────

/// A `bitflags` type stored in an `AtomicU8`.
pub struct AtomicFlags<F> {
    bits: AtomicU8,
    _marker: PhantomData<fn() -> F>,
}

impl<F: Flags<Bits = u8>> AtomicFlags<F> {
    pub const fn new() -> Self {
        Self {
            bits: AtomicU8::new(0),
            _marker: PhantomData,
        }
    }

    /// Raise `mask`.
    #[inline]
    pub fn set(&self, mask: F) {
        self.bits.fetch_or(mask.bits(), Ordering::AcqRel);
    }

    /// Clear `mask`, leaving every other bit untouched.
    #[inline]
    pub fn clear(&self, mask: F) {
        self.bits.fetch_and(!mask.bits(), Ordering::AcqRel);
    }

    /// Snapshot without consuming anything.
    #[inline]
    pub fn load(&self) -> F {
        F::from_bits_truncate(self.bits.load(Ordering::Acquire))
    }

    /// Read and clear exactly the bits of `mask` that were set.
    #[inline]
    pub fn drain_and_clear(&self, mask: F) -> F {
        let previous = self.bits.fetch_and(!mask.bits(), Ordering::AcqRel);
        F::from_bits_truncate(previous & mask.bits())
    }

    /// Drain every bit.
    #[inline]
    pub fn drain(&self) -> F {
        self.drain_and_clear(F::all())
    }
}

impl<F: Flags<Bits = u8>> Default for AtomicFlags<F> {
    fn default() -> Self {
        Self::new()
    }
}

impl<F: Flags<Bits = u8> + std::fmt::Debug> std::fmt::Debug for AtomicFlags<F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("AtomicFlags").field(&self.load()).finish()
    }
}

/// The two pending-request words consumed by the scheduler.
#[derive(Debug, Default)]
pub struct RealtimeFlags {
    pub exec: AtomicFlags<ExecFlags>,
    pub alarm: AtomicFlags<AlarmFlags>,
}

// ─── Producer Handle ────────────────────────────────────────────────

struct Shared {
    flags: RealtimeFlags,
    panel: Box<dyn ControlPanel>,
    door_feature: AtomicBool,
    sleep_feature: AtomicBool,
}

/// Cloneable handle shared by every realtime producer and the scheduler.
#[derive(Clone)]
pub struct RealtimeHandle {
    shared: Arc<Shared>,
}

impl RealtimeHandle {
    /// `door_feature = false` masks the door switch out of every pin snapshot;
    /// `sleep_feature = false` stops the sleep timeout from being honoured.
    /// Both can be flipped later with [`Self::toggle_features`].
    pub fn new(panel: Box<dyn ControlPanel>, door_feature: bool, sleep_feature: bool) -> Self {
        Self {
            shared: Arc::new(Shared {
                flags: RealtimeFlags::default(),
                panel,
                door_feature: AtomicBool::new(door_feature),
                sleep_feature: AtomicBool::new(sleep_feature),
            }),
        }
    }

    /// Request a realtime event. Callable from any context.
    #[inline]
    pub fn raise_event(&self, mask: ExecFlags) {
        self.shared.flags.exec.set(mask);
    }

    /// Request an alarm. Callable from any context.
    #[inline]
    pub fn raise_alarm(&self, mask: AlarmFlags) {
        self.shared.flags.alarm.set(mask);
    }

    /// Raw control-pin change notification.
    pub fn pin_changed(&self, pins: ControlPins) {
        let events = self.shared.panel.pin_changed(self.mask_pins(pins));
        if !events.is_empty() {
            self.raise_event(events);
        }
    }

    /// Per-tick debounce service; runs on the scheduler.
    pub(crate) fn poll_panel(&self, state: MachineState, pins: ControlPins) {
        let events = self.shared.panel.poll(state, self.mask_pins(pins));
        if !events.is_empty() {
            tracing::debug!(?events, state = state.name(), "control button dispatch");
            self.raise_event(events);
        }
    }

    #[inline]
    pub fn flags(&self) -> &RealtimeFlags {
        &self.shared.flags
    }

    /// Pending events, not consumed.
    #[inline]
    pub fn pending_events(&self) -> ExecFlags {
        self.shared.flags.exec.load()
    }

    /// Pending alarms, not consumed.
    #[inline]
    pub fn pending_alarms(&self) -> AlarmFlags {
        self.shared.flags.alarm.load()
    }

    #[inline]
    pub fn door_feature(&self) -> bool {
        self.shared.door_feature.load(Ordering::Acquire)
    }

    #[inline]
    pub fn sleep_feature(&self) -> bool {
        self.shared.sleep_feature.load(Ordering::Acquire)
    }

    /// Flip the door interlock and the sleep timeout together.
    /// Returns the new `(door, sleep)` values.
    pub fn toggle_features(&self) -> (bool, bool) {
        let door = !self.shared.door_feature.fetch_xor(true, Ordering::AcqRel);
        let sleep = !self.shared.sleep_feature.fetch_xor(true, Ordering::AcqRel);
        (door, sleep)
    }

    #[inline]
    fn mask_pins(&self, pins: ControlPins) -> ControlPins {
        if self.door_feature() {
            pins
        } else {
            pins - ControlPins::SAFETY_DOOR
        }
    }
}

impl std::fmt::Debug for RealtimeHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RealtimeHandle")
            .field("flags", &self.shared.flags)
            .field("door_feature", &self.door_feature())
            .field("sleep_feature", &self.sleep_feature())
            .finish()
    }
}

assert_impl_all!(AtomicFlags<ExecFlags>: Send, Sync);
assert_impl_all!(RealtimeHandle: Send, Sync, Clone);
