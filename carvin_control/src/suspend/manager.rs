//! Suspend manager.
//!
//! Re-entered by the controller while any suspension is active. Each call
//! performs at most one phase and returns, so a single call blocks only as
//! long as one parking move or settle delay. The manager flips suspend
//! flags and raises cycle start; the scheduler performs every state change.
//!
//! Phases (door and sleep only; a plain feed hold just waits):
//!
//! 1. **Retract**: snapshot the restore point, slow pull-out to the
//!    waypoint, de-energize spindle and coolant, fast move to the park
//!    target. Without parking, de-energize in place.
//! 2. **Await door close**: one-shot resume cue when the door closes.
//! 3. **Restore**: fast return to the waypoint, re-energize spindle and
//!    coolant with their settle delays, slow plunge to the restore point,
//!    then raise cycle start. A re-opened door abandons the restore before
//!    the next energize call and the retract runs again.

use carvin_common::control::config::{ParkingConfig, SafetyDoorConfig};
use carvin_common::control::flags::{ExecFlags, SuspendFlags};
use carvin_common::control::report::Feedback;
use carvin_common::control::state::{CoolantState, MachineState, SpindleState};
use tracing::{debug, info};

use crate::hal::Machine;
use crate::scheduler::{DelayOutcome, Scheduler};

use super::parking::ParkingContext;

/// Phase executed by one [`SuspendManager::step`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SuspendPhase {
    /// Nothing to do this iteration.
    Idle,
    Retract,
    /// Waiting for the door to close or for the operator to resume.
    AwaitDoorClose,
    Restore,
}

/// Retract/restore sequencer.
#[derive(Debug, Clone)]
pub struct SuspendManager {
    parking: ParkingConfig,
    door: SafetyDoorConfig,
    context: Option<ParkingContext>,
}

impl SuspendManager {
    pub fn new(parking: ParkingConfig, door: SafetyDoorConfig) -> Self {
        Self {
            parking,
            door,
            context: None,
        }
    }

    /// Active parking context, if a retract has begun.
    #[inline]
    pub fn context(&self) -> Option<&ParkingContext> {
        self.context.as_ref()
    }

    /// Drop the parking context (suspension over or machine reset).
    #[inline]
    pub fn release(&mut self) {
        if self.context.take().is_some() {
            debug!("parking context released");
        }
    }

    /// Run at most one phase.
    pub fn step<M: Machine>(&mut self, sched: &mut Scheduler, m: &mut M) -> SuspendPhase {
        let state = sched.state();
        let flags = sched.suspend_flags();

        if !matches!(state, MachineState::SafetyDoor | MachineState::Sleep)
            || !flags.contains(SuspendFlags::HOLD_COMPLETE)
        {
            return SuspendPhase::Idle;
        }

        if !flags.contains(SuspendFlags::RETRACT_COMPLETE) {
            self.retract(sched, m);
            return SuspendPhase::Retract;
        }

        // Sleep never resumes; only a reset leaves it.
        if state == MachineState::Sleep {
            return SuspendPhase::Idle;
        }

        if flags.contains(SuspendFlags::INITIATE_RESTORE)
            && !flags.contains(SuspendFlags::RESTORE_COMPLETE)
        {
            self.restore(sched, m);
            return SuspendPhase::Restore;
        }

        if flags.contains(SuspendFlags::RESTORE_COMPLETE) {
            return SuspendPhase::Idle;
        }

        if flags.contains(SuspendFlags::SAFETY_DOOR_AJAR) && !sched.door_ajar(m) {
            info!("door closed, ready to resume");
            m.report_feedback(Feedback::ResumeReady);
            sched.remove_suspend(SuspendFlags::SAFETY_DOOR_AJAR);
        }
        SuspendPhase::AwaitDoorClose
    }

    fn parking_allowed<M: Machine>(&self, m: &M) -> bool {
        self.parking.enabled && m.homing_enabled()
    }

    /// Aborted, alarmed, or otherwise no longer in a parking state.
    fn interrupted(sched: &Scheduler) -> bool {
        sched.is_aborted()
            || !matches!(
                sched.state(),
                MachineState::SafetyDoor | MachineState::Sleep
            )
    }

    /// Restore steps may run only while the door stays shut.
    fn restore_blocked(sched: &Scheduler) -> bool {
        sched.is_aborted()
            || sched.state() != MachineState::SafetyDoor
            || sched
                .suspend_flags()
                .intersects(SuspendFlags::BLOCKS_ENERGIZE)
    }

    // ─── Retract ────────────────────────────────────────────────────

    fn retract<M: Machine>(&mut self, sched: &mut Scheduler, m: &mut M) {
        let cfg = self.parking;
        let current = m.machine_position();
        let restart = sched
            .suspend_flags()
            .contains(SuspendFlags::RESTART_RETRACT);

        let mut ctx = match self.context {
            Some(ctx) if restart => ctx.resume_from(current),
            _ => ParkingContext::capture(current, &cfg),
        };
        self.context = Some(ctx);
        info!(
            state = sched.state().name(),
            restart,
            axis = ctx.parked_axis(&cfg),
            waypoint = ctx.retract_waypoint,
            "retract"
        );

        if self.parking_allowed(m) && ctx.parked_axis(&cfg) < cfg.target {
            if ctx.parked_axis(&cfg) < ctx.retract_waypoint {
                ctx.set_parked_axis(&cfg, ctx.retract_waypoint);
                self.context = Some(ctx);
                sched.park(m, &ctx.parking_target, cfg.pullout_rate);
                if Self::interrupted(sched) {
                    return;
                }
            }

            m.spindle_stop();
            m.coolant_stop();

            if ctx.parked_axis(&cfg) < cfg.target {
                ctx.set_parked_axis(&cfg, cfg.target);
                self.context = Some(ctx);
                sched.park(m, &ctx.parking_target, cfg.rate);
                if Self::interrupted(sched) {
                    return;
                }
            }
        } else {
            m.spindle_stop();
            m.coolant_stop();
        }

        sched.remove_suspend(SuspendFlags::RESTART_RETRACT);
        sched.insert_suspend(SuspendFlags::RETRACT_COMPLETE);
        debug!("retract complete");
    }

    // ─── Restore ────────────────────────────────────────────────────

    fn restore<M: Machine>(&mut self, sched: &mut Scheduler, m: &mut M) {
        let cfg = self.parking;
        let mut ctx = match self.context {
            Some(ctx) => ctx,
            None => ParkingContext::capture(m.machine_position(), &cfg),
        };
        let parking = self.parking_allowed(m);
        info!(parking, "restore");

        if parking && !Self::restore_blocked(sched) && ctx.parked_axis(&cfg) <= cfg.target {
            ctx.set_parked_axis(&cfg, ctx.retract_waypoint);
            self.context = Some(ctx);
            sched.park(m, &ctx.parking_target, cfg.rate);
        }

        if !Self::restore_blocked(sched) {
            let (spindle, rpm) = m.modal_spindle();
            if spindle != SpindleState::Disabled {
                m.spindle_set_state(spindle, rpm);
                if sched.door_delay(m, self.door.spindle_delay_s) == DelayOutcome::Aborted {
                    return;
                }
            }
        }

        if !Self::restore_blocked(sched) {
            let coolant = m.modal_coolant();
            if coolant != CoolantState::Disabled {
                m.coolant_set_state(coolant);
                if sched.door_delay(m, self.door.coolant_delay_s) == DelayOutcome::Aborted {
                    return;
                }
            }
        }

        if parking && !Self::restore_blocked(sched) && ctx.parking_target != ctx.restore_target {
            ctx.parking_target = ctx.restore_target;
            self.context = Some(ctx);
            sched.park(m, &ctx.restore_target, cfg.pullout_rate);
        }

        if Self::restore_blocked(sched) {
            debug!(flags = ?sched.suspend_flags(), "restore abandoned");
            return;
        }

        sched.insert_suspend(SuspendFlags::RESTORE_COMPLETE);
        self.context = None;
        sched.handle().raise_event(ExecFlags::CYCLE_START);
        info!("restore complete");
    }
}
