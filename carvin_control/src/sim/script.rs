//! Scripted simulation events and canned scenarios for the host binary.

use carvin_common::control::flags::{AlarmFlags, ExecFlags};
use carvin_common::control::state::Position;

use super::SimMachine;

/// External stimulus applied by the simulated machine.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SimEvent {
    /// Realtime command (serial or stepper producer).
    Raise(ExecFlags),
    Alarm(AlarmFlags),
    OpenDoor,
    CloseDoor,
    PressButton,
    ReleaseButton,
    /// Filtered spindle current [ADC counts].
    SpindleCurrent(Option<u16>),
    SleepTimeout,
    Queue(Position),
}

/// Canned scenario.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum Script {
    /// Run a short program with a feed hold and resume.
    #[default]
    Demo,
    /// Open the door mid-program, close it, resume with the front button.
    Door,
    /// Critical hard-limit alarm followed by a reset.
    Alarm,
}

impl Script {
    pub fn install(self, sim: &mut SimMachine) {
        match self {
            Self::Demo => {
                queue_program(sim, 6);
                sim.schedule(2, SimEvent::Raise(ExecFlags::CYCLE_START));
                sim.schedule(40, SimEvent::Raise(ExecFlags::FEED_HOLD));
                sim.schedule(120, SimEvent::Raise(ExecFlags::CYCLE_START));
                sim.schedule(200, SimEvent::Raise(ExecFlags::STATUS_REPORT));
            }
            Self::Door => {
                queue_program(sim, 8);
                sim.schedule(2, SimEvent::Raise(ExecFlags::CYCLE_START));
                sim.schedule(30, SimEvent::OpenDoor);
                sim.schedule(200, SimEvent::CloseDoor);
                sim.schedule(260, SimEvent::PressButton);
                sim.schedule(300, SimEvent::ReleaseButton);
                sim.schedule(2_000, SimEvent::Raise(ExecFlags::STATUS_REPORT));
            }
            Self::Alarm => {
                queue_program(sim, 6);
                sim.schedule(2, SimEvent::Raise(ExecFlags::CYCLE_START));
                sim.schedule(
                    40,
                    SimEvent::Alarm(AlarmFlags::HARD_LIMIT | AlarmFlags::CRITICAL_EVENT),
                );
                sim.schedule(60, SimEvent::Raise(ExecFlags::STATUS_REPORT));
                sim.schedule(100, SimEvent::Raise(ExecFlags::RESET));
            }
        }
    }
}

/// Zig-zag along X at cutting depth.
fn queue_program(sim: &mut SimMachine, blocks: usize) {
    let z = sim.position()[2];
    for i in 0..blocks {
        let x = if i % 2 == 0 { 10.0 } else { 0.0 };
        sim.schedule(1, SimEvent::Queue([x, i as f64, z]));
    }
}
