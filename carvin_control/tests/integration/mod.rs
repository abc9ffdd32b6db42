//! Shared rigs for the integration tests.

mod alarms;
mod debounce;
mod door;
mod scenarios;
mod sleep_overcurrent;

use carvin_common::control::config::ControllerConfig;
use carvin_common::control::flags::ExecFlags;
use carvin_common::control::state::{MachineState, Position};
use carvin_control::controller::Controller;
use carvin_control::scheduler::TickOutcome;
use carvin_control::sim::{SimCall, SimConfig, SimMachine};

pub fn rig() -> (Controller, SimMachine) {
    rig_with(ControllerConfig::default(), SimConfig::default())
}

pub fn rig_with(config: ControllerConfig, sim_config: SimConfig) -> (Controller, SimMachine) {
    let controller = Controller::new(config).unwrap();
    let sim = SimMachine::new(sim_config, controller.handle().clone());
    (controller, sim)
}

/// Queue one long block at the current position and start it.
pub fn start_cycle(c: &mut Controller, sim: &mut SimMachine) {
    let mut target = sim.position();
    target[0] += 10.0;
    sim.queue_block(target).unwrap();
    c.handle().raise_event(ExecFlags::CYCLE_START);
    assert_eq!(c.tick(sim), TickOutcome::Running);
    assert_eq!(c.state(), MachineState::Cycle);
}

/// Tick until `done` holds, failing after `limit` ticks.
pub fn tick_until(
    c: &mut Controller,
    sim: &mut SimMachine,
    limit: usize,
    done: impl Fn(&Controller) -> bool,
) {
    use carvin_control::hal::Clock;

    for _ in 0..limit {
        if done(c) {
            return;
        }
        c.tick(sim);
        sim.wait_tick();
    }
    assert!(done(c), "condition not reached within {limit} ticks");
}

/// Parking moves as (target, rate, execute_park).
pub fn parks(sim: &SimMachine) -> Vec<(Position, f64, bool)> {
    sim.calls()
        .filter_map(|call| match *call {
            SimCall::Park {
                target,
                rate,
                execute_park,
            } => Some((target, rate, execute_park)),
            _ => None,
        })
        .collect()
}

/// Index of the first recorded call matching `pred`.
pub fn position_of(sim: &SimMachine, pred: impl Fn(&SimCall) -> bool) -> Option<usize> {
    sim.calls().position(pred)
}
