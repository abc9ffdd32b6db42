//! Integration test: front-button debounce and panel selection.

use carvin_common::control::config::{ControllerConfig, PanelKind};
use carvin_common::control::state::MachineState;
use carvin_control::controller::Controller;
use carvin_control::sim::{SimConfig, SimEvent, SimMachine, drive};

use super::{rig, rig_with, start_cycle};

const WINDOW: usize = 8;

/// Blocks long enough that no test here finishes one.
fn long_rig() -> (Controller, SimMachine) {
    let sim_config = SimConfig {
        refills_per_block: 500,
        ..SimConfig::default()
    };
    rig_with(ControllerConfig::default(), sim_config)
}

#[test]
fn button_during_cycle_opens_door_state_after_window() {
    let (mut c, mut sim) = long_rig();
    start_cycle(&mut c, &mut sim);
    sim.apply(SimEvent::PressButton);

    for _ in 0..WINDOW - 1 {
        c.tick(&mut sim);
        assert_eq!(c.state(), MachineState::Cycle);
    }
    c.tick(&mut sim);
    assert_eq!(c.state(), MachineState::SafetyDoor);
}

#[test]
fn button_in_idle_is_ignored() {
    let (mut c, mut sim) = rig();
    sim.apply(SimEvent::PressButton);
    drive(&mut c, &mut sim, 3 * WINDOW as u64);
    assert_eq!(c.state(), MachineState::Idle);
    assert!(c.handle().pending_events().is_empty());
}

#[test]
fn short_pulse_is_filtered() {
    let (mut c, mut sim) = long_rig();
    start_cycle(&mut c, &mut sim);
    sim.apply(SimEvent::PressButton);
    drive(&mut c, &mut sim, 3);
    sim.apply(SimEvent::ReleaseButton);
    drive(&mut c, &mut sim, 2 * WINDOW as u64);
    assert_eq!(c.state(), MachineState::Cycle);
}

#[test]
fn bounce_restarts_window() {
    let (mut c, mut sim) = long_rig();
    start_cycle(&mut c, &mut sim);
    sim.apply(SimEvent::PressButton);
    drive(&mut c, &mut sim, 5);
    sim.apply(SimEvent::ReleaseButton);
    sim.apply(SimEvent::PressButton);

    for _ in 0..WINDOW - 1 {
        c.tick(&mut sim);
    }
    assert_eq!(c.state(), MachineState::Cycle);
    c.tick(&mut sim);
    assert_eq!(c.state(), MachineState::SafetyDoor);
}

#[test]
fn direct_panel_maps_pins_immediately() {
    let mut config = ControllerConfig::default();
    config.input.panel = PanelKind::Direct;
    let (mut c, mut sim) = rig_with(config, SimConfig::default());
    start_cycle(&mut c, &mut sim);

    // Cycle-start pin is a plain cycle start here, not a door request.
    sim.apply(SimEvent::PressButton);
    c.tick(&mut sim);
    assert_eq!(c.state(), MachineState::Cycle);

    sim.apply(SimEvent::ReleaseButton);
    sim.apply(SimEvent::OpenDoor);
    c.tick(&mut sim);
    assert_eq!(c.state(), MachineState::SafetyDoor);
}
