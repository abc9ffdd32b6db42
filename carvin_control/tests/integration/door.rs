//! Integration test: safety door edge cases.
//!
//! Re-opened door during restore, door feature disabled, parking
//! unavailable, resume with the front button.

use carvin_common::control::config::ControllerConfig;
use carvin_common::control::flags::{ExecFlags, SuspendFlags};
use carvin_common::control::report::Feedback;
use carvin_common::control::state::{MachineState, SpindleState};
use carvin_control::hal::Clock;
use carvin_control::scheduler::TickOutcome;
use carvin_control::sim::{SimCall, SimConfig, SimEvent, drive};

use super::{parks, rig, rig_with, start_cycle, tick_until};

fn is_energize(call: &SimCall) -> bool {
    matches!(call, SimCall::SpindleOn { .. } | SimCall::CoolantOn { .. })
}

#[test]
fn reopened_door_during_restore_never_energizes_with_door_open() {
    let (mut c, mut sim) = rig();
    start_cycle(&mut c, &mut sim);
    sim.apply(SimEvent::OpenDoor);
    drive(&mut c, &mut sim, 10);
    sim.apply(SimEvent::CloseDoor);
    c.tick(&mut sim);

    // Door opens again 100 ticks into the spindle settle delay.
    sim.schedule(sim.tick() + 100, SimEvent::OpenDoor);
    c.handle().raise_event(ExecFlags::CYCLE_START);
    assert_eq!(c.tick(&mut sim), TickOutcome::Suspended);

    let flags = c.suspend_flags();
    assert!(flags.contains(SuspendFlags::RESTART_RETRACT));
    assert!(flags.contains(SuspendFlags::SAFETY_DOOR_AJAR));
    assert!(!flags.intersects(SuspendFlags::RESTORE_PHASE));
    assert!(
        sim.log()
            .iter()
            .all(|e| !(e.door_open && is_energize(&e.call)))
    );
    assert!(!sim.calls().any(|call| matches!(call, SimCall::CoolantOn { .. })));

    // The retract runs again from the waypoint, keeping the restore point.
    drive(&mut c, &mut sim, 3);
    let flags = c.suspend_flags();
    assert!(flags.contains(SuspendFlags::RETRACT_COMPLETE));
    assert!(!flags.contains(SuspendFlags::RESTART_RETRACT));
    assert_eq!(sim.position(), [0.0, 0.0, -5.0]);
    assert_eq!(sim.spindle_output().0, SpindleState::Disabled);
    assert_eq!(
        c.parking_context().unwrap().restore_target,
        [0.0, 0.0, -20.0]
    );
    assert_eq!(c.state(), MachineState::SafetyDoor);
}

#[test]
fn feed_hold_during_restore_keeps_machine_parked() {
    let (mut c, mut sim) = rig();
    start_cycle(&mut c, &mut sim);
    sim.apply(SimEvent::OpenDoor);
    drive(&mut c, &mut sim, 10);
    sim.apply(SimEvent::CloseDoor);
    c.tick(&mut sim);

    // Operator holds 100 ticks into the spindle settle delay.
    sim.schedule(sim.tick() + 100, SimEvent::Raise(ExecFlags::FEED_HOLD));
    c.handle().raise_event(ExecFlags::CYCLE_START);
    assert_eq!(c.tick(&mut sim), TickOutcome::Suspended);

    let flags = c.suspend_flags();
    assert_eq!(c.state(), MachineState::SafetyDoor);
    assert!(flags.contains(SuspendFlags::RESTART_RETRACT));
    assert!(!flags.intersects(SuspendFlags::RESTORE_PHASE));
    assert!(!sim.calls().any(|call| matches!(call, SimCall::CoolantOn { .. })));

    drive(&mut c, &mut sim, 3);
    assert_eq!(c.state(), MachineState::SafetyDoor);
    assert!(c.suspend_flags().contains(SuspendFlags::RETRACT_COMPLETE));
    assert_eq!(sim.position(), [0.0, 0.0, -5.0]);
    assert_eq!(sim.spindle_output().0, SpindleState::Disabled);
    assert!(!sim.is_executing());

    // A fresh cycle start runs the restore again and resumes.
    c.handle().raise_event(ExecFlags::CYCLE_START);
    tick_until(&mut c, &mut sim, 40, |c| c.state() == MachineState::Cycle);
    assert_eq!(sim.position(), [0.0, 0.0, -20.0]);
}

#[test]
fn cycle_start_ignored_while_door_open() {
    let (mut c, mut sim) = rig();
    start_cycle(&mut c, &mut sim);
    sim.apply(SimEvent::OpenDoor);
    drive(&mut c, &mut sim, 10);

    c.handle().raise_event(ExecFlags::CYCLE_START);
    drive(&mut c, &mut sim, 5);
    assert!(!c.suspend_flags().contains(SuspendFlags::INITIATE_RESTORE));
    assert!(!sim.calls().any(is_energize));
}

#[test]
fn front_button_resumes_after_door_closes() {
    let (mut c, mut sim) = rig();
    start_cycle(&mut c, &mut sim);
    sim.apply(SimEvent::OpenDoor);
    drive(&mut c, &mut sim, 10);
    sim.apply(SimEvent::CloseDoor);
    drive(&mut c, &mut sim, 2);

    sim.apply(SimEvent::PressButton);
    tick_until(&mut c, &mut sim, 40, |c| c.state() == MachineState::Cycle);
    sim.apply(SimEvent::ReleaseButton);
    assert_eq!(sim.position(), [0.0, 0.0, -20.0]);
    assert!(sim.feedback().contains(&Feedback::ResumeReady));

    // Releasing the button must not open the door state again.
    drive(&mut c, &mut sim, 15);
    assert_ne!(c.state(), MachineState::SafetyDoor);
}

#[test]
fn door_feature_disabled_ignores_switch() {
    let mut config = ControllerConfig::default();
    config.safety_door.door_feature = false;
    let (mut c, mut sim) = rig_with(config, SimConfig::default());
    start_cycle(&mut c, &mut sim);

    sim.apply(SimEvent::OpenDoor);
    drive(&mut c, &mut sim, 12);
    assert_eq!(c.state(), MachineState::Cycle);
    assert!(!c.scheduler().door_ajar(&sim));
}

#[test]
fn homing_disabled_retracts_in_place() {
    let sim_config = SimConfig {
        homing_enabled: false,
        ..SimConfig::default()
    };
    let (mut c, mut sim) = rig_with(ControllerConfig::default(), sim_config);
    start_cycle(&mut c, &mut sim);
    sim.apply(SimEvent::OpenDoor);
    drive(&mut c, &mut sim, 10);

    assert!(c.suspend_flags().contains(SuspendFlags::RETRACT_COMPLETE));
    assert!(parks(&sim).is_empty());
    assert!(sim.calls().any(|call| *call == SimCall::SpindleStop));
    assert!(sim.calls().any(|call| *call == SimCall::CoolantStop));
    assert_eq!(sim.position(), [0.0, 0.0, -20.0]);
}

#[test]
fn above_park_target_does_not_move() {
    let sim_config = SimConfig {
        start_position: [0.0, 0.0, -3.0],
        ..SimConfig::default()
    };
    let (mut c, mut sim) = rig_with(ControllerConfig::default(), sim_config);
    start_cycle(&mut c, &mut sim);
    sim.apply(SimEvent::OpenDoor);
    drive(&mut c, &mut sim, 10);

    assert!(c.suspend_flags().contains(SuspendFlags::RETRACT_COMPLETE));
    assert!(parks(&sim).is_empty());
    assert_eq!(sim.spindle_output().0, SpindleState::Disabled);
}

#[test]
fn pullout_stops_at_target_when_close() {
    let sim_config = SimConfig {
        start_position: [0.0, 0.0, -7.0],
        ..SimConfig::default()
    };
    let (mut c, mut sim) = rig_with(ControllerConfig::default(), sim_config);
    start_cycle(&mut c, &mut sim);
    sim.apply(SimEvent::OpenDoor);
    drive(&mut c, &mut sim, 10);

    // Waypoint clamps to the target, so only the slow pull-out runs.
    assert_eq!(parks(&sim), vec![([0.0, 0.0, -5.0], 500.0, true)]);
}

#[test]
fn door_open_at_startup_parks_from_idle() {
    let (mut c, mut sim) = rig();
    sim.set_door(true);
    assert_eq!(c.startup(&mut sim), TickOutcome::Suspended);
    assert_eq!(c.state(), MachineState::SafetyDoor);
    assert!(c.suspend_flags().contains(SuspendFlags::RETRACT_COMPLETE));
    assert_eq!(sim.position(), [0.0, 0.0, -5.0]);

    sim.apply(SimEvent::CloseDoor);
    c.tick(&mut sim);
    sim.wait_tick();
    c.handle().raise_event(ExecFlags::CYCLE_START);
    c.tick(&mut sim);
    c.tick(&mut sim);
    assert_eq!(c.state(), MachineState::Idle);
    assert!(c.suspend_flags().is_empty());
    assert_eq!(sim.position(), [0.0, 0.0, -20.0]);
}
