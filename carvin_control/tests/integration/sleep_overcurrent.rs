//! Integration test: sleep timeout and spindle overcurrent.

use carvin_common::control::config::ControllerConfig;
use carvin_common::control::flags::{ExecFlags, SuspendFlags};
use carvin_common::control::report::Feedback;
use carvin_common::control::state::MachineState;
use carvin_control::scheduler::TickOutcome;
use carvin_control::sim::{SimConfig, SimEvent, drive};

use super::{parks, rig, rig_with, start_cycle};


// ── Sleep ───────────────────────────────────────────────────────────

#[test]
fn sleep_timeout_parks_and_only_reset_leaves() {
    let (mut c, mut sim) = rig();
    sim.schedule(1, SimEvent::SleepTimeout);
    drive(&mut c, &mut sim, 4);

    assert_eq!(c.state(), MachineState::Sleep);
    assert!(sim.feedback().contains(&Feedback::SleepMode));
    assert!(c.suspend_flags().contains(SuspendFlags::RETRACT_COMPLETE));
    assert_eq!(sim.position(), [0.0, 0.0, -5.0]);
    assert_eq!(parks(&sim).len(), 2);

    c.handle().raise_event(ExecFlags::CYCLE_START);
    drive(&mut c, &mut sim, 4);
    assert_eq!(c.state(), MachineState::Sleep);

    c.handle().raise_event(ExecFlags::RESET);
    assert_eq!(c.tick(&mut sim), TickOutcome::Aborted);
    c.reinitialize(&mut sim);
    assert_eq!(c.state(), MachineState::Alarm);
}

#[test]
fn sleep_timeout_ignored_when_disabled() {
    let mut config = ControllerConfig::default();
    config.sleep.enabled = false;
    let (mut c, mut sim) = rig_with(config, SimConfig::default());
    sim.schedule(1, SimEvent::SleepTimeout);
    drive(&mut c, &mut sim, 4);
    assert_eq!(c.state(), MachineState::Idle);
    assert!(!sim.feedback().contains(&Feedback::SleepMode));
}

#[test]
fn sleep_timeout_follows_feature_toggle() {
    let (mut c, mut sim) = rig();
    c.toggle_door_feature(&mut sim).unwrap();
    assert!(sim.feedback().contains(&Feedback::Features { door: false, sleep: false }));

    sim.apply(SimEvent::SleepTimeout);
    drive(&mut c, &mut sim, 4);
    assert_eq!(c.state(), MachineState::Idle);

    c.toggle_door_feature(&mut sim).unwrap();
    drive(&mut c, &mut sim, 4);
    assert_eq!(c.state(), MachineState::Sleep);
}

#[test]
fn sleep_timeout_not_polled_while_cutting() {
    let (mut c, mut sim) = rig();
    start_cycle(&mut c, &mut sim);
    sim.apply(SimEvent::SleepTimeout);
    drive(&mut c, &mut sim, 4);
    assert_eq!(c.state(), MachineState::Cycle);
}

// ── Overcurrent ─────────────────────────────────────────────────────

#[test]
fn overcurrent_opens_door_state_once() {
    let (mut c, mut sim) = rig();
    start_cycle(&mut c, &mut sim);

    sim.apply(SimEvent::SpindleCurrent(Some(800)));
    c.tick(&mut sim);
    assert_eq!(c.state(), MachineState::SafetyDoor);
    assert_eq!(
        sim.feedback()
            .iter()
            .filter(|f| matches!(f, Feedback::OverCurrent { .. }))
            .count(),
        1
    );
    assert!(sim.feedback().contains(&Feedback::OverCurrent { counts: 800 }));

    // Not re-checked while the door state is active.
    drive(&mut c, &mut sim, 10);
    assert_eq!(
        sim.feedback()
            .iter()
            .filter(|f| matches!(f, Feedback::OverCurrent { .. }))
            .count(),
        1
    );
}

#[test]
fn current_below_threshold_keeps_cutting() {
    let (mut c, mut sim) = rig();
    start_cycle(&mut c, &mut sim);
    sim.apply(SimEvent::SpindleCurrent(Some(600)));
    drive(&mut c, &mut sim, 5);
    assert_eq!(c.state(), MachineState::Cycle);
}

#[test]
fn lowered_setting_takes_effect_immediately() {
    let (mut c, mut sim) = rig();
    start_cycle(&mut c, &mut sim);
    sim.apply(SimEvent::SpindleCurrent(Some(500)));
    c.tick(&mut sim);
    assert_eq!(c.state(), MachineState::Cycle);

    sim.config_mut().current_limit_amps = 1.0;
    c.tick(&mut sim);
    assert_eq!(c.state(), MachineState::SafetyDoor);
    assert_eq!(c.scheduler().overcurrent().limit_amps(), 1.0);
}

#[test]
fn monitor_disabled_in_config() {
    let mut config = ControllerConfig::default();
    config.spindle_current.enabled = false;
    let (mut c, mut sim) = rig_with(config, SimConfig::default());
    start_cycle(&mut c, &mut sim);
    sim.apply(SimEvent::SpindleCurrent(Some(1_000)));
    drive(&mut c, &mut sim, 5);
    assert_eq!(c.state(), MachineState::Cycle);
}
