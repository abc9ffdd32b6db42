//! Integration test: alarm handling, critical halt and reset recovery.

use carvin_common::control::error::{AlarmCause, CommandError};
use carvin_common::control::flags::{AlarmFlags, ExecFlags};
use carvin_common::control::report::Feedback;
use carvin_common::control::state::MachineState;
use carvin_control::scheduler::TickOutcome;
use carvin_control::sim::{SimCall, SimEvent};

use super::{rig, start_cycle};

#[test]
fn critical_alarm_halts_until_reset() {
    let (mut c, mut sim) = rig();
    start_cycle(&mut c, &mut sim);

    let now = sim.tick();
    sim.schedule(now + 5, SimEvent::Raise(ExecFlags::STATUS_REPORT));
    sim.schedule(now + 10, SimEvent::Raise(ExecFlags::RESET));
    c.handle()
        .raise_alarm(AlarmFlags::HARD_LIMIT | AlarmFlags::CRITICAL_EVENT);

    assert_eq!(c.tick(&mut sim), TickOutcome::Aborted);
    assert!(sim.tick() >= now + 10);
    assert_eq!(sim.alarms(), &[AlarmCause::HardLimit]);
    assert!(sim.feedback().contains(&Feedback::CriticalEvent));
    assert_eq!(sim.statuses().len(), 1);
    assert_eq!(sim.statuses()[0].state, MachineState::Alarm);
    assert!(sim.calls().any(|call| *call == SimCall::SpindleStop));
    assert!(sim.calls().any(|call| *call == SimCall::CoolantStop));

    // Alarm is sticky across the reset.
    c.reinitialize(&mut sim);
    assert_eq!(c.state(), MachineState::Alarm);
    assert_eq!(sim.alarms().len(), 1);
    assert!(c.handle().pending_alarms().is_empty());

    c.startup(&mut sim);
    assert!(sim.feedback().contains(&Feedback::AlarmLock));
    assert_eq!(c.unlock(&mut sim), Ok(()));
    assert_eq!(c.state(), MachineState::Idle);
}

#[test]
fn reset_raised_before_critical_alarm_does_not_release_it() {
    let (mut c, mut sim) = rig();
    let now = sim.tick();
    sim.schedule(now + 3, SimEvent::Raise(ExecFlags::RESET));
    c.handle().raise_event(ExecFlags::RESET);
    c.handle()
        .raise_alarm(AlarmFlags::SOFT_LIMIT | AlarmFlags::CRITICAL_EVENT);

    assert_eq!(c.tick(&mut sim), TickOutcome::Aborted);
    assert!(sim.tick() >= now + 3);
}

#[test]
fn soft_limit_alarm_locks_out_motion() {
    let (mut c, mut sim) = rig();
    start_cycle(&mut c, &mut sim);

    c.handle().raise_alarm(AlarmFlags::SOFT_LIMIT);
    assert_eq!(c.tick(&mut sim), TickOutcome::Running);
    assert_eq!(c.state(), MachineState::Alarm);
    assert_eq!(sim.alarms(), &[AlarmCause::SoftLimit]);
    assert!(!c.is_suspended());
    assert_eq!(c.require_gcode_state(), Err(CommandError::AlarmLock));

    // A late cycle stop from the stepper does not clear the alarm.
    c.handle().raise_event(ExecFlags::CYCLE_STOP);
    c.tick(&mut sim);
    assert_eq!(c.state(), MachineState::Alarm);
}

#[test]
fn alarm_cause_precedence() {
    let (mut c, mut sim) = rig();
    c.handle()
        .raise_alarm(AlarmFlags::PROBE_FAIL | AlarmFlags::HARD_LIMIT | AlarmFlags::ABORT_CYCLE);
    c.tick(&mut sim);
    assert_eq!(sim.alarms(), &[AlarmCause::HardLimit]);
}

#[test]
fn alarm_clears_door_suspension() {
    let (mut c, mut sim) = rig();
    start_cycle(&mut c, &mut sim);
    sim.apply(SimEvent::OpenDoor);
    c.tick(&mut sim);
    assert!(c.is_suspended());

    c.handle().raise_alarm(AlarmFlags::PROBE_FAIL);
    assert_eq!(c.tick(&mut sim), TickOutcome::Running);
    assert_eq!(c.state(), MachineState::Alarm);
    assert!(c.suspend_flags().is_empty());
    assert!(c.parking_context().is_none());
}

#[test]
fn reset_from_idle_comes_back_idle() {
    let (mut c, mut sim) = rig();
    c.handle().raise_event(ExecFlags::RESET);
    assert_eq!(c.tick(&mut sim), TickOutcome::Aborted);
    c.reinitialize(&mut sim);
    assert_eq!(c.state(), MachineState::Idle);
    assert!(sim.alarms().is_empty());
}
