//! Integration test: cycle start, safety door hold, restore and reset.

use carvin_common::control::error::AlarmCause;
use carvin_common::control::flags::{ExecFlags, StepControlMode, SuspendFlags};
use carvin_common::control::report::Feedback;
use carvin_common::control::state::{CoolantState, MachineState, SpindleState};
use carvin_control::scheduler::TickOutcome;
use carvin_control::sim::{SimCall, SimEvent, drive};

use super::{parks, position_of, rig, start_cycle};

#[test]
fn cycle_start_from_idle_primes_and_starts() {
    let (mut c, mut sim) = rig();
    sim.queue_block([10.0, 0.0, -20.0]).unwrap();
    c.handle().raise_event(ExecFlags::CYCLE_START);

    assert_eq!(c.tick(&mut sim), TickOutcome::Running);
    assert_eq!(c.state(), MachineState::Cycle);
    assert_eq!(c.step_control().mode(), StepControlMode::NormalOp);
    let calls: Vec<SimCall> = sim.calls().copied().collect();
    assert_eq!(calls, vec![SimCall::PrimeExecution, SimCall::BeginExecution]);
    assert!(sim.is_executing());
    assert_eq!(sim.feedback(), &[Feedback::ButtonReady]);
}

#[test]
fn cycle_runs_to_completion_and_returns_idle() {
    let (mut c, mut sim) = rig();
    start_cycle(&mut c, &mut sim);
    drive(&mut c, &mut sim, 30);
    assert_eq!(c.state(), MachineState::Idle);
    assert_eq!(sim.position(), [10.0, 0.0, -20.0]);
    assert!(!c.is_suspended());
}

#[test]
fn door_during_cycle_holds_then_retracts() {
    let (mut c, mut sim) = rig();
    start_cycle(&mut c, &mut sim);

    sim.apply(SimEvent::OpenDoor);
    assert_eq!(c.tick(&mut sim), TickOutcome::Suspended);
    assert_eq!(c.state(), MachineState::SafetyDoor);
    assert_eq!(c.step_control().mode(), StepControlMode::ExecuteHold);
    assert!(sim.calls().any(|call| *call == SimCall::RecomputeForDecel));
    assert!(sim.calls().any(|call| *call == SimCall::SpindleSilence));
    assert!(sim.feedback().contains(&Feedback::SafetyDoorAjar));
    assert!(!c.suspend_flags().contains(SuspendFlags::HOLD_COMPLETE));

    assert_eq!(drive(&mut c, &mut sim, 10), TickOutcome::Suspended);
    let flags = c.suspend_flags();
    assert!(flags.contains(SuspendFlags::HOLD_COMPLETE));
    assert!(flags.contains(SuspendFlags::RETRACT_COMPLETE));
    assert!(sim.calls().any(|call| *call == SimCall::ReinitializePlanner));

    // Slow pull-out to the waypoint, de-energize, fast move to the park target.
    let moves = parks(&sim);
    assert_eq!(
        moves,
        vec![([0.0, 0.0, -15.0], 500.0, true), ([0.0, 0.0, -5.0], -1.0, true)]
    );
    let first_park = position_of(&sim, |call| matches!(call, SimCall::Park { .. })).unwrap();
    let stop = position_of(&sim, |call| *call == SimCall::SpindleStop).unwrap();
    let last_park = sim
        .log()
        .iter()
        .rposition(|e| matches!(e.call, SimCall::Park { .. }))
        .unwrap();
    assert!(first_park < stop && stop < last_park);
    assert_eq!(sim.position(), [0.0, 0.0, -5.0]);
    assert_eq!(sim.spindle_output().0, SpindleState::Disabled);
    assert_eq!(c.parking_context().unwrap().restore_target, [0.0, 0.0, -20.0]);
}

#[test]
fn closed_door_and_cycle_start_restore_then_resume() {
    let (mut c, mut sim) = rig();
    start_cycle(&mut c, &mut sim);
    sim.apply(SimEvent::OpenDoor);
    drive(&mut c, &mut sim, 10);
    assert!(c.suspend_flags().contains(SuspendFlags::RETRACT_COMPLETE));

    sim.apply(SimEvent::CloseDoor);
    assert_eq!(c.tick(&mut sim), TickOutcome::Suspended);
    assert!(sim.feedback().contains(&Feedback::ResumeReady));
    assert!(!c.suspend_flags().contains(SuspendFlags::SAFETY_DOOR_AJAR));

    let before = sim.log().len();
    c.handle().raise_event(ExecFlags::CYCLE_START);
    assert_eq!(c.tick(&mut sim), TickOutcome::Suspended);
    assert!(c.suspend_flags().contains(SuspendFlags::RESTORE_COMPLETE));
    assert!(c.parking_context().is_none());

    let restore: Vec<_> = sim.log()[before..]
        .iter()
        .filter(|e| !matches!(e.call, SimCall::StepControl { .. }))
        .collect();
    assert_eq!(
        restore[0].call,
        SimCall::Park {
            target: [0.0, 0.0, -15.0],
            rate: -1.0,
            execute_park: true
        }
    );
    assert_eq!(
        restore[1].call,
        SimCall::SpindleOn {
            state: SpindleState::Clockwise,
            rpm: 12_000.0
        }
    );
    assert_eq!(
        restore[2].call,
        SimCall::CoolantOn {
            state: CoolantState::Flood
        }
    );
    assert_eq!(
        restore[3].call,
        SimCall::Park {
            target: [0.0, 0.0, -20.0],
            rate: 500.0,
            execute_park: true
        }
    );
    // One second of settle time per actuator at 512 Hz.
    assert!(restore[2].tick - restore[1].tick >= 500);
    assert!(restore[3].tick - restore[2].tick >= 500);

    // Restore raised cycle start; the next tick resumes the program.
    assert_eq!(c.tick(&mut sim), TickOutcome::Running);
    assert_eq!(c.state(), MachineState::Cycle);
    assert!(c.suspend_flags().is_empty());
    assert_eq!(sim.position(), [0.0, 0.0, -20.0]);
}

#[test]
fn reset_beats_pending_events() {
    let (mut c, mut sim) = rig();
    start_cycle(&mut c, &mut sim);
    let calls = sim.log().len();

    c.handle()
        .raise_event(ExecFlags::RESET | ExecFlags::FEED_HOLD | ExecFlags::CYCLE_START);
    assert_eq!(c.tick(&mut sim), TickOutcome::Aborted);
    assert!(c.is_aborted());
    assert_eq!(c.state(), MachineState::Cycle);
    assert_eq!(sim.log().len(), calls);

    c.reinitialize(&mut sim);
    assert_eq!(c.state(), MachineState::Alarm);
    assert_eq!(sim.alarms(), &[AlarmCause::AbortCycle]);
    assert!(c.handle().pending_events().is_empty());
}

#[test]
fn feed_hold_then_resume() {
    let (mut c, mut sim) = rig();
    start_cycle(&mut c, &mut sim);

    c.handle().raise_event(ExecFlags::FEED_HOLD);
    drive(&mut c, &mut sim, 8);
    assert_eq!(c.state(), MachineState::Hold);
    assert!(c.suspend_flags().contains(SuspendFlags::HOLD_COMPLETE));
    assert!(parks(&sim).is_empty());
    assert!(!sim.is_executing());

    c.handle().raise_event(ExecFlags::CYCLE_START);
    assert_eq!(c.tick(&mut sim), TickOutcome::Running);
    assert_eq!(c.state(), MachineState::Cycle);
    assert!(sim.is_executing());
}

#[test]
fn hold_and_cycle_start_in_one_drain_hold_wins() {
    let (mut c, mut sim) = rig();
    start_cycle(&mut c, &mut sim);
    c.handle()
        .raise_event(ExecFlags::FEED_HOLD | ExecFlags::CYCLE_START);
    c.tick(&mut sim);
    assert_eq!(c.state(), MachineState::Hold);
}
