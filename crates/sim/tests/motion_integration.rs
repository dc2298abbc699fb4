//! Integration tests driving the planner/executor pipeline and the
//! command-adapter/preset-store boundary against the fake hardware
//! harness, with no board attached.

use motion::planner::{MotionPlanner, PumpOutcome, SegmentQueue};
use motion::Easing;
use ptz_firmware::axis::{AxisConfig, AxisState};
use ptz_firmware::command_adapter::{dispatch, HostCommand, Response};
use ptz_firmware::controller::{Mode, MotionController};
use ptz_firmware::preset::{ApproachMode, PresetRecord, PresetStore};
use ptz_firmware::safety::EstopLatch;
use sim::{InMemoryPresetStore, StepperRig};

const TICK_RATE_HZ: f32 = 40_000.0;

/// Pumps `planner` and runs `rig`'s fake clock forward until the planner
/// reports idle and the executor has drained, matching the cadence the
/// real firmware uses (pump well above the segment duration).
fn run_to_completion<const AXES: usize>(
    planner: &mut MotionPlanner<AXES>,
    rig: &mut StepperRig<AXES>,
    producer: &mut motion::planner::SegmentProducer<'_, AXES>,
) {
    let mut guard = 0;
    loop {
        guard += 1;
        assert!(guard < 200_000, "motion never settled");

        planner.pump(producer);
        rig.run_ticks(16);

        if planner.is_idle() && !rig.is_running() {
            break;
        }
    }
}

#[test]
fn profiled_move_lands_exactly_on_target() {
    let queue: &'static mut SegmentQueue<2> = Box::leak(Box::new(SegmentQueue::new()));
    let (mut producer, consumer) = queue.split();

    let mut planner: MotionPlanner<2> = MotionPlanner::new(TICK_RATE_HZ, [2_000.0, 2_000.0]);
    let mut rig: StepperRig<2> = StepperRig::new(consumer, 1);

    planner.submit_profile([0, 0], [1600, -800], 0.5, Easing::Quintic).unwrap();
    rig.start();

    run_to_completion(&mut planner, &mut rig, &mut producer);

    assert_eq!(rig.position(0), Some(1600));
    assert_eq!(rig.position(1), Some(-800));
}

#[test]
fn estop_halts_the_executor_mid_move() {
    let queue: &'static mut SegmentQueue<1> = Box::leak(Box::new(SegmentQueue::new()));
    let (mut producer, consumer) = queue.split();

    let mut planner: MotionPlanner<1> = MotionPlanner::new(TICK_RATE_HZ, [2_000.0]);
    let mut rig: StepperRig<1> = StepperRig::new(consumer, 1);

    planner.submit_profile([0], [32_000], 1.0, Easing::Quintic).unwrap();
    rig.start();

    // Run a handful of cadence ticks, short of completion.
    for _ in 0..5 {
        planner.pump(&mut producer);
        rig.run_ticks(16);
    }
    assert!(rig.is_running());
    let position_at_trip = rig.position(0).unwrap();
    assert!(position_at_trip > 0 && position_at_trip < 32_000);

    rig.trigger_estop();
    rig.run_ticks(4);
    assert!(!rig.is_running());

    // No further motion after the latch trips, even if more ticks fire.
    rig.run_ticks(100);
    assert_eq!(rig.position(0), Some(position_at_trip));
}

#[test]
fn ring_full_is_recoverable_once_the_executor_drains() {
    // 0.008s segments at the default duration over a very short span still
    // produce at least one segment; pumping without ever ticking should
    // eventually report `RingFull` once the ring's 8 slots are exhausted,
    // and recover to `Produced`/`Idle` once the executor starts draining.
    let queue: &'static mut SegmentQueue<1> = Box::leak(Box::new(SegmentQueue::new()));
    let (mut producer, consumer) = queue.split();

    let mut planner: MotionPlanner<1> = MotionPlanner::new(TICK_RATE_HZ, [2_000.0]);
    let mut rig: StepperRig<1> = StepperRig::new(consumer, 1);

    planner.submit_profile([0], [20_000], 1.0, Easing::Quintic).unwrap();

    let mut saw_ring_full = false;
    for _ in 0..16 {
        if matches!(planner.pump(&mut producer), PumpOutcome::RingFull) {
            saw_ring_full = true;
        }
    }
    assert!(saw_ring_full, "expected the unthrottled producer to outrun the ring");

    rig.start();
    run_to_completion(&mut planner, &mut rig, &mut producer);
    assert_eq!(rig.position(0), Some(20_000));
}

fn test_axis_config() -> AxisConfig {
    AxisConfig::new(16, 2000.0, 2000.0, -50_000, 50_000, 500.0, 100.0, 800, 100_000, 500)
}

fn test_controller(estop: &EstopLatch) -> MotionController<'_, 3> {
    let config = test_axis_config();
    MotionController::new([AxisState::new(config), AxisState::new(config), AxisState::new(config)], estop)
}

#[test]
fn save_then_goto_round_trips_through_the_command_adapter() {
    let estop = EstopLatch::new();
    let mut controller = test_controller(&estop);
    let mut store = InMemoryPresetStore::new();

    controller.report_position(0, 1200);
    controller.report_position(1, -400);
    controller.report_position(2, 900);

    let saved = dispatch(&mut controller, &mut store, HostCommand::Save { preset: 5 });
    assert!(matches!(saved, Response::Ok));

    let record = store.load(5).expect("preset 5 should have been saved");
    assert_eq!(record.targets, [1200, -400, 900]);

    let response = dispatch(&mut controller, &mut store, HostCommand::Goto { preset: 5 });
    match response {
        Response::GotoAccepted(accepted) => assert_eq!(accepted.targets, [1200, -400, 900]),
        other => panic!("expected GotoAccepted, got {other:?}"),
    }
    assert_eq!(controller.mode(), Mode::Profiled);
}

#[test]
fn goto_of_missing_preset_is_rejected_before_touching_the_controller() {
    let estop = EstopLatch::new();
    let mut controller = test_controller(&estop);
    let mut store = InMemoryPresetStore::new();

    let response = dispatch(&mut controller, &mut store, HostCommand::Goto { preset: 99 });
    assert!(matches!(response, Response::Err(_)));
    assert_eq!(controller.mode(), Mode::Idle);
}

#[test]
fn preset_seeded_directly_in_the_store_is_honored_on_goto() {
    let estop = EstopLatch::new();
    let mut controller = test_controller(&estop);
    let mut store = InMemoryPresetStore::new();
    store
        .save(
            0,
            PresetRecord {
                targets: [10_000, 0, 0],
                duration_s: 2.0,
                easing: Easing::Sigmoid,
                approach: ApproachMode::Direct,
                speed_multiplier: 0.5,
                accel_multiplier: 0.5,
                precision: true,
            },
        )
        .unwrap();

    let response = dispatch(&mut controller, &mut store, HostCommand::Goto { preset: 0 });
    match response {
        Response::GotoAccepted(record) => {
            assert_eq!(record.targets, [10_000, 0, 0]);
            assert!(record.precision);
        }
        other => panic!("expected GotoAccepted, got {other:?}"),
    }
}
