//! Motion task: owns the planner, the controller, and the homing
//! sequencer, and pumps segments into the step executor's queue.
//!
//! The step executor itself (`driver-stepper::StepExecutor`) runs from a
//! hardware timer interrupt, not from this task — see `embassy_main`/
//! `rtic_main` for how the ISR and this task share the segment queue and
//! the atomic position counters.

use core::sync::atomic::AtomicI32;

use heapless::spsc::Queue;
use motion::planner::{MotionPlanner, PumpOutcome, SegmentProducer, SegmentQueue};

use crate::axis::{AxisId, AxisState};
use crate::boards::ptz_board::{PAN_CONFIG, PAN_HOMING, TILT_CONFIG, TILT_HOMING, ZOOM_CONFIG, ZOOM_HOMING};
use crate::command_adapter::{self, HostCommand, Response};
use crate::controller::MotionController;
use crate::homing::{HomingOutcome, HomingSequencer};
use crate::preset::PresetStore;
use crate::safety::{EstopLatch, FaultReason};

pub const AXES: usize = 3;

/// Lock-free ring shared between this task (producer) and the step
/// executor's ISR (consumer).
pub static mut SEGMENT_QUEUE: SegmentQueue<AXES> = Queue::new();

/// ESTOP latch shared between the step executor's ISR (observed through
/// `EstopLatch::raw` at the top of every timer tick) and the motion
/// task's controller (latched on a fault, cleared on STOP). Both sides
/// must see the same instance or the ISR can never learn a real fault
/// was raised.
pub static ESTOP: EstopLatch = EstopLatch::new();

/// Per-axis absolute position, in microsteps, mirrored out of the step
/// executor on every timer tick. The motion task diffs this against its
/// own last-seen snapshot to get the per-tick position delta homing
/// needs; it has no other way to reach the executor, which runs from a
/// different task/ISR context.
pub static AXIS_POSITIONS: [AtomicI32; AXES] = [AtomicI32::new(0), AtomicI32::new(0), AtomicI32::new(0)];

fn initial_axes() -> [AxisState; AXES] {
    [
        AxisState::new(PAN_CONFIG),
        AxisState::new(TILT_CONFIG),
        AxisState::new(ZOOM_CONFIG),
    ]
}

/// Everything the motion task owns, bundled so `embassy_main`/`rtic_main`
/// can construct it once at init and move it into the task.
pub struct MotionTask<S: PresetStore> {
    controller: MotionController<'static, AXES>,
    planner: MotionPlanner<AXES>,
    homing: HomingSequencer,
    store: S,
    /// A `GOTO` accepted while MANUAL motion was still decaying to zero;
    /// submitted to the planner once the pending transition promotes.
    pending_preset: Option<crate::preset::PresetRecord>,
}

impl<S: PresetStore> MotionTask<S> {
    pub fn new(tick_rate_hz: f32, store: S) -> Self {
        let axes = initial_axes();
        let accel_caps = [
            axes[0].config().max_accel_microsteps_s2(),
            axes[1].config().max_accel_microsteps_s2(),
            axes[2].config().max_accel_microsteps_s2(),
        ];
        Self {
            controller: MotionController::new(axes, &ESTOP),
            planner: MotionPlanner::new(tick_rate_hz, accel_caps),
            homing: HomingSequencer::new([PAN_HOMING, TILT_HOMING, ZOOM_HOMING]),
            store,
            pending_preset: None,
        }
    }

    /// Handles one command from the host link, producing the reply to
    /// write back. A `GOTO` that the controller accepts also submits its
    /// preset's profile to the planner immediately if nothing is
    /// pending, or it is deferred to `poll_pending_transition` once
    /// MANUAL motion has decayed to zero.
    pub fn handle_command(&mut self, command: HostCommand) -> Response {
        let response = command_adapter::dispatch(&mut self.controller, &mut self.store, command);
        if let Response::GotoAccepted(record) = response {
            if self.controller.has_pending_transition() {
                self.pending_preset = Some(record);
                self.planner.abort();
            } else {
                self.submit_preset(record);
            }
        }
        if matches!(command, HostCommand::Home) {
            if self.controller_is_homing() {
                self.homing.start();
            } else if self.controller.has_pending_transition() {
                self.planner.abort();
            }
        }
        response
    }

    fn controller_is_homing(&self) -> bool {
        self.controller.mode() == crate::controller::Mode::Homing
    }

    fn submit_preset(&mut self, record: crate::preset::PresetRecord) {
        let start = [
            self.controller.axis(0).position(),
            self.controller.axis(1).position(),
            self.controller.axis(2).position(),
        ];
        if self
            .planner
            .submit_profile(start, record.targets, record.duration_s, record.easing)
            .is_err()
        {
            defmt::error!("preset rejected: non-finite move duration");
        }
    }

    /// Drives the planner and the homing sequencer forward by one tick,
    /// and writes the produced segments into the shared ring.
    ///
    /// `position_deltas` is each axis's signed step count since the
    /// previous call, read back from the step executor; `endstop_trips`
    /// and `stall_trip` are this tick's raw (undebounced) sensor state.
    /// All three come from real hardware reads in `embassy_main`/
    /// `rtic_main` — this task has no direct access to the executor or
    /// the board's GPIO itself.
    pub fn tick(
        &mut self,
        producer: &mut SegmentProducer<'_, AXES>,
        position_deltas: [i32; AXES],
        endstop_trips: [bool; AXES],
        stall_trip: bool,
    ) {
        match self.controller.mode() {
            crate::controller::Mode::Homing => self.tick_homing(position_deltas, endstop_trips, stall_trip),
            _ => {
                if matches!(self.planner.pump(producer), PumpOutcome::RingFull) {
                    self.controller.trigger_fault(FaultReason::QueueOverrun);
                }
                if self.planner.is_idle() {
                    if self.controller.has_pending_transition() {
                        self.controller.promote_pending();
                        if self.controller_is_homing() {
                            self.homing.start();
                        } else if let Some(record) = self.pending_preset.take() {
                            self.submit_preset(record);
                        }
                    } else {
                        self.controller.on_trajectory_done();
                    }
                }
            }
        }
    }

    fn tick_homing(&mut self, position_deltas: [i32; AXES], endstop_trips: [bool; AXES], stall_trip: bool) {
        let axis_index = self.homing.current_axis().index();
        let trip_raw = if axis_index == AxisId::Zoom.index() {
            stall_trip
        } else {
            endstop_trips[axis_index]
        };
        let delta = position_deltas[axis_index];
        match self.homing.tick(trip_raw, delta) {
            HomingOutcome::InProgress => {}
            HomingOutcome::AxisComplete(axis) => {
                self.controller.axis_mut(axis.index()).set_origin();
            }
            HomingOutcome::AllComplete => {
                let last = AxisId::ALL[AxisId::ALL.len() - 1];
                self.controller.axis_mut(last.index()).set_origin();
                self.controller.on_homing_done();
            }
            HomingOutcome::Failed { axis, .. } => {
                self.controller.trigger_fault(FaultReason::HomingFailure { axis });
            }
        }
    }
}

/// The stepper task. Wraps `StepExecutor` with the board's GPIO/timer
/// handles; see `embassy_main::stepper_isr`/`rtic_main::stepper_isr` for
/// how the ISR that drives it is actually bound to hardware.
#[embassy_executor::task]
pub async fn stepper_task() {
    defmt::info!("Stepper task started");

    // TODO: bind the board's TIM/GPIO peripherals to `StepExecutor::start`
    // and the ISR callback, mirroring each tick's positions into
    // `AXIS_POSITIONS` the way `rtic_main::stepper_isr` does. Until this
    // is wired, `AXIS_POSITIONS` never advances and `motion_task_runner`
    // sees an all-zero position delta every tick.
    loop {
        embassy_time::Timer::after(embassy_time::Duration::from_secs(10)).await;
    }
}
