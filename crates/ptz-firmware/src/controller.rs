//! Motion controller (C5): mode arbitration, precision scaling, and
//! soft-limit braking, implementing the transition table exactly.
//!
//! The controller does not own the planner or executor directly — it
//! decides what mode the rig is in and shapes the velocities/positions
//! that cross into C3, the same separation the original prototype's
//! safety supervisor kept from its heater tasks.

use crate::axis::AxisState;
use crate::safety::{EstopLatch, FaultReason};

/// Rig-wide mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Idle,
    Manual,
    Profiled,
    Homing,
    Estop,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PendingTransition {
    Profiled,
    Homing,
}

/// Why a controller request was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControllerError {
    /// Rejected by current mode (spec.md's `ERR:BUSY`).
    Busy,
    /// ESTOP is latched (spec.md's `ERR:FAULT`).
    Fault,
}

/// Arbitrates rig mode and shapes commanded velocities before they reach
/// the planner.
pub struct MotionController<'a, const AXES: usize> {
    mode: Mode,
    pending: Option<PendingTransition>,
    estop: &'a EstopLatch,
    precision: bool,
    soft_limits_enabled: bool,
    axes: [AxisState; AXES],
}

impl<'a, const AXES: usize> MotionController<'a, AXES> {
    /// `estop` is shared with the step executor's ISR, which observes
    /// `EstopLatch::raw` directly — the controller and the ISR must
    /// agree on the same latch instance, so it is handed in rather than
    /// owned, and a real board passes one with `'static` storage.
    pub fn new(axes: [AxisState; AXES], estop: &'a EstopLatch) -> Self {
        Self {
            mode: Mode::Idle,
            pending: None,
            estop,
            precision: false,
            soft_limits_enabled: true,
            axes,
        }
    }

    /// The ESTOP latch this controller arbitrates against. Exposed so a
    /// board entry point can hand the same instance to the step
    /// executor's ISR.
    pub fn estop_latch(&self) -> &'a EstopLatch {
        self.estop
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn is_estop(&self) -> bool {
        self.mode == Mode::Estop
    }

    /// `1.0` normally, `0.25` when PRECISION is enabled.
    pub fn precision_multiplier(&self) -> f32 {
        if self.precision {
            0.25
        } else {
            1.0
        }
    }

    pub fn precision_enabled(&self) -> bool {
        self.precision
    }

    pub fn set_precision(&mut self, enabled: bool) {
        self.precision = enabled;
    }

    pub fn soft_limits_enabled(&self) -> bool {
        self.soft_limits_enabled
    }

    pub fn set_soft_limits_enabled(&mut self, enabled: bool) {
        self.soft_limits_enabled = enabled;
    }

    pub fn axis(&self, index: usize) -> &AxisState {
        &self.axes[index]
    }

    pub fn axis_mut(&mut self, index: usize) -> &mut AxisState {
        &mut self.axes[index]
    }

    /// Updates the cached position readback for `index` from the step
    /// executor's atomic counters.
    pub fn report_position(&mut self, index: usize, position: i32) {
        self.axes[index].report_position(position);
    }

    /// `true` while a MANUAL-origin transition to PROFILED/HOMING is
    /// latched, waiting for the slew limiter to bring velocity to zero.
    pub fn has_pending_transition(&self) -> bool {
        self.pending.is_some()
    }

    /// Completes a pending transition once the caller has observed that
    /// manual velocity has decayed to zero (the planner's job went
    /// idle). A no-op if nothing is pending.
    pub fn promote_pending(&mut self) {
        if let Some(pending) = self.pending.take() {
            self.mode = match pending {
                PendingTransition::Profiled => Mode::Profiled,
                PendingTransition::Homing => Mode::Homing,
            };
        }
    }

    /// `set_velocity` event. `requested_full_steps_s` is in full steps/s,
    /// the host's units. Returns the per-axis velocity in microsteps/s,
    /// already precision-scaled and soft-limit clamped, ready to hand to
    /// `MotionPlanner::set_manual_velocity`.
    pub fn request_velocity(
        &mut self,
        requested_full_steps_s: [f32; AXES],
    ) -> Result<[f32; AXES], ControllerError> {
        match self.mode {
            Mode::Estop => Err(ControllerError::Fault),
            Mode::Profiled | Mode::Homing => Err(ControllerError::Busy),
            Mode::Idle | Mode::Manual => {
                self.mode = Mode::Manual;
                Ok(self.shape_velocities(requested_full_steps_s))
            }
        }
    }

    /// `submit_goto` event. Does not itself talk to the planner; the
    /// caller submits the profile once this returns `Ok` (immediately
    /// from IDLE, or once `promote_pending` fires from MANUAL).
    pub fn request_goto(&mut self) -> Result<(), ControllerError> {
        match self.mode {
            Mode::Idle => {
                self.mode = Mode::Profiled;
                Ok(())
            }
            Mode::Manual => {
                self.pending = Some(PendingTransition::Profiled);
                Ok(())
            }
            Mode::Profiled | Mode::Homing => Err(ControllerError::Busy),
            Mode::Estop => Err(ControllerError::Fault),
        }
    }

    /// `home` event.
    pub fn request_home(&mut self) -> Result<(), ControllerError> {
        match self.mode {
            Mode::Idle => {
                self.mode = Mode::Homing;
                Ok(())
            }
            Mode::Manual => {
                self.pending = Some(PendingTransition::Homing);
                Ok(())
            }
            Mode::Profiled | Mode::Homing => Err(ControllerError::Busy),
            Mode::Estop => Err(ControllerError::Fault),
        }
    }

    /// `stop` event. Never rejected.
    pub fn request_stop(&mut self) {
        match self.mode {
            Mode::Idle => {}
            Mode::Manual | Mode::Profiled => {
                self.pending = None;
                self.mode = Mode::Idle;
            }
            Mode::Homing => {
                // Homing motion cannot be safely decelerated mid-travel;
                // route to ESTOP rather than pretending IDLE is safe.
                self.estop.trigger(FaultReason::HomingAborted);
                self.mode = Mode::Estop;
            }
            Mode::Estop => {
                self.estop.clear();
                self.mode = Mode::Idle;
            }
        }
    }

    /// `trajectory_done` event: PROFILED -> IDLE.
    pub fn on_trajectory_done(&mut self) {
        if self.mode == Mode::Profiled {
            self.mode = Mode::Idle;
        }
    }

    /// `homing_done` event: HOMING -> IDLE.
    pub fn on_homing_done(&mut self) {
        if self.mode == Mode::Homing {
            self.mode = Mode::Idle;
        }
    }

    /// `fault` event: any mode -> ESTOP.
    pub fn trigger_fault(&mut self, reason: FaultReason) {
        self.estop.trigger(reason);
        self.mode = Mode::Estop;
        self.pending = None;
    }

    fn shape_velocities(&mut self, requested_full_steps_s: [f32; AXES]) -> [f32; AXES] {
        let mut out = [0.0f32; AXES];
        for i in 0..AXES {
            let scaled_full_steps_s = requested_full_steps_s[i] * self.precision_multiplier();
            let microsteps_s = scaled_full_steps_s * self.axes[i].config().microstep_scale as f32;
            out[i] = if self.soft_limits_enabled {
                let accel = self.axes[i].config().max_accel_microsteps_s2();
                self.axes[i].apply_soft_limit(microsteps_s, accel)
            } else {
                microsteps_s
            };
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::axis::AxisConfig;

    fn controller(estop: &EstopLatch) -> MotionController<'_, 3> {
        let config = AxisConfig::new(16, 2000.0, 2000.0, -10_000, 10_000, 500.0, 100.0, 800, 20_000, 500);
        MotionController::new(
            [AxisState::new(config), AxisState::new(config), AxisState::new(config)],
            estop,
        )
    }

    #[test]
    fn idle_accepts_all_non_reject_events() {
        let estop = EstopLatch::new();
        let mut c = controller(&estop);
        assert!(c.request_velocity([1.0, 0.0, 0.0]).is_ok());
        assert_eq!(c.mode(), Mode::Manual);

        let mut c = controller(&estop);
        assert!(c.request_goto().is_ok());
        assert_eq!(c.mode(), Mode::Profiled);

        let mut c = controller(&estop);
        assert!(c.request_home().is_ok());
        assert_eq!(c.mode(), Mode::Homing);
    }

    #[test]
    fn manual_goto_and_home_latch_pending() {
        let estop = EstopLatch::new();
        let mut c = controller(&estop);
        c.request_velocity([1.0, 0.0, 0.0]).unwrap();
        assert!(c.request_goto().is_ok());
        assert_eq!(c.mode(), Mode::Manual);
        assert!(c.has_pending_transition());
        c.promote_pending();
        assert_eq!(c.mode(), Mode::Profiled);
    }

    #[test]
    fn profiled_rejects_concurrent_commands() {
        let estop = EstopLatch::new();
        let mut c = controller(&estop);
        c.request_goto().unwrap();
        assert_eq!(c.request_velocity([1.0, 0.0, 0.0]), Err(ControllerError::Busy));
        assert_eq!(c.request_goto(), Err(ControllerError::Busy));
        assert_eq!(c.request_home(), Err(ControllerError::Busy));
    }

    #[test]
    fn profiled_stop_and_trajectory_done_return_to_idle() {
        let estop = EstopLatch::new();
        let mut c = controller(&estop);
        c.request_goto().unwrap();
        c.request_stop();
        assert_eq!(c.mode(), Mode::Idle);

        let mut c = controller(&estop);
        c.request_goto().unwrap();
        c.on_trajectory_done();
        assert_eq!(c.mode(), Mode::Idle);
    }

    #[test]
    fn homing_stop_routes_to_estop_not_idle() {
        let estop = EstopLatch::new();
        let mut c = controller(&estop);
        c.request_home().unwrap();
        c.request_stop();
        assert_eq!(c.mode(), Mode::Estop);
    }

    #[test]
    fn homing_done_returns_to_idle() {
        let estop = EstopLatch::new();
        let mut c = controller(&estop);
        c.request_home().unwrap();
        c.on_homing_done();
        assert_eq!(c.mode(), Mode::Idle);
    }

    #[test]
    fn fault_from_any_mode_latches_estop() {
        let estop = EstopLatch::new();
        let mut c = controller(&estop);
        c.request_velocity([1.0, 0.0, 0.0]).unwrap();
        c.trigger_fault(FaultReason::QueueOverrun);
        assert_eq!(c.mode(), Mode::Estop);
        assert!(c.is_estop());
    }

    #[test]
    fn estop_rejects_everything_but_stop_clears_it() {
        let estop = EstopLatch::new();
        let mut c = controller(&estop);
        c.trigger_fault(FaultReason::QueueOverrun);
        assert_eq!(c.request_velocity([1.0, 0.0, 0.0]), Err(ControllerError::Fault));
        assert_eq!(c.request_goto(), Err(ControllerError::Fault));
        assert_eq!(c.request_home(), Err(ControllerError::Fault));
        c.request_stop();
        assert_eq!(c.mode(), Mode::Idle);
    }

    #[test]
    fn precision_scales_requested_velocity() {
        let estop = EstopLatch::new();
        let mut c = controller(&estop);
        c.set_precision(true);
        let v = c.request_velocity([100.0, 0.0, 0.0]).unwrap();
        // 100 full-steps/s * 0.25 * 16 microsteps/full-step = 400 microsteps/s.
        assert!((v[0] - 400.0).abs() < 1e-3);
    }

    #[test]
    fn soft_limit_clamps_velocity_near_the_bound() {
        let estop = EstopLatch::new();
        let mut c = controller(&estop);
        c.report_position(0, 10_000);
        let v = c.request_velocity([500.0, 0.0, 0.0]).unwrap();
        assert_eq!(v[0], 0.0);
        assert!(c.axis(0).clamped());
    }
}
