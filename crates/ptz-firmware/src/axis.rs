//! Per-axis owned state: tuning constants plus live position/homed flags.
//!
//! Replaces the original prototype's global integer state with one
//! `AxisState` per axis, passed by reference, per the re-architecture
//! called for in the design notes.

/// Identifies one of the three rig axes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AxisId {
    Pan,
    Tilt,
    Zoom,
}

impl AxisId {
    /// All axes in homing order: PAN, TILT, ZOOM.
    pub const ALL: [AxisId; 3] = [AxisId::Pan, AxisId::Tilt, AxisId::Zoom];

    pub fn index(self) -> usize {
        match self {
            AxisId::Pan => 0,
            AxisId::Tilt => 1,
            AxisId::Zoom => 2,
        }
    }
}

/// Per-axis tuning constants, fixed at build time.
///
/// `const fn` constructible, matching the teacher's `ThermalMonitor::new`.
#[derive(Debug, Clone, Copy)]
pub struct AxisConfig {
    /// Microsteps per full step (build-time `MICROSTEP_SCALE`).
    pub microstep_scale: u16,
    /// Maximum commanded velocity, in full steps/s.
    pub max_velocity_full_steps_s: f32,
    /// Maximum acceleration, in full steps/s^2. Drives both the slew
    /// limiter and soft-limit braking distance.
    pub max_accel_full_steps_s2: f32,
    /// Default soft-limit pair, in microsteps, loaded at startup. `LIMITS`
    /// overrides these at runtime on the owning `AxisState`.
    pub default_soft_limit_min: i32,
    pub default_soft_limit_max: i32,
    /// Fast approach velocity during homing, full steps/s.
    pub home_fast_velocity: f32,
    /// Slow re-approach velocity after backoff, full steps/s.
    pub home_slow_velocity: f32,
    /// Distance to back off after the first trip, in microsteps.
    pub home_backoff_steps: i32,
    /// Maximum travel before homing is declared a failure, in microsteps.
    pub home_max_travel_steps: i32,
    /// Sensorless-stall minimum travel guard, in microsteps (ZOOM only;
    /// ignored by endstop axes).
    pub home_stall_min_travel_steps: i32,
}

impl AxisConfig {
    pub const fn new(
        microstep_scale: u16,
        max_velocity_full_steps_s: f32,
        max_accel_full_steps_s2: f32,
        default_soft_limit_min: i32,
        default_soft_limit_max: i32,
        home_fast_velocity: f32,
        home_slow_velocity: f32,
        home_backoff_steps: i32,
        home_max_travel_steps: i32,
        home_stall_min_travel_steps: i32,
    ) -> Self {
        Self {
            microstep_scale,
            max_velocity_full_steps_s,
            max_accel_full_steps_s2,
            default_soft_limit_min,
            default_soft_limit_max,
            home_fast_velocity,
            home_slow_velocity,
            home_backoff_steps,
            home_max_travel_steps,
            home_stall_min_travel_steps,
        }
    }

    /// Max acceleration expressed in microsteps/s^2, the unit the motion
    /// planner's slew limiter operates in.
    pub fn max_accel_microsteps_s2(&self) -> f32 {
        self.max_accel_full_steps_s2 * self.microstep_scale as f32
    }
}

/// Live, owned state for one axis: position and homed flag, plus the
/// soft-limit clamp flag the host can observe via STATUS.
#[derive(Debug, Clone, Copy)]
pub struct AxisState {
    config: AxisConfig,
    position: i32,
    homed: bool,
    clamped: bool,
    soft_limit_min: i32,
    soft_limit_max: i32,
}

impl AxisState {
    pub const fn new(config: AxisConfig) -> Self {
        let soft_limit_min = config.default_soft_limit_min;
        let soft_limit_max = config.default_soft_limit_max;
        Self {
            config,
            position: 0,
            homed: false,
            clamped: false,
            soft_limit_min,
            soft_limit_max,
        }
    }

    pub fn config(&self) -> &AxisConfig {
        &self.config
    }

    pub fn soft_limit_min(&self) -> i32 {
        self.soft_limit_min
    }

    pub fn soft_limit_max(&self) -> i32 {
        self.soft_limit_max
    }

    /// Overrides the soft-limit pair at runtime, per a host `LIMITS`
    /// command.
    pub fn set_soft_limits(&mut self, min: i32, max: i32) {
        self.soft_limit_min = min;
        self.soft_limit_max = max;
    }

    /// Absolute position in microsteps, as last reported by the step
    /// executor. The executor is the sole writer; this is a readback copy.
    pub fn position(&self) -> i32 {
        self.position
    }

    /// Updates the cached position readback. Called by the controller
    /// task from the executor's atomic position counter, never from ISR
    /// context.
    pub fn report_position(&mut self, position: i32) {
        self.position = position;
    }

    pub fn homed(&self) -> bool {
        self.homed
    }

    pub fn set_homed(&mut self, homed: bool) {
        self.homed = homed;
    }

    /// Resets position to zero and marks the axis homed, the terminal
    /// action of a successful per-axis homing sequence.
    pub fn set_origin(&mut self) {
        self.position = 0;
        self.homed = true;
    }

    pub fn clamped(&self) -> bool {
        self.clamped
    }

    pub fn set_clamped(&mut self, clamped: bool) {
        self.clamped = clamped;
    }

    /// Distance from `position` to the soft limit in the direction of
    /// `velocity_sign`, in microsteps. Returns `None` if moving away from
    /// both limits or at zero velocity.
    fn distance_to_limit(&self, velocity_sign: f32) -> Option<i32> {
        if velocity_sign > 0.0 {
            Some(self.soft_limit_max - self.position)
        } else if velocity_sign < 0.0 {
            Some(self.position - self.soft_limit_min)
        } else {
            None
        }
    }

    /// Clamps `requested_velocity` (microsteps/s) so the axis decelerates
    /// to exactly zero at its soft limit, per spec.md's soft-limit
    /// braking rule. `accel_microsteps_s2` is the axis's acceleration cap.
    /// Updates the `clamped` flag as a side effect.
    pub fn apply_soft_limit(&mut self, requested_velocity: f32, accel_microsteps_s2: f32) -> f32 {
        let sign = requested_velocity.signum();
        let Some(distance) = self.distance_to_limit(sign) else {
            self.clamped = false;
            return requested_velocity;
        };

        if distance <= 0 {
            // Already at or past the limit: hold.
            self.clamped = true;
            return 0.0;
        }

        // v^2 = 2 * a * d -> max velocity that still stops exactly at the
        // limit under the axis's accel cap.
        let max_braking_velocity = libm_sqrtf(2.0 * accel_microsteps_s2 * distance as f32);
        if requested_velocity.abs() > max_braking_velocity {
            self.clamped = true;
            max_braking_velocity.copysign(requested_velocity)
        } else {
            self.clamped = false;
            requested_velocity
        }
    }
}

#[cfg(not(feature = "std"))]
fn libm_sqrtf(x: f32) -> f32 {
    libm::sqrtf(x)
}
#[cfg(feature = "std")]
fn libm_sqrtf(x: f32) -> f32 {
    x.sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config() -> AxisConfig {
        AxisConfig::new(16, 2000.0, 2000.0, -10_000, 10_000, 500.0, 100.0, 800, 20_000, 500)
    }

    #[test]
    fn soft_limit_passes_through_when_moving_away_from_limits() {
        let mut axis = AxisState::new(test_config());
        axis.report_position(0);
        let v = axis.apply_soft_limit(5000.0, 2_000.0 * 16.0);
        assert_eq!(v, 5000.0);
        assert!(!axis.clamped());
    }

    #[test]
    fn soft_limit_clamps_to_land_exactly_at_the_bound() {
        let mut axis = AxisState::new(test_config());
        axis.report_position(9_999);
        // Requested velocity far exceeds what 1 microstep of braking
        // distance allows under this accel cap.
        let v = axis.apply_soft_limit(50_000.0, 32_000.0);
        let expected = libm_sqrtf(2.0 * 32_000.0 * 1.0);
        assert!((v - expected).abs() < 1e-3);
        assert!(axis.clamped());
    }

    #[test]
    fn soft_limit_holds_at_the_bound() {
        let mut axis = AxisState::new(test_config());
        axis.report_position(10_000);
        let v = axis.apply_soft_limit(1000.0, 32_000.0);
        assert_eq!(v, 0.0);
        assert!(axis.clamped());
    }

    #[test]
    fn set_origin_zeroes_position_and_marks_homed() {
        let mut axis = AxisState::new(test_config());
        axis.report_position(4123);
        axis.set_origin();
        assert_eq!(axis.position(), 0);
        assert!(axis.homed());
    }

    #[test]
    fn set_soft_limits_overrides_the_build_time_defaults() {
        let mut axis = AxisState::new(test_config());
        axis.set_soft_limits(-500, 500);
        axis.report_position(500);
        let v = axis.apply_soft_limit(1000.0, 32_000.0);
        assert_eq!(v, 0.0);
        assert!(axis.clamped());
        assert_eq!(axis.soft_limit_min(), -500);
        assert_eq!(axis.soft_limit_max(), 500);
    }
}
