//! Pin mapping and tuning constants for the PTZ rig board.
//!
//! Starting point based on the MKS SKIPR pinout this firmware began
//! life on; the STEP/DIR/endstop/stall assignments below will need
//! verifying against the actual rig's schematic before flashing.

use embassy_stm32::gpio::{AnyPin, Pin};

use crate::axis::AxisConfig;
use crate::homing::{HomingConfig, HomingMethod};

/// Build-time microsteps per full step, shared by all three axes.
pub const MICROSTEP_SCALE: u16 = 16;

/// Step executor tick rate, matching the 8 ms segment / 40 kHz example
/// worked through the testable-properties scenarios.
pub const STEP_TICK_RATE_HZ: f32 = 40_000.0;

/// All GPIO lines the firmware drives or reads, degraded to `AnyPin` so
/// `embassy_main`/`rtic_main` can hand them to either runtime's drivers.
pub struct BoardPins {
    pub led: AnyPin,

    pub pan_step: AnyPin,
    pub pan_dir: AnyPin,
    pub tilt_step: AnyPin,
    pub tilt_dir: AnyPin,
    pub zoom_step: AnyPin,
    pub zoom_dir: AnyPin,

    /// Shared driver-enable line, active low, common to all three drivers.
    pub driver_enable: AnyPin,

    pub pan_endstop: AnyPin,
    pub tilt_endstop: AnyPin,
    pub zoom_endstop: AnyPin,
    /// TMC2209 stall (DIAG) output, ZOOM only.
    pub zoom_stall: AnyPin,

    pub uart_tx: AnyPin,
    pub uart_rx: AnyPin,
}

impl BoardPins {
    pub fn new(p: embassy_stm32::Peripherals) -> Self {
        Self {
            led: p.PB1.degrade(),

            pan_step: p.PE2.degrade(),
            pan_dir: p.PB8.degrade(),
            tilt_step: p.PC5.degrade(),
            tilt_dir: p.PB2.degrade(),
            zoom_step: p.PE3.degrade(),
            zoom_dir: p.PB9.degrade(),

            driver_enable: p.PC8.degrade(),

            pan_endstop: p.PA0.degrade(),
            tilt_endstop: p.PA1.degrade(),
            zoom_endstop: p.PA2.degrade(),
            zoom_stall: p.PA3.degrade(),

            uart_tx: p.PA9.degrade(),
            uart_rx: p.PA10.degrade(),
        }
    }
}

/// PAN: endstop-homed pan axis.
pub const PAN_CONFIG: AxisConfig = AxisConfig::new(
    MICROSTEP_SCALE,
    2000.0,   // max velocity, full steps/s
    2000.0,   // max accel, full steps/s^2
    -50_000,  // default soft limit min, microsteps
    50_000,   // default soft limit max, microsteps
    500.0,    // home fast velocity
    100.0,    // home slow velocity
    800,      // home backoff, microsteps
    200_000,  // home max travel, microsteps
    0,        // stall guard, unused for endstop homing
);

/// TILT: endstop-homed tilt axis.
pub const TILT_CONFIG: AxisConfig = AxisConfig::new(
    MICROSTEP_SCALE,
    1500.0,
    1500.0,
    -20_000,
    20_000,
    400.0,
    80.0,
    800,
    100_000,
    0,
);

/// ZOOM: sensorless-homed zoom axis (lead screw, no endstop fitted).
pub const ZOOM_CONFIG: AxisConfig = AxisConfig::new(
    MICROSTEP_SCALE,
    1000.0,
    1000.0,
    0,
    80_000,
    300.0,
    60.0,
    400,
    90_000,
    2_000, // minimum travel before a stall reading is trusted
);

pub const PAN_HOMING: HomingConfig = HomingConfig {
    method: HomingMethod::Endstop,
    direction: -1.0,
    fast_velocity: PAN_CONFIG.home_fast_velocity,
    slow_velocity: PAN_CONFIG.home_slow_velocity,
    backoff_steps: PAN_CONFIG.home_backoff_steps,
    max_travel_steps: PAN_CONFIG.home_max_travel_steps,
    stall_min_travel_steps: PAN_CONFIG.home_stall_min_travel_steps,
};

pub const TILT_HOMING: HomingConfig = HomingConfig {
    method: HomingMethod::Endstop,
    direction: -1.0,
    fast_velocity: TILT_CONFIG.home_fast_velocity,
    slow_velocity: TILT_CONFIG.home_slow_velocity,
    backoff_steps: TILT_CONFIG.home_backoff_steps,
    max_travel_steps: TILT_CONFIG.home_max_travel_steps,
    stall_min_travel_steps: TILT_CONFIG.home_stall_min_travel_steps,
};

pub const ZOOM_HOMING: HomingConfig = HomingConfig {
    method: HomingMethod::Sensorless,
    direction: -1.0,
    fast_velocity: ZOOM_CONFIG.home_fast_velocity,
    slow_velocity: ZOOM_CONFIG.home_slow_velocity,
    backoff_steps: ZOOM_CONFIG.home_backoff_steps,
    max_travel_steps: ZOOM_CONFIG.home_max_travel_steps,
    stall_min_travel_steps: ZOOM_CONFIG.home_stall_min_travel_steps,
};
