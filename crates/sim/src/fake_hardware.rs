//! Fake stepper hardware.
//!
//! Implements `driver_stepper::{AtomicGpioPort, Timer}` against plain `Vec`s
//! instead of real GPIO/timer peripherals, so the planner → executor
//! pipeline can be driven deterministically from host-side tests without a
//! board attached. Mirrors the `MockPort`/`MockTimer` pair in
//! `driver-stepper`'s own unit tests, one level up: those exercise the
//! executor in isolation, this harness wires it to a real
//! `motion::planner::MotionPlanner` as well.

use driver_stepper::{AtomicGpioPort, Timer};

/// Fake GPIO port. Records every write so a test can assert on the pulse
/// and direction history, not just the final state.
#[derive(Debug, Default)]
pub struct FakeGpioPort {
    state: u32,
    pub history: Vec<u32>,
}

impl FakeGpioPort {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> u32 {
        self.state
    }
}

impl AtomicGpioPort for FakeGpioPort {
    fn set_and_clear_atomic(&mut self, set_mask: u32, clear_mask: u32) {
        self.state |= set_mask;
        self.state &= !clear_mask;
        self.history.push(self.state);
    }

    fn write(&mut self, mask: u32) {
        self.state = mask;
        self.history.push(self.state);
    }
}

/// Fake hardware timer. Does not actually fire anything; a test drives
/// `StepExecutor::on_timer_interrupt` directly in a loop and inspects
/// `is_armed()`/`last_period()` to confirm the executor scheduled or
/// stopped the timer as expected.
#[derive(Debug, Default)]
pub struct FakeTimer {
    period: Option<u32>,
    reschedule_count: u32,
}

impl FakeTimer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_armed(&self) -> bool {
        self.period.is_some()
    }

    pub fn last_period(&self) -> Option<u32> {
        self.period
    }

    pub fn reschedule_count(&self) -> u32 {
        self.reschedule_count
    }
}

impl Timer for FakeTimer {
    fn schedule_next(&mut self, period_ticks: u32) {
        self.period = Some(period_ticks);
        self.reschedule_count += 1;
    }

    fn stop(&mut self) {
        self.period = None;
    }
}
