//! Stepper rig harness.
//!
//! Bundles a `driver_stepper::StepExecutor` with the fake GPIO/timer pair
//! from [`crate::fake_hardware`] so a test can submit segments through a
//! `motion::planner::MotionPlanner` and "run the clock forward" by calling
//! [`StepperRig::run_ticks`], without any board attached.

use core::cell::RefCell;
use core::sync::atomic::{AtomicBool, Ordering};

use critical_section::Mutex;
use driver_stepper::StepExecutor;
use motion::planner::SegmentConsumer;

use crate::fake_hardware::{FakeGpioPort, FakeTimer};

pub struct StepperRig<const AXES: usize> {
    executor: StepExecutor<AXES>,
    step_port: Mutex<RefCell<FakeGpioPort>>,
    dir_port: Mutex<RefCell<FakeGpioPort>>,
    timer: Mutex<RefCell<FakeTimer>>,
    estop: AtomicBool,
}

impl<const AXES: usize> StepperRig<AXES> {
    pub fn new(consumer: SegmentConsumer<'static, AXES>, tick_period_ticks: u32) -> Self {
        Self {
            executor: StepExecutor::new(consumer, tick_period_ticks),
            step_port: Mutex::new(RefCell::new(FakeGpioPort::new())),
            dir_port: Mutex::new(RefCell::new(FakeGpioPort::new())),
            timer: Mutex::new(RefCell::new(FakeTimer::new())),
            estop: AtomicBool::new(false),
        }
    }

    /// Primes the pipeline from whatever the planner has already produced.
    pub fn start(&mut self) {
        self.executor.start(&self.dir_port, &self.timer);
    }

    /// Fires the timer interrupt handler `n` times in a row.
    pub fn run_ticks(&mut self, n: u32) {
        for _ in 0..n {
            self.executor
                .on_timer_interrupt(&self.step_port, &self.dir_port, &self.timer, &self.estop);
        }
    }

    pub fn position(&self, axis: usize) -> Option<i32> {
        self.executor.position(axis)
    }

    pub fn is_running(&self) -> bool {
        self.executor.is_running()
    }

    pub fn trigger_estop(&self) {
        self.estop.store(true, Ordering::Release);
    }

    pub fn clear_estop(&self) {
        self.estop.store(false, Ordering::Release);
    }

    pub fn drain(&mut self) -> usize {
        self.executor.drain()
    }

    pub fn step_history(&self) -> Vec<u32> {
        critical_section::with(|cs| self.step_port.borrow(cs).borrow().history.clone())
    }

    pub fn dir_state(&self) -> u32 {
        critical_section::with(|cs| self.dir_port.borrow(cs).borrow().state())
    }
}
