#![deny(clippy::all)]
#![no_std]

//! # Fixed-Tick DDA Step Executor
//!
//! Consumes [`motion::planner::Segment`]s from a lock-free ring and drives
//! stepper GPIO at a constant tick rate, distributing each segment's
//! per-axis step count evenly across its tick span with a digital
//! differential analyser (Bresenham) accumulator.
//!
//! ## Pipelined Architecture
//!
//! Mirrors the prepare-ahead discipline of a per-pulse pipelined stepper
//! controller, adapted to per-segment granularity: while the *current*
//! segment is executing, the *next* segment is dequeued and cached (but its
//! direction pins are **not** written yet — direction is fixed for the
//! whole of a segment, so writing it early would corrupt the segment still
//! in flight). Direction pins are written only at the tick where the next
//! segment is promoted to current, immediately after that tick's step
//! pulse — the same "step now, prepare after" ordering a pipelined
//! controller uses, just one level up.
//!
//! ## Safety
//!
//! - **Lock-free**: the segment ring is a `heapless::spsc::Queue`; this
//!   executor owns the consumer half only.
//! - **ESTOP-aware**: [`StepExecutor::on_timer_interrupt`] takes a shared
//!   `AtomicBool` and stops the timer and drops in-flight segments the
//!   instant it reads set, without touching the queue itself — the
//!   controller calls [`StepExecutor::drain`] once it is safe to discard
//!   whatever is still queued.
//! - **Atomic GPIO**: [`AtomicGpioPort`] is designed to map to
//!   single-instruction set/clear registers (e.g. STM32's BSRR), avoiding
//!   non-atomic read-modify-write on the step/direction ports.

use core::cell::RefCell;
use core::sync::atomic::{AtomicBool, Ordering};
use critical_section::Mutex;

use motion::planner::{Segment, SegmentConsumer};

/// A GPIO port supporting atomic multi-pin set/clear.
pub trait AtomicGpioPort {
    /// Atomically sets `set_mask` bits and clears `clear_mask` bits.
    fn set_and_clear_atomic(&mut self, set_mask: u32, clear_mask: u32);
    /// Writes a full mask to the port (used for direction pins).
    fn write(&mut self, mask: u32);
}

/// A hardware timer capable of firing a fixed-period interrupt.
pub trait Timer {
    /// (Re)arms the timer to fire again after `period_ticks` ticks.
    fn schedule_next(&mut self, period_ticks: u32);
    /// Disarms the timer; no further interrupts fire until rescheduled.
    fn stop(&mut self);
}

struct Active<const AXES: usize> {
    segment: Segment<AXES>,
    elapsed_ticks: u32,
    accumulator: [u32; AXES],
}

fn direction_mask_of<const AXES: usize>(segment: &Segment<AXES>) -> u32 {
    let mut mask = 0u32;
    for axis in 0..AXES {
        if segment.steps[axis] < 0 {
            mask |= 1 << axis;
        }
    }
    mask
}

/// Drives up to 32 stepper axes from a stream of fixed-duration segments.
pub struct StepExecutor<const AXES: usize> {
    segment_consumer: SegmentConsumer<'static, AXES>,
    current: Option<Active<AXES>>,
    next: Option<Segment<AXES>>,
    positions: [i32; AXES],
    current_directions: u32,
    tick_period: u32,
}

impl<const AXES: usize> StepExecutor<AXES> {
    /// Creates a new executor. `tick_period_ticks` is the timer reload
    /// value corresponding to the executor's fixed tick rate (e.g. 25 for
    /// a 1 MHz timer clocking a 40 kHz tick rate).
    pub fn new(segment_consumer: SegmentConsumer<'static, AXES>, tick_period_ticks: u32) -> Self {
        assert!(AXES <= 32, "executor supports at most 32 axes (u32 masks)");
        Self {
            segment_consumer,
            current: None,
            next: None,
            positions: [0; AXES],
            current_directions: 0,
            tick_period: tick_period_ticks,
        }
    }

    /// Current absolute position of `axis`, in microsteps.
    pub fn position(&self, axis: usize) -> Option<i32> {
        self.positions.get(axis).copied()
    }

    /// `true` while a segment is being executed or staged.
    pub fn is_running(&self) -> bool {
        self.current.is_some()
    }

    /// Discards every segment still sitting in the ring. The controller
    /// calls this after an ESTOP latch before allowing motion to resume,
    /// so stale queued motion never plays back once the fault clears.
    pub fn drain(&mut self) -> usize {
        let mut dropped = 0;
        while self.segment_consumer.dequeue().is_some() {
            dropped += 1;
        }
        self.next = None;
        self.current = None;
        dropped
    }

    /// Primes the pipeline with the first one or two segments and starts
    /// the timer. Call once after the planner has begun producing
    /// segments and before the first interrupt is expected.
    pub fn start<DIR, TIM>(&mut self, dir_port: &Mutex<RefCell<DIR>>, timer: &Mutex<RefCell<TIM>>)
    where
        DIR: AtomicGpioPort,
        TIM: Timer,
    {
        critical_section::with(|cs| {
            self.next = self.segment_consumer.dequeue();
            self.promote_next(dir_port, cs);
            self.prefetch();
            if self.current.is_some() {
                let timer = &mut *timer.borrow(cs).borrow_mut();
                timer.schedule_next(self.tick_period);
            }
        });
    }

    /// The core interrupt handler: advances the DDA accumulator by one
    /// tick. **Must be called from the hardware timer's interrupt
    /// handler at the executor's fixed tick rate.**
    #[inline(always)]
    pub fn on_timer_interrupt<STEP, DIR, TIM>(
        &mut self,
        step_port: &Mutex<RefCell<STEP>>,
        dir_port: &Mutex<RefCell<DIR>>,
        timer: &Mutex<RefCell<TIM>>,
        estop: &AtomicBool,
    ) where
        STEP: AtomicGpioPort,
        DIR: AtomicGpioPort,
        TIM: Timer,
    {
        critical_section::with(|cs| {
            if estop.load(Ordering::Acquire) {
                let timer = &mut *timer.borrow(cs).borrow_mut();
                timer.stop();
                self.current = None;
                self.next = None;
                return;
            }

            let Some(active) = self.current.as_mut() else {
                self.promote_next(dir_port, cs);
                self.prefetch();
                let timer = &mut *timer.borrow(cs).borrow_mut();
                if self.current.is_some() {
                    timer.schedule_next(self.tick_period);
                } else {
                    timer.stop();
                }
                return;
            };

            // --- CRITICAL PATH START ---
            let mut emit_mask = 0u32;
            for axis in 0..AXES {
                let magnitude = active.segment.steps[axis].unsigned_abs();
                if magnitude == 0 {
                    continue;
                }
                active.accumulator[axis] += magnitude;
                if active.accumulator[axis] >= active.segment.duration_ticks {
                    active.accumulator[axis] -= active.segment.duration_ticks;
                    emit_mask |= 1 << axis;
                }
            }
            if emit_mask != 0 {
                let step_port = &mut *step_port.borrow(cs).borrow_mut();
                step_port.set_and_clear_atomic(emit_mask, emit_mask);
            }
            // --- CRITICAL PATH END ---

            for axis in 0..AXES {
                if (emit_mask >> axis) & 1 != 0 {
                    if active.segment.steps[axis] < 0 {
                        self.positions[axis] = self.positions[axis].wrapping_sub(1);
                    } else {
                        self.positions[axis] = self.positions[axis].wrapping_add(1);
                    }
                }
            }
            active.elapsed_ticks += 1;
            let finished = active.elapsed_ticks >= active.segment.duration_ticks;

            if finished {
                self.promote_next(dir_port, cs);
            }
            self.prefetch();

            let timer = &mut *timer.borrow(cs).borrow_mut();
            if self.current.is_some() {
                timer.schedule_next(self.tick_period);
            } else {
                timer.stop();
            }
        });
    }

    /// Dequeues one segment into `next` if nothing is staged yet. Never
    /// touches GPIO: direction pins are only ever written at promotion.
    fn prefetch(&mut self) {
        if self.next.is_none() {
            self.next = self.segment_consumer.dequeue();
        }
    }

    /// Moves the staged segment into `current`, writing direction pins
    /// if they differ from the currently latched directions.
    fn promote_next<'cs, DIR: AtomicGpioPort>(
        &mut self,
        dir_port: &Mutex<RefCell<DIR>>,
        cs: critical_section::CriticalSection<'cs>,
    ) {
        self.current = self.next.take().map(|segment| Active {
            segment,
            elapsed_ticks: 0,
            accumulator: [0; AXES],
        });
        if let Some(active) = &self.current {
            let direction_mask = direction_mask_of(&active.segment);
            if direction_mask != self.current_directions {
                let dir_port = &mut *dir_port.borrow(cs).borrow_mut();
                dir_port.write(direction_mask);
                self.current_directions = direction_mask;
            }
        }
    }
}
