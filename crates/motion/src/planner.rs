//! Motion planner: converts a target move or a manual velocity target into
//! a stream of fixed-duration [`Segment`]s for the step executor.
//!
//! ## Operation
//!
//! The planner holds at most one *active job* — either a profiled move
//! (quintic/linear/etc. interpolation between two positions) or a manual
//! velocity target reached through a slew-rate limiter. The planner task
//! calls [`MotionPlanner::pump`] at a cadence faster than the segment
//! duration (e.g. every 2 ms for 8 ms segments) to keep the segment ring
//! half-full or more; each `pump` call produces at most one `Segment`.
//!
//! Per-axis rounding error from the interpolation is carried forward
//! (`residual`) so that cumulative error is bounded by ±0.5 microstep and
//! the final segment of a profiled move lands exactly on the requested
//! end position.

use heapless::spsc::{Consumer, Producer, Queue};

use crate::error::PlannerError;
use crate::profile::{eval_profile, Easing};

/// Capacity of the segment ring. At the default 8 ms segment duration this
/// buffers at least 64 ms of motion ahead of the executor.
pub const SEGMENT_QUEUE_CAPACITY: usize = 8;

/// Default segment duration, matching the 8 ms / 40 kHz example in the
/// specification (320 ticks per segment).
pub const DEFAULT_SEGMENT_DURATION_S: f32 = 0.008;

/// A fixed-duration unit of work for the step executor.
///
/// Invariants: `duration_ticks > 0`; for every axis,
/// `|steps[axis]| <= duration_ticks`; direction (the sign of `steps[axis]`)
/// is meant to be read once at segment start and never toggled mid-segment.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub struct Segment<const AXES: usize> {
    /// Duration of this segment in executor ticks.
    pub duration_ticks: u32,
    /// Signed step count per axis for this segment.
    pub steps: [i32; AXES],
    /// Monotonically increasing sequence id, for ordering diagnostics.
    pub seq: u32,
}

/// The producer half of the segment ring, owned by the planner task.
pub type SegmentProducer<'a, const AXES: usize> =
    Producer<'a, Segment<AXES>, SEGMENT_QUEUE_CAPACITY>;
/// The consumer half of the segment ring, owned by the step executor.
pub type SegmentConsumer<'a, const AXES: usize> =
    Consumer<'a, Segment<AXES>, SEGMENT_QUEUE_CAPACITY>;
/// The backing storage for a segment ring; give this a `'static` home and
/// call `.split()` to obtain the producer/consumer pair.
pub type SegmentQueue<const AXES: usize> = Queue<Segment<AXES>, SEGMENT_QUEUE_CAPACITY>;

/// What happened on a single `pump` call.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum PumpOutcome {
    /// No active job; nothing was produced.
    Idle,
    /// A segment was enqueued; the job continues.
    Produced,
    /// A segment was enqueued and it was the job's last one.
    ProducedFinal,
    /// There was an active job but the ring had no room; caller should
    /// retry on the next cadence tick.
    RingFull,
}

#[derive(Debug, Copy, Clone)]
enum Job<const AXES: usize> {
    Idle,
    Profiled {
        start: [i32; AXES],
        end: [i32; AXES],
        duration_s: f32,
        easing: Easing,
        elapsed_s: f32,
        segment_duration_s: f32,
    },
    Manual {
        velocity: [f32; AXES],
        target: [f32; AXES],
    },
}

#[cfg(not(feature = "std"))]
fn round_f32(x: f32) -> f32 {
    libm::roundf(x)
}
#[cfg(feature = "std")]
fn round_f32(x: f32) -> f32 {
    x.round()
}

/// Converts a per-axis velocity (microsteps/s) and a fixed `Δt` into a
/// signed step count, carrying the rounding residual forward.
fn quantize_step(velocity: f32, dt_s: f32, residual: &mut f32) -> i32 {
    let ideal = velocity * dt_s + *residual;
    let steps = round_f32(ideal);
    *residual = ideal - steps;
    steps as i32
}

/// Converts per-axis acceleration caps into the maximum velocity change
/// allowed over one `pump` cadence step.
fn slew_step(current: f32, target: f32, max_delta: f32) -> f32 {
    let delta = target - current;
    if delta.abs() <= max_delta {
        target
    } else {
        current + max_delta.copysign(delta)
    }
}

/// The motion planner: accepts profiled moves or manual velocity targets
/// and streams [`Segment`]s into the executor's ring.
pub struct MotionPlanner<const AXES: usize> {
    tick_rate_hz: f32,
    segment_duration_s: f32,
    accel_caps: [f32; AXES],
    job: Job<AXES>,
    residual: [f32; AXES],
    seq: u32,
    clamp_events: u32,
}

impl<const AXES: usize> MotionPlanner<AXES> {
    /// Creates a new planner.
    ///
    /// `tick_rate_hz` is the executor's fixed tick rate (e.g. 40_000.0 for
    /// 40 kHz); `accel_caps` are per-axis acceleration caps in
    /// microsteps/s², used by the manual-velocity slew limiter.
    pub fn new(tick_rate_hz: f32, accel_caps: [f32; AXES]) -> Self {
        Self {
            tick_rate_hz,
            segment_duration_s: DEFAULT_SEGMENT_DURATION_S,
            accel_caps,
            job: Job::Idle,
            residual: [0.0; AXES],
            seq: 0,
            clamp_events: 0,
        }
    }

    /// Overrides the default segment duration (for testing and tuning).
    pub fn set_segment_duration_s(&mut self, duration_s: f32) {
        self.segment_duration_s = duration_s;
    }

    /// Number of times a segment's step count had to be clamped to the
    /// executor's per-tick capacity (velocity beyond executor capacity).
    pub fn clamp_events(&self) -> u32 {
        self.clamp_events
    }

    /// `true` if there is no move or manual ramp in progress.
    pub fn is_idle(&self) -> bool {
        matches!(self.job, Job::Idle)
    }

    /// Begins streaming segments for a profiled point-to-point move.
    ///
    /// A zero or negative duration, or a move where every axis already
    /// starts at its end position, completes instantly with zero
    /// segments produced — matching the specification's boundary
    /// behaviour. A non-finite duration (NaN or infinite) is rejected
    /// outright: it would otherwise never satisfy `pump_profiled`'s
    /// completion check and the job would run forever.
    ///
    /// Mode arbitration (rejecting a `submit_profile` while another move
    /// is active) is the controller's responsibility, not the planner's;
    /// calling this while a job is active simply replaces it.
    pub fn submit_profile(
        &mut self,
        start: [i32; AXES],
        end: [i32; AXES],
        duration_s: f32,
        easing: Easing,
    ) -> Result<(), PlannerError> {
        if !duration_s.is_finite() {
            return Err(PlannerError::InvalidMove);
        }
        if duration_s <= 0.0 || start == end {
            self.job = Job::Idle;
            return Ok(());
        }
        self.residual = [0.0; AXES];
        self.job = Job::Profiled {
            start,
            end,
            duration_s,
            easing,
            elapsed_s: 0.0,
            segment_duration_s: self.segment_duration_s,
        };
        Ok(())
    }

    /// Sets (or updates) the manual velocity target, in microsteps/s per
    /// axis. The planner approaches this target through a slew-rate
    /// limiter derived from the axis acceleration caps; it does not jump
    /// directly to the requested velocity.
    pub fn set_manual_velocity(&mut self, target: [f32; AXES]) {
        match &mut self.job {
            Job::Manual { target: t, .. } => *t = target,
            _ => {
                self.residual = [0.0; AXES];
                self.job = Job::Manual {
                    velocity: [0.0; AXES],
                    target,
                };
            }
        }
    }

    /// Stops producing further segments.
    ///
    /// For a profiled move this abandons the remainder of the trajectory
    /// immediately (segments already in the ring still drain on the
    /// executor). For manual velocity this sets the target to zero so the
    /// slew limiter ramps down to a stop rather than zeroing abruptly;
    /// the job becomes idle once velocity and residual reach zero.
    pub fn abort(&mut self) {
        match &mut self.job {
            Job::Manual { target, .. } => *target = [0.0; AXES],
            _ => self.job = Job::Idle,
        }
    }

    /// Produces at most one segment into `producer`. Call this at a
    /// cadence well above `segment_duration_s` (e.g. every 2 ms for 8 ms
    /// segments) so the ring stays ahead of the executor.
    pub fn pump(&mut self, producer: &mut SegmentProducer<'_, AXES>) -> PumpOutcome {
        if !producer.ready() {
            return PumpOutcome::RingFull;
        }
        match self.job {
            Job::Idle => PumpOutcome::Idle,
            Job::Profiled { .. } => self.pump_profiled(producer),
            Job::Manual { .. } => self.pump_manual(producer),
        }
    }

    fn pump_profiled(&mut self, producer: &mut SegmentProducer<'_, AXES>) -> PumpOutcome {
        let Job::Profiled {
            start,
            end,
            duration_s,
            easing,
            elapsed_s,
            segment_duration_s,
        } = self.job
        else {
            unreachable!()
        };

        let t0 = elapsed_s;
        let t1 = (elapsed_s + segment_duration_s).min(duration_s);
        let seg_duration_s = t1 - t0;
        let is_final = t1 >= duration_s - 1e-9;

        let duration_ticks = (seg_duration_s * self.tick_rate_hz).round().max(1.0) as u32;
        let mut steps = [0i32; AXES];
        for axis in 0..AXES {
            let p0 = eval_profile(start[axis] as f32, end[axis] as f32, duration_s, easing, t0);
            let p1 = eval_profile(start[axis] as f32, end[axis] as f32, duration_s, easing, t1);
            let ideal = (p1 - p0) + self.residual[axis];
            let rounded = round_f32(ideal);
            self.residual[axis] = ideal - rounded;
            let mut s = rounded as i32;
            if s.unsigned_abs() > duration_ticks {
                s = if s < 0 {
                    -(duration_ticks as i32)
                } else {
                    duration_ticks as i32
                };
                self.clamp_events += 1;
            }
            steps[axis] = s;
        }

        let seg = Segment {
            duration_ticks,
            steps,
            seq: self.seq,
        };
        // `ready()` was checked by the caller; enqueue cannot fail here
        // barring a race with a second producer, which SPSC forbids.
        let _ = producer.enqueue(seg);
        self.seq = self.seq.wrapping_add(1);

        if is_final {
            self.job = Job::Idle;
            PumpOutcome::ProducedFinal
        } else {
            if let Job::Profiled { elapsed_s, .. } = &mut self.job {
                *elapsed_s = t1;
            }
            PumpOutcome::Produced
        }
    }

    fn pump_manual(&mut self, producer: &mut SegmentProducer<'_, AXES>) -> PumpOutcome {
        let Job::Manual {
            mut velocity,
            target,
        } = self.job
        else {
            unreachable!()
        };

        let dt = self.segment_duration_s;
        let duration_ticks = (dt * self.tick_rate_hz).round().max(1.0) as u32;
        let mut steps = [0i32; AXES];
        let mut all_stopped = true;
        for axis in 0..AXES {
            let max_delta = self.accel_caps[axis] * dt;
            let new_v = slew_step(velocity[axis], target[axis], max_delta);
            let prev_sign = velocity[axis].signum();
            let new_sign = new_v.signum();
            if prev_sign != 0.0 && new_sign != 0.0 && prev_sign != new_sign {
                // Direction reversed through the slew ramp: reset the
                // residual so stale sub-step error from the old direction
                // doesn't bleed into the new one.
                self.residual[axis] = 0.0;
            }
            velocity[axis] = new_v;
            let s = quantize_step(new_v, dt, &mut self.residual[axis]);
            let clamped = if s.unsigned_abs() > duration_ticks {
                self.clamp_events += 1;
                if s < 0 {
                    -(duration_ticks as i32)
                } else {
                    duration_ticks as i32
                }
            } else {
                s
            };
            steps[axis] = clamped;
            if new_v != 0.0 || target[axis] != 0.0 {
                all_stopped = false;
            }
        }

        let seg = Segment {
            duration_ticks,
            steps,
            seq: self.seq,
        };
        let _ = producer.enqueue(seg);
        self.seq = self.seq.wrapping_add(1);
        self.job = Job::Manual { velocity, target };

        if all_stopped {
            self.job = Job::Idle;
            PumpOutcome::ProducedFinal
        } else {
            PumpOutcome::Produced
        }
    }
}
