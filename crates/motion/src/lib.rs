//! # Motion Control Crate
//!
//! A deterministic, `no_std`-friendly motion planner for a three-axis
//! (pan/tilt/zoom) stepper rig. Usable on both host and MCU.
//!
//! Provides the core motion primitives:
//! - Easing curves (`profile`), including the quintic minimum-jerk profile
//! - A segment-producing planner (`planner`) for profiled moves and
//!   slew-limited manual velocity
//! - `Segment`, the fixed-duration unit of work consumed by the step
//!   executor

#![cfg_attr(not(feature = "std"), no_std)]

pub mod error;
pub mod planner;
pub mod profile;

pub use error::PlannerError;
pub use planner::{
    MotionPlanner, PumpOutcome, Segment, SegmentConsumer, SegmentProducer,
    SEGMENT_QUEUE_CAPACITY,
};
pub use profile::Easing;
