//! # In-Process Motion Simulation Harness
//!
//! A deterministic, host-only stand-in for the PTZ rig's stepper hardware,
//! letting the planner/executor pipeline and the preset-store boundary be
//! exercised under `cargo test` without a board attached. Scoped to motion
//! only: no serial framing, no external process, no trace files — the
//! rig's UART link is a separate collaborator and out of scope here.
//!
//! [`fake_hardware`] provides the `AtomicGpioPort`/`Timer` impls,
//! [`harness::StepperRig`] wires them to a `driver_stepper::StepExecutor`,
//! and [`preset_store::InMemoryPresetStore`] is a `HashMap`-backed
//! `PresetStore` for tests that would rather not size a const generic.

pub mod fake_hardware;
pub mod harness;
pub mod preset_store;

pub use fake_hardware::{FakeGpioPort, FakeTimer};
pub use harness::StepperRig;
pub use preset_store::InMemoryPresetStore;
