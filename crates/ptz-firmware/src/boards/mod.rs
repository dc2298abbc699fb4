//! Board-specific pin mappings and per-axis tuning constants.
//!
//! One module per supported board, each exposing a `BoardPins` (wired to
//! the concrete HAL peripherals) and a set of `const`-constructed
//! [`crate::axis::AxisConfig`]s. Swapping rigs means adding a sibling
//! module here, never touching the core.

pub mod ptz_board;
