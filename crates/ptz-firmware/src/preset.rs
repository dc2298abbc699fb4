//! Preset store boundary.
//!
//! The core only consumes a [`PresetRecord`] when asked to `GOTO`; it does
//! not care how presets are persisted. `PresetStore` pins that boundary.
//! The concrete backing store (flash, a host-side file, etc.) is an
//! external collaborator, same as the serial parser and OTA path.

use motion::Easing;

/// How a `GOTO` reaches its target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApproachMode {
    /// Move directly via the profiled quintic move.
    Direct,
    /// Home first, then move.
    HomeFirst,
    /// Route through an intermediate safe waypoint before the target.
    SafeRoute,
}

/// Everything the core needs to execute a stored framing.
#[derive(Debug, Clone, Copy)]
pub struct PresetRecord {
    /// Per-axis target position, in microsteps.
    pub targets: [i32; 3],
    /// Nominal move duration, in seconds, before per-move scaling.
    pub duration_s: f32,
    pub easing: Easing,
    pub approach: ApproachMode,
    /// Multiplies the move's peak speed.
    pub speed_multiplier: f32,
    /// Multiplies the move's acceleration profile.
    pub accel_multiplier: f32,
    /// If set, this preset always moves at PRECISION speed regardless of
    /// the controller's current PRECISION setting.
    pub precision: bool,
}

/// Result of a `save` attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PresetStoreError {
    /// The backing store has no room for another preset.
    Full,
}

/// The core's view of preset persistence. Implemented by an external
/// collaborator; the core never assumes a concrete backing.
pub trait PresetStore {
    fn load(&self, id: u16) -> Option<PresetRecord>;
    fn save(&mut self, id: u16, record: PresetRecord) -> Result<(), PresetStoreError>;
}

/// A fixed-size, RAM-backed `PresetStore`, indexed directly by id.
///
/// Presets do not survive a power cycle; a board wanting persistence
/// across reboots would swap this for a flash-backed implementation
/// without the core needing to change.
pub struct ArrayPresetStore<const N: usize> {
    slots: [Option<PresetRecord>; N],
}

impl<const N: usize> ArrayPresetStore<N> {
    pub const fn new() -> Self {
        Self { slots: [None; N] }
    }
}

impl<const N: usize> Default for ArrayPresetStore<N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const N: usize> PresetStore for ArrayPresetStore<N> {
    fn load(&self, id: u16) -> Option<PresetRecord> {
        self.slots.get(id as usize).copied().flatten()
    }

    fn save(&mut self, id: u16, record: PresetRecord) -> Result<(), PresetStoreError> {
        match self.slots.get_mut(id as usize) {
            Some(slot) => {
                *slot = Some(record);
                Ok(())
            }
            None => Err(PresetStoreError::Full),
        }
    }
}
