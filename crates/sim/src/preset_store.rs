//! Host-test-only preset store.
//!
//! `ptz_firmware::preset::ArrayPresetStore` is the firmware's own
//! fixed-size, const-constructible store; this one backs onto a `HashMap`
//! instead, which is convenient for tests that want to seed arbitrary
//! preset ids without sizing a const generic up front. It lives here,
//! not in `ptz-firmware`, so the firmware's own dependency graph never
//! pulls in `std`.

use std::collections::HashMap;

use ptz_firmware::preset::{PresetRecord, PresetStore, PresetStoreError};

#[derive(Default)]
pub struct InMemoryPresetStore {
    slots: HashMap<u16, PresetRecord>,
}

impl InMemoryPresetStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl PresetStore for InMemoryPresetStore {
    fn load(&self, id: u16) -> Option<PresetRecord> {
        self.slots.get(&id).copied()
    }

    fn save(&mut self, id: u16, record: PresetRecord) -> Result<(), PresetStoreError> {
        self.slots.insert(id, record);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use motion::Easing;
    use ptz_firmware::preset::ApproachMode;

    fn record() -> PresetRecord {
        PresetRecord {
            targets: [100, -200, 300],
            duration_s: 1.5,
            easing: Easing::Quintic,
            approach: ApproachMode::Direct,
            speed_multiplier: 1.0,
            accel_multiplier: 1.0,
            precision: false,
        }
    }

    #[test]
    fn save_then_load_round_trips() {
        let mut store = InMemoryPresetStore::new();
        store.save(7, record()).unwrap();
        assert_eq!(store.load(7).unwrap().targets, [100, -200, 300]);
    }

    #[test]
    fn unset_id_loads_none() {
        let store = InMemoryPresetStore::new();
        assert!(store.load(42).is_none());
    }

    #[test]
    fn never_reports_full() {
        let mut store = InMemoryPresetStore::new();
        for id in 0..500u16 {
            assert!(store.save(id, record()).is_ok());
        }
    }
}
