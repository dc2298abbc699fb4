//! ESTOP latch.
//!
//! Adapted from the original prototype's `SafetyMonitor` thermal-fault
//! latch: a single atomic flag, idempotently set, observed by the step
//! executor's ISR at the top of every tick. Clearing it is a controller
//! decision (STOP, once a fresh `HOME` is issued), never automatic.

use core::sync::atomic::{AtomicBool, Ordering};

use crate::axis::AxisId;

/// The reason an ESTOP was latched, for host reporting and logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FaultReason {
    /// `HOME` did not trip within an axis's configured max travel.
    HomingFailure { axis: AxisId },
    /// The planner produced segments faster than the executor drained
    /// them; this must not happen in correct operation.
    QueueOverrun,
    /// The driver reported a stall with no motion request outstanding.
    DriverFault { axis: AxisId },
    /// A `STOP` was issued while HOMING was in progress; homing motion
    /// cannot be safely decelerated through the slew limiter mid-travel,
    /// so it is routed to ESTOP rather than IDLE.
    HomingAborted,
}

/// A one-bit, interrupt-observable emergency-stop latch.
pub struct EstopLatch {
    active: AtomicBool,
}

impl EstopLatch {
    pub const fn new() -> Self {
        Self {
            active: AtomicBool::new(false),
        }
    }

    /// Latches the stop. Idempotent: only the first call for a given
    /// fault episode logs; returns `true` if this call was the one that
    /// latched it.
    pub fn trigger(&self, reason: FaultReason) -> bool {
        let was_already_active = self.active.swap(true, Ordering::SeqCst);
        if !was_already_active {
            defmt::error!("ESTOP latched: {:?}", reason);
        }
        !was_already_active
    }

    #[inline]
    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }

    /// The underlying flag, for handing to code that cannot see the rest
    /// of the latch — the step executor's ISR observes this directly
    /// rather than going through `is_active`.
    pub fn raw(&self) -> &AtomicBool {
        &self.active
    }

    /// Clears the latch. Only the controller calls this, and only in
    /// response to a host STOP while in the ESTOP mode.
    pub fn clear(&self) {
        self.active.store(false, Ordering::SeqCst);
    }
}

impl Default for EstopLatch {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trigger_is_idempotent() {
        let latch = EstopLatch::new();
        assert!(latch.trigger(FaultReason::QueueOverrun));
        assert!(!latch.trigger(FaultReason::QueueOverrun));
        assert!(latch.is_active());
    }

    #[test]
    fn clear_resets_the_latch() {
        let latch = EstopLatch::new();
        latch.trigger(FaultReason::DriverFault { axis: AxisId::Zoom });
        latch.clear();
        assert!(!latch.is_active());
    }
}
