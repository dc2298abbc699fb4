//! Easing curves for profiled moves.
//!
//! Each curve maps normalised time `u = t/T ∈ [0, 1]` to normalised
//! position `f(u) ∈ [0, 1]`; callers rescale with `s + (e - s) * f(u)`.

#[cfg(not(feature = "std"))]
use libm::expf;
#[cfg(feature = "std")]
use std::primitive::f32::exp as expf;

/// Fixed logistic slope used by the `Sigmoid` easing.
const SIGMOID_K: f32 = 10.0;

/// The interpolation curve used for a profiled move.
#[derive(Debug, Copy, Clone, PartialEq, Default)]
pub enum Easing {
    /// `f(u) = u`.
    Linear,
    /// Minimum-jerk quintic: `f(u) = 10u^3 - 15u^4 + 6u^5`.
    /// Zero velocity and acceleration at both endpoints.
    #[default]
    Quintic,
    /// Identical envelope to `Quintic`; kept as a distinct name because
    /// callers select it by that term.
    Smootherstep,
    /// Logistic curve centered at `u = 0.5`, rescaled so `f(0) = 0` and
    /// `f(1) = 1`.
    Sigmoid,
}

impl Easing {
    /// Evaluates the curve at normalised time `u`. `u` outside `[0, 1]`
    /// is not clamped; callers are expected to pass values already in
    /// range.
    pub fn evaluate(self, u: f32) -> f32 {
        match self {
            Easing::Linear => u,
            Easing::Quintic | Easing::Smootherstep => {
                let u2 = u * u;
                let u3 = u2 * u;
                10.0 * u3 - 15.0 * u2 * u2 + 6.0 * u2 * u3
            }
            Easing::Sigmoid => {
                let raw = |x: f32| 1.0 / (1.0 + expf(-SIGMOID_K * (x - 0.5)));
                let f0 = raw(0.0);
                let f1 = raw(1.0);
                (raw(u) - f0) / (f1 - f0)
            }
        }
    }
}

/// Evaluates a single-axis profiled move at absolute time `t` within
/// `[0, duration_s]`, returning the (floating-point, not-yet-rounded)
/// position.
pub fn eval_profile(start: f32, end: f32, duration_s: f32, easing: Easing, t: f32) -> f32 {
    if duration_s <= 0.0 {
        return end;
    }
    let u = (t / duration_s).clamp(0.0, 1.0);
    start + (end - start) * easing.evaluate(u)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quintic_boundary_conditions() {
        assert!((Easing::Quintic.evaluate(0.0) - 0.0).abs() < 1e-6);
        assert!((Easing::Quintic.evaluate(1.0) - 1.0).abs() < 1e-6);
        // Midpoint of a symmetric quintic is 0.5.
        assert!((Easing::Quintic.evaluate(0.5) - 0.5).abs() < 1e-6);
    }

    #[test]
    fn quintic_is_monotonic() {
        let mut prev = Easing::Quintic.evaluate(0.0);
        let mut u = 0.0;
        while u <= 1.0 {
            let cur = Easing::Quintic.evaluate(u);
            assert!(cur >= prev - 1e-6, "quintic must not reverse direction");
            prev = cur;
            u += 0.01;
        }
    }

    #[test]
    fn smootherstep_matches_quintic() {
        for i in 0..=10 {
            let u = i as f32 / 10.0;
            assert!(
                (Easing::Quintic.evaluate(u) - Easing::Smootherstep.evaluate(u)).abs() < 1e-6
            );
        }
    }

    #[test]
    fn sigmoid_boundary_conditions() {
        assert!((Easing::Sigmoid.evaluate(0.0) - 0.0).abs() < 1e-4);
        assert!((Easing::Sigmoid.evaluate(1.0) - 1.0).abs() < 1e-4);
    }

    #[test]
    fn eval_profile_rescales_to_endpoints() {
        assert_eq!(eval_profile(100.0, 200.0, 1.0, Easing::Linear, 0.0), 100.0);
        assert_eq!(eval_profile(100.0, 200.0, 1.0, Easing::Linear, 1.0), 200.0);
        assert_eq!(eval_profile(100.0, 200.0, 1.0, Easing::Linear, 0.5), 150.0);
    }

    #[test]
    fn eval_profile_zero_duration_lands_on_end() {
        assert_eq!(eval_profile(100.0, 200.0, 0.0, Easing::Quintic, 0.0), 200.0);
    }
}
