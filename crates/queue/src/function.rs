//! Probabilistic position functions.
//!
//! Every function maps `[0, 1]` onto `[0, 1]` with `f(0) = 0`, `f(1) = 1` and
//! is non-decreasing. Inputs are relative queue sizes, normalized by the
//! caller against the total quantity of the level.

use queuefill_core::config::PositionFunctionKind;
use std::f64::consts::LN_2;

/// Shape used to weigh the front and back of a queue.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum PositionFunction {
    /// `f(x) = x`
    #[default]
    Identity,
    /// `f(x) = x^2`
    Square,
    /// `f(x) = x^n`, `n > 0`
    Power(f64),
    /// `f(x) = ln(1 + x) / ln(2)`
    Log,
}

impl PositionFunction {
    /// Evaluate the function. Inputs outside `[0, 1]` are clamped.
    #[inline]
    pub fn eval(&self, x: f64) -> f64 {
        let x = x.clamp(0.0, 1.0);
        match *self {
            PositionFunction::Identity => x,
            PositionFunction::Square => x * x,
            PositionFunction::Power(n) => x.powf(n),
            PositionFunction::Log => x.ln_1p() / LN_2,
        }
    }
}

impl From<PositionFunctionKind> for PositionFunction {
    fn from(kind: PositionFunctionKind) -> Self {
        match kind {
            PositionFunctionKind::Identity => PositionFunction::Identity,
            PositionFunctionKind::Square => PositionFunction::Square,
            PositionFunctionKind::Power { n } => PositionFunction::Power(n),
            PositionFunctionKind::Log => PositionFunction::Log,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    const ALL: [PositionFunction; 6] = [
        PositionFunction::Identity,
        PositionFunction::Square,
        PositionFunction::Power(0.5),
        PositionFunction::Power(3.0),
        PositionFunction::Log,
        PositionFunction::Power(1.0),
    ];

    #[test]
    fn test_endpoints() {
        for f in ALL {
            assert_abs_diff_eq!(f.eval(0.0), 0.0, epsilon = 1e-12);
            assert_abs_diff_eq!(f.eval(1.0), 1.0, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_monotone_over_samples() {
        for f in ALL {
            let mut prev = f.eval(0.0);
            for i in 1..=1000 {
                let y = f.eval(i as f64 / 1000.0);
                assert!(y >= prev, "{f:?} decreases at sample {i}");
                assert!((0.0..=1.0).contains(&y));
                prev = y;
            }
        }
    }

    #[test]
    fn test_curvature() {
        // Log lies above the diagonal, square below it.
        assert!(PositionFunction::Log.eval(0.25) > 0.25);
        assert_abs_diff_eq!(PositionFunction::Square.eval(0.5), 0.25, epsilon = 1e-12);
        assert_abs_diff_eq!(PositionFunction::Power(3.0).eval(0.5), 0.125, epsilon = 1e-12);
    }

    #[test]
    fn test_out_of_domain_is_clamped() {
        assert_eq!(PositionFunction::Identity.eval(-0.5), 0.0);
        assert_eq!(PositionFunction::Square.eval(2.0), 1.0);
    }

    #[test]
    fn test_from_kind() {
        assert_eq!(
            PositionFunction::from(PositionFunctionKind::Power { n: 2.5 }),
            PositionFunction::Power(2.5)
        );
        assert_eq!(PositionFunction::from(PositionFunctionKind::Log), PositionFunction::Log);
    }
}
