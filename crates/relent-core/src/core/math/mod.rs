//! Numerical helpers shared by potentials, ensembles and objectives.

mod akima;

pub use akima::{InterpolationError, Interpolator};

/// Trapezoid-rule integral of samples `y` over the abscissae `x`.
///
/// Extra trailing entries of the longer slice are ignored.
pub fn trapezoid(x: &[f64], y: &[f64]) -> f64 {
    x.windows(2)
        .zip(y.windows(2))
        .map(|(xs, ys)| 0.5 * (xs[1] - xs[0]) * (ys[0] + ys[1]))
        .sum()
}
