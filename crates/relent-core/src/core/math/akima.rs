use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum InterpolationError {
    #[error("Interpolation needs at least 2 points, got {0}")]
    TooFewPoints(usize),

    #[error("Abscissae and ordinates differ in length ({x} vs {y})")]
    LengthMismatch { x: usize, y: usize },

    #[error("Abscissae must be finite and strictly increasing")]
    NotIncreasing,
}

/// Akima spline through a set of points.
///
/// Slopes at the knots use Akima's weighting of neighbouring secants, with two
/// extrapolated secants added at each end. Outside the knots the interpolant is held
/// constant at the end value, so its derivative there is zero.
#[derive(Debug, Clone, PartialEq)]
pub struct Interpolator {
    x: Vec<f64>,
    y: Vec<f64>,
    slopes: Vec<f64>,
}

impl Interpolator {
    pub fn new(x: &[f64], y: &[f64]) -> Result<Self, InterpolationError> {
        if x.len() != y.len() {
            return Err(InterpolationError::LengthMismatch {
                x: x.len(),
                y: y.len(),
            });
        }
        if x.len() < 2 {
            return Err(InterpolationError::TooFewPoints(x.len()));
        }
        if x.iter().any(|v| !v.is_finite()) || x.windows(2).any(|w| w[1] <= w[0]) {
            return Err(InterpolationError::NotIncreasing);
        }
        Ok(Self {
            slopes: akima_slopes(x, y),
            x: x.to_vec(),
            y: y.to_vec(),
        })
    }

    pub fn knots(&self) -> &[f64] {
        &self.x
    }

    pub fn domain(&self) -> (f64, f64) {
        (self.x[0], self.x[self.x.len() - 1])
    }

    /// Index `i` of the interval `[x_i, x_{i+1}]` containing `r`, or `None` outside the knots.
    fn interval(&self, r: f64) -> Option<usize> {
        let (lo, hi) = self.domain();
        if !(lo..=hi).contains(&r) {
            return None;
        }
        let i = self.x.partition_point(|k| *k <= r).saturating_sub(1);
        Some(i.min(self.x.len() - 2))
    }

    pub fn value(&self, r: f64) -> f64 {
        match self.interval(r) {
            Some(i) => {
                let h = self.x[i + 1] - self.x[i];
                let s = (r - self.x[i]) / h;
                let (s2, s3) = (s * s, s * s * s);
                let h00 = 2.0 * s3 - 3.0 * s2 + 1.0;
                let h10 = s3 - 2.0 * s2 + s;
                let h01 = -2.0 * s3 + 3.0 * s2;
                let h11 = s3 - s2;
                h00 * self.y[i]
                    + h10 * h * self.slopes[i]
                    + h01 * self.y[i + 1]
                    + h11 * h * self.slopes[i + 1]
            }
            None if r < self.x[0] => self.y[0],
            None => self.y[self.y.len() - 1],
        }
    }

    pub fn derivative(&self, r: f64) -> f64 {
        match self.interval(r) {
            Some(i) => {
                let h = self.x[i + 1] - self.x[i];
                let s = (r - self.x[i]) / h;
                let s2 = s * s;
                let d00 = 6.0 * s2 - 6.0 * s;
                let d10 = 3.0 * s2 - 4.0 * s + 1.0;
                let d01 = -6.0 * s2 + 6.0 * s;
                let d11 = 3.0 * s2 - 2.0 * s;
                (d00 * self.y[i] + d01 * self.y[i + 1]) / h
                    + d10 * self.slopes[i]
                    + d11 * self.slopes[i + 1]
            }
            None => 0.0,
        }
    }
}

fn akima_slopes(x: &[f64], y: &[f64]) -> Vec<f64> {
    let n = x.len();
    let mut m = vec![0.0; n + 3];
    for i in 0..n - 1 {
        m[i + 2] = (y[i + 1] - y[i]) / (x[i + 1] - x[i]);
    }
    if n == 2 {
        return vec![m[2]; 2];
    }
    m[1] = 2.0 * m[2] - m[3];
    m[0] = 2.0 * m[1] - m[2];
    m[n + 1] = 2.0 * m[n] - m[n - 1];
    m[n + 2] = 2.0 * m[n + 1] - m[n];

    let weights: Vec<(f64, f64)> = (0..n)
        .map(|i| ((m[i + 3] - m[i + 2]).abs(), (m[i + 1] - m[i]).abs()))
        .collect();
    let largest = weights
        .iter()
        .map(|(f1, f2)| f1 + f2)
        .fold(0.0_f64, f64::max);

    weights
        .iter()
        .enumerate()
        .map(|(i, (f1, f2))| {
            let f12 = f1 + f2;
            if f12 > 1e-9 * largest {
                (f1 * m[i + 1] + f2 * m[i + 2]) / f12
            } else {
                0.5 * (m[i + 3] + m[i])
            }
        })
        .collect()
}
