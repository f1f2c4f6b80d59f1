//! Discretization of pair potentials onto a shared grid for simulation input.

use super::{PairPotential, PotentialError};
use crate::core::pair::Pair;
use crate::core::variable::{VarId, Variables};
use thiserror::Error;
use tracing::warn;

#[derive(Debug, Error)]
pub enum TabulatorError {
    #[error("Invalid tabulation grid: {0}")]
    InvalidGrid(String),

    #[error("Threshold '{name}' must be non-negative, got {value}")]
    InvalidThreshold { name: &'static str, value: f64 },

    #[error("Table columns differ in length: expected {expected}, got {actual}")]
    LengthMismatch { expected: usize, actual: usize },

    #[error("Potential evaluation failed: {source}")]
    Potential {
        #[from]
        source: PotentialError,
    },
}

/// A regularized `(r, u, f)` table and the radius beyond which it vanishes.
#[derive(Debug, Clone, PartialEq)]
pub struct RegularizedTable {
    pub r: Vec<f64>,
    pub u: Vec<f64>,
    pub f: Vec<f64>,
    pub rcut: f64,
}

impl RegularizedTable {
    pub fn len(&self) -> usize {
        self.r.len()
    }

    pub fn is_empty(&self) -> bool {
        self.r.is_empty()
    }

    pub fn rows(&self) -> impl Iterator<Item = [f64; 3]> + '_ {
        self.r
            .iter()
            .zip(&self.u)
            .zip(&self.f)
            .map(|((r, u), f)| [*r, *u, *f])
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Tabulator {
    r: Vec<f64>,
    fmax: Option<f64>,
    fcut: Option<f64>,
    shift: bool,
}

impl Tabulator {
    /// Creates a tabulator over the strictly increasing grid `r`.
    ///
    /// # Arguments
    ///
    /// * `fmax` - Force magnitude above which the short-range table is replaced by a
    ///   linear extrapolation.
    /// * `fcut` - Force magnitude below which the long-range tail is cut off.
    pub fn new(r: Vec<f64>, fmax: Option<f64>, fcut: Option<f64>) -> Result<Self, TabulatorError> {
        if r.is_empty() {
            return Err(TabulatorError::InvalidGrid("grid is empty".to_string()));
        }
        if r.iter().any(|v| !v.is_finite()) || r.windows(2).any(|w| w[1] <= w[0]) {
            return Err(TabulatorError::InvalidGrid(
                "grid must be finite and strictly increasing".to_string(),
            ));
        }
        for (name, value) in [("fmax", fmax), ("fcut", fcut)] {
            if let Some(value) = value {
                if !(value >= 0.0) {
                    return Err(TabulatorError::InvalidThreshold { name, value });
                }
            }
        }
        Ok(Self {
            r,
            fmax,
            fcut,
            shift: true,
        })
    }

    /// Grid of `num` equally spaced points ending at `rmax`, excluding zero.
    pub fn uniform(
        rmax: f64,
        num: usize,
        fmax: Option<f64>,
        fcut: Option<f64>,
    ) -> Result<Self, TabulatorError> {
        if num == 0 || !(rmax > 0.0) {
            return Err(TabulatorError::InvalidGrid(format!(
                "need a positive rmax and at least one point, got rmax={rmax}, num={num}"
            )));
        }
        let dr = rmax / num as f64;
        Self::new((1..=num).map(|i| dr * i as f64).collect(), fmax, fcut)
    }

    pub fn with_shift(mut self, shift: bool) -> Self {
        self.shift = shift;
        self
    }

    pub fn r(&self) -> &[f64] {
        &self.r
    }

    pub fn fmax(&self) -> Option<f64> {
        self.fmax
    }

    pub fn fcut(&self) -> Option<f64> {
        self.fcut
    }

    pub fn shift(&self) -> bool {
        self.shift
    }

    fn accumulate<'a, I, F>(&self, pair: &Pair, potentials: I, mut eval: F) -> Result<Vec<f64>, TabulatorError>
    where
        I: IntoIterator<Item = &'a PairPotential>,
        F: FnMut(&PairPotential) -> Result<Vec<f64>, PotentialError>,
    {
        let mut total = vec![0.0; self.r.len()];
        for potential in potentials {
            if !potential.coeff().contains(pair) {
                continue;
            }
            for (t, v) in total.iter_mut().zip(eval(potential)?) {
                *t += v;
            }
        }
        Ok(total)
    }

    /// Total energy of `pair` on the grid, summed over every potential covering the pair.
    pub fn energy<'a>(
        &self,
        vars: &Variables,
        pair: &Pair,
        potentials: impl IntoIterator<Item = &'a PairPotential>,
    ) -> Result<Vec<f64>, TabulatorError> {
        self.accumulate(pair, potentials, |p| p.energy(vars, pair, &self.r))
    }

    pub fn force<'a>(
        &self,
        vars: &Variables,
        pair: &Pair,
        potentials: impl IntoIterator<Item = &'a PairPotential>,
    ) -> Result<Vec<f64>, TabulatorError> {
        self.accumulate(pair, potentials, |p| p.force(vars, pair, &self.r))
    }

    pub fn derivative<'a>(
        &self,
        vars: &Variables,
        pair: &Pair,
        var: VarId,
        potentials: impl IntoIterator<Item = &'a PairPotential>,
    ) -> Result<Vec<f64>, TabulatorError> {
        self.accumulate(pair, potentials, |p| p.derivative(vars, pair, var, &self.r))
    }

    /// Makes a tabulated `(u, f)` suitable for simulation.
    ///
    /// Forces stronger than `fmax` at short range are replaced by a linear continuation of
    /// the first acceptable point. The tail beyond the last point with a force of at least
    /// `fcut` is zeroed. With `shift`, the energy is offset to vanish at the retained cutoff.
    /// With `trim`, trailing zero-force rows are dropped, keeping the first of them.
    pub fn regularize(&self, u: &[f64], f: &[f64], trim: bool) -> Result<RegularizedTable, TabulatorError> {
        let n = self.r.len();
        for len in [u.len(), f.len()] {
            if len != n {
                return Err(TabulatorError::LengthMismatch {
                    expected: n,
                    actual: len,
                });
            }
        }
        let mut u = u.to_vec();
        let mut f = f.to_vec();

        if let Some(fmax) = self.fmax {
            match f.iter().position(|fi| fi.abs() <= fmax) {
                Some(first) => {
                    for j in 0..first {
                        u[j] = u[first] - f[first] * (self.r[j] - self.r[first]);
                        f[j] = f[first];
                    }
                }
                None => warn!(fmax, "No tabulated force is below fmax; table left unchanged."),
            }
        }

        let mut cut = n - 1;
        if let Some(fcut) = self.fcut {
            match f.iter().rposition(|fi| fi.abs() >= fcut) {
                Some(last) if last < n - 1 => cut = last,
                Some(_) => warn!(fcut, "Force exceeds fcut at the end of the table; using the full table."),
                None => warn!(fcut, "No tabulated force reaches fcut; using the full table."),
            }
        }

        if self.shift {
            let offset = u[cut];
            for ui in &mut u[..=cut] {
                *ui -= offset;
            }
        }
        let rcut = if cut < n - 1 {
            for i in cut + 1..n {
                u[i] = 0.0;
                f[i] = 0.0;
            }
            self.r[cut + 1]
        } else {
            self.r[n - 1]
        };

        let mut r = self.r.clone();
        if trim {
            let keep = f
                .iter()
                .rposition(|fi| *fi != 0.0)
                .map_or(1, |last| (last + 2).min(n));
            r.truncate(keep);
            u.truncate(keep);
            f.truncate(keep);
        }

        Ok(RegularizedTable { r, u, f, rcut })
    }
}
