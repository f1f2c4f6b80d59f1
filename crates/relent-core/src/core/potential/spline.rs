use super::{PairFunction, PairPotential, PotentialError};
use crate::core::math::Interpolator;
use crate::core::pair::{Pair, ParamSet, ParamValue, ParameterError};
use crate::core::variable::Variables;

/// How knot parameters map to energies at the knot positions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SplineMode {
    /// Each knot stores the energy difference to the next knot; the last stores its energy.
    #[default]
    Diff,
    /// Each knot stores its energy.
    Value,
}

#[derive(Debug, Clone, Copy)]
struct SplineFunction {
    num_knots: usize,
    mode: SplineMode,
}

enum KnotParam {
    Position,
    Value(usize),
}

impl SplineFunction {
    fn classify(&self, param: &str) -> Result<KnotParam, PotentialError> {
        let index = |rest: &str| rest.parse::<usize>().ok().filter(|i| *i < self.num_knots);
        if let Some(i) = param.strip_prefix("knot-").and_then(index) {
            return Ok(KnotParam::Value(i));
        }
        if param.strip_prefix("r-").and_then(index).is_some() {
            return Ok(KnotParam::Position);
        }
        Err(ParameterError::UnknownParameter(param.to_string()).into())
    }

    fn positions(&self, set: &ParamSet) -> Result<Vec<f64>, PotentialError> {
        (0..self.num_knots)
            .map(|i| Ok(set.number(&format!("r-{i}"))?))
            .collect()
    }

    fn energies_at_knots(&self, set: &ParamSet) -> Result<Vec<f64>, PotentialError> {
        let knots = (0..self.num_knots)
            .map(|i| set.number(&format!("knot-{i}")))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(match self.mode {
            SplineMode::Value => knots,
            SplineMode::Diff => {
                let mut u = knots;
                for i in (0..u.len() - 1).rev() {
                    u[i] += u[i + 1];
                }
                u
            }
        })
    }

    fn interpolator(&self, set: &ParamSet) -> Result<Interpolator, PotentialError> {
        Ok(Interpolator::new(
            &self.positions(set)?,
            &self.energies_at_knots(set)?,
        )?)
    }

    /// Sensitivity of the knot energies to knot parameter `i`.
    fn indicator(&self, i: usize) -> Vec<f64> {
        (0..self.num_knots)
            .map(|j| match self.mode {
                SplineMode::Value if j == i => 1.0,
                SplineMode::Diff if j <= i => 1.0,
                _ => 0.0,
            })
            .collect()
    }
}

impl PairFunction for SplineFunction {
    fn name(&self) -> &'static str {
        "spline"
    }

    fn params(&self) -> Vec<String> {
        let positions = (0..self.num_knots).map(|i| format!("r-{i}"));
        let values = (0..self.num_knots).map(|i| format!("knot-{i}"));
        positions.chain(values).collect()
    }

    fn energy(&self, set: &ParamSet, r: f64) -> Result<f64, PotentialError> {
        Ok(self.energies(set, &[r])?[0])
    }

    fn force(&self, set: &ParamSet, r: f64) -> Result<f64, PotentialError> {
        Ok(self.forces(set, &[r])?[0])
    }

    fn derivative(&self, set: &ParamSet, param: &str, r: f64) -> Result<f64, PotentialError> {
        Ok(self.derivatives(set, param, &[r])?[0])
    }

    fn energies(&self, set: &ParamSet, r: &[f64]) -> Result<Vec<f64>, PotentialError> {
        let spline = self.interpolator(set)?;
        Ok(r.iter().map(|ri| spline.value(*ri)).collect())
    }

    fn forces(&self, set: &ParamSet, r: &[f64]) -> Result<Vec<f64>, PotentialError> {
        let spline = self.interpolator(set)?;
        Ok(r.iter().map(|ri| -spline.derivative(*ri)).collect())
    }

    fn derivatives(
        &self,
        set: &ParamSet,
        param: &str,
        r: &[f64],
    ) -> Result<Vec<f64>, PotentialError> {
        match self.classify(param)? {
            KnotParam::Position => Err(PotentialError::NotDifferentiable(param.to_string())),
            KnotParam::Value(i) => {
                let basis = Interpolator::new(&self.positions(set)?, &self.indicator(i))?;
                Ok(r.iter().map(|ri| basis.value(*ri)).collect())
            }
        }
    }
}

/// A pair potential interpolated through adjustable knots.
///
/// Knots are the parameters `r-0, r-1, ...` (positions, fixed) and `knot-0, knot-1, ...`
/// (energies or energy differences per [`SplineMode`]). Outside the knots the energy is
/// held at the end values and the force is zero.
#[derive(Debug)]
pub struct PairSpline {
    potential: PairPotential,
    num_knots: usize,
    mode: SplineMode,
}

impl PairSpline {
    pub fn new<T>(types: T, num_knots: usize, mode: SplineMode) -> Result<Self, PotentialError>
    where
        T: IntoIterator,
        T::Item: Into<String>,
    {
        if num_knots < 2 {
            return Err(PotentialError::invalid(
                "num_knots",
                format!("a spline needs at least 2 knots, got {num_knots}"),
            ));
        }
        Ok(Self {
            potential: PairPotential::new(types, SplineFunction { num_knots, mode }),
            num_knots,
            mode,
        })
    }

    pub fn num_knots(&self) -> usize {
        self.num_knots
    }

    pub fn mode(&self) -> SplineMode {
        self.mode
    }

    /// Sets the knots of `pair` to pass through the points `(r, u)`.
    ///
    /// Positions become constant variables. Knot values become adjustable variables,
    /// except the last, which anchors the energy scale and is constant.
    pub fn from_array(
        &mut self,
        vars: &mut Variables,
        pair: &Pair,
        r: &[f64],
        u: &[f64],
    ) -> Result<(), PotentialError> {
        if r.len() != self.num_knots || u.len() != self.num_knots {
            return Err(PotentialError::invalid(
                "knots",
                format!(
                    "expected {} points, got {} positions and {} energies",
                    self.num_knots,
                    r.len(),
                    u.len()
                ),
            ));
        }
        if r.windows(2).any(|w| w[1] <= w[0]) {
            return Err(PotentialError::invalid(
                "knots",
                "positions must be strictly increasing",
            ));
        }

        let last = self.num_knots - 1;
        for i in 0..self.num_knots {
            let value = match self.mode {
                SplineMode::Diff if i < last => u[i] - u[i + 1],
                _ => u[i],
            };
            let position = vars.constant(format!("r-{i}{pair}"), r[i]);
            let knot = if i == last {
                vars.constant(format!("knot-{i}{pair}"), value)
            } else {
                vars.free(format!("knot-{i}{pair}"), value)
            };
            let coeff = self.potential.coeff_mut();
            coeff.set(pair, &format!("r-{i}"), position)?;
            coeff.set(pair, &format!("knot-{i}"), knot)?;
        }
        Ok(())
    }

    /// `(position, value)` slots of each knot of `pair`, in order.
    pub fn knots(&self, pair: &Pair) -> Result<Vec<(ParamValue, ParamValue)>, PotentialError> {
        let coeff = self.potential.coeff();
        (0..self.num_knots)
            .map(|i| {
                Ok((
                    coeff.resolve(pair, &format!("r-{i}"))?,
                    coeff.resolve(pair, &format!("knot-{i}"))?,
                ))
            })
            .collect()
    }

    pub fn potential(&self) -> &PairPotential {
        &self.potential
    }

    pub fn potential_mut(&mut self) -> &mut PairPotential {
        &mut self.potential
    }

    pub fn into_potential(self) -> PairPotential {
        self.potential
    }
}
