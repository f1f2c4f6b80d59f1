//! # Pair Potentials
//!
//! Parametrized pair interactions evaluated on arrays of separations.
//!
//! ## Overview
//!
//! A [`PairFunction`] supplies the raw closed form of an interaction: its energy,
//! its force `F = -dU/dr`, and the derivative of the energy with respect to each
//! of its own parameters. A [`PairPotential`] owns the coefficient matrix for one
//! force-field term and wraps a `PairFunction` with the common cutoff policy:
//!
//! - every potential carries `rmin`, `rmax` and `shift` in addition to its own
//!   parameters; the cutoffs default to disabled (`false`) and `shift` to `false`;
//! - outside `[rmin, rmax]` energy and force are zero;
//! - a potential may opt into [`RminPolicy::Clamp`], which instead holds the energy
//!   below `rmin` at its value at `rmin`;
//! - with `shift`, the energy at `rmax` is subtracted so the energy is continuous
//!   at the cutoff.
//!
//! Derivatives with respect to a variable follow the chain rule through the
//! coefficient slots and include the boundary terms from a moving `rmin` or `rmax`.
//!
//! ## Available Forms
//!
//! - [`LennardJones`] - 12-6 Lennard-Jones (`epsilon`, `sigma`)
//! - [`Yukawa`] - screened Coulomb (`epsilon`, `kappa`)
//! - [`Depletion`] - Asakura-Oosawa depletion (`P`, `sigma_i`, `sigma_j`, `sigma_d`)
//! - [`PairSpline`] - Akima spline through adjustable knots
//!
//! Potentials are tabulated for simulation by the [`tabulator`] module.

mod depletion;
mod error;
mod lennard_jones;
mod spline;
pub mod tabulator;
mod yukawa;

pub use depletion::Depletion;
pub use error::PotentialError;
pub use lennard_jones::LennardJones;
pub use spline::{PairSpline, SplineMode};
pub use yukawa::Yukawa;

use crate::core::pair::{Pair, PairParameters, ParamSet, ParamValue};
use crate::core::variable::{VarId, VariableError, Variables};
use std::fmt;

const CUTOFF_PARAMS: [&str; 3] = ["rmin", "rmax", "shift"];

/// The closed form of a pair interaction, without any cutoff handling.
///
/// Implementations read their own parameters from the evaluated [`ParamSet`] and must
/// reject out-of-range values with [`PotentialError::InvalidParameter`]. The batch
/// methods evaluate a slice of separations and may be overridden when setup work
/// can be shared across points.
pub trait PairFunction: fmt::Debug + Send + Sync {
    fn name(&self) -> &'static str;

    /// Names of the function's own parameters.
    fn params(&self) -> Vec<String>;

    fn energy(&self, set: &ParamSet, r: f64) -> Result<f64, PotentialError>;

    fn force(&self, set: &ParamSet, r: f64) -> Result<f64, PotentialError>;

    /// Derivative of the energy with respect to the parameter `param`.
    fn derivative(&self, set: &ParamSet, param: &str, r: f64) -> Result<f64, PotentialError>;

    fn energies(&self, set: &ParamSet, r: &[f64]) -> Result<Vec<f64>, PotentialError> {
        r.iter().map(|ri| self.energy(set, *ri)).collect()
    }

    fn forces(&self, set: &ParamSet, r: &[f64]) -> Result<Vec<f64>, PotentialError> {
        r.iter().map(|ri| self.force(set, *ri)).collect()
    }

    fn derivatives(
        &self,
        set: &ParamSet,
        param: &str,
        r: &[f64],
    ) -> Result<Vec<f64>, PotentialError> {
        r.iter().map(|ri| self.derivative(set, param, *ri)).collect()
    }
}

/// Energy below an enabled `rmin`. The force there is zero under either policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RminPolicy {
    /// Zero, like the region above `rmax`.
    #[default]
    Truncate,
    /// Hold the energy at its value at `rmin`.
    Clamp,
}

#[derive(Debug, Clone, Copy)]
struct Cutoffs {
    rmin: Option<f64>,
    rmax: Option<f64>,
    shift: bool,
}

impl Cutoffs {
    fn read(set: &ParamSet) -> Result<Self, PotentialError> {
        let rmin = set.cutoff("rmin")?;
        let rmax = set.cutoff("rmax")?;
        let shift = set.flag("shift")?;
        if shift && rmax.is_none() {
            return Err(PotentialError::invalid("shift", "requires rmax to be set"));
        }
        if let Some(rmax) = rmax {
            if !rmax.is_finite() {
                return Err(PotentialError::invalid("rmax", "must be finite"));
            }
        }
        Ok(Self { rmin, rmax, shift })
    }

    fn above_rmax(&self, r: f64) -> bool {
        self.rmax.is_some_and(|rmax| r > rmax)
    }

    fn below_rmin(&self, r: f64) -> bool {
        self.rmin.is_some_and(|rmin| r < rmin)
    }
}

#[derive(Debug)]
pub struct PairPotential {
    coeff: PairParameters,
    function: Box<dyn PairFunction>,
    below_rmin: RminPolicy,
}

impl PairPotential {
    /// Creates a potential for every pair of `types` with cutoffs disabled by default.
    pub fn new<T>(types: T, function: impl PairFunction + 'static) -> Self
    where
        T: IntoIterator,
        T::Item: Into<String>,
    {
        let mut params = function.params();
        params.extend(CUTOFF_PARAMS.iter().map(|p| p.to_string()));
        let mut coeff = PairParameters::new(types, params);
        for name in CUTOFF_PARAMS {
            // Names were registered just above.
            let _ = coeff.set_shared(name, false);
        }
        Self {
            coeff,
            function: Box::new(function),
            below_rmin: RminPolicy::default(),
        }
    }

    pub fn with_rmin_policy(mut self, policy: RminPolicy) -> Self {
        self.below_rmin = policy;
        self
    }

    pub fn rmin_policy(&self) -> RminPolicy {
        self.below_rmin
    }

    pub fn coeff(&self) -> &PairParameters {
        &self.coeff
    }

    pub fn coeff_mut(&mut self) -> &mut PairParameters {
        &mut self.coeff
    }

    pub fn function(&self) -> &dyn PairFunction {
        self.function.as_ref()
    }

    /// Separations at which the underlying function is evaluated, and a mask of
    /// points that contribute at all.
    fn effective(&self, cut: &Cutoffs, r: &[f64]) -> (Vec<f64>, Vec<bool>) {
        r.iter()
            .map(|&ri| {
                if cut.above_rmax(ri) {
                    (ri, false)
                } else if cut.below_rmin(ri) {
                    match (self.below_rmin, cut.rmin) {
                        (RminPolicy::Clamp, Some(rmin)) => (rmin, true),
                        _ => (ri, false),
                    }
                } else {
                    (ri, true)
                }
            })
            .unzip()
    }

    /// Energy of `pair` at each separation in `r`.
    pub fn energy(
        &self,
        vars: &Variables,
        pair: &Pair,
        r: &[f64],
    ) -> Result<Vec<f64>, PotentialError> {
        let set = self.coeff.evaluate(vars, pair)?;
        let cut = Cutoffs::read(&set)?;
        let (r_eff, active) = self.effective(&cut, r);
        let energy = self.function.energies(&set, &r_eff)?;
        let offset = match (cut.shift, cut.rmax) {
            (true, Some(rmax)) => self.function.energy(&set, rmax)?,
            _ => 0.0,
        };
        Ok(energy
            .into_iter()
            .zip(active)
            .map(|(u, on)| if on { u - offset } else { 0.0 })
            .collect())
    }

    /// Force `-dU/dr` of `pair` at each separation in `r`; never shifted.
    pub fn force(
        &self,
        vars: &Variables,
        pair: &Pair,
        r: &[f64],
    ) -> Result<Vec<f64>, PotentialError> {
        let set = self.coeff.evaluate(vars, pair)?;
        let cut = Cutoffs::read(&set)?;
        let force = self.function.forces(&set, r)?;
        Ok(force
            .into_iter()
            .zip(r)
            .map(|(f, &ri)| {
                if cut.above_rmax(ri) || cut.below_rmin(ri) {
                    0.0
                } else {
                    f
                }
            })
            .collect())
    }

    /// Derivative of the energy of `pair` with respect to the variable `var`.
    ///
    /// # Arguments
    ///
    /// * `var` - Any variable in `vars`. Coefficient slots holding variables that depend on
    ///   `var` contribute through the chain rule; slots holding scalars contribute nothing.
    ///
    /// # Errors
    ///
    /// [`VariableError::Unknown`] if `var` is not in `vars`, the same error
    /// [`Variables::derivative`] reports. [`PotentialError::NotDifferentiable`] if the
    /// potential has no closed-form derivative for a parameter that depends on `var`.
    pub fn derivative(
        &self,
        vars: &Variables,
        pair: &Pair,
        var: VarId,
        r: &[f64],
    ) -> Result<Vec<f64>, PotentialError> {
        if !vars.contains(var) {
            return Err(VariableError::Unknown(var).into());
        }
        let set = self.coeff.evaluate(vars, pair)?;
        let cut = Cutoffs::read(&set)?;
        let (r_eff, active) = self.effective(&cut, r);
        let mut total = vec![0.0; r.len()];

        for name in self.function.params() {
            let chain = self.slot_derivative(vars, pair, &name, var)?;
            if chain == 0.0 {
                continue;
            }
            let du = self.function.derivatives(&set, &name, &r_eff)?;
            let offset = match (cut.shift, cut.rmax) {
                (true, Some(rmax)) => self.function.derivative(&set, &name, rmax)?,
                _ => 0.0,
            };
            for ((t, d), on) in total.iter_mut().zip(du).zip(&active) {
                if *on {
                    *t += chain * (d - offset);
                }
            }
        }

        if let (Some(rmin), RminPolicy::Clamp) = (cut.rmin, self.below_rmin) {
            let chain = self.slot_derivative(vars, pair, "rmin", var)?;
            if chain != 0.0 {
                let f_rmin = self.function.force(&set, rmin)?;
                for (t, &ri) in total.iter_mut().zip(r) {
                    if ri < rmin && !cut.above_rmax(ri) {
                        *t -= chain * f_rmin;
                    }
                }
            }
        }

        if let (true, Some(rmax)) = (cut.shift, cut.rmax) {
            let chain = self.slot_derivative(vars, pair, "rmax", var)?;
            if chain != 0.0 {
                let f_rmax = self.function.force(&set, rmax)?;
                for ((t, &ri), on) in total.iter_mut().zip(r).zip(&active) {
                    if *on && ri <= rmax {
                        *t += chain * f_rmax;
                    }
                }
            }
        }

        Ok(total)
    }

    fn slot_derivative(
        &self,
        vars: &Variables,
        pair: &Pair,
        name: &str,
        var: VarId,
    ) -> Result<f64, PotentialError> {
        match self.coeff.resolve(pair, name)? {
            ParamValue::Variable(id) => Ok(vars.derivative(id, var)?),
            ParamValue::Scalar(_) | ParamValue::Flag(_) => Ok(0.0),
        }
    }

    pub fn design_variables(&self, vars: &Variables) -> Result<Vec<VarId>, PotentialError> {
        Ok(self.coeff.design_variables(vars)?)
    }
}
