use super::{PairFunction, PotentialError};
use crate::core::pair::{ParamSet, ParameterError};

/// Screened Coulomb interaction, `u = ε e^{-κr} / r`.
#[derive(Debug, Clone, Copy, Default)]
pub struct Yukawa;

impl Yukawa {
    fn read(set: &ParamSet) -> Result<(f64, f64), PotentialError> {
        let epsilon = set.number("epsilon")?;
        let kappa = set.number("kappa")?;
        if kappa < 0.0 {
            return Err(PotentialError::invalid("kappa", "must be non-negative"));
        }
        Ok((epsilon, kappa))
    }
}

impl PairFunction for Yukawa {
    fn name(&self) -> &'static str {
        "yukawa"
    }

    fn params(&self) -> Vec<String> {
        vec!["epsilon".to_string(), "kappa".to_string()]
    }

    fn energy(&self, set: &ParamSet, r: f64) -> Result<f64, PotentialError> {
        let (epsilon, kappa) = Self::read(set)?;
        if r == 0.0 {
            return Ok(f64::INFINITY);
        }
        Ok(epsilon * (-kappa * r).exp() / r)
    }

    fn force(&self, set: &ParamSet, r: f64) -> Result<f64, PotentialError> {
        let (epsilon, kappa) = Self::read(set)?;
        if r == 0.0 {
            return Ok(f64::INFINITY);
        }
        Ok(epsilon * (-kappa * r).exp() * (1.0 + kappa * r) / (r * r))
    }

    fn derivative(&self, set: &ParamSet, param: &str, r: f64) -> Result<f64, PotentialError> {
        let (epsilon, kappa) = Self::read(set)?;
        match param {
            "epsilon" if r == 0.0 => Ok(f64::INFINITY),
            "epsilon" => Ok((-kappa * r).exp() / r),
            "kappa" => Ok(-epsilon * (-kappa * r).exp()),
            other => Err(ParameterError::UnknownParameter(other.to_string()).into()),
        }
    }
}
