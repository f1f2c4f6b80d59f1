use super::{PairFunction, PotentialError};
use crate::core::pair::{ParamSet, ParameterError};

/// 12-6 Lennard-Jones interaction, `u = 4ε[(σ/r)^12 - (σ/r)^6]`.
#[derive(Debug, Clone, Copy, Default)]
pub struct LennardJones;

impl LennardJones {
    fn read(set: &ParamSet) -> Result<(f64, f64), PotentialError> {
        let epsilon = set.number("epsilon")?;
        let sigma = set.number("sigma")?;
        if sigma < 0.0 {
            return Err(PotentialError::invalid("sigma", "must be non-negative"));
        }
        Ok((epsilon, sigma))
    }
}

impl PairFunction for LennardJones {
    fn name(&self) -> &'static str {
        "lennard-jones"
    }

    fn params(&self) -> Vec<String> {
        vec!["epsilon".to_string(), "sigma".to_string()]
    }

    fn energy(&self, set: &ParamSet, r: f64) -> Result<f64, PotentialError> {
        let (epsilon, sigma) = Self::read(set)?;
        if r == 0.0 {
            return Ok(f64::INFINITY);
        }
        let s6 = (sigma / r).powi(6);
        Ok(4.0 * epsilon * (s6 * s6 - s6))
    }

    fn force(&self, set: &ParamSet, r: f64) -> Result<f64, PotentialError> {
        let (epsilon, sigma) = Self::read(set)?;
        if r == 0.0 {
            return Ok(f64::INFINITY);
        }
        let s6 = (sigma / r).powi(6);
        Ok(48.0 * epsilon / r * (s6 * s6 - 0.5 * s6))
    }

    fn derivative(&self, set: &ParamSet, param: &str, r: f64) -> Result<f64, PotentialError> {
        let (epsilon, sigma) = Self::read(set)?;
        if r == 0.0 {
            return Ok(f64::INFINITY);
        }
        let s = sigma / r;
        match param {
            "epsilon" => {
                let s6 = s.powi(6);
                Ok(4.0 * (s6 * s6 - s6))
            }
            "sigma" => Ok(48.0 * epsilon / r * (s.powi(11) - 0.5 * s.powi(5))),
            other => Err(ParameterError::UnknownParameter(other.to_string()).into()),
        }
    }
}
