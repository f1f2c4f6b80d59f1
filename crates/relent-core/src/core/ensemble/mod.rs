//! # Ensembles
//!
//! Thermodynamic state of a multi-component system and the structural observations
//! made on it.
//!
//! An [`Ensemble`] fixes temperature, [`Volume`] and particle counts per type. After a
//! simulation it also carries a radial distribution function ([`Rdf`]) for each pair
//! of types and, when the backend reports it, the pressure.

mod rdf;
mod volume;

pub use rdf::Rdf;
pub use volume::Volume;

use crate::core::math::InterpolationError;
use crate::core::pair::Pair;
use std::collections::BTreeMap;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum EnsembleError {
    #[error("Temperature must be positive, got {0}")]
    InvalidTemperature(f64),

    #[error("Invalid volume: {0}")]
    InvalidVolume(String),

    #[error("Ensemble must contain at least one particle type")]
    NoTypes,

    #[error("Type '{0}' is not part of the ensemble")]
    UnknownType(String),

    #[error("Invalid radial distribution function: {source}")]
    Interpolation {
        #[from]
        source: InterpolationError,
    },

    #[error("File I/O error for '{path}': {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },

    #[error("CSV error in '{path}': {source}")]
    Csv { path: String, source: csv::Error },
}

#[derive(Debug, Clone)]
pub struct Ensemble {
    temperature: f64,
    volume: Volume,
    counts: BTreeMap<String, usize>,
    kb: f64,
    pressure: Option<f64>,
    rdf: BTreeMap<Pair, Rdf>,
}

impl Ensemble {
    /// Creates a canonical ensemble with Boltzmann constant 1.
    pub fn new<I, S>(temperature: f64, volume: Volume, counts: I) -> Result<Self, EnsembleError>
    where
        I: IntoIterator<Item = (S, usize)>,
        S: Into<String>,
    {
        if !(temperature > 0.0) {
            return Err(EnsembleError::InvalidTemperature(temperature));
        }
        volume.validate()?;
        let counts: BTreeMap<String, usize> =
            counts.into_iter().map(|(t, n)| (t.into(), n)).collect();
        if counts.is_empty() {
            return Err(EnsembleError::NoTypes);
        }
        Ok(Self {
            temperature,
            volume,
            counts,
            kb: 1.0,
            pressure: None,
            rdf: BTreeMap::new(),
        })
    }

    pub fn with_kb(mut self, kb: f64) -> Self {
        self.kb = kb;
        self
    }

    pub fn temperature(&self) -> f64 {
        self.temperature
    }

    pub fn volume(&self) -> &Volume {
        &self.volume
    }

    pub fn kb(&self) -> f64 {
        self.kb
    }

    /// Inverse thermal energy `1 / (kB T)`.
    pub fn beta(&self) -> f64 {
        1.0 / (self.kb * self.temperature)
    }

    pub fn types(&self) -> impl Iterator<Item = &str> {
        self.counts.keys().map(String::as_str)
    }

    pub fn pairs(&self) -> Vec<Pair> {
        let types: Vec<&str> = self.types().collect();
        let mut pairs = Vec::new();
        for (i, a) in types.iter().enumerate() {
            for b in &types[i..] {
                pairs.push(Pair::new(*a, *b));
            }
        }
        pairs
    }

    pub fn count(&self, ty: &str) -> Result<usize, EnsembleError> {
        self.counts
            .get(ty)
            .copied()
            .ok_or_else(|| EnsembleError::UnknownType(ty.to_string()))
    }

    pub fn number_density(&self, ty: &str) -> Result<f64, EnsembleError> {
        Ok(self.count(ty)? as f64 / self.volume.value())
    }

    pub fn pressure(&self) -> Option<f64> {
        self.pressure
    }

    pub fn set_pressure(&mut self, pressure: f64) {
        self.pressure = Some(pressure);
    }

    pub fn rdf(&self, pair: &Pair) -> Option<&Rdf> {
        self.rdf.get(pair)
    }

    pub fn set_rdf(&mut self, pair: Pair, rdf: Rdf) -> Result<(), EnsembleError> {
        for ty in [pair.first(), pair.second()] {
            self.count(ty)?;
        }
        self.rdf.insert(pair, rdf);
        Ok(())
    }

    /// The same thermodynamic state with no observations attached.
    pub fn state(&self) -> Ensemble {
        Self {
            pressure: None,
            rdf: BTreeMap::new(),
            ..self.clone()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ensemble() -> Ensemble {
        Ensemble::new(2.0, Volume::Cube { l: 2.0 }, [("A", 2), ("B", 3)]).unwrap()
    }

    #[test]
    fn ensemble_reports_densities_and_beta() {
        let ens = ensemble();
        assert_eq!(ens.beta(), 0.5);
        assert_eq!(ens.with_kb(2.0).beta(), 0.25);
        let ens = ensemble();
        assert_eq!(ens.number_density("B").unwrap(), 3.0 / 8.0);
        assert!(matches!(
            ens.number_density("C"),
            Err(EnsembleError::UnknownType(_))
        ));
        assert_eq!(
            ens.pairs(),
            vec![Pair::new("A", "A"), Pair::new("A", "B"), Pair::new("B", "B")]
        );
    }

    #[test]
    fn invalid_state_is_rejected() {
        assert!(matches!(
            Ensemble::new(0.0, Volume::Cube { l: 1.0 }, [("A", 1)]),
            Err(EnsembleError::InvalidTemperature(_))
        ));
        assert!(matches!(
            Ensemble::new(1.0, Volume::Cube { l: -1.0 }, [("A", 1)]),
            Err(EnsembleError::InvalidVolume(_))
        ));
        assert!(matches!(
            Ensemble::new(1.0, Volume::Cube { l: 1.0 }, Vec::<(String, usize)>::new()),
            Err(EnsembleError::NoTypes)
        ));
    }

    #[test]
    fn rdf_requires_known_types_and_state_drops_it() {
        let mut ens = ensemble();
        let rdf = Rdf::new(vec![1.0, 2.0], vec![0.5, 1.0]).unwrap();
        assert!(ens.set_rdf(Pair::new("A", "C"), rdf.clone()).is_err());
        ens.set_rdf(Pair::new("B", "A"), rdf).unwrap();
        ens.set_pressure(1.5);
        assert!(ens.rdf(&Pair::new("A", "B")).is_some());
        let bare = ens.state();
        assert!(bare.rdf(&Pair::new("A", "B")).is_none());
        assert_eq!(bare.pressure(), None);
    }
}
