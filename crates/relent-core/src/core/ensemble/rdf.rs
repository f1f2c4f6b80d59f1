use super::EnsembleError;
use crate::core::math::{InterpolationError, Interpolator};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Radial distribution function sampled on a grid and interpolated between samples.
#[derive(Debug, Clone, PartialEq)]
pub struct Rdf {
    r: Vec<f64>,
    g: Vec<f64>,
    interpolator: Interpolator,
}

#[derive(Debug, Serialize, Deserialize)]
struct RdfRow {
    r: f64,
    g: f64,
}

impl Rdf {
    pub fn new(r: Vec<f64>, g: Vec<f64>) -> Result<Self, InterpolationError> {
        let interpolator = Interpolator::new(&r, &g)?;
        Ok(Self { r, g, interpolator })
    }

    pub fn r(&self) -> &[f64] {
        &self.r
    }

    pub fn g(&self) -> &[f64] {
        &self.g
    }

    pub fn domain(&self) -> (f64, f64) {
        self.interpolator.domain()
    }

    /// Interpolated value, held constant beyond the sampled range.
    pub fn value(&self, r: f64) -> f64 {
        self.interpolator.value(r)
    }

    /// Reads an `r,g` CSV file with a header row.
    pub fn from_csv(path: &Path) -> Result<Self, EnsembleError> {
        let mut reader = csv::Reader::from_path(path).map_err(|e| EnsembleError::Csv {
            path: path.to_string_lossy().to_string(),
            source: e,
        })?;
        let mut r = Vec::new();
        let mut g = Vec::new();
        for result in reader.deserialize() {
            let row: RdfRow = result.map_err(|e| EnsembleError::Csv {
                path: path.to_string_lossy().to_string(),
                source: e,
            })?;
            r.push(row.r);
            g.push(row.g);
        }
        Ok(Self::new(r, g)?)
    }

    pub fn save_csv(&self, path: &Path) -> Result<(), EnsembleError> {
        let csv_error = |e| EnsembleError::Csv {
            path: path.to_string_lossy().to_string(),
            source: e,
        };
        let mut writer = csv::Writer::from_path(path).map_err(csv_error)?;
        for (r, g) in self.r.iter().zip(&self.g) {
            writer
                .serialize(RdfRow { r: *r, g: *g })
                .map_err(csv_error)?;
        }
        writer.flush().map_err(|e| EnsembleError::Io {
            path: path.to_string_lossy().to_string(),
            source: e,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn rdf_round_trips_through_csv() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("rdf.csv");
        let rdf = Rdf::new(vec![0.5, 1.0, 1.5], vec![0.0, 1.2, 1.0]).unwrap();
        rdf.save_csv(&path).unwrap();
        let back = Rdf::from_csv(&path).unwrap();
        assert_eq!(back, rdf);
        assert_eq!(back.value(3.0), 1.0);
    }

    #[test]
    fn from_csv_fails_for_malformed_rows() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("rdf.csv");
        fs::write(&path, "r,g\n1.0,abc\n").unwrap();
        assert!(matches!(
            Rdf::from_csv(&path),
            Err(EnsembleError::Csv { .. })
        ));
    }

    #[test]
    fn from_csv_fails_for_single_sample() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("rdf.csv");
        fs::write(&path, "r,g\n1.0,1.0\n").unwrap();
        assert!(matches!(
            Rdf::from_csv(&path),
            Err(EnsembleError::Interpolation { .. })
        ));
    }
}
