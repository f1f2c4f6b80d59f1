use super::EnsembleError;
use nalgebra::Vector3;
use serde::{Deserialize, Serialize};

/// Simulation box shapes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "shape", rename_all = "kebab-case")]
pub enum Volume {
    Cube {
        l: f64,
    },
    Cuboid {
        lx: f64,
        ly: f64,
        lz: f64,
    },
    /// Box spanned by three edge vectors, which must form a right-handed set.
    Parallelepiped {
        a: [f64; 3],
        b: [f64; 3],
        c: [f64; 3],
    },
}

impl Volume {
    /// Edge vectors of the box.
    pub fn edges(&self) -> [Vector3<f64>; 3] {
        match self {
            Volume::Cube { l } => [
                Vector3::new(*l, 0.0, 0.0),
                Vector3::new(0.0, *l, 0.0),
                Vector3::new(0.0, 0.0, *l),
            ],
            Volume::Cuboid { lx, ly, lz } => [
                Vector3::new(*lx, 0.0, 0.0),
                Vector3::new(0.0, *ly, 0.0),
                Vector3::new(0.0, 0.0, *lz),
            ],
            Volume::Parallelepiped { a, b, c } => [
                Vector3::from(*a),
                Vector3::from(*b),
                Vector3::from(*c),
            ],
        }
    }

    /// Signed volume `a · (b × c)`; positive for a valid box.
    pub fn value(&self) -> f64 {
        let [a, b, c] = self.edges();
        a.dot(&b.cross(&c))
    }

    pub fn validate(&self) -> Result<(), EnsembleError> {
        let extents_ok = match self {
            Volume::Cube { l } => *l > 0.0,
            Volume::Cuboid { lx, ly, lz } => *lx > 0.0 && *ly > 0.0 && *lz > 0.0,
            Volume::Parallelepiped { .. } => true,
        };
        let v = self.value();
        if !extents_ok || !(v > 0.0) || !v.is_finite() {
            return Err(EnsembleError::InvalidVolume(format!(
                "{self:?} does not span a positive volume"
            )));
        }
        Ok(())
    }
}
