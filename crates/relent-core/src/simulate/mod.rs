//! # Simulation Module
//!
//! The contract between the optimizer and a simulation backend, and the potentials
//! handed to it.
//!
//! ## Overview
//!
//! A [`Simulation`] receives the thermodynamic state of an [`Ensemble`] and one
//! regularized `(r, u, f)` table per pair of types, and returns the same state with
//! the observations it measured (radial distribution functions and, when available,
//! the pressure). Tables passed to a backend are equally spaced, hold at least two
//! points, and start at `r > 0`.
//!
//! [`Potentials`] collects the pair potentials of a model together with the
//! [`Tabulator`] that discretizes them, so objectives can tabulate energies for the
//! backend and derivatives for their gradients on the same grid.
//!
//! ## Backends
//!
//! - [`Dilute`] - the low-density limit, `g(r) = exp(-u(r)/kT)`

mod dilute;

pub use dilute::Dilute;

use crate::core::ensemble::{Ensemble, EnsembleError};
use crate::core::io::directory::{Directory, DirectoryError};
use crate::core::math::InterpolationError;
use crate::core::pair::{Pair, ParameterError};
use crate::core::potential::PairPotential;
use crate::core::potential::tabulator::{RegularizedTable, Tabulator, TabulatorError};
use crate::core::variable::{VarId, Variables};
use std::collections::BTreeMap;
use std::path::Path;
use thiserror::Error;

/// Regularized tables keyed by pair.
pub type PairTables = BTreeMap<Pair, RegularizedTable>;

#[derive(Debug, Error)]
pub enum SimulationError {
    #[error("No table for pair {0}")]
    MissingTable(Pair),

    #[error("Invalid table for pair {pair}: {reason}")]
    InvalidTable { pair: Pair, reason: String },

    #[error("CSV error in '{path}': {source}")]
    Csv { path: String, source: csv::Error },

    #[error("Ensemble error: {source}")]
    Ensemble {
        #[from]
        source: EnsembleError,
    },

    #[error("Tabulation error: {source}")]
    Tabulator {
        #[from]
        source: TabulatorError,
    },

    #[error("Interpolation error: {source}")]
    Interpolation {
        #[from]
        source: InterpolationError,
    },

    #[error("Output directory error: {source}")]
    Directory {
        #[from]
        source: DirectoryError,
    },
}

/// A backend that measures structural observations for a tabulated model.
pub trait Simulation {
    /// Simulates `ensemble` with the pair interactions in `tables`.
    ///
    /// The returned ensemble has the thermodynamic state of the input and carries a
    /// radial distribution function for every pair of its types. Backends may write
    /// logs into `directory`.
    fn run(
        &self,
        ensemble: &Ensemble,
        tables: &PairTables,
        directory: Option<&Directory>,
    ) -> Result<Ensemble, SimulationError>;
}

/// Checks that `table` is usable as simulation input.
pub fn validate_table(pair: &Pair, table: &RegularizedTable) -> Result<(), SimulationError> {
    let invalid = |reason: String| SimulationError::InvalidTable {
        pair: pair.clone(),
        reason,
    };
    if table.len() < 2 {
        return Err(invalid(format!("needs at least 2 points, got {}", table.len())));
    }
    if table.u.len() != table.len() || table.f.len() != table.len() {
        return Err(invalid("columns differ in length".to_string()));
    }
    if !(table.r[0] > 0.0) {
        return Err(invalid(format!("first point must be at r > 0, got {}", table.r[0])));
    }
    let dr = table.r[1] - table.r[0];
    if !(dr > 0.0) {
        return Err(invalid("grid must be increasing".to_string()));
    }
    for w in table.r.windows(2) {
        if ((w[1] - w[0]) - dr).abs() > 1e-6 * dr {
            return Err(invalid("grid must be equally spaced".to_string()));
        }
    }
    Ok(())
}

#[derive(Debug, serde::Serialize)]
struct TableRow {
    r: f64,
    u: f64,
    f: f64,
}

/// File name for per-pair output, e.g. `rdf.A.B.csv`.
pub(crate) fn pair_file_name(prefix: &str, pair: &Pair) -> String {
    format!("{prefix}.{}.{}.csv", pair.first(), pair.second())
}

/// Writes each table as an `r,u,f` CSV named `table.<first>.<second>.csv`.
pub fn save_tables(tables: &PairTables, directory: &Directory) -> Result<(), SimulationError> {
    for (pair, table) in tables {
        write_table(&directory.file(&pair_file_name("table", pair)), table)?;
    }
    Ok(())
}

fn write_table(path: &Path, table: &RegularizedTable) -> Result<(), SimulationError> {
    let csv_error = |e| SimulationError::Csv {
        path: path.to_string_lossy().to_string(),
        source: e,
    };
    let mut writer = csv::Writer::from_path(path).map_err(csv_error)?;
    for [r, u, f] in table.rows() {
        writer.serialize(TableRow { r, u, f }).map_err(csv_error)?;
    }
    writer.flush().map_err(|e| SimulationError::Csv {
        path: path.to_string_lossy().to_string(),
        source: e.into(),
    })
}

/// The pair potentials of a model and the grid they are tabulated on.
#[derive(Debug)]
pub struct Potentials {
    pair: Vec<PairPotential>,
    tabulator: Tabulator,
}

impl Potentials {
    pub fn new(tabulator: Tabulator) -> Self {
        Self {
            pair: Vec::new(),
            tabulator,
        }
    }

    pub fn with_potential(mut self, potential: PairPotential) -> Self {
        self.pair.push(potential);
        self
    }

    pub fn push(&mut self, potential: PairPotential) {
        self.pair.push(potential);
    }

    pub fn potentials(&self) -> &[PairPotential] {
        &self.pair
    }

    pub fn potentials_mut(&mut self) -> &mut [PairPotential] {
        &mut self.pair
    }

    pub fn tabulator(&self) -> &Tabulator {
        &self.tabulator
    }

    /// Regularized total `(r, u, f)` tables for each pair in `pairs`.
    pub fn tabulate(&self, vars: &Variables, pairs: &[Pair]) -> Result<PairTables, TabulatorError> {
        pairs
            .iter()
            .map(|pair| {
                let u = self.tabulator.energy(vars, pair, &self.pair)?;
                let f = self.tabulator.force(vars, pair, &self.pair)?;
                Ok((pair.clone(), self.tabulator.regularize(&u, &f, false)?))
            })
            .collect()
    }

    /// Derivative of the total energy of `pair` with respect to `var` on the grid.
    pub fn derivative(
        &self,
        vars: &Variables,
        pair: &Pair,
        var: VarId,
    ) -> Result<Vec<f64>, TabulatorError> {
        self.tabulator.derivative(vars, pair, var, &self.pair)
    }

    /// Design variables of every potential, in first-seen order.
    pub fn design_variables(&self, vars: &Variables) -> Result<Vec<VarId>, ParameterError> {
        let mut design = Vec::new();
        for potential in &self.pair {
            for id in potential.coeff().design_variables(vars)? {
                if !design.contains(&id) {
                    design.push(id);
                }
            }
        }
        Ok(design)
    }

    /// Writes the coefficients of potential `n` to `potential.<n>.toml`.
    pub fn save(&self, vars: &Variables, directory: &Directory) -> Result<(), ParameterError> {
        for (n, potential) in self.pair.iter().enumerate() {
            potential
                .coeff()
                .save(vars, &directory.file(&format!("potential.{n}.toml")))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::potential::LennardJones;
    use tempfile::tempdir;

    fn lj_potentials(vars: &mut Variables) -> (Potentials, VarId, VarId) {
        let epsilon = vars.free("epsilon", 1.0);
        let sigma = vars.free("sigma", 0.9);
        let mut lj = PairPotential::new(["1"], LennardJones);
        let pair = Pair::new("1", "1");
        lj.coeff_mut().set(&pair, "epsilon", epsilon).unwrap();
        lj.coeff_mut().set(&pair, "sigma", sigma).unwrap();
        lj.coeff_mut().set(&pair, "rmax", 2.7).unwrap();
        let tabulator = Tabulator::uniform(3.6, 1000, Some(100.0), None).unwrap();
        (Potentials::new(tabulator).with_potential(lj), epsilon, sigma)
    }

    fn table(r: Vec<f64>) -> RegularizedTable {
        let n = r.len();
        RegularizedTable {
            rcut: r.last().copied().unwrap_or(0.0),
            r,
            u: vec![0.0; n],
            f: vec![0.0; n],
        }
    }

    #[test]
    fn tabulated_tables_are_valid_simulation_input() {
        let mut vars = Variables::new();
        let (potentials, _, _) = lj_potentials(&mut vars);
        let pair = Pair::new("1", "1");
        let tables = potentials.tabulate(&vars, &[pair.clone()]).unwrap();
        let table = &tables[&pair];
        assert_eq!(table.len(), 1000);
        validate_table(&pair, table).unwrap();
        assert!(table.u.iter().skip(750).all(|u| *u == 0.0));
    }

    #[test]
    fn validate_table_rejects_unusable_grids() {
        let pair = Pair::new("A", "B");
        assert!(validate_table(&pair, &table(vec![1.0])).is_err());
        assert!(validate_table(&pair, &table(vec![0.0, 1.0, 2.0])).is_err());
        assert!(validate_table(&pair, &table(vec![1.0, 2.0, 4.0])).is_err());
        assert!(validate_table(&pair, &table(vec![2.0, 1.0])).is_err());
        validate_table(&pair, &table(vec![0.5, 1.0, 1.5])).unwrap();
    }

    #[test]
    fn design_variables_skip_constants_and_duplicates() {
        let mut vars = Variables::new();
        let (mut potentials, epsilon, sigma) = lj_potentials(&mut vars);
        let mut second = PairPotential::new(["1"], LennardJones);
        second
            .coeff_mut()
            .set(&Pair::new("1", "1"), "epsilon", epsilon)
            .unwrap();
        potentials.push(second);
        assert_eq!(potentials.design_variables(&vars).unwrap(), vec![epsilon, sigma]);

        vars.set_constant(epsilon, true).unwrap();
        assert_eq!(potentials.design_variables(&vars).unwrap(), vec![sigma]);
    }

    #[test]
    fn save_writes_coefficients_and_tables() {
        let root = tempdir().unwrap();
        let dir = Directory::new(root.path()).unwrap();
        let mut vars = Variables::new();
        let (potentials, _, _) = lj_potentials(&mut vars);
        let pair = Pair::new("1", "1");

        potentials.save(&vars, &dir).unwrap();
        let content = std::fs::read_to_string(dir.file("potential.0.toml")).unwrap();
        assert!(content.contains("(1, 1)"));
        assert!(content.contains("rmax = 2.7"));

        let tables = potentials.tabulate(&vars, &[pair.clone()]).unwrap();
        save_tables(&tables, &dir).unwrap();
        let csv = std::fs::read_to_string(dir.file("table.1.1.csv")).unwrap();
        assert_eq!(csv.lines().next(), Some("r,u,f"));
        assert_eq!(csv.lines().count(), 1001);
    }
}
