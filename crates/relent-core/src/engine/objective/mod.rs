mod relative_entropy;

pub use relative_entropy::RelativeEntropy;

use crate::core::ensemble::EnsembleError;
use crate::core::io::directory::{Directory, DirectoryError};
use crate::core::pair::{Pair, ParameterError};
use crate::core::potential::PotentialError;
use crate::core::potential::tabulator::TabulatorError;
use crate::core::variable::{VarId, VarVector, VariableError, Variables};
use crate::simulate::SimulationError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ObjectiveError {
    #[error("No {ensemble} radial distribution function for pair {pair}")]
    MissingRdf { pair: Pair, ensemble: &'static str },

    #[error("Variable error: {source}")]
    Variable {
        #[from]
        source: VariableError,
    },

    #[error("Parameter error: {source}")]
    Parameter {
        #[from]
        source: ParameterError,
    },

    #[error("Potential error: {source}")]
    Potential {
        #[from]
        source: PotentialError,
    },

    #[error("Tabulation error: {source}")]
    Tabulator {
        #[from]
        source: TabulatorError,
    },

    #[error("Ensemble error: {source}")]
    Ensemble {
        #[from]
        source: EnsembleError,
    },

    #[error("Simulation failed: {source}")]
    Simulation {
        #[from]
        source: SimulationError,
    },

    #[error("Output directory error: {source}")]
    Directory {
        #[from]
        source: DirectoryError,
    },
}

/// The outcome of one evaluation of an [`ObjectiveFunction`].
///
/// The design-variable values are captured when the result is built, so later
/// changes to the arena do not alter what the result reports.
#[derive(Debug, Clone, PartialEq)]
pub struct ObjectiveFunctionResult {
    value: Option<f64>,
    gradient: VarVector,
    variables: VarVector,
    directory: Option<Directory>,
}

impl ObjectiveFunctionResult {
    /// Builds a result for the variables in `design`.
    ///
    /// Gradient entries for variables outside `design` are dropped and missing
    /// entries are taken as zero.
    pub fn new(
        vars: &Variables,
        design: &[VarId],
        value: Option<f64>,
        gradient: &VarVector,
        directory: Option<&Directory>,
    ) -> Result<Self, VariableError> {
        let gradient = design
            .iter()
            .map(|id| (*id, gradient.get(*id).unwrap_or(0.0)))
            .collect();
        Ok(Self {
            value,
            gradient,
            variables: vars.values_of(design)?,
            directory: directory.cloned(),
        })
    }

    pub fn value(&self) -> Option<f64> {
        self.value
    }

    pub fn gradient(&self) -> &VarVector {
        &self.gradient
    }

    /// Design-variable values at the time of evaluation.
    pub fn variables(&self) -> &VarVector {
        &self.variables
    }

    pub fn directory(&self) -> Option<&Directory> {
        self.directory.as_ref()
    }
}

/// A scalar function of the design variables that the optimizers minimize.
///
/// `compute` must be deterministic in the current variable values. It receives the
/// arena by shared reference and so cannot change them.
pub trait ObjectiveFunction {
    /// Non-constant variables the objective depends on.
    fn design_variables(&self, vars: &Variables) -> Result<Vec<VarId>, ObjectiveError>;

    /// Evaluates the objective and its gradient, optionally writing diagnostics
    /// into `directory`.
    fn compute(
        &self,
        vars: &Variables,
        directory: Option<&Directory>,
    ) -> Result<ObjectiveFunctionResult, ObjectiveError>;
}

#[cfg(test)]
pub(crate) mod quadratic {
    use super::*;

    /// `f = Σ (x - 1)²` over the held variables.
    pub(crate) struct Quadratic {
        pub(crate) vars: Vec<VarId>,
    }

    impl ObjectiveFunction for Quadratic {
        fn design_variables(&self, vars: &Variables) -> Result<Vec<VarId>, ObjectiveError> {
            let mut design = Vec::new();
            for id in &self.vars {
                if !vars.is_constant(*id)? {
                    design.push(*id);
                }
            }
            Ok(design)
        }

        fn compute(
            &self,
            vars: &Variables,
            directory: Option<&Directory>,
        ) -> Result<ObjectiveFunctionResult, ObjectiveError> {
            let mut value = 0.0;
            let mut gradient = VarVector::new();
            for id in &self.vars {
                let x = vars.value(*id)?;
                value += (x - 1.0).powi(2);
                gradient.insert(*id, 2.0 * (x - 1.0));
            }
            if let Some(dir) = directory {
                let _ = std::fs::write(dir.file("x.log"), format!("{value}\n"));
            }
            let design = self.design_variables(vars)?;
            Ok(ObjectiveFunctionResult::new(
                vars,
                &design,
                Some(value),
                &gradient,
                directory,
            )?)
        }
    }
}
