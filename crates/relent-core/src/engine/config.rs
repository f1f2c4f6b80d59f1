use super::descent::{FixedStepDescent, Optimizer, SteepestDescent};
use super::line_search::LineSearch;
use crate::core::variable::{VarId, VarVector, Variables};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::Path;
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error, PartialEq, Eq, Clone)]
pub enum ConfigError {
    #[error("Missing required parameter: {0}")]
    MissingParameter(&'static str),

    #[error("Invalid value for '{name}': {reason}")]
    InvalidValue { name: &'static str, reason: String },

    #[error("Unknown variable '{0}' in configuration")]
    UnknownVariable(String),

    #[error("Failed to read configuration file '{path}': {message}")]
    File { path: String, message: String },
}

/// Absolute gradient tolerance used by the convergence test.
#[derive(Debug, Clone, PartialEq)]
pub enum Tolerance {
    Uniform(f64),
    /// Every design variable must have an entry.
    PerVariable(VarVector),
}

impl Tolerance {
    pub fn get(&self, id: VarId) -> Option<f64> {
        match self {
            Tolerance::Uniform(tol) => Some(*tol),
            Tolerance::PerVariable(tols) => tols.get(id),
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        let bad = match self {
            Tolerance::Uniform(tol) => !(*tol >= 0.0),
            Tolerance::PerVariable(tols) => tols.iter().any(|(_, tol)| !(tol >= 0.0)),
        };
        if bad {
            return Err(ConfigError::InvalidValue {
                name: "tolerance",
                reason: "must be non-negative".to_string(),
            });
        }
        Ok(())
    }
}

/// Per-variable rescaling of the gradient before stepping.
#[derive(Debug, Clone, PartialEq)]
pub enum Scale {
    Uniform(f64),
    /// Variables without an entry are unscaled.
    PerVariable(VarVector),
}

impl Default for Scale {
    fn default() -> Self {
        Scale::Uniform(1.0)
    }
}

impl Scale {
    pub fn get(&self, id: VarId) -> f64 {
        match self {
            Scale::Uniform(scale) => *scale,
            Scale::PerVariable(scales) => scales.get(id).unwrap_or(1.0),
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        let bad = match self {
            Scale::Uniform(scale) => !(*scale > 0.0),
            Scale::PerVariable(scales) => scales.iter().any(|(_, s)| !(s > 0.0)),
        };
        if bad {
            return Err(ConfigError::InvalidValue {
                name: "scale",
                reason: "must be positive".to_string(),
            });
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DescentSettings {
    pub max_iterations: usize,
    pub step_size: f64,
    pub scale: Scale,
    pub tolerance: Tolerance,
    pub line_search: Option<LineSearch>,
}

#[derive(Default)]
pub struct DescentSettingsBuilder {
    max_iterations: Option<usize>,
    step_size: Option<f64>,
    scale: Option<Scale>,
    tolerance: Option<Tolerance>,
    line_search: Option<LineSearch>,
}

impl DescentSettingsBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = Some(max_iterations);
        self
    }

    pub fn step_size(mut self, step_size: f64) -> Self {
        self.step_size = Some(step_size);
        self
    }

    pub fn scale(mut self, scale: Scale) -> Self {
        self.scale = Some(scale);
        self
    }

    pub fn tolerance(mut self, tolerance: Tolerance) -> Self {
        self.tolerance = Some(tolerance);
        self
    }

    pub fn line_search(mut self, line_search: LineSearch) -> Self {
        self.line_search = Some(line_search);
        self
    }

    pub fn build(self) -> Result<DescentSettings, ConfigError> {
        let max_iterations = self
            .max_iterations
            .ok_or(ConfigError::MissingParameter("max_iterations"))?;
        if max_iterations < 1 {
            return Err(ConfigError::InvalidValue {
                name: "max_iterations",
                reason: "must be at least 1".to_string(),
            });
        }
        let step_size = self
            .step_size
            .ok_or(ConfigError::MissingParameter("step_size"))?;
        if !(step_size > 0.0) {
            return Err(ConfigError::InvalidValue {
                name: "step_size",
                reason: "must be positive".to_string(),
            });
        }
        let tolerance = self
            .tolerance
            .ok_or(ConfigError::MissingParameter("tolerance"))?;
        tolerance.validate()?;
        let scale = self.scale.unwrap_or_default();
        scale.validate()?;

        Ok(DescentSettings {
            max_iterations,
            step_size,
            scale,
            tolerance,
            line_search: self.line_search,
        })
    }
}

#[derive(Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum Method {
    SteepestDescent,
    FixedStepDescent,
}

/// A single number applied to every variable, or a table keyed by variable name.
#[derive(Deserialize, Debug, Clone, PartialEq)]
#[serde(untagged)]
pub enum FileVariableValues {
    Uniform(f64),
    ByName(BTreeMap<String, f64>),
}

impl FileVariableValues {
    fn resolve(&self, vars: &Variables) -> Result<Result<f64, VarVector>, ConfigError> {
        match self {
            FileVariableValues::Uniform(value) => Ok(Ok(*value)),
            FileVariableValues::ByName(values) => {
                let mut resolved = VarVector::new();
                for (name, value) in values {
                    let id = vars
                        .find_by_name(name)
                        .ok_or_else(|| ConfigError::UnknownVariable(name.clone()))?;
                    resolved.insert(id, *value);
                }
                Ok(Err(resolved))
            }
        }
    }
}

#[derive(Deserialize, Debug, Clone, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct FileLineSearchConfig {
    #[serde(rename = "relative-tolerance")]
    pub relative_tolerance: f64,
    #[serde(rename = "max-iterations")]
    pub max_iterations: usize,
}

/// Optimizer settings as written in a TOML file.
///
/// ```toml
/// method = "steepest-descent"
/// max-iterations = 1000
/// step-size = 0.25
/// tolerance = 1e-8
/// scale = { epsilon = 0.5 }
///
/// [line-search]
/// relative-tolerance = 1e-5
/// max-iterations = 100
/// ```
#[derive(Deserialize, Debug, Clone, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct OptimizerConfig {
    pub method: Method,
    #[serde(rename = "max-iterations")]
    pub max_iterations: usize,
    #[serde(rename = "step-size")]
    pub step_size: f64,
    pub tolerance: FileVariableValues,
    pub scale: Option<FileVariableValues>,
    #[serde(rename = "line-search")]
    pub line_search: Option<FileLineSearchConfig>,
}

impl OptimizerConfig {
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        debug!("Loading optimizer configuration from {:?}", path);
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::File {
            path: path.to_string_lossy().to_string(),
            message: e.to_string(),
        })?;
        toml::from_str(&content).map_err(|e| ConfigError::File {
            path: path.to_string_lossy().to_string(),
            message: e.to_string(),
        })
    }

    /// Resolves variable names against `vars` and validates every setting.
    pub fn settings(&self, vars: &Variables) -> Result<DescentSettings, ConfigError> {
        let tolerance = match self.tolerance.resolve(vars)? {
            Ok(tol) => Tolerance::Uniform(tol),
            Err(tols) => Tolerance::PerVariable(tols),
        };
        let mut builder = DescentSettingsBuilder::new()
            .max_iterations(self.max_iterations)
            .step_size(self.step_size)
            .tolerance(tolerance);
        if let Some(scale) = &self.scale {
            builder = builder.scale(match scale.resolve(vars)? {
                Ok(s) => Scale::Uniform(s),
                Err(scales) => Scale::PerVariable(scales),
            });
        }
        if let Some(ls) = &self.line_search {
            builder = builder.line_search(LineSearch::new(ls.relative_tolerance, ls.max_iterations)?);
        }
        builder.build()
    }

    pub fn build(&self, vars: &Variables) -> Result<Optimizer, ConfigError> {
        let settings = self.settings(vars)?;
        Ok(match self.method {
            Method::SteepestDescent => Optimizer::SteepestDescent(SteepestDescent::new(settings)),
            Method::FixedStepDescent => {
                Optimizer::FixedStepDescent(FixedStepDescent::new(settings))
            }
        })
    }
}
