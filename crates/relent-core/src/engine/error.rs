use super::config::ConfigError;
use super::objective::ObjectiveError;
use crate::core::io::directory::DirectoryError;
use crate::core::variable::VariableError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Search interval is not a descent direction (target at start is {target})")]
    NotDescentDirection { target: f64 },

    #[error("Start and end of the search interval are identical")]
    DegenerateInterval,

    #[error("No convergence tolerance given for variable '{variable}'")]
    MissingTolerance { variable: String },

    #[error("Invalid optimizer configuration: {source}")]
    Config {
        #[from]
        source: ConfigError,
    },

    #[error("Objective evaluation failed: {source}")]
    Objective {
        #[from]
        source: ObjectiveError,
    },

    #[error("Variable error: {source}")]
    Variable {
        #[from]
        source: VariableError,
    },

    #[error("Output directory error: {source}")]
    Directory {
        #[from]
        source: DirectoryError,
    },
}
