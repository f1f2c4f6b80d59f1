use super::Pair;
use crate::core::variable::VariableError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ParameterError {
    #[error("Unknown parameter '{0}'")]
    UnknownParameter(String),

    #[error("Pair {0} is not made of known types")]
    UnknownPair(Pair),

    #[error("Parameter '{name}' is not set for pair {pair}")]
    MissingValue { pair: Pair, name: String },

    #[error("Parameter '{name}' of pair {pair} is not a variable and cannot be differentiated")]
    NotDifferentiable { pair: Pair, name: String },

    #[error("Parameter '{name}' must be {expected}")]
    WrongKind { name: String, expected: &'static str },

    #[error("Invalid pair label '{0}', expected '(A, B)'")]
    InvalidPairLabel(String),

    #[error("Invalid type name '{0}': names must be non-empty and free of surrounding whitespace and of ',', '(' and ')'")]
    InvalidTypeName(String),

    #[error("Invalid entry '{name}' for pair {pair}: {reason}")]
    InvalidEntry {
        pair: String,
        name: String,
        reason: String,
    },

    #[error("Variable error: {source}")]
    Variable {
        #[from]
        source: VariableError,
    },

    #[error("File I/O error for '{path}': {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },

    #[error("Failed to parse parameter file '{path}': {source}")]
    TomlParse {
        path: String,
        source: toml::de::Error,
    },

    #[error("Failed to write parameter file '{path}': {source}")]
    TomlWrite {
        path: String,
        source: toml::ser::Error,
    },
}
