use crate::core::math::InterpolationError;
use crate::core::pair::ParameterError;
use crate::core::variable::VariableError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PotentialError {
    #[error("Invalid value for parameter '{name}': {reason}")]
    InvalidParameter { name: String, reason: String },

    #[error("Energy cannot be differentiated with respect to '{0}'")]
    NotDifferentiable(String),

    #[error("Coefficient error: {source}")]
    Parameter {
        #[from]
        source: ParameterError,
    },

    #[error("Variable error: {source}")]
    Variable {
        #[from]
        source: VariableError,
    },

    #[error("Interpolation error: {source}")]
    Interpolation {
        #[from]
        source: InterpolationError,
    },
}

impl PotentialError {
    pub(crate) fn invalid(name: &str, reason: impl Into<String>) -> Self {
        PotentialError::InvalidParameter {
            name: name.to_string(),
            reason: reason.into(),
        }
    }
}
