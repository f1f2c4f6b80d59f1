//! # Pair Parameters
//!
//! Storage for named coefficients of every unordered pair drawn from a finite set
//! of particle types.
//!
//! ## Overview
//!
//! A [`Pair`] is canonical: `(A, B)` and `(B, A)` address the same slot. A
//! [`PairParameters`] matrix holds one [`ParamValue`] slot per pair and parameter
//! name, plus a shared layer consulted when the pair slot is unset. Evaluating a pair
//! resolves every slot to a concrete [`ParamSet`], reading variables through the
//! [`Variables`](crate::core::variable::Variables) arena.
//!
//! ## Persistence
//!
//! Matrices are saved as TOML, one table per pair label. Free variables keep their
//! bounds; dependent variables are written as their current value.

mod error;
mod matrix;
mod persist;
mod value;

pub use error::ParameterError;
pub use matrix::PairParameters;
pub use value::{ParamSet, ParamValue, Resolved};

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// An unordered pair of type names, stored in sorted order.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Pair {
    first: String,
    second: String,
}

impl Pair {
    /// Builds a pair without checking the names; see [`Pair::try_new`].
    pub fn new(a: impl Into<String>, b: impl Into<String>) -> Self {
        let (a, b) = (a.into(), b.into());
        if a <= b {
            Self { first: a, second: b }
        } else {
            Self { first: b, second: a }
        }
    }

    /// Builds a pair whose label survives a round trip through [`Display`](fmt::Display)
    /// and [`FromStr`].
    ///
    /// # Errors
    ///
    /// Returns [`ParameterError::InvalidTypeName`] if either name is rejected by
    /// [`Pair::check_type_name`].
    pub fn try_new(a: impl Into<String>, b: impl Into<String>) -> Result<Self, ParameterError> {
        let (a, b) = (a.into(), b.into());
        Self::check_type_name(&a)?;
        Self::check_type_name(&b)?;
        Ok(Self::new(a, b))
    }

    /// Type names may not be empty, carry surrounding whitespace, or contain the label
    /// delimiters `,`, `(` and `)`.
    pub fn check_type_name(name: &str) -> Result<(), ParameterError> {
        let delimited = name.contains([',', '(', ')']);
        if name.is_empty() || name.trim() != name || delimited {
            Err(ParameterError::InvalidTypeName(name.to_string()))
        } else {
            Ok(())
        }
    }

    pub fn first(&self) -> &str {
        &self.first
    }

    pub fn second(&self) -> &str {
        &self.second
    }

    /// True when both members are the same type.
    pub fn is_like(&self) -> bool {
        self.first == self.second
    }
}

impl fmt::Display for Pair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.first, self.second)
    }
}

impl FromStr for Pair {
    type Err = ParameterError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || ParameterError::InvalidPairLabel(s.to_string());
        let inner = s
            .trim()
            .strip_prefix('(')
            .and_then(|rest| rest.strip_suffix(')'))
            .ok_or_else(invalid)?;
        let mut parts = inner.split(',').map(str::trim);
        match (parts.next(), parts.next(), parts.next()) {
            (Some(a), Some(b), None) => Pair::try_new(a, b).map_err(|_| invalid()),
            _ => Err(invalid()),
        }
    }
}

impl<A: Into<String>, B: Into<String>> From<(A, B)> for Pair {
    fn from((a, b): (A, B)) -> Self {
        Pair::new(a, b)
    }
}

impl Serialize for Pair {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Pair {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let label = String::deserialize(deserializer)?;
        label.parse().map_err(serde::de::Error::custom)
    }
}
