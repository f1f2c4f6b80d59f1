use super::error::ParameterError;
use crate::core::variable::VarId;
use std::collections::BTreeMap;

/// The content of one parameter slot.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ParamValue {
    Scalar(f64),
    Flag(bool),
    Variable(VarId),
}

impl From<f64> for ParamValue {
    fn from(value: f64) -> Self {
        ParamValue::Scalar(value)
    }
}

impl From<bool> for ParamValue {
    fn from(value: bool) -> Self {
        ParamValue::Flag(value)
    }
}

impl From<VarId> for ParamValue {
    fn from(value: VarId) -> Self {
        ParamValue::Variable(value)
    }
}

impl ParamValue {
    pub fn as_variable(&self) -> Option<VarId> {
        match self {
            ParamValue::Variable(id) => Some(*id),
            _ => None,
        }
    }
}

/// A parameter slot after variable resolution.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Resolved {
    Number(f64),
    Flag(bool),
}

/// Concrete values of every parameter of one pair.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParamSet {
    values: BTreeMap<String, Resolved>,
}

impl ParamSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, value: Resolved) {
        self.values.insert(name.into(), value);
    }

    pub fn get(&self, name: &str) -> Option<Resolved> {
        self.values.get(name).copied()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }

    pub fn number(&self, name: &str) -> Result<f64, ParameterError> {
        match self.get(name) {
            Some(Resolved::Number(x)) => Ok(x),
            Some(Resolved::Flag(_)) => Err(ParameterError::WrongKind {
                name: name.to_string(),
                expected: "a number",
            }),
            None => Err(ParameterError::UnknownParameter(name.to_string())),
        }
    }

    pub fn flag(&self, name: &str) -> Result<bool, ParameterError> {
        match self.get(name) {
            Some(Resolved::Flag(b)) => Ok(b),
            Some(Resolved::Number(_)) => Err(ParameterError::WrongKind {
                name: name.to_string(),
                expected: "a boolean",
            }),
            None => Err(ParameterError::UnknownParameter(name.to_string())),
        }
    }

    /// Reads a cutoff slot: `false` disables it, a number sets it.
    pub fn cutoff(&self, name: &str) -> Result<Option<f64>, ParameterError> {
        match self.get(name) {
            Some(Resolved::Flag(false)) => Ok(None),
            Some(Resolved::Number(x)) => Ok(Some(x)),
            Some(Resolved::Flag(true)) => Err(ParameterError::WrongKind {
                name: name.to_string(),
                expected: "a number or false",
            }),
            None => Err(ParameterError::UnknownParameter(name.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cutoff_reads_false_as_disabled() {
        let mut set = ParamSet::new();
        set.insert("rmax", Resolved::Flag(false));
        set.insert("rmin", Resolved::Number(0.5));
        set.insert("bad", Resolved::Flag(true));
        assert_eq!(set.cutoff("rmax").unwrap(), None);
        assert_eq!(set.cutoff("rmin").unwrap(), Some(0.5));
        assert!(matches!(
            set.cutoff("bad"),
            Err(ParameterError::WrongKind { .. })
        ));
        assert!(matches!(
            set.number("missing"),
            Err(ParameterError::UnknownParameter(_))
        ));
    }
}
