use super::Pair;
use super::error::ParameterError;
use super::matrix::PairParameters;
use super::value::ParamValue;
use crate::core::variable::Variables;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
enum StoredValue {
    Flag(bool),
    Number(f64),
    Variable {
        value: f64,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        low: Option<f64>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        high: Option<f64>,
        #[serde(rename = "const", default, skip_serializing_if = "std::ops::Not::not")]
        constant: bool,
    },
}

type StoredMatrix = BTreeMap<String, BTreeMap<String, StoredValue>>;

fn path_label(path: &Path) -> String {
    path.to_string_lossy().to_string()
}

fn read_stored(path: &Path) -> Result<StoredMatrix, ParameterError> {
    let content = std::fs::read_to_string(path).map_err(|e| ParameterError::Io {
        path: path_label(path),
        source: e,
    })?;
    toml::from_str(&content).map_err(|e| ParameterError::TomlParse {
        path: path_label(path),
        source: e,
    })
}

impl PairParameters {
    /// Writes the effective value of every set slot to `path` as TOML.
    ///
    /// Shared defaults are folded into each pair, so loading the file into a fresh
    /// matrix reproduces [`PairParameters::evaluate`] for every pair.
    ///
    /// # Errors
    ///
    /// Returns [`ParameterError::InvalidTypeName`] before writing anything if a type name
    /// could not be read back from its pair label.
    pub fn save(&self, vars: &Variables, path: &Path) -> Result<(), ParameterError> {
        for name in self.types() {
            Pair::check_type_name(name)?;
        }
        let mut stored = StoredMatrix::new();
        for pair in self.pairs() {
            let mut entry = BTreeMap::new();
            for name in self.params() {
                let value = match self.resolve(&pair, name) {
                    Ok(value) => value,
                    Err(ParameterError::MissingValue { .. }) => continue,
                    Err(e) => return Err(e),
                };
                let value = match value {
                    ParamValue::Scalar(x) => StoredValue::Number(x),
                    ParamValue::Flag(b) => StoredValue::Flag(b),
                    ParamValue::Variable(id) if vars.is_dependent(id)? => {
                        StoredValue::Number(vars.value(id)?)
                    }
                    ParamValue::Variable(id) => {
                        let (low, high) = vars.bounds(id)?;
                        StoredValue::Variable {
                            value: vars.value(id)?,
                            low,
                            high,
                            constant: vars.is_constant(id)?,
                        }
                    }
                };
                entry.insert(name.clone(), value);
            }
            if !entry.is_empty() {
                stored.insert(pair.to_string(), entry);
            }
        }

        let content = toml::to_string(&stored).map_err(|e| ParameterError::TomlWrite {
            path: path_label(path),
            source: e,
        })?;
        std::fs::write(path, content).map_err(|e| ParameterError::Io {
            path: path_label(path),
            source: e,
        })
    }

    /// Reads slots from a file written by [`PairParameters::save`].
    ///
    /// Stored variables become new variables in `vars`, named `"<param><pair>"`.
    pub fn load(&mut self, vars: &mut Variables, path: &Path) -> Result<(), ParameterError> {
        let stored = read_stored(path)?;
        self.apply(vars, stored)
    }

    /// Builds a matrix whose types and parameter names are taken from the file itself.
    pub fn from_file(vars: &mut Variables, path: &Path) -> Result<Self, ParameterError> {
        let stored = read_stored(path)?;
        let mut types = Vec::new();
        let mut params = Vec::new();
        for (label, entry) in &stored {
            let pair: Pair = label.parse()?;
            types.push(pair.first().to_string());
            types.push(pair.second().to_string());
            params.extend(entry.keys().cloned());
        }
        params.sort();
        let mut matrix = PairParameters::new(types, params);
        matrix.apply(vars, stored)?;
        Ok(matrix)
    }

    fn apply(&mut self, vars: &mut Variables, stored: StoredMatrix) -> Result<(), ParameterError> {
        for (label, entry) in stored {
            let pair: Pair = label.parse()?;
            for (name, value) in entry {
                let value = match value {
                    StoredValue::Number(x) => ParamValue::Scalar(x),
                    StoredValue::Flag(b) => ParamValue::Flag(b),
                    StoredValue::Variable {
                        value,
                        low,
                        high,
                        constant,
                    } => {
                        let id = vars
                            .design(format!("{name}{pair}"), value, low, high)
                            .map_err(|e| ParameterError::InvalidEntry {
                                pair: label.clone(),
                                name: name.clone(),
                                reason: e.to_string(),
                            })?;
                        vars.set_constant(id, constant)?;
                        ParamValue::Variable(id)
                    }
                };
                self.set(&pair, &name, value)?;
            }
        }
        Ok(())
    }
}
