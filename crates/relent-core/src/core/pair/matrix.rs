use super::Pair;
use super::error::ParameterError;
use super::value::{ParamSet, ParamValue, Resolved};
use crate::core::variable::{VarId, Variables};
use std::collections::BTreeMap;

#[derive(Debug, Clone)]
pub struct PairParameters {
    types: Vec<String>,
    params: Vec<String>,
    shared: BTreeMap<String, ParamValue>,
    entries: BTreeMap<Pair, BTreeMap<String, ParamValue>>,
}

impl PairParameters {
    /// Creates an empty matrix over `types` with the fixed parameter names `params`.
    pub fn new<T, P>(types: T, params: P) -> Self
    where
        T: IntoIterator,
        T::Item: Into<String>,
        P: IntoIterator,
        P::Item: Into<String>,
    {
        let mut types: Vec<String> = types.into_iter().map(Into::into).collect();
        types.sort();
        types.dedup();
        let mut param_names: Vec<String> = Vec::new();
        for name in params.into_iter().map(Into::into) {
            if !param_names.contains(&name) {
                param_names.push(name);
            }
        }
        Self {
            types,
            params: param_names,
            shared: BTreeMap::new(),
            entries: BTreeMap::new(),
        }
    }

    pub fn types(&self) -> &[String] {
        &self.types
    }

    pub fn params(&self) -> &[String] {
        &self.params
    }

    /// Every unordered pair of known types, like pairs included.
    pub fn pairs(&self) -> Vec<Pair> {
        let mut pairs = Vec::with_capacity(self.types.len() * (self.types.len() + 1) / 2);
        for (i, a) in self.types.iter().enumerate() {
            for b in &self.types[i..] {
                pairs.push(Pair::new(a.clone(), b.clone()));
            }
        }
        pairs
    }

    pub fn contains(&self, pair: &Pair) -> bool {
        self.types.iter().any(|t| t == pair.first()) && self.types.iter().any(|t| t == pair.second())
    }

    fn check_param(&self, name: &str) -> Result<(), ParameterError> {
        if self.params.iter().any(|p| p == name) {
            Ok(())
        } else {
            Err(ParameterError::UnknownParameter(name.to_string()))
        }
    }

    fn check(&self, pair: &Pair, name: &str) -> Result<(), ParameterError> {
        if !self.contains(pair) {
            return Err(ParameterError::UnknownPair(pair.clone()));
        }
        self.check_param(name)
    }

    /// The pair's own slot, without falling back to the shared layer.
    pub fn get(&self, pair: &Pair, name: &str) -> Result<Option<ParamValue>, ParameterError> {
        self.check(pair, name)?;
        Ok(self.entries.get(pair).and_then(|e| e.get(name)).copied())
    }

    pub fn set(
        &mut self,
        pair: &Pair,
        name: &str,
        value: impl Into<ParamValue>,
    ) -> Result<(), ParameterError> {
        self.check(pair, name)?;
        self.entries
            .entry(pair.clone())
            .or_default()
            .insert(name.to_string(), value.into());
        Ok(())
    }

    pub fn unset(&mut self, pair: &Pair, name: &str) -> Result<(), ParameterError> {
        self.check(pair, name)?;
        if let Some(entry) = self.entries.get_mut(pair) {
            entry.remove(name);
        }
        Ok(())
    }

    pub fn shared(&self, name: &str) -> Result<Option<ParamValue>, ParameterError> {
        self.check_param(name)?;
        Ok(self.shared.get(name).copied())
    }

    pub fn set_shared(&mut self, name: &str, value: impl Into<ParamValue>) -> Result<(), ParameterError> {
        self.check_param(name)?;
        self.shared.insert(name.to_string(), value.into());
        Ok(())
    }

    pub fn unset_shared(&mut self, name: &str) -> Result<(), ParameterError> {
        self.check_param(name)?;
        self.shared.remove(name);
        Ok(())
    }

    /// The effective slot for `pair`: its own value, else the shared default.
    pub fn resolve(&self, pair: &Pair, name: &str) -> Result<ParamValue, ParameterError> {
        match self.get(pair, name)? {
            Some(value) => Ok(value),
            None => self
                .shared
                .get(name)
                .copied()
                .ok_or_else(|| ParameterError::MissingValue {
                    pair: pair.clone(),
                    name: name.to_string(),
                }),
        }
    }

    /// Resolves every parameter of `pair` to a concrete value.
    ///
    /// # Errors
    ///
    /// Fails with [`ParameterError::MissingValue`] if any parameter is unset in both the
    /// pair slot and the shared layer.
    pub fn evaluate(&self, vars: &Variables, pair: &Pair) -> Result<ParamSet, ParameterError> {
        let mut set = ParamSet::new();
        for name in &self.params {
            let resolved = match self.resolve(pair, name)? {
                ParamValue::Scalar(x) => Resolved::Number(x),
                ParamValue::Flag(b) => Resolved::Flag(b),
                ParamValue::Variable(id) => Resolved::Number(vars.value(id)?),
            };
            set.insert(name.clone(), resolved);
        }
        Ok(set)
    }

    /// Evaluates `pair` with the slot `name` temporarily replaced by `value`.
    ///
    /// # Return
    ///
    /// `(perturbed, original)` parameter sets. The matrix itself is left untouched.
    ///
    /// # Errors
    ///
    /// Returns [`ParameterError::UnknownParameter`] if `name` is not a slot of the matrix.
    pub fn perturb(
        &self,
        vars: &Variables,
        pair: &Pair,
        name: &str,
        value: f64,
    ) -> Result<(ParamSet, ParamSet), ParameterError> {
        self.check(pair, name)?;
        let original = self.evaluate(vars, pair)?;
        let mut perturbed = original.clone();
        perturbed.insert(name, Resolved::Number(value));
        Ok((perturbed, original))
    }

    /// Variables referenced by any slot, directly or through their dependencies.
    pub fn variables(&self) -> Vec<VarId> {
        let mut ids = Vec::new();
        let slots = self
            .shared
            .values()
            .chain(self.entries.values().flat_map(|e| e.values()));
        for slot in slots {
            if let Some(id) = slot.as_variable() {
                if !ids.contains(&id) {
                    ids.push(id);
                }
            }
        }
        ids
    }

    /// The non-constant free variables reachable from any slot.
    pub fn design_variables(&self, vars: &Variables) -> Result<Vec<VarId>, ParameterError> {
        let mut design = Vec::new();
        for id in self.variables() {
            for ancestor in vars.free_ancestors(id)? {
                if !design.contains(&ancestor) {
                    design.push(ancestor);
                }
            }
        }
        Ok(design)
    }
}
