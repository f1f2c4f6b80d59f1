//! # Variables
//!
//! Scalar quantities that parametrize potentials and the dependency graph that
//! connects them.
//!
//! ## Overview
//!
//! All variables live in a single [`Variables`] arena and are addressed by a
//! [`VarId`]. A variable is either *free* (it owns a value, optional bounds and a
//! `const` flag) or *dependent* (its value is a [`Dependency`] of other variables,
//! recomputed every time it is read).
//!
//! ## Derivatives
//!
//! [`Variables::derivative`] applies the chain rule through the graph: a variable
//! differentiated with respect to itself is one, a free variable with respect to
//! any other variable is zero, and a dependent variable sums the partials of its
//! inputs weighted by the inputs' own derivatives. Aliases created with
//! [`Variables::same_as`] are transparent in both directions.
//!
//! A dependent variable can only be built from identifiers that already exist in
//! the arena, so the graph is acyclic by construction.

mod dependency;
mod ids;
mod vector;

pub use dependency::Dependency;
pub use ids::VarId;
pub use vector::VarVector;

use slotmap::SlotMap;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum VariableError {
    #[error("Unknown variable: {0:?}")]
    Unknown(VarId),

    #[error("Variable '{name}' has invalid bounds: low {low} is greater than high {high}")]
    InvalidBounds { name: String, low: f64, high: f64 },

    #[error("Variable '{0}' is dependent and cannot be assigned a value")]
    ReadOnly(String),

    #[error("Variable '{name}' cannot take the non-finite value {value}")]
    NonFinite { name: String, value: f64 },

    #[error("Invalid dependency for variable '{name}': {reason}")]
    InvalidDependency { name: String, reason: String },
}

/// Whether the last assignment to a free variable was clamped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BoundState {
    #[default]
    Free,
    Low,
    High,
}

#[derive(Debug, Clone)]
struct FreeVariable {
    value: f64,
    low: Option<f64>,
    high: Option<f64>,
    constant: bool,
    state: BoundState,
}

impl FreeVariable {
    fn clamp(&mut self, value: f64) -> f64 {
        let (value, state) = match (self.low, self.high) {
            (Some(low), _) if value <= low => (low, BoundState::Low),
            (_, Some(high)) if value >= high => (high, BoundState::High),
            _ => (value, BoundState::Free),
        };
        self.value = value;
        self.state = state;
        value
    }
}

#[derive(Debug, Clone)]
enum Node {
    Free(FreeVariable),
    Dependent(Dependency),
}

#[derive(Debug, Clone)]
struct Variable {
    name: String,
    node: Node,
}

#[derive(Debug, Clone, Default)]
pub struct Variables {
    nodes: SlotMap<VarId, Variable>,
}

impl Variables {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an unbounded, non-constant free variable.
    pub fn free(&mut self, name: impl Into<String>, value: f64) -> VarId {
        self.insert_free(name.into(), value, None, None, false)
    }

    /// Creates a bounded design variable.
    ///
    /// The initial value is clamped to the bounds exactly as a later [`Variables::set`] would be.
    ///
    /// # Errors
    ///
    /// Returns [`VariableError::InvalidBounds`] if `low > high`.
    pub fn design(
        &mut self,
        name: impl Into<String>,
        value: f64,
        low: Option<f64>,
        high: Option<f64>,
    ) -> Result<VarId, VariableError> {
        let name = name.into();
        if let (Some(low), Some(high)) = (low, high) {
            if low > high {
                return Err(VariableError::InvalidBounds { name, low, high });
            }
        }
        Ok(self.insert_free(name, value, low, high, false))
    }

    /// Creates a free variable excluded from design-variable enumeration.
    pub fn constant(&mut self, name: impl Into<String>, value: f64) -> VarId {
        self.insert_free(name.into(), value, None, None, true)
    }

    /// Creates a variable whose value is a function of existing variables.
    ///
    /// # Errors
    ///
    /// Fails if an input is unknown to this arena or if the dependency is malformed
    /// (for example an empty mean).
    pub fn dependent(
        &mut self,
        name: impl Into<String>,
        dependency: Dependency,
    ) -> Result<VarId, VariableError> {
        let name = name.into();
        for input in dependency.inputs() {
            if !self.nodes.contains_key(input) {
                return Err(VariableError::Unknown(input));
            }
        }
        dependency
            .validate()
            .map_err(|reason| VariableError::InvalidDependency {
                name: name.clone(),
                reason,
            })?;
        Ok(self.nodes.insert(Variable {
            name,
            node: Node::Dependent(dependency),
        }))
    }

    /// Creates an alias that reads as, and differentiates like, `target`.
    pub fn same_as(&mut self, name: impl Into<String>, target: VarId) -> Result<VarId, VariableError> {
        self.dependent(name, Dependency::SameAs(target))
    }

    fn insert_free(
        &mut self,
        name: String,
        value: f64,
        low: Option<f64>,
        high: Option<f64>,
        constant: bool,
    ) -> VarId {
        let mut free = FreeVariable {
            value,
            low,
            high,
            constant,
            state: BoundState::Free,
        };
        free.clamp(value);
        self.nodes.insert(Variable {
            name,
            node: Node::Free(free),
        })
    }

    fn node(&self, id: VarId) -> Result<&Variable, VariableError> {
        self.nodes.get(id).ok_or(VariableError::Unknown(id))
    }

    fn free_mut(&mut self, id: VarId) -> Result<&mut FreeVariable, VariableError> {
        let var = self.nodes.get_mut(id).ok_or(VariableError::Unknown(id))?;
        match &mut var.node {
            Node::Free(free) => Ok(free),
            Node::Dependent(_) => Err(VariableError::ReadOnly(var.name.clone())),
        }
    }

    pub fn contains(&self, id: VarId) -> bool {
        self.nodes.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn ids(&self) -> impl Iterator<Item = VarId> + '_ {
        self.nodes.keys()
    }

    pub fn name(&self, id: VarId) -> Result<&str, VariableError> {
        Ok(self.node(id)?.name.as_str())
    }

    /// Looks up the first variable carrying `name`.
    pub fn find_by_name(&self, name: &str) -> Option<VarId> {
        self.nodes
            .iter()
            .find(|(_, var)| var.name == name)
            .map(|(id, _)| id)
    }

    /// Returns the current value, recomputing dependent variables from their inputs.
    pub fn value(&self, id: VarId) -> Result<f64, VariableError> {
        match &self.node(id)?.node {
            Node::Free(free) => Ok(free.value),
            Node::Dependent(dep) => {
                let inputs = dep
                    .inputs()
                    .into_iter()
                    .map(|input| self.value(input))
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(dep.evaluate(&inputs))
            }
        }
    }

    /// Assigns a value to a free variable, clamping it into the bounds.
    ///
    /// # Return
    ///
    /// The value actually stored after clamping.
    ///
    /// # Errors
    ///
    /// Returns [`VariableError::ReadOnly`] for dependent variables and
    /// [`VariableError::NonFinite`] for NaN or infinite values, leaving the variable unchanged.
    pub fn set(&mut self, id: VarId, value: f64) -> Result<f64, VariableError> {
        if !value.is_finite() {
            // Dependent variables still report ReadOnly first.
            self.free_mut(id)?;
            return Err(VariableError::NonFinite {
                name: self.name(id)?.to_string(),
                value,
            });
        }
        Ok(self.free_mut(id)?.clamp(value))
    }

    pub fn bounds(&self, id: VarId) -> Result<(Option<f64>, Option<f64>), VariableError> {
        match &self.node(id)?.node {
            Node::Free(free) => Ok((free.low, free.high)),
            Node::Dependent(_) => Ok((None, None)),
        }
    }

    pub fn bound_state(&self, id: VarId) -> Result<BoundState, VariableError> {
        match &self.node(id)?.node {
            Node::Free(free) => Ok(free.state),
            Node::Dependent(_) => Ok(BoundState::Free),
        }
    }

    pub fn is_dependent(&self, id: VarId) -> Result<bool, VariableError> {
        Ok(matches!(self.node(id)?.node, Node::Dependent(_)))
    }

    /// Dependent variables are never constant; their freedom comes from their inputs.
    pub fn is_constant(&self, id: VarId) -> Result<bool, VariableError> {
        match &self.node(id)?.node {
            Node::Free(free) => Ok(free.constant),
            Node::Dependent(_) => Ok(false),
        }
    }

    pub fn set_constant(&mut self, id: VarId, constant: bool) -> Result<(), VariableError> {
        self.free_mut(id)?.constant = constant;
        Ok(())
    }

    pub fn dependency(&self, id: VarId) -> Result<Option<&Dependency>, VariableError> {
        match &self.node(id)?.node {
            Node::Free(_) => Ok(None),
            Node::Dependent(dep) => Ok(Some(dep)),
        }
    }

    /// Follows a chain of [`Dependency::SameAs`] links to the variable it names.
    pub fn resolve_alias(&self, mut id: VarId) -> Result<VarId, VariableError> {
        while let Node::Dependent(Dependency::SameAs(target)) = &self.node(id)?.node {
            id = *target;
        }
        Ok(id)
    }

    /// The non-constant free variables that `id` ultimately depends on, in first-seen order.
    ///
    /// A free variable is its own (sole) ancestor unless it is constant.
    pub fn free_ancestors(&self, id: VarId) -> Result<Vec<VarId>, VariableError> {
        let mut found = Vec::new();
        self.collect_free_ancestors(id, &mut found)?;
        Ok(found)
    }

    fn collect_free_ancestors(&self, id: VarId, found: &mut Vec<VarId>) -> Result<(), VariableError> {
        match &self.node(id)?.node {
            Node::Free(free) => {
                if !free.constant && !found.contains(&id) {
                    found.push(id);
                }
            }
            Node::Dependent(dep) => {
                for input in dep.inputs() {
                    self.collect_free_ancestors(input, found)?;
                }
            }
        }
        Ok(())
    }

    /// Derivative of `of` with respect to `wrt`.
    ///
    /// # Arguments
    ///
    /// * `of` - The variable being differentiated.
    /// * `wrt` - The variable to differentiate with respect to. Aliases are resolved first,
    ///   so differentiating with respect to an alias equals differentiating with respect to
    ///   the variable it names.
    pub fn derivative(&self, of: VarId, wrt: VarId) -> Result<f64, VariableError> {
        let wrt = self.resolve_alias(wrt)?;
        self.chain(of, wrt)
    }

    fn chain(&self, of: VarId, wrt: VarId) -> Result<f64, VariableError> {
        if of == wrt {
            return Ok(1.0);
        }
        match &self.node(of)?.node {
            Node::Free(_) => Ok(0.0),
            Node::Dependent(dep) => {
                let inputs = dep.inputs();
                let values = inputs
                    .iter()
                    .map(|input| self.value(*input))
                    .collect::<Result<Vec<_>, _>>()?;
                let partials = dep.partials(&values);
                let mut total = 0.0;
                for (input, partial) in inputs.into_iter().zip(partials) {
                    let inner = self.chain(input, wrt)?;
                    if inner != 0.0 {
                        total += partial * inner;
                    }
                }
                Ok(total)
            }
        }
    }

    /// Snapshot of the current values of `ids`.
    pub fn values_of(&self, ids: &[VarId]) -> Result<VarVector, VariableError> {
        ids.iter()
            .map(|id| Ok((*id, self.value(*id)?)))
            .collect()
    }

    /// Writes back values recorded by [`Variables::values_of`].
    pub fn restore(&mut self, values: &VarVector) -> Result<(), VariableError> {
        for (id, value) in values.iter() {
            self.set(id, value)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TOLERANCE: f64 = 1e-9;

    fn f64_approx_equal(a: f64, b: f64) -> bool {
        (a - b).abs() < TOLERANCE
    }

    fn finite_difference(vars: &mut Variables, of: VarId, wrt: VarId) -> f64 {
        let h = 1e-6;
        let x0 = vars.value(wrt).unwrap();
        vars.set(wrt, x0 + h).unwrap();
        let up = vars.value(of).unwrap();
        vars.set(wrt, x0 - h).unwrap();
        let down = vars.value(of).unwrap();
        vars.set(wrt, x0).unwrap();
        (up - down) / (2.0 * h)
    }

    fn assert_relative(actual: f64, expected: f64) {
        let scale = expected.abs().max(1.0);
        assert!(
            (actual - expected).abs() / scale < 1e-6,
            "{actual} vs {expected}"
        );
    }

    #[test]
    fn variable_derivative_with_respect_to_itself_is_one() {
        let mut vars = Variables::new();
        let x = vars.free("x", 2.0);
        let y = vars.free("y", 3.0);
        assert_eq!(vars.derivative(x, x).unwrap(), 1.0);
        assert_eq!(vars.derivative(x, y).unwrap(), 0.0);
    }

    #[test]
    fn set_clamps_to_bounds_and_records_state() {
        let mut vars = Variables::new();
        let x = vars.design("x", 1.0, Some(0.0), Some(2.0)).unwrap();
        assert!(f64_approx_equal(vars.set(x, -1.0).unwrap(), 0.0));
        assert_eq!(vars.bound_state(x).unwrap(), BoundState::Low);
        assert!(f64_approx_equal(vars.set(x, 5.0).unwrap(), 2.0));
        assert_eq!(vars.bound_state(x).unwrap(), BoundState::High);
        assert!(f64_approx_equal(vars.set(x, 1.5).unwrap(), 1.5));
        assert_eq!(vars.bound_state(x).unwrap(), BoundState::Free);
    }

    #[test]
    fn initial_value_outside_bounds_is_clamped() {
        let mut vars = Variables::new();
        let x = vars.design("x", 10.0, None, Some(3.0)).unwrap();
        assert_eq!(vars.value(x).unwrap(), 3.0);
    }

    #[test]
    fn inverted_bounds_are_rejected() {
        let mut vars = Variables::new();
        let result = vars.design("x", 1.0, Some(2.0), Some(1.0));
        assert!(matches!(result, Err(VariableError::InvalidBounds { .. })));
    }

    #[test]
    fn dependent_variable_is_read_only() {
        let mut vars = Variables::new();
        let a = vars.free("a", 1.0);
        let b = vars.free("b", 2.0);
        let z = vars.dependent("z", Dependency::Sum(a, b)).unwrap();
        assert!(matches!(vars.set(z, 1.0), Err(VariableError::ReadOnly(_))));
    }

    #[test]
    fn dependent_value_tracks_inputs() {
        let mut vars = Variables::new();
        let a = vars.free("a", 1.0);
        let b = vars.free("b", 2.0);
        let z = vars.dependent("z", Dependency::Product(a, b)).unwrap();
        assert_eq!(vars.value(z).unwrap(), 2.0);
        vars.set(a, 4.0).unwrap();
        assert_eq!(vars.value(z).unwrap(), 8.0);
    }

    #[test]
    fn product_of_variable_with_itself_doubles_derivative() {
        let mut vars = Variables::new();
        let x = vars.free("x", 3.0);
        let z = vars.dependent("z", Dependency::Product(x, x)).unwrap();
        assert!(f64_approx_equal(vars.derivative(z, x).unwrap(), 6.0));
    }

    #[test]
    fn chained_dependencies_match_finite_differences() {
        let mut vars = Variables::new();
        let a = vars.free("a", 1.3);
        let b = vars.free("b", 0.7);
        let q = vars.dependent("q", Dependency::Quotient(a, b)).unwrap();
        let p = vars.dependent("p", Dependency::Power(q, 2.5)).unwrap();
        let g = vars
            .dependent("g", Dependency::GeometricMean(vec![p, b]))
            .unwrap();
        let m = vars
            .dependent("m", Dependency::ArithmeticMean(vec![g, a, q]))
            .unwrap();
        let d = vars.dependent("d", Dependency::Difference(m, b)).unwrap();

        for wrt in [a, b] {
            let exact = vars.derivative(d, wrt).unwrap();
            let numeric = finite_difference(&mut vars, d, wrt);
            assert_relative(exact, numeric);
        }
    }

    #[test]
    fn alias_is_transparent_for_derivatives() {
        let mut vars = Variables::new();
        let x = vars.free("x", 2.0);
        let alias = vars.same_as("x'", x).unwrap();
        let z = vars.dependent("z", Dependency::Power(x, 2.0)).unwrap();
        assert_eq!(vars.value(alias).unwrap(), 2.0);
        assert_eq!(vars.derivative(alias, alias).unwrap(), 1.0);
        assert_eq!(vars.derivative(alias, x).unwrap(), 1.0);
        assert!(f64_approx_equal(vars.derivative(z, alias).unwrap(), 4.0));
    }

    #[test]
    fn dependency_on_unknown_variable_is_rejected() {
        let mut other = Variables::new();
        let stranger = other.free("s", 1.0);
        let mut vars = Variables::new();
        let result = vars.dependent("z", Dependency::SameAs(stranger));
        assert!(matches!(result, Err(VariableError::Unknown(_))));
    }

    #[test]
    fn free_ancestors_skip_constants_and_duplicates() {
        let mut vars = Variables::new();
        let a = vars.free("a", 1.0);
        let c = vars.constant("c", 2.0);
        let s = vars.dependent("s", Dependency::Sum(a, c)).unwrap();
        let t = vars.dependent("t", Dependency::Product(s, a)).unwrap();
        assert_eq!(vars.free_ancestors(t).unwrap(), vec![a]);
        assert!(vars.free_ancestors(c).unwrap().is_empty());
    }

    #[test]
    fn values_can_be_snapshotted_and_restored() {
        let mut vars = Variables::new();
        let a = vars.free("a", 1.0);
        let snapshot = vars.values_of(&[a]).unwrap();
        vars.set(a, 5.0).unwrap();
        vars.restore(&snapshot).unwrap();
        assert_eq!(vars.value(a).unwrap(), 1.0);
        assert_eq!(vars.find_by_name("a"), Some(a));
    }

    #[test]
    fn geometric_mean_derivative_with_zero_input_is_finite() {
        let mut vars = Variables::new();
        let a = vars.free("a", 0.0);
        let b = vars.free("b", 4.0);
        let g = vars
            .dependent("g", Dependency::GeometricMean(vec![a, b]))
            .unwrap();
        let d = vars.derivative(g, b).unwrap();
        assert!(d.is_finite());
        assert_eq!(d, 0.0);
    }

    #[test]
    fn non_finite_assignment_is_rejected_and_value_kept() {
        let mut vars = Variables::new();
        let x = vars.design("x", 1.0, Some(0.0), Some(2.0)).unwrap();
        for bad in [f64::NAN, f64::INFINITY, f64::NEG_INFINITY] {
            assert!(matches!(
                vars.set(x, bad),
                Err(VariableError::NonFinite { ref name, .. }) if name == "x"
            ));
            assert_eq!(vars.value(x).unwrap(), 1.0);
            assert_eq!(vars.bound_state(x).unwrap(), BoundState::Free);
        }
    }
}
