use super::config::ConfigError;
use super::error::EngineError;
use super::objective::{ObjectiveFunction, ObjectiveFunctionResult};
use crate::core::io::directory::Directory;
use crate::core::variable::{VarVector, Variables};
use tracing::{instrument, trace};

/// Secant search for the point along a descent step where the directional
/// derivative vanishes.
///
/// The target along the direction `d = end - start` is `t(p) = -d · ∇f(p)`, which is
/// positive at a descent start. The search stops once `|t|` falls below
/// `tolerance · |t(start)|`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LineSearch {
    tolerance: f64,
    max_iterations: usize,
}

impl LineSearch {
    pub fn new(tolerance: f64, max_iterations: usize) -> Result<Self, ConfigError> {
        if !(tolerance > 0.0 && tolerance < 1.0) {
            return Err(ConfigError::InvalidValue {
                name: "line_search.tolerance",
                reason: format!("must be strictly between 0 and 1, got {tolerance}"),
            });
        }
        if max_iterations < 1 {
            return Err(ConfigError::InvalidValue {
                name: "line_search.max_iterations",
                reason: "must be at least 1".to_string(),
            });
        }
        Ok(Self {
            tolerance,
            max_iterations,
        })
    }

    pub fn tolerance(&self) -> f64 {
        self.tolerance
    }

    pub fn max_iterations(&self) -> usize {
        self.max_iterations
    }

    /// Refines the step from `start` to `end`.
    ///
    /// The design variables hold their pre-search values again when this returns,
    /// whether or not the search succeeded. The returned result describes the chosen
    /// point. Intermediate evaluations write into `directory/<k>` when a directory is given.
    ///
    /// # Errors
    ///
    /// [`EngineError::DegenerateInterval`] if `start` and `end` coincide, and
    /// [`EngineError::NotDescentDirection`] if the target at `start` is not positive.
    pub fn find<O>(
        &self,
        objective: &O,
        vars: &mut Variables,
        start: &ObjectiveFunctionResult,
        end: &ObjectiveFunctionResult,
        directory: Option<&Directory>,
    ) -> Result<ObjectiveFunctionResult, EngineError>
    where
        O: ObjectiveFunction + ?Sized,
    {
        self.search(objective, vars, start, end, directory)
            .map(|(result, _)| result)
    }

    /// Like [`LineSearch::find`], also returning the number of objective evaluations.
    #[instrument(skip_all, name = "line_search")]
    pub(crate) fn search<O>(
        &self,
        objective: &O,
        vars: &mut Variables,
        start: &ObjectiveFunctionResult,
        end: &ObjectiveFunctionResult,
        directory: Option<&Directory>,
    ) -> Result<(ObjectiveFunctionResult, usize), EngineError>
    where
        O: ObjectiveFunction + ?Sized,
    {
        let ids: Vec<_> = start.variables().keys().collect();
        let saved = vars.values_of(&ids)?;
        let outcome = self.bracket(objective, vars, start, end, directory);
        vars.restore(&saved)?;
        outcome
    }

    fn bracket<O>(
        &self,
        objective: &O,
        vars: &mut Variables,
        start: &ObjectiveFunctionResult,
        end: &ObjectiveFunctionResult,
        directory: Option<&Directory>,
    ) -> Result<(ObjectiveFunctionResult, usize), EngineError>
    where
        O: ObjectiveFunction + ?Sized,
    {
        let direction = end.variables().sub(start.variables());
        if direction.norm() == 0.0 {
            return Err(EngineError::DegenerateInterval);
        }
        let target = |result: &ObjectiveFunctionResult| -direction.dot(result.gradient());

        let mut t0 = target(start);
        if !(t0 > 0.0) {
            return Err(EngineError::NotDescentDirection { target: t0 });
        }
        let tolerance = self.tolerance * t0.abs();

        let mut t1 = target(end);
        if t1 > 0.0 || t1.abs() < tolerance {
            trace!(target = t1, "Accepting full step");
            return Ok((end.clone(), 0));
        }

        let (mut s0, mut s1) = (0.0, 1.0);
        let mut result = end.clone();
        let mut evaluations = 0;
        while evaluations < self.max_iterations {
            let s = (s0 * t1 - s1 * t0) / (t1 - t0);
            let point: VarVector = start
                .variables()
                .iter()
                .map(|(id, x)| (id, x + s * direction.get(id).unwrap_or(0.0)))
                .collect();
            vars.restore(&point)?;

            let dir = directory
                .map(|d| d.directory(&evaluations.to_string()))
                .transpose()?;
            result = objective.compute(vars, dir.as_ref())?;
            evaluations += 1;

            let t = target(&result);
            trace!(step = s, target = t, "Line search evaluation {}", evaluations);
            if t.abs() < tolerance {
                break;
            }
            if t > 0.0 {
                s0 = s;
                t0 = t;
            } else {
                s1 = s;
                t1 = t;
            }
        }
        Ok((result, evaluations))
    }
}
