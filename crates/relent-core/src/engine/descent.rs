use super::config::DescentSettings;
use super::error::EngineError;
use super::objective::{ObjectiveFunction, ObjectiveFunctionResult};
use super::progress::{Progress, ProgressReporter};
use crate::core::io::directory::Directory;
use crate::core::variable::{VarVector, Variables};
use tracing::{debug, info, instrument};

/// How a run of an optimizer ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DescentOutcome {
    pub converged: bool,
    pub iterations: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum StepRule {
    Constant,
    Normalized,
}

/// Gradient descent with a constant step size applied to the scaled gradient.
#[derive(Debug, Clone, PartialEq)]
pub struct SteepestDescent {
    settings: DescentSettings,
}

/// Gradient descent that moves a fixed distance in scaled coordinates each iteration.
///
/// Near the minimum the fixed move can overshoot and oscillate when the step is large
/// compared to the curvature; the step is never shortened automatically.
#[derive(Debug, Clone, PartialEq)]
pub struct FixedStepDescent {
    settings: DescentSettings,
}

macro_rules! descent_method {
    ($ty:ident, $rule:expr) => {
        impl $ty {
            pub fn new(settings: DescentSettings) -> Self {
                Self { settings }
            }

            pub fn settings(&self) -> &DescentSettings {
                &self.settings
            }

            pub fn settings_mut(&mut self) -> &mut DescentSettings {
                &mut self.settings
            }

            pub fn has_converged(
                &self,
                vars: &Variables,
                result: &ObjectiveFunctionResult,
            ) -> Result<bool, EngineError> {
                has_converged(&self.settings, vars, result)
            }

            /// Minimizes `objective` by adjusting its design variables in place.
            ///
            /// Returns `None` when the objective has no design variables, otherwise
            /// whether the convergence test passed within the iteration budget.
            pub fn optimize<O>(
                &self,
                objective: &O,
                vars: &mut Variables,
                directory: Option<&Directory>,
            ) -> Result<Option<bool>, EngineError>
            where
                O: ObjectiveFunction + ?Sized,
            {
                let outcome =
                    self.optimize_with_progress(objective, vars, directory, &ProgressReporter::new())?;
                Ok(outcome.map(|o| o.converged))
            }

            pub fn optimize_with_progress<O>(
                &self,
                objective: &O,
                vars: &mut Variables,
                directory: Option<&Directory>,
                reporter: &ProgressReporter,
            ) -> Result<Option<DescentOutcome>, EngineError>
            where
                O: ObjectiveFunction + ?Sized,
            {
                descend(&self.settings, $rule, objective, vars, directory, reporter)
            }
        }
    };
}

descent_method!(SteepestDescent, StepRule::Constant);
descent_method!(FixedStepDescent, StepRule::Normalized);

/// Either descent method, as selected by configuration.
#[derive(Debug, Clone, PartialEq)]
pub enum Optimizer {
    SteepestDescent(SteepestDescent),
    FixedStepDescent(FixedStepDescent),
}

impl Optimizer {
    pub fn name(&self) -> &'static str {
        match self {
            Optimizer::SteepestDescent(_) => "steepest-descent",
            Optimizer::FixedStepDescent(_) => "fixed-step-descent",
        }
    }

    pub fn settings(&self) -> &DescentSettings {
        match self {
            Optimizer::SteepestDescent(m) => m.settings(),
            Optimizer::FixedStepDescent(m) => m.settings(),
        }
    }

    pub fn optimize<O>(
        &self,
        objective: &O,
        vars: &mut Variables,
        directory: Option<&Directory>,
    ) -> Result<Option<bool>, EngineError>
    where
        O: ObjectiveFunction + ?Sized,
    {
        match self {
            Optimizer::SteepestDescent(m) => m.optimize(objective, vars, directory),
            Optimizer::FixedStepDescent(m) => m.optimize(objective, vars, directory),
        }
    }

    pub fn optimize_with_progress<O>(
        &self,
        objective: &O,
        vars: &mut Variables,
        directory: Option<&Directory>,
        reporter: &ProgressReporter,
    ) -> Result<Option<DescentOutcome>, EngineError>
    where
        O: ObjectiveFunction + ?Sized,
    {
        match self {
            Optimizer::SteepestDescent(m) => {
                m.optimize_with_progress(objective, vars, directory, reporter)
            }
            Optimizer::FixedStepDescent(m) => {
                m.optimize_with_progress(objective, vars, directory, reporter)
            }
        }
    }
}

fn has_converged(
    settings: &DescentSettings,
    vars: &Variables,
    result: &ObjectiveFunctionResult,
) -> Result<bool, EngineError> {
    let mut converged = true;
    for (id, g) in result.gradient().iter() {
        let tolerance = settings
            .tolerance
            .get(id)
            .ok_or_else(|| EngineError::MissingTolerance {
                variable: vars.name(id).unwrap_or("<unknown>").to_string(),
            })?;
        if g.abs() > tolerance {
            converged = false;
        }
    }
    Ok(converged)
}

fn iteration_directory(
    directory: Option<&Directory>,
    iteration: usize,
) -> Result<Option<Directory>, EngineError> {
    Ok(directory
        .map(|d| d.directory(&iteration.to_string()))
        .transpose()?)
}

#[instrument(skip_all, name = "descent")]
fn descend<O>(
    settings: &DescentSettings,
    rule: StepRule,
    objective: &O,
    vars: &mut Variables,
    directory: Option<&Directory>,
    reporter: &ProgressReporter,
) -> Result<Option<DescentOutcome>, EngineError>
where
    O: ObjectiveFunction + ?Sized,
{
    let design = objective.design_variables(vars)?;
    if design.is_empty() {
        info!("Objective has no design variables, nothing to optimize.");
        return Ok(None);
    }
    info!(
        "Starting descent over {} design variables (max {} iterations).",
        design.len(),
        settings.max_iterations
    );

    let dir = iteration_directory(directory, 0)?;
    let mut result = objective.compute(vars, dir.as_ref())?;
    let mut iteration = 0;
    reporter.report(Progress::TaskStart {
        total_steps: settings.max_iterations as u64,
    });

    let converged = loop {
        if has_converged(settings, vars, &result)? {
            break true;
        }
        if iteration >= settings.max_iterations {
            break false;
        }
        iteration += 1;

        let scaled: VarVector = result
            .gradient()
            .iter()
            .map(|(id, g)| (id, settings.scale.get(id) * g))
            .collect();
        let amount = match rule {
            StepRule::Constant => settings.step_size,
            StepRule::Normalized => {
                let norm = scaled.norm();
                if norm > 0.0 {
                    settings.step_size / norm
                } else {
                    0.0
                }
            }
        };
        for (id, g) in scaled.iter() {
            let x = vars.value(id)?;
            vars.set(id, x - amount * settings.scale.get(id) * g)?;
        }

        let dir = iteration_directory(directory, iteration)?;
        let next = objective.compute(vars, dir.as_ref())?;
        result = match &settings.line_search {
            Some(line_search) => {
                let line_dir = dir.as_ref().map(|d| d.directory(".line")).transpose()?;
                let (refined, evaluations) =
                    line_search.search(objective, vars, &result, &next, line_dir.as_ref())?;
                reporter.report(Progress::LineSearch { evaluations });
                vars.restore(refined.variables())?;
                refined
            }
            None => next,
        };

        let gradient_norm = result.gradient().norm();
        debug!(
            iteration,
            value = ?result.value(),
            gradient_norm,
            "Descent iteration complete"
        );
        reporter.report(Progress::Iteration {
            iteration,
            value: result.value(),
            gradient_norm,
        });
        reporter.report(Progress::TaskIncrement);
    };

    reporter.report(Progress::TaskFinish);
    if converged {
        info!("Converged after {} iterations.", iteration);
    } else {
        info!("Stopped after {} iterations without converging.", iteration);
    }
    Ok(Some(DescentOutcome {
        converged,
        iterations: iteration,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::variable::VarId;
    use crate::engine::config::{DescentSettingsBuilder, Scale, Tolerance};
    use crate::engine::line_search::LineSearch;
    use crate::engine::objective::quadratic::Quadratic;
    use std::sync::Mutex;
    use tempfile::tempdir;

    const TOLERANCE: f64 = 1e-8;

    fn f64_approx_equal(a: f64, b: f64) -> bool {
        (a - b).abs() < TOLERANCE
    }

    fn setup(x0: f64) -> (Variables, VarId, Quadratic) {
        let mut vars = Variables::new();
        let x = vars.free("x", x0);
        (vars, x, Quadratic { vars: vec![x] })
    }

    fn settings(max_iterations: usize, step_size: f64) -> DescentSettingsBuilder {
        DescentSettingsBuilder::new()
            .max_iterations(max_iterations)
            .step_size(step_size)
            .tolerance(Tolerance::Uniform(TOLERANCE))
    }

    #[test]
    fn steepest_descent_converges_on_quadratic() {
        let (mut vars, x, q) = setup(3.0);
        let sd = SteepestDescent::new(settings(1000, 0.25).build().unwrap());
        assert_eq!(sd.optimize(&q, &mut vars, None).unwrap(), Some(true));
        assert!((vars.value(x).unwrap() - 1.0).abs() < 1e-8);
    }

    #[test]
    fn steepest_descent_stops_at_iteration_budget() {
        let (mut vars, x, q) = setup(3.0);
        let sd = SteepestDescent::new(settings(1, 0.25).build().unwrap());
        assert_eq!(sd.optimize(&q, &mut vars, None).unwrap(), Some(false));
        assert!(f64_approx_equal(vars.value(x).unwrap(), 2.0));
    }

    #[test]
    fn steepest_descent_with_scale_converges() {
        let (mut vars, x, q) = setup(50.0);
        let sd = SteepestDescent::new(
            settings(1000, 0.25)
                .scale(Scale::Uniform(0.85))
                .build()
                .unwrap(),
        );
        assert_eq!(sd.optimize(&q, &mut vars, None).unwrap(), Some(true));
        assert!((vars.value(x).unwrap() - 1.0).abs() < 1e-8);

        vars.set(x, -35.0).unwrap();
        let sd = SteepestDescent::new(
            settings(1000, 0.25)
                .scale(Scale::PerVariable([(x, 1.5)].into_iter().collect()))
                .build()
                .unwrap(),
        );
        assert_eq!(sd.optimize(&q, &mut vars, None).unwrap(), Some(true));
        assert!((vars.value(x).unwrap() - 1.0).abs() < 1e-8);
    }

    #[test]
    fn steepest_descent_with_line_search_converges() {
        let (mut vars, x, q) = setup(3.0);
        let sd = SteepestDescent::new(
            settings(1000, 0.25)
                .line_search(LineSearch::new(1e-5, 100).unwrap())
                .build()
                .unwrap(),
        );
        assert_eq!(sd.optimize(&q, &mut vars, None).unwrap(), Some(true));
        assert!((vars.value(x).unwrap() - 1.0).abs() < 1e-8);
    }

    #[test]
    fn line_search_shortens_an_overshooting_step() {
        let (mut vars, x, q) = setup(3.0);
        let sd = SteepestDescent::new(
            settings(1, 0.75)
                .line_search(LineSearch::new(1e-5, 100).unwrap())
                .build()
                .unwrap(),
        );
        assert_eq!(sd.optimize(&q, &mut vars, None).unwrap(), Some(true));
        assert!(f64_approx_equal(vars.value(x).unwrap(), 1.0));
    }

    #[test]
    fn fixed_step_descent_converges_on_quadratic() {
        let (mut vars, x, q) = setup(3.0);
        let fsd = FixedStepDescent::new(settings(1000, 0.25).build().unwrap());
        assert_eq!(fsd.optimize(&q, &mut vars, None).unwrap(), Some(true));
        assert!(f64_approx_equal(vars.value(x).unwrap(), 1.0));
    }

    #[test]
    fn fixed_step_descent_oscillates_with_large_step() {
        let (mut vars, x, q) = setup(1.5);
        let fsd = FixedStepDescent::new(settings(10000, 0.42).build().unwrap());
        assert_eq!(fsd.optimize(&q, &mut vars, None).unwrap(), Some(false));
        assert!((vars.value(x).unwrap() - 1.0).abs() > 0.01);
    }

    #[test]
    fn fixed_step_descent_with_scale_converges() {
        let (mut vars, x, q) = setup(50.0);
        let fsd = FixedStepDescent::new(
            settings(1000, 0.25)
                .scale(Scale::Uniform(4.0))
                .build()
                .unwrap(),
        );
        assert_eq!(fsd.optimize(&q, &mut vars, None).unwrap(), Some(true));
        assert!(f64_approx_equal(vars.value(x).unwrap(), 1.0));

        vars.set(x, -35.0).unwrap();
        let fsd = FixedStepDescent::new(
            settings(1000, 0.25)
                .scale(Scale::PerVariable([(x, 1.5)].into_iter().collect()))
                .build()
                .unwrap(),
        );
        assert_eq!(fsd.optimize(&q, &mut vars, None).unwrap(), Some(true));
        assert!(f64_approx_equal(vars.value(x).unwrap(), 1.0));
    }

    #[test]
    fn optimize_returns_none_without_design_variables() {
        let (mut vars, x, q) = setup(3.0);
        vars.set_constant(x, true).unwrap();
        let sd = SteepestDescent::new(settings(10, 0.25).build().unwrap());
        assert_eq!(sd.optimize(&q, &mut vars, None).unwrap(), None);
        assert_eq!(vars.value(x).unwrap(), 3.0);
    }

    #[test]
    fn has_converged_requires_tolerance_for_every_variable() {
        let mut vars = Variables::new();
        let x = vars.free("x", 1.0);
        let y = vars.free("y", 1.0);
        let q = Quadratic { vars: vec![x, y] };
        let sd = SteepestDescent::new(
            settings(10, 0.25)
                .tolerance(Tolerance::PerVariable([(x, 1e-8)].into_iter().collect()))
                .build()
                .unwrap(),
        );
        let result = q.compute(&vars, None).unwrap();
        match sd.has_converged(&vars, &result) {
            Err(EngineError::MissingTolerance { variable }) => assert_eq!(variable, "y"),
            other => panic!("expected MissingTolerance, got {other:?}"),
        }
    }

    #[test]
    fn optimizer_enum_reports_progress_and_writes_iterations() {
        let root = tempdir().unwrap();
        let dir = Directory::new(root.path()).unwrap();
        let (mut vars, _, q) = setup(3.0);
        let optimizer = Optimizer::FixedStepDescent(FixedStepDescent::new(
            settings(1000, 0.25).build().unwrap(),
        ));
        assert_eq!(optimizer.name(), "fixed-step-descent");

        let iterations = Mutex::new(0);
        let reporter = ProgressReporter::with_callback(Box::new(|event| {
            if let Progress::Iteration { .. } = event {
                *iterations.lock().unwrap() += 1;
            }
        }));
        let outcome = optimizer
            .optimize_with_progress(&q, &mut vars, Some(&dir), &reporter)
            .unwrap()
            .unwrap();
        drop(reporter);

        assert!(outcome.converged);
        assert_eq!(outcome.iterations, 8);
        assert_eq!(iterations.into_inner().unwrap(), 8);
        assert!(dir.file("0").join("x.log").is_file());
        assert!(dir.file("8").join("x.log").is_file());
    }
}
