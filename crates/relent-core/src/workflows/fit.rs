use crate::core::io::directory::Directory;
use crate::core::variable::{VarVector, Variables};
use crate::engine::config::OptimizerConfig;
use crate::engine::error::EngineError;
use crate::engine::objective::ObjectiveFunction;
use crate::engine::progress::{Progress, ProgressReporter};
use tracing::{info, instrument};

#[derive(Debug, Clone, PartialEq)]
pub struct FitReport {
    /// `None` when the objective had no design variables.
    pub converged: Option<bool>,
    pub iterations: usize,
    /// Final values of the design variables.
    pub variables: VarVector,
}

#[instrument(skip_all, name = "fit_workflow")]
pub fn run<O>(
    vars: &mut Variables,
    objective: &O,
    config: &OptimizerConfig,
    directory: Option<&Directory>,
    reporter: &ProgressReporter,
) -> Result<FitReport, EngineError>
where
    O: ObjectiveFunction + ?Sized,
{
    // === Phase 0: Preparation ===
    reporter.report(Progress::PhaseStart {
        name: "Preparation",
    });
    let optimizer = config.build(vars)?;
    let design = objective.design_variables(vars)?;
    info!(
        "Fitting {} design variables with {}.",
        design.len(),
        optimizer.name()
    );
    for id in &design {
        reporter.report(Progress::Message(format!(
            "{} = {}",
            vars.name(*id)?,
            vars.value(*id)?
        )));
    }
    reporter.report(Progress::PhaseFinish);

    // === Phase 1: Optimization ===
    reporter.report(Progress::PhaseStart {
        name: "Optimization",
    });
    let outcome = optimizer.optimize_with_progress(objective, vars, directory, reporter)?;
    reporter.report(Progress::PhaseFinish);

    // === Phase 2: Report ===
    let report = FitReport {
        converged: outcome.map(|o| o.converged),
        iterations: outcome.map_or(0, |o| o.iterations),
        variables: vars.values_of(&design)?,
    };
    match report.converged {
        Some(true) => info!("Fit converged after {} iterations.", report.iterations),
        Some(false) => info!(
            "Fit did not converge within {} iterations.",
            report.iterations
        ),
        None => info!("No design variables to fit."),
    }
    Ok(report)
}
