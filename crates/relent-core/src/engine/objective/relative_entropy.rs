use super::{ObjectiveError, ObjectiveFunction, ObjectiveFunctionResult};
use crate::core::ensemble::Ensemble;
use crate::core::io::directory::Directory;
use crate::core::math::trapezoid;
use crate::core::pair::Pair;
use crate::core::variable::{VarId, VarVector, Variables};
use crate::simulate::{Potentials, Simulation};
use std::f64::consts::PI;
use tracing::{debug, instrument};

/// Relative entropy between a target ensemble and the one a model reproduces.
///
/// Only the gradient is available. For a design variable `x` it is
///
/// `∂S/∂x = Σ_ij c_ij ∫ r² [β_t N_i N_j / V_t g_t(r) - β_s N_i N_j / V_s g_s(r)] ∂u_ij/∂x dr`
///
/// with `c_ij = 2π` for like pairs and `4π` otherwise, integrated over the part of the
/// tabulation grid covered by both distribution functions. Unless `extensive`, the
/// gradient is divided once more by the target volume.
#[derive(Debug)]
pub struct RelativeEntropy<S> {
    target: Ensemble,
    simulation: S,
    potentials: Potentials,
    extensive: bool,
}

impl<S: Simulation> RelativeEntropy<S> {
    /// Creates the objective.
    ///
    /// The target must carry a radial distribution function for every pair of its types;
    /// a missing one is reported when the objective is computed.
    pub fn new(target: Ensemble, simulation: S, potentials: Potentials) -> Self {
        Self {
            target,
            simulation,
            potentials,
            extensive: false,
        }
    }

    pub fn with_extensive(mut self, extensive: bool) -> Self {
        self.extensive = extensive;
        self
    }

    pub fn target(&self) -> &Ensemble {
        &self.target
    }

    pub fn simulation(&self) -> &S {
        &self.simulation
    }

    pub fn potentials(&self) -> &Potentials {
        &self.potentials
    }

    pub fn potentials_mut(&mut self) -> &mut Potentials {
        &mut self.potentials
    }

    pub fn is_extensive(&self) -> bool {
        self.extensive
    }

    fn pair_gradient(
        &self,
        vars: &Variables,
        simulated: &Ensemble,
        pair: &Pair,
        var: VarId,
    ) -> Result<f64, ObjectiveError> {
        let missing = |ensemble| ObjectiveError::MissingRdf {
            pair: pair.clone(),
            ensemble,
        };
        let g_target = self.target.rdf(pair).ok_or_else(|| missing("target"))?;
        let g_sim = simulated.rdf(pair).ok_or_else(|| missing("simulated"))?;

        let du = self.potentials.derivative(vars, pair, var)?;
        let (t_lo, t_hi) = g_target.domain();
        let (s_lo, s_hi) = g_sim.domain();
        let (lo, hi) = (t_lo.max(s_lo), t_hi.min(s_hi));

        let pairs_count = (self.target.count(pair.first())? * self.target.count(pair.second())?) as f64;
        let target_factor = self.target.beta() * pairs_count / self.target.volume().value();
        let sim_factor = simulated.beta() * pairs_count / simulated.volume().value();

        let mut r = Vec::new();
        let mut y = Vec::new();
        for (ri, dui) in self.potentials.tabulator().r().iter().zip(du) {
            if *ri < lo || *ri > hi {
                continue;
            }
            let weight = target_factor * g_target.value(*ri) - sim_factor * g_sim.value(*ri);
            r.push(*ri);
            y.push(ri * ri * weight * dui);
        }

        let c = if pair.is_like() { 2.0 * PI } else { 4.0 * PI };
        Ok(c * trapezoid(&r, &y))
    }
}

impl<S: Simulation> ObjectiveFunction for RelativeEntropy<S> {
    fn design_variables(&self, vars: &Variables) -> Result<Vec<VarId>, ObjectiveError> {
        Ok(self.potentials.design_variables(vars)?)
    }

    #[instrument(skip_all, name = "relative_entropy")]
    fn compute(
        &self,
        vars: &Variables,
        directory: Option<&Directory>,
    ) -> Result<ObjectiveFunctionResult, ObjectiveError> {
        let pairs = self.target.pairs();
        let tables = self.potentials.tabulate(vars, &pairs)?;
        if let Some(dir) = directory {
            self.potentials.save(vars, dir)?;
        }
        let simulated = self
            .simulation
            .run(&self.target.state(), &tables, directory)?;

        let design = self.design_variables(vars)?;
        let norm = if self.extensive {
            1.0
        } else {
            self.target.volume().value()
        };
        let mut gradient = VarVector::new();
        for var in &design {
            let mut total = 0.0;
            for pair in &pairs {
                total += self.pair_gradient(vars, &simulated, pair, *var)?;
            }
            gradient.insert(*var, total / norm);
        }
        debug!(gradient_norm = gradient.norm(), "Relative entropy gradient computed");

        Ok(ObjectiveFunctionResult::new(
            vars, &design, None, &gradient, directory,
        )?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::ensemble::{Rdf, Volume};
    use crate::core::potential::tabulator::Tabulator;
    use crate::core::potential::{LennardJones, PairPotential};
    use crate::simulate::Dilute;
    use tempfile::tempdir;

    struct Setup {
        vars: Variables,
        epsilon: VarId,
        sigma: VarId,
        objective: RelativeEntropy<Dilute>,
    }

    fn lj_energy(epsilon: f64, sigma: f64, r: f64) -> f64 {
        let r6 = (sigma / r).powi(6);
        4.0 * epsilon * (r6 * r6 - r6)
    }

    fn setup() -> Setup {
        let mut vars = Variables::new();
        let epsilon = vars.free("epsilon", 1.0);
        let sigma = vars.free("sigma", 0.9);
        let pair = Pair::new("1", "1");
        let mut lj = PairPotential::new(["1"], LennardJones);
        lj.coeff_mut().set(&pair, "epsilon", epsilon).unwrap();
        lj.coeff_mut().set(&pair, "sigma", sigma).unwrap();
        lj.coeff_mut().set(&pair, "rmax", 2.7).unwrap();
        let tabulator = Tabulator::uniform(3.6, 1000, None, None).unwrap();
        let potentials = Potentials::new(tabulator).with_potential(lj);

        let mut target = Ensemble::new(1.5, Volume::Cube { l: 10.0 }, [("1", 50)]).unwrap();
        let r: Vec<f64> = (0..50).map(|i| 0.05 + 0.1 * i as f64).collect();
        let g = r.iter().map(|r| (-lj_energy(1.0, 0.9, *r)).exp()).collect();
        target.set_rdf(pair, Rdf::new(r, g).unwrap()).unwrap();

        Setup {
            vars,
            epsilon,
            sigma,
            objective: RelativeEntropy::new(target, Dilute, potentials),
        }
    }

    /// Integrates the gradient directly on the common domain `[0.05, 3.6]`.
    fn reference_gradient(setup: &Setup, var: VarId, norm: f64) -> f64 {
        let target_rdf = setup.objective.target().rdf(&Pair::new("1", "1")).unwrap();
        let factor = 50.0 * 50.0 / 1.5 / 1000.0;
        let (lo, hi) = (0.05, 3.6);
        let r: Vec<f64> = setup
            .objective
            .potentials()
            .tabulator()
            .r()
            .iter()
            .copied()
            .filter(|r| *r >= lo && *r <= hi)
            .collect();
        let y: Vec<f64> = r
            .iter()
            .map(|r| {
                let r6 = (0.9 / r).powi(6);
                let du = if var == setup.epsilon {
                    4.0 * (r6 * r6 - r6)
                } else {
                    (48.0 / 0.9) * (r6 * r6 - 0.5 * r6)
                };
                let du = if *r > 2.7 { 0.0 } else { du };
                let g_sim = if *r > 2.7 {
                    1.0
                } else {
                    (-lj_energy(1.0, 0.9, *r) / 1.5).exp()
                };
                2.0 * PI * r * r * factor * (target_rdf.value(*r) - g_sim) * du / norm
            })
            .collect();
        trapezoid(&r, &y)
    }

    #[test]
    fn design_variables_follow_constant_flags() {
        let mut s = setup();
        let design = s.objective.design_variables(&s.vars).unwrap();
        assert_eq!(design, vec![s.epsilon, s.sigma]);

        s.vars.set_constant(s.epsilon, true).unwrap();
        assert_eq!(s.objective.design_variables(&s.vars).unwrap(), vec![s.sigma]);
        s.vars.set_constant(s.sigma, true).unwrap();
        assert!(s.objective.design_variables(&s.vars).unwrap().is_empty());
    }

    #[test]
    fn compute_matches_direct_integration() {
        let s = setup();
        let res = s.objective.compute(&s.vars, None).unwrap();
        assert!(res.value().is_none());
        for var in [s.epsilon, s.sigma] {
            let expected = reference_gradient(&s, var, 1000.0);
            let actual = res.gradient().get(var).unwrap();
            assert!((actual - expected).abs() < 1e-4, "{actual} vs {expected}");
        }
    }

    #[test]
    fn extensive_gradient_is_not_divided_by_volume() {
        let s = setup();
        let intensive = s.objective.compute(&s.vars, None).unwrap();
        let Setup {
            vars,
            epsilon,
            objective,
            ..
        } = s;
        let objective = objective.with_extensive(true);
        assert!(objective.is_extensive());
        let extensive = objective.compute(&vars, None).unwrap();
        let ratio = extensive.gradient().get(epsilon).unwrap() / intensive.gradient().get(epsilon).unwrap();
        assert!((ratio - 1000.0).abs() < 1e-6);
    }

    #[test]
    fn compute_writes_potential_snapshots() {
        let root = tempdir().unwrap();
        let dir = Directory::new(root.path()).unwrap();
        let s = setup();
        s.objective.compute(&s.vars, Some(&dir)).unwrap();

        let mut fresh = Variables::new();
        let coeff = crate::core::pair::PairParameters::from_file(&mut fresh, &dir.file("potential.0.toml")).unwrap();
        let set = coeff.evaluate(&fresh, &Pair::new("1", "1")).unwrap();
        assert_eq!(set.number("epsilon").unwrap(), 1.0);
        assert_eq!(set.number("sigma").unwrap(), 0.9);
        assert_eq!(set.number("rmax").unwrap(), 2.7);
        assert!(dir.file("rdf.1.1.csv").is_file());
    }

    #[test]
    fn compute_fails_without_target_rdf() {
        let s = setup();
        let Setup {
            vars,
            objective,
            ..
        } = s;
        let RelativeEntropy {
            target,
            simulation,
            potentials,
            ..
        } = objective;
        let objective = RelativeEntropy::new(target.state(), simulation, potentials);
        assert!(matches!(
            objective.compute(&vars, None),
            Err(ObjectiveError::MissingRdf { ensemble: "target", .. })
        ));
    }
}
