use super::{PairTables, Simulation, SimulationError, pair_file_name, save_tables, validate_table};
use crate::core::ensemble::{Ensemble, Rdf};
use crate::core::io::directory::Directory;
use crate::core::math::trapezoid;
use std::f64::consts::PI;
use tracing::{debug, instrument};

/// Simulation in the limit of vanishing density.
///
/// Each pair correlation is the Boltzmann factor `g(r) = exp(-u(r)/kT)` of the tabulated
/// energy, and the pressure follows from the virial route:
///
/// `P = ρ kT + (2π/3) Σ_ij ρ_i ρ_j ∫ r³ f(r) g(r) dr`
///
/// with the sum over ordered pairs of types.
#[derive(Debug, Clone, Copy, Default)]
pub struct Dilute;

impl Simulation for Dilute {
    #[instrument(skip_all, name = "dilute")]
    fn run(
        &self,
        ensemble: &Ensemble,
        tables: &PairTables,
        directory: Option<&Directory>,
    ) -> Result<Ensemble, SimulationError> {
        let beta = ensemble.beta();
        let kt = ensemble.kb() * ensemble.temperature();
        let mut result = ensemble.state();

        let mut pressure = 0.0;
        for ty in ensemble.types() {
            pressure += ensemble.number_density(ty)? * kt;
        }

        for pair in ensemble.pairs() {
            let table = tables
                .get(&pair)
                .ok_or_else(|| SimulationError::MissingTable(pair.clone()))?;
            validate_table(&pair, table)?;

            let g: Vec<f64> = table.u.iter().map(|u| (-beta * u).exp()).collect();
            let virial: Vec<f64> = table
                .r
                .iter()
                .zip(&table.f)
                .zip(&g)
                .map(|((r, f), g)| r.powi(3) * f * g)
                .collect();
            let rho_i = ensemble.number_density(pair.first())?;
            let rho_j = ensemble.number_density(pair.second())?;
            let ordered = if pair.is_like() { 1.0 } else { 2.0 };
            pressure += ordered * (2.0 * PI / 3.0) * rho_i * rho_j * trapezoid(&table.r, &virial);

            let rdf = Rdf::new(table.r.clone(), g)?;
            if let Some(dir) = directory {
                rdf.save_csv(&dir.file(&pair_file_name("rdf", &pair)))?;
            }
            result.set_rdf(pair, rdf)?;
        }

        if let Some(dir) = directory {
            save_tables(tables, dir)?;
        }
        debug!(pressure, "Dilute simulation complete");
        result.set_pressure(pressure);
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::ensemble::Volume;
    use crate::core::pair::Pair;
    use crate::core::potential::tabulator::RegularizedTable;
    use tempfile::tempdir;

    fn linear_tables(pairs: &[Pair]) -> PairTables {
        let r = vec![1.0, 2.0, 3.0];
        pairs
            .iter()
            .map(|pair| {
                let table = RegularizedTable {
                    u: r.iter().map(|r| 2.0 * r - 6.0).collect(),
                    f: vec![-2.0; 3],
                    r: r.clone(),
                    rcut: 3.0,
                };
                (pair.clone(), table)
            })
            .collect()
    }

    fn ensemble() -> Ensemble {
        Ensemble::new(1.0, Volume::Cube { l: 2.0 }, [("A", 2), ("B", 3)]).unwrap()
    }

    #[test]
    fn run_produces_boltzmann_rdfs_and_virial_pressure() {
        let ens = ensemble();
        let tables = linear_tables(&ens.pairs());
        let sim = Dilute.run(&ens, &tables, None).unwrap();

        for pair in ens.pairs() {
            let rdf = sim.rdf(&pair).unwrap();
            assert_eq!(rdf.r(), &[1.0, 2.0, 3.0]);
            let expected = [4.0_f64.exp(), 2.0_f64.exp(), 1.0];
            for (g, e) in rdf.g().iter().zip(expected) {
                assert!((g - e).abs() < 1e-9);
            }
        }
        let pressure = sim.pressure().unwrap();
        assert!((pressure - (-162.854848)).abs() < 1e-3, "{pressure}");
        assert!(ens.pressure().is_none());
    }

    #[test]
    fn run_fails_without_table_for_every_pair() {
        let ens = ensemble();
        let tables = linear_tables(&[Pair::new("A", "A")]);
        assert!(matches!(
            Dilute.run(&ens, &tables, None),
            Err(SimulationError::MissingTable(_))
        ));
    }

    #[test]
    fn run_writes_rdfs_and_tables() {
        let root = tempdir().unwrap();
        let dir = Directory::new(root.path()).unwrap();
        let ens = ensemble();
        let tables = linear_tables(&ens.pairs());
        Dilute.run(&ens, &tables, Some(&dir)).unwrap();

        let rdf = Rdf::from_csv(&dir.file("rdf.A.B.csv")).unwrap();
        assert_eq!(rdf.r(), &[1.0, 2.0, 3.0]);
        assert!(dir.file("table.B.B.csv").is_file());
    }
}
