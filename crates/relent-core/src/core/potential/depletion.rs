use super::{PairFunction, PairPotential, PotentialError};
use crate::core::pair::{Pair, ParamSet, ParamValue, ParameterError};
use crate::core::variable::{Dependency, VarId, Variables};
use std::f64::consts::PI;

/// Asakura-Oosawa depletion attraction between spheres of diameters `sigma_i` and
/// `sigma_j` in a bath of depletants of diameter `sigma_d` at osmotic pressure `P`.
///
/// The interaction is nonzero only below the contact distance
/// `w = (sigma_i + sigma_j)/2 + sigma_d`; [`Depletion::attach_cutoff`] ties `rmax`
/// to that distance.
#[derive(Debug, Clone, Copy, Default)]
pub struct Depletion;

#[derive(Debug, Clone, Copy)]
struct Geometry {
    p: f64,
    sigma_i: f64,
    sigma_j: f64,
    /// Contact distance.
    w: f64,
    /// `sigma_i + sigma_j + 2 sigma_d`.
    s: f64,
    /// `0.75 (sigma_i - sigma_j)^2`.
    c: f64,
}

impl Geometry {
    fn read(set: &ParamSet) -> Result<Self, PotentialError> {
        let p = set.number("P")?;
        let sigma_i = set.number("sigma_i")?;
        let sigma_j = set.number("sigma_j")?;
        let sigma_d = set.number("sigma_d")?;
        for (name, value) in [("sigma_i", sigma_i), ("sigma_j", sigma_j), ("sigma_d", sigma_d)] {
            if value < 0.0 {
                return Err(PotentialError::invalid(name, "must be non-negative"));
            }
        }
        Ok(Self {
            p,
            sigma_i,
            sigma_j,
            w: 0.5 * (sigma_i + sigma_j) + sigma_d,
            s: sigma_i + sigma_j + 2.0 * sigma_d,
            c: 0.75 * (sigma_i - sigma_j).powi(2),
        })
    }

    fn prefactor(&self) -> f64 {
        PI * self.p / 12.0
    }

    fn overlap(&self, r: f64) -> f64 {
        r * r + r * self.s - self.c
    }
}

impl Depletion {
    /// Sets `rmax` of `pair` to a dependent variable tracking the contact distance.
    ///
    /// Scalar diameters are promoted to constant variables so the cutoff follows any
    /// diameter that is later made adjustable.
    ///
    /// # Return
    ///
    /// The identifier of the new `rmax` variable.
    pub fn attach_cutoff(
        potential: &mut PairPotential,
        vars: &mut Variables,
        pair: &Pair,
    ) -> Result<VarId, PotentialError> {
        if potential.function().name() != Depletion.name() {
            return Err(PotentialError::invalid(
                "rmax",
                format!(
                    "contact cutoff only applies to depletion, not {}",
                    potential.function().name()
                ),
            ));
        }

        let mut terms = Vec::with_capacity(3);
        for (name, weight) in [("sigma_i", 0.5), ("sigma_j", 0.5), ("sigma_d", 1.0)] {
            let id = match potential.coeff().resolve(pair, name)? {
                ParamValue::Variable(id) => id,
                ParamValue::Scalar(x) => {
                    let id = vars.constant(format!("{name}{pair}"), x);
                    potential.coeff_mut().set(pair, name, id)?;
                    id
                }
                ParamValue::Flag(_) => {
                    return Err(ParameterError::WrongKind {
                        name: name.to_string(),
                        expected: "a number",
                    }
                    .into());
                }
            };
            terms.push((id, weight));
        }

        let rmax = vars.dependent(
            format!("rmax{pair}"),
            Dependency::Affine { terms, offset: 0.0 },
        )?;
        potential.coeff_mut().set(pair, "rmax", rmax)?;
        Ok(rmax)
    }
}

impl PairFunction for Depletion {
    fn name(&self) -> &'static str {
        "depletion"
    }

    fn params(&self) -> Vec<String> {
        ["P", "sigma_i", "sigma_j", "sigma_d"]
            .iter()
            .map(|p| p.to_string())
            .collect()
    }

    fn energy(&self, set: &ParamSet, r: f64) -> Result<f64, PotentialError> {
        let g = Geometry::read(set)?;
        if r >= g.w {
            return Ok(0.0);
        }
        if r == 0.0 {
            return Ok(if g.c > 0.0 {
                f64::INFINITY
            } else {
                -g.prefactor() * g.w * g.w * g.s
            });
        }
        Ok(-g.prefactor() * (g.w - r).powi(2) * g.overlap(r) / r)
    }

    fn force(&self, set: &ParamSet, r: f64) -> Result<f64, PotentialError> {
        let g = Geometry::read(set)?;
        if r >= g.w {
            return Ok(0.0);
        }
        if r == 0.0 {
            return Ok(if g.c > 0.0 {
                f64::INFINITY
            } else {
                g.prefactor() * (g.w * g.w - 2.0 * g.w * g.s)
            });
        }
        let gap = g.w - r;
        let b = g.overlap(r);
        let slope = -2.0 * gap * b / r + gap * gap * ((2.0 * r + g.s) / r - b / (r * r));
        Ok(g.prefactor() * slope)
    }

    fn derivative(&self, set: &ParamSet, param: &str, r: f64) -> Result<f64, PotentialError> {
        let g = Geometry::read(set)?;
        if !matches!(param, "P" | "sigma_i" | "sigma_j" | "sigma_d") {
            return Err(ParameterError::UnknownParameter(param.to_string()).into());
        }
        if r >= g.w {
            return Ok(0.0);
        }
        if r == 0.0 && g.c > 0.0 {
            return Ok(f64::INFINITY);
        }

        let gap = g.w - r;
        let unit = PI / 12.0;
        // With c == 0 the overlap is divisible by r, which keeps r == 0 finite.
        let b_over_r = if r == 0.0 { g.s } else { g.overlap(r) / r };
        let delta = 1.5 * (g.sigma_i - g.sigma_j);
        let db_over_r = |sign: f64| {
            if r == 0.0 { 1.0 } else { (r + sign * delta) / r }
        };

        Ok(match param {
            "P" => -unit * gap * gap * b_over_r,
            "sigma_i" => -unit * g.p * (gap * b_over_r + gap * gap * db_over_r(-1.0)),
            "sigma_j" => -unit * g.p * (gap * b_over_r + gap * gap * db_over_r(1.0)),
            _ => -unit * g.p * (2.0 * gap * b_over_r + 2.0 * gap * gap),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::pair::Resolved;

    const TOLERANCE: f64 = 1e-6;

    fn f64_approx_equal(a: f64, b: f64) -> bool {
        (a - b).abs() < TOLERANCE
    }

    fn params(p: f64, sigma_i: f64, sigma_j: f64, sigma_d: f64) -> ParamSet {
        let mut set = ParamSet::new();
        set.insert("P", Resolved::Number(p));
        set.insert("sigma_i", Resolved::Number(sigma_i));
        set.insert("sigma_j", Resolved::Number(sigma_j));
        set.insert("sigma_d", Resolved::Number(sigma_d));
        set
    }

    #[test]
    fn depletion_matches_reference_values() {
        let set = params(1.0, 1.5, 2.0, 2.5);
        assert!(f64_approx_equal(Depletion.energy(&set, 3.0).unwrap(), -4.6786414));
        assert!(f64_approx_equal(Depletion.force(&set, 3.0).unwrap(), -7.0682426));
        assert!(f64_approx_equal(
            Depletion.derivative(&set, "P", 3.0).unwrap(),
            -4.6786414
        ));
        assert!(f64_approx_equal(
            Depletion.derivative(&set, "sigma_i", 3.0).unwrap(),
            -4.25424005
        ));
        assert!(f64_approx_equal(
            Depletion.derivative(&set, "sigma_j", 3.0).unwrap(),
            -4.04970928
        ));
        assert!(f64_approx_equal(
            Depletion.derivative(&set, "sigma_d", 3.0).unwrap(),
            -8.30394933
        ));
        assert!(f64_approx_equal(
            Depletion.energy(&set, 1.75).unwrap(),
            -16.59621119
        ));
        assert!(f64_approx_equal(
            Depletion.force(&set, 1.75).unwrap(),
            -11.54054444
        ));
        assert!(f64_approx_equal(Depletion.energy(&set, 1.0).unwrap(), -25.7514468));
    }

    #[test]
    fn depletion_vanishes_beyond_contact() {
        let set = params(1.0, 1.5, 2.0, 2.5);
        assert_eq!(Depletion.energy(&set, 4.25).unwrap(), 0.0);
        assert_eq!(Depletion.force(&set, 5.0).unwrap(), 0.0);
        assert_eq!(Depletion.derivative(&set, "sigma_d", 5.0).unwrap(), 0.0);
    }

    #[test]
    fn zero_separation_is_finite_for_equal_diameters() {
        let set = params(1.0, 1.0, 1.0, 0.5);
        let u0 = Depletion.energy(&set, 0.0).unwrap();
        let u_small = Depletion.energy(&set, 1e-9).unwrap();
        assert!(u0.is_finite());
        assert!((u0 - u_small).abs() < 1e-6);
        assert_eq!(
            Depletion.energy(&params(1.0, 1.0, 2.0, 0.5), 0.0).unwrap(),
            f64::INFINITY
        );
    }

    #[test]
    fn derivatives_match_finite_differences() {
        let base = [1.2, 1.5, 2.0, 2.5];
        let names = ["P", "sigma_i", "sigma_j", "sigma_d"];
        let r = 2.2;
        let h = 1e-6;
        for (k, name) in names.iter().enumerate() {
            let mut up = base;
            let mut down = base;
            up[k] += h;
            down[k] -= h;
            let numeric = (Depletion
                .energy(&params(up[0], up[1], up[2], up[3]), r)
                .unwrap()
                - Depletion
                    .energy(&params(down[0], down[1], down[2], down[3]), r)
                    .unwrap())
                / (2.0 * h);
            let exact = Depletion
                .derivative(&params(base[0], base[1], base[2], base[3]), name, r)
                .unwrap();
            assert!((numeric - exact).abs() < 1e-5, "{name}: {numeric} vs {exact}");
        }
    }

    #[test]
    fn negative_diameter_is_rejected() {
        let set = params(1.0, -1.5, 2.0, 2.5);
        assert!(matches!(
            Depletion.energy(&set, 3.0),
            Err(PotentialError::InvalidParameter { .. })
        ));
    }

    #[test]
    fn attached_cutoff_tracks_contact_distance() {
        let mut vars = Variables::new();
        let mut pot = PairPotential::new(["1", "2"], Depletion);
        let pair = Pair::new("1", "2");
        let sigma_d = vars.free("sigma_d", 2.5);
        pot.coeff_mut().set(&pair, "P", 1.0).unwrap();
        pot.coeff_mut().set(&pair, "sigma_i", 1.5).unwrap();
        pot.coeff_mut().set(&pair, "sigma_j", 2.0).unwrap();
        pot.coeff_mut().set(&pair, "sigma_d", sigma_d).unwrap();

        let rmax = Depletion::attach_cutoff(&mut pot, &mut vars, &pair).unwrap();
        assert!(f64_approx_equal(vars.value(rmax).unwrap(), 4.25));
        assert!(f64_approx_equal(vars.derivative(rmax, sigma_d).unwrap(), 1.0));

        let sigma_i = pot
            .coeff()
            .get(&pair, "sigma_i")
            .unwrap()
            .and_then(|v| v.as_variable())
            .unwrap();
        assert!(f64_approx_equal(vars.derivative(rmax, sigma_i).unwrap(), 0.5));
        assert!(vars.is_constant(sigma_i).unwrap());

        vars.set(sigma_d, 3.0).unwrap();
        assert!(f64_approx_equal(vars.value(rmax).unwrap(), 4.75));
        assert_eq!(pot.energy(&vars, &pair, &[5.0]).unwrap(), vec![0.0]);
    }
}
