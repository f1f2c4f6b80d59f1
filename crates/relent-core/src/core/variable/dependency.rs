use super::ids::VarId;

/// The closed set of functional forms a dependent variable can take.
///
/// Every variant is a pure function of its inputs, listed by [`Dependency::inputs`],
/// together with its partial derivatives with respect to each input slot. Slots are
/// positional, so an input that appears twice contributes twice to the chain rule.
#[derive(Debug, Clone, PartialEq)]
pub enum Dependency {
    /// Alias of another variable.
    SameAs(VarId),
    Sum(VarId, VarId),
    Difference(VarId, VarId),
    Product(VarId, VarId),
    Quotient(VarId, VarId),
    /// `a^p` with a constant exponent.
    Power(VarId, f64),
    ArithmeticMean(Vec<VarId>),
    GeometricMean(Vec<VarId>),
    /// `offset + Σ c_i x_i`.
    Affine { terms: Vec<(VarId, f64)>, offset: f64 },
}

impl Dependency {
    pub fn inputs(&self) -> Vec<VarId> {
        match self {
            Dependency::SameAs(a) | Dependency::Power(a, _) => vec![*a],
            Dependency::Sum(a, b)
            | Dependency::Difference(a, b)
            | Dependency::Product(a, b)
            | Dependency::Quotient(a, b) => vec![*a, *b],
            Dependency::ArithmeticMean(xs) | Dependency::GeometricMean(xs) => xs.clone(),
            Dependency::Affine { terms, .. } => terms.iter().map(|(id, _)| *id).collect(),
        }
    }

    pub(crate) fn validate(&self) -> Result<(), String> {
        match self {
            Dependency::ArithmeticMean(xs) | Dependency::GeometricMean(xs) if xs.is_empty() => {
                Err("a mean needs at least one input".to_string())
            }
            Dependency::Power(_, p) if !p.is_finite() => {
                Err(format!("exponent must be finite, got {p}"))
            }
            Dependency::Affine { terms, offset } => {
                if terms.iter().any(|(_, c)| !c.is_finite()) || !offset.is_finite() {
                    Err("affine coefficients must be finite".to_string())
                } else {
                    Ok(())
                }
            }
            _ => Ok(()),
        }
    }

    /// Evaluates the dependency given the values of [`Dependency::inputs`], in order.
    pub(crate) fn evaluate(&self, x: &[f64]) -> f64 {
        match self {
            Dependency::SameAs(_) => x[0],
            Dependency::Sum(..) => x[0] + x[1],
            Dependency::Difference(..) => x[0] - x[1],
            Dependency::Product(..) => x[0] * x[1],
            Dependency::Quotient(..) => x[0] / x[1],
            Dependency::Power(_, p) => x[0].powf(*p),
            Dependency::ArithmeticMean(_) => x.iter().sum::<f64>() / x.len() as f64,
            Dependency::GeometricMean(_) => x.iter().product::<f64>().powf(1.0 / x.len() as f64),
            Dependency::Affine { terms, offset } => {
                offset + terms.iter().zip(x).map(|((_, c), v)| c * v).sum::<f64>()
            }
        }
    }

    /// Partial derivatives with respect to each input slot.
    pub(crate) fn partials(&self, x: &[f64]) -> Vec<f64> {
        match self {
            Dependency::SameAs(_) => vec![1.0],
            Dependency::Sum(..) => vec![1.0, 1.0],
            Dependency::Difference(..) => vec![1.0, -1.0],
            Dependency::Product(..) => vec![x[1], x[0]],
            Dependency::Quotient(..) => vec![1.0 / x[1], -x[0] / (x[1] * x[1])],
            Dependency::Power(_, p) => {
                if *p == 0.0 {
                    vec![0.0]
                } else {
                    vec![p * x[0].powf(p - 1.0)]
                }
            }
            Dependency::ArithmeticMean(_) => vec![1.0 / x.len() as f64; x.len()],
            Dependency::GeometricMean(_) => {
                let n = x.len() as f64;
                let mean = self.evaluate(x);
                (0..x.len())
                    .map(|i| {
                        if x[i] != 0.0 {
                            return mean / (n * x[i]);
                        }
                        if x.len() == 1 {
                            return 1.0;
                        }
                        // At a zero input the mean is flat if another input is also zero,
                        // and otherwise rises with unbounded slope.
                        let others: f64 = x
                            .iter()
                            .enumerate()
                            .filter(|(j, _)| *j != i)
                            .map(|(_, v)| v)
                            .product();
                        if others == 0.0 { 0.0 } else { f64::INFINITY }
                    })
                    .collect()
            }
            Dependency::Affine { terms, .. } => terms.iter().map(|(_, c)| *c).collect(),
        }
    }
}
