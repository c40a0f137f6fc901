//! Affine combination: `y = b + Σ c_i x_i`.

use thaw_core::{ConfigError, EvalError, FieldKey, IoFlags, ParamReader, ParameterList};
use thaw_evaluator::{EvalContext, Evaluator, EVALUATOR_TYPE_KEY};

/// `y = shift + Σ_i c_i x_i`; `∂y/∂x_k = c_k` everywhere.
///
/// # Configuration
///
/// | key | default |
/// |-----|---------|
/// | `"field key"` | required |
/// | `"dependency keys"` | required, non-empty |
/// | `"coefficients"` | all 1.0 |
/// | `"constant shift"` | 0.0 |
#[derive(Clone, Debug)]
pub struct LinearCombination {
    key: FieldKey,
    deps: Vec<FieldKey>,
    coefficients: Vec<f64>,
    shift: f64,
    io: IoFlags,
}

impl LinearCombination {
    /// Type name under which the factory registers this evaluator.
    pub const TYPE_NAME: &'static str = "linear combination";

    /// `key = Σ c_i x_i` over `(x_i, c_i)` pairs.
    pub fn new<I, K>(key: impl Into<FieldKey>, terms: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = (K, f64)>,
        K: Into<FieldKey>,
    {
        let (deps, coefficients): (Vec<FieldKey>, Vec<f64>) =
            terms.into_iter().map(|(k, c)| (k.into(), c)).unzip();
        if deps.is_empty() {
            return Err(ConfigError::InvalidValue {
                context: Self::TYPE_NAME.into(),
                key: "dependency keys".into(),
                reason: "at least one dependency is required".into(),
            });
        }
        if let Some(c) = coefficients.iter().find(|c| !c.is_finite()) {
            return Err(ConfigError::InvalidValue {
                context: Self::TYPE_NAME.into(),
                key: "coefficients".into(),
                reason: format!("must be finite, got {c}"),
            });
        }
        Ok(Self {
            key: key.into(),
            deps,
            coefficients,
            shift: 0.0,
            io: IoFlags::default(),
        })
    }

    /// Add a constant to every entry.
    pub fn with_shift(mut self, shift: f64) -> Self {
        self.shift = shift;
        self
    }

    /// Build from a configuration record.
    pub fn from_params(plist: &ParameterList) -> Result<Self, ConfigError> {
        let mut r = ParamReader::new(plist, Self::TYPE_NAME);
        r.ignore(EVALUATOR_TYPE_KEY);
        let key = FieldKey::new(r.string("field key")?);
        let deps = r
            .opt_string_array("dependency keys")?
            .ok_or_else(|| ConfigError::MissingParameter {
                context: Self::TYPE_NAME.into(),
                key: "dependency keys".into(),
            })?;
        let coefficients = match r.opt_f64_array("coefficients")? {
            Some(c) if c.len() != deps.len() => {
                return Err(r.invalid(
                    "coefficients",
                    format!("{} coefficients for {} dependencies", c.len(), deps.len()),
                ))
            }
            Some(c) => c,
            None => vec![1.0; deps.len()],
        };
        let shift = r.f64_or("constant shift", 0.0)?;
        let io = r.io_flags(&key)?;
        r.finish()?;
        let mut ev = Self::new(key, deps.into_iter().zip(coefficients))?.with_shift(shift);
        ev.io = io;
        Ok(ev)
    }

    /// Factory constructor.
    pub fn construct(plist: &ParameterList) -> Result<Box<dyn Evaluator>, ConfigError> {
        Ok(Box::new(Self::from_params(plist)?))
    }
}

impl Evaluator for LinearCombination {
    fn name(&self) -> &str {
        Self::TYPE_NAME
    }

    fn key(&self) -> &FieldKey {
        &self.key
    }

    fn dependencies(&self) -> &[FieldKey] {
        &self.deps
    }

    fn io_flags(&self) -> IoFlags {
        self.io
    }

    fn evaluate(&self, ctx: &mut EvalContext<'_>) -> Result<(), EvalError> {
        ctx.map_pointwise(&self.deps, |_, x| {
            Ok(x.iter()
                .zip(&self.coefficients)
                .fold(self.shift, |acc, (x, c)| acc + c * x))
        })
    }

    fn partial_derivative(
        &self,
        ctx: &mut EvalContext<'_>,
        wrt: &FieldKey,
    ) -> Result<(), EvalError> {
        // Repeated dependencies contribute once per occurrence.
        let slope: f64 = self
            .deps
            .iter()
            .zip(&self.coefficients)
            .filter(|(d, _)| *d == wrt)
            .map(|(_, c)| c)
            .sum();
        ctx.output().put_scalar(slope);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use thaw_test_utils::{cells, EvalHarness};

    #[test]
    fn combines_with_shift() {
        let mut h = EvalHarness::column(2);
        h.set_cells("a", &[1.0, 2.0]).set_cells("b", &[10.0, 20.0]);
        let ev = LinearCombination::new("y", [("a", 2.0), ("b", -0.5)])
            .unwrap()
            .with_shift(1.0);
        assert_eq!(cells(&h.evaluate(&ev).unwrap()), &[-2.0, -5.0]);
        assert_eq!(cells(&h.partial(&ev, &FieldKey::new("b")).unwrap()), &[-0.5, -0.5]);
    }

    #[test]
    fn from_params_defaults_to_unit_coefficients() {
        let plist = ParameterList::new()
            .with(EVALUATOR_TYPE_KEY, LinearCombination::TYPE_NAME)
            .with("field key", "total_water")
            .with("dependency keys", &["water_liquid", "water_ice"][..]);
        let ev = LinearCombination::from_params(&plist).unwrap();
        let mut h = EvalHarness::column(1);
        h.fill_cells("water_liquid", 3.0).fill_cells("water_ice", 4.0);
        assert_eq!(cells(&h.evaluate(&ev).unwrap()), &[7.0]);
    }

    #[test]
    fn empty_combination_rejected() {
        let terms: [(&str, f64); 0] = [];
        assert!(matches!(
            LinearCombination::new("y", terms),
            Err(ConfigError::InvalidValue { .. })
        ));
    }
}
