//! Product of powers: `y = c · Π x_i^{e_i}`.
//!
//! Constructed via the builder pattern: [`Multiplicative::builder`], or
//! from configuration.

use thaw_core::{ConfigError, EvalError, FieldKey, IoFlags, ParamReader, ParameterList};
use thaw_evaluator::{EvalContext, Evaluator, EVALUATOR_TYPE_KEY};

/// `y = coefficient · Π_i x_i^{e_i}` with analytic partials
/// `∂y/∂x_k = e_k · y / x_k` (evaluated without the division).
///
/// Domain policy: any non-finite value or partial (e.g. a negative base
/// with a fractional exponent, or zero to a negative power) fails with
/// [`EvalError::Domain`].
///
/// # Construction
///
/// ```
/// use thaw_evaluators::Multiplicative;
/// use thaw_evaluator::Evaluator;
///
/// let rho_u = Multiplicative::builder()
///     .key("energy")
///     .factor("molar_density", 1.0)
///     .factor("internal_energy", 1.0)
///     .coefficient(0.5)
///     .build()
///     .unwrap();
/// assert_eq!(rho_u.dependencies().len(), 2);
/// ```
///
/// # Configuration
///
/// | key | default |
/// |-----|---------|
/// | `"field key"` | required |
/// | `"dependency keys"` | required, non-empty, no repeats |
/// | `"exponents"` | all 1.0 |
/// | `"coefficient"` | 1.0 |
#[derive(Clone, Debug)]
pub struct Multiplicative {
    key: FieldKey,
    deps: Vec<FieldKey>,
    exponents: Vec<f64>,
    coefficient: f64,
    io: IoFlags,
}

/// Builder for [`Multiplicative`].
///
/// Required: `key` and at least one `factor`.
pub struct MultiplicativeBuilder {
    key: Option<FieldKey>,
    factors: Vec<(FieldKey, f64)>,
    coefficient: f64,
    io: IoFlags,
}

impl Multiplicative {
    /// Type name under which the factory registers this evaluator.
    pub const TYPE_NAME: &'static str = "multiplicative";

    /// Create a new builder.
    pub fn builder() -> MultiplicativeBuilder {
        MultiplicativeBuilder {
            key: None,
            factors: Vec::new(),
            coefficient: 1.0,
            io: IoFlags::default(),
        }
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
        let exponents = match r.opt_f64_array("exponents")? {
            Some(e) if e.len() != deps.len() => {
                return Err(r.invalid(
                    "exponents",
                    format!("{} exponents for {} dependencies", e.len(), deps.len()),
                ))
            }
            Some(e) => e,
            None => vec![1.0; deps.len()],
        };
        let coefficient = r.f64_or("coefficient", 1.0)?;
        let io = r.io_flags(&key)?;
        r.finish()?;

        let mut b = Self::builder().key(key).coefficient(coefficient).io_flags(io);
        for (dep, e) in deps.into_iter().zip(exponents) {
            b = b.factor(dep, e);
        }
        b.build()
    }

    /// Factory constructor.
    pub fn construct(plist: &ParameterList) -> Result<Box<dyn Evaluator>, ConfigError> {
        Ok(Box::new(Self::from_params(plist)?))
    }

    /// Exponent of each dependency, in dependency order.
    pub fn exponents(&self) -> &[f64] {
        &self.exponents
    }

    /// Leading coefficient.
    pub fn coefficient(&self) -> f64 {
        self.coefficient
    }

    fn value(&self, x: &[f64]) -> f64 {
        x.iter()
            .zip(&self.exponents)
            .fold(self.coefficient, |acc, (x, e)| acc * x.powf(*e))
    }

    fn partial(&self, k: usize, x: &[f64]) -> f64 {
        let e_k = self.exponents[k];
        if e_k == 0.0 {
            return 0.0;
        }
        x.iter()
            .zip(&self.exponents)
            .enumerate()
            .fold(self.coefficient * e_k, |acc, (i, (x, e))| {
                if i == k {
                    acc * x.powf(e - 1.0)
                } else {
                    acc * x.powf(*e)
                }
            })
    }
}

fn finite(i: usize, value: f64, what: &str) -> Result<f64, EvalError> {
    if value.is_finite() {
        Ok(value)
    } else {
        Err(EvalError::Domain {
            entity: Some(i),
            reason: format!("{what} is {value}"),
        })
    }
}

impl MultiplicativeBuilder {
    /// Set the output key.
    pub fn key(mut self, key: impl Into<FieldKey>) -> Self {
        self.key = Some(key.into());
        self
    }

    /// Append a factor `dep^exponent`.
    pub fn factor(mut self, dep: impl Into<FieldKey>, exponent: f64) -> Self {
        self.factors.push((dep.into(), exponent));
        self
    }

    /// Set the leading coefficient (default 1.0).
    pub fn coefficient(mut self, c: f64) -> Self {
        self.coefficient = c;
        self
    }

    /// Set the output's IO flags.
    pub fn io_flags(mut self, io: IoFlags) -> Self {
        self.io = io;
        self
    }

    /// Build the evaluator, validating all configuration.
    ///
    /// # Errors
    ///
    /// [`ConfigError`] if:
    /// - `key` is not set
    /// - no factor was added, or a dependency appears twice
    /// - the coefficient or an exponent is not finite
    pub fn build(self) -> Result<Multiplicative, ConfigError> {
        let invalid = |key: &str, reason: String| ConfigError::InvalidValue {
            context: Multiplicative::TYPE_NAME.into(),
            key: key.into(),
            reason,
        };
        let key = self.key.ok_or_else(|| ConfigError::MissingParameter {
            context: Multiplicative::TYPE_NAME.into(),
            key: "field key".into(),
        })?;
        if self.factors.is_empty() {
            return Err(invalid("dependency keys", "at least one dependency is required".into()));
        }
        for (i, (dep, e)) in self.factors.iter().enumerate() {
            if self.factors[..i].iter().any(|(d, _)| d == dep) {
                return Err(invalid("dependency keys", format!("'{dep}' listed twice")));
            }
            if !e.is_finite() {
                return Err(invalid("exponents", format!("exponent of '{dep}' is {e}")));
            }
        }
        if !self.coefficient.is_finite() {
            return Err(invalid("coefficient", format!("must be finite, got {}", self.coefficient)));
        }
        let (deps, exponents) = self.factors.into_iter().unzip();
        Ok(Multiplicative {
            key,
            deps,
            exponents,
            coefficient: self.coefficient,
            io: self.io,
        })
    }
}

impl Evaluator for Multiplicative {
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
        ctx.map_pointwise(&self.deps, |i, x| finite(i, self.value(x), "product"))
    }

    fn partial_derivative(
        &self,
        ctx: &mut EvalContext<'_>,
        wrt: &FieldKey,
    ) -> Result<(), EvalError> {
        let Some(k) = self.deps.iter().position(|d| d == wrt) else {
            ctx.output().put_scalar(0.0);
            return Ok(());
        };
        ctx.map_pointwise(&self.deps, |i, x| finite(i, self.partial(k, x), "partial derivative"))
    }
}
