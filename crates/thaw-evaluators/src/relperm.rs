//! Linear relative permeability: `k_rel = s`.

use thaw_core::{ConfigError, EvalError, FieldKey, IoFlags, ParamReader, ParameterList};
use thaw_evaluator::{EvalContext, Evaluator, EVALUATOR_TYPE_KEY};

/// Relative permeability equal to liquid saturation.
///
/// Domain policy: saturation outside `[0, 1]` (or NaN) fails with
/// [`EvalError::Domain`], for the value and the derivative alike.
///
/// # Configuration
///
/// | key | default |
/// |-----|---------|
/// | `"relative permeability key"` | `relative_permeability` |
/// | `"saturation key"` | `saturation_liquid` |
#[derive(Clone, Debug)]
pub struct LinearRelPerm {
    key: FieldKey,
    deps: [FieldKey; 1],
    io: IoFlags,
}

impl LinearRelPerm {
    /// Type name under which the factory registers this evaluator.
    pub const TYPE_NAME: &'static str = "linear relative permeability";

    /// `key = saturation`.
    pub fn new(key: impl Into<FieldKey>, saturation: impl Into<FieldKey>) -> Self {
        Self {
            key: key.into(),
            deps: [saturation.into()],
            io: IoFlags::default(),
        }
    }

    /// Build from a configuration record.
    pub fn from_params(plist: &ParameterList) -> Result<Self, ConfigError> {
        let mut r = ParamReader::new(plist, Self::TYPE_NAME);
        r.ignore(EVALUATOR_TYPE_KEY);
        let key = r.key_or("relative permeability key", "relative_permeability")?;
        let saturation = r.key_or("saturation key", "saturation_liquid")?;
        let io = r.io_flags(&key)?;
        r.finish()?;
        Ok(Self {
            io,
            ..Self::new(key, saturation)
        })
    }

    /// Factory constructor.
    pub fn construct(plist: &ParameterList) -> Result<Box<dyn Evaluator>, ConfigError> {
        Ok(Box::new(Self::from_params(plist)?))
    }

    fn checked(i: usize, s: f64) -> Result<f64, EvalError> {
        if (0.0..=1.0).contains(&s) {
            Ok(s)
        } else {
            Err(EvalError::Domain {
                entity: Some(i),
                reason: format!("saturation {s} outside [0, 1]"),
            })
        }
    }
}

impl Evaluator for LinearRelPerm {
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
        ctx.map_pointwise(&self.deps, |i, x| Self::checked(i, x[0]))
    }

    fn partial_derivative(
        &self,
        ctx: &mut EvalContext<'_>,
        wrt: &FieldKey,
    ) -> Result<(), EvalError> {
        if *wrt != self.deps[0] {
            ctx.output().put_scalar(0.0);
            return Ok(());
        }
        ctx.map_pointwise(&self.deps, |i, x| Self::checked(i, x[0]).map(|_| 1.0))
    }
}
