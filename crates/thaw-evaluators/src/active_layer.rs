//! Average temperature of the thawed part of a soil column.
//!
//! The output lives on the single-cell surface mesh `surface_column_<n>`
//! and reads temperature on the column mesh `column_<n>` beneath it.

use thaw_core::{
    CompositeSpace, ConfigError, EntityKind, EvalError, FieldKey, IoFlags, ParamReader,
    ParameterList,
};
use thaw_evaluator::{EvalContext, Evaluator, EVALUATOR_TYPE_KEY};
use thaw_mesh::{MeshError, MeshSet};

/// Freezing point of water in K.
pub const FREEZING_POINT: f64 = 273.15;

const SURFACE_PREFIX: &str = "surface_";

/// Mean temperature of the column cells at or above
/// `273.15 + 0.5 · transition width`.
///
/// A column with no such cell yields exactly `0.0`; callers treat that as
/// "no active layer". Forces one update on first request so the surface
/// value exists before anyone checks it for changes. Derivatives are not
/// implemented.
///
/// # Configuration
///
/// | key | default |
/// |-----|---------|
/// | `"field key"` | required, domain must be `surface_column_<n>` |
/// | `"temperature key"` | `temperature` |
/// | `"transition width [K]"` | 0.2 |
#[derive(Clone, Debug)]
pub struct ActiveLayerAverageTemp {
    key: FieldKey,
    deps: [FieldKey; 1],
    threshold: f64,
    io: IoFlags,
}

impl ActiveLayerAverageTemp {
    /// Type name under which the factory registers this evaluator.
    pub const TYPE_NAME: &'static str = "active layer average temperature";

    /// Default width of the freeze/thaw transition.
    pub const DEFAULT_TRANSITION_WIDTH: f64 = 0.2;

    /// Evaluator for the output `key`, which must live on a
    /// `surface_column_<n>` domain.
    pub fn new(key: impl Into<FieldKey>, transition_width: f64) -> Result<Self, ConfigError> {
        Self::with_temperature(key, "temperature", transition_width)
    }

    /// As [`new`](Self::new), reading `<column>-<temperature>` instead of
    /// `<column>-temperature`.
    pub fn with_temperature(
        key: impl Into<FieldKey>,
        temperature: &str,
        transition_width: f64,
    ) -> Result<Self, ConfigError> {
        let key = key.into();
        let column = column_domain(key.domain()).ok_or_else(|| ConfigError::InvalidValue {
            context: Self::TYPE_NAME.into(),
            key: "field key".into(),
            reason: format!(
                "domain '{}' is not of the form 'surface_column_<n>'",
                key.domain()
            ),
        })?;
        if !transition_width.is_finite() || transition_width < 0.0 {
            return Err(ConfigError::InvalidValue {
                context: Self::TYPE_NAME.into(),
                key: "transition width [K]".into(),
                reason: format!("must be finite and >= 0, got {transition_width}"),
            });
        }
        let dep = FieldKey::on_domain(column, temperature);
        Ok(Self {
            key,
            deps: [dep],
            threshold: FREEZING_POINT + 0.5 * transition_width,
            io: IoFlags::default(),
        })
    }

    /// Temperature at and above which a cell counts as thawed.
    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    /// Key of the column temperature this evaluator reads.
    pub fn temperature_key(&self) -> &FieldKey {
        &self.deps[0]
    }

    /// Build from a configuration record.
    pub fn from_params(plist: &ParameterList) -> Result<Self, ConfigError> {
        let mut r = ParamReader::new(plist, Self::TYPE_NAME);
        r.ignore(EVALUATOR_TYPE_KEY);
        let key = FieldKey::new(r.string("field key")?);
        let temperature = r.string_or("temperature key", "temperature")?;
        let width = r.f64_or("transition width [K]", Self::DEFAULT_TRANSITION_WIDTH)?;
        let io = r.io_flags(&key)?;
        r.finish()?;
        Ok(Self {
            io,
            ..Self::with_temperature(key, &temperature, width)?
        })
    }

    /// Factory constructor.
    pub fn construct(plist: &ParameterList) -> Result<Box<dyn Evaluator>, ConfigError> {
        Ok(Box::new(Self::from_params(plist)?))
    }
}

/// `surface_column_7` → `column_7`.
fn column_domain(surface: &str) -> Option<&str> {
    let column = surface.strip_prefix(SURFACE_PREFIX)?;
    let index = column.strip_prefix("column_")?;
    if index.is_empty() || !index.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    Some(column)
}

/// Mean of the entries at or above `threshold`, or `0.0` when there are
/// none.
pub fn thawed_mean(temperatures: &[f64], threshold: f64) -> f64 {
    let (sum, count) = temperatures
        .iter()
        .filter(|&&t| t >= threshold)
        .fold((0.0, 0usize), |(s, n), t| (s + t, n + 1));
    if count == 0 {
        0.0
    } else {
        sum / count as f64
    }
}

impl Evaluator for ActiveLayerAverageTemp {
    fn name(&self) -> &str {
        Self::TYPE_NAME
    }

    fn key(&self) -> &FieldKey {
        &self.key
    }

    fn dependencies(&self) -> &[FieldKey] {
        &self.deps
    }

    fn dependency_spaces(
        &self,
        meshes: &MeshSet,
    ) -> Result<Vec<(FieldKey, CompositeSpace)>, MeshError> {
        let dep = &self.deps[0];
        let space = meshes.get(dep.domain())?.space(&[EntityKind::Cell]);
        Ok(vec![(dep.clone(), space)])
    }

    fn io_flags(&self) -> IoFlags {
        self.io
    }

    fn forces_initial_update(&self) -> bool {
        true
    }

    fn evaluate(&self, ctx: &mut EvalContext<'_>) -> Result<(), EvalError> {
        let dep = &self.deps[0];
        let temperatures = ctx
            .input(dep)?
            .owned(EntityKind::Cell)
            .ok_or_else(|| EvalError::MissingInput { key: dep.clone() })?;
        if let Some(i) = temperatures.iter().position(|t| t.is_nan()) {
            return Err(EvalError::Domain {
                entity: Some(i),
                reason: "temperature is NaN".into(),
            });
        }
        ctx.output().put_scalar(thawed_mean(temperatures, self.threshold));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use thaw_test_utils::{cells, surface_columns, EvalHarness};

    fn harness(temps: &[f64]) -> EvalHarness {
        let mut h = EvalHarness::new(surface_columns(2, temps.len()));
        h.set_cells("column_1-temperature", temps);
        h
    }

    #[test]
    fn dependency_follows_surface_domain() {
        let ev = ActiveLayerAverageTemp::new("surface_column_1-active_layer_temperature", 0.2)
            .unwrap();
        assert_eq!(ev.temperature_key().name(), "column_1-temperature");
        assert!(ev.forces_initial_update());
        assert!((ev.threshold() - 273.25).abs() < 1e-12);

        let meshes = surface_columns(2, 5);
        let spaces = ev.dependency_spaces(&meshes).unwrap();
        assert_eq!(spaces[0].1.mesh, "column_1");
        assert_eq!(spaces[0].1.len(), 5);
        assert_eq!(ev.output_space(&meshes).unwrap().len(), 1);
    }

    #[test]
    fn averages_thawed_cells_only() {
        let h = harness(&[270.0, 274.0, 276.0, 273.2]);
        let ev = ActiveLayerAverageTemp::new("surface_column_1-alt", 0.2).unwrap();
        let out = h.evaluate(&ev).unwrap();
        assert_eq!(cells(&out), &[275.0]);
    }

    #[test]
    fn threshold_is_inclusive() {
        let h = harness(&[273.25, 260.0]);
        let ev = ActiveLayerAverageTemp::new("surface_column_1-alt", 0.2).unwrap();
        assert_eq!(cells(&h.evaluate(&ev).unwrap()), &[273.25]);
    }

    #[test]
    fn frozen_column_yields_zero() {
        let h = harness(&[260.0, 265.0, 273.2]);
        let ev = ActiveLayerAverageTemp::new("surface_column_1-alt", 0.2).unwrap();
        assert_eq!(cells(&h.evaluate(&ev).unwrap()), &[0.0]);
    }

    #[test]
    fn derivative_is_refused() {
        let h = harness(&[280.0]);
        let ev = ActiveLayerAverageTemp::new("surface_column_1-alt", 0.2).unwrap();
        assert!(matches!(
            h.partial(&ev, ev.temperature_key()),
            Err(EvalError::DerivativeNotImplemented { .. })
        ));
    }

    #[test]
    fn non_surface_domain_rejected() {
        for key in ["alt", "column_1-alt", "surface_column_x-alt", "surface_column_-alt"] {
            match ActiveLayerAverageTemp::new(key, 0.2) {
                Err(ConfigError::InvalidValue { key: param, .. }) => assert_eq!(param, "field key"),
                other => panic!("expected InvalidValue for {key}, got {other:?}"),
            }
        }
    }

    #[test]
    fn from_params_reads_width_and_flags() {
        let plist = ParameterList::new()
            .with(EVALUATOR_TYPE_KEY, ActiveLayerAverageTemp::TYPE_NAME)
            .with("field key", "surface_column_0-alt")
            .with("transition width [K]", 1.0)
            .with("checkpoint surface_column_0-alt", true);
        let ev = ActiveLayerAverageTemp::from_params(&plist).unwrap();
        assert!((ev.threshold() - 273.65).abs() < 1e-12);
        assert!(ev.io_flags().checkpoint);

        let negative = ParameterList::new()
            .with("field key", "surface_column_0-alt")
            .with("transition width [K]", -1.0);
        assert!(matches!(
            ActiveLayerAverageTemp::from_params(&negative),
            Err(ConfigError::InvalidValue { .. })
        ));
    }

    proptest! {
        #[test]
        fn mean_is_zero_or_above_threshold(
            temps in prop::collection::vec(250.0f64..300.0, 1..20),
        ) {
            let threshold = FREEZING_POINT + 0.1;
            let mean = thawed_mean(&temps, threshold);
            prop_assert!(mean == 0.0 || mean >= threshold);
            let max = temps.iter().cloned().fold(f64::MIN, f64::max);
            prop_assert!(mean <= max + 1e-9);
        }
    }
}
