//! Two-phase (liquid + gas) thermal conductivity of a porous medium.
//!
//! Computes `thermal_conductivity` pointwise from `porosity` and
//! `saturation_liquid` using one of two [`TwoPhaseModel`]s selected by
//! configuration. Results are in W m⁻¹ K⁻¹.

use thaw_core::{ConfigError, EvalError, FieldKey, IoFlags, ParamReader, ParameterList};
use thaw_evaluator::{EvalContext, Evaluator, EVALUATOR_TYPE_KEY};

/// Shape factor of the dry-conductivity mixing law (Peters-Lidard et al.
/// 1998, eq. 11).
pub const PETERS_LIDARD_SHAPE_FACTOR: f64 = 0.053;

/// Thermal conductivity as a function of porosity `φ` and liquid
/// saturation `s`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum TwoPhaseModel {
    /// Peters-Lidard mixing: a geometric-mean saturated conductivity and a
    /// weighted-harmonic dry conductivity blended by a Kersten number
    /// `(s + ε)^α`.
    PetersLidard {
        /// Conductivity of the mineral matrix.
        k_rock: f64,
        /// Conductivity of liquid water.
        k_liquid: f64,
        /// Conductivity of the gas phase.
        k_gas: f64,
        /// Kersten exponent.
        alpha: f64,
        /// Saturation regularisation.
        epsilon: f64,
    },
    /// Linear-in-Kersten blend of fixed wet and dry conductivities.
    WetDry {
        /// Conductivity at full saturation.
        k_wet: f64,
        /// Conductivity when dry.
        k_dry: f64,
        /// Kersten exponent.
        alpha: f64,
        /// Saturation regularisation.
        epsilon: f64,
    },
}

impl TwoPhaseModel {
    /// Configuration name of [`TwoPhaseModel::PetersLidard`].
    pub const PETERS_LIDARD: &'static str = "two-phase Peters-Lidard";
    /// Configuration name of [`TwoPhaseModel::WetDry`].
    pub const WET_DRY: &'static str = "two-phase wet/dry";

    /// Peters-Lidard with typical soil constants.
    pub fn peters_lidard() -> Self {
        Self::PetersLidard {
            k_rock: 0.2,
            k_liquid: 0.6065,
            k_gas: 0.02425,
            alpha: 1.0,
            epsilon: 1e-10,
        }
    }

    /// Read the model from a `"thermal conductivity parameters"` sublist.
    ///
    /// `"thermal conductivity type"` selects the model; the remaining keys
    /// depend on it:
    ///
    /// | model | key | default |
    /// |-------|-----|---------|
    /// | both | `"unsaturated alpha"` | 1.0 |
    /// | both | `"epsilon"` | 1e-10 |
    /// | Peters-Lidard | `"thermal conductivity of rock"` | 0.2 |
    /// | Peters-Lidard | `"thermal conductivity of liquid"` | 0.6065 |
    /// | Peters-Lidard | `"thermal conductivity of gas"` | 0.02425 |
    /// | wet/dry | `"thermal conductivity, wet"` | required |
    /// | wet/dry | `"thermal conductivity, dry"` | required |
    pub fn from_params(plist: &ParameterList) -> Result<Self, ConfigError> {
        let mut r = ParamReader::new(plist, "thermal conductivity parameters");
        let type_name = r.string("thermal conductivity type")?;
        let alpha = r.f64_or("unsaturated alpha", 1.0)?;
        let epsilon = r.f64_or("epsilon", 1e-10)?;
        let model = match type_name.as_str() {
            Self::PETERS_LIDARD => Self::PetersLidard {
                k_rock: r.f64_or("thermal conductivity of rock", 0.2)?,
                k_liquid: r.f64_or("thermal conductivity of liquid", 0.6065)?,
                k_gas: r.f64_or("thermal conductivity of gas", 0.02425)?,
                alpha,
                epsilon,
            },
            Self::WET_DRY => Self::WetDry {
                k_wet: r.f64("thermal conductivity, wet")?,
                k_dry: r.f64("thermal conductivity, dry")?,
                alpha,
                epsilon,
            },
            other => {
                return Err(r.invalid(
                    "thermal conductivity type",
                    format!(
                        "unknown model '{other}', expected '{}' or '{}'",
                        Self::PETERS_LIDARD,
                        Self::WET_DRY
                    ),
                ))
            }
        };
        model.check().map_err(|reason| r.invalid("thermal conductivity type", reason))?;
        r.finish()?;
        Ok(model)
    }

    fn check(&self) -> Result<(), String> {
        let (conductivities, alpha, epsilon) = match *self {
            Self::PetersLidard {
                k_rock,
                k_liquid,
                k_gas,
                alpha,
                epsilon,
            } => (vec![k_rock, k_liquid, k_gas], alpha, epsilon),
            Self::WetDry {
                k_wet,
                k_dry,
                alpha,
                epsilon,
            } => (vec![k_wet, k_dry], alpha, epsilon),
        };
        if let Some(k) = conductivities.iter().find(|k| !(**k > 0.0) || !k.is_finite()) {
            return Err(format!("conductivities must be finite and positive, got {k}"));
        }
        if !(alpha > 0.0) || !alpha.is_finite() {
            return Err(format!("unsaturated alpha must be finite and positive, got {alpha}"));
        }
        if !(epsilon >= 0.0) || !epsilon.is_finite() {
            return Err(format!("epsilon must be finite and >= 0, got {epsilon}"));
        }
        Ok(())
    }

    /// Conductivity at porosity `phi` and liquid saturation `sat`, both in
    /// `[0, 1]`.
    pub fn conductivity(&self, phi: f64, sat: f64) -> f64 {
        match *self {
            Self::PetersLidard {
                k_rock,
                k_liquid,
                k_gas,
                alpha,
                epsilon,
            } => {
                let d = PETERS_LIDARD_SHAPE_FACTOR;
                let k_dry = (d * (1.0 - phi) * k_rock + k_gas * phi) / (d * (1.0 - phi) + phi);
                let k_sat = k_rock.powf(1.0 - phi) * k_liquid.powf(phi);
                let kersten = (sat + epsilon).powf(alpha);
                k_dry + (k_sat - k_dry) * kersten
            }
            Self::WetDry {
                k_wet,
                k_dry,
                alpha,
                epsilon,
            } => {
                let kersten = (sat + epsilon).powf(alpha);
                k_dry + (k_wet - k_dry) * kersten
            }
        }
    }
}

/// Two-phase thermal conductivity evaluator.
///
/// Domain policy: porosity or saturation outside `[0, 1]` (or NaN) fails
/// with [`EvalError::Domain`] naming the first offending entity. No
/// clamping is performed. Derivatives are not implemented.
///
/// # Configuration
///
/// | key | default |
/// |-----|---------|
/// | `"thermal conductivity key"` | `thermal_conductivity` |
/// | `"porosity key"` | `porosity` |
/// | `"saturation key"` | `saturation_liquid` |
/// | `"thermal conductivity parameters"` | required sublist, see [`TwoPhaseModel::from_params`] |
#[derive(Clone, Debug)]
pub struct ThermalConductivityTwoPhase {
    key: FieldKey,
    deps: [FieldKey; 2],
    model: TwoPhaseModel,
    io: IoFlags,
}

impl ThermalConductivityTwoPhase {
    /// Type name under which the factory registers this evaluator.
    pub const TYPE_NAME: &'static str = "thermal conductivity two-phase";

    /// Evaluator with the default field keys.
    pub fn new(model: TwoPhaseModel) -> Self {
        Self::with_keys("thermal_conductivity", "porosity", "saturation_liquid", model)
    }

    /// Evaluator with explicit output, porosity and saturation keys.
    pub fn with_keys(
        key: impl Into<FieldKey>,
        porosity: impl Into<FieldKey>,
        saturation: impl Into<FieldKey>,
        model: TwoPhaseModel,
    ) -> Self {
        Self {
            key: key.into(),
            deps: [porosity.into(), saturation.into()],
            model,
            io: IoFlags::default(),
        }
    }

    /// The conductivity model.
    pub fn model(&self) -> &TwoPhaseModel {
        &self.model
    }

    /// Build from a configuration record.
    pub fn from_params(plist: &ParameterList) -> Result<Self, ConfigError> {
        let mut r = ParamReader::new(plist, Self::TYPE_NAME);
        r.ignore(EVALUATOR_TYPE_KEY);
        let key = r.key_or("thermal conductivity key", "thermal_conductivity")?;
        let porosity = r.key_or("porosity key", "porosity")?;
        let saturation = r.key_or("saturation key", "saturation_liquid")?;
        let model = TwoPhaseModel::from_params(r.sublist("thermal conductivity parameters")?)?;
        let io = r.io_flags(&key)?;
        r.finish()?;
        Ok(Self {
            io,
            ..Self::with_keys(key, porosity, saturation, model)
        })
    }

    /// Factory constructor.
    pub fn construct(plist: &ParameterList) -> Result<Box<dyn Evaluator>, ConfigError> {
        Ok(Box::new(Self::from_params(plist)?))
    }
}

fn check_unit_interval(name: &str, value: f64, entity: usize) -> Result<(), EvalError> {
    if (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(EvalError::Domain {
            entity: Some(entity),
            reason: format!("{name} {value} outside [0, 1]"),
        })
    }
}

impl Evaluator for ThermalConductivityTwoPhase {
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
        ctx.map_pointwise(&self.deps, |i, x| {
            let (phi, sat) = (x[0], x[1]);
            check_unit_interval("porosity", phi, i)?;
            check_unit_interval("saturation", sat, i)?;
            Ok(self.model.conductivity(phi, sat))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use thaw_test_utils::{assert_close, cells, EvalHarness};

    fn wet_dry() -> TwoPhaseModel {
        TwoPhaseModel::WetDry {
            k_wet: 2.0,
            k_dry: 0.5,
            alpha: 1.0,
            epsilon: 0.0,
        }
    }

    #[test]
    fn wet_dry_interpolates_in_saturation() {
        let mut h = EvalHarness::column(3);
        h.fill_cells("porosity", 0.4)
            .set_cells("saturation_liquid", &[0.0, 0.5, 1.0]);
        let out = h.evaluate(&ThermalConductivityTwoPhase::new(wet_dry())).unwrap();
        assert_close(cells(&out), &[0.5, 1.25, 2.0], 1e-12);
    }

    #[test]
    fn peters_lidard_endpoints() {
        let model = TwoPhaseModel::PetersLidard {
            k_rock: 2.0,
            k_liquid: 0.5,
            k_gas: 0.025,
            alpha: 1.0,
            epsilon: 0.0,
        };
        let phi = 0.3_f64;
        let d = PETERS_LIDARD_SHAPE_FACTOR;
        let k_dry = (d * 0.7 * 2.0 + 0.025 * phi) / (d * 0.7 + phi);
        let k_sat = 2.0_f64.powf(0.7) * 0.5_f64.powf(0.3);
        assert!((model.conductivity(phi, 0.0) - k_dry).abs() < 1e-12);
        assert!((model.conductivity(phi, 1.0) - k_sat).abs() < 1e-12);
        let mid = model.conductivity(phi, 0.5);
        assert!((mid - 0.5 * (k_dry + k_sat)).abs() < 1e-12);
    }

    #[test]
    fn pure_rock_is_rock_conductivity() {
        let model = TwoPhaseModel::peters_lidard();
        for s in [0.0, 0.3, 1.0] {
            assert!((model.conductivity(0.0, s) - 0.2).abs() < 1e-9);
        }
    }

    #[test]
    fn saturation_out_of_range_is_domain_error() {
        let mut h = EvalHarness::column(3);
        h.fill_cells("porosity", 0.4)
            .set_cells("saturation_liquid", &[0.2, 1.2, 0.4]);
        match h.evaluate(&ThermalConductivityTwoPhase::new(wet_dry())) {
            Err(EvalError::Domain { entity, reason }) => {
                assert_eq!(entity, Some(1));
                assert!(reason.contains("saturation"), "{reason}");
            }
            other => panic!("expected Domain, got {other:?}"),
        }
    }

    #[test]
    fn nan_porosity_is_domain_error() {
        let mut h = EvalHarness::column(2);
        h.set_cells("porosity", &[0.3, f64::NAN])
            .fill_cells("saturation_liquid", 0.5);
        assert!(matches!(
            h.evaluate(&ThermalConductivityTwoPhase::new(wet_dry())),
            Err(EvalError::Domain { entity: Some(1), .. })
        ));
    }

    #[test]
    fn derivative_is_refused() {
        let mut h = EvalHarness::column(1);
        h.fill_cells("porosity", 0.4).fill_cells("saturation_liquid", 0.5);
        let ev = ThermalConductivityTwoPhase::new(wet_dry());
        let wrt = FieldKey::new("saturation_liquid");
        assert_eq!(
            h.partial(&ev, &wrt).unwrap_err(),
            EvalError::DerivativeNotImplemented { wrt }
        );
    }

    #[test]
    fn from_params_defaults_and_model_selection() {
        let plist = ParameterList::new()
            .with(EVALUATOR_TYPE_KEY, ThermalConductivityTwoPhase::TYPE_NAME)
            .with("porosity key", "phi")
            .with(
                "thermal conductivity parameters",
                ParameterList::new()
                    .with("thermal conductivity type", TwoPhaseModel::WET_DRY)
                    .with("thermal conductivity, wet", 2.0)
                    .with("thermal conductivity, dry", 0.5),
            );
        let ev = ThermalConductivityTwoPhase::from_params(&plist).unwrap();
        assert_eq!(ev.key().name(), "thermal_conductivity");
        assert_eq!(ev.dependencies()[0].name(), "phi");
        assert_eq!(ev.dependencies()[1].name(), "saturation_liquid");
        assert!(matches!(ev.model(), TwoPhaseModel::WetDry { .. }));
    }

    #[test]
    fn missing_parameters_sublist_rejected() {
        let plist = ParameterList::new().with("porosity key", "phi");
        match ThermalConductivityTwoPhase::from_params(&plist) {
            Err(ConfigError::MissingParameter { key, .. }) => {
                assert_eq!(key, "thermal conductivity parameters")
            }
            other => panic!("expected MissingParameter, got {other:?}"),
        }
    }

    #[test]
    fn unknown_model_and_stray_keys_rejected() {
        let unknown = ParameterList::new().with(
            "thermal conductivity parameters",
            ParameterList::new().with("thermal conductivity type", "three-phase"),
        );
        assert!(matches!(
            ThermalConductivityTwoPhase::from_params(&unknown),
            Err(ConfigError::InvalidValue { .. })
        ));

        let stray = ParameterList::new().with(
            "thermal conductivity parameters",
            ParameterList::new()
                .with("thermal conductivity type", TwoPhaseModel::PETERS_LIDARD)
                .with("thermal conductivity, wet", 2.0),
        );
        assert!(matches!(
            ThermalConductivityTwoPhase::from_params(&stray),
            Err(ConfigError::UnknownParameter { .. })
        ));
    }

    #[test]
    fn non_positive_conductivity_rejected() {
        let plist = ParameterList::new()
            .with("thermal conductivity type", TwoPhaseModel::WET_DRY)
            .with("thermal conductivity, wet", 2.0)
            .with("thermal conductivity, dry", 0.0);
        assert!(matches!(
            TwoPhaseModel::from_params(&plist),
            Err(ConfigError::InvalidValue { .. })
        ));
    }
}
