//! Benchmark profiles for the Thaw field engine.
//!
//! - [`soil_profile`]: a freeze/thaw soil column with flow and energy
//!   closure relations on `ncells` cells
//! - [`soil_state`]: the profile built and initialised
//! - [`coupled_preconditioner`]: the flow/energy coupled-cells
//!   preconditioner assembled from a soil state

#![forbid(unsafe_code)]
#![deny(rustdoc::broken_intra_doc_links)]

use thaw_core::{FieldKey, ParameterList, ThawError};
use thaw_engine::{MeshSpec, State, StateConfig};
use thaw_evaluator::{PrimaryVariable, EVALUATOR_TYPE_KEY};
use thaw_evaluators::{
    standard_factory, LinearCombination, LinearRelPerm, Multiplicative,
    ThermalConductivityTwoPhase, TwoPhaseModel,
};
use thaw_precon::{CoupledCellsPreconditioner, CoupledPcConfig};

/// Step size used by [`coupled_preconditioner`], in seconds.
pub const STEP: f64 = 60.0;

fn primary(key: &str) -> ParameterList {
    ParameterList::new()
        .with(EVALUATOR_TYPE_KEY, PrimaryVariable::TYPE_NAME)
        .with("field key", key)
}

/// Soil column with `ncells` cells of 0.1 m.
///
/// Primaries `pressure`, `temperature` and `porosity`; secondaries
/// `saturation_liquid` (linear in both primaries), `water_content`,
/// `energy`, `thermal_conductivity` and `relative_permeability`.
pub fn soil_profile(ncells: usize) -> StateConfig {
    StateConfig {
        meshes: vec![MeshSpec::UniformColumn {
            name: "domain".into(),
            ncells,
            dz: 0.1,
        }],
        evaluators: vec![
            primary("pressure"),
            primary("temperature"),
            primary("porosity"),
            ParameterList::new()
                .with(EVALUATOR_TYPE_KEY, LinearCombination::TYPE_NAME)
                .with("field key", "saturation_liquid")
                .with("dependency keys", &["pressure", "temperature"][..])
                .with("coefficients", vec![1e-3, 0.01])
                .with("constant shift", 0.5 - 0.01 * 273.15),
            ParameterList::new()
                .with(EVALUATOR_TYPE_KEY, Multiplicative::TYPE_NAME)
                .with("field key", "water_content")
                .with("dependency keys", &["porosity", "saturation_liquid"][..])
                .with("coefficient", 1000.0),
            ParameterList::new()
                .with(EVALUATOR_TYPE_KEY, LinearCombination::TYPE_NAME)
                .with("field key", "energy")
                .with("dependency keys", &["temperature", "water_content"][..])
                .with("coefficients", vec![2.0e3, 334.0]),
            ParameterList::new()
                .with(EVALUATOR_TYPE_KEY, ThermalConductivityTwoPhase::TYPE_NAME)
                .with(
                    "thermal conductivity parameters",
                    ParameterList::new()
                        .with("thermal conductivity type", TwoPhaseModel::PETERS_LIDARD),
                ),
            ParameterList::new().with(EVALUATOR_TYPE_KEY, LinearRelPerm::TYPE_NAME),
        ],
    }
}

/// Build [`soil_profile`] and set every primary.
pub fn soil_state(ncells: usize) -> Result<State, ThawError> {
    let mut state = soil_profile(ncells).build(&standard_factory())?;
    state.fill_primary(&FieldKey::new("pressure"), 0.0)?;
    state.fill_primary(&FieldKey::new("temperature"), 273.15)?;
    state.fill_primary(&FieldKey::new("porosity"), 0.4)?;
    Ok(state)
}

/// Flow (`water_content`/`pressure`) and energy (`energy`/`temperature`)
/// subsystems, assembled and coupled at [`STEP`].
pub fn coupled_preconditioner(state: &mut State) -> Result<CoupledCellsPreconditioner, ThawError> {
    let config = CoupledPcConfig::pair("water_content", "pressure", "energy", "temperature");
    let mut pc = CoupledCellsPreconditioner::new(config, state.meshes())?;
    let subsystems = [
        ("relative_permeability", "water_content", "pressure"),
        ("thermal_conductivity", "energy", "temperature"),
    ];
    for (i, (k, q, y)) in subsystems.into_iter().enumerate() {
        let Some(sub) = pc.subsystem_mut(i) else {
            return Err(ThawError::NotFound {
                key: format!("subsystem {i}"),
            });
        };
        sub.assemble_from_state(
            state,
            &FieldKey::new(k),
            &FieldKey::new(q),
            &FieldKey::new(y),
            STEP,
        )?;
    }
    pc.update(state, STEP)?;
    Ok(pc)
}
