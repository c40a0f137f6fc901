//! Serialisable description of a [`State`]: meshes plus evaluator records.
//!
//! [`StateConfig::build`] runs the whole declaration phase: meshes are
//! constructed, every evaluator record goes through the
//! [`EvaluatorFactory`], and [`State::setup`] validates the result. Any
//! structural error in the configuration surfaces here, before a single
//! field is computed.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thaw_core::{ConfigError, ParameterList, ThawError};
use thaw_evaluator::EvaluatorFactory;
use thaw_mesh::{ColumnMesh, Grid2D, Mesh, MeshError, MeshSet};

use crate::state::State;

// ── MeshSpec ───────────────────────────────────────────────────────

/// Construction parameters of one mesh.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case", deny_unknown_fields)]
pub enum MeshSpec {
    /// Column with the given cell thicknesses, top to bottom.
    Column {
        /// Mesh name.
        name: String,
        /// Cell thicknesses.
        dz: Vec<f64>,
    },
    /// Column of `ncells` equal cells.
    UniformColumn {
        /// Mesh name.
        name: String,
        /// Number of cells.
        ncells: usize,
        /// Cell thickness.
        dz: f64,
    },
    /// Structured rectangular grid.
    Grid2d {
        /// Mesh name.
        name: String,
        /// Cells along `x`.
        nx: usize,
        /// Cells along `y`.
        ny: usize,
        /// Cell width.
        dx: f64,
        /// Cell height.
        dy: f64,
    },
}

impl MeshSpec {
    /// Name of the mesh this spec builds.
    pub fn name(&self) -> &str {
        match self {
            Self::Column { name, .. } | Self::UniformColumn { name, .. } | Self::Grid2d { name, .. } => {
                name
            }
        }
    }

    /// Construct the mesh.
    pub fn build(&self) -> Result<Arc<dyn Mesh>, MeshError> {
        Ok(match self {
            Self::Column { name, dz } => Arc::new(ColumnMesh::new(name.clone(), dz.clone())?),
            Self::UniformColumn { name, ncells, dz } => {
                Arc::new(ColumnMesh::uniform(name.clone(), *ncells, *dz)?)
            }
            Self::Grid2d {
                name,
                nx,
                ny,
                dx,
                dy,
            } => Arc::new(Grid2D::new(name.clone(), *nx, *ny, *dx, *dy)?),
        })
    }
}

// ── StateConfig ────────────────────────────────────────────────────

/// Everything needed to build a [`State`].
///
/// # Examples
///
/// ```
/// use thaw_engine::StateConfig;
/// use thaw_evaluator::EvaluatorFactory;
///
/// let config = StateConfig::from_json(r#"{
///     "meshes": [{ "type": "uniform_column", "name": "domain", "ncells": 10, "dz": 0.1 }],
///     "evaluators": [
///         { "evaluator type": "primary variable", "field key": "temperature" }
///     ]
/// }"#).unwrap();
/// let state = config.build(&EvaluatorFactory::new()).unwrap();
/// assert!(state.is_setup());
/// ```
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StateConfig {
    /// Meshes, by name.
    pub meshes: Vec<MeshSpec>,
    /// One record per evaluator, each naming its `"evaluator type"`.
    #[serde(default)]
    pub evaluators: Vec<ParameterList>,
}

impl StateConfig {
    /// Parse a JSON document.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        serde_json::from_str(json).map_err(|e| ConfigError::Parse {
            reason: e.to_string(),
        })
    }

    /// Serialise to pretty-printed JSON.
    pub fn to_json(&self) -> Result<String, ConfigError> {
        serde_json::to_string_pretty(self).map_err(|e| ConfigError::Parse {
            reason: e.to_string(),
        })
    }

    /// Check structural invariants that need no evaluator construction.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.meshes.is_empty() {
            return Err(ConfigError::InvalidValue {
                context: "state".into(),
                key: "meshes".into(),
                reason: "at least one mesh is required".into(),
            });
        }
        Ok(())
    }

    /// Build the meshes, construct every evaluator and run
    /// [`State::setup`].
    pub fn build(&self, factory: &EvaluatorFactory) -> Result<State, ThawError> {
        self.validate()?;
        let mut meshes = MeshSet::new();
        for spec in &self.meshes {
            meshes.insert(spec.build()?)?;
        }
        let mut state = State::new(meshes);
        for plist in &self.evaluators {
            state.register(factory.create(plist)?)?;
        }
        state.setup()?;
        Ok(state)
    }
}
