//! Thaw: lazy field evaluation, derivative propagation and coupled
//! preconditioning for multiphysics simulation.
//!
//! This is the top-level facade crate that re-exports the public API from
//! all Thaw sub-crates.
//!
//! # Quick start
//!
//! ```rust
//! use thaw::prelude::*;
//!
//! let config = StateConfig::from_json(r#"{
//!     "meshes": [{ "type": "uniform_column", "name": "domain", "ncells": 5, "dz": 0.2 }],
//!     "evaluators": [
//!         { "evaluator type": "primary variable", "field key": "saturation_liquid" },
//!         { "evaluator type": "linear relative permeability" },
//!         { "evaluator type": "multiplicative", "field key": "mobility",
//!           "dependency keys": ["relative_permeability"], "exponents": [2.0] }
//!     ]
//! }"#).unwrap();
//! let mut state = config.build(&standard_factory()).unwrap();
//!
//! let s = FieldKey::new("saturation_liquid");
//! state.fill_primary(&s, 0.5).unwrap();
//! let mobility = FieldKey::new("mobility");
//! assert_eq!(state.field(&mobility).unwrap().norm_inf(), 0.25);
//!
//! // d(mobility)/ds = 2 k_rel · dk_rel/ds = 1.0
//! let d = state.derivative_field(&mobility, &s).unwrap();
//! assert_eq!(d.norm_inf(), 1.0);
//! ```
//!
//! # Modules
//!
//! | Module | Sub-crate | Contents |
//! |--------|-----------|----------|
//! | [`types`] | `thaw-core` | keys, epochs, spaces, parameter lists, errors |
//! | [`mesh`] | `thaw-mesh` | `Mesh` trait, column and grid backends |
//! | [`store`] | `thaw-store` | `CompositeVector`, `FieldStore` |
//! | [`evaluator`] | `thaw-evaluator` | `Evaluator` trait, factory, graph validation |
//! | [`evaluators`] | `thaw-evaluators` | closure-relation evaluators |
//! | [`engine`] | `thaw-engine` | `State`: lazy evaluation and derivatives |
//! | [`precon`] | `thaw-precon` | MFD and coupled-cells preconditioners |

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

/// Core types, keys and the error taxonomy (`thaw-core`).
pub use thaw_core as types;

/// Meshes and the mesh registry (`thaw-mesh`).
pub use thaw_mesh as mesh;

/// Field data and its ownership/epoch bookkeeping (`thaw-store`).
pub use thaw_store as store;

/// The evaluator trait and configuration-driven construction
/// (`thaw-evaluator`).
///
/// [`evaluator::Evaluator`] is the main extension point for user-defined
/// closure relations.
pub use thaw_evaluator as evaluator;

/// Closure-relation evaluators (`thaw-evaluators`).
pub use thaw_evaluators as evaluators;

/// The dependency-graph engine (`thaw-engine`).
///
/// [`engine::State`] owns every field and evaluator of one simulation.
pub use thaw_engine as engine;

/// Preconditioners (`thaw-precon`).
pub use thaw_precon as precon;

/// Common imports for typical Thaw usage.
///
/// ```rust
/// use thaw::prelude::*;
/// ```
pub mod prelude {
    // Core types
    pub use thaw_core::{
        CompositeSpace, EntityKind, Epoch, FieldKey, IoFlags, ParamReader, ParameterList,
    };

    // Errors
    pub use thaw_core::{ConfigError, ErrorClass, EvalError, ThawError};

    // Meshes and data
    pub use thaw_mesh::{ColumnMesh, Grid2D, Mesh, MeshSet};
    pub use thaw_store::CompositeVector;

    // Evaluators
    pub use thaw_evaluator::{
        EvalContext, Evaluator, EvaluatorFactory, EvaluatorKind, PrimaryVariable,
    };
    pub use thaw_evaluators::standard_factory;

    // Engine
    pub use thaw_engine::{
        DerivativeRef, DerivativeStructure, EvalMetrics, FieldStatus, MeshSpec, State,
        StateConfig,
    };

    // Preconditioners
    pub use thaw_precon::{
        CoupledCellsPreconditioner, CoupledPcConfig, InverseOperator, MfdPreconditioner,
        TreeVector,
    };
}
