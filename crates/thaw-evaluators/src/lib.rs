//! Closure-relation evaluators for the Thaw field engine.
//!
//! Each evaluator plugs into the engine through the
//! [`Evaluator`](thaw_evaluator::Evaluator) trait and into configuration
//! through [`register_all`], which adds every type here to an
//! [`EvaluatorFactory`].
//!
//! | type name | evaluator | derivatives |
//! |-----------|-----------|-------------|
//! | `"thermal conductivity two-phase"` | [`ThermalConductivityTwoPhase`] | not implemented |
//! | `"active layer average temperature"` | [`ActiveLayerAverageTemp`] | not implemented |
//! | `"linear relative permeability"` | [`LinearRelPerm`] | analytic |
//! | `"multiplicative"` | [`Multiplicative`] | analytic |
//! | `"linear combination"` | [`LinearCombination`] | analytic |

#![forbid(unsafe_code)]
#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

pub mod active_layer;
pub mod linear_combination;
pub mod multiplicative;
pub mod relperm;
pub mod thermal_conductivity;

pub use active_layer::ActiveLayerAverageTemp;
pub use linear_combination::LinearCombination;
pub use multiplicative::Multiplicative;
pub use relperm::LinearRelPerm;
pub use thermal_conductivity::{ThermalConductivityTwoPhase, TwoPhaseModel};

use thaw_evaluator::EvaluatorFactory;

/// Register every evaluator type in this crate with `factory`.
pub fn register_all(factory: &mut EvaluatorFactory) -> &mut EvaluatorFactory {
    factory
        .register(
            ThermalConductivityTwoPhase::TYPE_NAME,
            ThermalConductivityTwoPhase::construct,
        )
        .register(
            ActiveLayerAverageTemp::TYPE_NAME,
            ActiveLayerAverageTemp::construct,
        )
        .register(LinearRelPerm::TYPE_NAME, LinearRelPerm::construct)
        .register(Multiplicative::TYPE_NAME, Multiplicative::construct)
        .register(LinearCombination::TYPE_NAME, LinearCombination::construct)
}

/// A factory knowing the primary variable plus every type in this crate.
pub fn standard_factory() -> EvaluatorFactory {
    let mut factory = EvaluatorFactory::new();
    register_all(&mut factory);
    factory
}
