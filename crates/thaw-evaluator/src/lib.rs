//! Evaluator trait and evaluation context for the Thaw field engine.
//!
//! An [`Evaluator`] computes one named field from a declared set of
//! dependency fields. Evaluators are `&self` and hold no mutable state;
//! epochs, caches and counters live in the engine. [`validate_graph`]
//! checks the dependency graph formed by a set of evaluators before any
//! computation runs, and [`EvaluatorFactory`] builds evaluators from
//! configuration records by type name.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod context;
pub mod evaluator;
pub mod factory;
pub mod graph;
pub mod primary;

pub use context::EvalContext;
pub use evaluator::{Evaluator, EvaluatorKind};
pub use factory::{Constructor, EvaluatorFactory, EVALUATOR_TYPE_KEY};
pub use graph::{validate_graph, EvaluationOrder, GraphError};
pub use primary::PrimaryVariable;
