//! Dependency-graph field evaluation and derivative propagation.
//!
//! [`State`] is the explicit context object of one simulation: it owns
//! the meshes, the [`FieldStore`](thaw_store::FieldStore) and every
//! registered evaluator. Its life cycle has two strictly separate phases:
//!
//! 1. **Declaration.** Evaluators are [registered](State::register), then
//!    [`State::setup`] validates the dependency graph (cycles, undefined
//!    and duplicate keys) and declares every field with its shape and
//!    owner. Nothing is computed.
//! 2. **Evaluation.** Primary fields are written through
//!    [`State::primary_mut`], each write drawing a fresh [`Epoch`](thaw_core::Epoch).
//!    Reads ([`State::field`], [`State::has_changed`]) recompute stale
//!    secondary fields depth-first, each at most once per upstream change.
//!    [`State::derivative`] applies the chain rule over the same graph.
//!
//! [`StateConfig`] builds a state from a JSON document through an
//! [`EvaluatorFactory`](thaw_evaluator::EvaluatorFactory).

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod config;
pub mod derivative;
pub mod metrics;
pub mod state;

pub use config::{MeshSpec, StateConfig};
pub use derivative::{DerivativeRef, DerivativeStructure};
pub use metrics::EvalMetrics;
pub use state::{FieldStatus, State};
