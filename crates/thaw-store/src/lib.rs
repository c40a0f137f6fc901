//! Field storage for the Thaw field engine.
//!
//! The [`FieldStore`] is inert, keyed storage: it owns every field's data
//! ([`CompositeVector`]) together with its metadata (discretisation shape,
//! owning evaluator, change epoch, IO flags). It performs no computation.
//!
//! # Ownership
//!
//! Each key has at most one writer. The first [`Claim::Owner`] fixes it;
//! any later claim by a different owner fails with
//! [`StoreError::DuplicateOwner`]. Readers may declare a key any number of
//! times, but every declaration must agree on the shape.
//!
//! # Split borrows
//!
//! An evaluator reads its inputs while writing its output. The engine
//! [`checkout`](FieldStore::checkout)s the output vector, hands the
//! evaluator `&FieldStore` plus `&mut CompositeVector`, and
//! [`restore`](FieldStore::restore)s it afterwards.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod error;
pub mod store;
pub mod vector;

pub use error::StoreError;
pub use store::{Claim, FieldRecord, FieldStore};
pub use vector::CompositeVector;
