//! Core types for the Thaw field evaluation engine.
//!
//! This is the leaf crate with zero internal dependencies. It defines the
//! vocabulary shared by every other Thaw crate: field keys and tags, change
//! epochs, the shape of a distributed field ([`CompositeSpace`]), the
//! configuration tree ([`ParameterList`]) and the error taxonomy.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod error;
pub mod field;
pub mod id;
pub mod params;

pub use error::{ConfigError, ErrorClass, EvalError, ThawError};
pub use field::{ComponentSpace, CompositeSpace, EntityKind, IoFlags};
pub use id::{Epoch, FieldKey, DEFAULT_DOMAIN, DERIVATIVE_TAG_PREFIX};
pub use params::{ParamReader, ParamValue, ParameterList};
