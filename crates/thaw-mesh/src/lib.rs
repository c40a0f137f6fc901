//! Meshes for the Thaw field engine.
//!
//! This crate defines the [`Mesh`] trait, the read-only geometry provider
//! consumed by evaluators (entity counts, per-cell averaging) and by the
//! preconditioners (cell/face block structure), along with two structured
//! backends and a registry of named meshes.
//!
//! # Backends
//!
//! - [`ColumnMesh`]: a vertical stack of cells, as used for subsurface
//!   columns beneath a surface cell
//! - [`Grid2D`]: a rectangular grid of `nx × ny` cells
//!
//! Fields are associated with meshes by name through [`MeshSet`].

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod column;
pub mod error;
pub mod grid2d;
pub mod mesh;
pub mod set;

#[cfg(test)]
pub(crate) mod compliance;

pub use column::ColumnMesh;
pub use error::MeshError;
pub use grid2d::Grid2D;
pub use mesh::{Mesh, Ownership};
pub use set::MeshSet;
