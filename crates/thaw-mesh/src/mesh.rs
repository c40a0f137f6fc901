//! The core `Mesh` trait and `dyn Mesh` downcast support.

use smallvec::SmallVec;
use std::any::Any;
use thaw_core::{ComponentSpace, CompositeSpace, EntityKind};

/// Which entities an entity count includes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Ownership {
    /// Entities owned by this process.
    Owned,
    /// Owned entities followed by ghost copies of remote ones.
    All,
}

/// Read-only geometry and topology provider.
///
/// Evaluators consult a mesh for entity counts and per-cell geometry; the
/// preconditioners walk its cell/face adjacency to lay out their block
/// structure. Local entity ids run over `0..entity_count(kind, All)` with
/// owned entities first.
///
/// Adjacency queries are total: an index outside the valid range yields an
/// empty list.
///
/// # Thread Safety
///
/// Meshes are shared behind `Arc` by every field on them and must be
/// `Send + Sync`.
pub trait Mesh: Any + Send + Sync + 'static {
    /// Registry name; fields on this mesh carry the name as their domain.
    fn name(&self) -> &str;

    /// Number of spatial dimensions.
    fn dim(&self) -> usize;

    /// Number of entities of `kind`.
    fn entity_count(&self, kind: EntityKind, ownership: Ownership) -> usize;

    /// Faces bounding `cell`, in a deterministic backend-defined order.
    fn cell_faces(&self, cell: usize) -> SmallVec<[usize; 6]>;

    /// Cells sharing `face`: one for a boundary face, two for an interior one.
    fn face_cells(&self, face: usize) -> SmallVec<[usize; 2]>;

    /// Volume (length in 1D, area in 2D) of `cell`.
    fn cell_volume(&self, cell: usize) -> f64;

    /// Measure of `face` (unit in 1D, edge length in 2D).
    fn face_area(&self, face: usize) -> f64;

    /// Distance from the centroid of `cell` to the centroid of `face`.
    fn cell_face_distance(&self, cell: usize, face: usize) -> f64;

    /// Layout of a scalar component of `kind` on this mesh.
    fn component_space(&self, kind: EntityKind) -> ComponentSpace {
        let owned = self.entity_count(kind, Ownership::Owned);
        let all = self.entity_count(kind, Ownership::All);
        ComponentSpace {
            kind,
            owned,
            ghost: all.saturating_sub(owned),
            dofs: 1,
        }
    }

    /// Composite space on this mesh with one scalar component per kind.
    fn space(&self, kinds: &[EntityKind]) -> CompositeSpace {
        kinds
            .iter()
            .fold(CompositeSpace::new(self.name()), |space, &kind| {
                space.with_component(self.component_space(kind))
            })
    }
}

impl dyn Mesh {
    /// Attempt to downcast a trait object to a concrete mesh type.
    pub fn downcast_ref<T: Mesh>(&self) -> Option<&T> {
        (self as &dyn Any).downcast_ref::<T>()
    }
}
