//! Vertical column of cells.

use crate::error::MeshError;
use crate::mesh::{Mesh, Ownership};
use smallvec::{smallvec, SmallVec};
use thaw_core::EntityKind;

/// A one-dimensional stack of cells with unit cross-section.
///
/// Cell `i` spans faces `i` (top) and `i + 1` (bottom), so a column of `n`
/// cells has `n + 1` faces and `n + 1` nodes. Cell thicknesses may vary.
///
/// # Examples
///
/// ```
/// use thaw_mesh::{ColumnMesh, Mesh, Ownership};
/// use thaw_core::EntityKind;
///
/// let col = ColumnMesh::uniform("column_0", 4, 0.25).unwrap();
/// assert_eq!(col.entity_count(EntityKind::Face, Ownership::All), 5);
/// assert_eq!(col.cell_faces(2).as_slice(), &[2, 3]);
/// assert_eq!(col.face_cells(0).as_slice(), &[0]);
/// ```
#[derive(Debug, Clone)]
pub struct ColumnMesh {
    name: String,
    dz: Vec<f64>,
}

impl ColumnMesh {
    /// Column with the given cell thicknesses, top to bottom.
    ///
    /// Returns `Err(MeshError::EmptyMesh)` if `dz` is empty and
    /// `Err(MeshError::InvalidGeometry)` if any thickness is not a positive
    /// finite number.
    pub fn new(name: impl Into<String>, dz: Vec<f64>) -> Result<Self, MeshError> {
        let name = name.into();
        if dz.is_empty() {
            return Err(MeshError::EmptyMesh { name });
        }
        if let Some(i) = dz.iter().position(|h| !(h.is_finite() && *h > 0.0)) {
            return Err(MeshError::InvalidGeometry {
                name,
                reason: format!("cell {i} has thickness {}", dz[i]),
            });
        }
        Ok(Self { name, dz })
    }

    /// Column of `ncells` cells of equal thickness `dz`.
    pub fn uniform(name: impl Into<String>, ncells: usize, dz: f64) -> Result<Self, MeshError> {
        Self::new(name, vec![dz; ncells])
    }

    /// Number of cells.
    pub fn ncells(&self) -> usize {
        self.dz.len()
    }

    /// Cell thicknesses, top to bottom.
    pub fn thicknesses(&self) -> &[f64] {
        &self.dz
    }
}

impl Mesh for ColumnMesh {
    fn name(&self) -> &str {
        &self.name
    }

    fn dim(&self) -> usize {
        1
    }

    fn entity_count(&self, kind: EntityKind, _ownership: Ownership) -> usize {
        match kind {
            EntityKind::Cell => self.dz.len(),
            EntityKind::Face | EntityKind::Node => self.dz.len() + 1,
        }
    }

    fn cell_faces(&self, cell: usize) -> SmallVec<[usize; 6]> {
        if cell < self.dz.len() {
            smallvec![cell, cell + 1]
        } else {
            SmallVec::new()
        }
    }

    fn face_cells(&self, face: usize) -> SmallVec<[usize; 2]> {
        let n = self.dz.len();
        let mut cells = SmallVec::new();
        if face > 0 && face <= n {
            cells.push(face - 1);
        }
        if face < n {
            cells.push(face);
        }
        cells
    }

    fn cell_volume(&self, cell: usize) -> f64 {
        self.dz.get(cell).copied().unwrap_or(0.0)
    }

    fn face_area(&self, _face: usize) -> f64 {
        1.0
    }

    fn cell_face_distance(&self, cell: usize, _face: usize) -> f64 {
        0.5 * self.cell_volume(cell)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compliance;
    use proptest::prelude::*;

    #[test]
    fn rejects_empty_and_non_positive() {
        assert!(matches!(
            ColumnMesh::new("c", vec![]),
            Err(MeshError::EmptyMesh { .. })
        ));
        assert!(matches!(
            ColumnMesh::new("c", vec![0.1, -0.2]),
            Err(MeshError::InvalidGeometry { .. })
        ));
        assert!(matches!(
            ColumnMesh::new("c", vec![f64::NAN]),
            Err(MeshError::InvalidGeometry { .. })
        ));
    }

    #[test]
    fn boundary_faces_have_one_cell() {
        let col = ColumnMesh::uniform("c", 3, 1.0).unwrap();
        assert_eq!(col.face_cells(0).as_slice(), &[0]);
        assert_eq!(col.face_cells(3).as_slice(), &[2]);
        assert_eq!(col.face_cells(1).as_slice(), &[0, 1]);
        assert!(col.face_cells(4).is_empty());
        assert!(col.cell_faces(3).is_empty());
    }

    #[test]
    fn geometry_uses_thickness() {
        let col = ColumnMesh::new("c", vec![0.5, 2.0]).unwrap();
        assert_eq!(col.cell_volume(1), 2.0);
        assert_eq!(col.cell_face_distance(1, 2), 1.0);
        assert_eq!(col.face_area(0), 1.0);
    }

    #[test]
    fn space_carries_mesh_name() {
        let col = ColumnMesh::uniform("column_2", 5, 0.1).unwrap();
        let s = col.space(&[EntityKind::Cell, EntityKind::Face]);
        assert_eq!(s.mesh, "column_2");
        assert_eq!(s.len(), 11);
    }

    #[test]
    fn compliance() {
        let col = ColumnMesh::new("c", vec![0.1, 0.2, 0.3, 0.4]).unwrap();
        compliance::run_all(&col);
    }

    proptest! {
        #[test]
        fn adjacency_is_consistent(n in 1usize..40) {
            let col = ColumnMesh::uniform("c", n, 1.0).unwrap();
            compliance::assert_adjacency_symmetric(&col);
            prop_assert_eq!(col.entity_count(EntityKind::Face, Ownership::Owned), n + 1);
        }
    }
}
