//! Rectangular 2D grid.

use crate::error::MeshError;
use crate::mesh::{Mesh, Ownership};
use smallvec::{smallvec, SmallVec};
use thaw_core::EntityKind;

/// A rectangular grid of `nx × ny` cells of size `dx × dy`.
///
/// Cells are numbered row-major, `c = j * nx + i`. Faces normal to `x`
/// come first (`(nx + 1) * ny` of them, row-major), followed by faces
/// normal to `y` (`nx * (ny + 1)`). [`cell_faces`](Mesh::cell_faces)
/// returns `[west, east, south, north]`.
///
/// # Examples
///
/// ```
/// use thaw_mesh::{Grid2D, Mesh, Ownership};
/// use thaw_core::EntityKind;
///
/// let g = Grid2D::new("domain", 3, 2, 1.0, 1.0).unwrap();
/// assert_eq!(g.entity_count(EntityKind::Cell, Ownership::All), 6);
/// assert_eq!(g.entity_count(EntityKind::Face, Ownership::All), 17);
/// assert_eq!(g.cell_faces(0).len(), 4);
/// ```
#[derive(Debug, Clone)]
pub struct Grid2D {
    name: String,
    nx: usize,
    ny: usize,
    dx: f64,
    dy: f64,
}

impl Grid2D {
    /// Create a grid.
    ///
    /// Returns `Err(MeshError::EmptyMesh)` if either dimension is zero and
    /// `Err(MeshError::InvalidGeometry)` if a spacing is not a positive
    /// finite number.
    pub fn new(
        name: impl Into<String>,
        nx: usize,
        ny: usize,
        dx: f64,
        dy: f64,
    ) -> Result<Self, MeshError> {
        let name = name.into();
        if nx == 0 || ny == 0 {
            return Err(MeshError::EmptyMesh { name });
        }
        for (label, h) in [("dx", dx), ("dy", dy)] {
            if !(h.is_finite() && h > 0.0) {
                return Err(MeshError::InvalidGeometry {
                    name,
                    reason: format!("{label} = {h}"),
                });
            }
        }
        Ok(Self {
            name,
            nx,
            ny,
            dx,
            dy,
        })
    }

    /// Cells along `x`.
    pub fn nx(&self) -> usize {
        self.nx
    }

    /// Cells along `y`.
    pub fn ny(&self) -> usize {
        self.ny
    }

    fn x_face_count(&self) -> usize {
        (self.nx + 1) * self.ny
    }

    fn is_x_face(&self, face: usize) -> bool {
        face < self.x_face_count()
    }
}

impl Mesh for Grid2D {
    fn name(&self) -> &str {
        &self.name
    }

    fn dim(&self) -> usize {
        2
    }

    fn entity_count(&self, kind: EntityKind, _ownership: Ownership) -> usize {
        match kind {
            EntityKind::Cell => self.nx * self.ny,
            EntityKind::Face => self.x_face_count() + self.nx * (self.ny + 1),
            EntityKind::Node => (self.nx + 1) * (self.ny + 1),
        }
    }

    fn cell_faces(&self, cell: usize) -> SmallVec<[usize; 6]> {
        if cell >= self.nx * self.ny {
            return SmallVec::new();
        }
        let (i, j) = (cell % self.nx, cell / self.nx);
        let west = j * (self.nx + 1) + i;
        let south = self.x_face_count() + j * self.nx + i;
        smallvec![west, west + 1, south, south + self.nx]
    }

    fn face_cells(&self, face: usize) -> SmallVec<[usize; 2]> {
        let mut cells = SmallVec::new();
        if self.is_x_face(face) {
            let (i, j) = (face % (self.nx + 1), face / (self.nx + 1));
            if i > 0 {
                cells.push(j * self.nx + i - 1);
            }
            if i < self.nx {
                cells.push(j * self.nx + i);
            }
        } else {
            let g = face - self.x_face_count();
            if g >= self.nx * (self.ny + 1) {
                return cells;
            }
            let (i, j) = (g % self.nx, g / self.nx);
            if j > 0 {
                cells.push((j - 1) * self.nx + i);
            }
            if j < self.ny {
                cells.push(j * self.nx + i);
            }
        }
        cells
    }

    fn cell_volume(&self, cell: usize) -> f64 {
        if cell < self.nx * self.ny {
            self.dx * self.dy
        } else {
            0.0
        }
    }

    fn face_area(&self, face: usize) -> f64 {
        if self.is_x_face(face) {
            self.dy
        } else {
            self.dx
        }
    }

    fn cell_face_distance(&self, _cell: usize, face: usize) -> f64 {
        if self.is_x_face(face) {
            0.5 * self.dx
        } else {
            0.5 * self.dy
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compliance;
    use proptest::prelude::*;

    #[test]
    fn rejects_degenerate() {
        assert!(matches!(
            Grid2D::new("g", 0, 3, 1.0, 1.0),
            Err(MeshError::EmptyMesh { .. })
        ));
        assert!(matches!(
            Grid2D::new("g", 2, 2, 1.0, 0.0),
            Err(MeshError::InvalidGeometry { .. })
        ));
    }

    #[test]
    fn corner_cell_faces() {
        let g = Grid2D::new("g", 3, 2, 1.0, 2.0).unwrap();
        // x-faces: 4 per row, 8 total; y-faces start at 8.
        assert_eq!(g.cell_faces(0).as_slice(), &[0, 1, 8, 11]);
        assert_eq!(g.cell_faces(5).as_slice(), &[6, 7, 13, 16]);
        assert_eq!(g.face_cells(1).as_slice(), &[0, 1]);
        assert_eq!(g.face_cells(11).as_slice(), &[0, 3]);
        assert_eq!(g.face_cells(16).as_slice(), &[5]);
    }

    #[test]
    fn face_geometry_depends_on_orientation() {
        let g = Grid2D::new("g", 2, 2, 1.0, 4.0).unwrap();
        assert_eq!(g.face_area(0), 4.0);
        assert_eq!(g.cell_face_distance(0, 0), 0.5);
        let south = g.cell_faces(0)[2];
        assert_eq!(g.face_area(south), 1.0);
        assert_eq!(g.cell_face_distance(0, south), 2.0);
    }

    #[test]
    fn compliance() {
        let g = Grid2D::new("g", 4, 3, 0.5, 0.25).unwrap();
        compliance::run_all(&g);
    }

    proptest! {
        #[test]
        fn adjacency_is_consistent(nx in 1usize..8, ny in 1usize..8) {
            let g = Grid2D::new("g", nx, ny, 1.0, 1.0).unwrap();
            compliance::assert_adjacency_symmetric(&g);
            compliance::assert_every_face_bounded(&g);
        }
    }
}
