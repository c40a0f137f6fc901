//! Mesh trait compliance test helpers.
//!
//! These functions verify that a Mesh implementation satisfies the
//! invariants the preconditioners rely on. Reused across backend test
//! modules.

use crate::mesh::{Mesh, Ownership};
use thaw_core::EntityKind;

/// Assert that `f in cell_faces(c)` exactly when `c in face_cells(f)`.
pub fn assert_adjacency_symmetric(mesh: &dyn Mesh) {
    let ncells = mesh.entity_count(EntityKind::Cell, Ownership::All);
    let nfaces = mesh.entity_count(EntityKind::Face, Ownership::All);
    for c in 0..ncells {
        for f in mesh.cell_faces(c) {
            assert!(f < nfaces, "cell {c} lists face {f} >= {nfaces}");
            assert!(
                mesh.face_cells(f).contains(&c),
                "face {f} in F({c}) but {c} not in C({f})"
            );
        }
    }
    for f in 0..nfaces {
        for c in mesh.face_cells(f) {
            assert!(
                mesh.cell_faces(c).contains(&f),
                "cell {c} in C({f}) but {f} not in F({c})"
            );
        }
    }
}

/// Assert that every face bounds one or two cells.
pub fn assert_every_face_bounded(mesh: &dyn Mesh) {
    let nfaces = mesh.entity_count(EntityKind::Face, Ownership::All);
    for f in 0..nfaces {
        let n = mesh.face_cells(f).len();
        assert!((1..=2).contains(&n), "face {f} bounds {n} cells");
    }
}

/// Assert that owned counts never exceed total counts.
pub fn assert_counts_consistent(mesh: &dyn Mesh) {
    for kind in [EntityKind::Cell, EntityKind::Face, EntityKind::Node] {
        let owned = mesh.entity_count(kind, Ownership::Owned);
        let all = mesh.entity_count(kind, Ownership::All);
        assert!(owned <= all, "{kind}: owned {owned} > all {all}");
        let space = mesh.component_space(kind);
        assert_eq!(space.entities(), all);
    }
}

/// Assert that volumes, areas and centroid distances are positive.
pub fn assert_geometry_positive(mesh: &dyn Mesh) {
    let ncells = mesh.entity_count(EntityKind::Cell, Ownership::All);
    for c in 0..ncells {
        assert!(mesh.cell_volume(c) > 0.0, "cell {c} has no volume");
        for f in mesh.cell_faces(c) {
            assert!(mesh.face_area(f) > 0.0, "face {f} has no area");
            assert!(
                mesh.cell_face_distance(c, f) > 0.0,
                "cell {c} touches face {f} at zero distance"
            );
        }
    }
}

/// Run every compliance check.
pub fn run_all(mesh: &dyn Mesh) {
    assert_adjacency_symmetric(mesh);
    assert_every_face_bounded(mesh);
    assert_counts_consistent(mesh);
    assert_geometry_positive(mesh);
}
