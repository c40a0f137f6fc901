//! Test utilities and fixture evaluators for Thaw development.
//!
//! Provides an [`EvalHarness`] for running a single evaluator against
//! hand-filled inputs, mesh fixtures, and (in [`fixtures`]) counting
//! evaluators with known analytic derivatives for engine tests.

#![forbid(unsafe_code)]
#![allow(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

pub mod fixtures;

use std::sync::Arc;

use thaw_core::{CompositeSpace, EntityKind, EvalError, FieldKey};
use thaw_evaluator::{EvalContext, Evaluator};
use thaw_mesh::{ColumnMesh, MeshSet};
use thaw_store::{Claim, CompositeVector, FieldStore};

const HARNESS_OWNER: &str = "test harness";

/// A uniform column mesh named `"domain"` with `ncells` unit cells.
pub fn domain_column(ncells: usize) -> MeshSet {
    MeshSet::new()
        .with(ColumnMesh::uniform("domain", ncells, 1.0).expect("valid column"))
        .expect("unique mesh")
}

/// Meshes for `ncolumns` soil columns of `ncells` cells each, plus the
/// single-cell surface mesh above each one (`column_<n>`,
/// `surface_column_<n>`).
pub fn surface_columns(ncolumns: usize, ncells: usize) -> MeshSet {
    let mut set = MeshSet::new();
    for n in 0..ncolumns {
        let column = ColumnMesh::uniform(format!("column_{n}"), ncells, 0.1).expect("valid column");
        let surface = ColumnMesh::uniform(format!("surface_column_{n}"), 1, 1.0).expect("valid column");
        set.insert(Arc::new(column)).expect("unique mesh");
        set.insert(Arc::new(surface)).expect("unique mesh");
    }
    set
}

/// Runs one evaluator outside the engine.
///
/// Inputs are declared with [`set_cells`](Self::set_cells) or
/// [`set_field`](Self::set_field); [`evaluate`](Self::evaluate) and
/// [`partial`](Self::partial) hand back the output buffer.
pub struct EvalHarness {
    meshes: MeshSet,
    store: FieldStore,
}

impl EvalHarness {
    pub fn new(meshes: MeshSet) -> Self {
        Self {
            meshes,
            store: FieldStore::new(),
        }
    }

    /// Harness over [`domain_column`].
    pub fn column(ncells: usize) -> Self {
        Self::new(domain_column(ncells))
    }

    pub fn meshes(&self) -> &MeshSet {
        &self.meshes
    }

    pub fn store(&self) -> &FieldStore {
        &self.store
    }

    /// Declare `key` with an arbitrary shape and fill it from `data`.
    pub fn set_field(&mut self, key: impl Into<FieldKey>, value: CompositeVector) -> &mut Self {
        let key = key.into();
        self.store
            .require(&key, value.space(), Claim::Owner(HARNESS_OWNER.into()))
            .expect("consistent test field");
        self.store
            .get_mut(&key, HARNESS_OWNER)
            .expect("harness owns its fields")
            .copy_from(&value)
            .expect("same shape");
        self
    }

    /// Declare `key` as a cell field on the mesh named by its domain and
    /// fill it with `values`, one per owned cell.
    pub fn set_cells(&mut self, key: impl Into<FieldKey>, values: &[f64]) -> &mut Self {
        let key = key.into();
        let space = self.cell_space(key.domain());
        let mut v = CompositeVector::new(space);
        v.set_component(EntityKind::Cell, values)
            .expect("one value per cell");
        self.set_field(key, v)
    }

    /// Declare `key` as a cell field filled with `value`.
    pub fn fill_cells(&mut self, key: impl Into<FieldKey>, value: f64) -> &mut Self {
        let key = key.into();
        let v = CompositeVector::constant(self.cell_space(key.domain()), value);
        self.set_field(key, v)
    }

    fn cell_space(&self, mesh: &str) -> CompositeSpace {
        self.meshes
            .get(mesh)
            .expect("mesh registered in harness")
            .space(&[EntityKind::Cell])
    }

    /// Evaluate `ev` into a fresh buffer of its output shape.
    pub fn evaluate(&self, ev: &dyn Evaluator) -> Result<CompositeVector, EvalError> {
        let mut out = self.output_for(ev);
        let key = ev.key().clone();
        let mut ctx = EvalContext::new(&key, ev.dependencies(), &self.store, &self.meshes, &mut out);
        ev.evaluate(&mut ctx)?;
        Ok(out)
    }

    /// Local partial derivative of `ev` with respect to `wrt`.
    pub fn partial(&self, ev: &dyn Evaluator, wrt: &FieldKey) -> Result<CompositeVector, EvalError> {
        let mut out = self.output_for(ev);
        let key = ev.key().clone();
        let mut ctx = EvalContext::new(&key, ev.dependencies(), &self.store, &self.meshes, &mut out);
        ev.partial_derivative(&mut ctx, wrt)?;
        Ok(out)
    }

    fn output_for(&self, ev: &dyn Evaluator) -> CompositeVector {
        CompositeVector::new(ev.output_space(&self.meshes).expect("output mesh registered"))
    }
}

/// Cell values of `v`, panicking when it has no cell component.
pub fn cells(v: &CompositeVector) -> &[f64] {
    v.component(EntityKind::Cell).expect("cell component")
}

/// Assert two slices agree entry by entry within `tol`.
pub fn assert_close(actual: &[f64], expected: &[f64], tol: f64) {
    assert_eq!(actual.len(), expected.len(), "length mismatch");
    for (i, (a, e)) in actual.iter().zip(expected).enumerate() {
        assert!(
            (a - e).abs() <= tol * e.abs().max(1.0),
            "entry {i}: {a} vs expected {e}"
        );
    }
}
