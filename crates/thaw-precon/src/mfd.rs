//! Cell/face block preconditioner of one diffusion-type subsystem.

use std::sync::Arc;

use smallvec::SmallVec;
use thaw_core::{CompositeSpace, EntityKind, FieldKey, ThawError};
use thaw_engine::State;
use thaw_mesh::{Mesh, Ownership};
use thaw_store::CompositeVector;
use tracing::debug;

use crate::operator::InverseOperator;
use crate::schur::{self, CellBlock, Coupling, SchurFactor};

/// Two-point cell/face operator of one subsystem.
///
/// With conductivity `k_c` and accumulation `a_c` per cell, the
/// transmissibility from cell `c` to face `f` is
/// `t = k_c · |f| / d(c, f)` and the operator is
///
/// ```text
/// A_cc = Σ_f t + a_c    A_cf = A_fc = -t    A_ff = Σ_c t
/// ```
///
/// [`assemble`](Self::assemble) factors the face Schur complement;
/// [`apply_inverse`](InverseOperator::apply_inverse) then solves exactly.
/// Vectors live on the mesh's cell and face components.
pub struct MfdPreconditioner {
    name: String,
    mesh: Arc<dyn Mesh>,
    cells: Vec<CellBlock>,
    factor: Option<SchurFactor>,
}

impl MfdPreconditioner {
    /// Unassembled preconditioner named `name` on `mesh`.
    pub fn new(name: impl Into<String>, mesh: Arc<dyn Mesh>) -> Self {
        Self {
            name: name.into(),
            mesh,
            cells: Vec::new(),
            factor: None,
        }
    }

    /// Name used in diagnostics.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The mesh the operator is laid out on.
    pub fn mesh(&self) -> &Arc<dyn Mesh> {
        &self.mesh
    }

    /// Cell plus face space of vectors this operator acts on.
    pub fn space(&self) -> CompositeSpace {
        self.mesh.space(&[EntityKind::Cell, EntityKind::Face])
    }

    /// Whether [`assemble`](Self::assemble) has succeeded.
    pub fn is_assembled(&self) -> bool {
        self.factor.is_some()
    }

    pub(crate) fn blocks(&self) -> Option<&[CellBlock]> {
        self.factor.as_ref().map(|_| self.cells.as_slice())
    }

    fn ncells(&self) -> usize {
        self.mesh.entity_count(EntityKind::Cell, Ownership::All)
    }

    pub(crate) fn nfaces(&self) -> usize {
        self.mesh.entity_count(EntityKind::Face, Ownership::All)
    }

    /// Build the operator from per-cell conductivity and accumulation,
    /// then factor it.
    ///
    /// # Errors
    ///
    /// [`ThawError::ShapeMismatch`] if either slice is not one value per
    /// cell; [`ThawError::SingularOperator`] if a value is not finite or
    /// the face system cannot be factored. On error the previous assembly
    /// is discarded.
    pub fn assemble(&mut self, conductivity: &[f64], accumulation: &[f64]) -> Result<(), ThawError> {
        self.factor = None;
        let ncells = self.ncells();
        for (what, values) in [("conductivity", conductivity), ("accumulation", accumulation)] {
            if values.len() != ncells {
                return Err(ThawError::ShapeMismatch {
                    key: format!("{} {what}", self.name),
                    expected: format!("{ncells} cells"),
                    found: format!("{} values", values.len()),
                });
            }
            if let Some(c) = values.iter().position(|v| !v.is_finite()) {
                return Err(ThawError::SingularOperator {
                    reason: format!("{}: non-finite {what} in cell {c}", self.name),
                });
            }
        }

        self.cells = (0..ncells)
            .map(|c| {
                let faces = self.mesh.cell_faces(c);
                let trans: SmallVec<[f64; 6]> = faces
                    .iter()
                    .map(|&f| {
                        conductivity[c] * self.mesh.face_area(f) / self.mesh.cell_face_distance(c, f)
                    })
                    .collect();
                let diag = trans.iter().sum::<f64>() + accumulation[c];
                CellBlock { faces, trans, diag }
            })
            .collect();

        let (factor, _) = schur::factor(&[self.cells.as_slice()], &Coupling::new(), self.nfaces(), false)?;
        self.factor = Some(factor);
        debug!(name = %self.name, ncells, nfaces = self.nfaces(), "MFD preconditioner assembled");
        Ok(())
    }

    /// Assemble from fields of `state`: the cell values of `conductivity`
    /// and `d(conserved)/d(primary) / h` as accumulation.
    pub fn assemble_from_state(
        &mut self,
        state: &mut State,
        conductivity: &FieldKey,
        conserved: &FieldKey,
        primary: &FieldKey,
        h: f64,
    ) -> Result<(), ThawError> {
        let k = cell_values(state.field(conductivity)?, conductivity)?.to_vec();
        let dq = cell_values(state.derivative_field(conserved, primary)?, conserved)?;
        let accumulation: Vec<f64> = dq.iter().map(|v| v / h).collect();
        self.assemble(&k, &accumulation)
    }

    fn check_space(&self, v: &CompositeVector) -> Result<(), ThawError> {
        let ncells = self.ncells();
        let nfaces = self.nfaces();
        let cells = v.component(EntityKind::Cell).map(<[f64]>::len);
        let faces = v.component(EntityKind::Face).map(<[f64]>::len);
        if cells == Some(ncells) && faces == Some(nfaces) {
            Ok(())
        } else {
            Err(ThawError::ShapeMismatch {
                key: self.name.clone(),
                expected: format!("{ncells} cells and {nfaces} faces"),
                found: format!("{:?} cells and {:?} faces", cells, faces),
            })
        }
    }

    fn not_ready(&self) -> ThawError {
        ThawError::NotReady {
            what: format!("preconditioner '{}' (call assemble first)", self.name),
        }
    }
}

/// Cell values of a field read for the preconditioner.
pub(crate) fn cell_values<'a>(v: &'a CompositeVector, key: &FieldKey) -> Result<&'a [f64], ThawError> {
    v.component(EntityKind::Cell)
        .ok_or_else(|| ThawError::ShapeMismatch {
            key: key.to_string(),
            expected: "a cell component".into(),
            found: format!("{:?}", v.space().components.iter().map(|c| c.kind).collect::<Vec<_>>()),
        })
}

/// Split `v` into its cell and face slices; `check_space` must have passed.
pub(crate) fn cells_and_faces(v: &CompositeVector) -> (&[f64], &[f64]) {
    (
        v.component(EntityKind::Cell).unwrap_or(&[]),
        v.component(EntityKind::Face).unwrap_or(&[]),
    )
}

/// Write a solved `(cells, faces)` pair into `v`.
pub(crate) fn store_blocks(v: &mut CompositeVector, cells: &[f64], faces: &[f64]) -> Result<(), ThawError> {
    v.set_component(EntityKind::Cell, cells)?;
    v.set_component(EntityKind::Face, faces)?;
    Ok(())
}

impl InverseOperator<CompositeVector> for MfdPreconditioner {
    fn apply(&self, x: &CompositeVector, y: &mut CompositeVector) -> Result<(), ThawError> {
        let blocks = self.blocks().ok_or_else(|| self.not_ready())?;
        self.check_space(x)?;
        self.check_space(y)?;
        let (xc, xf) = cells_and_faces(x);
        let out = schur::multiply(&[blocks], &Coupling::new(), self.nfaces(), &[xc], &[xf]);
        let (yc, yf) = &out[0];
        store_blocks(y, yc, yf)
    }

    fn apply_inverse(&self, r: &CompositeVector, x: &mut CompositeVector) -> Result<(), ThawError> {
        let factor = self.factor.as_ref().ok_or_else(|| self.not_ready())?;
        self.check_space(r)?;
        self.check_space(x)?;
        let (rc, rf) = cells_and_faces(r);
        let out = factor.solve(&[self.cells.as_slice()], &[rc], &[rf])?;
        let (xc, xf) = &out[0];
        store_blocks(x, xc, xf)
    }
}

impl std::fmt::Debug for MfdPreconditioner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MfdPreconditioner")
            .field("name", &self.name)
            .field("mesh", &self.mesh.name())
            .field("assembled", &self.is_assembled())
            .finish()
    }
}
