//! Static condensation of cell unknowns onto faces.
//!
//! For `N` subsystems sharing one mesh, subsystem `a` contributes per
//! cell `c` a diagonal `A_cc = diag[c]`, face couplings
//! `A_cf = A_fc = -t[c][i]` for its i-th face, and `A_ff = Σ_c t[c][i]`.
//! The cell block of cell `c` is the `N×N` matrix
//! `M_c = diag(diag_a[c]) + C_ab[c]`. Eliminating every `x_c` leaves the
//! face system
//!
//! ```text
//! S[(a,f),(b,g)] = δ_ab Σ_c t_a[c][f] δ_fg - Σ_c t_a[c][f] · M_c⁻¹[a,b] · t_b[c][g]
//! ```
//!
//! indexed `a·n_faces + f`.

use indexmap::IndexMap;
use nalgebra::{DMatrix, DVector, Dyn, LU};
use smallvec::SmallVec;
use thaw_core::ThawError;

/// Pivots smaller than this fraction of the largest are treated as zero.
pub(crate) const PIVOT_TOLERANCE: f64 = 1e-12;

/// One subsystem's share of a cell.
#[derive(Clone, Debug, PartialEq)]
pub(crate) struct CellBlock {
    pub(crate) faces: SmallVec<[usize; 6]>,
    /// Transmissibility to each face in `faces`.
    pub(crate) trans: SmallVec<[f64; 6]>,
    /// `Σ trans + accumulation`.
    pub(crate) diag: f64,
}

/// Off-diagonal cell couplings keyed by `(row subsystem, column subsystem)`.
pub(crate) type Coupling = IndexMap<(usize, usize), Vec<f64>>;

/// Per-subsystem `(cell values, face values)`.
pub(crate) type Blocks = Vec<(Vec<f64>, Vec<f64>)>;

pub(crate) struct SchurFactor {
    nfaces: usize,
    cell_inv: Vec<DMatrix<f64>>,
    lu: LU<f64, Dyn, Dyn>,
}

impl std::fmt::Debug for SchurFactor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SchurFactor")
            .field("nfaces", &self.nfaces)
            .field("ncells", &self.cell_inv.len())
            .finish_non_exhaustive()
    }
}

fn cell_matrix(subs: &[&[CellBlock]], coupling: &Coupling, c: usize) -> DMatrix<f64> {
    let n = subs.len();
    let mut m = DMatrix::zeros(n, n);
    for (a, blocks) in subs.iter().enumerate() {
        m[(a, a)] = blocks[c].diag;
    }
    for (&(a, b), values) in coupling {
        m[(a, b)] += values[c];
    }
    m
}

/// Assemble the face Schur complement. Returns the factorisation and,
/// when `keep` is set, a copy of the assembled matrix.
pub(crate) fn factor(
    subs: &[&[CellBlock]],
    coupling: &Coupling,
    nfaces: usize,
    keep: bool,
) -> Result<(SchurFactor, Option<DMatrix<f64>>), ThawError> {
    let nsub = subs.len();
    let ncells = subs.first().map_or(0, |s| s.len());
    let mut s = DMatrix::zeros(nsub * nfaces, nsub * nfaces);
    let mut cell_inv = Vec::with_capacity(ncells);

    for c in 0..ncells {
        let minv = cell_matrix(subs, coupling, c).try_inverse().ok_or_else(|| {
            ThawError::SingularOperator {
                reason: format!("cell block {c} is singular"),
            }
        })?;
        let faces = &subs[0][c].faces;
        for a in 0..nsub {
            let ta = &subs[a][c].trans;
            for (i, &f) in faces.iter().enumerate() {
                let row = a * nfaces + f;
                s[(row, row)] += ta[i];
                for b in 0..nsub {
                    let w = ta[i] * minv[(a, b)];
                    let tb = &subs[b][c].trans;
                    for (j, &g) in faces.iter().enumerate() {
                        s[(row, b * nfaces + g)] -= w * tb[j];
                    }
                }
            }
        }
        cell_inv.push(minv);
    }

    let dump = keep.then(|| s.clone());
    let lu = s.lu();
    check_pivots(&lu)?;
    Ok((
        SchurFactor {
            nfaces,
            cell_inv,
            lu,
        },
        dump,
    ))
}

fn check_pivots(lu: &LU<f64, Dyn, Dyn>) -> Result<(), ThawError> {
    let u = lu.u();
    let pivots = u.diagonal();
    let largest = pivots.amax();
    if !largest.is_finite() {
        return Err(ThawError::SingularOperator {
            reason: "face Schur complement has non-finite entries".into(),
        });
    }
    if let Some((row, p)) = pivots
        .iter()
        .enumerate()
        .find(|(_, p)| p.abs() <= PIVOT_TOLERANCE * largest)
    {
        return Err(ThawError::SingularOperator {
            reason: format!("face Schur complement: pivot {p:e} at row {row}"),
        });
    }
    Ok(())
}

impl SchurFactor {
    /// Solve the full cell/face system for right-hand side `r`.
    pub(crate) fn solve(
        &self,
        subs: &[&[CellBlock]],
        r_cell: &[&[f64]],
        r_face: &[&[f64]],
    ) -> Result<Blocks, ThawError> {
        let nsub = subs.len();
        let nf = self.nfaces;

        // rhs_f = r_f - A_fc M⁻¹ r_c
        let mut rhs = DVector::zeros(nsub * nf);
        for a in 0..nsub {
            for f in 0..nf {
                rhs[a * nf + f] = r_face[a][f];
            }
        }
        for (c, minv) in self.cell_inv.iter().enumerate() {
            let z = minv * DVector::from_fn(nsub, |a, _| r_cell[a][c]);
            for a in 0..nsub {
                let block = &subs[a][c];
                for (&f, &t) in block.faces.iter().zip(&block.trans) {
                    rhs[a * nf + f] += t * z[a];
                }
            }
        }

        let xf = self
            .lu
            .solve(&rhs)
            .ok_or_else(|| ThawError::SingularOperator {
                reason: "face Schur complement solve failed".into(),
            })?;

        // x_c = M⁻¹ (r_c - A_cf x_f)
        let mut out: Blocks = (0..nsub)
            .map(|a| (vec![0.0; self.cell_inv.len()], xf.rows(a * nf, nf).iter().copied().collect()))
            .collect();
        for (c, minv) in self.cell_inv.iter().enumerate() {
            let rc = DVector::from_fn(nsub, |a, _| {
                let block = &subs[a][c];
                r_cell[a][c]
                    + block
                        .faces
                        .iter()
                        .zip(&block.trans)
                        .map(|(&f, &t)| t * xf[a * nf + f])
                        .sum::<f64>()
            });
            let xc = minv * rc;
            for (a, (cells, _)) in out.iter_mut().enumerate() {
                cells[c] = xc[a];
            }
        }
        Ok(out)
    }
}

/// `y = A x` for the uncondensed system.
pub(crate) fn multiply(
    subs: &[&[CellBlock]],
    coupling: &Coupling,
    nfaces: usize,
    x_cell: &[&[f64]],
    x_face: &[&[f64]],
) -> Blocks {
    let ncells = subs.first().map_or(0, |s| s.len());
    let mut out: Blocks = subs
        .iter()
        .map(|_| (vec![0.0; ncells], vec![0.0; nfaces]))
        .collect();
    for (a, blocks) in subs.iter().enumerate() {
        let (y_cell, y_face) = &mut out[a];
        for (c, block) in blocks.iter().enumerate() {
            y_cell[c] += block.diag * x_cell[a][c];
            for (&f, &t) in block.faces.iter().zip(&block.trans) {
                y_cell[c] -= t * x_face[a][f];
                y_face[f] += t * (x_face[a][f] - x_cell[a][c]);
            }
        }
    }
    for (&(a, b), values) in coupling {
        for (c, v) in values.iter().enumerate() {
            out[a].0[c] += v * x_cell[b][c];
        }
    }
    out
}
