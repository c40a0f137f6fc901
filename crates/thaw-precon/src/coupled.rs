//! Coupled-cells preconditioner: several MFD subsystems plus cell-local
//! cross-derivative blocks, solved through one face Schur complement.
//!
//! For subsystems `A(y1, y2) = 0` and `B(y1, y2) = 0` the approximate
//! Jacobian is
//!
//! ```text
//! [ dA_c/dy1_c  dA_c/dy1_f   dA_c/dy2_c       0      ]
//! [ dA_f/dy1_c  dA_f/dy1_f       0            0      ]
//! [ dB_c/dy1_c      0        dB_c/dy2_c  dB_c/dy2_f  ]
//! [     0           0        dB_f/dy2_c  dB_f/dy2_f  ]
//! ```
//!
//! The diagonal blocks are the subsystems' own [`MfdPreconditioner`]s;
//! the cell couplings `dA_c/dy2_c` and `dB_c/dy1_c` come from
//! [`State::derivative`] scaled by `1/h`.

use std::sync::Arc;

use nalgebra::DMatrix;
use thaw_core::{ConfigError, EntityKind, FieldKey, ParamReader, ParameterList, ThawError};
use thaw_engine::State;
use thaw_mesh::{Mesh, MeshSet};
use thaw_store::CompositeVector;
use tracing::{debug, warn};

use crate::mfd::{cell_values, cells_and_faces, store_blocks, MfdPreconditioner};
use crate::operator::InverseOperator;
use crate::schur::{self, CellBlock, Coupling, SchurFactor};
use crate::tree_vector::TreeVector;

// ── Configuration ──────────────────────────────────────────────────

/// One physics subsystem: the quantity it conserves and the primary
/// variable it solves for.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Subsystem {
    /// Conserved quantity `Q_i`.
    pub conserved: FieldKey,
    /// Primary variable `y_i`.
    pub primary: FieldKey,
}

/// Configuration of a [`CoupledCellsPreconditioner`].
///
/// # Configuration
///
/// | key | type | default |
/// |-----|------|---------|
/// | `"conserved quantity A"`, `"primary variable A"` | string | required |
/// | `"conserved quantity B"`, `"primary variable B"` | string | required |
/// | `"conserved quantity C"`, ... | string | further subsystems, in letter order |
/// | `"mesh key"` | string | `"domain"` |
/// | `"decoupled"` | bool | `false` |
/// | `"debug cells"` | int array | empty |
/// | `"dump schur complement"` | bool | `false` |
#[derive(Clone, Debug, PartialEq)]
pub struct CoupledPcConfig {
    /// Subsystems in block order.
    pub subsystems: Vec<Subsystem>,
    /// Mesh every subsystem lives on.
    pub mesh_key: String,
    /// Skip the cross terms and apply each subsystem alone.
    pub decoupled: bool,
    /// Cells whose couplings, residuals and corrections are logged.
    pub debug_cells: Vec<usize>,
    /// Keep (and log) each assembled face Schur complement.
    pub dump_schur: bool,
}

impl CoupledPcConfig {
    const CONTEXT: &'static str = "coupled cells preconditioner";

    /// Two-subsystem configuration on `"domain"`.
    pub fn pair(
        conserved_a: impl Into<FieldKey>,
        primary_a: impl Into<FieldKey>,
        conserved_b: impl Into<FieldKey>,
        primary_b: impl Into<FieldKey>,
    ) -> Self {
        Self {
            subsystems: vec![
                Subsystem {
                    conserved: conserved_a.into(),
                    primary: primary_a.into(),
                },
                Subsystem {
                    conserved: conserved_b.into(),
                    primary: primary_b.into(),
                },
            ],
            mesh_key: thaw_core::DEFAULT_DOMAIN.into(),
            decoupled: false,
            debug_cells: Vec::new(),
            dump_schur: false,
        }
    }

    /// Read from a configuration record.
    pub fn from_params(plist: &ParameterList) -> Result<Self, ConfigError> {
        let mut r = ParamReader::new(plist, Self::CONTEXT);
        let mut subsystems = Vec::new();
        for letter in 'A'..='Z' {
            let q_key = format!("conserved quantity {letter}");
            let y_key = format!("primary variable {letter}");
            match (r.opt_string(&q_key)?, r.opt_string(&y_key)?) {
                (Some(q), Some(y)) => subsystems.push(Subsystem {
                    conserved: FieldKey::new(q),
                    primary: FieldKey::new(y),
                }),
                (None, None) => break,
                (Some(_), None) => {
                    return Err(ConfigError::MissingParameter {
                        context: Self::CONTEXT.into(),
                        key: y_key,
                    })
                }
                (None, Some(_)) => {
                    return Err(ConfigError::MissingParameter {
                        context: Self::CONTEXT.into(),
                        key: q_key,
                    })
                }
            }
        }
        if subsystems.len() < 2 {
            return Err(ConfigError::MissingParameter {
                context: Self::CONTEXT.into(),
                key: if subsystems.is_empty() {
                    "conserved quantity A".into()
                } else {
                    "conserved quantity B".into()
                },
            });
        }
        let config = Self {
            subsystems,
            mesh_key: r.string_or("mesh key", thaw_core::DEFAULT_DOMAIN)?,
            decoupled: r.bool_or("decoupled", false)?,
            debug_cells: r.usize_array_or_empty("debug cells")?,
            dump_schur: r.bool_or("dump schur complement", false)?,
        };
        r.finish()?;
        Ok(config)
    }
}

// ── CoupledCellsPreconditioner ─────────────────────────────────────

/// Block preconditioner over two or more MFD subsystems on one mesh.
///
/// Life cycle: assemble every [`subsystem`](Self::subsystem_mut), call
/// [`update`](Self::update) with the current step size, then
/// [`apply_inverse`](InverseOperator::apply_inverse) as often as needed.
/// `update` must be called again whenever a subsystem or the state
/// changes; the face Schur complement depends on both.
pub struct CoupledCellsPreconditioner {
    config: CoupledPcConfig,
    mesh: Arc<dyn Mesh>,
    subsystems: Vec<MfdPreconditioner>,
    coupling: Coupling,
    factor: Option<SchurFactor>,
    schur_dump: Option<DMatrix<f64>>,
}

impl CoupledCellsPreconditioner {
    /// Create the preconditioner and one unassembled
    /// [`MfdPreconditioner`] per subsystem.
    pub fn new(config: CoupledPcConfig, meshes: &MeshSet) -> Result<Self, ThawError> {
        let mesh = meshes.get(&config.mesh_key)?.clone();
        let ncells = mesh.entity_count(EntityKind::Cell, thaw_mesh::Ownership::All);
        if let Some(&c) = config.debug_cells.iter().find(|&&c| c >= ncells) {
            return Err(ConfigError::InvalidValue {
                context: CoupledPcConfig::CONTEXT.into(),
                key: "debug cells".into(),
                reason: format!("cell {c} not on mesh '{}' ({ncells} cells)", config.mesh_key),
            }
            .into());
        }
        if config.decoupled {
            warn!("coupled preconditioner running decoupled: cross terms ignored");
        }
        let subsystems = config
            .subsystems
            .iter()
            .map(|s| MfdPreconditioner::new(s.primary.to_string(), mesh.clone()))
            .collect();
        Ok(Self {
            config,
            mesh,
            subsystems,
            coupling: Coupling::new(),
            factor: None,
            schur_dump: None,
        })
    }

    /// The configuration.
    pub fn config(&self) -> &CoupledPcConfig {
        &self.config
    }

    /// Number of subsystems.
    pub fn len(&self) -> usize {
        self.subsystems.len()
    }

    /// Always false: construction requires two subsystems.
    pub fn is_empty(&self) -> bool {
        self.subsystems.is_empty()
    }

    /// Subsystem preconditioner `i`.
    pub fn subsystem(&self, i: usize) -> Option<&MfdPreconditioner> {
        self.subsystems.get(i)
    }

    /// Subsystem preconditioner `i`, for assembly. Any change invalidates
    /// the coupled factorisation until the next [`update`](Self::update).
    pub fn subsystem_mut(&mut self, i: usize) -> Option<&mut MfdPreconditioner> {
        self.factor = None;
        self.subsystems.get_mut(i)
    }

    /// Whether [`apply_inverse`](InverseOperator::apply_inverse) can run.
    pub fn is_ready(&self) -> bool {
        if self.config.decoupled {
            self.subsystems.iter().all(MfdPreconditioner::is_assembled)
        } else {
            self.factor.is_some()
        }
    }

    /// Cell plus face space of each block of vectors this operator acts on.
    pub fn space(&self) -> thaw_core::CompositeSpace {
        self.mesh.space(&[EntityKind::Cell, EntityKind::Face])
    }

    /// A zero [`TreeVector`] shaped for this operator.
    pub fn zero_vector(&self) -> TreeVector {
        TreeVector::new(
            self.subsystems
                .iter()
                .map(|_| CompositeVector::new(self.space()))
                .collect(),
        )
    }

    /// Scaled coupling values `dQ_i/dy_j / h` of the last update.
    pub fn coupling(&self, i: usize, j: usize) -> Option<&[f64]> {
        self.coupling.get(&(i, j)).map(Vec::as_slice)
    }

    /// The face Schur complement assembled by the last update, when
    /// `"dump schur complement"` is on.
    pub fn schur_dump(&self) -> Option<&DMatrix<f64>> {
        self.schur_dump.as_ref()
    }

    fn blocks(&self) -> Result<Vec<&[CellBlock]>, ThawError> {
        self.subsystems
            .iter()
            .map(|s| {
                s.blocks().ok_or_else(|| ThawError::NotReady {
                    what: format!("subsystem preconditioner '{}'", s.name()),
                })
            })
            .collect()
    }

    /// Refresh the off-diagonal blocks from `state` at step size `h` and
    /// refactor the coupled system.
    ///
    /// # Errors
    ///
    /// - [`ThawError::NotReady`] if a subsystem is not assembled.
    /// - Whatever [`State::derivative`] reports for a cross derivative.
    /// - [`ThawError::SingularOperator`] if the coupled system cannot be
    ///   factored. The previous factorisation is discarded.
    pub fn update(&mut self, state: &mut State, h: f64) -> Result<(), ThawError> {
        if !(h.is_finite() && h > 0.0) {
            return Err(ConfigError::InvalidValue {
                context: CoupledPcConfig::CONTEXT.into(),
                key: "h".into(),
                reason: format!("step size must be finite and positive, got {h}"),
            }
            .into());
        }
        self.factor = None;
        self.schur_dump = None;
        self.blocks()?;
        if self.config.decoupled {
            self.coupling.clear();
            return Ok(());
        }

        let ncells = self.mesh.entity_count(EntityKind::Cell, thaw_mesh::Ownership::All);
        let mut coupling = Coupling::new();
        for (i, si) in self.config.subsystems.iter().enumerate() {
            for (j, sj) in self.config.subsystems.iter().enumerate() {
                if i == j {
                    continue;
                }
                let d = state.derivative_field(&si.conserved, &sj.primary)?;
                let values = cell_values(d, &FieldKey::derivative(&si.conserved, &sj.primary))?;
                if values.len() != ncells {
                    return Err(ThawError::ShapeMismatch {
                        key: FieldKey::derivative(&si.conserved, &sj.primary).to_string(),
                        expected: format!("{ncells} cells on '{}'", self.config.mesh_key),
                        found: format!("{} cells", values.len()),
                    });
                }
                for &c in &self.config.debug_cells {
                    debug!(
                        cell = c,
                        of = %si.conserved,
                        wrt = %sj.primary,
                        value = values[c],
                        "off-diagonal coupling"
                    );
                }
                coupling.insert((i, j), values.iter().map(|v| v / h).collect());
            }
        }
        self.coupling = coupling;

        let blocks = self.blocks()?;
        let nfaces = self.subsystems[0].nfaces();
        let (factor, dump) = schur::factor(&blocks, &self.coupling, nfaces, self.config.dump_schur)?;
        if let Some(m) = &dump {
            debug!(rows = m.nrows(), matrix = %m, "face Schur complement");
        }
        self.factor = Some(factor);
        self.schur_dump = dump;
        debug!(
            subsystems = self.subsystems.len(),
            nfaces,
            h,
            "coupled preconditioner updated"
        );
        Ok(())
    }

    fn check_tree(&self, v: &TreeVector) -> Result<(), ThawError> {
        if v.len() != self.subsystems.len() {
            return Err(ThawError::ShapeMismatch {
                key: "coupled preconditioner".into(),
                expected: format!("{} blocks", self.subsystems.len()),
                found: format!("{} blocks", v.len()),
            });
        }
        let space = self.space();
        for b in v.blocks() {
            if b.space().len() != space.len()
                || b.component(EntityKind::Cell).map(<[f64]>::len)
                    != space.component(EntityKind::Cell).map(|c| c.len())
            {
                return Err(ThawError::ShapeMismatch {
                    key: "coupled preconditioner".into(),
                    expected: format!("{} cell+face entries per block", space.len()),
                    found: format!("{} entries", b.space().len()),
                });
            }
        }
        Ok(())
    }

    fn log_cells(&self, label: &str, v: &TreeVector) {
        for &c in &self.config.debug_cells {
            let faces = self.mesh.cell_faces(c);
            for (s, block) in self.config.subsystems.iter().zip(v.blocks()) {
                let (cells, face_values) = cells_and_faces(block);
                let on_faces: Vec<f64> = faces
                    .iter()
                    .filter_map(|&f| face_values.get(f).copied())
                    .collect();
                debug!(
                    cell = c,
                    variable = %s.primary,
                    value = cells.get(c).copied().unwrap_or(f64::NAN),
                    faces = ?on_faces,
                    "{label}"
                );
            }
        }
    }
}

impl InverseOperator<TreeVector> for CoupledCellsPreconditioner {
    fn apply(&self, x: &TreeVector, y: &mut TreeVector) -> Result<(), ThawError> {
        self.check_tree(x)?;
        self.check_tree(y)?;
        let empty = Coupling::new();
        let coupling = if self.config.decoupled {
            &empty
        } else {
            // Couplings are only current while the factor they were built with is.
            if self.factor.is_none() {
                return Err(ThawError::NotReady {
                    what: "coupled preconditioner (call update first)".into(),
                });
            }
            &self.coupling
        };
        let blocks = self.blocks()?;
        let (xc, xf): (Vec<&[f64]>, Vec<&[f64]>) = x.blocks().iter().map(cells_and_faces).unzip();
        let out = schur::multiply(&blocks, coupling, self.subsystems[0].nfaces(), &xc, &xf);
        for (yb, (cells, faces)) in y.blocks_mut().iter_mut().zip(&out) {
            store_blocks(yb, cells, faces)?;
        }
        Ok(())
    }

    fn apply_inverse(&self, r: &TreeVector, x: &mut TreeVector) -> Result<(), ThawError> {
        self.check_tree(r)?;
        self.check_tree(x)?;
        self.log_cells("residual", r);

        if self.config.decoupled {
            for ((pc, rb), xb) in self.subsystems.iter().zip(r.blocks()).zip(x.blocks_mut()) {
                pc.apply_inverse(rb, xb)?;
            }
        } else {
            let factor = self.factor.as_ref().ok_or_else(|| ThawError::NotReady {
                what: "coupled preconditioner (call update first)".into(),
            })?;
            let blocks = self.blocks()?;
            let (rc, rf): (Vec<&[f64]>, Vec<&[f64]>) = r.blocks().iter().map(cells_and_faces).unzip();
            let out = factor.solve(&blocks, &rc, &rf)?;
            for (xb, (cells, faces)) in x.blocks_mut().iter_mut().zip(&out) {
                store_blocks(xb, cells, faces)?;
            }
        }

        self.log_cells("preconditioned update", x);
        Ok(())
    }
}

impl std::fmt::Debug for CoupledCellsPreconditioner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CoupledCellsPreconditioner")
            .field("config", &self.config)
            .field("mesh", &self.mesh.name())
            .field("subsystems", &self.subsystems)
            .field("ready", &self.is_ready())
            .finish()
    }
}
