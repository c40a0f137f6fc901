//! Preconditioners for cell/face discretisations of coupled physics.
//!
//! A mimetic finite difference (MFD) subsystem carries one unknown per
//! cell and one per face. Its preconditioner, [`MfdPreconditioner`], is
//! the two-point operator
//!
//! ```text
//! [ A_cc  A_cf ] [ x_c ]   [ r_c ]
//! [ A_fc  A_ff ] [ x_f ] = [ r_f ]
//! ```
//!
//! with a diagonal `A_cc`, solved by eliminating the cell unknowns and
//! factoring the face Schur complement.
//!
//! [`CoupledCellsPreconditioner`] stacks two or more such subsystems on
//! one mesh and adds cell-local coupling terms `dQ_i/dy_j · 1/h` taken
//! from the [`State`](thaw_engine::State)'s derivative propagation. Each
//! cell then carries a dense `N×N` block; the face system couples all
//! subsystems and is refactored on every update.
//!
//! Both implement [`InverseOperator`], the contract a linear solver uses
//! to apply them.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod coupled;
pub mod mfd;
pub mod operator;
pub(crate) mod schur;
pub mod tree_vector;

pub use coupled::{CoupledCellsPreconditioner, CoupledPcConfig, Subsystem};
pub use mfd::MfdPreconditioner;
pub use operator::InverseOperator;
pub use tree_vector::TreeVector;
