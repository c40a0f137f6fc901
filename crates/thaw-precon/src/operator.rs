//! The contract between an assembled operator and a linear solver.

use thaw_core::ThawError;

/// An assembled linear operator that can also be inverted.
///
/// `V` is the vector type the operator acts on: a
/// [`CompositeVector`](thaw_store::CompositeVector) for a single subsystem,
/// a [`TreeVector`](crate::TreeVector) for a coupled one.
pub trait InverseOperator<V> {
    /// `y = A x`.
    fn apply(&self, x: &V, y: &mut V) -> Result<(), ThawError>;

    /// `x = A⁻¹ r`.
    ///
    /// Fails with [`ThawError::NotReady`] before the operator has been
    /// assembled.
    fn apply_inverse(&self, r: &V, x: &mut V) -> Result<(), ThawError>;
}
