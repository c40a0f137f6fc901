//! Block vector over several subsystems.

use thaw_core::ThawError;
use thaw_store::CompositeVector;

/// One [`CompositeVector`] per subsystem, in subsystem order.
///
/// # Examples
///
/// ```
/// use thaw_core::{CompositeSpace, ComponentSpace, EntityKind};
/// use thaw_precon::TreeVector;
/// use thaw_store::CompositeVector;
///
/// let space = CompositeSpace::new("domain")
///     .with_component(ComponentSpace::scalar(EntityKind::Cell, 3));
/// let mut tv = TreeVector::new(vec![
///     CompositeVector::constant(space.clone(), 1.0),
///     CompositeVector::constant(space, -2.0),
/// ]);
/// assert_eq!(tv.len(), 2);
/// assert_eq!(tv.norm_inf(), 2.0);
/// tv.put_scalar(0.0);
/// assert_eq!(tv.norm_inf(), 0.0);
/// ```
#[derive(Clone, Debug, PartialEq)]
pub struct TreeVector {
    blocks: Vec<CompositeVector>,
}

impl TreeVector {
    /// Wrap per-subsystem vectors.
    pub fn new(blocks: Vec<CompositeVector>) -> Self {
        Self { blocks }
    }

    /// A zero vector with the same block shapes as `self`.
    pub fn zeros_like(&self) -> Self {
        Self {
            blocks: self
                .blocks
                .iter()
                .map(|b| CompositeVector::new(b.space().clone()))
                .collect(),
        }
    }

    /// Number of blocks.
    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    /// Whether there are no blocks.
    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    /// Block `i`, if present.
    pub fn sub(&self, i: usize) -> Option<&CompositeVector> {
        self.blocks.get(i)
    }

    /// Mutable block `i`, if present.
    pub fn sub_mut(&mut self, i: usize) -> Option<&mut CompositeVector> {
        self.blocks.get_mut(i)
    }

    /// All blocks.
    pub fn blocks(&self) -> &[CompositeVector] {
        &self.blocks
    }

    /// All blocks, mutably.
    pub fn blocks_mut(&mut self) -> &mut [CompositeVector] {
        &mut self.blocks
    }

    /// Set every entry of every block.
    pub fn put_scalar(&mut self, value: f64) {
        for b in &mut self.blocks {
            b.put_scalar(value);
        }
    }

    /// `self += alpha * x`, block by block.
    pub fn axpy(&mut self, alpha: f64, x: &TreeVector) -> Result<(), ThawError> {
        if x.len() != self.len() {
            return Err(ThawError::ShapeMismatch {
                key: "tree vector".into(),
                expected: format!("{} blocks", self.len()),
                found: format!("{} blocks", x.len()),
            });
        }
        for (b, xb) in self.blocks.iter_mut().zip(&x.blocks) {
            b.axpy(alpha, xb)?;
        }
        Ok(())
    }

    /// Largest absolute entry over all blocks.
    pub fn norm_inf(&self) -> f64 {
        self.blocks.iter().map(CompositeVector::norm_inf).fold(0.0, f64::max)
    }
}
