//! Multi-component distributed vectors.

use smallvec::SmallVec;
use thaw_core::{ComponentSpace, CompositeSpace, EntityKind};

use crate::error::StoreError;

/// Field data partitioned by entity kind.
///
/// Holds one `Vec<f64>` per component of its [`CompositeSpace`], each of
/// length `(owned + ghost) * dofs`. Ghost entries follow the owned ones;
/// refreshing them is the job of the distributed layer, so reductions
/// (`dot`, norms) only visit owned entries.
#[derive(Clone, Debug, PartialEq)]
pub struct CompositeVector {
    space: CompositeSpace,
    data: SmallVec<[Vec<f64>; 2]>,
}

impl CompositeVector {
    /// Zero-filled vector on `space`.
    pub fn new(space: CompositeSpace) -> Self {
        Self::constant(space, 0.0)
    }

    /// Vector on `space` with every entry equal to `value`.
    pub fn constant(space: CompositeSpace, value: f64) -> Self {
        let data = space.components.iter().map(|c| vec![value; c.len()]).collect();
        Self { space, data }
    }

    /// Shape of this vector.
    pub fn space(&self) -> &CompositeSpace {
        &self.space
    }

    fn index(&self, kind: EntityKind) -> Option<usize> {
        self.space.components.iter().position(|c| c.kind == kind)
    }

    fn check_shape(&self, other: &CompositeVector) -> Result<(), StoreError> {
        if self.space == other.space {
            Ok(())
        } else {
            Err(StoreError::IncompatibleVectors {
                expected: self.space.clone(),
                found: other.space.clone(),
            })
        }
    }

    /// All entries (owned then ghost) of the `kind` component.
    pub fn component(&self, kind: EntityKind) -> Option<&[f64]> {
        self.index(kind).map(|i| self.data[i].as_slice())
    }

    /// Mutable access to all entries of the `kind` component.
    pub fn component_mut(&mut self, kind: EntityKind) -> Option<&mut [f64]> {
        self.index(kind).map(|i| self.data[i].as_mut_slice())
    }

    /// Owned entries of the `kind` component.
    pub fn owned(&self, kind: EntityKind) -> Option<&[f64]> {
        let i = self.index(kind)?;
        let c = &self.space.components[i];
        Some(&self.data[i][..c.owned * c.dofs])
    }

    /// Mutable owned entries of the `kind` component.
    pub fn owned_mut(&mut self, kind: EntityKind) -> Option<&mut [f64]> {
        let i = self.index(kind)?;
        let c = self.space.components[i];
        Some(&mut self.data[i][..c.owned * c.dofs])
    }

    /// Overwrite the `kind` component with `values`.
    ///
    /// `values` may cover the owned entries only or all entries.
    pub fn set_component(&mut self, kind: EntityKind, values: &[f64]) -> Result<(), StoreError> {
        let fits = self.index(kind).filter(|&i| {
            let c = &self.space.components[i];
            values.len() == c.len() || values.len() == c.owned * c.dofs
        });
        let Some(i) = fits else {
            return Err(StoreError::IncompatibleVectors {
                expected: self.space.clone(),
                found: CompositeSpace::new(self.space.mesh.clone())
                    .with_component(ComponentSpace::scalar(kind, values.len())),
            });
        };
        self.data[i][..values.len()].copy_from_slice(values);
        Ok(())
    }

    /// Iterate over `(kind, entries)` pairs in component order.
    pub fn iter(&self) -> impl Iterator<Item = (EntityKind, &[f64])> {
        self.space
            .components
            .iter()
            .zip(self.data.iter())
            .map(|(c, d)| (c.kind, d.as_slice()))
    }

    /// Iterate mutably over `(kind, entries)` pairs in component order.
    pub fn iter_mut(&mut self) -> impl Iterator<Item = (EntityKind, &mut [f64])> {
        self.space
            .components
            .iter()
            .zip(self.data.iter_mut())
            .map(|(c, d)| (c.kind, d.as_mut_slice()))
    }

    /// Set every entry to `value`.
    pub fn put_scalar(&mut self, value: f64) {
        for d in &mut self.data {
            d.fill(value);
        }
    }

    /// Multiply every entry by `alpha`.
    pub fn scale(&mut self, alpha: f64) {
        for d in &mut self.data {
            d.iter_mut().for_each(|v| *v *= alpha);
        }
    }

    /// Copy values from a vector of the same shape.
    pub fn copy_from(&mut self, other: &CompositeVector) -> Result<(), StoreError> {
        self.check_shape(other)?;
        for (d, o) in self.data.iter_mut().zip(other.data.iter()) {
            d.copy_from_slice(o);
        }
        Ok(())
    }

    /// `self += alpha * x`.
    pub fn axpy(&mut self, alpha: f64, x: &CompositeVector) -> Result<(), StoreError> {
        self.check_shape(x)?;
        for (d, o) in self.data.iter_mut().zip(x.data.iter()) {
            d.iter_mut().zip(o).for_each(|(v, &w)| *v += alpha * w);
        }
        Ok(())
    }

    /// `self += a ⊙ b` (entry-wise product).
    pub fn add_product(&mut self, a: &CompositeVector, b: &CompositeVector) -> Result<(), StoreError> {
        self.check_shape(a)?;
        self.check_shape(b)?;
        for ((d, x), y) in self.data.iter_mut().zip(a.data.iter()).zip(b.data.iter()) {
            for ((v, &p), &q) in d.iter_mut().zip(x).zip(y) {
                *v += p * q;
            }
        }
        Ok(())
    }

    /// Dot product over owned entries.
    pub fn dot(&self, other: &CompositeVector) -> Result<f64, StoreError> {
        self.check_shape(other)?;
        let mut sum = 0.0;
        for (i, c) in self.space.components.iter().enumerate() {
            let n = c.owned * c.dofs;
            sum += self.data[i][..n]
                .iter()
                .zip(&other.data[i][..n])
                .map(|(a, b)| a * b)
                .sum::<f64>();
        }
        Ok(sum)
    }

    /// Largest absolute owned entry.
    pub fn norm_inf(&self) -> f64 {
        self.space
            .components
            .iter()
            .zip(self.data.iter())
            .flat_map(|(c, d)| d[..c.owned * c.dofs].iter())
            .fold(0.0, |m: f64, v| m.max(v.abs()))
    }

    /// Euclidean norm over owned entries.
    pub fn norm2(&self) -> f64 {
        self.space
            .components
            .iter()
            .zip(self.data.iter())
            .flat_map(|(c, d)| d[..c.owned * c.dofs].iter())
            .map(|v| v * v)
            .sum::<f64>()
            .sqrt()
    }

    /// Whether every entry, ghosts included, is exactly zero.
    pub fn is_zero(&self) -> bool {
        self.data.iter().all(|d| d.iter().all(|&v| v == 0.0))
    }

    /// Whether any entry is NaN or infinite, and if so the first offending
    /// `(kind, local index)`.
    pub fn first_non_finite(&self) -> Option<(EntityKind, usize)> {
        self.iter()
            .find_map(|(kind, d)| d.iter().position(|v| !v.is_finite()).map(|i| (kind, i)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn cell_face(cells: usize, faces: usize) -> CompositeSpace {
        CompositeSpace::new("m")
            .with_component(ComponentSpace::scalar(EntityKind::Cell, cells))
            .with_component(ComponentSpace::scalar(EntityKind::Face, faces))
    }

    #[test]
    fn new_is_zero_filled() {
        let v = CompositeVector::new(cell_face(3, 4));
        assert!(v.is_zero());
        assert_eq!(v.component(EntityKind::Face).unwrap().len(), 4);
        assert!(v.component(EntityKind::Node).is_none());
    }

    #[test]
    fn owned_excludes_ghosts() {
        let space = CompositeSpace::new("m").with_component(ComponentSpace {
            kind: EntityKind::Cell,
            owned: 2,
            ghost: 3,
            dofs: 1,
        });
        let mut v = CompositeVector::constant(space, 1.0);
        assert_eq!(v.owned(EntityKind::Cell).unwrap().len(), 2);
        assert_eq!(v.component(EntityKind::Cell).unwrap().len(), 5);
        assert_eq!(v.norm2(), 2f64.sqrt());
        v.owned_mut(EntityKind::Cell).unwrap()[1] = -4.0;
        assert_eq!(v.norm_inf(), 4.0);
    }

    #[test]
    fn set_component_checks_length() {
        let mut v = CompositeVector::new(cell_face(2, 3));
        v.set_component(EntityKind::Cell, &[1.0, 2.0]).unwrap();
        assert_eq!(v.component(EntityKind::Cell).unwrap(), &[1.0, 2.0]);
        assert!(matches!(
            v.set_component(EntityKind::Cell, &[1.0]),
            Err(StoreError::IncompatibleVectors { .. })
        ));
        assert!(v.set_component(EntityKind::Node, &[1.0]).is_err());
    }

    #[test]
    fn binary_ops_reject_shape_mismatch() {
        let mut a = CompositeVector::new(cell_face(2, 3));
        let b = CompositeVector::new(cell_face(2, 4));
        assert!(a.axpy(1.0, &b).is_err());
        assert!(a.copy_from(&b).is_err());
        assert!(a.dot(&b).is_err());
    }

    #[test]
    fn add_product_accumulates() {
        let s = cell_face(2, 0);
        let mut acc = CompositeVector::constant(s.clone(), 1.0);
        let mut a = CompositeVector::new(s.clone());
        a.set_component(EntityKind::Cell, &[2.0, 3.0]).unwrap();
        let b = CompositeVector::constant(s, 4.0);
        acc.add_product(&a, &b).unwrap();
        assert_eq!(acc.component(EntityKind::Cell).unwrap(), &[9.0, 13.0]);
    }

    #[test]
    fn first_non_finite_reports_location() {
        let mut v = CompositeVector::new(cell_face(2, 2));
        assert_eq!(v.first_non_finite(), None);
        v.component_mut(EntityKind::Face).unwrap()[1] = f64::NAN;
        assert_eq!(v.first_non_finite(), Some((EntityKind::Face, 1)));
    }

    proptest! {
        #[test]
        fn axpy_then_dot_is_linear(
            x in prop::collection::vec(-10.0f64..10.0, 1..16),
            alpha in -3.0f64..3.0,
        ) {
            let space = CompositeSpace::new("m")
                .with_component(ComponentSpace::scalar(EntityKind::Cell, x.len()));
            let mut xv = CompositeVector::new(space.clone());
            xv.set_component(EntityKind::Cell, &x).unwrap();
            let mut y = CompositeVector::new(space);
            y.axpy(alpha, &xv).unwrap();
            let lhs = y.dot(&xv).unwrap();
            let rhs = alpha * xv.dot(&xv).unwrap();
            prop_assert!((lhs - rhs).abs() <= 1e-9 * (1.0 + rhs.abs()));
        }
    }
}
