//! Execution context passed to evaluators.
//!
//! [`EvalContext`] provides split-borrow field access: shared reads of the
//! evaluator's declared dependencies straight from the [`FieldStore`], and
//! exclusive access to the one output buffer the engine checked out for it.

use smallvec::SmallVec;
use thaw_core::{CompositeSpace, EntityKind, EvalError, FieldKey};
use thaw_mesh::{Mesh, MeshSet};
use thaw_store::{CompositeVector, FieldStore};

/// Execution context passed to [`Evaluator::evaluate`](crate::Evaluator::evaluate)
/// and [`Evaluator::partial_derivative`](crate::Evaluator::partial_derivative).
///
/// Reads are restricted to the evaluator's declared dependencies; reading
/// any other key fails with [`EvalError::MissingInput`]. Input references
/// borrow the store for `'a`, so they stay valid while the output is
/// mutated.
pub struct EvalContext<'a> {
    key: &'a FieldKey,
    dependencies: &'a [FieldKey],
    store: &'a FieldStore,
    meshes: &'a MeshSet,
    output: &'a mut CompositeVector,
}

impl<'a> EvalContext<'a> {
    /// Construct a new evaluation context.
    ///
    /// Typically called by the engine, not by evaluators directly.
    pub fn new(
        key: &'a FieldKey,
        dependencies: &'a [FieldKey],
        store: &'a FieldStore,
        meshes: &'a MeshSet,
        output: &'a mut CompositeVector,
    ) -> Self {
        Self {
            key,
            dependencies,
            store,
            meshes,
            output,
        }
    }

    /// Key of the field being computed.
    pub fn key(&self) -> &'a FieldKey {
        self.key
    }

    /// Current value of a declared dependency.
    pub fn input(&self, key: &FieldKey) -> Result<&'a CompositeVector, EvalError> {
        if !self.dependencies.contains(key) {
            return Err(EvalError::MissingInput { key: key.clone() });
        }
        self.store
            .get(key)
            .map_err(|_| EvalError::MissingInput { key: key.clone() })
    }

    /// All entries of one component of a declared dependency.
    pub fn input_component(&self, key: &FieldKey, kind: EntityKind) -> Result<&'a [f64], EvalError> {
        self.input(key)?
            .component(kind)
            .ok_or_else(|| EvalError::MissingInput { key: key.clone() })
    }

    /// The output buffer.
    pub fn output(&mut self) -> &mut CompositeVector {
        self.output
    }

    /// Shape of the output buffer.
    pub fn output_space(&self) -> &CompositeSpace {
        self.output.space()
    }

    /// Look up a mesh by name.
    pub fn mesh(&self, name: &str) -> Option<&'a dyn Mesh> {
        self.meshes.get(name).ok().map(|m| m.as_ref())
    }

    /// Fill the output entity by entity from same-shaped inputs.
    ///
    /// For every component of the output and every entity `i` in it
    /// (ghosts included), `f(i, values)` is called with the `i`-th entry of
    /// each key in `inputs`, in order. An input lacking the component, or
    /// with a different length, fails with [`EvalError::MissingInput`].
    pub fn map_pointwise<F>(&mut self, inputs: &[FieldKey], mut f: F) -> Result<(), EvalError>
    where
        F: FnMut(usize, &[f64]) -> Result<f64, EvalError>,
    {
        let own_key = self.key;
        let kinds: SmallVec<[EntityKind; 3]> =
            self.output.space().components.iter().map(|c| c.kind).collect();
        let mut values: SmallVec<[f64; 8]> = SmallVec::with_capacity(inputs.len());
        for kind in kinds {
            let mut columns: SmallVec<[&[f64]; 8]> = SmallVec::with_capacity(inputs.len());
            for key in inputs {
                columns.push(self.input_component(key, kind)?);
            }
            let out = self
                .output
                .component_mut(kind)
                .ok_or_else(|| EvalError::MissingInput { key: own_key.clone() })?;
            if let Some(pos) = columns.iter().position(|c| c.len() != out.len()) {
                return Err(EvalError::MissingInput {
                    key: inputs[pos].clone(),
                });
            }
            for (i, slot) in out.iter_mut().enumerate() {
                values.clear();
                values.extend(columns.iter().map(|c| c[i]));
                *slot = f(i, &values)?;
            }
        }
        Ok(())
    }
}
