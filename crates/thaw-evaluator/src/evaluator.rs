//! The [`Evaluator`] trait and [`EvaluatorKind`] enum.
//!
//! Evaluators declare their output key and dependency keys at
//! construction. The engine validates the resulting graph once, then calls
//! [`Evaluator::evaluate`] whenever an input has changed and
//! [`Evaluator::partial_derivative`] when a chain-rule step needs the local
//! sensitivity to one direct dependency.

use crate::context::EvalContext;
use thaw_core::{CompositeSpace, EntityKind, EvalError, FieldKey, IoFlags};
use thaw_mesh::{MeshError, MeshSet};

/// Whether a field is supplied externally or derived.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EvaluatorKind {
    /// Value written by the outer solver; evaluation is a no-op.
    Primary,
    /// Value computed from dependencies.
    Secondary,
}

/// A unit of computation producing one field from declared dependencies.
///
/// # Contract
///
/// - `evaluate()` MUST be deterministic and write only through
///   [`EvalContext::output`].
/// - `&self`: evaluators are shared and read-only after construction;
///   cached state (epochs, derivative fields, counters) belongs to the
///   engine.
/// - `key()` and `dependencies()` are called at setup, not per evaluation.
/// - `partial_derivative()` is only called with a `wrt` among
///   `dependencies()`, and only when a dependency path actually reaches
///   the requested variable. Returning
///   [`EvalError::DerivativeNotImplemented`] is an explicit refusal, never
///   a silent zero.
///
/// # Object safety
///
/// This trait is object-safe; the engine stores evaluators as
/// `Box<dyn Evaluator>`.
///
/// # Examples
///
/// A doubling evaluator:
///
/// ```
/// use thaw_core::{EvalError, FieldKey};
/// use thaw_evaluator::{EvalContext, Evaluator};
///
/// struct Double {
///     key: FieldKey,
///     deps: Vec<FieldKey>,
/// }
///
/// impl Evaluator for Double {
///     fn name(&self) -> &str { "double" }
///     fn key(&self) -> &FieldKey { &self.key }
///     fn dependencies(&self) -> &[FieldKey] { &self.deps }
///
///     fn evaluate(&self, ctx: &mut EvalContext<'_>) -> Result<(), EvalError> {
///         ctx.map_pointwise(&self.deps, |_, x| Ok(2.0 * x[0]))
///     }
///
///     fn partial_derivative(
///         &self,
///         ctx: &mut EvalContext<'_>,
///         _wrt: &FieldKey,
///     ) -> Result<(), EvalError> {
///         ctx.output().put_scalar(2.0);
///         Ok(())
///     }
/// }
///
/// let d = Double { key: "y".into(), deps: vec!["x".into()] };
/// assert_eq!(d.dependencies().len(), 1);
/// ```
pub trait Evaluator: Send + 'static {
    /// Evaluator type name for error reporting and telemetry.
    fn name(&self) -> &str;

    /// Key of the field this evaluator produces.
    fn key(&self) -> &FieldKey;

    /// Primary or secondary. Default: secondary.
    fn kind(&self) -> EvaluatorKind {
        EvaluatorKind::Secondary
    }

    /// Keys this evaluator reads, in a fixed order.
    fn dependencies(&self) -> &[FieldKey];

    /// Shape of the output field.
    ///
    /// Default: one scalar cell component on the mesh named by the output
    /// key's domain.
    fn output_space(&self, meshes: &MeshSet) -> Result<CompositeSpace, MeshError> {
        Ok(meshes.get(self.key().domain())?.space(&[EntityKind::Cell]))
    }

    /// Shapes this evaluator requires of its dependencies.
    ///
    /// Default: every dependency on the output space, which is what a
    /// pointwise closure relation needs. Evaluators that read another mesh
    /// (e.g. a column below a surface cell) override this.
    fn dependency_spaces(
        &self,
        meshes: &MeshSet,
    ) -> Result<Vec<(FieldKey, CompositeSpace)>, MeshError> {
        let space = self.output_space(meshes)?;
        Ok(self
            .dependencies()
            .iter()
            .map(|d| (d.clone(), space.clone()))
            .collect())
    }

    /// Visualisation and checkpoint flags of the output field.
    fn io_flags(&self) -> IoFlags {
        IoFlags::default()
    }

    /// Whether the first change request for this field must report a
    /// change and recompute, even when the engine considers it fresh.
    fn forces_initial_update(&self) -> bool {
        false
    }

    /// Recompute the output from the current dependency values.
    fn evaluate(&self, ctx: &mut EvalContext<'_>) -> Result<(), EvalError>;

    /// Write `∂(output)/∂(wrt)` into the output buffer, entity by entity.
    ///
    /// `wrt` is always one of [`dependencies`](Self::dependencies).
    /// Default: not implemented.
    fn partial_derivative(
        &self,
        ctx: &mut EvalContext<'_>,
        wrt: &FieldKey,
    ) -> Result<(), EvalError> {
        let _ = ctx;
        Err(EvalError::DerivativeNotImplemented { wrt: wrt.clone() })
    }
}
