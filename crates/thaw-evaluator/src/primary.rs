//! Primary variable evaluator: a field written by the outer solver.

use smallvec::{smallvec, SmallVec};
use thaw_core::{
    CompositeSpace, ConfigError, EntityKind, EvalError, FieldKey, IoFlags, ParamReader,
    ParameterList,
};
use thaw_mesh::{MeshError, MeshSet};

use crate::context::EvalContext;
use crate::evaluator::{Evaluator, EvaluatorKind};
use crate::factory::EVALUATOR_TYPE_KEY;

/// A field whose values are supplied externally, e.g. a solved-for
/// pressure or temperature iterate.
///
/// Evaluation is a no-op. Its derivative with respect to itself is one,
/// with respect to anything else zero.
///
/// # Configuration
///
/// | key | type | default |
/// |-----|------|---------|
/// | `"field key"` | string | required |
/// | `"tag"` | string | none |
/// | `"components"` | string array of `cell`/`face`/`node` | `["cell"]` |
/// | `"visualize <key>"`, `"checkpoint <key>"` | bool | `true`, `false` |
#[derive(Clone, Debug)]
pub struct PrimaryVariable {
    key: FieldKey,
    components: SmallVec<[EntityKind; 2]>,
    io: IoFlags,
}

impl PrimaryVariable {
    /// Type name under which the factory registers this evaluator.
    pub const TYPE_NAME: &'static str = "primary variable";

    /// Cell-centred primary variable.
    pub fn new(key: impl Into<FieldKey>) -> Self {
        Self {
            key: key.into(),
            components: smallvec![EntityKind::Cell],
            io: IoFlags::default(),
        }
    }

    /// Replace the component kinds of the field (e.g. cells and faces for
    /// a mixed discretisation).
    pub fn with_components(mut self, kinds: &[EntityKind]) -> Self {
        self.components = kinds.iter().copied().collect();
        self
    }

    /// Replace the IO flags.
    pub fn with_io_flags(mut self, io: IoFlags) -> Self {
        self.io = io;
        self
    }

    /// Build from a configuration record.
    pub fn from_params(plist: &ParameterList) -> Result<Self, ConfigError> {
        let mut r = ParamReader::new(plist, Self::TYPE_NAME);
        r.ignore(EVALUATOR_TYPE_KEY);
        let mut key = FieldKey::new(r.string("field key")?);
        if let Some(tag) = r.opt_string("tag")? {
            key = key.with_tag(tag);
        }
        let mut components = SmallVec::new();
        for name in r.opt_string_array("components")?.unwrap_or_default() {
            let kind = match name.as_str() {
                "cell" => EntityKind::Cell,
                "face" => EntityKind::Face,
                "node" => EntityKind::Node,
                other => {
                    return Err(r.invalid("components", format!("unknown entity kind '{other}'")))
                }
            };
            components.push(kind);
        }
        if components.is_empty() {
            components.push(EntityKind::Cell);
        }
        let io = r.io_flags(&key)?;
        r.finish()?;
        Ok(Self {
            key,
            components,
            io,
        })
    }

    /// Factory constructor.
    pub fn construct(plist: &ParameterList) -> Result<Box<dyn Evaluator>, ConfigError> {
        Ok(Box::new(Self::from_params(plist)?))
    }
}

impl Evaluator for PrimaryVariable {
    fn name(&self) -> &str {
        Self::TYPE_NAME
    }

    fn key(&self) -> &FieldKey {
        &self.key
    }

    fn kind(&self) -> EvaluatorKind {
        EvaluatorKind::Primary
    }

    fn dependencies(&self) -> &[FieldKey] {
        &[]
    }

    fn output_space(&self, meshes: &MeshSet) -> Result<CompositeSpace, MeshError> {
        Ok(meshes.get(self.key.domain())?.space(&self.components))
    }

    fn io_flags(&self) -> IoFlags {
        self.io
    }

    fn evaluate(&self, _ctx: &mut EvalContext<'_>) -> Result<(), EvalError> {
        Ok(())
    }

    fn partial_derivative(
        &self,
        ctx: &mut EvalContext<'_>,
        wrt: &FieldKey,
    ) -> Result<(), EvalError> {
        let value = if *wrt == self.key { 1.0 } else { 0.0 };
        ctx.output().put_scalar(value);
        Ok(())
    }
}
