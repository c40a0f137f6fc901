//! Field shapes: entity kinds, component layouts and IO flags.

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use std::fmt;

/// Kind of mesh entity a field component is indexed by.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityKind {
    /// Cell-centred values.
    Cell,
    /// Face-centred values (e.g. mixed finite-element Lagrange multipliers).
    Face,
    /// Node values.
    Node,
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Cell => "cell",
            Self::Face => "face",
            Self::Node => "node",
        };
        f.write_str(s)
    }
}

/// Layout of one component of a composite field.
///
/// Entities `0..owned` are owned by this process; the following `ghost`
/// entities mirror values owned elsewhere. Each entity carries `dofs`
/// consecutive doubles.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ComponentSpace {
    /// Entity kind indexing this component.
    pub kind: EntityKind,
    /// Number of locally owned entities.
    pub owned: usize,
    /// Number of ghost entities following the owned ones.
    #[serde(default)]
    pub ghost: usize,
    /// Degrees of freedom per entity.
    #[serde(default = "one")]
    pub dofs: usize,
}

fn one() -> usize {
    1
}

impl ComponentSpace {
    /// Scalar component with no ghosts.
    pub fn scalar(kind: EntityKind, owned: usize) -> Self {
        Self {
            kind,
            owned,
            ghost: 0,
            dofs: 1,
        }
    }

    /// Number of entities including ghosts.
    pub fn entities(&self) -> usize {
        self.owned + self.ghost
    }

    /// Storage length in doubles, ghosts included.
    pub fn len(&self) -> usize {
        self.entities() * self.dofs
    }

    /// Whether this component stores no values.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Discretisation shape of a field: the mesh it lives on and its components.
///
/// Two fields can be combined entity-by-entity exactly when their spaces
/// compare equal.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CompositeSpace {
    /// Name of the mesh the field is associated with.
    pub mesh: String,
    /// Components in declaration order; kinds are unique.
    pub components: SmallVec<[ComponentSpace; 2]>,
}

impl CompositeSpace {
    /// Space with no components on `mesh`.
    pub fn new(mesh: impl Into<String>) -> Self {
        Self {
            mesh: mesh.into(),
            components: SmallVec::new(),
        }
    }

    /// Add a component, replacing any existing component of the same kind.
    pub fn with_component(mut self, component: ComponentSpace) -> Self {
        match self.components.iter_mut().find(|c| c.kind == component.kind) {
            Some(existing) => *existing = component,
            None => self.components.push(component),
        }
        self
    }

    /// Look up the component of a given kind.
    pub fn component(&self, kind: EntityKind) -> Option<&ComponentSpace> {
        self.components.iter().find(|c| c.kind == kind)
    }

    /// Whether the space has a component of `kind`.
    pub fn has_component(&self, kind: EntityKind) -> bool {
        self.component(kind).is_some()
    }

    /// Total number of doubles across all components.
    pub fn len(&self) -> usize {
        self.components.iter().map(ComponentSpace::len).sum()
    }

    /// Whether the space stores no values.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl fmt::Display for CompositeSpace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}[", self.mesh)?;
        for (i, c) in self.components.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}:{}", c.kind, c.owned)?;
            if c.ghost > 0 {
                write!(f, "+{}", c.ghost)?;
            }
            if c.dofs != 1 {
                write!(f, "x{}", c.dofs)?;
            }
        }
        write!(f, "]")
    }
}

/// Output flags carried by every field.
///
/// The engine only records these; writing visualisation or checkpoint
/// files is the job of the IO layer.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct IoFlags {
    /// Include the field in visualisation output.
    pub visualize: bool,
    /// Include the field in checkpoint/restart state.
    pub checkpoint: bool,
}

impl Default for IoFlags {
    fn default() -> Self {
        Self {
            visualize: true,
            checkpoint: false,
        }
    }
}
