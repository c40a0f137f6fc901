//! Error types for mesh construction and lookup.

use std::fmt;

/// Errors arising from mesh construction or mesh registry lookups.
#[derive(Debug, Clone, PartialEq)]
pub enum MeshError {
    /// Attempted to construct a mesh with zero cells.
    EmptyMesh {
        /// Name of the mesh being built.
        name: String,
    },
    /// A geometric parameter is not strictly positive and finite.
    InvalidGeometry {
        /// Name of the mesh being built.
        name: String,
        /// What went wrong.
        reason: String,
    },
    /// A mesh with this name is already registered.
    DuplicateMesh {
        /// The contested name.
        name: String,
    },
    /// No mesh is registered under this name.
    UnknownMesh {
        /// The requested name.
        name: String,
    },
}

impl fmt::Display for MeshError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptyMesh { name } => write!(f, "mesh '{name}' must have at least one cell"),
            Self::InvalidGeometry { name, reason } => {
                write!(f, "mesh '{name}': invalid geometry: {reason}")
            }
            Self::DuplicateMesh { name } => write!(f, "mesh '{name}' is already registered"),
            Self::UnknownMesh { name } => write!(f, "no mesh named '{name}'"),
        }
    }
}

impl std::error::Error for MeshError {}

impl MeshError {
    /// Name of the mesh the error concerns.
    pub fn mesh_name(&self) -> &str {
        match self {
            Self::EmptyMesh { name }
            | Self::InvalidGeometry { name, .. }
            | Self::DuplicateMesh { name }
            | Self::UnknownMesh { name } => name,
        }
    }
}

impl From<MeshError> for thaw_core::ThawError {
    fn from(e: MeshError) -> Self {
        match e {
            MeshError::UnknownMesh { name } => Self::NotFound {
                key: format!("mesh '{name}'"),
            },
            other => Self::Config(thaw_core::ConfigError::InvalidValue {
                context: "mesh".into(),
                key: other.mesh_name().to_string(),
                reason: other.to_string(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use thaw_core::{ErrorClass, ThawError};

    #[test]
    fn unknown_mesh_is_a_sequencing_error() {
        let e: ThawError = MeshError::UnknownMesh {
            name: "column_4".into(),
        }
        .into();
        assert_eq!(e.class(), ErrorClass::Sequencing);
        assert_eq!(e.to_string(), "not found: mesh 'column_4'");
    }

    #[test]
    fn construction_errors_are_structural() {
        let e: ThawError = MeshError::EmptyMesh {
            name: "domain".into(),
        }
        .into();
        assert_eq!(e.class(), ErrorClass::Structural);
    }
}
