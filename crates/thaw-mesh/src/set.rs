//! Registry of named meshes.

use crate::error::MeshError;
use crate::mesh::Mesh;
use indexmap::IndexMap;
use std::sync::Arc;

/// Named meshes of one simulation, in registration order.
///
/// A field's domain prefix (see [`FieldKey::domain`](thaw_core::FieldKey::domain))
/// names the mesh it lives on.
#[derive(Clone, Default)]
pub struct MeshSet {
    meshes: IndexMap<String, Arc<dyn Mesh>>,
}

impl MeshSet {
    /// Empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a mesh under its own name.
    pub fn insert(&mut self, mesh: Arc<dyn Mesh>) -> Result<(), MeshError> {
        let name = mesh.name().to_string();
        if self.meshes.contains_key(&name) {
            return Err(MeshError::DuplicateMesh { name });
        }
        self.meshes.insert(name, mesh);
        Ok(())
    }

    /// Builder form of [`insert`](Self::insert).
    pub fn with(mut self, mesh: impl Mesh) -> Result<Self, MeshError> {
        self.insert(Arc::new(mesh))?;
        Ok(self)
    }

    /// Look up a mesh by name.
    pub fn get(&self, name: &str) -> Result<&Arc<dyn Mesh>, MeshError> {
        self.meshes.get(name).ok_or_else(|| MeshError::UnknownMesh {
            name: name.to_string(),
        })
    }

    /// Whether a mesh named `name` is registered.
    pub fn contains(&self, name: &str) -> bool {
        self.meshes.contains_key(name)
    }

    /// Registered names in registration order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.meshes.keys().map(String::as_str)
    }

    /// Number of registered meshes.
    pub fn len(&self) -> usize {
        self.meshes.len()
    }

    /// Whether no mesh is registered.
    pub fn is_empty(&self) -> bool {
        self.meshes.is_empty()
    }
}

impl std::fmt::Debug for MeshSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.meshes.keys()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{ColumnMesh, Grid2D};

    #[test]
    fn lookup_by_name() {
        let set = MeshSet::new()
            .with(Grid2D::new("domain", 2, 2, 1.0, 1.0).unwrap())
            .unwrap()
            .with(ColumnMesh::uniform("column_0", 3, 0.1).unwrap())
            .unwrap();
        assert_eq!(set.len(), 2);
        assert_eq!(set.get("column_0").unwrap().dim(), 1);
        assert!(set.get("domain").unwrap().downcast_ref::<Grid2D>().is_some());
        assert_eq!(set.names().collect::<Vec<_>>(), vec!["domain", "column_0"]);
    }

    #[test]
    fn duplicate_and_unknown() {
        let mut set = MeshSet::new();
        set.insert(Arc::new(ColumnMesh::uniform("c", 1, 1.0).unwrap()))
            .unwrap();
        let dup = set.insert(Arc::new(ColumnMesh::uniform("c", 2, 1.0).unwrap()));
        assert!(matches!(dup, Err(MeshError::DuplicateMesh { .. })));
        assert!(matches!(
            set.get("missing"),
            Err(MeshError::UnknownMesh { .. })
        ));
    }
}
