//! Item policy: how items map onto meshes and materials
//!
//! The tree never looks inside items. Everything it needs to know to route a
//! face into a buffer is asked of the policy injected at construction.

use serde::{Deserialize, Serialize};

/// Identifier of a per-material face buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct MeshId(pub u32);

/// Host-side material handle, opaque to the core
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MaterialId(pub u32);

/// Material resolver queried whenever a node's item changes
pub trait ItemPolicy<T> {
    /// Buffer the item's faces are emitted into
    fn mesh_id(&self, item: &T) -> MeshId;

    /// Material bound to a buffer when it is published
    fn material(&self, mesh: MeshId) -> MaterialId;
}

/// Items are their own mesh id and mesh ids are their own material
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultPolicy;

impl<T> ItemPolicy<T> for DefaultPolicy
where
    T: Copy + Into<u32>,
{
    fn mesh_id(&self, item: &T) -> MeshId {
        MeshId((*item).into())
    }

    fn material(&self, mesh: MeshId) -> MaterialId {
        MaterialId(mesh.0)
    }
}

/// Policy built from two plain functions
pub struct FnPolicy<T> {
    mesh: Box<dyn Fn(&T) -> MeshId>,
    material: Box<dyn Fn(MeshId) -> MaterialId>,
}

impl<T> FnPolicy<T> {
    pub fn new(
        mesh: impl Fn(&T) -> MeshId + 'static,
        material: impl Fn(MeshId) -> MaterialId + 'static,
    ) -> Self {
        Self {
            mesh: Box::new(mesh),
            material: Box::new(material),
        }
    }
}

impl<T> ItemPolicy<T> for FnPolicy<T> {
    fn mesh_id(&self, item: &T) -> MeshId {
        (self.mesh)(item)
    }

    fn material(&self, mesh: MeshId) -> MaterialId {
        (self.material)(mesh)
    }
}
