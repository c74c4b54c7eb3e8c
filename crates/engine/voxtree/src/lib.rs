//! Sparse voxel octree with incremental face meshing and ray picking
//!
//! Items live on leaves. Every edit updates per-side solidity sets up the
//! tree and queues the affected leaves; [`Octree::process`] re-resolves their
//! faces against their neighbors, compacts the per-mesh face buffers and hands
//! them to a [`MeshSink`].

pub mod config;
pub mod core;
pub mod error;
pub mod io;
pub mod mesh;
pub mod policy;
pub mod raycast;
pub mod world;

pub use config::{ConfigError, OctreeConfig};
pub use self::core::{
    Aabb, ChildCoord, ChildIndex, CoordPath, Edit, Located, Neighbor, NodeId, Octree, OctreeNode,
    Side,
};
pub use error::{OctreeError, Result};
pub use io::{load_csm, parse_csm, serialize_csm, CsmError};
pub use mesh::{
    CollectingSink, FaceBuffer, MeshSink, MeshUpdate, NoSiblings, ProcessStats, PublishedMesh,
    Quad, SideState, SiblingTrees, SubMesh,
};
pub use policy::{DefaultPolicy, FnPolicy, ItemPolicy, MaterialId, MeshId};
pub use raycast::{Ray, RayHit, RayQuery};
pub use world::World;

// Re-export glam for convenience
pub use glam;
