use crate::core::{ChildCoord, NodeId};
use glam::IVec3;
use thiserror::Error;

/// Rejected octree operations
///
/// Every variant is a caller contract violation. Nothing in the crate retries
/// or degrades: the operation is refused and the tree is left untouched.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum OctreeError {
    #[error("Invalid child coordinate ({x}, {y}, {z}): components must be 0 or 1")]
    InvalidCoordinate { x: i32, y: i32, z: i32 },

    #[error("Depth {requested} is out of range (max {max})")]
    OutOfRangeDepth { requested: u32, max: u32 },

    #[error("Node {parent:?} already has a child at {coord:?}")]
    DuplicateChild { parent: NodeId, coord: ChildCoord },

    #[error("Node {0:?} has been removed from the tree")]
    StaleNode(NodeId),

    #[error("Ray direction is zero or not finite")]
    InvalidDirection,

    #[error("Point {0} lies outside the root bounds")]
    PointOutOfBounds(glam::Vec3),

    #[error("No tree at grid cell {0}")]
    NoSuchTree(IVec3),
}

pub type Result<T> = std::result::Result<T, OctreeError>;
