pub mod coord;
pub mod node;
pub mod octree;
pub mod side;

pub use coord::{ChildCoord, ChildIndex, CoordPath, Neighbor};
pub(crate) use node::NodeArena;
pub use node::{Aabb, NodeId, OctreeNode};
pub use octree::{Edit, Located, Octree};
pub use side::Side;
