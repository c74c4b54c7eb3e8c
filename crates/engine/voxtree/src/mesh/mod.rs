//! Face generation: neighbor resolution, face buffers and publication

pub mod buffer;
pub mod face;
mod mesher;
pub mod resolver;
pub mod sink;

pub use buffer::{Face, FaceBuffer, FaceId};
pub use face::Quad;
pub use mesher::ProcessStats;
pub use resolver::{NoSiblings, SiblingTrees, SideState};
pub use sink::{CollectingSink, MeshSink, MeshUpdate, PublishedMesh, SubMesh};
