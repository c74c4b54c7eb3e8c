//! CSM text format
//!
//! One statement per cell: `>path item`, with the path spelled in octant
//! letters `a`..`h` (`a` is the origin octant, then x, y and z bits) and an
//! empty path for the root. `>path [i0 i1 .. i7]` assigns all eight children
//! at once, `_` leaving a slot empty. `#` starts a comment.

mod parser;
mod serializer;

pub use parser::{load_csm, parse_csm, CsmError};
pub use serializer::serialize_csm;
