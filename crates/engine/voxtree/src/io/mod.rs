// Input/Output: parsing and serialization

pub mod csm;

pub use csm::{load_csm, parse_csm, serialize_csm, CsmError};
