//! Coordinate indexing
//!
//! Sparse tensors are addressed by integer coordinates. This module turns
//! those coordinates into dense row indices and derives the coordinate sets
//! that strided and global operations produce.
//!
//! ```text
//! Coord                 D spatial components + batch index
//! CoordIndexMap         coordinate ↔ row bijection for one stride (serial)
//! ConcurrentCoordMap    fixed-capacity CAS table for parallel insertion
//! ParameterKey          fingerprint tuple naming one kernel map
//! ```

mod concurrent;
mod coord;
mod hash;
mod index_map;

pub use concurrent::ConcurrentCoordMap;
pub use coord::{Coord, CoordVec};
pub use hash::{
    FingerprintBuildHasher, FingerprintHasher, ParameterKey, derive_key, fingerprint,
    fingerprint_words, global_key, origin_stride, out_pixel_dist, validate_positive_vec,
};
pub use index_map::{CoordIndexMap, DuplicatePolicy};
