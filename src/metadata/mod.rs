//! Per-handle cache of coordinate sets and kernel maps
//!
//! A [`Metadata`] owns everything one network evaluation discovers:
//!
//! ```text
//! Metadata<R>
//!   ├── coords       stride fingerprint → CoordIndexMap
//!   ├── kernel_maps  ParameterKey       → InOutMap
//!   └── context      R::Client, created on first use
//! ```
//!
//! Coordinate sets are registered in dependency order (base set, then
//! strided/output sets, then kernel maps). Forward operations build what
//! they are missing; backward operations only read what a forward pass
//! already built.

mod cache;
mod ops;
mod stats;

pub use cache::Metadata;
pub use stats::BuildStats;
