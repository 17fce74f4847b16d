//! Kernel footprints and kernel maps
//!
//! Given two coordinate sets and a kernel description, the builders here
//! compute which input rows feed which output rows through which kernel
//! offset. This is the neighbour search every sparse convolution, pooling
//! and broadcast operation depends on.

mod in_out;
mod region;

pub use in_out::{InOutMap, KernelPairs, build_forward, build_global, build_transpose};
pub(crate) use in_out::{origin_row, probe_neighbors};
pub use region::{KernelRegion, Region};
