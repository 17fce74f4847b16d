//! Trait for building coordinate sets and kernel maps

use crate::coords::{CoordIndexMap, DuplicatePolicy};
use crate::error::Result;
use crate::kernel::{InOutMap, KernelRegion};

/// Backend-specific construction of coordinate sets and kernel maps.
///
/// Every implementation must produce exactly the same rows and pairs as the
/// serial reference; only the scheduling differs.
pub trait MapBuilder {
    /// Index a row-major `[n × (D + 1)]` coordinate buffer at `stride`.
    fn index_coords(
        &self,
        coords: &[i32],
        stride: &[i32],
        policy: DuplicatePolicy,
    ) -> Result<CoordIndexMap>;

    /// Derive the coordinate set at the coarser `out_stride`.
    fn stride_coords(&self, input: &CoordIndexMap, out_stride: &[i32]) -> Result<CoordIndexMap>;

    /// Pair rows of `input` and `output` for every offset of `region`.
    ///
    /// Forward maps iterate the output set; transposed maps iterate the
    /// (coarse) input set and probe the finer output set.
    fn kernel_map(
        &self,
        input: &CoordIndexMap,
        output: &CoordIndexMap,
        region: &KernelRegion,
        is_transpose: bool,
    ) -> InOutMap;

    /// Pair every row of `input` with its batch's row in `origin`.
    fn global_map(&self, input: &CoordIndexMap, origin: &CoordIndexMap) -> Result<InOutMap>;
}
