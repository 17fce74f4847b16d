//! Status-returning entry points
//!
//! A thin boundary over [`Metadata`] for callers that cannot consume
//! `Result`: every function takes an explicit [`Handle`], returns `0` on
//! success and a negative [`Error::status`] code on failure, and logs the
//! failure with `tracing::error!`.
//!
//! The handle is created on the first call, with the dimension given by the
//! length of that call's stride argument. Instantiate the functions with
//! [`CpuRuntime`](crate::runtime::cpu::CpuRuntime) for the host-serial
//! variant or `ParallelRuntime` for the device-parallel one.
//!
//! # Example
//!
//! ```ignore
//! let mut handle: Handle<CpuRuntime> = None;
//! assert_eq!(api::initialize_coords(&mut handle, &coords, &[1, 1]), 0);
//! let mut rows = 0;
//! assert_eq!(api::get_num_coords(&mut handle, &[1, 1], &mut rows), 0);
//! ```

use crate::coords::DuplicatePolicy;
use crate::dtype::Element;
use crate::error::{Error, Result};
use crate::kernel::Region;
use crate::metadata::Metadata;
use crate::ops::{BroadcastOp, ConvChannels, ConvParams, GlobalOps, SparseConvOps, SparsePoolingOps};
use crate::runtime::Runtime;
use tracing::error;

/// Caller-owned, lazily created metadata
pub type Handle<R> = Option<Metadata<R>>;

/// Runtime whose client implements every sparse operation
pub trait SparseRuntime: Runtime<Client: SparseConvOps + SparsePoolingOps + GlobalOps> {}

impl<R> SparseRuntime for R
where
    R: Runtime,
    R::Client: SparseConvOps + SparsePoolingOps + GlobalOps,
{
}

/// Kernel geometry as passed across the boundary.
#[derive(Debug, Clone, Copy)]
pub struct KernelArgs<'a> {
    /// Stride of the input coordinate set
    pub pixel_dist: &'a [i32],
    /// Layer stride
    pub stride: &'a [i32],
    /// Kernel extent per axis
    pub kernel_size: &'a [i32],
    /// Kernel dilation per axis
    pub dilation: &'a [i32],
    /// `0` hypercube, `1` hypercross, `2` custom
    pub region_type: i32,
    /// Custom offsets, row-major `[n_offset × D]`
    pub offsets: &'a [i32],
    /// Declared number of custom offsets
    pub n_offset: usize,
}

impl<'a> KernelArgs<'a> {
    /// Hypercube geometry
    pub fn new(
        pixel_dist: &'a [i32],
        stride: &'a [i32],
        kernel_size: &'a [i32],
        dilation: &'a [i32],
    ) -> Self {
        Self {
            pixel_dist,
            stride,
            kernel_size,
            dilation,
            region_type: 0,
            offsets: &[],
            n_offset: 0,
        }
    }

    /// Replace the region description
    pub fn with_region(mut self, region_type: i32, offsets: &'a [i32], n_offset: usize) -> Self {
        self.region_type = region_type;
        self.offsets = offsets;
        self.n_offset = n_offset;
        self
    }

    fn params(&self) -> Result<ConvParams> {
        let region = Region::from_raw(
            self.region_type,
            self.offsets,
            self.n_offset,
            self.pixel_dist.len(),
        )?;
        Ok(ConvParams::new(self.pixel_dist, self.stride, self.kernel_size, self.dilation).with_region(region))
    }
}

fn metadata<R: Runtime>(handle: &mut Handle<R>, dim: usize) -> Result<&mut Metadata<R>> {
    let meta = match handle.take() {
        Some(meta) => meta,
        None => Metadata::new(dim)?,
    };
    let meta = handle.insert(meta);
    if meta.dim() != dim {
        return Err(Error::DimensionMismatch {
            expected: meta.dim(),
            got: dim,
        });
    }
    Ok(meta)
}

fn status(op: &'static str, result: Result<()>) -> i64 {
    match result {
        Ok(()) => 0,
        Err(err) => {
            let code = err.status();
            error!(op, status = code, %err, "entry point failed");
            code
        }
    }
}

fn usize_arg(value: i32, arg: &'static str) -> Result<usize> {
    usize::try_from(value).map_err(|_| Error::invalid_argument(arg, format!("must be >= 0, got {value}")))
}

// ============================================================================
// Coordinates
// ============================================================================

/// Register the base coordinate set; repeated coordinates are an error.
pub fn initialize_coords<R: Runtime>(handle: &mut Handle<R>, coords: &[i32], pixel_dist: &[i32]) -> i64 {
    status("initialize_coords", (|| {
        metadata(handle, pixel_dist.len())?
            .initialize_coords(coords, pixel_dist, DuplicatePolicy::Reject)
            .map(|_| ())
    })())
}

/// Register the base coordinate set; repeated coordinates keep their first row.
pub fn initialize_coords_with_duplicates<R: Runtime>(
    handle: &mut Handle<R>,
    coords: &[i32],
    pixel_dist: &[i32],
) -> i64 {
    status("initialize_coords_with_duplicates", (|| {
        metadata(handle, pixel_dist.len())?
            .initialize_coords(coords, pixel_dist, DuplicatePolicy::KeepFirst)
            .map(|_| ())
    })())
}

/// Derive or check the output set of a (transposed) convolution.
pub fn initialize_out_coords<R: Runtime>(
    handle: &mut Handle<R>,
    pixel_dist: &[i32],
    stride: &[i32],
    is_transpose: bool,
) -> i64 {
    status("initialize_out_coords", (|| {
        metadata(handle, pixel_dist.len())?
            .initialize_out_coords(pixel_dist, stride, is_transpose)
            .map(|_| ())
    })())
}

/// Register the per-batch origin set; `batch_size == 0` infers the batches.
pub fn initialize_origin_coords<R: Runtime>(handle: &mut Handle<R>, pixel_dist: &[i32], batch_size: i32) -> i64 {
    status("initialize_origin_coords", (|| {
        let batch_size = usize_arg(batch_size, "batch_size")?;
        metadata(handle, pixel_dist.len())?
            .initialize_origin_coords(pixel_dist, batch_size)
            .map(|_| ())
    })())
}

/// Row of every coordinate in `coords`, `-1` where absent.
pub fn get_index_map<R: Runtime>(
    handle: &mut Handle<R>,
    coords: &[i32],
    index_map: &mut [i64],
    pixel_dist: &[i32],
) -> i64 {
    status("get_index_map", (|| {
        metadata(handle, pixel_dist.len())?.index_map(coords, pixel_dist, index_map)
    })())
}

/// Row count of the set at `pixel_dist`.
pub fn get_num_coords<R: Runtime>(handle: &mut Handle<R>, pixel_dist: &[i32], nrows: &mut i64) -> i64 {
    status("get_num_coords", (|| {
        *nrows = metadata(handle, pixel_dist.len())?.num_coords(pixel_dist)? as i64;
        Ok(())
    })())
}

/// Copy the set at `pixel_dist` into `coords`.
pub fn get_coords<R: Runtime>(handle: &mut Handle<R>, coords: &mut [i32], pixel_dist: &[i32]) -> i64 {
    status("get_coords", (|| {
        metadata(handle, pixel_dist.len())?.write_coords(pixel_dist, coords)
    })())
}

/// Map every row at `pixel_dist_src` to its floored row at `pixel_dist_dst`.
pub fn get_permutation<R: Runtime>(
    handle: &mut Handle<R>,
    permutation: &mut [i64],
    pixel_dist_src: &[i32],
    pixel_dist_dst: &[i32],
) -> i64 {
    status("get_permutation", (|| {
        metadata(handle, pixel_dist_src.len())?.permutation(pixel_dist_src, pixel_dist_dst, permutation)
    })())
}

/// Drop every coordinate set and map; a missing handle is left missing.
pub fn clear<R: Runtime>(handle: &mut Handle<R>) -> i64 {
    if let Some(meta) = handle.as_mut() {
        meta.clear();
    }
    0
}

// ============================================================================
// Convolution
// ============================================================================

#[allow(clippy::too_many_arguments)]
fn conv_fw_impl<R: SparseRuntime, T: Element>(
    op: &'static str,
    is_transpose: bool,
    handle: &mut Handle<R>,
    in_feat: &[T],
    in_nchannel: usize,
    out_feat: &mut [T],
    out_nchannel: usize,
    kernel: &[T],
    args: &KernelArgs<'_>,
) -> i64 {
    status(op, (|| {
        let params = args.params()?;
        metadata(handle, args.pixel_dist.len())?.conv_fw(
            &params,
            is_transpose,
            in_feat,
            kernel,
            out_feat,
            ConvChannels::new(in_nchannel, out_nchannel),
        )
    })())
}

#[allow(clippy::too_many_arguments)]
fn conv_bw_impl<R: SparseRuntime, T: Element>(
    op: &'static str,
    is_transpose: bool,
    handle: &mut Handle<R>,
    in_feat: &[T],
    grad_in_feat: &mut [T],
    in_nchannel: usize,
    grad_out_feat: &[T],
    out_nchannel: usize,
    kernel: &[T],
    grad_kernel: &mut [T],
    args: &KernelArgs<'_>,
) -> i64 {
    status(op, (|| {
        let params = args.params()?;
        metadata(handle, args.pixel_dist.len())?.conv_bw(
            &params,
            is_transpose,
            in_feat,
            grad_out_feat,
            kernel,
            grad_in_feat,
            grad_kernel,
            ConvChannels::new(in_nchannel, out_nchannel),
        )
    })())
}

/// Sparse convolution forward; derives the output set if needed.
pub fn conv_fw<R: SparseRuntime, T: Element>(
    handle: &mut Handle<R>,
    in_feat: &[T],
    in_nchannel: usize,
    out_feat: &mut [T],
    out_nchannel: usize,
    kernel: &[T],
    args: &KernelArgs<'_>,
) -> i64 {
    conv_fw_impl("conv_fw", false, handle, in_feat, in_nchannel, out_feat, out_nchannel, kernel, args)
}

/// Transposed sparse convolution forward; the finer output set must exist.
pub fn conv_tr_fw<R: SparseRuntime, T: Element>(
    handle: &mut Handle<R>,
    in_feat: &[T],
    in_nchannel: usize,
    out_feat: &mut [T],
    out_nchannel: usize,
    kernel: &[T],
    args: &KernelArgs<'_>,
) -> i64 {
    conv_fw_impl("conv_tr_fw", true, handle, in_feat, in_nchannel, out_feat, out_nchannel, kernel, args)
}

/// Sparse convolution backward.
#[allow(clippy::too_many_arguments)]
pub fn conv_bw<R: SparseRuntime, T: Element>(
    handle: &mut Handle<R>,
    in_feat: &[T],
    grad_in_feat: &mut [T],
    in_nchannel: usize,
    grad_out_feat: &[T],
    out_nchannel: usize,
    kernel: &[T],
    grad_kernel: &mut [T],
    args: &KernelArgs<'_>,
) -> i64 {
    conv_bw_impl(
        "conv_bw",
        false,
        handle,
        in_feat,
        grad_in_feat,
        in_nchannel,
        grad_out_feat,
        out_nchannel,
        kernel,
        grad_kernel,
        args,
    )
}

/// Transposed sparse convolution backward.
#[allow(clippy::too_many_arguments)]
pub fn conv_tr_bw<R: SparseRuntime, T: Element>(
    handle: &mut Handle<R>,
    in_feat: &[T],
    grad_in_feat: &mut [T],
    in_nchannel: usize,
    grad_out_feat: &[T],
    out_nchannel: usize,
    kernel: &[T],
    grad_kernel: &mut [T],
    args: &KernelArgs<'_>,
) -> i64 {
    conv_bw_impl(
        "conv_tr_bw",
        true,
        handle,
        in_feat,
        grad_in_feat,
        in_nchannel,
        grad_out_feat,
        out_nchannel,
        kernel,
        grad_kernel,
        args,
    )
}

// ============================================================================
// Pooling
// ============================================================================

/// Max pooling forward; `mask` receives the winning input rows.
pub fn max_pooling_fw<R: SparseRuntime, T: Element>(
    handle: &mut Handle<R>,
    in_feat: &[T],
    out_feat: &mut [T],
    mask: &mut [i64],
    nchannel: usize,
    args: &KernelArgs<'_>,
) -> i64 {
    status("max_pooling_fw", (|| {
        let params = args.params()?;
        metadata(handle, args.pixel_dist.len())?.max_pool_fw(&params, in_feat, out_feat, mask, nchannel)
    })())
}

/// Max pooling backward.
pub fn max_pooling_bw<R: SparseRuntime, T: Element>(
    handle: &mut Handle<R>,
    grad_in_feat: &mut [T],
    grad_out_feat: &[T],
    mask: &[i64],
    nchannel: usize,
    args: &KernelArgs<'_>,
) -> i64 {
    status("max_pooling_bw", (|| {
        let params = args.params()?;
        metadata(handle, args.pixel_dist.len())?.max_pool_bw(
            &params,
            grad_out_feat,
            mask,
            grad_in_feat,
            nchannel,
        )
    })())
}

/// Average pooling over present neighbours.
pub fn nonzero_avg_pooling_fw<R: SparseRuntime, T: Element>(
    handle: &mut Handle<R>,
    in_feat: &[T],
    out_feat: &mut [T],
    num_nonzero: &mut [T],
    nchannel: usize,
    args: &KernelArgs<'_>,
) -> i64 {
    status("nonzero_avg_pooling_fw", (|| {
        let params = args.params()?;
        metadata(handle, args.pixel_dist.len())?.avg_pool_fw(
            &params,
            in_feat,
            out_feat,
            num_nonzero,
            nchannel,
        )
    })())
}

/// Average pooling backward.
pub fn nonzero_avg_pooling_bw<R: SparseRuntime, T: Element>(
    handle: &mut Handle<R>,
    grad_in_feat: &mut [T],
    grad_out_feat: &[T],
    num_nonzero: &[T],
    nchannel: usize,
    args: &KernelArgs<'_>,
) -> i64 {
    status("nonzero_avg_pooling_bw", (|| {
        let params = args.params()?;
        metadata(handle, args.pixel_dist.len())?.avg_pool_bw(
            &params,
            grad_out_feat,
            num_nonzero,
            grad_in_feat,
            nchannel,
        )
    })())
}

/// Per-batch mean of the set at `pixel_dist`.
pub fn global_avg_pooling_fw<R: SparseRuntime, T: Element>(
    handle: &mut Handle<R>,
    in_feat: &[T],
    out_feat: &mut [T],
    nchannel: usize,
    num_nonzero: &mut [T],
    pixel_dist: &[i32],
) -> i64 {
    status("global_avg_pooling_fw", (|| {
        metadata(handle, pixel_dist.len())?.global_avg_pool_fw(
            pixel_dist,
            in_feat,
            out_feat,
            num_nonzero,
            nchannel,
        )
    })())
}

/// Global average pooling backward.
pub fn global_avg_pooling_bw<R: SparseRuntime, T: Element>(
    handle: &mut Handle<R>,
    grad_in_feat: &mut [T],
    grad_out_feat: &[T],
    nchannel: usize,
    num_nonzero: &[T],
    pixel_dist: &[i32],
) -> i64 {
    status("global_avg_pooling_bw", (|| {
        metadata(handle, pixel_dist.len())?.global_avg_pool_bw(
            pixel_dist,
            grad_out_feat,
            num_nonzero,
            grad_in_feat,
            nchannel,
        )
    })())
}

// ============================================================================
// Broadcast
// ============================================================================

/// Combine every row with its batch's global feature; `op` 0 add, 1 multiply.
pub fn global_broadcast_fw<R: SparseRuntime, T: Element>(
    handle: &mut Handle<R>,
    in_feat: &[T],
    in_feat_global: &[T],
    out_feat: &mut [T],
    nchannel: usize,
    pixel_dist: &[i32],
    op: i32,
) -> i64 {
    status("global_broadcast_fw", (|| {
        let op = BroadcastOp::from_raw(op)?;
        metadata(handle, pixel_dist.len())?.global_broadcast_fw(
            pixel_dist,
            in_feat,
            in_feat_global,
            out_feat,
            nchannel,
            op,
        )
    })())
}

/// Global broadcast backward.
#[allow(clippy::too_many_arguments)]
pub fn global_broadcast_bw<R: SparseRuntime, T: Element>(
    handle: &mut Handle<R>,
    in_feat: &[T],
    grad_in_feat: &mut [T],
    in_feat_global: &[T],
    grad_in_feat_global: &mut [T],
    grad_out_feat: &[T],
    nchannel: usize,
    pixel_dist: &[i32],
    op: i32,
) -> i64 {
    status("global_broadcast_bw", (|| {
        let op = BroadcastOp::from_raw(op)?;
        metadata(handle, pixel_dist.len())?.global_broadcast_bw(
            pixel_dist,
            in_feat,
            in_feat_global,
            grad_out_feat,
            grad_in_feat,
            grad_in_feat_global,
            nchannel,
            op,
        )
    })())
}
