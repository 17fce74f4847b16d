//! Sparse operations over cached maps
//!
//! Forward entry points build whatever map they need; backward entry points
//! require the map of the matching forward pass.

use super::cache::Metadata;
use crate::coords::{ParameterKey, origin_stride};
use crate::dtype::Element;
use crate::error::Result;
use crate::ops::{
    BroadcastOp, ConvChannels, ConvParams, GlobalOps, MapView, SparseConvOps, SparsePoolingOps,
};
use crate::runtime::Runtime;

impl<R: Runtime> Metadata<R>
where
    R::Client: SparseConvOps + SparsePoolingOps + GlobalOps,
{
    fn run<F>(&self, key: &ParameterKey, in_stride: &[i32], out_stride: &[i32], op: F) -> Result<()>
    where
        F: FnOnce(&R::Client, MapView<'_>) -> Result<()>,
    {
        let view = self.view(key, in_stride, out_stride)?;
        op(self.context()?, view)
    }

    fn conv_map(&mut self, params: &ConvParams, is_transpose: bool, build: bool) -> Result<(ParameterKey, Vec<i32>)> {
        let key = if build {
            self.ensure_kernel_map(params, is_transpose)?
        } else {
            self.existing_kernel_map(params, is_transpose)?
        };
        Ok((key, params.out_pixel_dist(is_transpose)?.to_vec()))
    }

    fn global_map(&mut self, pixel_dist: &[i32], build: bool) -> Result<(ParameterKey, Vec<i32>)> {
        let key = if build {
            self.ensure_global_map(pixel_dist)?
        } else {
            self.existing_global_map(pixel_dist)?
        };
        Ok((key, origin_stride(self.dim()).to_vec()))
    }

    // ========================================================================
    // Convolution
    // ========================================================================

    /// Sparse convolution forward; transposed when `is_transpose`.
    ///
    /// `out_feat` must hold `out_rows × c_out` values, where `out_rows` is
    /// the row count of the output set (see
    /// [`initialize_out_coords`](Self::initialize_out_coords)).
    pub fn conv_fw<T: Element>(
        &mut self,
        params: &ConvParams,
        is_transpose: bool,
        in_feat: &[T],
        kernel: &[T],
        out_feat: &mut [T],
        channels: ConvChannels,
    ) -> Result<()> {
        let (key, out_stride) = self.conv_map(params, is_transpose, true)?;
        self.run(&key, &params.pixel_dist, &out_stride, |client, map| {
            client.sparse_conv_fw(map, in_feat, kernel, out_feat, channels)
        })
    }

    /// Sparse convolution backward over the forward pass's map.
    #[allow(clippy::too_many_arguments)]
    pub fn conv_bw<T: Element>(
        &mut self,
        params: &ConvParams,
        is_transpose: bool,
        in_feat: &[T],
        grad_out: &[T],
        kernel: &[T],
        grad_in: &mut [T],
        grad_kernel: &mut [T],
        channels: ConvChannels,
    ) -> Result<()> {
        let (key, out_stride) = self.conv_map(params, is_transpose, false)?;
        self.run(&key, &params.pixel_dist, &out_stride, |client, map| {
            client.sparse_conv_bw(map, in_feat, grad_out, kernel, grad_in, grad_kernel, channels)
        })
    }

    // ========================================================================
    // Pooling
    // ========================================================================

    /// Max pooling forward; `mask` receives the winning input rows.
    pub fn max_pool_fw<T: Element>(
        &mut self,
        params: &ConvParams,
        in_feat: &[T],
        out_feat: &mut [T],
        mask: &mut [i64],
        nchannel: usize,
    ) -> Result<()> {
        let (key, out_stride) = self.conv_map(params, false, true)?;
        self.run(&key, &params.pixel_dist, &out_stride, |client, map| {
            client.max_pool_fw(map, in_feat, out_feat, mask, nchannel)
        })
    }

    /// Max pooling backward.
    pub fn max_pool_bw<T: Element>(
        &mut self,
        params: &ConvParams,
        grad_out: &[T],
        mask: &[i64],
        grad_in: &mut [T],
        nchannel: usize,
    ) -> Result<()> {
        let (key, out_stride) = self.conv_map(params, false, false)?;
        self.run(&key, &params.pixel_dist, &out_stride, |client, map| {
            client.max_pool_bw(map, grad_out, mask, grad_in, nchannel)
        })
    }

    /// Average pooling forward over the neighbours that exist.
    pub fn avg_pool_fw<T: Element>(
        &mut self,
        params: &ConvParams,
        in_feat: &[T],
        out_feat: &mut [T],
        num_nonzero: &mut [T],
        nchannel: usize,
    ) -> Result<()> {
        let (key, out_stride) = self.conv_map(params, false, true)?;
        self.run(&key, &params.pixel_dist, &out_stride, |client, map| {
            client.avg_pool_fw(map, in_feat, out_feat, num_nonzero, nchannel)
        })
    }

    /// Average pooling backward.
    pub fn avg_pool_bw<T: Element>(
        &mut self,
        params: &ConvParams,
        grad_out: &[T],
        num_nonzero: &[T],
        grad_in: &mut [T],
        nchannel: usize,
    ) -> Result<()> {
        let (key, out_stride) = self.conv_map(params, false, false)?;
        self.run(&key, &params.pixel_dist, &out_stride, |client, map| {
            client.avg_pool_bw(map, grad_out, num_nonzero, grad_in, nchannel)
        })
    }

    // ========================================================================
    // Global pooling and broadcast
    // ========================================================================

    /// Per-batch mean of every row of the set at `pixel_dist`.
    ///
    /// `out_feat` has one row per origin row (batch).
    pub fn global_avg_pool_fw<T: Element>(
        &mut self,
        pixel_dist: &[i32],
        in_feat: &[T],
        out_feat: &mut [T],
        num_nonzero: &mut [T],
        nchannel: usize,
    ) -> Result<()> {
        let (key, out_stride) = self.global_map(pixel_dist, true)?;
        self.run(&key, pixel_dist, &out_stride, |client, map| {
            client.avg_pool_fw(map, in_feat, out_feat, num_nonzero, nchannel)
        })
    }

    /// Global average pooling backward.
    pub fn global_avg_pool_bw<T: Element>(
        &mut self,
        pixel_dist: &[i32],
        grad_out: &[T],
        num_nonzero: &[T],
        grad_in: &mut [T],
        nchannel: usize,
    ) -> Result<()> {
        let (key, out_stride) = self.global_map(pixel_dist, false)?;
        self.run(&key, pixel_dist, &out_stride, |client, map| {
            client.avg_pool_bw(map, grad_out, num_nonzero, grad_in, nchannel)
        })
    }

    /// Combine every row with its batch's global feature.
    pub fn global_broadcast_fw<T: Element>(
        &mut self,
        pixel_dist: &[i32],
        in_feat: &[T],
        global_feat: &[T],
        out_feat: &mut [T],
        nchannel: usize,
        op: BroadcastOp,
    ) -> Result<()> {
        let (key, out_stride) = self.global_map(pixel_dist, true)?;
        self.run(&key, pixel_dist, &out_stride, |client, map| {
            client.broadcast_fw(map, in_feat, global_feat, out_feat, nchannel, op)
        })
    }

    /// Global broadcast backward.
    #[allow(clippy::too_many_arguments)]
    pub fn global_broadcast_bw<T: Element>(
        &mut self,
        pixel_dist: &[i32],
        in_feat: &[T],
        global_feat: &[T],
        grad_out: &[T],
        grad_in: &mut [T],
        grad_global: &mut [T],
        nchannel: usize,
        op: BroadcastOp,
    ) -> Result<()> {
        let (key, out_stride) = self.global_map(pixel_dist, false)?;
        self.run(&key, pixel_dist, &out_stride, |client, map| {
            client.broadcast_bw(
                map,
                in_feat,
                global_feat,
                grad_out,
                grad_in,
                grad_global,
                nchannel,
                op,
            )
        })
    }
}

#[cfg(test)]
mod tests {
    use crate::coords::DuplicatePolicy;
    use crate::error::Error;
    use crate::metadata::Metadata;
    use crate::ops::{ConvChannels, ConvParams};
    use crate::runtime::cpu::CpuRuntime;

    #[test]
    fn test_conv_fw_identity_kernel() {
        let mut meta = Metadata::<CpuRuntime>::new(1).unwrap();
        meta.initialize_coords(&[0, 0, 1, 0, 2, 0], &[1], DuplicatePolicy::Reject)
            .unwrap();
        let params = ConvParams::new(&[1], &[1], &[3], &[1]);
        // only the centre tap is non-zero
        let kernel = [0.0f32, 2.0, 0.0];
        let mut out = [0.0f32; 3];
        meta.conv_fw(&params, false, &[1.0, 2.0, 3.0], &kernel, &mut out, ConvChannels::new(1, 1))
            .unwrap();
        assert_eq!(out, [2.0, 4.0, 6.0]);
    }

    #[test]
    fn test_bw_before_fw_fails_without_mutation() {
        let mut meta = Metadata::<CpuRuntime>::new(1).unwrap();
        meta.initialize_coords(&[0, 0], &[1], DuplicatePolicy::Reject)
            .unwrap();
        let params = ConvParams::new(&[1], &[2], &[2], &[1]);
        let mut grad_in = [0.0f64; 1];
        let mut grad_k = [0.0f64; 2];
        let err = meta
            .conv_bw(
                &params,
                false,
                &[1.0],
                &[1.0],
                &[1.0, 1.0],
                &mut grad_in,
                &mut grad_k,
                ConvChannels::new(1, 1),
            )
            .unwrap_err();
        assert_eq!(err, Error::missing_coords(&[2]));
        assert_eq!(meta.num_coord_sets(), 1);
        assert_eq!(meta.num_kernel_maps(), 0);
    }

    #[test]
    fn test_global_pool_builds_origin() {
        let mut meta = Metadata::<CpuRuntime>::new(1).unwrap();
        meta.initialize_coords(&[0, 0, 5, 1, 7, 0], &[1], DuplicatePolicy::Reject)
            .unwrap();
        let mut out = [0.0f64; 2];
        let mut counts = [0.0f64; 2];
        meta.global_avg_pool_fw(&[1], &[2.0, 10.0, 4.0], &mut out, &mut counts, 1)
            .unwrap();
        assert_eq!(out, [3.0, 10.0]);
        assert_eq!(counts, [2.0, 1.0]);
        assert_eq!(meta.stats().coord_sets_derived, 1);
    }
}
