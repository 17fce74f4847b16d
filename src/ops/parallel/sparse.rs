//! Parallel implementation of sparse convolution, pooling and broadcast.

use crate::dtype::Element;
use crate::error::Result;
use crate::ops::impl_generic::{
    avg_pool_bw_impl, avg_pool_fw_impl, broadcast_bw_impl, broadcast_fw_impl, check_conv_bw,
    check_conv_fw, max_pool_bw_impl, max_pool_fw_impl,
};
use crate::ops::{BroadcastOp, ConvChannels, GlobalOps, MapView, SparseConvOps, SparsePoolingOps};
use crate::runtime::parallel::ParallelClient;
use crate::runtime::parallel::kernels::{par_conv_bw_kernel, par_conv_fw_kernel};

impl SparseConvOps for ParallelClient {
    fn sparse_conv_fw<T: Element>(
        &self,
        map: MapView<'_>,
        in_feat: &[T],
        kernel: &[T],
        out_feat: &mut [T],
        channels: ConvChannels,
    ) -> Result<()> {
        check_conv_fw(map, in_feat.len(), kernel.len(), out_feat.len(), channels)?;
        self.install(|| {
            par_conv_fw_kernel(
                map.map,
                in_feat,
                channels.c_in,
                kernel,
                channels.c_out,
                out_feat,
            )
        });
        Ok(())
    }

    fn sparse_conv_bw<T: Element>(
        &self,
        map: MapView<'_>,
        in_feat: &[T],
        grad_out: &[T],
        kernel: &[T],
        grad_in: &mut [T],
        grad_kernel: &mut [T],
        channels: ConvChannels,
    ) -> Result<()> {
        check_conv_bw(
            map,
            in_feat.len(),
            grad_out.len(),
            kernel.len(),
            grad_in.len(),
            grad_kernel.len(),
            channels,
        )?;
        self.install(|| {
            par_conv_bw_kernel(
                map.map,
                in_feat,
                grad_out,
                channels.c_in,
                kernel,
                channels.c_out,
                grad_in,
                grad_kernel,
            )
        });
        Ok(())
    }
}

impl SparsePoolingOps for ParallelClient {
    fn max_pool_fw<T: Element>(
        &self,
        map: MapView<'_>,
        in_feat: &[T],
        out_feat: &mut [T],
        mask: &mut [i64],
        nchannel: usize,
    ) -> Result<()> {
        self.install(|| max_pool_fw_impl(map, in_feat, out_feat, mask, nchannel))
    }

    fn max_pool_bw<T: Element>(
        &self,
        map: MapView<'_>,
        grad_out: &[T],
        mask: &[i64],
        grad_in: &mut [T],
        nchannel: usize,
    ) -> Result<()> {
        self.install(|| max_pool_bw_impl(map, grad_out, mask, grad_in, nchannel))
    }

    fn avg_pool_fw<T: Element>(
        &self,
        map: MapView<'_>,
        in_feat: &[T],
        out_feat: &mut [T],
        num_nonzero: &mut [T],
        nchannel: usize,
    ) -> Result<()> {
        self.install(|| avg_pool_fw_impl(map, in_feat, out_feat, num_nonzero, nchannel))
    }

    fn avg_pool_bw<T: Element>(
        &self,
        map: MapView<'_>,
        grad_out: &[T],
        num_nonzero: &[T],
        grad_in: &mut [T],
        nchannel: usize,
    ) -> Result<()> {
        self.install(|| avg_pool_bw_impl(map, grad_out, num_nonzero, grad_in, nchannel))
    }
}

impl GlobalOps for ParallelClient {
    fn broadcast_fw<T: Element>(
        &self,
        map: MapView<'_>,
        in_feat: &[T],
        global_feat: &[T],
        out_feat: &mut [T],
        nchannel: usize,
        op: BroadcastOp,
    ) -> Result<()> {
        self.install(|| broadcast_fw_impl(map, in_feat, global_feat, out_feat, nchannel, op))
    }

    fn broadcast_bw<T: Element>(
        &self,
        map: MapView<'_>,
        in_feat: &[T],
        global_feat: &[T],
        grad_out: &[T],
        grad_in: &mut [T],
        grad_global: &mut [T],
        nchannel: usize,
        op: BroadcastOp,
    ) -> Result<()> {
        self.install(|| {
            broadcast_bw_impl(
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
