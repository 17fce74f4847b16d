//! CPU implementation of sparse convolution, pooling and broadcast.

use crate::dtype::Element;
use crate::error::Result;
use crate::ops::impl_generic::{
    avg_pool_bw_impl, avg_pool_fw_impl, broadcast_bw_impl, broadcast_fw_impl, max_pool_bw_impl,
    max_pool_fw_impl, sparse_conv_bw_impl, sparse_conv_fw_impl,
};
use crate::ops::{BroadcastOp, ConvChannels, GlobalOps, MapView, SparseConvOps, SparsePoolingOps};
use crate::runtime::cpu::CpuClient;

impl SparseConvOps for CpuClient {
    fn sparse_conv_fw<T: Element>(
        &self,
        map: MapView<'_>,
        in_feat: &[T],
        kernel: &[T],
        out_feat: &mut [T],
        channels: ConvChannels,
    ) -> Result<()> {
        sparse_conv_fw_impl(map, in_feat, kernel, out_feat, channels)
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
        sparse_conv_bw_impl(map, in_feat, grad_out, kernel, grad_in, grad_kernel, channels)
    }
}

impl SparsePoolingOps for CpuClient {
    fn max_pool_fw<T: Element>(
        &self,
        map: MapView<'_>,
        in_feat: &[T],
        out_feat: &mut [T],
        mask: &mut [i64],
        nchannel: usize,
    ) -> Result<()> {
        max_pool_fw_impl(map, in_feat, out_feat, mask, nchannel)
    }

    fn max_pool_bw<T: Element>(
        &self,
        map: MapView<'_>,
        grad_out: &[T],
        mask: &[i64],
        grad_in: &mut [T],
        nchannel: usize,
    ) -> Result<()> {
        max_pool_bw_impl(map, grad_out, mask, grad_in, nchannel)
    }

    fn avg_pool_fw<T: Element>(
        &self,
        map: MapView<'_>,
        in_feat: &[T],
        out_feat: &mut [T],
        num_nonzero: &mut [T],
        nchannel: usize,
    ) -> Result<()> {
        avg_pool_fw_impl(map, in_feat, out_feat, num_nonzero, nchannel)
    }

    fn avg_pool_bw<T: Element>(
        &self,
        map: MapView<'_>,
        grad_out: &[T],
        num_nonzero: &[T],
        grad_in: &mut [T],
        nchannel: usize,
    ) -> Result<()> {
        avg_pool_bw_impl(map, grad_out, num_nonzero, grad_in, nchannel)
    }
}

impl GlobalOps for CpuClient {
    fn broadcast_fw<T: Element>(
        &self,
        map: MapView<'_>,
        in_feat: &[T],
        global_feat: &[T],
        out_feat: &mut [T],
        nchannel: usize,
        op: BroadcastOp,
    ) -> Result<()> {
        broadcast_fw_impl(map, in_feat, global_feat, out_feat, nchannel, op)
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
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::kernel::InOutMap;
    use crate::runtime::cpu::CpuDevice;

    #[test]
    fn test_conv_fw_rejects_short_output_untouched() {
        let client = CpuClient::new(CpuDevice::new());
        let mut map = InOutMap::with_volume(1);
        map.push(0, 0, 0);
        let view = MapView::new(&map, 1, 2);
        let mut out = [7.0f32; 1];
        let err = client
            .sparse_conv_fw(view, &[1.0], &[2.0], &mut out, ConvChannels::new(1, 1))
            .unwrap_err();
        assert!(matches!(err, Error::ShapeMismatch { .. }));
        assert_eq!(out, [7.0]);
    }

    #[test]
    fn test_max_pool_bw_rejects_mask_out_of_range() {
        let client = CpuClient::new(CpuDevice::new());
        let map = InOutMap::with_volume(1);
        let view = MapView::new(&map, 1, 1);
        let mut grad_in = [0.0f64; 1];
        assert!(
            client
                .max_pool_bw(view, &[1.0], &[3], &mut grad_in, 1)
                .is_err()
        );
    }
}
