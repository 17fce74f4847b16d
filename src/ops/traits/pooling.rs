//! Sparse pooling operations.

use crate::dtype::Element;
use crate::error::Result;
use crate::ops::MapView;

/// Max and average pooling over a kernel map.
///
/// Feature buffers are `[rows × nchannel]`. Global average pooling is
/// average pooling over the global reduction map.
pub trait SparsePoolingOps {
    /// Max over each output's neighbours; `mask` (`[out_rows × nchannel]`)
    /// records the winning input row or `-1`.
    fn max_pool_fw<T: Element>(
        &self,
        map: MapView<'_>,
        in_feat: &[T],
        out_feat: &mut [T],
        mask: &mut [i64],
        nchannel: usize,
    ) -> Result<()>;

    /// Route output gradients back through `mask`.
    fn max_pool_bw<T: Element>(
        &self,
        map: MapView<'_>,
        grad_out: &[T],
        mask: &[i64],
        grad_in: &mut [T],
        nchannel: usize,
    ) -> Result<()>;

    /// Mean over the neighbours that exist; `num_nonzero` (`[out_rows]`)
    /// receives the neighbour counts.
    fn avg_pool_fw<T: Element>(
        &self,
        map: MapView<'_>,
        in_feat: &[T],
        out_feat: &mut [T],
        num_nonzero: &mut [T],
        nchannel: usize,
    ) -> Result<()>;

    /// Spread output gradients evenly over the contributing inputs.
    fn avg_pool_bw<T: Element>(
        &self,
        map: MapView<'_>,
        grad_out: &[T],
        num_nonzero: &[T],
        grad_in: &mut [T],
        nchannel: usize,
    ) -> Result<()>;
}
