//! Sparse convolution operations.

use crate::dtype::Element;
use crate::error::Result;
use crate::ops::{ConvChannels, MapView};

/// Sparse convolution over a kernel map.
///
/// # Memory Layout
///
/// - **Features**: `[rows × channels]`, row `r` belongs to coordinate row `r`
/// - **Kernel**: `[volume × c_in × c_out]`, slice `k` is applied to the pairs
///   of offset `k`
///
/// Transposed convolution uses the same operations with a transposed map.
pub trait SparseConvOps {
    /// `out[o] = Σ in[i] · W[k]` over all pairs `(k, i, o)` of `map`.
    ///
    /// # Errors
    ///
    /// Returns `Error::ShapeMismatch` if any buffer length disagrees with
    /// the map's row counts, the kernel volume, or the channel counts.
    fn sparse_conv_fw<T: Element>(
        &self,
        map: MapView<'_>,
        in_feat: &[T],
        kernel: &[T],
        out_feat: &mut [T],
        channels: ConvChannels,
    ) -> Result<()>;

    /// Gradients with respect to the input features and the kernel.
    #[allow(clippy::too_many_arguments)]
    fn sparse_conv_bw<T: Element>(
        &self,
        map: MapView<'_>,
        in_feat: &[T],
        grad_out: &[T],
        kernel: &[T],
        grad_in: &mut [T],
        grad_kernel: &mut [T],
        channels: ConvChannels,
    ) -> Result<()>;
}
