//! Sparse convolution kernels
//!
//! For every kernel offset `k` the contributing input rows are gathered into
//! a dense block, multiplied by the weight slice `W[k]` (`c_in × c_out`), and
//! the product is scatter-added into the output rows. Transposed
//! convolution runs the same kernels over a transposed map.

use super::gemm::{Transpose, gather_rows, gemm, scatter_add_rows};
use crate::dtype::Element;
use crate::kernel::{InOutMap, KernelPairs};

/// Reusable gather/product buffers for one thread
#[derive(Debug)]
pub(crate) struct Scratch<T> {
    gathered_in: Vec<T>,
    gathered_grad: Vec<T>,
    product: Vec<T>,
}

impl<T> Default for Scratch<T> {
    fn default() -> Self {
        Self {
            gathered_in: Vec::new(),
            gathered_grad: Vec::new(),
            product: Vec::new(),
        }
    }
}

/// Add the contribution of one offset's pairs to `out_feat`.
pub(crate) fn conv_fw_offset<T: Element>(
    pairs: &KernelPairs,
    in_feat: &[T],
    c_in: usize,
    w: &[T],
    c_out: usize,
    out_feat: &mut [T],
    scratch: &mut Scratch<T>,
) {
    if pairs.is_empty() {
        return;
    }
    let n = pairs.len();
    gather_rows(in_feat, &pairs.input, c_in, &mut scratch.gathered_in);
    scratch.product.resize(n * c_out, T::zero());
    gemm(
        &scratch.gathered_in,
        w,
        &mut scratch.product,
        n,
        c_out,
        c_in,
        Transpose::None,
        false,
    );
    scatter_add_rows(&scratch.product, &pairs.output, c_out, out_feat);
}

/// Add one offset's input gradient to `grad_in` and overwrite its weight
/// gradient slice `grad_w`.
#[allow(clippy::too_many_arguments)]
pub(crate) fn conv_bw_offset<T: Element>(
    pairs: &KernelPairs,
    in_feat: &[T],
    grad_out: &[T],
    c_in: usize,
    w: &[T],
    c_out: usize,
    grad_in: &mut [T],
    grad_w: &mut [T],
    scratch: &mut Scratch<T>,
) {
    grad_w.fill(T::zero());
    if pairs.is_empty() {
        return;
    }
    let n = pairs.len();
    gather_rows(grad_out, &pairs.output, c_out, &mut scratch.gathered_grad);
    gather_rows(in_feat, &pairs.input, c_in, &mut scratch.gathered_in);

    scratch.product.resize(n * c_in, T::zero());
    gemm(
        &scratch.gathered_grad,
        w,
        &mut scratch.product,
        n,
        c_in,
        c_out,
        Transpose::B,
        false,
    );
    scatter_add_rows(&scratch.product, &pairs.input, c_in, grad_in);

    gemm(
        &scratch.gathered_in,
        &scratch.gathered_grad,
        grad_w,
        c_in,
        c_out,
        n,
        Transpose::A,
        false,
    );
}

/// Forward: `out[o] += in[i] · W[k]` for every pair of every offset.
///
/// `out_feat` is zeroed first.
pub fn conv_fw_kernel<T: Element>(
    map: &InOutMap,
    in_feat: &[T],
    c_in: usize,
    kernel: &[T],
    c_out: usize,
    out_feat: &mut [T],
) {
    out_feat.fill(T::zero());
    let mut scratch = Scratch::default();
    for (pairs, w) in map.kernels().iter().zip(kernel.chunks_exact(c_in * c_out)) {
        conv_fw_offset(pairs, in_feat, c_in, w, c_out, out_feat, &mut scratch);
    }
}

/// Backward: input and weight gradients.
///
/// `grad_in[i] += grad_out[o] · W[k]ᵀ` and `grad_W[k] = Σ in[i]ᵀ · grad_out[o]`.
/// Both gradient buffers are fully overwritten.
#[allow(clippy::too_many_arguments)]
pub fn conv_bw_kernel<T: Element>(
    map: &InOutMap,
    in_feat: &[T],
    grad_out: &[T],
    c_in: usize,
    kernel: &[T],
    c_out: usize,
    grad_in: &mut [T],
    grad_kernel: &mut [T],
) {
    grad_in.fill(T::zero());
    let slice = c_in * c_out;
    let mut scratch = Scratch::default();
    for ((pairs, w), grad_w) in map
        .kernels()
        .iter()
        .zip(kernel.chunks_exact(slice))
        .zip(grad_kernel.chunks_exact_mut(slice))
    {
        conv_bw_offset(
            pairs, in_feat, grad_out, c_in, w, c_out, grad_in, grad_w, &mut scratch,
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn two_offset_map() -> InOutMap {
        // offset 0 pairs 0→0 and 1→1, offset 1 pairs 1→0
        let mut map = InOutMap::with_volume(2);
        map.push(0, 0, 0);
        map.push(0, 1, 1);
        map.push(1, 1, 0);
        map
    }

    #[test]
    fn test_conv_fw_accumulates_offsets() {
        let map = two_offset_map();
        let in_feat = [1.0f64, 2.0];
        // W[0] = 10, W[1] = 100, single channel
        let kernel = [10.0f64, 100.0];
        let mut out = [f64::NAN; 2];
        conv_fw_kernel(&map, &in_feat, 1, &kernel, 1, &mut out);
        assert_eq!(out, [1.0 * 10.0 + 2.0 * 100.0, 2.0 * 10.0]);
    }

    #[test]
    fn test_conv_fw_channels() {
        let mut map = InOutMap::with_volume(1);
        map.push(0, 0, 0);
        // in row [1, 2], W = [[1, 0, 1], [0, 1, 1]]
        let kernel = [1.0f32, 0.0, 1.0, 0.0, 1.0, 1.0];
        let mut out = [0.0f32; 3];
        conv_fw_kernel(&map, &[1.0, 2.0], 2, &kernel, 3, &mut out);
        assert_eq!(out, [1.0, 2.0, 3.0]);
    }

    #[test]
    fn test_conv_bw_matches_hand_gradient() {
        let map = two_offset_map();
        let in_feat = [1.0f64, 2.0];
        let kernel = [10.0f64, 100.0];
        let grad_out = [1.0f64, 1.0];
        let mut grad_in = [0.0f64; 2];
        let mut grad_kernel = [0.0f64; 2];
        conv_bw_kernel(
            &map,
            &in_feat,
            &grad_out,
            1,
            &kernel,
            1,
            &mut grad_in,
            &mut grad_kernel,
        );
        // grad_in[0] = W0, grad_in[1] = W0 + W1
        assert_eq!(grad_in, [10.0, 110.0]);
        // grad_W0 = in0 + in1, grad_W1 = in1
        assert_eq!(grad_kernel, [3.0, 2.0]);
    }
}
