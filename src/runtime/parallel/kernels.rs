//! Parallel convolution kernels
//!
//! Kernel offsets are distributed over the pool. Within one offset every
//! output row appears at most once, but different offsets hit the same rows,
//! so each task accumulates into a private buffer and the buffers are summed.
//! Summation order differs from the serial kernels; results agree up to
//! floating-point rounding.

use crate::dtype::Element;
use crate::kernel::InOutMap;
use crate::runtime::cpu::kernels::{Scratch, conv_bw_offset, conv_fw_offset};
use rayon::prelude::*;

fn add_assign<T: Element>(mut acc: Vec<T>, other: Vec<T>) -> Vec<T> {
    for (a, b) in acc.iter_mut().zip(other) {
        *a = *a + b;
    }
    acc
}

/// Parallel counterpart of `conv_fw_kernel`.
pub fn par_conv_fw_kernel<T: Element>(
    map: &InOutMap,
    in_feat: &[T],
    c_in: usize,
    kernel: &[T],
    c_out: usize,
    out_feat: &mut [T],
) {
    let len = out_feat.len();
    let sum = map
        .kernels()
        .par_iter()
        .zip(kernel.par_chunks_exact(c_in * c_out))
        .fold(
            || (vec![T::zero(); len], Scratch::default()),
            |(mut acc, mut scratch), (pairs, w)| {
                conv_fw_offset(pairs, in_feat, c_in, w, c_out, &mut acc, &mut scratch);
                (acc, scratch)
            },
        )
        .map(|(acc, _)| acc)
        .reduce(|| vec![T::zero(); len], add_assign);
    out_feat.copy_from_slice(&sum);
}

/// Parallel counterpart of `conv_bw_kernel`.
///
/// Weight-gradient slices are disjoint per offset and written in place; input
/// gradients are reduced.
#[allow(clippy::too_many_arguments)]
pub fn par_conv_bw_kernel<T: Element>(
    map: &InOutMap,
    in_feat: &[T],
    grad_out: &[T],
    c_in: usize,
    kernel: &[T],
    c_out: usize,
    grad_in: &mut [T],
    grad_kernel: &mut [T],
) {
    let len = grad_in.len();
    let slice = c_in * c_out;
    let sum = map
        .kernels()
        .par_iter()
        .zip(kernel.par_chunks_exact(slice))
        .zip(grad_kernel.par_chunks_exact_mut(slice))
        .fold(
            || (vec![T::zero(); len], Scratch::default()),
            |(mut acc, mut scratch), ((pairs, w), grad_w)| {
                conv_bw_offset(
                    pairs, in_feat, grad_out, c_in, w, c_out, &mut acc, grad_w, &mut scratch,
                );
                (acc, scratch)
            },
        )
        .map(|(acc, _)| acc)
        .reduce(|| vec![T::zero(); len], add_assign);
    grad_in.copy_from_slice(&sum);
}
