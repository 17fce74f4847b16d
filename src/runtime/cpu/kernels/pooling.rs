//! Sparse pooling kernels

use crate::dtype::Element;
use crate::kernel::InOutMap;

/// Max pooling forward.
///
/// `mask[o * nchannel + c]` receives the input row that produced the maximum,
/// or `-1` when output row `o` has no contributing input (its value is then
/// zero). Ties keep the first pair in kernel order.
pub fn max_pool_fw_kernel<T: Element>(
    map: &InOutMap,
    in_feat: &[T],
    nchannel: usize,
    out_feat: &mut [T],
    mask: &mut [i64],
) {
    out_feat.fill(T::lowest());
    mask.fill(-1);
    for (_, i, o) in map.iter() {
        let src = &in_feat[i * nchannel..(i + 1) * nchannel];
        let dst = &mut out_feat[o * nchannel..(o + 1) * nchannel];
        let dst_mask = &mut mask[o * nchannel..(o + 1) * nchannel];
        for ((d, m), &s) in dst.iter_mut().zip(dst_mask.iter_mut()).zip(src) {
            if *m < 0 || s > *d {
                *d = s;
                *m = i as i64;
            }
        }
    }
    for (d, &m) in out_feat.iter_mut().zip(mask.iter()) {
        if m < 0 {
            *d = T::zero();
        }
    }
}

/// Max pooling backward: route each output gradient to its winning input.
///
/// `grad_in` is zeroed first.
pub fn max_pool_bw_kernel<T: Element>(
    grad_out: &[T],
    mask: &[i64],
    nchannel: usize,
    grad_in: &mut [T],
) {
    grad_in.fill(T::zero());
    for (idx, (&g, &m)) in grad_out.iter().zip(mask).enumerate() {
        if m >= 0 {
            let dst = &mut grad_in[m as usize * nchannel + idx % nchannel];
            *dst = *dst + g;
        }
    }
}

/// Average pooling forward over the inputs that are actually present.
///
/// `num_nonzero[o]` receives the number of contributing inputs; rows with
/// none stay zero.
pub fn avg_pool_fw_kernel<T: Element>(
    map: &InOutMap,
    in_feat: &[T],
    nchannel: usize,
    out_feat: &mut [T],
    num_nonzero: &mut [T],
) {
    out_feat.fill(T::zero());
    num_nonzero.fill(T::zero());
    for (_, i, o) in map.iter() {
        num_nonzero[o] = num_nonzero[o] + T::one();
        let src = &in_feat[i * nchannel..(i + 1) * nchannel];
        for (d, &s) in out_feat[o * nchannel..(o + 1) * nchannel].iter_mut().zip(src) {
            *d = *d + s;
        }
    }
    for (row, &count) in out_feat.chunks_exact_mut(nchannel).zip(num_nonzero.iter()) {
        if count > T::zero() {
            for v in row {
                *v = *v / count;
            }
        }
    }
}

/// Average pooling backward: `grad_in[i] += grad_out[o] / num_nonzero[o]`.
///
/// `grad_in` is zeroed first.
pub fn avg_pool_bw_kernel<T: Element>(
    map: &InOutMap,
    grad_out: &[T],
    num_nonzero: &[T],
    nchannel: usize,
    grad_in: &mut [T],
) {
    grad_in.fill(T::zero());
    for (_, i, o) in map.iter() {
        let count = num_nonzero[o];
        if count <= T::zero() {
            continue;
        }
        let src = &grad_out[o * nchannel..(o + 1) * nchannel];
        for (d, &g) in grad_in[i * nchannel..(i + 1) * nchannel].iter_mut().zip(src) {
            *d = *d + g / count;
        }
    }
}
