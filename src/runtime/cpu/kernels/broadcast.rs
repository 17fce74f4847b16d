//! Per-batch broadcast kernels
//!
//! Combine every row with the global feature of its batch, using the global
//! reduction map (a single offset pairing each row with its origin row).

use crate::dtype::Element;
use crate::kernel::InOutMap;
use crate::ops::BroadcastOp;

#[inline]
fn apply<T: Element>(op: BroadcastOp, a: T, b: T) -> T {
    match op {
        BroadcastOp::Add => a + b,
        BroadcastOp::Multiply => a * b,
    }
}

/// `out[i] = in[i] ∘ global[batch(i)]`. `out_feat` is zeroed first.
pub fn broadcast_fw_kernel<T: Element>(
    map: &InOutMap,
    in_feat: &[T],
    global_feat: &[T],
    nchannel: usize,
    op: BroadcastOp,
    out_feat: &mut [T],
) {
    out_feat.fill(T::zero());
    for (_, i, g) in map.iter() {
        let src = &in_feat[i * nchannel..(i + 1) * nchannel];
        let glob = &global_feat[g * nchannel..(g + 1) * nchannel];
        let dst = &mut out_feat[i * nchannel..(i + 1) * nchannel];
        for ((d, &s), &gv) in dst.iter_mut().zip(src).zip(glob) {
            *d = apply(op, s, gv);
        }
    }
}

/// Gradients of [`broadcast_fw_kernel`] with respect to both operands.
///
/// Both gradient buffers are zeroed first.
#[allow(clippy::too_many_arguments)]
pub fn broadcast_bw_kernel<T: Element>(
    map: &InOutMap,
    in_feat: &[T],
    global_feat: &[T],
    grad_out: &[T],
    nchannel: usize,
    op: BroadcastOp,
    grad_in: &mut [T],
    grad_global: &mut [T],
) {
    grad_in.fill(T::zero());
    grad_global.fill(T::zero());
    for (_, i, g) in map.iter() {
        let range = i * nchannel..(i + 1) * nchannel;
        let grad = &grad_out[range.clone()];
        let glob = &global_feat[g * nchannel..(g + 1) * nchannel];
        let src = &in_feat[range.clone()];
        let dst_in = &mut grad_in[range];
        let dst_global = &mut grad_global[g * nchannel..(g + 1) * nchannel];
        for c in 0..nchannel {
            match op {
                BroadcastOp::Add => {
                    dst_in[c] = grad[c];
                    dst_global[c] = dst_global[c] + grad[c];
                }
                BroadcastOp::Multiply => {
                    dst_in[c] = grad[c] * glob[c];
                    dst_global[c] = dst_global[c] + grad[c] * src[c];
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn batch_map() -> InOutMap {
        // rows 0, 1 in batch 0; row 2 in batch 1
        let mut map = InOutMap::with_volume(1);
        map.push(0, 0, 0);
        map.push(0, 1, 0);
        map.push(0, 2, 1);
        map
    }

    #[test]
    fn test_broadcast_add() {
        let mut out = [0.0f32; 3];
        broadcast_fw_kernel(&batch_map(), &[1.0, 2.0, 3.0], &[10.0, 20.0], 1, BroadcastOp::Add, &mut out);
        assert_eq!(out, [11.0, 12.0, 23.0]);
    }

    #[test]
    fn test_broadcast_multiply_gradients() {
        let map = batch_map();
        let in_feat = [1.0f64, 2.0, 3.0];
        let global = [10.0f64, 20.0];
        let grad_out = [1.0f64, 1.0, 2.0];
        let mut grad_in = [0.0f64; 3];
        let mut grad_global = [0.0f64; 2];
        broadcast_bw_kernel(
            &map,
            &in_feat,
            &global,
            &grad_out,
            1,
            BroadcastOp::Multiply,
            &mut grad_in,
            &mut grad_global,
        );
        assert_eq!(grad_in, [10.0, 10.0, 40.0]);
        assert_eq!(grad_global, [3.0, 6.0]);
    }
}
