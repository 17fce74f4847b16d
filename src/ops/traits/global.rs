//! Per-batch broadcast operations.

use crate::dtype::Element;
use crate::error::{Error, Result};
use crate::ops::MapView;

/// Elementwise combination applied by a broadcast
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BroadcastOp {
    /// `out = in + global`
    Add,
    /// `out = in * global`
    Multiply,
}

impl BroadcastOp {
    /// Decode the boundary-layer op code (`0` add, `1` multiply).
    pub fn from_raw(op: i32) -> Result<Self> {
        match op {
            0 => Ok(BroadcastOp::Add),
            1 => Ok(BroadcastOp::Multiply),
            other => Err(Error::invalid_argument(
                "op",
                format!("expected 0 (add) or 1 (multiply), got {other}"),
            )),
        }
    }
}

/// Combine each row with its batch's global feature.
///
/// `map` must be a global reduction map: `in_rows` rows of the sparse
/// tensor, `out_rows` batches.
pub trait GlobalOps {
    /// `out[i] = in[i] ∘ global[batch(i)]`
    fn broadcast_fw<T: Element>(
        &self,
        map: MapView<'_>,
        in_feat: &[T],
        global_feat: &[T],
        out_feat: &mut [T],
        nchannel: usize,
        op: BroadcastOp,
    ) -> Result<()>;

    /// Gradients with respect to both the rows and the global features.
    #[allow(clippy::too_many_arguments)]
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
    ) -> Result<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_op_codes() {
        assert_eq!(BroadcastOp::from_raw(0).unwrap(), BroadcastOp::Add);
        assert_eq!(BroadcastOp::from_raw(1).unwrap(), BroadcastOp::Multiply);
        assert!(BroadcastOp::from_raw(2).is_err());
    }
}
