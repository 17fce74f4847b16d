//! CPU kernel implementations
//!
//! Kernels consume an [`InOutMap`](crate::kernel::InOutMap) and row-major
//! feature slices. They are generic over `T: Element`, assume lengths were
//! validated by the caller, and always initialize their outputs.

pub mod broadcast;
pub mod conv;
pub mod gemm;
pub mod pooling;

pub use broadcast::{broadcast_bw_kernel, broadcast_fw_kernel};
pub use conv::{conv_bw_kernel, conv_fw_kernel};
pub(crate) use conv::{Scratch, conv_bw_offset, conv_fw_offset};
pub use pooling::{avg_pool_bw_kernel, avg_pool_fw_kernel, max_pool_bw_kernel, max_pool_fw_kernel};
