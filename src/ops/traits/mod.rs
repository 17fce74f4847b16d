//! Operation traits for sparse operations.
//!
//! Implementations are in the backend-specific modules (cpu/, parallel/),
//! which share the validation and kernels in `impl_generic`.

mod conv;
mod global;
mod pooling;

pub use conv::SparseConvOps;
pub use global::{BroadcastOp, GlobalOps};
pub use pooling::SparsePoolingOps;
