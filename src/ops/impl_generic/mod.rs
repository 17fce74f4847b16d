//! Generic implementations of the sparse operations.
//!
//! Backend-agnostic validation + kernel dispatch shared by every client, so
//! all backends accept and reject exactly the same inputs.
//!
//! ```text
//! impl_generic/sparse.rs
//!     └── sparse_conv_fw_impl<T>()
//!             │
//!             ├── cpu/sparse.rs delegates here
//!             └── parallel/sparse.rs delegates here (inside its pool)
//! ```

mod sparse;

pub(crate) use sparse::{check_conv_bw, check_conv_fw};
pub use sparse::{
    avg_pool_bw_impl, avg_pool_fw_impl, broadcast_bw_impl, broadcast_fw_impl, max_pool_bw_impl,
    max_pool_fw_impl, sparse_conv_bw_impl, sparse_conv_fw_impl,
};
