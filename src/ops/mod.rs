//! Sparse operations
//!
//! This module defines the operation traits for sparse convolution, pooling
//! and per-batch broadcasting, and their implementations for each client.
//!
//! # Design
//!
//! Operations are traits implemented by the runtime's client type. They take
//! a [`MapView`] (kernel map plus the row counts of the two coordinate sets)
//! and flat row-major feature slices.
//!
//! ```text
//! RuntimeClient<R>
//!   ├── implements SparseConvOps     (conv forward / backward)
//!   ├── implements SparsePoolingOps  (max / non-zero average pooling)
//!   └── implements GlobalOps         (per-batch broadcast)
//! ```
//!
//! Every implementation validates all buffer lengths through
//! [`impl_generic`] before a kernel writes, so a rejected call leaves the
//! caller's buffers untouched.

pub(crate) mod conv_common;
pub(crate) mod impl_generic;
mod traits;

pub mod cpu;

#[cfg(feature = "rayon")]
pub mod parallel;

pub use conv_common::{
    ConvChannels, ConvParams, MapView, validate_channels, validate_features, validate_kernel,
};
pub use traits::{BroadcastOp, GlobalOps, SparseConvOps, SparsePoolingOps};
