//! # sparseconv
//!
//! **Coordinate indexing and kernel maps for sparse convolution.**
//!
//! A sparse tensor is a set of integer coordinates (D spatial components plus
//! a batch index) with one feature row per coordinate. sparseconv assigns
//! every coordinate a dense row, derives the coordinate sets of strided and
//! global layers, and computes for a kernel footprint which input rows meet
//! which output rows through which kernel offset. Convolution, pooling and
//! broadcast kernels then run over those row pairs.
//!
//! ## Features
//!
//! - **Coordinate sets**: first-seen row order, stride derivation, per-batch
//!   origin sets
//! - **Kernel maps**: hypercube, hypercross and custom footprints, dilation,
//!   transposed (upsampling) maps
//! - **Caching**: maps are keyed by a fingerprint of every parameter and built
//!   once per handle
//! - **Two variants**: host-serial [`CpuRuntime`](runtime::cpu::CpuRuntime)
//!   and rayon-backed `ParallelRuntime` producing identical maps
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use sparseconv::prelude::*;
//!
//! let mut meta = Metadata::<CpuRuntime>::new(2)?;
//! meta.initialize_coords(&[0, 0, 0, 1, 0, 0], &[1, 1], DuplicatePolicy::Reject)?;
//!
//! let params = ConvParams::new(&[1, 1], &[2, 2], &[3, 3], &[1, 1]);
//! let out_rows = meta.initialize_out_coords(&[1, 1], &[2, 2], false)?;
//! let mut out = vec![0.0f32; out_rows * 8];
//! meta.conv_fw(&params, false, &in_feat, &kernel, &mut out, ConvChannels::new(4, 8))?;
//! ```
//!
//! ## Feature Flags
//!
//! - `cpu` (default): host-serial runtime in the prelude
//! - `rayon` (default): device-parallel runtime

#![warn(missing_docs)]
#![warn(clippy::all)]
#![allow(clippy::module_inception)]

pub mod api;
pub mod coords;
pub mod dtype;
pub mod error;
pub mod kernel;
pub mod metadata;
pub mod ops;
pub mod runtime;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::coords::{Coord, CoordIndexMap, DuplicatePolicy, ParameterKey, derive_key};
    pub use crate::dtype::Element;
    pub use crate::error::{Error, Result};
    pub use crate::kernel::{InOutMap, KernelRegion, Region};
    pub use crate::metadata::{BuildStats, Metadata};
    pub use crate::ops::{
        BroadcastOp, ConvChannels, ConvParams, GlobalOps, MapView, SparseConvOps, SparsePoolingOps,
    };
    pub use crate::runtime::{Device, MapBuilder, Runtime, RuntimeClient};

    #[cfg(feature = "cpu")]
    pub use crate::runtime::cpu::CpuRuntime;

    #[cfg(feature = "rayon")]
    pub use crate::runtime::parallel::{ParallelConfig, ParallelRuntime};
}

/// Default runtime based on enabled features
///
/// - With `rayon` feature: `ParallelRuntime`
/// - Otherwise: `CpuRuntime`
#[cfg(feature = "rayon")]
pub type DefaultRuntime = runtime::parallel::ParallelRuntime;

/// Default runtime based on enabled features
#[cfg(not(feature = "rayon"))]
pub type DefaultRuntime = runtime::cpu::CpuRuntime;
