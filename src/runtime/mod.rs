//! Runtime backends for sparse convolution
//!
//! This module defines the `Runtime` trait and provides two execution
//! variants sharing one data model:
//!
//! - [`cpu`]: host-serial. Coordinates are inserted and maps are built on the
//!   calling thread.
//! - [`parallel`] (feature `rayon`): device-parallel. Coordinates go through
//!   a lock-free CAS table from many workers; maps are probed row-parallel.
//!
//! # Architecture
//!
//! ```text
//! Runtime (backend identity)
//! ├── Device (identifies the compute unit, carries its config)
//! └── Client (execution context: map building + kernel dispatch)
//! ```

pub mod cpu;
#[cfg(feature = "rayon")]
pub mod parallel;
mod traits;

pub use traits::{Device, MapBuilder, Runtime, RuntimeClient};
