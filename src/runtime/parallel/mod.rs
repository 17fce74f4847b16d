//! Device-parallel runtime backed by a rayon thread pool
//!
//! Coordinate sets are built with the lock-free
//! [`ConcurrentCoordMap`](crate::coords::ConcurrentCoordMap) and kernel maps
//! by probing anchor rows in parallel. Results are gathered in row order, so
//! every set and map is identical to the one the serial
//! [`CpuRuntime`](crate::runtime::cpu::CpuRuntime) builds.

mod client;
mod config;
mod device;
pub(crate) mod kernels;
mod runtime;

pub use client::ParallelClient;
pub use config::ParallelConfig;
pub use device::ParallelDevice;
pub use runtime::ParallelRuntime;
