//! CPU runtime implementation
//!
//! The host-serial variant: coordinate insertion, map building and numeric
//! kernels all run on the calling thread. This is the reference every other
//! variant must agree with.
//!
//! # Thread Safety
//!
//! A client may be cloned and used from several threads, but the
//! [`Metadata`](crate::metadata::Metadata) it belongs to is not synchronized;
//! callers serialize access to one handle.

mod client;
mod device;
pub(crate) mod kernels;
mod runtime;

pub use client::CpuClient;
pub use device::CpuDevice;
pub use runtime::CpuRuntime;
