//! Runtime traits for compute backend abstraction

pub mod builder;
pub mod client;
pub mod device;
pub mod runtime;

pub use builder::MapBuilder;
pub use client::RuntimeClient;
pub use device::Device;
pub use runtime::Runtime;
