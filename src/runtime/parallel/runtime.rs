//! Parallel runtime implementation

use super::client::ParallelClient;
use super::device::ParallelDevice;
use crate::error::{Error, Result};
use crate::runtime::{Device, Runtime};
use std::sync::Arc;

/// Device-parallel compute runtime
#[derive(Clone, Debug, Default)]
pub struct ParallelRuntime;

impl Runtime for ParallelRuntime {
    type Device = ParallelDevice;
    type Client = ParallelClient;

    fn name() -> &'static str {
        "parallel"
    }

    fn default_device() -> Self::Device {
        ParallelDevice::new(0)
    }

    fn create_client(device: &Self::Device) -> Result<Self::Client> {
        device.config().validate()?;
        let id = device.id();
        let mut builder =
            rayon::ThreadPoolBuilder::new().thread_name(move |i| format!("sparseconv-{id}-{i}"));
        if let Some(n) = device.config().num_threads() {
            builder = builder.num_threads(n);
        }
        let pool = builder
            .build()
            .map_err(|err| Error::ContextInit(err.to_string()))?;
        tracing::debug!(
            device = %device.name(),
            threads = pool.current_num_threads(),
            "created thread pool"
        );
        Ok(ParallelClient::new(device.clone(), Arc::new(pool)))
    }
}
