//! Parallel device implementation

use super::config::ParallelConfig;
use crate::runtime::Device;

/// A rayon thread pool as a compute device.
///
/// The device only describes the pool; the pool itself is created with the
/// client.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ParallelDevice {
    id: usize,
    config: ParallelConfig,
}

impl ParallelDevice {
    /// Device `id` with the default configuration
    pub fn new(id: usize) -> Self {
        Self::with_config(id, ParallelConfig::default())
    }

    /// Device `id` with an explicit configuration
    pub fn with_config(id: usize, config: ParallelConfig) -> Self {
        Self { id, config }
    }

    /// Pool and hash-table configuration
    #[inline]
    pub fn config(&self) -> &ParallelConfig {
        &self.config
    }
}

impl Device for ParallelDevice {
    fn id(&self) -> usize {
        self.id
    }

    fn name(&self) -> String {
        format!("parallel:{}", self.id)
    }
}
