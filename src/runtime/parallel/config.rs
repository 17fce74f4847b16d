//! Configuration of the parallel device

use crate::error::{Error, Result};

/// Default hash-table load factor for concurrent coordinate insertion
pub const DEFAULT_LOAD_FACTOR: f64 = 0.5;

/// Thread pool and hash-table sizing for [`ParallelDevice`](super::ParallelDevice).
///
/// # Example
///
/// ```ignore
/// let config = ParallelConfig::new().with_num_threads(4).with_load_factor(0.25);
/// let device = ParallelDevice::with_config(0, config);
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ParallelConfig {
    num_threads: Option<usize>,
    load_factor: f64,
}

impl Default for ParallelConfig {
    fn default() -> Self {
        Self {
            num_threads: None,
            load_factor: DEFAULT_LOAD_FACTOR,
        }
    }
}

impl ParallelConfig {
    /// Rayon's default thread count and a load factor of 0.5
    pub fn new() -> Self {
        Self::default()
    }

    /// Fix the pool size
    pub fn with_num_threads(mut self, num_threads: usize) -> Self {
        self.num_threads = Some(num_threads);
        self
    }

    /// Set the target load of concurrent hash tables
    pub fn with_load_factor(mut self, load_factor: f64) -> Self {
        self.load_factor = load_factor;
        self
    }

    /// Requested pool size, `None` for rayon's default
    #[inline]
    pub fn num_threads(&self) -> Option<usize> {
        self.num_threads
    }

    /// Target load of concurrent hash tables
    #[inline]
    pub fn load_factor(&self) -> f64 {
        self.load_factor
    }

    /// Checks the pool size is non-zero and the load factor lies in (0, 1).
    pub fn validate(&self) -> Result<()> {
        if self.num_threads == Some(0) {
            return Err(Error::invalid_argument("num_threads", "must be at least 1"));
        }
        if !(self.load_factor > 0.0 && self.load_factor < 1.0) {
            return Err(Error::invalid_argument(
                "load_factor",
                format!("must be in (0, 1), got {}", self.load_factor),
            ));
        }
        Ok(())
    }
}
