//! Core trait for compute backends

use crate::error::Result;

/// Core trait for compute backends
///
/// `Runtime` abstracts over the execution variants of the coordinate and
/// kernel-map machinery. Both variants share the data model (coordinate
/// sets and in/out maps are the same types); they differ in how those are
/// built and how the numeric kernels are scheduled.
///
/// # Associated Types
///
/// - `Device`: Identifies the compute unit and carries its configuration
/// - `Client`: Execution context; builds maps and dispatches kernels
///
/// # Example
///
/// ```ignore
/// let device = CpuRuntime::default_device();
/// let client = CpuRuntime::create_client(&device)?;
/// let coords = client.index_coords(&flat, &[1, 1], DuplicatePolicy::Reject)?;
/// ```
pub trait Runtime: Clone + Send + Sync + 'static {
    /// Device identifier type
    type Device: super::Device;

    /// Execution context for building maps and dispatching kernels
    type Client: super::RuntimeClient<Self> + super::MapBuilder;

    /// Human-readable name of this runtime
    fn name() -> &'static str;

    /// Get the default device
    fn default_device() -> Self::Device;

    /// Create an execution context on `device`
    ///
    /// Returns `Err(ContextInit)` if the backing resources cannot be
    /// acquired. Metadata calls this lazily, once per handle.
    fn create_client(device: &Self::Device) -> Result<Self::Client>;
}
