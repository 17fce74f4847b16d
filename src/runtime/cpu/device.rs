//! CPU device implementation

use crate::runtime::Device;

/// The host CPU. Carries no state; every `CpuDevice` is the same device.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CpuDevice;

impl CpuDevice {
    /// Handle to the host CPU
    pub fn new() -> Self {
        CpuDevice
    }
}

impl Device for CpuDevice {
    fn id(&self) -> usize {
        0
    }

    fn name(&self) -> String {
        "cpu".to_string()
    }
}
