//! CPU client implementation

use super::device::CpuDevice;
use super::runtime::CpuRuntime;
use crate::coords::{CoordIndexMap, DuplicatePolicy};
use crate::error::Result;
use crate::kernel::{self, InOutMap, KernelRegion};
use crate::runtime::{MapBuilder, RuntimeClient};

/// CPU client for operation dispatch
#[derive(Clone, Debug)]
pub struct CpuClient {
    pub(crate) device: CpuDevice,
}

impl CpuClient {
    /// Create a new CPU client
    pub fn new(device: CpuDevice) -> Self {
        Self { device }
    }
}

impl RuntimeClient<CpuRuntime> for CpuClient {
    fn device(&self) -> &CpuDevice {
        &self.device
    }
}

impl MapBuilder for CpuClient {
    fn index_coords(
        &self,
        coords: &[i32],
        stride: &[i32],
        policy: DuplicatePolicy,
    ) -> Result<CoordIndexMap> {
        CoordIndexMap::from_flat(coords, stride, policy)
    }

    fn stride_coords(&self, input: &CoordIndexMap, out_stride: &[i32]) -> Result<CoordIndexMap> {
        input.strided(out_stride)
    }

    fn kernel_map(
        &self,
        input: &CoordIndexMap,
        output: &CoordIndexMap,
        region: &KernelRegion,
        is_transpose: bool,
    ) -> InOutMap {
        if is_transpose {
            kernel::build_transpose(input, output, region)
        } else {
            kernel::build_forward(input, output, region)
        }
    }

    fn global_map(&self, input: &CoordIndexMap, origin: &CoordIndexMap) -> Result<InOutMap> {
        kernel::build_global(input, origin)
    }
}
