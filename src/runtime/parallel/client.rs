//! Parallel client implementation

use super::device::ParallelDevice;
use super::runtime::ParallelRuntime;
use crate::coords::{ConcurrentCoordMap, Coord, CoordIndexMap, DuplicatePolicy};
use crate::error::{Error, Result};
use crate::kernel::{InOutMap, KernelRegion, origin_row, probe_neighbors};
use crate::runtime::{MapBuilder, RuntimeClient};
use rayon::prelude::*;
use std::sync::Arc;

/// Minimum rows handed to one rayon task
const MIN_ROWS_PER_TASK: usize = 256;

/// Client owning a rayon thread pool
#[derive(Clone, Debug)]
pub struct ParallelClient {
    device: ParallelDevice,
    pool: Arc<rayon::ThreadPool>,
}

impl ParallelClient {
    pub(crate) fn new(device: ParallelDevice, pool: Arc<rayon::ThreadPool>) -> Self {
        Self { device, pool }
    }

    /// Run `op` inside this client's thread pool.
    pub fn install<OP, R>(&self, op: OP) -> R
    where
        OP: FnOnce() -> R + Send,
        R: Send,
    {
        self.pool.install(op)
    }

    /// Number of worker threads
    pub fn num_threads(&self) -> usize {
        self.pool.current_num_threads()
    }

    fn concurrent_map(&self, stride: &[i32], expected: usize) -> Result<ConcurrentCoordMap> {
        ConcurrentCoordMap::with_capacity(stride, expected, self.device.config().load_factor())
    }
}

impl RuntimeClient<ParallelRuntime> for ParallelClient {
    fn device(&self) -> &ParallelDevice {
        &self.device
    }
}

/// Flatten per-anchor hits, gathered in anchor order, into a map.
fn collect_hits(volume: usize, hits: Vec<Vec<(usize, usize)>>, is_transpose: bool) -> InOutMap {
    let mut map = InOutMap::with_volume(volume);
    for (anchor, row_hits) in hits.into_iter().enumerate() {
        for (k, other) in row_hits {
            if is_transpose {
                map.push(k, anchor, other);
            } else {
                map.push(k, other, anchor);
            }
        }
    }
    map
}

impl MapBuilder for ParallelClient {
    fn index_coords(
        &self,
        coords: &[i32],
        stride: &[i32],
        policy: DuplicatePolicy,
    ) -> Result<CoordIndexMap> {
        let width = stride.len() + 1;
        if coords.len() % width != 0 {
            return Err(Error::shape_mismatch(
                &[coords.len() / width, width],
                &[coords.len()],
            ));
        }
        let table = self.concurrent_map(stride, coords.len() / width)?;
        self.install(|| {
            coords
                .par_chunks_exact(width)
                .enumerate()
                .with_min_len(MIN_ROWS_PER_TASK)
                .try_for_each(|(row, chunk)| table.insert(chunk, row).map(|_| ()))?;

            if policy == DuplicatePolicy::Reject {
                let first_repeat = coords
                    .par_chunks_exact(width)
                    .enumerate()
                    .with_min_len(MIN_ROWS_PER_TASK)
                    .filter(|&(row, chunk)| table.first_position(chunk) != Some(row))
                    .map(|(row, _)| row)
                    .min();
                if let Some(row) = first_repeat {
                    return Err(Error::DuplicateCoordinate { row });
                }
            }
            Ok(())
        })?;
        Ok(table.into_index_map())
    }

    fn stride_coords(&self, input: &CoordIndexMap, out_stride: &[i32]) -> Result<CoordIndexMap> {
        let table = self.concurrent_map(out_stride, input.len())?;
        self.install(|| {
            input
                .rows()
                .par_iter()
                .enumerate()
                .with_min_len(MIN_ROWS_PER_TASK)
                .try_for_each(|(row, coord)| {
                    table
                        .insert(coord.floor_to(out_stride)?.as_slice(), row)
                        .map(|_| ())
                })
        })?;
        Ok(table.into_index_map())
    }

    fn kernel_map(
        &self,
        input: &CoordIndexMap,
        output: &CoordIndexMap,
        region: &KernelRegion,
        is_transpose: bool,
    ) -> InOutMap {
        let (anchors, probe) = if is_transpose {
            (input, output)
        } else {
            (output, input)
        };
        let hits: Vec<Vec<(usize, usize)>> = self.install(|| {
            anchors
                .rows()
                .par_iter()
                .with_min_len(MIN_ROWS_PER_TASK)
                .map(|anchor| {
                    let mut row_hits = Vec::new();
                    probe_neighbors(anchor, probe, region, &mut row_hits);
                    row_hits
                })
                .collect()
        });
        collect_hits(region.volume(), hits, is_transpose)
    }

    fn global_map(&self, input: &CoordIndexMap, origin: &CoordIndexMap) -> Result<InOutMap> {
        let rows: Vec<usize> = self.install(|| {
            input
                .rows()
                .par_iter()
                .with_min_len(MIN_ROWS_PER_TASK)
                .map(|coord: &Coord| origin_row(coord, origin))
                .collect::<Result<_>>()
        })?;
        let mut map = InOutMap::with_volume(1);
        for (in_row, out_row) in rows.into_iter().enumerate() {
            map.push(0, in_row, out_row);
        }
        Ok(map)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kernel::{self, Region};
    use crate::runtime::Runtime;
    use crate::runtime::parallel::{ParallelConfig, ParallelDevice};

    fn client() -> ParallelClient {
        let device = ParallelDevice::with_config(0, ParallelConfig::new().with_num_threads(4));
        ParallelRuntime::create_client(&device).unwrap()
    }

    fn grid(n: i32) -> Vec<i32> {
        let mut coords = Vec::new();
        for b in 0..2 {
            for x in 0..n {
                for y in 0..n {
                    if (x * 7 + y * 3 + b) % 4 != 0 {
                        coords.extend_from_slice(&[x, y, b]);
                    }
                }
            }
        }
        coords
    }

    #[test]
    fn test_index_coords_matches_serial() {
        let coords = grid(40);
        let serial = CoordIndexMap::from_flat(&coords, &[1, 1], DuplicatePolicy::Reject).unwrap();
        let parallel = client()
            .index_coords(&coords, &[1, 1], DuplicatePolicy::Reject)
            .unwrap();
        assert_eq!(parallel.rows(), serial.rows());
    }

    #[test]
    fn test_index_coords_reports_first_repeat() {
        let mut coords = grid(30);
        let first = coords[..3].to_vec();
        let second = coords[3..6].to_vec();
        coords.extend_from_slice(&second);
        coords.extend_from_slice(&first);
        let rows = coords.len() / 3;
        let err = client()
            .index_coords(&coords, &[1, 1], DuplicatePolicy::Reject)
            .unwrap_err();
        assert_eq!(err, Error::DuplicateCoordinate { row: rows - 2 });

        let kept = client()
            .index_coords(&coords, &[1, 1], DuplicatePolicy::KeepFirst)
            .unwrap();
        assert_eq!(kept.len(), rows - 2);
    }

    #[test]
    fn test_stride_and_kernel_maps_match_serial() {
        let client = client();
        let input = CoordIndexMap::from_flat(&grid(40), &[1, 1], DuplicatePolicy::Reject).unwrap();
        let output = client.stride_coords(&input, &[2, 2]).unwrap();
        assert_eq!(output.rows(), input.strided(&[2, 2]).unwrap().rows());

        let region = KernelRegion::new(&[3, 3], &[1, 1], &[1, 1], &Region::Hypercube).unwrap();
        assert_eq!(
            client.kernel_map(&input, &output, &region, false),
            kernel::build_forward(&input, &output, &region)
        );
        let region_tr = KernelRegion::new(&[2, 2], &[1, 1], &[1, 1], &Region::Hypercube).unwrap();
        assert_eq!(
            client.kernel_map(&output, &input, &region_tr, true),
            kernel::build_transpose(&output, &input, &region_tr)
        );

        let origin = input.origin_of();
        assert_eq!(
            client.global_map(&input, &origin).unwrap(),
            kernel::build_global(&input, &origin).unwrap()
        );
    }
}
