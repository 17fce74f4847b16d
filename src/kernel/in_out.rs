//! Input/output row pairing per kernel offset
//!
//! An [`InOutMap`] holds, for every kernel offset `k`, two parallel row lists:
//! input row `input[i]` contributes to output row `output[i]` through the
//! weight slice `k`. Numeric kernels only ever see these lists; they never
//! touch coordinates.

use super::region::KernelRegion;
use crate::coords::{Coord, CoordIndexMap};
use crate::error::{Error, Result};

/// Parallel input/output row lists for one kernel offset
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KernelPairs {
    /// Rows of the input coordinate set
    pub input: Vec<usize>,
    /// Rows of the output coordinate set, same length as `input`
    pub output: Vec<usize>,
}

impl KernelPairs {
    /// Number of pairs
    #[inline]
    pub fn len(&self) -> usize {
        self.input.len()
    }

    /// Returns true if the offset found no neighbours
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.input.is_empty()
    }

    /// Iterate `(input_row, output_row)`
    pub fn iter(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        self.input.iter().copied().zip(self.output.iter().copied())
    }
}

/// Row pairing for every offset of a kernel footprint.
///
/// Pairs are not deduplicated across offsets; the same correspondence may
/// legitimately appear under two offsets and downstream accumulation sums
/// both.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InOutMap {
    kernels: Vec<KernelPairs>,
}

impl InOutMap {
    /// Empty map with `volume` offsets
    pub fn with_volume(volume: usize) -> Self {
        Self {
            kernels: vec![KernelPairs::default(); volume],
        }
    }

    /// Number of kernel offsets
    #[inline]
    pub fn volume(&self) -> usize {
        self.kernels.len()
    }

    /// Pairs for offset `k`
    #[inline]
    pub fn kernel(&self, k: usize) -> Option<&KernelPairs> {
        self.kernels.get(k)
    }

    /// Pair lists in kernel-index order
    #[inline]
    pub fn kernels(&self) -> &[KernelPairs] {
        &self.kernels
    }

    /// Total pair count over all offsets
    pub fn num_pairs(&self) -> usize {
        self.kernels.iter().map(KernelPairs::len).sum()
    }

    /// Append one pair to offset `k`
    #[inline]
    pub fn push(&mut self, k: usize, input_row: usize, output_row: usize) {
        let pairs = &mut self.kernels[k];
        pairs.input.push(input_row);
        pairs.output.push(output_row);
    }

    /// Iterate `(k, input_row, output_row)` over all offsets
    pub fn iter(&self) -> impl Iterator<Item = (usize, usize, usize)> + '_ {
        self.kernels
            .iter()
            .enumerate()
            .flat_map(|(k, pairs)| pairs.iter().map(move |(i, o)| (k, i, o)))
    }

    /// Same map with input and output roles swapped
    pub fn swapped(&self) -> Self {
        Self {
            kernels: self
                .kernels
                .iter()
                .map(|p| KernelPairs {
                    input: p.output.clone(),
                    output: p.input.clone(),
                })
                .collect(),
        }
    }
}

/// Probe `probe` for every offset around `anchor`, pushing `(k, row)` hits.
#[inline]
pub(crate) fn probe_neighbors(
    anchor: &Coord,
    probe: &CoordIndexMap,
    region: &KernelRegion,
    hits: &mut Vec<(usize, usize)>,
) {
    for (k, offset) in region.iter() {
        // a shift that leaves i32 cannot land on a registered coordinate
        if let Some(row) = anchor.shifted(offset).and_then(|c| probe.get(&c)) {
            hits.push((k, row));
        }
    }
}

/// Forward map: every output row looks for inputs at `output + offset_k`.
///
/// `region` must be expressed in the input set's pixel units.
pub fn build_forward(input: &CoordIndexMap, output: &CoordIndexMap, region: &KernelRegion) -> InOutMap {
    let mut map = InOutMap::with_volume(region.volume());
    let mut hits = Vec::with_capacity(region.volume());
    for (out_row, coord) in output.rows().iter().enumerate() {
        hits.clear();
        probe_neighbors(coord, input, region, &mut hits);
        for &(k, in_row) in &hits {
            map.push(k, in_row, out_row);
        }
    }
    map
}

/// Transposed map: every (coarse) input row looks for outputs at
/// `input + offset_k` in the already registered finer output set.
///
/// `region` must be expressed in the output set's pixel units. Per offset,
/// the pairs are exactly those of the forward map from `output` to `input`
/// with roles swapped.
pub fn build_transpose(input: &CoordIndexMap, output: &CoordIndexMap, region: &KernelRegion) -> InOutMap {
    let mut map = InOutMap::with_volume(region.volume());
    let mut hits = Vec::with_capacity(region.volume());
    for (in_row, coord) in input.rows().iter().enumerate() {
        hits.clear();
        probe_neighbors(coord, output, region, &mut hits);
        for &(k, out_row) in &hits {
            map.push(k, in_row, out_row);
        }
    }
    map
}

/// Origin row for one input coordinate.
#[inline]
pub(crate) fn origin_row(coord: &Coord, origin: &CoordIndexMap) -> Result<usize> {
    origin
        .get(&Coord::origin(coord.dim(), coord.batch()))
        .ok_or_else(|| {
            Error::invalid_argument(
                "batch_size",
                format!("origin set has no row for batch {}", coord.batch()),
            )
        })
}

/// Global reduction map: a single offset pairing every input row with the
/// origin row of its batch.
pub fn build_global(input: &CoordIndexMap, origin: &CoordIndexMap) -> Result<InOutMap> {
    let mut map = InOutMap::with_volume(1);
    for (in_row, coord) in input.rows().iter().enumerate() {
        map.push(0, in_row, origin_row(coord, origin)?);
    }
    Ok(map)
}
