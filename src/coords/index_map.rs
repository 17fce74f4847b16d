//! Stride-tagged coordinate sets
//!
//! A [`CoordIndexMap`] is a bijection between the distinct coordinates seen
//! at one stride and the dense row range `[0, N)`. Rows are handed out in
//! first-seen order and never reassigned, so feature row `i` always belongs
//! to the coordinate that was inserted `i`-th.

use super::coord::{Coord, CoordVec};
use super::hash::FingerprintBuildHasher;
use crate::error::{Error, Result};
use std::collections::HashMap;

/// What to do when an input buffer repeats a coordinate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DuplicatePolicy {
    /// Fail with [`Error::DuplicateCoordinate`]
    #[default]
    Reject,
    /// Keep the first occurrence's row; later copies map onto it
    KeepFirst,
}

/// Append-only coordinate → row index map for one stride.
///
/// The map is node based: there is no reserved "empty" key, so every `i32`
/// pattern is a valid coordinate.
#[derive(Clone, Debug)]
pub struct CoordIndexMap {
    stride: CoordVec,
    rows: Vec<Coord>,
    index: HashMap<Coord, usize, FingerprintBuildHasher>,
}

impl CoordIndexMap {
    /// Create an empty set at `stride`. The dimension is `stride.len()`.
    pub fn new(stride: &[i32]) -> Self {
        Self::with_capacity(stride, 0)
    }

    /// Create an empty set with room for `capacity` coordinates.
    pub fn with_capacity(stride: &[i32], capacity: usize) -> Self {
        Self {
            stride: CoordVec::from_slice(stride),
            rows: Vec::with_capacity(capacity),
            index: HashMap::with_capacity_and_hasher(capacity, Default::default()),
        }
    }

    /// Build a set from a row-major `[nrows × (D + 1)]` buffer.
    ///
    /// With [`DuplicatePolicy::Reject`] the first repeated row aborts the
    /// build and nothing is returned.
    pub fn from_flat(coords: &[i32], stride: &[i32], policy: DuplicatePolicy) -> Result<Self> {
        let width = stride.len() + 1;
        if coords.len() % width != 0 {
            return Err(Error::shape_mismatch(
                &[coords.len() / width, width],
                &[coords.len()],
            ));
        }
        let mut map = Self::with_capacity(stride, coords.len() / width);
        for (row, chunk) in coords.chunks_exact(width).enumerate() {
            let (_, inserted) = map.insert_full(Coord::from_slice(chunk));
            if !inserted && policy == DuplicatePolicy::Reject {
                return Err(Error::DuplicateCoordinate { row });
            }
        }
        Ok(map)
    }

    /// Rebuild a set from coordinates already ordered by row.
    pub(crate) fn from_ordered_rows(stride: &[i32], rows: Vec<Coord>) -> Self {
        let mut index = HashMap::with_capacity_and_hasher(rows.len(), Default::default());
        for (row, coord) in rows.iter().enumerate() {
            index.insert(coord.clone(), row);
        }
        Self {
            stride: CoordVec::from_slice(stride),
            rows,
            index,
        }
    }

    /// Insert a coordinate and return its row.
    ///
    /// Idempotent: an existing coordinate keeps its row and the map is not
    /// modified.
    pub fn insert(&mut self, coord: Coord) -> usize {
        self.insert_full(coord).0
    }

    /// Insert a coordinate, returning its row and whether it was new.
    pub fn insert_full(&mut self, coord: Coord) -> (usize, bool) {
        debug_assert_eq!(coord.dim(), self.dim());
        if let Some(&row) = self.index.get(&coord) {
            return (row, false);
        }
        let row = self.rows.len();
        self.index.insert(coord.clone(), row);
        self.rows.push(coord);
        (row, true)
    }

    /// Row of `coord`, if present.
    #[inline]
    pub fn get(&self, coord: &Coord) -> Option<usize> {
        self.index.get(coord).copied()
    }

    /// Row of the coordinate given by its raw components, if present.
    #[inline]
    pub fn find(&self, components: &[i32]) -> Option<usize> {
        self.get(&Coord::from_slice(components))
    }

    /// Number of rows
    #[inline]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Returns true if no coordinate has been inserted
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Number of spatial dimensions
    #[inline]
    pub fn dim(&self) -> usize {
        self.stride.len()
    }

    /// Stride (pixel distance) this set lives at
    #[inline]
    pub fn stride(&self) -> &[i32] {
        &self.stride
    }

    /// Coordinate stored at `row`
    #[inline]
    pub fn coord(&self, row: usize) -> Option<&Coord> {
        self.rows.get(row)
    }

    /// Coordinates in row order
    #[inline]
    pub fn rows(&self) -> &[Coord] {
        &self.rows
    }

    /// Copy every coordinate into `out` as a row-major `[N × (D + 1)]` block.
    pub fn write_flat(&self, out: &mut [i32]) -> Result<()> {
        let width = self.dim() + 1;
        if out.len() != self.len() * width {
            return Err(Error::shape_mismatch(&[self.len(), width], &[out.len()]));
        }
        for (dst, coord) in out.chunks_exact_mut(width).zip(&self.rows) {
            dst.copy_from_slice(coord.as_slice());
        }
        Ok(())
    }

    /// Derive the set at a coarser stride.
    ///
    /// Every coordinate is floored to a multiple of `out_stride` and the
    /// results are inserted in row order, deduplicating.
    pub fn strided(&self, out_stride: &[i32]) -> Result<Self> {
        let mut out = Self::with_capacity(out_stride, self.len());
        for coord in &self.rows {
            out.insert(coord.floor_to(out_stride)?);
        }
        Ok(out)
    }

    /// Batch index of each row, in row order.
    pub fn batch_indices(&self) -> impl Iterator<Item = i32> + '_ {
        self.rows.iter().map(Coord::batch)
    }

    /// Per-batch origin set with exactly `batch_size` rows; row `b` holds
    /// `(0, .., 0, b)`.
    pub fn origin(dim: usize, batch_size: usize) -> Self {
        let stride = super::hash::origin_stride(dim);
        let mut out = Self::with_capacity(&stride, batch_size);
        for b in 0..batch_size {
            out.insert(Coord::origin(dim, b as i32));
        }
        out
    }

    /// Per-batch origin set holding the batches of `self` in first-seen order.
    pub fn origin_of(&self) -> Self {
        let stride = super::hash::origin_stride(self.dim());
        let mut out = Self::new(&stride);
        for batch in self.batch_indices() {
            out.insert(Coord::origin(self.dim(), batch));
        }
        out
    }
}
