//! Coordinate value type

use super::hash::fingerprint;
use crate::error::{Error, Result};
use smallvec::SmallVec;
use std::hash::{Hash, Hasher};

/// Inline capacity for coordinates: up to 7 spatial dimensions plus batch
/// stay on the stack.
const STACK_COMPONENTS: usize = 8;

/// Storage for coordinate components and per-dimension parameter vectors
pub type CoordVec = SmallVec<[i32; STACK_COMPONENTS]>;

/// A point in a sparse tensor: `D` spatial components followed by the batch
/// index.
///
/// Equality and hashing are exact over all `D + 1` components. Coordinates
/// are expressed in absolute units, so a point at stride 4 has spatial
/// components that are multiples of 4.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub struct Coord(CoordVec);

impl Coord {
    /// Build a coordinate from its `D + 1` components.
    pub fn from_slice(components: &[i32]) -> Self {
        Self(CoordVec::from_slice(components))
    }

    /// Coordinate with all spatial components zero in the given batch.
    pub fn origin(dim: usize, batch: i32) -> Self {
        let mut components: CoordVec = smallvec::smallvec![0; dim + 1];
        components[dim] = batch;
        Self(components)
    }

    /// All components, batch last
    #[inline]
    pub fn as_slice(&self) -> &[i32] {
        &self.0
    }

    /// Number of spatial dimensions
    #[inline]
    pub fn dim(&self) -> usize {
        self.0.len() - 1
    }

    /// Spatial components
    #[inline]
    pub fn spatial(&self) -> &[i32] {
        &self.0[..self.dim()]
    }

    /// Batch index
    #[inline]
    pub fn batch(&self) -> i32 {
        self.0[self.dim()]
    }

    /// Round every spatial component down to a multiple of `stride`.
    ///
    /// Rounds toward negative infinity so negative coordinates land on the
    /// same lattice as positive ones.
    ///
    /// # Errors
    ///
    /// `Error::InvalidArgument` if a floored component does not fit in `i32`
    /// (e.g. `i32::MIN` at stride 3).
    pub fn floor_to(&self, stride: &[i32]) -> Result<Self> {
        debug_assert_eq!(stride.len(), self.dim());
        let mut out = self.0.clone();
        for (c, &s) in out.iter_mut().zip(stride) {
            let floored = i64::from(*c).div_euclid(i64::from(s)) * i64::from(s);
            *c = i32::try_from(floored).map_err(|_| {
                Error::invalid_argument(
                    "coords",
                    format!("{c} floored to stride {s} leaves the i32 range"),
                )
            })?;
        }
        Ok(Self(out))
    }

    /// Shift the spatial components by `offset`; batch unchanged.
    ///
    /// `None` if a component leaves the `i32` range; no coordinate can live
    /// there.
    pub fn shifted(&self, offset: &[i32]) -> Option<Self> {
        debug_assert_eq!(offset.len(), self.dim());
        let mut out = self.0.clone();
        for (c, &o) in out.iter_mut().zip(offset) {
            *c = c.checked_add(o)?;
        }
        Some(Self(out))
    }
}

impl Hash for Coord {
    fn hash<H: Hasher>(&self, state: &mut H) {
        state.write_u64(fingerprint(&self.0));
    }
}

impl From<&[i32]> for Coord {
    fn from(components: &[i32]) -> Self {
        Self::from_slice(components)
    }
}
