//! Kernel footprints
//!
//! A [`KernelRegion`] is the ordered list of spatial offsets a convolution or
//! pooling kernel covers. The position of an offset in that list is the
//! kernel index `k` used everywhere else: it selects the weight slice and the
//! pair list of an [`InOutMap`](super::InOutMap). Changing the order changes
//! which weights meet which neighbours.

use crate::coords::{CoordVec, fingerprint, fingerprint_words, validate_positive_vec};
use crate::error::{Error, Result};

/// Shape of the kernel footprint
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Region {
    /// Full Cartesian product of the per-axis positions
    #[default]
    Hypercube,
    /// Zero offset plus the positions along each single axis
    Hypercross,
    /// Caller-supplied offsets, row-major `[n × D]`, in kernel units
    Custom {
        /// Flattened offsets
        offsets: Vec<i32>,
    },
}

impl Region {
    /// Decode the integer region type used by the boundary layer.
    ///
    /// `0` hypercube, `1` hypercross, `2` custom. For custom regions
    /// `offsets` must hold exactly `n_offset * dim` integers.
    pub fn from_raw(region_type: i32, offsets: &[i32], n_offset: usize, dim: usize) -> Result<Self> {
        match region_type {
            0 => Ok(Region::Hypercube),
            1 => Ok(Region::Hypercross),
            2 => {
                let provided = offsets.len().checked_div(dim).unwrap_or(0);
                if dim == 0 || n_offset.checked_mul(dim) != Some(offsets.len()) {
                    return Err(Error::OffsetCountMismatch {
                        declared: n_offset,
                        provided,
                    });
                }
                Ok(Region::Custom {
                    offsets: offsets.to_vec(),
                })
            }
            other => Err(Error::invalid_argument(
                "region_type",
                format!("expected 0 (hypercube), 1 (hypercross) or 2 (custom), got {other}"),
            )),
        }
    }

    /// Integer code of this region type
    pub fn code(&self) -> i32 {
        match self {
            Region::Hypercube => 0,
            Region::Hypercross => 1,
            Region::Custom { .. } => 2,
        }
    }

    /// Fingerprint folded into cache keys; `None` for the default hypercube.
    pub fn fingerprint(&self) -> Option<u64> {
        match self {
            Region::Hypercube => None,
            Region::Hypercross => Some(fingerprint_words(&[self.code() as u64])),
            Region::Custom { offsets } => {
                Some(fingerprint_words(&[self.code() as u64, fingerprint(offsets)]))
            }
        }
    }

    /// Number of offsets the footprint has for `kernel_size`.
    pub fn volume(&self, kernel_size: &[i32]) -> usize {
        match self {
            Region::Hypercube => kernel_size.iter().map(|&k| k.max(0) as usize).product(),
            Region::Hypercross => {
                1 + kernel_size
                    .iter()
                    .map(|&k| (k.max(1) - 1) as usize)
                    .sum::<usize>()
            }
            Region::Custom { offsets } => offsets.len().checked_div(kernel_size.len()).unwrap_or(0),
        }
    }
}

/// Kernel positions along one axis, in kernel units.
///
/// Odd sizes are centred on zero; even sizes start at zero and extend
/// forward.
#[inline]
fn axis_positions(kernel_size: i32) -> std::ops::Range<i32> {
    let lo = if kernel_size % 2 == 1 {
        -(kernel_size - 1) / 2
    } else {
        0
    };
    lo..lo + kernel_size
}

/// Ordered kernel offsets in coordinate units.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KernelRegion {
    offsets: Vec<CoordVec>,
}

impl KernelRegion {
    /// Enumerate the footprint.
    ///
    /// `unit` is the pixel distance of the coordinate set being probed;
    /// hypercube and hypercross offsets are scaled by `dilation * unit`,
    /// custom offsets by `unit` only.
    pub fn new(kernel_size: &[i32], dilation: &[i32], unit: &[i32], region: &Region) -> Result<Self> {
        let dim = unit.len();
        if dim == 0 {
            return Err(Error::invalid_argument("unit", "needs at least one spatial dimension"));
        }
        validate_positive_vec(kernel_size, dim, "kernel_size")?;
        validate_positive_vec(dilation, dim, "dilation")?;
        let offsets = match region {
            Region::Hypercube => hypercube(kernel_size, &offset_scale(kernel_size, dilation, unit)?),
            Region::Hypercross => hypercross(kernel_size, &offset_scale(kernel_size, dilation, unit)?),
            Region::Custom { offsets } => {
                if offsets.len() % dim != 0 {
                    return Err(Error::OffsetCountMismatch {
                        declared: offsets.len() / dim,
                        provided: offsets.len() / dim,
                    });
                }
                offsets
                    .chunks_exact(dim)
                    .map(|o| {
                        o.iter()
                            .zip(unit)
                            .map(|(&v, &u)| v.checked_mul(u).ok_or_else(|| offset_overflow(v, u)))
                            .collect::<Result<CoordVec>>()
                    })
                    .collect::<Result<Vec<_>>>()?
            }
        };
        Ok(Self { offsets })
    }

    /// Number of offsets
    #[inline]
    pub fn volume(&self) -> usize {
        self.offsets.len()
    }

    /// Offsets in kernel-index order
    #[inline]
    pub fn offsets(&self) -> &[CoordVec] {
        &self.offsets
    }

    /// Iterate `(k, offset)` pairs
    pub fn iter(&self) -> impl Iterator<Item = (usize, &[i32])> {
        self.offsets.iter().map(|o| o.as_slice()).enumerate()
    }
}

fn offset_overflow(position: i32, scale: i32) -> Error {
    Error::invalid_argument(
        "kernel_size",
        format!("offset {position} x {scale} leaves the i32 coordinate range"),
    )
}

/// Per-axis step `dilation * unit`, checked so that every kernel position
/// times its step stays inside `i32`.
fn offset_scale(kernel_size: &[i32], dilation: &[i32], unit: &[i32]) -> Result<CoordVec> {
    kernel_size
        .iter()
        .zip(dilation)
        .zip(unit)
        .map(|((&k, &d), &u)| {
            let scale = d.checked_mul(u).ok_or_else(|| offset_overflow(d, u))?;
            let positions = axis_positions(k);
            let reach = positions.start.abs().max(positions.end - 1);
            reach.checked_mul(scale).ok_or_else(|| offset_overflow(reach, scale))?;
            Ok(scale)
        })
        .collect()
}

fn hypercube(kernel_size: &[i32], scale: &[i32]) -> Vec<CoordVec> {
    let volume: usize = kernel_size.iter().map(|&k| k as usize).product();
    let starts: CoordVec = kernel_size.iter().map(|&k| axis_positions(k).start).collect();
    (0..volume)
        .map(|mut index| {
            // dimension 0 varies fastest
            kernel_size
                .iter()
                .zip(&starts)
                .zip(scale)
                .map(|((&k, &start), &s)| {
                    let digit = (index % k as usize) as i32;
                    index /= k as usize;
                    (start + digit) * s
                })
                .collect()
        })
        .collect()
}

fn hypercross(kernel_size: &[i32], scale: &[i32]) -> Vec<CoordVec> {
    let dim = kernel_size.len();
    let mut offsets = vec![smallvec::smallvec![0; dim]];
    for (d, (&k, &s)) in kernel_size.iter().zip(scale).enumerate() {
        for position in axis_positions(k).filter(|&p| p != 0) {
            let mut offset: CoordVec = smallvec::smallvec![0; dim];
            offset[d] = position * s;
            offsets.push(offset);
        }
    }
    offsets
}

#[cfg(test)]
mod tests {
    use super::*;

    fn as_vecs(region: &KernelRegion) -> Vec<Vec<i32>> {
        region.offsets().iter().map(|o| o.to_vec()).collect()
    }

    #[test]
    fn test_hypercube_3x3_order() {
        let region = KernelRegion::new(&[3, 3], &[1, 1], &[1, 1], &Region::Hypercube).unwrap();
        assert_eq!(region.volume(), 9);
        assert_eq!(
            as_vecs(&region),
            vec![
                vec![-1, -1],
                vec![0, -1],
                vec![1, -1],
                vec![-1, 0],
                vec![0, 0],
                vec![1, 0],
                vec![-1, 1],
                vec![0, 1],
                vec![1, 1],
            ]
        );
    }

    #[test]
    fn test_hypercross_3x3() {
        let region = KernelRegion::new(&[3, 3], &[1, 1], &[1, 1], &Region::Hypercross).unwrap();
        assert_eq!(region.volume(), 5);
        assert_eq!(
            as_vecs(&region),
            vec![vec![0, 0], vec![-1, 0], vec![1, 0], vec![0, -1], vec![0, 1]]
        );
        assert_eq!(Region::Hypercross.volume(&[3, 3]), 5);
    }

    #[test]
    fn test_even_kernel_extends_forward() {
        let region = KernelRegion::new(&[2], &[1], &[4], &Region::Hypercube).unwrap();
        assert_eq!(as_vecs(&region), vec![vec![0], vec![4]]);
    }

    #[test]
    fn test_dilation_and_unit_scale_offsets() {
        let region = KernelRegion::new(&[3, 1], &[2, 1], &[2, 2], &Region::Hypercube).unwrap();
        assert_eq!(as_vecs(&region), vec![vec![-4, 0], vec![0, 0], vec![4, 0]]);
    }

    #[test]
    fn test_custom_offsets_keep_order() {
        let region = Region::from_raw(2, &[1, 0, 0, 0, -1, 1], 3, 2).unwrap();
        let kernel = KernelRegion::new(&[3, 3], &[5, 5], &[2, 2], &region).unwrap();
        assert_eq!(as_vecs(&kernel), vec![vec![2, 0], vec![0, 0], vec![-2, 2]]);
        assert_eq!(region.volume(&[3, 3]), 3);
    }

    #[test]
    fn test_custom_offset_count_must_match() {
        let err = Region::from_raw(2, &[1, 0, 0, 0], 3, 2).unwrap_err();
        assert_eq!(
            err,
            Error::OffsetCountMismatch {
                declared: 3,
                provided: 2
            }
        );
    }

    #[test]
    fn test_unknown_region_type() {
        assert!(matches!(
            Region::from_raw(7, &[], 0, 2),
            Err(Error::InvalidArgument { arg: "region_type", .. })
        ));
    }

    #[test]
    fn test_huge_declared_offset_count() {
        let err = Region::from_raw(2, &[1, 0], usize::MAX, 2).unwrap_err();
        assert_eq!(
            err,
            Error::OffsetCountMismatch {
                declared: usize::MAX,
                provided: 1
            }
        );
    }

    #[test]
    fn test_offsets_outside_i32_rejected() {
        let unit = [i32::MAX / 2 + 1];
        assert!(matches!(
            KernelRegion::new(&[5], &[1], &unit, &Region::Hypercube),
            Err(Error::InvalidArgument { arg: "kernel_size", .. })
        ));
        assert!(KernelRegion::new(&[3], &[3], &[i32::MAX / 2], &Region::Hypercross).is_err());
        let custom = Region::from_raw(2, &[3], 1, 1).unwrap();
        assert!(KernelRegion::new(&[1], &[1], &[i32::MAX / 2], &custom).is_err());
        // the largest representable step is fine
        let region = KernelRegion::new(&[3], &[1], &[i32::MAX], &Region::Hypercube).unwrap();
        assert_eq!(as_vecs(&region), vec![vec![-i32::MAX], vec![0], vec![i32::MAX]]);
    }

    #[test]
    fn test_rejects_zero_kernel_size() {
        assert!(KernelRegion::new(&[0, 3], &[1, 1], &[1, 1], &Region::Hypercube).is_err());
    }
}
