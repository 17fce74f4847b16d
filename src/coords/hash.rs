//! Fingerprints and cache keys
//!
//! Every cache lookup in the metadata is keyed by a 64-bit fingerprint of one
//! or more integer vectors. The fingerprint is a fixed-seed FNV accumulation
//! over the values sign-extended to 64 bits; it is order sensitive and stable
//! across processes, so identical parameters always produce identical keys.

use super::coord::CoordVec;
use crate::error::{Error, Result};
use crate::kernel::Region;
use std::hash::{BuildHasherDefault, Hash, Hasher};

const FNV_OFFSET: u64 = 14_695_981_039_346_656_037;
const FNV_PRIME: u64 = 1_099_511_628_211;

#[inline]
fn fold(hash: u64, value: u64) -> u64 {
    hash.wrapping_mul(FNV_PRIME) ^ value
}

/// Fingerprint of an integer vector (coordinate, stride, kernel size, ...).
#[inline]
pub fn fingerprint(values: &[i32]) -> u64 {
    values
        .iter()
        .fold(FNV_OFFSET, |h, &v| fold(h, v as i64 as u64))
}

/// Fingerprint of a sequence of already-hashed words.
#[inline]
pub fn fingerprint_words(words: &[u64]) -> u64 {
    words.iter().fold(FNV_OFFSET, |h, &w| fold(h, w))
}

/// Hasher that forwards a precomputed fingerprint.
///
/// Keys in this crate hash themselves with [`fingerprint`] and call
/// `write_u64` exactly once; arbitrary byte input falls back to FNV.
#[derive(Default, Clone, Copy, Debug)]
pub struct FingerprintHasher(u64);

impl Hasher for FingerprintHasher {
    #[inline]
    fn finish(&self) -> u64 {
        self.0
    }

    #[inline]
    fn write_u64(&mut self, value: u64) {
        self.0 = value;
    }

    fn write(&mut self, bytes: &[u8]) {
        let seed = if self.0 == 0 { FNV_OFFSET } else { self.0 };
        self.0 = bytes.iter().fold(seed, |h, &b| fold(h, b as u64));
    }
}

/// `BuildHasher` for maps keyed by [`super::Coord`] or [`ParameterKey`]
pub type FingerprintBuildHasher = BuildHasherDefault<FingerprintHasher>;

/// Key identifying one kernel-map computation.
///
/// The five fields are, in order: fingerprint of the input pixel distance,
/// of the convolution stride, of the kernel size, of the dilation, and the
/// transpose flag. Regions other than the default hypercube fold their
/// description into the kernel-size field (see [`ParameterKey::with_region`]).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ParameterKey {
    /// Fingerprint of the input stride (pixel distance)
    pub pixel_dist: u64,
    /// Fingerprint of the convolution stride
    pub stride: u64,
    /// Fingerprint of the kernel size (and non-default region)
    pub kernel_size: u64,
    /// Fingerprint of the dilation
    pub dilation: u64,
    /// Whether the map is for a transposed convolution
    pub is_transpose: bool,
}

impl ParameterKey {
    /// Fold a non-default region description into the key.
    pub fn with_region(mut self, region: &Region) -> Self {
        if let Some(region_hash) = region.fingerprint() {
            self.kernel_size = fingerprint_words(&[self.kernel_size, region_hash]);
        }
        self
    }

    /// Single-word fingerprint of the whole key
    pub fn fingerprint(&self) -> u64 {
        fingerprint_words(&[
            self.pixel_dist,
            self.stride,
            self.kernel_size,
            self.dilation,
            self.is_transpose as u64,
        ])
    }
}

impl Hash for ParameterKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        state.write_u64(self.fingerprint());
    }
}

/// Derive the cache key for a convolution-like operation.
pub fn derive_key(
    pixel_dist: &[i32],
    stride: &[i32],
    kernel_size: &[i32],
    dilation: &[i32],
    is_transpose: bool,
) -> ParameterKey {
    ParameterKey {
        pixel_dist: fingerprint(pixel_dist),
        stride: fingerprint(stride),
        kernel_size: fingerprint(kernel_size),
        dilation: fingerprint(dilation),
        is_transpose,
    }
}

/// Key of the per-batch global reduction map for a coordinate set.
///
/// Stride, kernel size and dilation are all the zero vector.
pub fn global_key(pixel_dist: &[i32]) -> ParameterKey {
    let zeros: CoordVec = smallvec::smallvec![0; pixel_dist.len()];
    derive_key(pixel_dist, &zeros, &zeros, &zeros, false)
}

/// Stride vector of the per-batch origin coordinate set.
pub fn origin_stride(dim: usize) -> CoordVec {
    smallvec::smallvec![0; dim]
}

/// Pixel distance of the output of a (transposed) convolution.
///
/// Forward convolution multiplies by the stride; transposed convolution
/// divides and requires the division to be exact.
pub fn out_pixel_dist(pixel_dist: &[i32], stride: &[i32], is_transpose: bool) -> Result<CoordVec> {
    if pixel_dist.len() != stride.len() {
        return Err(Error::DimensionMismatch {
            expected: pixel_dist.len(),
            got: stride.len(),
        });
    }
    pixel_dist
        .iter()
        .zip(stride)
        .map(|(&p, &s)| {
            if !is_transpose {
                return p.checked_mul(s).ok_or_else(|| {
                    Error::invalid_argument(
                        "stride",
                        format!("pixel distance {p} x stride {s} leaves the i32 range"),
                    )
                });
            }
            if p % s != 0 {
                return Err(Error::invalid_argument(
                    "stride",
                    format!("transposed stride {s} does not divide pixel distance {p}"),
                ));
            }
            Ok(p / s)
        })
        .collect()
}

/// Validates a per-dimension parameter vector: right length, all positive.
pub fn validate_positive_vec(values: &[i32], dim: usize, arg: &'static str) -> Result<()> {
    if values.len() != dim {
        return Err(Error::DimensionMismatch {
            expected: dim,
            got: values.len(),
        });
    }
    if let Some(v) = values.iter().find(|&&v| v <= 0) {
        return Err(Error::invalid_argument(
            arg,
            format!("all components must be > 0, got {v}"),
        ));
    }
    Ok(())
}
