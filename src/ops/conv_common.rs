//! Shared validation and views for sparse operations.
//!
//! Every backend validates buffers the same way before any kernel writes, so
//! a failing call leaves caller buffers untouched.

use crate::coords::{CoordVec, ParameterKey, derive_key, out_pixel_dist, validate_positive_vec};
use crate::error::{Error, Result};
use crate::kernel::{InOutMap, Region};

/// Geometry of a convolution or pooling layer.
///
/// All vectors have one entry per spatial dimension. `pixel_dist` is the
/// stride of the input coordinate set, `stride` the step of the layer itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConvParams {
    /// Stride of the input coordinate set
    pub pixel_dist: CoordVec,
    /// Layer stride
    pub stride: CoordVec,
    /// Kernel extent per axis
    pub kernel_size: CoordVec,
    /// Kernel dilation per axis
    pub dilation: CoordVec,
    /// Footprint shape
    pub region: Region,
}

impl ConvParams {
    /// Hypercube layer geometry
    pub fn new(pixel_dist: &[i32], stride: &[i32], kernel_size: &[i32], dilation: &[i32]) -> Self {
        Self {
            pixel_dist: CoordVec::from_slice(pixel_dist),
            stride: CoordVec::from_slice(stride),
            kernel_size: CoordVec::from_slice(kernel_size),
            dilation: CoordVec::from_slice(dilation),
            region: Region::Hypercube,
        }
    }

    /// Replace the footprint shape
    pub fn with_region(mut self, region: Region) -> Self {
        self.region = region;
        self
    }

    /// Number of spatial dimensions
    #[inline]
    pub fn dim(&self) -> usize {
        self.pixel_dist.len()
    }

    /// Validates every vector against `dim`.
    pub fn validate(&self, dim: usize) -> Result<()> {
        validate_positive_vec(&self.pixel_dist, dim, "pixel_dist")?;
        validate_positive_vec(&self.stride, dim, "stride")?;
        validate_positive_vec(&self.kernel_size, dim, "kernel_size")?;
        validate_positive_vec(&self.dilation, dim, "dilation")?;
        if let Region::Custom { offsets } = &self.region {
            if offsets.len() % dim != 0 {
                return Err(Error::OffsetCountMismatch {
                    declared: offsets.len() / dim,
                    provided: offsets.len() / dim,
                });
            }
        }
        Ok(())
    }

    /// Cache key of the kernel map for this geometry
    pub fn key(&self, is_transpose: bool) -> ParameterKey {
        derive_key(
            &self.pixel_dist,
            &self.stride,
            &self.kernel_size,
            &self.dilation,
            is_transpose,
        )
        .with_region(&self.region)
    }

    /// Stride of the output coordinate set
    pub fn out_pixel_dist(&self, is_transpose: bool) -> Result<CoordVec> {
        out_pixel_dist(&self.pixel_dist, &self.stride, is_transpose)
    }
}

/// A kernel map together with the row counts of the two sets it connects.
///
/// Kernels trust row indices inside the map; carrying the set sizes lets
/// callers check buffer lengths before anything is written.
#[derive(Debug, Clone, Copy)]
pub struct MapView<'a> {
    /// Row pairing per kernel offset
    pub map: &'a InOutMap,
    /// Rows in the input coordinate set
    pub in_rows: usize,
    /// Rows in the output coordinate set
    pub out_rows: usize,
}

impl<'a> MapView<'a> {
    /// Bundle a map with its set sizes
    pub fn new(map: &'a InOutMap, in_rows: usize, out_rows: usize) -> Self {
        Self {
            map,
            in_rows,
            out_rows,
        }
    }

    /// Number of kernel offsets
    #[inline]
    pub fn volume(&self) -> usize {
        self.map.volume()
    }
}

/// Channel counts of a convolution
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConvChannels {
    /// Input feature channels
    pub c_in: usize,
    /// Output feature channels
    pub c_out: usize,
}

impl ConvChannels {
    /// Create a channel pair
    pub fn new(c_in: usize, c_out: usize) -> Self {
        Self { c_in, c_out }
    }
}

/// Validates that a channel count is non-zero.
#[inline]
pub fn validate_channels(value: usize, name: &'static str, op: &'static str) -> Result<()> {
    if value == 0 {
        return Err(Error::InvalidArgument {
            arg: name,
            reason: format!("{} requires {} > 0, got 0", op, name),
        });
    }
    Ok(())
}

/// Validates that a row-major feature buffer holds `rows × channels` values.
#[inline]
pub fn validate_features(len: usize, rows: usize, channels: usize) -> Result<()> {
    if len != rows * channels {
        return Err(Error::shape_mismatch(&[rows, channels], &[len]));
    }
    Ok(())
}

/// Validates that a weight buffer holds `volume × c_in × c_out` values.
#[inline]
pub fn validate_kernel(len: usize, volume: usize, channels: ConvChannels) -> Result<()> {
    if len != volume * channels.c_in * channels.c_out {
        return Err(Error::shape_mismatch(
            &[volume, channels.c_in, channels.c_out],
            &[len],
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_conv_params_key_and_output_stride() {
        let params = ConvParams::new(&[2, 2], &[2, 2], &[3, 3], &[1, 1]);
        assert!(params.validate(2).is_ok());
        assert_eq!(params.key(false), derive_key(&[2, 2], &[2, 2], &[3, 3], &[1, 1], false));
        assert_eq!(params.out_pixel_dist(false).unwrap().as_slice(), &[4, 4]);
        assert_eq!(params.out_pixel_dist(true).unwrap().as_slice(), &[1, 1]);

        let cross = params.clone().with_region(Region::Hypercross);
        assert_ne!(cross.key(false), params.key(false));
    }

    #[test]
    fn test_conv_params_validate() {
        let params = ConvParams::new(&[1, 1], &[1, 0], &[3, 3], &[1, 1]);
        assert!(matches!(
            params.validate(2),
            Err(Error::InvalidArgument { arg: "stride", .. })
        ));
        let params = ConvParams::new(&[1, 1], &[1, 1], &[3, 3], &[1, 1]);
        assert!(matches!(
            params.validate(3),
            Err(Error::DimensionMismatch { expected: 3, got: 2 })
        ));
    }

    #[test]
    fn test_validate_features() {
        assert!(validate_features(12, 4, 3).is_ok());
        assert_eq!(
            validate_features(10, 4, 3).unwrap_err(),
            Error::shape_mismatch(&[4, 3], &[10])
        );
    }

    #[test]
    fn test_validate_kernel() {
        let channels = ConvChannels::new(2, 3);
        assert!(validate_kernel(54, 9, channels).is_ok());
        assert!(validate_kernel(53, 9, channels).is_err());
    }

    #[test]
    fn test_validate_channels() {
        assert!(validate_channels(0, "nchannel", "max_pool_fw").is_err());
        assert!(validate_channels(1, "nchannel", "max_pool_fw").is_ok());
    }
}
