//! Validation + CPU kernel dispatch for sparse operations.

use crate::dtype::Element;
use crate::error::{Error, Result};
use crate::ops::conv_common::{validate_channels, validate_features, validate_kernel};
use crate::ops::{BroadcastOp, ConvChannels, MapView};
use crate::runtime::cpu::kernels;

/// Buffer checks shared by every forward convolution.
pub(crate) fn check_conv_fw(
    map: MapView<'_>,
    in_len: usize,
    kernel_len: usize,
    out_len: usize,
    channels: ConvChannels,
) -> Result<()> {
    validate_channels(channels.c_in, "in_channels", "sparse_conv_fw")?;
    validate_channels(channels.c_out, "out_channels", "sparse_conv_fw")?;
    validate_features(in_len, map.in_rows, channels.c_in)?;
    validate_features(out_len, map.out_rows, channels.c_out)?;
    validate_kernel(kernel_len, map.volume(), channels)
}

/// Buffer checks shared by every backward convolution.
pub(crate) fn check_conv_bw(
    map: MapView<'_>,
    in_len: usize,
    grad_out_len: usize,
    kernel_len: usize,
    grad_in_len: usize,
    grad_kernel_len: usize,
    channels: ConvChannels,
) -> Result<()> {
    validate_channels(channels.c_in, "in_channels", "sparse_conv_bw")?;
    validate_channels(channels.c_out, "out_channels", "sparse_conv_bw")?;
    validate_features(in_len, map.in_rows, channels.c_in)?;
    validate_features(grad_in_len, map.in_rows, channels.c_in)?;
    validate_features(grad_out_len, map.out_rows, channels.c_out)?;
    validate_kernel(kernel_len, map.volume(), channels)?;
    validate_kernel(grad_kernel_len, map.volume(), channels)
}

/// Forward sparse convolution
pub fn sparse_conv_fw_impl<T: Element>(
    map: MapView<'_>,
    in_feat: &[T],
    kernel: &[T],
    out_feat: &mut [T],
    channels: ConvChannels,
) -> Result<()> {
    check_conv_fw(map, in_feat.len(), kernel.len(), out_feat.len(), channels)?;
    kernels::conv_fw_kernel(
        map.map,
        in_feat,
        channels.c_in,
        kernel,
        channels.c_out,
        out_feat,
    );
    Ok(())
}

/// Backward sparse convolution
#[allow(clippy::too_many_arguments)]
pub fn sparse_conv_bw_impl<T: Element>(
    map: MapView<'_>,
    in_feat: &[T],
    grad_out: &[T],
    kernel: &[T],
    grad_in: &mut [T],
    grad_kernel: &mut [T],
    channels: ConvChannels,
) -> Result<()> {
    check_conv_bw(
        map,
        in_feat.len(),
        grad_out.len(),
        kernel.len(),
        grad_in.len(),
        grad_kernel.len(),
        channels,
    )?;
    kernels::conv_bw_kernel(
        map.map,
        in_feat,
        grad_out,
        channels.c_in,
        kernel,
        channels.c_out,
        grad_in,
        grad_kernel,
    );
    Ok(())
}

/// Max pooling forward
pub fn max_pool_fw_impl<T: Element>(
    map: MapView<'_>,
    in_feat: &[T],
    out_feat: &mut [T],
    mask: &mut [i64],
    nchannel: usize,
) -> Result<()> {
    validate_channels(nchannel, "nchannel", "max_pool_fw")?;
    validate_features(in_feat.len(), map.in_rows, nchannel)?;
    validate_features(out_feat.len(), map.out_rows, nchannel)?;
    validate_features(mask.len(), map.out_rows, nchannel)?;

    kernels::max_pool_fw_kernel(map.map, in_feat, nchannel, out_feat, mask);
    Ok(())
}

/// Max pooling backward
pub fn max_pool_bw_impl<T: Element>(
    map: MapView<'_>,
    grad_out: &[T],
    mask: &[i64],
    grad_in: &mut [T],
    nchannel: usize,
) -> Result<()> {
    validate_channels(nchannel, "nchannel", "max_pool_bw")?;
    validate_features(grad_out.len(), map.out_rows, nchannel)?;
    validate_features(mask.len(), map.out_rows, nchannel)?;
    validate_features(grad_in.len(), map.in_rows, nchannel)?;
    if let Some(&bad) = mask.iter().find(|&&m| m >= map.in_rows as i64) {
        return Err(Error::invalid_argument(
            "mask",
            format!("row {bad} out of range for {} input rows", map.in_rows),
        ));
    }

    kernels::max_pool_bw_kernel(grad_out, mask, nchannel, grad_in);
    Ok(())
}

/// Average pooling forward
pub fn avg_pool_fw_impl<T: Element>(
    map: MapView<'_>,
    in_feat: &[T],
    out_feat: &mut [T],
    num_nonzero: &mut [T],
    nchannel: usize,
) -> Result<()> {
    validate_channels(nchannel, "nchannel", "avg_pool_fw")?;
    validate_features(in_feat.len(), map.in_rows, nchannel)?;
    validate_features(out_feat.len(), map.out_rows, nchannel)?;
    validate_features(num_nonzero.len(), map.out_rows, 1)?;

    kernels::avg_pool_fw_kernel(map.map, in_feat, nchannel, out_feat, num_nonzero);
    Ok(())
}

/// Average pooling backward
pub fn avg_pool_bw_impl<T: Element>(
    map: MapView<'_>,
    grad_out: &[T],
    num_nonzero: &[T],
    grad_in: &mut [T],
    nchannel: usize,
) -> Result<()> {
    validate_channels(nchannel, "nchannel", "avg_pool_bw")?;
    validate_features(grad_out.len(), map.out_rows, nchannel)?;
    validate_features(num_nonzero.len(), map.out_rows, 1)?;
    validate_features(grad_in.len(), map.in_rows, nchannel)?;

    kernels::avg_pool_bw_kernel(map.map, grad_out, num_nonzero, nchannel, grad_in);
    Ok(())
}

/// Global broadcast forward
pub fn broadcast_fw_impl<T: Element>(
    map: MapView<'_>,
    in_feat: &[T],
    global_feat: &[T],
    out_feat: &mut [T],
    nchannel: usize,
    op: BroadcastOp,
) -> Result<()> {
    validate_channels(nchannel, "nchannel", "broadcast_fw")?;
    validate_features(in_feat.len(), map.in_rows, nchannel)?;
    validate_features(global_feat.len(), map.out_rows, nchannel)?;
    validate_features(out_feat.len(), map.in_rows, nchannel)?;

    kernels::broadcast_fw_kernel(map.map, in_feat, global_feat, nchannel, op, out_feat);
    Ok(())
}

/// Global broadcast backward
#[allow(clippy::too_many_arguments)]
pub fn broadcast_bw_impl<T: Element>(
    map: MapView<'_>,
    in_feat: &[T],
    global_feat: &[T],
    grad_out: &[T],
    grad_in: &mut [T],
    grad_global: &mut [T],
    nchannel: usize,
    op: BroadcastOp,
) -> Result<()> {
    validate_channels(nchannel, "nchannel", "broadcast_bw")?;
    validate_features(in_feat.len(), map.in_rows, nchannel)?;
    validate_features(grad_out.len(), map.in_rows, nchannel)?;
    validate_features(grad_in.len(), map.in_rows, nchannel)?;
    validate_features(global_feat.len(), map.out_rows, nchannel)?;
    validate_features(grad_global.len(), map.out_rows, nchannel)?;

    kernels::broadcast_bw_kernel(
        map.map,
        in_feat,
        global_feat,
        grad_out,
        nchannel,
        op,
        grad_in,
        grad_global,
    );
    Ok(())
}
