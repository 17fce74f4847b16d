//! Coordinates at the edges of the i32 range

mod common;

use common::metadata_with;
use sparseconv::api::{self, Handle};
use sparseconv::error::Error;
use sparseconv::metadata::Metadata;
use sparseconv::ops::{ConvChannels, ConvParams, GlobalOps, SparseConvOps, SparsePoolingOps};
use sparseconv::runtime::Runtime;
use sparseconv::runtime::cpu::CpuRuntime;

// (x, batch) rows for a 1D set
const ENDS: [i32; 4] = [i32::MIN, 0, i32::MAX, 0];

fn ends_have_no_neighbours<R: Runtime>()
where
    R::Client: SparseConvOps + SparsePoolingOps + GlobalOps,
{
    let _guard = common::init_test_subscriber();
    let mut meta = metadata_with::<R>(&ENDS, &[1]);
    let params = ConvParams::new(&[1], &[1], &[3], &[1]);
    // only the +-1 offsets carry weight; the centre is zeroed
    let kernel = [1.0, 0.0, 1.0];
    let mut out = [0.0; 2];
    meta.conv_fw(&params, false, &[1.0, 2.0], &kernel, &mut out, ConvChannels::new(1, 1))
        .unwrap();
    assert_eq!(out, [0.0, 0.0]);

    let map = meta.kernel_map(&params, false).unwrap();
    assert_eq!(map.num_pairs(), 2);
}

#[test]
fn test_range_ends_do_not_wrap_into_each_other() {
    ends_have_no_neighbours::<CpuRuntime>();
}

#[cfg(feature = "rayon")]
#[test]
fn test_range_ends_do_not_wrap_into_each_other_parallel() {
    ends_have_no_neighbours::<sparseconv::runtime::parallel::ParallelRuntime>();
}

#[test]
fn test_convolution_at_lowest_coordinate() {
    let mut meta = metadata_with::<CpuRuntime>(&[i32::MIN, 0], &[1]);
    let params = ConvParams::new(&[1], &[1], &[3], &[1]);
    let mut out = [0.0f32; 1];
    meta.conv_fw(&params, false, &[3.0f32], &[5.0, 7.0, 11.0], &mut out, ConvChannels::new(1, 1))
        .unwrap();
    assert_eq!(out, [21.0]);
}

#[test]
fn test_strided_output_outside_range_is_rejected() {
    let mut meta = metadata_with::<CpuRuntime>(&[i32::MIN, 0], &[1]);
    let err = meta.initialize_out_coords(&[1], &[3], false).unwrap_err();
    assert!(matches!(err, Error::InvalidArgument { arg: "coords", .. }));
    assert_eq!(meta.num_coord_sets(), 1);
    assert!(meta.num_coords(&[3]).is_err());

    // stride 2 keeps i32::MIN on the lattice
    assert_eq!(meta.initialize_out_coords(&[1], &[2], false).unwrap(), 1);
}

#[test]
fn test_output_pixel_distance_overflow() {
    let mut meta = Metadata::<CpuRuntime>::new(1).unwrap();
    let big = i32::MAX / 2 + 1;
    meta.initialize_coords(&[0, 0], &[big], Default::default())
        .unwrap();
    let err = meta.initialize_out_coords(&[big], &[2], false).unwrap_err();
    assert!(matches!(err, Error::InvalidArgument { arg: "stride", .. }));
    assert_eq!(meta.num_coord_sets(), 1);
}

#[test]
fn test_api_reports_range_errors_as_invalid_argument() {
    let mut handle: Handle<CpuRuntime> = None;
    assert_eq!(api::initialize_coords(&mut handle, &[i32::MIN, 0], &[1]), 0);
    assert_eq!(api::initialize_out_coords(&mut handle, &[1], &[3], false), -4);
    assert_eq!(api::initialize_out_coords(&mut handle, &[1], &[2], false), 0);
}
