//! Status-code entry points driven the way a binding layer calls them

mod common;

use sparseconv::api::{self, Handle, KernelArgs, SparseRuntime};
use sparseconv::runtime::cpu::CpuRuntime;

const COORDS: [i32; 15] = [0, 0, 0, 1, 0, 0, 0, 1, 0, 1, 1, 0, 2, 2, 0];

fn full_flow<R: SparseRuntime>() {
    let _guard = common::init_test_subscriber();
    let mut handle: Handle<R> = None;
    assert_eq!(api::initialize_coords(&mut handle, &COORDS, &[1, 1]), 0);
    assert!(handle.is_some());
    assert_eq!(api::initialize_coords(&mut handle, &COORDS, &[1, 1]), -7);

    assert_eq!(api::initialize_out_coords(&mut handle, &[1, 1], &[2, 2], false), 0);
    let mut nrows = 0i64;
    assert_eq!(api::get_num_coords(&mut handle, &[2, 2], &mut nrows), 0);
    assert_eq!(nrows, 2);

    let down = KernelArgs::new(&[1, 1], &[2, 2], &[2, 2], &[1, 1]);
    let in_feat = [1.0f32, 2.0, 3.0, 4.0, 5.0];
    let kernel = [1.0f32; 4];
    let mut out = [0.0f32; 2];
    assert_eq!(api::conv_fw(&mut handle, &in_feat, 1, &mut out, 1, &kernel, &down), 0);
    assert_eq!(out, [10.0, 5.0]);

    let mut grad_in = [0.0f32; 5];
    let mut grad_kernel = [0.0f32; 4];
    let status = api::conv_bw(
        &mut handle,
        &in_feat,
        &mut grad_in,
        1,
        &[1.0, 1.0],
        1,
        &kernel,
        &mut grad_kernel,
        &down,
    );
    assert_eq!(status, 0);
    assert_eq!(grad_in, [1.0; 5]);
    assert_eq!(grad_kernel, [6.0, 2.0, 3.0, 4.0]);

    let up = KernelArgs::new(&[2, 2], &[2, 2], &[2, 2], &[1, 1]);
    let mut fine = [0.0f32; 5];
    assert_eq!(api::conv_tr_fw(&mut handle, &out, 1, &mut fine, 1, &kernel, &up), 0);
    assert_eq!(fine, [10.0, 10.0, 10.0, 10.0, 5.0]);
    let mut grad_coarse = [0.0f32; 2];
    let status = api::conv_tr_bw(
        &mut handle,
        &out,
        &mut grad_coarse,
        1,
        &[1.0; 5],
        1,
        &kernel,
        &mut grad_kernel,
        &up,
    );
    assert_eq!(status, 0);
    assert_eq!(grad_coarse, [4.0, 1.0]);

    let mut coarse = [0i32; 6];
    assert_eq!(api::get_coords(&mut handle, &mut coarse, &[2, 2]), 0);
    assert_eq!(coarse, [0, 0, 0, 2, 2, 0]);

    let mut rows = [0i64; 2];
    assert_eq!(api::get_index_map(&mut handle, &[1, 1, 0, 9, 9, 0], &mut rows, &[1, 1]), 0);
    assert_eq!(rows, [3, -1]);

    let mut permutation = [0i64; 5];
    assert_eq!(api::get_permutation(&mut handle, &mut permutation, &[1, 1], &[2, 2]), 0);
    assert_eq!(permutation, [0, 0, 0, 0, 1]);

    let pool = KernelArgs::new(&[1, 1], &[2, 2], &[2, 2], &[1, 1]);
    let mut pooled = [0.0f32; 2];
    let mut mask = [0i64; 2];
    assert_eq!(api::max_pooling_fw(&mut handle, &in_feat, &mut pooled, &mut mask, 1, &pool), 0);
    assert_eq!(pooled, [4.0, 5.0]);
    assert_eq!(mask, [3, 4]);

    assert_eq!(api::clear(&mut handle), 0);
    assert!(handle.is_some());
    assert_eq!(api::get_num_coords(&mut handle, &[1, 1], &mut nrows), -1);
}

#[test]
fn test_full_flow_serial() {
    full_flow::<CpuRuntime>();
}

#[cfg(feature = "rayon")]
#[test]
fn test_full_flow_parallel() {
    full_flow::<sparseconv::runtime::parallel::ParallelRuntime>();
}

#[test]
fn test_failure_codes() {
    let mut handle: Handle<CpuRuntime> = None;
    assert_eq!(api::clear(&mut handle), 0);
    assert!(handle.is_none());

    assert_eq!(api::initialize_coords(&mut handle, &[0, 0, 0, 0, 0, 0], &[1, 1]), -3);
    assert_eq!(api::initialize_coords(&mut handle, &[0, 0, 0, 2, 2, 0], &[2, 2]), 0);

    // transposed convolution into a finer set that was never registered
    let up = KernelArgs::new(&[2, 2], &[2, 2], &[2, 2], &[1, 1]);
    let mut out = [0.0f64; 4];
    assert_eq!(api::conv_tr_fw(&mut handle, &[1.0, 1.0], 1, &mut out, 1, &[1.0; 4], &up), -1);

    // declared offset count disagrees with the offsets provided
    let custom = KernelArgs::new(&[2, 2], &[1, 1], &[3, 3], &[1, 1]).with_region(2, &[0, 1, 1], 2);
    assert_eq!(api::conv_fw(&mut handle, &[1.0, 1.0], 1, &mut out[..2], 1, &[1.0; 2], &custom), -2);

    // 2 is not a multiple of 3
    let mut permutation = [0i64; 2];
    assert_eq!(api::get_permutation(&mut handle, &mut permutation, &[2, 2], &[3, 3]), -4);
    assert_eq!(api::initialize_origin_coords(&mut handle, &[2, 2], -1), -4);

    let mut nrows = 0i64;
    assert_eq!(api::get_num_coords(&mut handle, &[1, 1, 1], &mut nrows), -2);
    assert_eq!(api::get_num_coords(&mut handle, &[2, 2], &mut nrows), 0);
    assert_eq!(nrows, 2);

    let mut grad = [0.0f64; 2];
    let mut grad_kernel = [0.0f64; 4];
    let down = KernelArgs::new(&[2, 2], &[2, 2], &[2, 2], &[1, 1]);
    let status = api::conv_bw(
        &mut handle,
        &[1.0, 1.0],
        &mut grad,
        1,
        &[1.0],
        1,
        &[1.0; 4],
        &mut grad_kernel,
        &down,
    );
    assert_eq!(status, -1);
}
