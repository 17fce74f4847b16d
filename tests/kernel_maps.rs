//! Kernel map construction through the metadata cache

mod common;

use common::{coords_2d, metadata_with};
use sparseconv::error::Error;
use sparseconv::kernel::{InOutMap, KernelRegion, Region};
use sparseconv::metadata::Metadata;
use sparseconv::ops::ConvParams;
use sparseconv::runtime::cpu::CpuRuntime;

fn sorted_pairs(map: &InOutMap, k: usize, swap: bool) -> Vec<(usize, usize)> {
    let mut pairs: Vec<_> = map.kernels()[k]
        .iter()
        .map(|(i, o)| if swap { (o, i) } else { (i, o) })
        .collect();
    pairs.sort_unstable();
    pairs
}

#[test]
fn test_transpose_reproduces_forward_pairs() {
    let coords = coords_2d(&[(0, 0, 0), (2, 0, 0), (4, 0, 0), (0, 2, 0)]);
    let mut meta = metadata_with::<CpuRuntime>(&coords, &[1, 1]);

    let forward = ConvParams::new(&[1, 1], &[2, 2], &[2, 2], &[1, 1]);
    meta.ensure_kernel_map(&forward, false).unwrap();
    assert_eq!(meta.num_coords(&[2, 2]).unwrap(), 4);

    let transpose = ConvParams::new(&[2, 2], &[2, 2], &[2, 2], &[1, 1]);
    meta.ensure_kernel_map(&transpose, true).unwrap();

    let fw = meta.kernel_map(&forward, false).unwrap();
    let tr = meta.kernel_map(&transpose, true).unwrap();
    assert_eq!(fw.volume(), 4);
    assert_eq!(tr.volume(), 4);
    assert_eq!(fw.num_pairs(), 4);
    for k in 0..fw.volume() {
        assert_eq!(sorted_pairs(fw, k, true), sorted_pairs(tr, k, false), "offset {k}");
    }
}

#[test]
fn test_transposed_map_needs_registered_output() {
    let coords = coords_2d(&[(0, 0, 0), (2, 2, 0)]);
    let mut meta = metadata_with::<CpuRuntime>(&coords, &[2, 2]);
    let params = ConvParams::new(&[2, 2], &[2, 2], &[2, 2], &[1, 1]);
    let err = meta.ensure_kernel_map(&params, true).unwrap_err();
    assert_eq!(err, Error::missing_coords(&[1, 1]));
    assert_eq!(meta.num_coord_sets(), 1);
    assert_eq!(meta.num_kernel_maps(), 0);
}

#[test]
fn test_hypercross_and_hypercube_volumes() {
    let cube = KernelRegion::new(&[3, 3], &[1, 1], &[1, 1], &Region::Hypercube).unwrap();
    let cross = KernelRegion::new(&[3, 3], &[1, 1], &[1, 1], &Region::Hypercross).unwrap();
    assert_eq!(cube.volume(), 9);
    assert_eq!(cross.volume(), 5);

    let coords = coords_2d(&[(0, 0, 0), (1, 0, 0), (1, 1, 0)]);
    let mut meta = metadata_with::<CpuRuntime>(&coords, &[1, 1]);
    let cube_params = ConvParams::new(&[1, 1], &[1, 1], &[3, 3], &[1, 1]);
    let cross_params = cube_params.clone().with_region(Region::Hypercross);
    let cube_key = meta.ensure_kernel_map(&cube_params, false).unwrap();
    let cross_key = meta.ensure_kernel_map(&cross_params, false).unwrap();
    assert_ne!(cube_key, cross_key);
    assert_eq!(meta.num_kernel_maps(), 2);

    // the diagonal neighbours (0,0)-(1,1) are only inside the hypercube
    assert_eq!(meta.kernel_map(&cube_params, false).unwrap().num_pairs(), 9);
    assert_eq!(meta.kernel_map(&cross_params, false).unwrap().num_pairs(), 7);
}

#[test]
fn test_custom_region_keeps_caller_order() {
    let coords = coords_2d(&[(0, 0, 0), (1, 0, 0), (0, 1, 0)]);
    let mut meta = metadata_with::<CpuRuntime>(&coords, &[1, 1]);
    let region = Region::from_raw(2, &[0, 1, 1, 0], 2, 2).unwrap();
    let params = ConvParams::new(&[1, 1], &[1, 1], &[3, 3], &[1, 1]).with_region(region);
    meta.ensure_kernel_map(&params, false).unwrap();
    let map = meta.kernel_map(&params, false).unwrap();
    assert_eq!(map.volume(), 2);
    // offset (0, 1): output (0,0) sees input (0,1)
    assert_eq!(sorted_pairs(map, 0, false), vec![(2, 0)]);
    // offset (1, 0): output (0,0) sees input (1,0)
    assert_eq!(sorted_pairs(map, 1, false), vec![(1, 0)]);
}

#[test]
fn test_dilation_scales_offsets() {
    let mut meta = Metadata::<CpuRuntime>::new(1).unwrap();
    meta.initialize_coords(&[0, 0, 1, 0, 2, 0, 4, 0], &[1], Default::default())
        .unwrap();
    let params = ConvParams::new(&[1], &[1], &[3], &[2]);
    meta.ensure_kernel_map(&params, false).unwrap();
    let map = meta.kernel_map(&params, false).unwrap();
    // offset -2: x=2 sees x=0, x=4 sees x=2
    assert_eq!(sorted_pairs(map, 0, false), vec![(0, 2), (2, 3)]);
    // offset +2: x=0 sees x=2, x=2 sees x=4
    assert_eq!(sorted_pairs(map, 2, false), vec![(2, 0), (3, 2)]);
}

#[test]
fn test_strided_map_uses_input_units() {
    // four fine points, one coarse output at stride 2
    let coords = coords_2d(&[(0, 0, 0), (1, 0, 0), (0, 1, 0), (1, 1, 0)]);
    let mut meta = metadata_with::<CpuRuntime>(&coords, &[1, 1]);
    let params = ConvParams::new(&[1, 1], &[2, 2], &[2, 2], &[1, 1]);
    meta.ensure_kernel_map(&params, false).unwrap();
    let map = meta.kernel_map(&params, false).unwrap();
    assert_eq!(meta.num_coords(&[2, 2]).unwrap(), 1);
    for k in 0..4 {
        assert_eq!(map.kernels()[k].len(), 1);
        assert_eq!(map.kernels()[k].output, vec![0]);
    }
    assert_eq!(map.kernels()[3].input, vec![3]);
}
