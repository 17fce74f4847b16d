//! Common test utilities
#![allow(dead_code)]

use sparseconv::coords::DuplicatePolicy;
use sparseconv::metadata::Metadata;
use sparseconv::runtime::Runtime;
use tracing_subscriber::{EnvFilter, filter::LevelFilter, fmt, prelude::*};

/// Install a subscriber for the current test thread only.
///
/// Respects `RUST_LOG`; defaults to the "info" level.
pub fn init_test_subscriber() -> tracing::subscriber::DefaultGuard {
    let fmt_layer = fmt::layer().with_target(true).with_test_writer();

    let filter_layer = EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy();

    tracing_subscriber::registry()
        .with(filter_layer)
        .with(fmt_layer)
        .set_default()
}

/// Metadata with a base set registered at `stride`
pub fn metadata_with<R: Runtime>(coords: &[i32], stride: &[i32]) -> Metadata<R> {
    let mut meta = Metadata::<R>::new(stride.len()).unwrap();
    meta.initialize_coords(coords, stride, DuplicatePolicy::Reject)
        .unwrap();
    meta
}

/// Flattened 2D coordinates `(x, y, batch)`
pub fn coords_2d(points: &[(i32, i32, i32)]) -> Vec<i32> {
    points.iter().flat_map(|&(x, y, b)| [x, y, b]).collect()
}

/// Random 2D coordinates in `[0, extent)²` over `batches` batches, with repeats.
pub fn random_coords_2d(n: usize, extent: i32, batches: i32, seed: u64) -> Vec<i32> {
    use rand::{Rng, SeedableRng, rngs::StdRng};
    let mut rng = StdRng::seed_from_u64(seed);
    (0..n)
        .flat_map(|_| {
            [
                rng.random_range(0..extent),
                rng.random_range(0..extent),
                rng.random_range(0..batches),
            ]
        })
        .collect()
}

/// Deterministic feature values
pub fn features(rows: usize, channels: usize) -> Vec<f64> {
    (0..rows * channels)
        .map(|i| ((i * 37 % 17) as f64 - 8.0) * 0.125)
        .collect()
}

/// Assert two f64 slices are close within tolerance
///
/// Uses the formula: |a - b| <= atol + rtol * |b|
pub fn assert_allclose_f64(a: &[f64], b: &[f64], rtol: f64, atol: f64, msg: &str) {
    assert_eq!(a.len(), b.len(), "{}: length mismatch", msg);
    for (i, (x, y)) in a.iter().zip(b.iter()).enumerate() {
        let diff = (x - y).abs();
        let tol = atol + rtol * y.abs();
        assert!(
            diff <= tol,
            "{}: element {} differs: {} vs {} (diff={}, tol={})",
            msg,
            i,
            x,
            y,
            diff,
            tol
        );
    }
}

/// Assert two f32 slices are close within tolerance
pub fn assert_allclose_f32(a: &[f32], b: &[f32], rtol: f32, atol: f32, msg: &str) {
    assert_eq!(a.len(), b.len(), "{}: length mismatch", msg);
    for (i, (x, y)) in a.iter().zip(b.iter()).enumerate() {
        let diff = (x - y).abs();
        let tol = atol + rtol * y.abs();
        assert!(
            diff <= tol,
            "{}: element {} differs: {} vs {} (diff={}, tol={})",
            msg,
            i,
            x,
            y,
            diff,
            tol
        );
    }
}
