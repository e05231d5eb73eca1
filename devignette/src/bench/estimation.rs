//! Run with: cargo bench -p devignette --features bench --bench estimation

use std::hint::black_box;

use criterion::{BenchmarkId, Criterion};

use super::vignetted_frame;
use crate::{
    EntropyConfig, EntropyEstimator, Estimator, OpticalCenter, PolynomialFalloff, RadialGrid,
    RadiusNorm, RatioProfileEstimator, entropy_objective,
};

/// Register estimation benchmarks with Criterion.
pub fn benchmarks(c: &mut Criterion) {
    benchmark_objective(c);
    benchmark_estimators(c);
}

/// One entropy evaluation, the unit of work of the search.
fn benchmark_objective(c: &mut Criterion) {
    let mut group = c.benchmark_group("entropy_objective");

    for width in [256, 1024] {
        let height = width * 3 / 4;
        let image = vignetted_frame(width, height, 1);
        let plane = image.luminance_plane();
        let center = OpticalCenter::image_center(width, height);
        let scale = RadiusNorm::FarthestCorner
            .resolve(center, width, height)
            .expect("benchmark frame has a positive radius");
        let grid = RadialGrid::new(width, height, center, scale);
        let falloff = PolynomialFalloff::new(0.5, 0.1, 0.0);

        group.bench_function(BenchmarkId::from_parameter(width), |b| {
            b.iter(|| black_box(entropy_objective(black_box(&plane), &grid, falloff)))
        });
    }

    group.finish();
}

fn benchmark_estimators(c: &mut Criterion) {
    let mut group = c.benchmark_group("estimate");
    group.sample_size(10);

    let image = vignetted_frame(640, 480, 3);
    let center = OpticalCenter::image_center(640, 480);

    let entropy = EntropyEstimator::new(EntropyConfig::fast());
    group.bench_function("entropy_fast", |b| {
        b.iter(|| black_box(entropy.estimate(black_box(&image), center)))
    });

    let ratio = RatioProfileEstimator::default();
    group.bench_function("ratio", |b| {
        b.iter(|| black_box(ratio.estimate(black_box(&image), center)))
    });

    group.finish();
}
