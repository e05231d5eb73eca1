//! Run with: cargo bench -p devignette --features bench --bench correction

use std::hint::black_box;

use criterion::{BenchmarkId, Criterion, Throughput};

use super::vignetted_frame;
use crate::{
    CorrectionConfig, CorrectionEngine, FalloffModel, OpticalCenter, PolynomialFalloff,
    apply_direct,
};

/// Register correction benchmarks with Criterion.
pub fn benchmarks(c: &mut Criterion) {
    benchmark_apply(c);
}

/// Direct evaluation against the cached lookup table.
fn benchmark_apply(c: &mut Criterion) {
    let mut group = c.benchmark_group("correction");

    for (width, height) in [(640, 480), (1920, 1080)] {
        let image = vignetted_frame(width, height, 3);
        let center = OpticalCenter::image_center(width, height);
        let model = FalloffModel::polynomial(
            center,
            crate::farthest_corner_distance(center, width, height),
            vec![
                PolynomialFalloff::new(0.6, 0.2, 0.0),
                PolynomialFalloff::new(0.5, 0.1, 0.0),
                PolynomialFalloff::new(0.4, 0.0, 0.1),
            ],
        )
        .expect("benchmark model is feasible");
        let label = format!("{width}x{height}");

        group.throughput(Throughput::Elements((width * height) as u64));

        group.bench_function(BenchmarkId::new("direct", &label), |b| {
            b.iter(|| black_box(apply_direct(black_box(&image), &model)))
        });

        let mut engine = CorrectionEngine::new(CorrectionConfig::lut());
        group.bench_function(BenchmarkId::new("lut", &label), |b| {
            b.iter(|| black_box(engine.apply(black_box(&image), &model)))
        });
    }

    group.finish();
}
