use criterion::{criterion_group, criterion_main};

fn correction_benchmarks(c: &mut criterion::Criterion) {
    devignette::bench::correction::benchmarks(c);
}

criterion_group!(benches, correction_benchmarks);
criterion_main!(benches);
