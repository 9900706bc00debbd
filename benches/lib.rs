use criterion::{criterion_group, criterion_main};

use frame::bench_frame_transform;

use interp::bench_cubic_spline;

use optimize::bench_minimize;

criterion_group!(
    benches,
    bench_frame_transform,
    bench_cubic_spline,
    bench_minimize
);
criterion_main!(benches);
