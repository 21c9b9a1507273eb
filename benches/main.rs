use criterion::criterion_main;


criterion_main!(
    bench_insert::benches,
    bench_nearest_neighbor::benches,
    bench_range_search::benches,
    bench_remove::benches
);
