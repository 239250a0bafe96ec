use aulos_control::EngineControl;
use aulos_state::StatePair;
use criterion::{Criterion, Throughput, black_box, criterion_group, criterion_main};

fn bench_read_current(c: &mut Criterion) {
    let pair = StatePair::new(EngineControl::with_rates(48_000, 256));

    let mut group = c.benchmark_group("state_pair");
    group.throughput(Throughput::Elements(1));

    group.bench_function("read_current", |b| {
        b.iter(|| black_box(pair.read_current().frame_base));
    });

    group.finish();
}

fn bench_try_switch_idle(c: &mut Criterion) {
    let pair = StatePair::new(EngineControl::with_rates(48_000, 256));

    let mut group = c.benchmark_group("state_pair");
    group.throughput(Throughput::Elements(1));

    // Nothing staged: the cost of the cycle-entry switch in the common case.
    group.bench_function("try_switch (idle)", |b| {
        b.iter(|| black_box(pair.try_switch().frame_base));
    });

    group.finish();
}

fn bench_write_region(c: &mut Criterion) {
    let pair = StatePair::new(EngineControl::with_rates(48_000, 256));

    let mut group = c.benchmark_group("state_pair");
    group.throughput(Throughput::Elements(1));

    group.bench_function("begin_write..end_write", |b| {
        b.iter(|| {
            let ctl = pair.begin_write();
            ctl.frame_base = black_box(ctl.frame_base.wrapping_add(1));
            pair.end_write();
        });
    });

    group.finish();
}

fn bench_publish_switch_round_trip(c: &mut Criterion) {
    let pair = StatePair::new(EngineControl::with_rates(48_000, 256));

    let mut group = c.benchmark_group("state_pair");
    group.throughput(Throughput::Elements(1));

    group.bench_function("publish + switch", |b| {
        b.iter(|| {
            {
                let mut w = pair.write();
                w.frame_base = black_box(w.frame_base.wrapping_add(256));
            }
            black_box(pair.try_switch().frame_base);
        });
    });

    group.finish();
}

fn bench_read_coherent(c: &mut Criterion) {
    let pair = StatePair::new(EngineControl::with_rates(48_000, 256));

    let mut group = c.benchmark_group("state_pair");
    group.throughput(Throughput::Elements(1));

    group.bench_function("read_coherent", |b| {
        b.iter(|| black_box(pair.read_coherent().frame_base));
    });

    group.finish();
}

criterion_group!(
    benches,
    bench_read_current,
    bench_try_switch_idle,
    bench_write_region,
    bench_publish_switch_round_trip,
    bench_read_coherent,
);
criterion_main!(benches);
