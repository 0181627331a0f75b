//! Criterion micro-benchmarks for ordered slot map operations.

use std::hint::black_box;

use criterion::{criterion_group, criterion_main, Criterion};
use moonslot_bench::{churn_pattern, run_ordered_churn};
use moonslot_ordered::OrderedSlotMap;
use moonslot_test_utils::{sample_data, SlotData};

fn bench_sorted_insert_2k(c: &mut Criterion) {
    let ops = churn_pattern(2_000, 100, 9);
    c.bench_function("ordered_insert_2k", |b| {
        b.iter(|| {
            let map = OrderedSlotMap::with_capacity(16);
            let live = run_ordered_churn(&map, &ops);
            black_box(live.len());
        });
    });
}

fn bench_churn(c: &mut Criterion) {
    let ops = churn_pattern(4_000, 55, 42);
    c.bench_function("ordered_churn_4k", |b| {
        b.iter(|| {
            let map = OrderedSlotMap::with_capacity(64);
            let live = run_ordered_churn(&map, &ops);
            black_box(live.len());
        });
    });
}

fn bench_duplicate(c: &mut Criterion) {
    let map: OrderedSlotMap<SlotData> = OrderedSlotMap::new();
    let _handles: Vec<_> = (0..250)
        .flat_map(|i| {
            sample_data().map(|d| SlotData::new(d.a + i, d.b))
        })
        .map(|d| map.insert(d))
        .collect();
    c.bench_function("ordered_duplicate_1k", |b| {
        b.iter(|| {
            let (copy, handles) = map.duplicate();
            black_box((copy.len(), handles.len()));
        });
    });
}

criterion_group!(benches, bench_sorted_insert_2k, bench_churn, bench_duplicate);
criterion_main!(benches);
