use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use std::hint::black_box;

use callstate::{
    call_state_keys, set_error, set_loaded, set_loading, with_named_call_state, Memo, Signal,
    SignalStore,
};

fn key_derivation_benchmark(c: &mut Criterion) {
    c.bench_function("call_state_keys", |b| {
        b.iter(|| call_state_keys(black_box(Some("flight"))));
    });
}

fn patch_construction_benchmark(c: &mut Criterion) {
    c.bench_function("set_error_patch", |b| {
        b.iter(|| set_error(black_box("network down"), black_box(Some("flight"))));
    });
}

fn memo_computation_benchmark(c: &mut Criterion) {
    let a: Signal<i32> = Signal::new(5);
    let b: Signal<i32> = Signal::new(10);

    let sum = Memo::new({
        let a = a.clone();
        let b = b.clone();
        move || a.get() + b.get()
    });

    c.bench_function("memo_computation", |bencher| {
        bencher.iter(|| {
            black_box(sum.get());
        });
    });
}

fn store_transition_benchmark(c: &mut Criterion) {
    let mut group = c.benchmark_group("call_state_transition");

    for collection_count in [1usize, 10, 100] {
        let collections: Vec<String> = (0..collection_count)
            .map(|i| format!("collection{i}"))
            .collect();
        let store = match SignalStore::builder()
            .with_feature(with_named_call_state(collections))
            .build()
        {
            Ok(store) => store,
            Err(err) => panic!("store assembly failed: {err}"),
        };
        let loaded = match store.call_state(Some("collection0")) {
            Ok(signals) => signals.loaded,
            Err(err) => panic!("missing call state: {err}"),
        };

        group.bench_with_input(
            BenchmarkId::from_parameter(collection_count),
            &collection_count,
            |b, _| {
                let mut flip = false;
                b.iter(|| {
                    flip = !flip;
                    let patch = if flip {
                        set_loading(Some("collection0"))
                    } else {
                        set_loaded(Some("collection0"))
                    };
                    store.patch_state(patch);
                    black_box(loaded.get());
                });
            },
        );
    }
    group.finish();
}

criterion_group!(
    benches,
    key_derivation_benchmark,
    patch_construction_benchmark,
    memo_computation_benchmark,
    store_transition_benchmark,
);
criterion_main!(benches);
