use std::collections::HashMap;
use std::hint::black_box;

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};

use pathstore_core::{Path, Store, Subscriber};

#[derive(Debug, Default)]
struct State {
    selected: String,
    dict: HashMap<String, u64>,
    list: Vec<u64>,
}

fn root() -> Path<State, State> {
    Path::root()
}

fn selected() -> Path<State, String> {
    root().field("selected", |s| &s.selected, |s| &mut s.selected)
}

fn dict() -> Path<State, HashMap<String, u64>> {
    root().field("dict", |s| &s.dict, |s| &mut s.dict)
}

fn list() -> Path<State, Vec<u64>> {
    root().field("list", |s| &s.list, |s| &mut s.list)
}

/// A store with `entries` dictionary entries and list items, each with its
/// own subscriber, plus one subscriber following `dict[selected]`.
fn make_store(entries: usize) -> Store<State> {
    let state = State {
        selected: "key0".into(),
        dict: (0..entries).map(|i| (format!("key{i}"), i as u64)).collect(),
        list: (0..entries as u64).collect(),
    };
    let store = Store::new(state);

    for i in 0..entries {
        let subscriber = Subscriber::new(|| {});
        store
            .get(&dict().at(format!("key{i}")), Some(&subscriber))
            .unwrap();
        store.get(&list().at(i), Some(&subscriber)).unwrap();
    }
    store
        .get(&dict().at_path(&selected()), Some(&Subscriber::new(|| {})))
        .unwrap();

    store
}

fn bench_static_set(c: &mut Criterion) {
    let mut group = c.benchmark_group("static_set");
    group.throughput(Throughput::Elements(1));

    for entries in [16usize, 256, 4096] {
        let store = make_store(entries);
        let path = list().at(entries / 2);

        group.bench_with_input(BenchmarkId::from_parameter(entries), &entries, |b, _| {
            let mut value = 0u64;
            b.iter(|| {
                value += 1;
                store.set(black_box(&path), value).unwrap();
            });
        });
    }

    group.finish();
}

fn bench_aliased_set(c: &mut Criterion) {
    let mut group = c.benchmark_group("aliased_set");
    group.throughput(Throughput::Elements(1));

    for entries in [16usize, 256, 4096] {
        let store = make_store(entries);
        // Matches the dynamic subscriber's current key.
        let path = dict().at("key0".to_string());

        group.bench_with_input(BenchmarkId::from_parameter(entries), &entries, |b, _| {
            let mut value = 0u64;
            b.iter(|| {
                value += 1;
                store.set(black_box(&path), value).unwrap();
            });
        });
    }

    group.finish();
}

fn bench_subscribe(c: &mut Criterion) {
    let store = make_store(256);
    let path = dict().at_path(&selected());

    c.bench_function("subscribe_dynamic", |b| {
        b.iter(|| {
            let subscriber = Subscriber::new(|| {});
            store.get(black_box(&path), Some(&subscriber)).unwrap();
            store.unsubscribe(&subscriber);
        });
    });
}

criterion_group!(
    invalidation,
    bench_static_set,
    bench_aliased_set,
    bench_subscribe
);
criterion_main!(invalidation);
