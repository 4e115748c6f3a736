use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use nsforest_core::persistence::NamespaceDocument;
use nsforest_core::test_utils::{MemoryBackingStore, TestForestBuilder};
use nsforest_core::{Archiver, NamespaceRegistry, NamespaceStore, StoreConfig};
use std::time::Duration;
use tempfile::tempdir;

/// A single chain `Level0 -> Level1 -> ...` with one variable at the top
fn chain(depth: usize) -> NamespaceRegistry {
    let mut builder = TestForestBuilder::new();
    for i in 0..depth {
        let parent = (i > 0).then(|| format!("Level{}", i - 1));
        builder = builder.with_namespace(&format!("Level{}", i), "", parent.as_deref());
    }
    builder.with_var("Level0", "Root", "value").build()
}

/// `count` root namespaces, each with one child and two variables
fn wide(count: usize) -> NamespaceRegistry {
    let mut builder = TestForestBuilder::new();
    for i in 0..count {
        let root = format!("Root{}", i);
        let child = format!("Child{}", i);
        builder = builder
            .with_namespace(&root, "root", None)
            .with_namespace(&child, "child", Some(&root))
            .with_var(&root, "Env", "prod")
            .with_var(&child, "Owner", "ops");
    }
    builder.build()
}

fn memory_store(registry: &NamespaceRegistry) -> NamespaceStore {
    let document = NamespaceDocument::from_registry(registry).unwrap();
    let (backing, _) = MemoryBackingStore::with_document(Some(document));
    NamespaceStore::with_backing(Box::new(backing), Archiver::disabled()).unwrap()
}

fn bench_inherited_get(c: &mut Criterion) {
    let mut group = c.benchmark_group("inherited_get");

    for depth in [1usize, 16, 128] {
        let store = memory_store(&chain(depth));
        let leaf = format!("Level{}", depth - 1);

        group.bench_with_input(BenchmarkId::from_parameter(depth), &depth, |b, _| {
            b.iter(|| black_box(store.get(&leaf, "root").unwrap()));
        });
    }

    group.finish();
}

fn bench_document_encoding(c: &mut Criterion) {
    let mut group = c.benchmark_group("document_encoding");

    for size in [10usize, 100, 1000] {
        let registry = wide(size);
        group.throughput(Throughput::Elements(registry.len() as u64));

        group.bench_with_input(BenchmarkId::new("encode", size), &registry, |b, registry| {
            b.iter(|| {
                let document = NamespaceDocument::from_registry(registry).unwrap();
                black_box(serde_json::to_vec(&document).unwrap())
            });
        });

        let json = serde_json::to_vec(&NamespaceDocument::from_registry(&registry).unwrap()).unwrap();
        group.bench_with_input(BenchmarkId::new("decode", size), &json, |b, json| {
            b.iter(|| {
                let document: NamespaceDocument = serde_json::from_slice(json).unwrap();
                black_box(document.into_registry().unwrap())
            });
        });
    }

    group.finish();
}

fn bench_file_commit(c: &mut Criterion) {
    let mut group = c.benchmark_group("file_commit");
    group.measurement_time(Duration::from_secs(10));
    group.sample_size(30);

    let dir = tempdir().unwrap();
    let store = NamespaceStore::open(&StoreConfig::new(dir.path())).unwrap();
    store.create("Bench", "", None).unwrap();

    let mut counter = 0u64;
    group.bench_function("set_one_variable", |b| {
        b.iter(|| {
            counter += 1;
            store.set("Bench", [("Counter", counter.to_string())]).unwrap();
        });
    });

    group.finish();
}

criterion_group!(
    benches,
    bench_inherited_get,
    bench_document_encoding,
    bench_file_commit
);
criterion_main!(benches);
