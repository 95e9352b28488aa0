// benches/extraction_bench.rs
//! Benchmarks for the CPU-bound parts of a run: payload resolution, id
//! extraction, and merging.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use dataset_extractor::api::resolver::resolve_page;
use dataset_extractor::{extract_ids, merge_secondary, EnrichmentSpec, FieldPath, QueryTemplate};
use serde_json::{json, Value};

fn orders(count: usize, items_per_order: usize) -> Vec<Value> {
    (0..count)
        .map(|n| {
            let items: Vec<Value> = (0..items_per_order)
                .map(|i| json!({"productId": format!("gid://shop/Product/{}", (n * 7 + i) % 500)}))
                .collect();
            json!({"id": format!("gid://shop/Order/{}", n), "lineItems": items})
        })
        .collect()
}

fn page_data(nodes: &[Value]) -> Value {
    let edges: Vec<Value> = nodes.iter().map(|node| json!({"node": node})).collect();
    json!({
        "orders": {
            "edges": edges,
            "pageInfo": {"hasNextPage": true, "endCursor": "abc"}
        }
    })
}

fn bench_resolve_page(c: &mut Criterion) {
    let mut group = c.benchmark_group("resolve_page");
    for size in [10, 100, 250] {
        let data = page_data(&orders(size, 3));
        group.bench_with_input(BenchmarkId::from_parameter(size), &data, |b, data| {
            b.iter(|| resolve_page(black_box(data), "order"))
        });
    }
    group.finish();
}

fn bench_extract_ids(c: &mut Criterion) {
    let path = FieldPath::parse("lineItems.productId").unwrap();
    let mut group = c.benchmark_group("extract_ids");
    for size in [100, 1_000, 10_000] {
        let documents = orders(size, 5);
        group.bench_with_input(BenchmarkId::from_parameter(size), &documents, |b, docs| {
            b.iter(|| extract_ids(black_box(docs), &path))
        });
    }
    group.finish();
}

fn bench_merge(c: &mut Criterion) {
    let spec = EnrichmentSpec::new(
        FieldPath::parse("lineItems.productId").unwrap(),
        QueryTemplate::parse("{ nodes(ids: {{ids}}) { id } }").unwrap(),
    );
    let secondary: Vec<Value> = (0..500)
        .map(|n| json!({"id": format!("gid://shop/Product/{}", n), "title": "Hat"}))
        .collect();
    let primary = orders(1_000, 5);

    c.bench_function("merge_secondary_1000", |b| {
        b.iter(|| merge_secondary(black_box(primary.clone()), &secondary, &spec))
    });
}

criterion_group!(benches, bench_resolve_page, bench_extract_ids, bench_merge);
criterion_main!(benches);
