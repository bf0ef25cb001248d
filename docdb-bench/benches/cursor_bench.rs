//! Cursor iteration benchmarks.
//!
//! Iterates in-memory result sets to measure per-document cursor overhead
//! (batching, lazy decode, handle bookkeeping) without network cost.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use docdb_bson::{doc, RawDocumentBuf};
use docdb_driver::{CursorOptions, MemoryTransport, MemoryTransportConfig};
use std::sync::Arc;
use tokio::runtime::Runtime;
use tokio_stream::StreamExt;

fn create_result_set(count: usize) -> Vec<RawDocumentBuf> {
    (0..count)
        .map(|i| {
            RawDocumentBuf::from_document(&doc! {
                "seq": i as i64,
                "name": format!("item-{}", i),
                "active": i % 2 == 0,
            })
            .unwrap()
        })
        .collect()
}

fn bench_cursor_next(c: &mut Criterion) {
    let rt = Runtime::new().unwrap();
    let mut group = c.benchmark_group("cursor_next");
    let count = 10_000;

    for batch_size in [1, 101, 1000] {
        let docs = create_result_set(count);

        group.throughput(Throughput::Elements(count as u64));
        group.bench_with_input(
            BenchmarkId::from_parameter(batch_size),
            &batch_size,
            |b, &batch_size| {
                b.to_async(&rt).iter(|| {
                    let docs = docs.clone();
                    async move {
                        let transport =
                            Arc::new(MemoryTransport::new(MemoryTransportConfig::default()));
                        let handle = transport.open("bench.items", docs);
                        let mut cursor = transport
                            .cursor(handle, CursorOptions::new().with_batch_size(batch_size));
                        let mut n = 0u64;
                        while let Some(doc) = cursor.next().await.unwrap() {
                            black_box(doc);
                            n += 1;
                        }
                        n
                    }
                });
            },
        );
    }

    group.finish();
}

fn bench_cursor_stream(c: &mut Criterion) {
    let rt = Runtime::new().unwrap();
    let mut group = c.benchmark_group("cursor_stream");
    let count = 10_000;
    let docs = create_result_set(count);

    group.throughput(Throughput::Elements(count as u64));
    group.bench_function("collect", |b| {
        b.to_async(&rt).iter(|| {
            let docs = docs.clone();
            async move {
                let transport = Arc::new(MemoryTransport::new(MemoryTransportConfig::default()));
                let handle = transport.open("bench.items", docs);
                let stream = transport.cursor(handle, CursorOptions::new()).into_stream();
                let items: Vec<_> = stream.collect().await;
                black_box(items.len())
            }
        });
    });

    group.finish();
}

fn bench_open_close(c: &mut Criterion) {
    let rt = Runtime::new().unwrap();
    let mut group = c.benchmark_group("cursor_open_close");
    let transport = Arc::new(MemoryTransport::new(MemoryTransportConfig::default()));

    group.bench_function("abandon_after_first", |b| {
        b.to_async(&rt).iter(|| {
            let transport = transport.clone();
            async move {
                let handle = transport.open("bench.items", create_result_set(4));
                let mut cursor = transport.cursor(handle, CursorOptions::new().with_batch_size(2));
                black_box(cursor.next().await.unwrap());
            }
        });
    });

    group.finish();
}

criterion_group!(benches, bench_cursor_next, bench_cursor_stream, bench_open_close);
criterion_main!(benches);
