//! Execution benchmarks.

use std::sync::Arc;

use conflux_buffer::{BufferKind, BufferManager, MemoryBufferManager};
use conflux_common::types::{Column, DataType, Row, Schema, Value};
use conflux_exec::{BatchCollector, BatchIterator, Progress, VecProducer};
use criterion::{black_box, criterion_group, criterion_main, BatchSize, Criterion};

fn schema() -> Arc<Schema> {
    Arc::new(Schema::new(vec![
        Column::new("id", DataType::BigInt),
        Column::new("name", DataType::Text),
    ]))
}

fn rows(count: i64) -> Vec<Row> {
    (1..=count)
        .map(|i| Row::new(vec![Value::bigint(i), Value::string(format!("name-{}", i))]))
        .collect()
}

fn collector_benchmark(c: &mut Criterion) {
    let manager = MemoryBufferManager::default();
    let input = rows(10_000);

    c.bench_function("collect_10000_rows", |b| {
        b.iter_batched(
            || VecProducer::new(schema(), input.clone(), 256),
            |producer| {
                let mut collector = BatchCollector::with_manager(producer, &manager).unwrap();
                let buffer = collector.collect_tuples().unwrap().ready().unwrap();
                black_box(collector.row_count());
                buffer.remove();
            },
            BatchSize::SmallInput,
        )
    });
}

fn iterator_benchmark(c: &mut Criterion) {
    let input = rows(10_000);

    c.bench_function("iterate_10000_rows", |b| {
        b.iter_batched(
            || BatchIterator::new(VecProducer::new(schema(), input.clone(), 256)),
            |mut iterator| {
                let mut count = 0u64;
                while let Progress::Ready(Some(row)) = iterator.next_tuple().unwrap() {
                    black_box(row);
                    count += 1;
                }
                black_box(count)
            },
            BatchSize::SmallInput,
        )
    });
}

fn iterator_replay_benchmark(c: &mut Criterion) {
    let manager = MemoryBufferManager::default();
    let input = rows(10_000);

    c.bench_function("iterate_and_replay_10000_rows", |b| {
        b.iter_batched(
            || {
                let mut iterator =
                    BatchIterator::new(VecProducer::new(schema(), input.clone(), 256));
                let buffer = manager
                    .create_tuple_buffer(schema(), BufferKind::Processor)
                    .unwrap();
                iterator.set_buffer(buffer, false).unwrap();
                iterator
            },
            |mut iterator| {
                iterator.mark().unwrap();
                while let Progress::Ready(Some(row)) = iterator.next_tuple().unwrap() {
                    black_box(row);
                }
                iterator.reset().unwrap();
                while let Progress::Ready(Some(row)) = iterator.next_tuple().unwrap() {
                    black_box(row);
                }
                iterator.close_source();
            },
            BatchSize::PerIteration,
        )
    });
}

criterion_group!(
    benches,
    collector_benchmark,
    iterator_benchmark,
    iterator_replay_benchmark
);
criterion_main!(benches);
