//! Benchmarks for the capture path
//!
//! Measures raw ring buffer puts, snapshots, and a full hub → pipeline →
//! buffer round trip.

use std::sync::Arc;

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use serde_json::json;

use flight_recorder::{format_message, EventHub, EventLevel, FlightRecorder, RingBuffer};

fn bench_put(c: &mut Criterion) {
    let mut group = c.benchmark_group("ring_buffer_put");

    for capacity in [16usize, 1024, 65536] {
        let buffer = RingBuffer::new(capacity).unwrap();
        group.bench_with_input(BenchmarkId::from_parameter(capacity), &capacity, |b, _| {
            let mut i = 0u64;
            b.iter(|| {
                buffer.put(black_box(i));
                i += 1;
            })
        });
    }

    group.finish();
}

fn bench_snapshot(c: &mut Criterion) {
    let mut group = c.benchmark_group("ring_buffer_snapshot");

    for capacity in [16usize, 1024] {
        let buffer = RingBuffer::new(capacity).unwrap();
        for i in 0..(capacity as u64 * 3 / 2) {
            buffer.put(i);
        }
        group.bench_with_input(BenchmarkId::from_parameter(capacity), &capacity, |b, _| {
            b.iter(|| black_box(buffer.snapshot()))
        });
    }

    group.finish();
}

fn bench_capture(c: &mut Criterion) {
    let hub = Arc::new(EventHub::new());
    let recorder = FlightRecorder::new(1024, hub.clone()).unwrap();
    recorder
        .enable("Bench", EventLevel::Informational, format_message)
        .unwrap();
    let source = hub.source("Bench");

    c.bench_function("capture_formatted_event", |b| {
        b.iter(|| {
            source.write(
                EventLevel::Informational,
                "request {0} took {1}ms",
                vec![json!("GET /"), json!(12)],
            )
        })
    });

    c.bench_function("skip_disabled_level", |b| {
        b.iter(|| source.write(EventLevel::Verbose, "ignored {0}", vec![json!(1)]))
    });
}

criterion_group!(benches, bench_put, bench_snapshot, bench_capture);
criterion_main!(benches);
