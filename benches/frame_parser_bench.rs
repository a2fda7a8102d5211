//! Performance benchmarks for status frame decoding.
//!
//! The link polls every 200 ms, so throughput is never the bottleneck; these
//! benchmarks guard against accidental quadratic behaviour in buffer
//! handling when the controller floods the line.
//!
//! Run benchmarks with:
//! ```sh
//! cargo bench --bench frame_parser_bench
//! ```

use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use std::hint::black_box;

use brewlink_core::MachineStatus;
use brewlink_protocol::{FrameParser, LineLogBuffer, StreamParser, encode_status_frame};

fn sample_frame() -> String {
    let status = MachineStatus {
        flow_rate: 1.8,
        brew_boiler_pressure: 9.1,
        brew_boiler_temperature: 93.2,
        brew_head_temperature: 91.9,
        steam_boiler_temperature: 121.5,
        liquid_adc: 2048,
        liquid_weight: 36.4,
        firmware_version: "FW2.1".to_string(),
        ..Default::default()
    };
    encode_status_frame(&status, "43433")
}

/// Benchmark extracting a single frame from a buffer.
fn bench_extract_single(c: &mut Criterion) {
    let mut group = c.benchmark_group("extract_single");
    group.throughput(Throughput::Elements(1));

    let frame = sample_frame();
    group.bench_function("clean_frame", |b| {
        b.iter(|| black_box(FrameParser::extract(black_box(&frame))));
    });

    let noisy = format!("{}{}", "boot noise ".repeat(50), frame);
    group.bench_function("noisy_prefix", |b| {
        b.iter(|| black_box(FrameParser::extract(black_box(&noisy))));
    });

    group.finish();
}

/// Benchmark feeding a burst of frames in chunks of various sizes.
fn bench_stream_chunks(c: &mut Criterion) {
    let mut group = c.benchmark_group("stream_chunks");
    let burst: String = (0..100).map(|_| sample_frame()).collect();
    group.throughput(Throughput::Elements(100));

    for chunk_size in [16usize, 64, 512, 4096] {
        group.bench_with_input(
            BenchmarkId::from_parameter(chunk_size),
            &chunk_size,
            |b, &size| {
                b.iter(|| {
                    let mut parser = StreamParser::new();
                    for chunk in burst.as_bytes().chunks(size) {
                        // ASCII only, every split is a char boundary.
                        let text = std::str::from_utf8(chunk).unwrap();
                        parser.feed(text);
                    }
                    black_box(parser.drain_statuses().count())
                });
            },
        );
    }

    group.finish();
}

/// Benchmark the overflow path with a line that never ends.
fn bench_noise_flood(c: &mut Criterion) {
    let mut group = c.benchmark_group("noise_flood");
    let noise = "x".repeat(1_024);

    group.bench_function("parse_buffer", |b| {
        b.iter(|| {
            let mut parser = StreamParser::new();
            for _ in 0..32 {
                parser.feed(black_box(&noise));
            }
            black_box(parser.truncations())
        });
    });

    group.bench_function("log_buffer", |b| {
        b.iter(|| {
            let mut log = LineLogBuffer::new();
            let mut flushed = 0;
            for _ in 0..32 {
                flushed += log.push(black_box(&noise)).len();
            }
            black_box(flushed)
        });
    });

    group.finish();
}

criterion_group!(
    benches,
    bench_extract_single,
    bench_stream_chunks,
    bench_noise_flood
);
criterion_main!(benches);
