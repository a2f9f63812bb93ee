//! Wire codec benchmark suite.
//!
//! Measures frame encoding and reply decoding for typical payloads:
//! - Small calls (one handle argument)
//! - Setters carrying infinities
//! - Handle lists of growing size
//!
//! Run with: cargo bench --bench codec
//! Results saved to: target/criterion/

use std::hint::black_box;

use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use hostlink::protocol::{Frame, Reply};
use hostlink::{SequenceId, Value};

// ============================================================================
// Benchmark Parameters
// ============================================================================

const LIST_SIZES: &[usize] = &[8, 64, 512];

// ============================================================================
// Benchmark: Encode
// ============================================================================

fn bench_encode(c: &mut Criterion) {
    let mut group = c.benchmark_group("encode");

    let handle = [Value::from("handle_0000beef")];
    group.bench_function("get_track_volume", |b| {
        b.iter(|| Frame::encode(SequenceId::new(42), "get_track_volume", black_box(&handle)));
    });

    let setter = [Value::from("handle_0000beef"), Value::Float(f64::NEG_INFINITY)];
    group.bench_function("set_track_volume_inf", |b| {
        b.iter(|| Frame::encode(SequenceId::new(43), "set_track_volume", black_box(&setter)));
    });

    group.finish();
}

// ============================================================================
// Benchmark: Decode
// ============================================================================

fn bench_decode(c: &mut Criterion) {
    let mut group = c.benchmark_group("decode");

    group.bench_function("float_reply", |b| {
        b.iter(|| Reply::decode(black_box("[7,-3.5]")));
    });

    group.bench_function("error_reply", |b| {
        b.iter(|| {
            Reply::decode(black_box(r#"[7,"error:disk full"]"#)).map(Reply::into_outcome)
        });
    });

    for &size in LIST_SIZES {
        let items: Vec<String> = (0..size).map(|i| format!("\"handle_{i:08x}\"")).collect();
        let text = format!("[1,[{}]]", items.join(","));

        group.throughput(Throughput::Bytes(text.len() as u64));
        group.bench_with_input(BenchmarkId::new("handle_list", size), &text, |b, text| {
            b.iter(|| Reply::decode(black_box(text)));
        });
    }

    group.finish();
}

// ============================================================================
// Criterion Setup
// ============================================================================

criterion_group!(benches, bench_encode, bench_decode);
criterion_main!(benches);
