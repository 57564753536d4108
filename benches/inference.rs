//! Benchmarks for the inference engine and the analyses.
//!
//! These measure single-pass parse throughput on repetitive text and binary
//! input, and the cost of snapshotting plus cross-grammar similarity.

use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};
use refrain::Grammar;

/// Repetitive natural text: the worst case for the digram index (many
/// matches, deep rule hierarchy) and the best case for compression.
fn verse_input(target_len: usize) -> Vec<u8> {
    let verse = "\npease porridge hot,\npease porridge cold,\npease porridge in the \
                 pot,\nnine days old.\n";
    let mut input = Vec::with_capacity(target_len + verse.len());
    while input.len() < target_len {
        input.extend_from_slice(verse.as_bytes());
    }
    input
}

/// Binary input with a short repeated record, parsed byte-per-byte.
fn record_input(target_len: usize) -> Vec<u8> {
    let record: &[u8] = &[0xfe, 0xff, 0xfd, 1, 2, 3, 4, 5, b'a', b'b', 0x80, 0x00];
    let mut input = Vec::with_capacity(target_len + record.len());
    let mut salt = 0u8;
    while input.len() < target_len {
        input.extend_from_slice(record);
        // Vary one byte per record so the grammar keeps growing instead of
        // collapsing to a single rule.
        input.push(salt);
        salt = salt.wrapping_add(37);
    }
    input
}

fn bench_parse_text(c: &mut Criterion) {
    let input = verse_input(64 * 1024);
    let mut group = c.benchmark_group("parse_text");
    group.throughput(Throughput::Bytes(input.len() as u64));
    group.bench_function("verse_64k", |b| {
        b.iter(|| {
            let g = Grammar::parse(black_box(&input)).unwrap();
            black_box(g.rule_count())
        });
    });
    group.finish();
}

fn bench_parse_bytes(c: &mut Criterion) {
    let input = record_input(64 * 1024);
    let mut group = c.benchmark_group("parse_bytes");
    group.throughput(Throughput::Bytes(input.len() as u64));
    group.bench_function("records_64k", |b| {
        b.iter(|| {
            let g = Grammar::parse_bytes(black_box(&input)).unwrap();
            black_box(g.rule_count())
        });
    });
    group.finish();
}

fn bench_snapshot_and_similarity(c: &mut Criterion) {
    let left = Grammar::parse(&verse_input(16 * 1024)).unwrap();
    let right = Grammar::parse(&record_input(16 * 1024)).unwrap();
    let (cl, cr) = (left.compact(), right.compact());

    c.bench_function("compact_16k", |b| {
        b.iter(|| black_box(left.compact()));
    });

    c.bench_function("index_and_similarity_16k", |b| {
        b.iter(|| {
            let il = cl.index();
            let ir = cr.index();
            black_box(il.similarity(&ir))
        });
    });
}

criterion_group!(
    name = benches;
    config = Criterion::default().sample_size(10); // smaller sample for speed
    targets = bench_parse_text, bench_parse_bytes, bench_snapshot_and_similarity
);
criterion_main!(benches);
