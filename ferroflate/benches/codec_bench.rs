//! Benchmarks for compression and decompression throughput.

use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use ferroflate::{Framing, compress_with_level, decompress};
use std::hint::black_box;

fn corpora() -> Vec<(&'static str, Vec<u8>)> {
    vec![
        ("small_random", generate_random(1024)),
        ("medium_random", generate_random(64 * 1024)),
        ("small_repeated", generate_repeated(1024)),
        ("medium_repeated", generate_repeated(64 * 1024)),
        ("small_text", generate_text_like(1024)),
        ("medium_text", generate_text_like(64 * 1024)),
    ]
}

fn bench_compress(c: &mut Criterion) {
    let mut group = c.benchmark_group("compress");

    for (name, data) in corpora() {
        group.throughput(Throughput::Bytes(data.len() as u64));
        for level in [1u8, 6, 9] {
            group.bench_with_input(
                BenchmarkId::new(name, level),
                &data,
                |b, data| {
                    b.iter(|| {
                        compress_with_level(black_box(data), Framing::Zlib, level)
                            .expect("compression should succeed")
                    });
                },
            );
        }
    }

    group.finish();
}

fn bench_decompress(c: &mut Criterion) {
    let mut group = c.benchmark_group("decompress");

    for (name, data) in corpora() {
        let compressed = compress_with_level(&data, Framing::Zlib, 6)
            .expect("compression should succeed");
        group.throughput(Throughput::Bytes(data.len() as u64));
        group.bench_with_input(
            BenchmarkId::from_parameter(name),
            &compressed,
            |b, compressed| {
                b.iter(|| {
                    decompress(black_box(compressed), Framing::Zlib)
                        .expect("decompression should succeed")
                });
            },
        );
    }

    group.finish();
}

fn generate_random(size: usize) -> Vec<u8> {
    // Simple LCG random number generator
    let mut data = Vec::with_capacity(size);
    let mut state = 0x12345678u32;
    for _ in 0..size {
        state = state.wrapping_mul(1_664_525).wrapping_add(1_013_904_223);
        data.push((state >> 24) as u8);
    }
    data
}

fn generate_repeated(size: usize) -> Vec<u8> {
    let pattern = b"The quick brown fox jumps over the lazy dog. ";
    pattern.iter().copied().cycle().take(size).collect()
}

fn generate_text_like(size: usize) -> Vec<u8> {
    let words: [&[u8]; 8] = [
        b"the", b"compression", b"of", b"streams", b"depends", b"on", b"matching", b"history",
    ];
    let mut data = Vec::with_capacity(size);
    let mut state = 0xCAFEu32;
    while data.len() < size {
        state = state.wrapping_mul(48271) % 0x7FFF_FFFF;
        data.extend_from_slice(words[(state as usize) % words.len()]);
        data.push(b' ');
    }
    data.truncate(size);
    data
}

criterion_group!(benches, bench_compress, bench_decompress);
criterion_main!(benches);
