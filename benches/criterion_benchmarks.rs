use criterion::{BenchmarkId, Criterion, Throughput, black_box, criterion_group, criterion_main};
use std::fmt::Write;
use tblcodec::cache::LineCache;
use tblcodec::engine::Codec;

fn gen_data(size: usize, seed: u64) -> Vec<u8> {
    let mut s = seed;
    let mut out = Vec::with_capacity(size);
    for _ in 0..size {
        s = s.wrapping_mul(6364136223846793005).wrapping_add(1);
        out.push((s >> 33) as u8);
    }
    out
}

/// A script-like table: one entry per byte, a line break, a control code
/// with an argument, and `extra` two-byte entries that compete with the
/// single-byte ones.
fn gen_table(extra: usize) -> String {
    let mut table = String::from("0A=\\\nFE%%=[X$%%]\nFE=<FE>\n");
    for b in 0..=255u8 {
        if b != 0x0A && b != 0xFE {
            writeln!(table, "{b:02X}=<{b:02X}>").unwrap();
        }
    }
    for i in 0..extra {
        let hi = 0x80 + (i / 256) as u8 % 0x40;
        let lo = (i % 256) as u8;
        writeln!(table, "{hi:02X}{lo:02X}=[w{i:05}]").unwrap();
    }
    table
}

fn bench_table_build(c: &mut Criterion) {
    let mut g = c.benchmark_group("table_build");
    for extra in [0usize, 1024, 8192] {
        let source = gen_table(extra);
        g.bench_with_input(BenchmarkId::from_parameter(extra), &source, |b, source| {
            b.iter(|| {
                let codec = Codec::from_table(black_box(source)).unwrap();
                black_box(codec);
            });
        });
    }
    g.finish();
}

fn bench_decoding_speed(c: &mut Criterion) {
    let mut g = c.benchmark_group("decoding_speed");
    let codec = Codec::from_table(&gen_table(1024)).unwrap();
    for size in [16 * 1024usize, 256 * 1024, 1024 * 1024] {
        let input = gen_data(size, 1);
        g.throughput(Throughput::Bytes(size as u64));
        g.bench_with_input(BenchmarkId::from_parameter(size), &input, |b, input| {
            b.iter(|| {
                let text = codec.decode(black_box(input)).unwrap();
                black_box(text);
            });
        });
    }
    g.finish();
}

fn bench_encoding_cold(c: &mut Criterion) {
    let mut g = c.benchmark_group("encoding_cold_cache");
    let codec = Codec::from_table(&gen_table(1024)).unwrap();
    for size in [16 * 1024usize, 256 * 1024] {
        let text = codec.decode(&gen_data(size, 2)).unwrap();
        g.throughput(Throughput::Bytes(text.len() as u64));
        g.bench_with_input(BenchmarkId::from_parameter(size), &text, |b, text| {
            b.iter(|| {
                let bytes = codec.encode(black_box(text)).unwrap();
                black_box(bytes);
            });
        });
    }
    g.finish();
}

fn bench_encoding_warm(c: &mut Criterion) {
    let mut g = c.benchmark_group("encoding_warm_cache");
    let codec = Codec::from_table(&gen_table(1024)).unwrap();
    for size in [16 * 1024usize, 256 * 1024] {
        let text = codec.decode(&gen_data(size, 3)).unwrap();
        let mut cache = LineCache::new();
        codec.encode_text(&text, &mut cache).unwrap();
        g.throughput(Throughput::Bytes(text.len() as u64));
        g.bench_with_input(BenchmarkId::from_parameter(size), &text, |b, text| {
            b.iter(|| {
                let out = codec.encode_text(black_box(text), &mut cache).unwrap();
                black_box(out);
            });
        });
    }
    g.finish();
}

fn bench_cache_store(c: &mut Criterion) {
    let mut g = c.benchmark_group("cache_store");
    let codec = Codec::from_table(&gen_table(0)).unwrap();
    let text = codec.decode(&gen_data(256 * 1024, 4)).unwrap();
    let mut cache = LineCache::new();
    codec.encode_text(&text, &mut cache).unwrap();
    let image = tblcodec::cache::store::to_bytes(&cache);

    g.throughput(Throughput::Bytes(image.len() as u64));
    g.bench_function("serialize", |b| {
        b.iter(|| black_box(tblcodec::cache::store::to_bytes(black_box(&cache))));
    });
    g.bench_function("parse", |b| {
        b.iter(|| black_box(tblcodec::cache::store::from_bytes(black_box(&image)).unwrap()));
    });
    g.finish();
}

criterion_group!(
    benches,
    bench_table_build,
    bench_decoding_speed,
    bench_encoding_cold,
    bench_encoding_warm,
    bench_cache_store
);
criterion_main!(benches);
