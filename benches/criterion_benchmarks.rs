// Criterion benchmarks: diff and apply throughput on synthetic data.

use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};
use jumpdiff::{apply_bytes, diff_bytes, DiffOptions};

fn noise(len: usize, mut seed: u64) -> Vec<u8> {
    let mut out = Vec::with_capacity(len);
    for _ in 0..len {
        seed ^= seed << 13;
        seed ^= seed >> 7;
        seed ^= seed << 17;
        out.push((seed >> 24) as u8);
    }
    out
}

fn bench_diff(c: &mut Criterion) {
    let size = 1 << 20;
    let source = noise(size, 42);
    let mut dest = source.clone();
    for i in (0..dest.len()).step_by(64 * 1024) {
        dest[i] = dest[i].wrapping_add(1);
    }

    let mut group = c.benchmark_group("diff");
    group.throughput(Throughput::Bytes(size as u64));
    group.bench_function("similar_1mib", |b| {
        b.iter(|| diff_bytes(black_box(&source), black_box(&dest), &DiffOptions::default()))
    });
    group.bench_function("identical_1mib", |b| {
        b.iter(|| diff_bytes(black_box(&source), black_box(&source), &DiffOptions::default()))
    });
    group.finish();
}

fn bench_apply(c: &mut Criterion) {
    let size = 1 << 20;
    let source = noise(size, 43);
    let mut dest = source.clone();
    for i in (0..dest.len()).step_by(64 * 1024) {
        dest[i] = dest[i].wrapping_add(1);
    }
    let patch = diff_bytes(&source, &dest, &DiffOptions::default()).unwrap();

    let mut group = c.benchmark_group("apply");
    group.throughput(Throughput::Bytes(size as u64));
    group.bench_function("similar_1mib", |b| {
        b.iter(|| apply_bytes(black_box(&source), black_box(&patch)))
    });
    group.finish();
}

criterion_group!(benches, bench_diff, bench_apply);
criterion_main!(benches);
