use criterion::{black_box, criterion_group, criterion_main, Criterion};
use searchrs::codec::{unary, varbyte};

fn varbyte_encode_benchmark(c: &mut Criterion) {
    let values: Vec<u64> = (0..100_000u64).map(|i| i * 37 + 1).collect();
    c.bench_function("varbyte_encode_all_100k", |b| {
        b.iter(|| varbyte::encode_all(black_box(values.iter().copied())))
    });
}

fn varbyte_decode_benchmark(c: &mut Criterion) {
    let values: Vec<u64> = (0..100_000u64).map(|i| i * 37 + 1).collect();
    let bytes = varbyte::encode_all(values.iter().copied());
    c.bench_function("varbyte_decode_all_100k", |b| {
        b.iter(|| {
            let decoded: Vec<u64> = varbyte::VarByteDecoder::new(black_box(&bytes)).collect();
            decoded
        })
    });
}

fn unary_encode_benchmark(c: &mut Criterion) {
    let values: Vec<u64> = (0..100_000u64).map(|i| (i % 20) + 1).collect();
    c.bench_function("unary_encode_all_100k", |b| {
        b.iter(|| unary::encode_all(black_box(values.iter().copied())))
    });
}

fn unary_decode_benchmark(c: &mut Criterion) {
    let values: Vec<u64> = (0..100_000u64).map(|i| (i % 20) + 1).collect();
    let bytes = unary::encode_all(values.iter().copied());
    c.bench_function("unary_decode_all_100k", |b| {
        b.iter(|| {
            let mut dec = unary::UnaryDecoder::new(black_box(&bytes));
            let mut out = Vec::with_capacity(values.len());
            for _ in 0..values.len() {
                out.push(dec.next().unwrap());
            }
            out
        })
    });
}

criterion_group!(
    benches,
    varbyte_encode_benchmark,
    varbyte_decode_benchmark,
    unary_encode_benchmark,
    unary_decode_benchmark
);
criterion_main!(benches);
