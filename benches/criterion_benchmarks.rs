use criterion::{BenchmarkId, Criterion, Throughput, black_box, criterion_group, criterion_main};
use deltacol::column::{Column, ColumnBuilder, Scalar};

fn lcg(seed: &mut u64) -> u64 {
    *seed = seed.wrapping_mul(6364136223846793005).wrapping_add(1);
    *seed >> 33
}

/// Metric-shaped workload: long flat runs with occasional small steps and
/// sparse gaps, the case the codec is built for.
fn gen_metric(n: usize, seed: u64) -> Vec<(u64, Scalar)> {
    let mut s = seed;
    let mut out = Vec::with_capacity(n);
    let mut index = 0u64;
    let mut value = 72.0f64;
    for _ in 0..n {
        match lcg(&mut s) % 16 {
            0 => value += 0.5,
            1 => value -= 0.5,
            2 => index += lcg(&mut s) % 8,
            _ => {}
        }
        out.push((index, Scalar::double(value)));
        index += 1;
    }
    out
}

/// Worst-case workload: unrelated random doubles, mostly literals.
fn gen_random(n: usize, seed: u64) -> Vec<(u64, Scalar)> {
    let mut s = seed;
    (0..n)
        .map(|i| {
            let bits = (lcg(&mut s) << 33) ^ (lcg(&mut s) << 2) ^ lcg(&mut s);
            (i as u64, Scalar::double(f64::from_bits(bits)))
        })
        .collect()
}

fn encode(pairs: &[(u64, Scalar)]) -> Vec<u8> {
    let mut out = Vec::new();
    let mut builder = ColumnBuilder::new(&mut out, "bench");
    for (index, elem) in pairs {
        builder.append(*index, elem).unwrap();
    }
    builder.finish();
    out
}

fn bench_encode(c: &mut Criterion) {
    let mut g = c.benchmark_group("encode_values_per_s");
    for &n in &[1_000usize, 100_000] {
        let metric = gen_metric(n, 42);
        let random = gen_random(n, 42);
        g.throughput(Throughput::Elements(n as u64));
        g.bench_with_input(BenchmarkId::new("metric", n), &metric, |b, pairs| {
            b.iter(|| black_box(encode(pairs)));
        });
        g.bench_with_input(BenchmarkId::new("random", n), &random, |b, pairs| {
            b.iter(|| black_box(encode(pairs)));
        });
    }
    g.finish();
}

fn bench_decode(c: &mut Criterion) {
    let mut g = c.benchmark_group("decode_values_per_s");
    for &n in &[1_000usize, 100_000] {
        let metric = encode(&gen_metric(n, 42));
        let random = encode(&gen_random(n, 42));
        g.throughput(Throughput::Elements(n as u64));
        g.bench_with_input(BenchmarkId::new("metric", n), &metric, |b, bytes| {
            b.iter(|| {
                let column = Column::parse(bytes).unwrap();
                let mut count = 0usize;
                for item in column.iter() {
                    let _ = black_box(item.unwrap());
                    count += 1;
                }
                count
            });
        });
        g.bench_with_input(BenchmarkId::new("random", n), &random, |b, bytes| {
            b.iter(|| {
                let column = Column::parse(bytes).unwrap();
                column.iter().map(|item| item.unwrap()).count()
            });
        });
    }
    g.finish();
}

fn bench_positional_lookup(c: &mut Criterion) {
    let mut g = c.benchmark_group("positional_lookup");
    let n = 10_000usize;
    let bytes = encode(&gen_metric(n, 7));
    g.bench_function("at_last", |b| {
        let column = Column::parse(&bytes).unwrap();
        let last = column
            .iter()
            .map(|item| item.unwrap().0)
            .last()
            .unwrap();
        b.iter(|| black_box(column.at(last).unwrap()));
    });
    g.finish();
}

criterion_group!(benches, bench_encode, bench_decode, bench_positional_lookup);
criterion_main!(benches);
