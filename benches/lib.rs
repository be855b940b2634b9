use criterion::{black_box, criterion_group, criterion_main, BatchSize, BenchmarkId, Criterion};
use roaring_core::aggregation::{self, Sequential};
use roaring_core::{LazyUnion, MultiOps, RoaringBitmap};

/// A mix of sparse arrays, dense bitmaps and long runs.
fn mixed() -> RoaringBitmap {
    let mut bitmap: RoaringBitmap = (0..1_000_000).step_by(61).collect();
    bitmap.extend((2_000_000..2_200_000).filter(|x| x % 3 != 0));
    bitmap.insert_range(5_000_000..5_300_000).unwrap();
    bitmap.optimize();
    bitmap
}

fn shifted(offset: u32) -> RoaringBitmap {
    let mut bitmap: RoaringBitmap = (offset..1_000_000 + offset).step_by(47).collect();
    bitmap.extend((2_100_000..2_300_000).filter(|x| x % 5 != 0));
    bitmap.insert_range(5_200_000..5_500_000).unwrap();
    bitmap.optimize();
    bitmap
}

fn insert(c: &mut Criterion) {
    c.bench_function("create & insert several", |b| {
        b.iter(|| {
            let mut bitmap = RoaringBitmap::new();
            bitmap.insert(black_box(1));
            bitmap.insert(black_box(10));
            bitmap.insert(black_box(100));
            bitmap.insert(black_box(1_000));
            bitmap.insert(black_box(100_000));
            bitmap.insert(black_box(1_000_000));
            bitmap
        });
    });

    c.bench_function("insert into runs", |b| {
        let mut bitmap = RoaringBitmap::new();
        bitmap.insert_range(0..1_000_000).unwrap();
        b.iter(|| bitmap.insert(black_box(500_000)));
    });

    for size in [10, 1_000, 20_000] {
        let mut group = c.benchmark_group("insert_range");
        group.throughput(criterion::Throughput::Elements(size));
        group.bench_function(format!("from_empty_{}", size), |b| {
            b.iter_batched(
                RoaringBitmap::new,
                |mut bitmap| black_box(bitmap.insert_range(0..size)),
                BatchSize::SmallInput,
            )
        });
        group.finish();
    }
}

fn contains(c: &mut Criterion) {
    let bitmap = mixed();
    let mut group = c.benchmark_group("contains");
    for value in [61 * 1000, 2_000_001, 5_100_000, 9_000_000] {
        group.bench_with_input(BenchmarkId::from_parameter(value), &value, |b, &value| {
            b.iter(|| bitmap.contains(black_box(value)))
        });
    }
    group.finish();
}

fn ops(c: &mut Criterion) {
    let lhs = mixed();
    let rhs = shifted(13);

    let mut group = c.benchmark_group("ops");
    group.bench_function("and", |b| b.iter(|| &lhs & &rhs));
    group.bench_function("or", |b| b.iter(|| &lhs | &rhs));
    group.bench_function("sub", |b| b.iter(|| &lhs - &rhs));
    group.bench_function("xor", |b| b.iter(|| &lhs ^ &rhs));
    group.bench_function("or_not", |b| b.iter(|| lhs.or_not(&rhs, 6_000_000)));
    group.bench_function("union_with", |b| {
        b.iter_batched(|| lhs.clone(), |mut lhs| lhs |= &rhs, BatchSize::SmallInput)
    });
    group.finish();

    let mut group = c.benchmark_group("ops len");
    group.bench_function("intersection_len", |b| b.iter(|| lhs.intersection_len(&rhs)));
    group.bench_function("union_len", |b| b.iter(|| lhs.union_len(&rhs)));
    group.bench_function("difference_len", |b| b.iter(|| lhs.difference_len(&rhs)));
    group.bench_function("symmetric_difference_len", |b| {
        b.iter(|| lhs.symmetric_difference_len(&rhs))
    });
    group.finish();
}

fn is_subset(c: &mut Criterion) {
    c.bench_function("is_subset", |b| {
        let sub: RoaringBitmap = (1000..4096).map(|x| x * 2).collect();
        let sup: RoaringBitmap = (0..16384).collect();
        b.iter(|| black_box(sub.is_subset(&sup)))
    });
}

fn iter(c: &mut Criterion) {
    let bitmap = mixed();
    let mut group = c.benchmark_group("iter");
    group.bench_function("next", |b| b.iter(|| bitmap.iter().fold(0u64, |a, x| a + x as u64)));
    group.bench_function("next_many", |b| {
        let mut buffer = [0u32; 256];
        b.iter(|| {
            let mut iter = bitmap.iter();
            let mut total = 0;
            loop {
                let n = iter.next_many(&mut buffer);
                if n == 0 {
                    break total;
                }
                total += n;
            }
        })
    });
    group.finish();
}

fn optimize(c: &mut Criterion) {
    let mut plain = mixed();
    plain.remove_run_compression();
    c.bench_function("optimize", |b| {
        b.iter_batched(|| plain.clone(), |mut bitmap| bitmap.optimize(), BatchSize::SmallInput)
    });
}

fn serialization(c: &mut Criterion) {
    let bitmap = mixed();
    let mut buffer = Vec::with_capacity(bitmap.serialized_size());
    bitmap.serialize_into(&mut buffer).unwrap();

    c.bench_function("serialize", |b| {
        let mut out = Vec::with_capacity(buffer.len());
        b.iter(|| {
            out.clear();
            bitmap.serialize_into(&mut out).unwrap();
        });
    });
    c.bench_function("deserialize", |b| {
        b.iter(|| RoaringBitmap::deserialize_from(&buffer[..]).unwrap());
    });
    c.bench_function("deserialize_from_slice", |b| {
        b.iter(|| RoaringBitmap::deserialize_from_slice(&buffer).unwrap());
    });
    c.bench_function("serialized_size", |b| b.iter(|| bitmap.serialized_size()));
}

fn successive_or(c: &mut Criterion) {
    let bitmaps: Vec<RoaringBitmap> = (0..64).map(|i| shifted(i * 7_919)).collect();

    let mut group = c.benchmark_group("Successive Or");
    group.bench_function("Successive Or Assign Ref", |b| {
        b.iter(|| {
            let mut output = RoaringBitmap::new();
            for bitmap in &bitmaps {
                output |= bitmap;
            }
            output
        });
    });
    group.bench_function("Multi Ops", |b| b.iter(|| bitmaps.iter().union()));
    group.bench_function("Lazy Union", |b| {
        b.iter(|| bitmaps.iter().collect::<LazyUnion>().repair())
    });
    group.bench_function("Aggregation", |b| b.iter(|| aggregation::union(&Sequential, &bitmaps)));
    group.finish();

    let mut group = c.benchmark_group("Successive Xor");
    group.bench_function("Multi Ops", |b| b.iter(|| bitmaps.iter().symmetric_difference()));
    group.bench_function("Aggregation", |b| {
        b.iter(|| aggregation::symmetric_difference(&Sequential, &bitmaps))
    });
    group.finish();
}

criterion_group!(
    benches,
    insert,
    contains,
    ops,
    is_subset,
    iter,
    optimize,
    serialization,
    successive_or,
);
criterion_main!(benches);
