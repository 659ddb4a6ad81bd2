use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use reflex::{call, coerce, Signature, Type, Value};

fn int_slice(len: usize) -> Value {
    let items = (0..len as i64).map(Value::int).collect();
    Value::slice_of(&Type::int(), items).unwrap()
}

fn bench_scalars(c: &mut Criterion) {
    c.bench_function("coerce_uint_to_int", |b| {
        let v = Value::uint(42);
        b.iter(|| coerce(black_box(&v), &Type::int(), true).unwrap());
    });

    c.bench_function("coerce_strict_into_any", |b| {
        let v = Value::from("hello");
        b.iter(|| coerce(black_box(&v), &Type::any(), false).unwrap());
    });
}

fn bench_slices(c: &mut Criterion) {
    let mut group = c.benchmark_group("slices");
    let target = Type::slice(Type::any());

    for len in [8usize, 64, 512] {
        let source = int_slice(len);
        group.bench_with_input(BenchmarkId::new("int_to_any", len), &source, |b, source| {
            b.iter(|| coerce(black_box(source), &target, true).unwrap());
        });
    }

    group.finish();
}

fn bench_maps(c: &mut Criterion) {
    let source_ty = Type::map(Type::string(), Type::any());
    let entries = (0..64)
        .map(|i| (Value::from(format!("k{}", i)), Value::int(i)))
        .collect();
    let source = Value::make_map(&source_ty, entries).unwrap();
    let target = Type::map(Type::string(), Type::float64());

    c.bench_function("coerce_map_64", |b| {
        b.iter(|| coerce(black_box(&source), &target, true).unwrap());
    });
}

fn bench_call(c: &mut Criterion) {
    let add = Value::func(
        Signature::new(vec![Type::int(), Type::int()], vec![Type::int()]),
        |args| vec![Value::int(args[0].as_int().unwrap_or(0) + args[1].as_int().unwrap_or(0))],
    );
    let args = [Value::uint(1), Value::uint(2)];

    c.bench_function("call_with_conversion", |b| {
        b.iter(|| call(black_box(&add), black_box(&args), true).unwrap());
    });
}

criterion_group!(benches, bench_scalars, bench_slices, bench_maps, bench_call);
criterion_main!(benches);
