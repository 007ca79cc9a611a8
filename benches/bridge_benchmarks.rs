//! Performance benchmarks for the bridge
//!
//! Run with: cargo bench
//!
//! These measure the hot paths of the boundary:
//! - Host cold start
//! - Script run throughput on small sources
//! - Dispatch-heavy property and method traffic
//! - Marshal round-trips for structured values

use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};

use amalgam::marshal::{self, Expected};
use amalgam::{Access, ClassBuilder, Host, HostValue, NativeObject, Value};

struct Tally {
    total: f64,
}

impl NativeObject for Tally {
    fn class_name(&self) -> &'static str {
        "tally"
    }
}

fn bench_host(registered: bool) -> Host {
    let mut host = Host::new();
    if registered {
        host.register_class(
            ClassBuilder::<Tally>::new("tally")
                .constructor(|_| Ok(Tally { total: 0.0 }))
                .method_mut("bump", |t, args| {
                    t.total += args.first().map(|v| v.to_number()).unwrap_or(1.0);
                    Ok(Value::Number(t.total))
                })
                .property(
                    "total",
                    |t| Value::Number(t.total),
                    |t, v| {
                        t.total = v.to_number();
                        Ok(())
                    },
                )
                .finish(),
        )
        .unwrap();
    }
    host
}

/// Benchmark: host cold start
fn bench_cold_start(c: &mut Criterion) {
    c.bench_function("cold_start", |b| {
        b.iter(|| {
            let host = bench_host(true);
            black_box(host)
        })
    });
}

/// Benchmark: small script evaluation
fn bench_run(c: &mut Criterion) {
    let mut group = c.benchmark_group("run");

    group.bench_function("arithmetic", |b| {
        let mut host = bench_host(false);
        b.iter(|| host.run(black_box("1 + 2 * 3 - 4 / 2")).unwrap())
    });

    group.bench_function("template_interpolation", |b| {
        let mut host = bench_host(false);
        host.run("var name = 'world';").unwrap();
        b.iter(|| host.run(black_box("`hello ${name}`")).unwrap())
    });

    group.bench_function("function_call", |b| {
        let mut host = bench_host(false);
        host.run("function add(a, b) { return a + b; }").unwrap();
        b.iter(|| host.run(black_box("add(3, 4)")).unwrap())
    });

    group.finish();
}

/// Benchmark: dispatch-heavy native traffic
fn bench_dispatch(c: &mut Criterion) {
    let mut group = c.benchmark_group("dispatch");
    group.throughput(Throughput::Elements(100));

    group.bench_function("method_loop", |b| {
        let mut host = bench_host(true);
        host.run("var t = new tally();").unwrap();
        b.iter(|| {
            host.run(black_box(
                "var i = 0; while (i < 100) { t.bump(1); i += 1; } t.total",
            ))
            .unwrap()
        })
    });

    group.bench_function("property_loop", |b| {
        let mut host = bench_host(true);
        host.run("var t = new tally();").unwrap();
        b.iter(|| {
            host.run(black_box(
                "var i = 0; while (i < 100) { t.total = t.total + 1; i += 1; } t.total",
            ))
            .unwrap()
        })
    });

    group.finish();
}

/// Benchmark: marshal round-trips
fn bench_marshal(c: &mut Criterion) {
    let mut group = c.benchmark_group("marshal");

    let seq = HostValue::Seq((0..64).map(|i| HostValue::Number(i as f64)).collect());
    group.bench_function("seq_round_trip", |b| {
        b.iter(|| {
            let script = marshal::to_script(black_box(seq.clone()));
            marshal::to_native(&script, Expected::Seq).unwrap()
        })
    });

    let map = HostValue::Map(
        (0..64)
            .map(|i| (format!("key_{}", i), HostValue::Number(i as f64)))
            .collect(),
    );
    group.bench_function("map_round_trip", |b| {
        b.iter(|| {
            let script = marshal::to_script(black_box(map.clone()));
            marshal::to_native(&script, Expected::Map).unwrap()
        })
    });

    group.finish();
}

/// Benchmark: native object registration and destruction
fn bench_registry(c: &mut Criterion) {
    c.bench_function("register_destroy", |b| {
        let mut host = bench_host(true);
        b.iter(|| {
            let handle = host.register_object(Tally { total: 0.0 }, Access::Mutable);
            host.destroy_object(black_box(&handle)).unwrap()
        })
    });
}

criterion_group!(
    benches,
    bench_cold_start,
    bench_run,
    bench_dispatch,
    bench_registry,
    bench_marshal
);
criterion_main!(benches);
