//! Descriptor registry benchmarks.

use std::sync::Arc;

use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use zcompat_core::{CcsidRegistry, CodesetResolver, CodesetTable, ShimConfig};

fn registry() -> CcsidRegistry {
    CcsidRegistry::new(Arc::new(ShimConfig::default()))
}

fn bench_lookup(c: &mut Criterion) {
    let mut group = c.benchmark_group("ccsid_lookup");
    for tracked in [8i32, 1024, 65536] {
        let reg = registry();
        for fd in 0..tracked {
            let _ = reg.set_ccsid(fd, 1047);
        }
        group.bench_with_input(BenchmarkId::new("tracked", tracked), &reg, |b, reg| {
            let mut fd = 0;
            b.iter(|| {
                fd = (fd + 1) % tracked;
                criterion::black_box(reg.ccsid(fd))
            });
        });
    }
    let reg = registry();
    group.bench_function("untracked", |b| {
        b.iter(|| criterion::black_box(reg.ccsid(criterion::black_box(42))));
    });
    group.finish();
}

fn bench_set_and_close(c: &mut Criterion) {
    let reg = registry();
    c.bench_function("ccsid_set_close_cycle", |b| {
        b.iter(|| {
            let _ = reg.set_ccsid(7, 819);
            reg.notify_closed(7);
        });
    });
}

fn bench_transfer_plan(c: &mut Criterion) {
    let reg = registry();
    let _ = reg.set_text(3);
    let _ = reg.set_binary(4);
    c.bench_function("transfer_plan_mixed", |b| {
        b.iter(|| {
            for fd in 3..6 {
                criterion::black_box(reg.transfer_plan(fd));
            }
        });
    });
}

fn bench_codeset_resolve(c: &mut Criterion) {
    let table = CodesetTable;
    let mut group = c.benchmark_group("codeset_resolve");
    for name in ["ISO8859-1", "IBM-1047", "utf-8", "no-such-codeset"] {
        group.bench_with_input(BenchmarkId::from_parameter(name), &name, |b, name| {
            b.iter(|| criterion::black_box(table.resolve(name)));
        });
    }
    group.finish();
}

criterion_group!(
    benches,
    bench_lookup,
    bench_set_and_close,
    bench_transfer_plan,
    bench_codeset_resolve
);
criterion_main!(benches);
