/*!
 * Hot-path Benchmark
 * Guard push/pop and tracked-allocation overhead
 */

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use mtag::{EngineConfig, ScopeAlloc, ScopeGuard};

#[global_allocator]
static ALLOC: ScopeAlloc = ScopeAlloc::system();

fn ensure_engine() {
    // first group function to run brings the engine up; later calls are
    // refused and that is fine
    let _ = mtag::init(EngineConfig::default());
}

fn benchmark_scope_push_pop(c: &mut Criterion) {
    ensure_engine();
    c.bench_function("scope_push_pop", |b| {
        b.iter(|| {
            let _scope = ScopeGuard::new(black_box("bench_scope"));
        });
    });

    c.bench_function("scope_push_pop_nested", |b| {
        b.iter(|| {
            let _outer = ScopeGuard::new(black_box("outer"));
            let _inner = ScopeGuard::new(black_box("inner"));
        });
    });
}

fn benchmark_tracked_alloc(c: &mut Criterion) {
    ensure_engine();
    let _scope = ScopeGuard::new("bench_alloc");
    c.bench_function("tracked_vec_alloc", |b| {
        b.iter(|| {
            let v: Vec<u8> = Vec::with_capacity(black_box(64));
            black_box(v);
        });
    });
}

criterion_group!(benches, benchmark_scope_push_pop, benchmark_tracked_alloc);
criterion_main!(benches);
