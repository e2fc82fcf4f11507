//! Basic benchmarks for the `atomic_pool` crate.
#![allow(
    missing_docs,
    reason = "No need for API documentation in benchmark code"
)]

use std::hint::black_box;
use std::num::NonZero;
use std::thread;
use std::time::Instant;

use alloc_tracker::Allocator;
use atomic_pool::AtomicPool;
use criterion::{Criterion, criterion_group, criterion_main};
use new_zealand::nz;

criterion_group!(benches, entrypoint);
criterion_main!(benches);

#[global_allocator]
static ALLOCATOR: Allocator<std::alloc::System> = Allocator::system();

type TestItem = usize;
const TEST_VALUE: TestItem = 1024;

const POOL_CAPACITY: NonZero<usize> = nz!(1024);

fn entrypoint(c: &mut Criterion) {
    let allocs = alloc_tracker::Session::new();

    let mut group = c.benchmark_group("pool_basic");

    let allocs_op = allocs.operation("build_and_drop");
    group.bench_function("build_and_drop", |b| {
        b.iter_custom(|iters| {
            let _span = allocs_op.measure_thread().iterations(iters);

            let start = Instant::now();

            for _ in 0..iters {
                drop(black_box(
                    AtomicPool::<TestItem>::builder()
                        .capacity(POOL_CAPACITY)
                        .build(),
                ));
            }

            start.elapsed()
        });
    });

    // The steady-state churn cycle. The allocation report for this operation
    // is the evidence that neither insert nor release touches the
    // general-purpose allocator.
    let allocs_op = allocs.operation("insert_and_release");
    group.bench_function("insert_and_release", |b| {
        b.iter_custom(|iters| {
            let pool = AtomicPool::<TestItem>::builder()
                .capacity(POOL_CAPACITY)
                .build();

            let _span = allocs_op.measure_thread().iterations(iters);

            let start = Instant::now();

            for _ in 0..iters {
                drop(black_box(pool.insert(black_box(TEST_VALUE))));
            }

            start.elapsed()
        });
    });

    let allocs_op = allocs.operation("read_one");
    group.bench_function("read_one", |b| {
        b.iter_custom(|iters| {
            let pool = AtomicPool::<TestItem>::builder()
                .capacity(POOL_CAPACITY)
                .build();

            let item = pool
                .insert(TEST_VALUE)
                .expect("a fresh pool has a free slot");

            let _span = allocs_op.measure_thread().iterations(iters);

            let start = Instant::now();

            for _ in 0..iters {
                _ = black_box(*item);
            }

            start.elapsed()
        });
    });

    group.bench_function("contended_churn_four_threads", |b| {
        b.iter_custom(|iters| {
            // Deliberately smaller than the demand so claims contend on the
            // free-list head and exhaustion paths get exercised.
            let pool = AtomicPool::<TestItem>::builder().capacity(nz!(16)).build();

            let start = Instant::now();

            thread::scope(|s| {
                for _ in 0..4 {
                    s.spawn(|| {
                        for _ in 0..iters {
                            drop(black_box(pool.insert(black_box(TEST_VALUE))));
                        }
                    });
                }
            });

            start.elapsed()
        });
    });

    group.finish();

    allocs.print_to_stdout();
}
