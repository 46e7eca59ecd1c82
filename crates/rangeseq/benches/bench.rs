use core::hint::black_box;
use core::num::NonZeroU64;
use criterion::{Criterion, Throughput, criterion_group, criterion_main};
use rangeseq::{AtomicIdGenerator, IdGenerator, RangeAssigner, RwLockIdGenerator};
use std::{
    sync::{Arc, Barrier},
    thread::scope,
    time::{Duration, Instant},
};

// Number of IDs generated per benchmark iteration (per-thread for
// multi-threaded).
const TOTAL_IDS: usize = 4096;

const RANGE_SIZES: [u64; 3] = [8, 256, 65_536];

fn assigner(range_size: u64) -> Arc<RangeAssigner> {
    Arc::new(RangeAssigner::new(
        NonZeroU64::new(range_size).expect("range size must be non-zero"),
    ))
}

/// Benchmarks a single caller hammering one worker.
fn bench_generator<G>(
    c: &mut Criterion,
    group_name: &str,
    generator_fn: impl Fn(Arc<RangeAssigner>) -> G,
) where
    G: IdGenerator,
{
    let mut group = c.benchmark_group(group_name);
    group.throughput(Throughput::Elements(TOTAL_IDS as u64));

    for range_size in RANGE_SIZES {
        group.bench_function(format!("range/{range_size}/elems/{TOTAL_IDS}"), |b| {
            b.iter_custom(|iters| {
                let mut elapsed = Duration::ZERO;

                for _ in 0..iters {
                    let generator = generator_fn(assigner(range_size));

                    let start = Instant::now();
                    for _ in 0..TOTAL_IDS {
                        black_box(generator.next_id());
                    }
                    elapsed += start.elapsed();
                }

                elapsed
            });
        });
    }

    group.finish();
}

/// Benchmarks one worker shared across threads, so rotations race with the
/// fast path.
fn bench_generator_contended<G>(
    c: &mut Criterion,
    group_name: &str,
    generator_fn: impl Fn(Arc<RangeAssigner>) -> G,
) where
    G: IdGenerator + Send + Sync,
{
    let mut group = c.benchmark_group(group_name);

    for threads in [2, 4, 8, num_cpus::get().max(2)] {
        let total_ids = TOTAL_IDS * threads;
        group.throughput(Throughput::Elements(total_ids as u64));

        for range_size in RANGE_SIZES {
            group.bench_function(
                format!("threads/{threads}/range/{range_size}/elems/{total_ids}"),
                |b| {
                    b.iter_custom(|iters| {
                        let mut elapsed = Duration::ZERO;

                        for _ in 0..iters {
                            let generator = generator_fn(assigner(range_size));
                            let barrier = Barrier::new(threads + 1);

                            let start = scope(|s| {
                                for _ in 0..threads {
                                    s.spawn(|| {
                                        barrier.wait();
                                        for _ in 0..TOTAL_IDS {
                                            black_box(generator.next_id());
                                        }
                                    });
                                }
                                barrier.wait();
                                Instant::now()
                            });

                            elapsed += start.elapsed();
                        }

                        elapsed
                    });
                },
            );
        }
    }

    group.finish();
}

fn benchmarks(c: &mut Criterion) {
    bench_generator(c, "sequential/rw_lock", |a| {
        RwLockIdGenerator::new("W1", a).expect("fresh assigner has space")
    });
    bench_generator(c, "sequential/atomic", |a| {
        AtomicIdGenerator::new("W1", a).expect("fresh assigner has space")
    });

    bench_generator_contended(c, "contended/rw_lock", |a| {
        RwLockIdGenerator::new("W1", a).expect("fresh assigner has space")
    });
    bench_generator_contended(c, "contended/atomic", |a| {
        AtomicIdGenerator::new("W1", a).expect("fresh assigner has space")
    });
}

criterion_group!(benches, benchmarks);
criterion_main!(benches);
