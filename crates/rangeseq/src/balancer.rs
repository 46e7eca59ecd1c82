use portable_atomic::{AtomicUsize, Ordering};

use crate::{Error, IdGenerator, Result};

/// Round-robins callers across a fixed pool of ID generators.
///
/// The pool is immutable once built; the only shared mutable state is the
/// round-robin cursor, which is advanced with a single relaxed `fetch_add`.
pub struct LoadBalancer<G> {
    workers: Vec<G>,
    #[cfg(feature = "cache-padded")]
    next_worker: crossbeam_utils::CachePadded<AtomicUsize>,
    #[cfg(not(feature = "cache-padded"))]
    next_worker: AtomicUsize,
}

impl<G> LoadBalancer<G>
where
    G: IdGenerator,
{
    /// Creates a balancer over `workers`, dispatching to them in order.
    ///
    /// # Errors
    ///
    /// Returns [`Error::EmptyPool`] if `workers` is empty.
    ///
    /// # Example
    /// ```
    /// use core::num::NonZeroU64;
    /// use std::sync::Arc;
    /// use rangeseq::{IdGenerator, LoadBalancer, RangeAssigner, RwLockIdGenerator};
    ///
    /// let assigner = Arc::new(RangeAssigner::new(NonZeroU64::new(10).unwrap()));
    /// let workers = vec![
    ///     RwLockIdGenerator::new("W1", Arc::clone(&assigner)).unwrap(),
    ///     RwLockIdGenerator::new("W2", assigner).unwrap(),
    /// ];
    /// let balancer = LoadBalancer::new(workers).unwrap();
    ///
    /// assert_eq!(balancer.next().worker_id(), "W1");
    /// assert_eq!(balancer.next().worker_id(), "W2");
    /// assert_eq!(balancer.next().worker_id(), "W1");
    /// ```
    pub fn new(workers: Vec<G>) -> Result<Self> {
        if workers.is_empty() {
            return Err(Error::EmptyPool);
        }

        Ok(Self {
            workers,
            #[cfg(feature = "cache-padded")]
            next_worker: crossbeam_utils::CachePadded::new(AtomicUsize::new(0)),
            #[cfg(not(feature = "cache-padded"))]
            next_worker: AtomicUsize::new(0),
        })
    }

    /// Computes the next worker index using relaxed atomic round-robin logic.
    pub fn next_worker_index(&self) -> usize {
        self.next_worker.fetch_add(1, Ordering::Relaxed) % self.workers.len()
    }

    /// Returns the worker the next request should go to.
    pub fn next(&self) -> &G {
        &self.workers[self.next_worker_index()]
    }

    /// Generates an ID on the next worker and returns it together with the
    /// worker that issued it.
    ///
    /// # Errors
    ///
    /// Propagates the worker's [`IdGenerator::try_next_id`] error.
    pub fn try_next_id(&self) -> Result<(u64, &G)> {
        let worker = self.next();
        worker.try_next_id().map(|id| (id, worker))
    }

    /// Number of workers in the pool.
    pub fn len(&self) -> usize {
        self.workers.len()
    }

    /// Always `false`; construction rejects empty pools.
    pub fn is_empty(&self) -> bool {
        self.workers.is_empty()
    }

    /// The pool in dispatch order. Indices match those returned by
    /// [`Self::next_worker_index`].
    pub fn workers(&self) -> &[G] {
        &self.workers
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{AtomicIdGenerator, RangeAssigner};
    use core::num::NonZeroU64;
    use std::sync::Arc;
    use std::thread::scope;

    fn pool(workers: usize, range_size: u64) -> LoadBalancer<AtomicIdGenerator> {
        let assigner = Arc::new(RangeAssigner::new(NonZeroU64::new(range_size).unwrap()));
        let workers = (1..=workers)
            .map(|i| AtomicIdGenerator::new(format!("W{i}"), Arc::clone(&assigner)).unwrap())
            .collect();
        LoadBalancer::new(workers).unwrap()
    }

    #[test]
    fn round_robin_cycles_through_workers() {
        let balancer = pool(3, 10);
        let order: Vec<&str> = (0..7).map(|_| balancer.next().worker_id()).collect();
        assert_eq!(order, ["W1", "W2", "W3", "W1", "W2", "W3", "W1"]);
    }

    #[test]
    fn single_worker_always_selected() {
        let balancer = pool(1, 10);
        for _ in 0..10 {
            assert_eq!(balancer.next_worker_index(), 0);
        }
    }

    #[test]
    fn rejects_empty_pool() {
        let result = LoadBalancer::<AtomicIdGenerator>::new(Vec::new());
        assert_eq!(result.err(), Some(Error::EmptyPool));
    }

    #[test]
    fn dispatch_pairs_id_with_issuing_worker() {
        let balancer = pool(2, 4);
        let (id, worker) = balancer.try_next_id().unwrap();
        assert_eq!((id, worker.worker_id()), (0, "W1"));
        let (id, worker) = balancer.try_next_id().unwrap();
        assert_eq!((id, worker.worker_id()), (4, "W2"));
        assert_eq!(balancer.len(), 2);
        assert_eq!(balancer.workers().len(), 2);
    }

    #[test]
    fn concurrent_dispatch_spreads_load_evenly() {
        const THREADS: usize = 6;
        const CALLS: usize = 999;

        let balancer = pool(3, 8);
        let mut counts = [0usize; 3];

        let per_thread: Vec<[usize; 3]> = scope(|s| {
            let handles: Vec<_> = (0..THREADS)
                .map(|_| {
                    s.spawn(|| {
                        let mut local = [0usize; 3];
                        for _ in 0..CALLS {
                            local[balancer.next_worker_index()] += 1;
                        }
                        local
                    })
                })
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });

        for local in per_thread {
            for (total, n) in counts.iter_mut().zip(local) {
                *total += n;
            }
        }
        assert_eq!(counts, [THREADS * CALLS / 3; 3]);
    }
}
