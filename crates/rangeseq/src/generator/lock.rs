use std::sync::Arc;

use portable_atomic::{AtomicU64, Ordering};
#[cfg(feature = "tracing")]
use tracing::instrument;

#[cfg(not(feature = "parking-lot"))]
use crate::generator::rwlock::PoisonError;
use crate::{IdGenerator, Range, RangeAssigner, Result, generator::rwlock::RwLock};

/// A reader/writer-lock based ID generator.
///
/// The current range sits behind an `RwLock` while the cursor is a separate
/// atomic. Steady-state calls take the lock in shared mode and only bump the
/// cursor, so any number of callers can issue IDs from the same range at once.
/// Exclusive mode is taken only to rotate onto a new range.
///
/// ## Features
/// - ✅ Thread-safe
/// - ✅ Callers waiting on a rotation park instead of spinning
///
/// ## Recommended When
/// - Ranges are large relative to the number of concurrent callers
/// - Callers should block rather than burn CPU while a rotation is in flight
///
/// ## See Also
/// - [`AtomicIdGenerator`]
///
/// [`AtomicIdGenerator`]: crate::AtomicIdGenerator
pub struct RwLockIdGenerator {
    worker_id: String,
    assigner: Arc<RangeAssigner>,
    range: RwLock<Range>,
    #[cfg(feature = "cache-padded")]
    next: crossbeam_utils::CachePadded<AtomicU64>,
    #[cfg(not(feature = "cache-padded"))]
    next: AtomicU64,
}

impl RwLockIdGenerator {
    /// Creates a worker and leases its first range from `assigner`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::RangeSpaceExhausted`] if the assigner has no range
    /// left to lease.
    ///
    /// # Example
    /// ```
    /// use core::num::NonZeroU64;
    /// use std::sync::Arc;
    /// use rangeseq::{IdGenerator, RangeAssigner, RwLockIdGenerator};
    ///
    /// let assigner = Arc::new(RangeAssigner::new(NonZeroU64::new(2).unwrap()));
    /// let worker = RwLockIdGenerator::new("W1", assigner).unwrap();
    ///
    /// assert_eq!(worker.next_id(), 0);
    /// assert_eq!(worker.next_id(), 1);
    /// assert_eq!(worker.next_id(), 2);
    /// ```
    ///
    /// [`Error::RangeSpaceExhausted`]: crate::Error::RangeSpaceExhausted
    pub fn new(worker_id: impl Into<String>, assigner: Arc<RangeAssigner>) -> Result<Self> {
        let range = assigner.try_next_range()?;
        Ok(Self {
            worker_id: worker_id.into(),
            assigner,
            range: RwLock::new(range),
            #[cfg(feature = "cache-padded")]
            next: crossbeam_utils::CachePadded::new(AtomicU64::new(range.start())),
            #[cfg(not(feature = "cache-padded"))]
            next: AtomicU64::new(range.start()),
        })
    }

    /// Generates the next ID.
    ///
    /// The cursor is bumped while holding the shared lock. Moving the
    /// increment outside the lock would let it interleave with a rotation and
    /// land on the old range after the cursor was reset for the new one.
    ///
    /// # Errors
    ///
    /// See [`IdGenerator::try_next_id`].
    pub fn try_next_id(&self) -> Result<u64> {
        {
            let range = {
                #[cfg(feature = "parking-lot")]
                {
                    self.range.read()
                }
                #[cfg(not(feature = "parking-lot"))]
                {
                    self.range.read()?
                }
            };

            let id = self.next.fetch_add(1, Ordering::Relaxed);
            if range.contains(id) {
                return Ok(id);
            }
        }

        self.cold_rotate()
    }

    /// Slow path, entered once the cursor has run past the current range.
    ///
    /// Several callers can fall through the fast path for the same exhausted
    /// range and queue up here. Only the first one to get exclusive access may
    /// rotate; the rest must bump and re-check the cursor again, because by
    /// then it has been reset into a fresh range. Skipping that second check
    /// would rotate once per queued caller and leave every range but the last
    /// one unused.
    #[cold]
    #[inline(never)]
    #[cfg_attr(
        feature = "tracing",
        instrument(level = "debug", skip(self), fields(worker = %self.worker_id))
    )]
    fn cold_rotate(&self) -> Result<u64> {
        let mut range = {
            #[cfg(feature = "parking-lot")]
            {
                self.range.write()
            }
            #[cfg(not(feature = "parking-lot"))]
            {
                self.range.write()?
            }
        };

        let id = self.next.fetch_add(1, Ordering::Relaxed);
        let current = *range;
        if current.contains(id) {
            #[cfg(feature = "tracing")]
            tracing::debug!(range = %current, id, "rotation already done by another caller");
            return Ok(id);
        }

        // On exhaustion `range` stays put while later callers keep bumping
        // `next`, which eventually wraps past `u64::MAX` to 0. Wrapped values
        // are below the range and fail the `contains` check, so none is issued.
        let fresh = self.assigner.try_next_range()?;
        *range = fresh;
        self.next.store(fresh.start() + 1, Ordering::Relaxed);

        #[cfg(feature = "tracing")]
        tracing::debug!(range = %fresh, id = fresh.start(), "rotated to new range");
        Ok(fresh.start())
    }

    /// Snapshot of the range currently being issued from.
    pub fn current_range(&self) -> Range {
        #[cfg(feature = "parking-lot")]
        {
            *self.range.read()
        }
        #[cfg(not(feature = "parking-lot"))]
        {
            *self.range.read().unwrap_or_else(PoisonError::into_inner)
        }
    }
}

impl IdGenerator for RwLockIdGenerator {
    fn worker_id(&self) -> &str {
        &self.worker_id
    }

    fn current_range(&self) -> Range {
        self.current_range()
    }

    fn try_next_id(&self) -> Result<u64> {
        self.try_next_id()
    }
}
