use std::sync::Arc;

use portable_atomic::{AtomicU128, Ordering};
#[cfg(feature = "tracing")]
use tracing::instrument;

use crate::{IdGenerator, Range, RangeAssigner, Result};

/// A lock-free ID generator.
///
/// The leased range and the cursor are packed together into a single
/// [`AtomicU128`] and always replaced as a pair, so a reader can never see a
/// new range combined with the old cursor or the other way around.
///
/// Each attempt reads the pair once and classifies the cursor:
/// - inside the range: claim it with a CAS and return it;
/// - exactly at the range end: the caller whose CAS moves the cursor past the
///   end is the only one elected to rotate;
/// - past the range end: a rotation is in flight, so spin and re-read.
///
/// ## Features
/// - ✅ Thread-safe
/// - ✅ Never blocks on targets with a native 128-bit compare-and-swap
/// - ❌ No fairness: callers spin while another caller rotates
///
/// ## Caveats
/// Lock-freedom depends on [`AtomicU128`] being lock-free on the target. This
/// crate does not enable `portable-atomic`'s `fallback` feature, but a
/// dependent crate may. On targets without a native 128-bit CAS (for example
/// `armv7` or `riscv64gc`) the pair is then guarded by `portable-atomic`'s
/// global lock table. Check [`AtomicIdGenerator::is_lock_free`] before relying
/// on it.
///
/// ## Recommended When
/// - Throughput matters more than fair access
/// - Rotations are short (the assigner is a single atomic)
///
/// ## See Also
/// - [`RwLockIdGenerator`]
///
/// [`RwLockIdGenerator`]: crate::RwLockIdGenerator
pub struct AtomicIdGenerator {
    worker_id: String,
    assigner: Arc<RangeAssigner>,
    range_size: u64,
    #[cfg(feature = "cache-padded")]
    state: crossbeam_utils::CachePadded<AtomicU128>,
    #[cfg(not(feature = "cache-padded"))]
    state: AtomicU128,
}

/// The `(range start, cursor)` pair stored in [`AtomicIdGenerator::state`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct Lease {
    start: u64,
    cursor: u64,
}

/// Where a cursor sits relative to the leased range.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Slot {
    Within(u64),
    RangeEnd,
    Beyond,
}

impl Lease {
    const CURSOR_MASK: u128 = u64::MAX as u128;

    const fn from_raw(raw: u128) -> Self {
        Self {
            start: (raw >> 64) as u64,
            cursor: (raw & Self::CURSOR_MASK) as u64,
        }
    }

    const fn to_raw(self) -> u128 {
        ((self.start as u128) << 64) | self.cursor as u128
    }

    const fn classify(self, range_size: u64) -> Slot {
        let end = self.start + range_size;
        if self.cursor < end {
            Slot::Within(self.cursor)
        } else if self.cursor == end {
            Slot::RangeEnd
        } else {
            Slot::Beyond
        }
    }

    const fn advanced(self) -> Self {
        Self {
            start: self.start,
            cursor: self.cursor + 1,
        }
    }
}

impl AtomicIdGenerator {
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
    /// use rangeseq::{AtomicIdGenerator, IdGenerator, RangeAssigner};
    ///
    /// let assigner = Arc::new(RangeAssigner::new(NonZeroU64::new(2).unwrap()));
    /// let first = AtomicIdGenerator::new("W1", Arc::clone(&assigner)).unwrap();
    /// let second = AtomicIdGenerator::new("W2", assigner).unwrap();
    ///
    /// assert_eq!(first.next_id(), 0);
    /// assert_eq!(second.next_id(), 2);
    /// assert_eq!(first.next_id(), 1);
    /// // `first` has drained [0, 2) and rotates onto the next free range.
    /// assert_eq!(first.next_id(), 4);
    /// ```
    ///
    /// [`Error::RangeSpaceExhausted`]: crate::Error::RangeSpaceExhausted
    pub fn new(worker_id: impl Into<String>, assigner: Arc<RangeAssigner>) -> Result<Self> {
        let range = assigner.try_next_range()?;
        let initial = Lease {
            start: range.start(),
            cursor: range.start(),
        }
        .to_raw();

        Ok(Self {
            worker_id: worker_id.into(),
            range_size: assigner.range_size(),
            assigner,
            #[cfg(feature = "cache-padded")]
            state: crossbeam_utils::CachePadded::new(AtomicU128::new(initial)),
            #[cfg(not(feature = "cache-padded"))]
            state: AtomicU128::new(initial),
        })
    }

    /// Generates the next ID.
    ///
    /// # Errors
    ///
    /// See [`IdGenerator::try_next_id`].
    pub fn try_next_id(&self) -> Result<u64> {
        let mut current = self.state.load(Ordering::Acquire);

        loop {
            let lease = Lease::from_raw(current);
            let slot = lease.classify(self.range_size);

            if slot == Slot::Beyond {
                #[cfg(feature = "tracing")]
                tracing::trace!(
                    worker = %self.worker_id,
                    cursor = lease.cursor,
                    "range end passed, waiting for rotation"
                );
                core::hint::spin_loop();
                current = self.state.load(Ordering::Acquire);
                continue;
            }

            match self.state.compare_exchange_weak(
                current,
                lease.advanced().to_raw(),
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(_) => {
                    return match slot {
                        Slot::Within(id) => Ok(id),
                        _ => self.cold_rotate(lease),
                    };
                }
                // Another caller advanced the pair first; retry against what it
                // installed.
                Err(actual) => current = actual,
            }
        }
    }

    /// Installs a fresh range. Only the caller that moved the cursor from the
    /// range end to one past it gets here, so at most one rotation runs per
    /// exhausted range.
    ///
    /// While it runs every other caller sees a cursor past the end and spins
    /// without writing, which is why the new pair can be stored rather than
    /// compare-and-swapped.
    #[cold]
    #[inline(never)]
    #[cfg_attr(
        feature = "tracing",
        instrument(level = "debug", skip(self, exhausted), fields(worker = %self.worker_id))
    )]
    fn cold_rotate(&self, exhausted: Lease) -> Result<u64> {
        let fresh = match self.assigner.try_next_range() {
            Ok(fresh) => fresh,
            Err(e) => {
                // Put the cursor back on the range end so the next caller is
                // elected and observes the same error instead of spinning.
                self.state.store(
                    Lease {
                        start: exhausted.start,
                        cursor: exhausted.start + self.range_size,
                    }
                    .to_raw(),
                    Ordering::Release,
                );
                return Err(e);
            }
        };

        self.state.store(
            Lease {
                start: fresh.start(),
                cursor: fresh.start() + 1,
            }
            .to_raw(),
            Ordering::Release,
        );

        #[cfg(feature = "tracing")]
        tracing::debug!(range = %fresh, id = fresh.start(), "rotated to new range");
        Ok(fresh.start())
    }

    /// Returns `true` if the packed `(start, cursor)` state is updated without
    /// taking a lock on this target.
    pub fn is_lock_free() -> bool {
        AtomicU128::is_lock_free()
    }

    /// Snapshot of the range currently being issued from.
    pub fn current_range(&self) -> Range {
        let lease = Lease::from_raw(self.state.load(Ordering::Acquire));
        Range::new(lease.start, lease.start + self.range_size)
    }
}

impl IdGenerator for AtomicIdGenerator {
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
