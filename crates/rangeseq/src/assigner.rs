use core::num::NonZeroU64;

use portable_atomic::{AtomicU64, Ordering};
#[cfg(feature = "tracing")]
use tracing::instrument;

use crate::{Error, Range, Result};

/// Hands out non-overlapping `[start, start + range_size)` ranges.
///
/// This is the only point of coordination between workers. Every call
/// atomically advances a single shared cursor by `range_size`, so ranges are
/// issued in strictly increasing order of `start` and never overlap no matter
/// how many threads ask concurrently.
///
/// The cursor never wraps. A range is only issued if its exclusive end stays
/// strictly below `u64::MAX`, which leaves generators one slot of headroom
/// past the end of their range. Once the space is used up every call returns
/// [`Error::RangeSpaceExhausted`].
///
/// ## See Also
/// - [`RwLockIdGenerator`]
/// - [`AtomicIdGenerator`]
///
/// [`RwLockIdGenerator`]: crate::RwLockIdGenerator
/// [`AtomicIdGenerator`]: crate::AtomicIdGenerator
#[derive(Debug)]
pub struct RangeAssigner {
    #[cfg(feature = "cache-padded")]
    next_start: crossbeam_utils::CachePadded<AtomicU64>,
    #[cfg(not(feature = "cache-padded"))]
    next_start: AtomicU64,
    range_size: NonZeroU64,
}

impl RangeAssigner {
    /// Creates an assigner whose first range starts at zero.
    ///
    /// # Example
    /// ```
    /// use core::num::NonZeroU64;
    /// use rangeseq::RangeAssigner;
    ///
    /// let assigner = RangeAssigner::new(NonZeroU64::new(5).unwrap());
    /// assert_eq!(assigner.next_range().start(), 0);
    /// assert_eq!(assigner.next_range().start(), 5);
    /// ```
    pub fn new(range_size: NonZeroU64) -> Self {
        Self::with_start(0, range_size)
    }

    /// Creates an assigner whose first range starts at `first_start`.
    pub fn with_start(first_start: u64, range_size: NonZeroU64) -> Self {
        Self {
            #[cfg(feature = "cache-padded")]
            next_start: crossbeam_utils::CachePadded::new(AtomicU64::new(first_start)),
            #[cfg(not(feature = "cache-padded"))]
            next_start: AtomicU64::new(first_start),
            range_size,
        }
    }

    /// Number of IDs in every issued range.
    pub const fn range_size(&self) -> u64 {
        self.range_size.get()
    }

    /// Start of the range the next call will issue. Diagnostic only; the value
    /// may be stale by the time it is observed.
    pub fn peek_next_start(&self) -> u64 {
        self.next_start.load(Ordering::Relaxed)
    }

    /// Issues the next range.
    ///
    /// # Panics
    ///
    /// Panics once the `u64` space is exhausted. See
    /// [`Self::try_next_range`] for the fallible form.
    pub fn next_range(&self) -> Range {
        match self.try_next_range() {
            Ok(range) => range,
            Err(e) => panic!("{e}"),
        }
    }

    /// Issues the next range, or reports that no further range fits.
    ///
    /// The advance is a compare-and-swap loop with checked addition rather
    /// than a plain `fetch_add`, so an exhausted cursor stays put instead of
    /// wrapping back onto ranges that were already issued.
    ///
    /// # Errors
    ///
    /// Returns [`Error::RangeSpaceExhausted`] when the next range would end at
    /// or beyond `u64::MAX`.
    #[cfg_attr(feature = "tracing", instrument(level = "trace", skip(self)))]
    pub fn try_next_range(&self) -> Result<Range> {
        let size = self.range_size.get();
        let advanced = self
            .next_start
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |start| {
                start.checked_add(size).filter(|&end| end < u64::MAX)
            });

        match advanced {
            Ok(start) => Ok(Range::new(start, start + size)),
            Err(next_start) => Self::cold_exhausted(next_start, size),
        }
    }

    #[cold]
    #[inline(never)]
    fn cold_exhausted(next_start: u64, range_size: u64) -> Result<Range> {
        #[cfg(feature = "tracing")]
        tracing::error!(next_start, range_size, "range space exhausted");
        Err(Error::RangeSpaceExhausted {
            next_start,
            range_size,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::sync::Mutex;
    use std::thread::scope;

    fn size(n: u64) -> NonZeroU64 {
        NonZeroU64::new(n).unwrap()
    }

    #[test]
    fn issues_consecutive_ranges() {
        let assigner = RangeAssigner::new(size(5));
        assert_eq!(assigner.next_range(), Range::new(0, 5));
        assert_eq!(assigner.next_range(), Range::new(5, 10));
        assert_eq!(assigner.next_range(), Range::new(10, 15));
        assert_eq!(assigner.peek_next_start(), 15);
    }

    #[test]
    fn honours_starting_offset() {
        let assigner = RangeAssigner::with_start(1_000, size(10));
        assert_eq!(assigner.next_range(), Range::new(1_000, 1_010));
        assert_eq!(assigner.range_size(), 10);
    }

    #[test]
    fn concurrent_requests_tile_the_space() {
        const THREADS: usize = 8;
        const PER_THREAD: usize = 1_000;
        const RANGE_SIZE: u64 = 7;

        let assigner = RangeAssigner::new(size(RANGE_SIZE));
        let starts = Mutex::new(HashSet::with_capacity(THREADS * PER_THREAD));

        scope(|s| {
            for _ in 0..THREADS {
                s.spawn(|| {
                    let mut local = Vec::with_capacity(PER_THREAD);
                    for _ in 0..PER_THREAD {
                        let range = assigner.next_range();
                        assert_eq!(range.len(), RANGE_SIZE);
                        local.push(range.start());
                    }
                    let mut starts = starts.lock().unwrap();
                    for start in local {
                        assert!(starts.insert(start), "range {start} issued twice");
                    }
                });
            }
        });

        let starts = starts.into_inner().unwrap();
        let expected: HashSet<u64> = (0..(THREADS * PER_THREAD) as u64)
            .map(|k| k * RANGE_SIZE)
            .collect();
        assert_eq!(starts, expected);
    }

    #[test]
    fn refuses_to_wrap_when_space_runs_out() {
        let assigner = RangeAssigner::with_start(u64::MAX - 11, size(5));
        assert_eq!(
            assigner.next_range(),
            Range::new(u64::MAX - 11, u64::MAX - 6)
        );
        assert_eq!(
            assigner.next_range(),
            Range::new(u64::MAX - 6, u64::MAX - 1)
        );

        let err = assigner.try_next_range().unwrap_err();
        assert_eq!(
            err,
            Error::RangeSpaceExhausted {
                next_start: u64::MAX - 1,
                range_size: 5,
            }
        );
        // The cursor stays put rather than wrapping.
        assert_eq!(assigner.peek_next_start(), u64::MAX - 1);
        assert!(assigner.try_next_range().is_err());
    }

    #[test]
    #[should_panic(expected = "range space exhausted")]
    fn next_range_panics_when_exhausted() {
        let assigner = RangeAssigner::with_start(u64::MAX - 1, size(1));
        let _ = assigner.next_range();
    }
}
