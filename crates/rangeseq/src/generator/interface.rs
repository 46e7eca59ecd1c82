use crate::{Range, Result};

/// A minimal interface for workers that issue IDs out of leased ranges.
///
/// Every implementation shares one [`RangeAssigner`] with its sibling workers
/// and guarantees that:
/// - no two calls, on any worker, return the same value;
/// - every value lies in a range the assigner issued to the worker that
///   returned it;
/// - at most `range_size - 1` IDs of a worker's range are left unissued when
///   that worker rotates away from it.
///
/// [`RangeAssigner`]: crate::RangeAssigner
pub trait IdGenerator {
    /// Stable identifier of this worker, used for diagnostics.
    fn worker_id(&self) -> &str;

    /// Snapshot of the range this worker is currently issuing from.
    fn current_range(&self) -> Range;

    /// Generates the next ID.
    ///
    /// This is the panicking counterpart to [`IdGenerator::try_next_id`].
    ///
    /// # Panics
    ///
    /// Panics if the shared assigner has run out of `u64` space or, with std
    /// locks, if the worker's lock was poisoned.
    fn next_id(&self) -> u64 {
        match self.try_next_id() {
            Ok(id) => id,
            Err(e) => panic!("worker {} failed to generate an id: {e}", self.worker_id()),
        }
    }

    /// Generates the next ID with fallible error handling.
    ///
    /// # Errors
    ///
    /// - [`Error::RangeSpaceExhausted`] once no further range can be leased.
    /// - `Error::LockPoisoned` if the implementation uses a std lock and it
    ///   is poisoned.
    ///
    /// [`Error::RangeSpaceExhausted`]: crate::Error::RangeSpaceExhausted
    fn try_next_id(&self) -> Result<u64>;
}
