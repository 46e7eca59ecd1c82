use core::fmt;

/// A half-open interval `[start, end)` of IDs leased to a single worker.
///
/// Ranges are produced by a [`RangeAssigner`] and are never mutated; a worker
/// that exhausts its range discards it and asks the assigner for the next one.
///
/// [`RangeAssigner`]: crate::RangeAssigner
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Range {
    start: u64,
    end: u64,
}

impl Range {
    /// Creates a range covering `[start, end)`.
    ///
    /// # Panics
    ///
    /// Panics if `end < start`.
    ///
    /// # Example
    /// ```
    /// use rangeseq::Range;
    ///
    /// let range = Range::new(10, 15);
    /// assert_eq!(range.len(), 5);
    /// assert!(range.contains(14));
    /// assert!(!range.contains(15));
    /// assert_eq!(range.to_string(), "[10, 15)");
    /// ```
    pub const fn new(start: u64, end: u64) -> Self {
        assert!(start <= end, "range end must not precede its start");
        Self { start, end }
    }

    /// First ID in the range.
    pub const fn start(&self) -> u64 {
        self.start
    }

    /// One past the last ID in the range.
    pub const fn end(&self) -> u64 {
        self.end
    }

    /// Number of IDs the range covers.
    pub const fn len(&self) -> u64 {
        self.end - self.start
    }

    /// Returns `true` if the range covers no IDs. Ranges leased by a
    /// [`RangeAssigner`] are never empty.
    ///
    /// [`RangeAssigner`]: crate::RangeAssigner
    pub const fn is_empty(&self) -> bool {
        self.start == self.end
    }

    /// Returns `true` if `value` may be issued from this range.
    #[inline]
    pub const fn contains(&self, value: u64) -> bool {
        value >= self.start && value < self.end
    }

    /// Returns `true` if `value` is exactly the exclusive end of the range,
    /// i.e. the first cursor position past the last issuable ID.
    #[inline]
    pub const fn is_end(&self, value: u64) -> bool {
        value == self.end
    }
}

impl fmt::Display for Range {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {})", self.start, self.end)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn membership_is_half_open() {
        let range = Range::new(10, 15);
        assert!(!range.contains(9));
        assert!(range.contains(10));
        assert!(range.contains(14));
        assert!(!range.contains(15));
        assert!(range.is_end(15));
        assert!(!range.is_end(14));
        assert_eq!(range.len(), 5);
    }

    #[test]
    fn empty_range_contains_nothing() {
        let range = Range::new(7, 7);
        assert!(range.is_empty());
        assert!(!range.contains(7));
        assert!(range.is_end(7));
    }

    #[test]
    fn displays_as_half_open_interval() {
        assert_eq!(Range::new(0, 5).to_string(), "[0, 5)");
    }

    #[test]
    #[should_panic(expected = "range end must not precede its start")]
    fn rejects_inverted_bounds() {
        let _ = Range::new(5, 4);
    }
}
