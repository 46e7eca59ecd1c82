//! Post-run verification of a batch of issued IDs.
//!
//! [`audit`] checks the three properties every sequencer run must hold:
//!
//! 1. **Completeness**: exactly as many IDs were issued as were requested.
//! 2. **Uniqueness**: no value was issued twice.
//! 3. **Bounded gaps**: the never-issued values between the lowest and highest
//!    issued ID number at most `(num_workers - 1) * (range_size - 1)`. With
//!    three workers and a range size of ten, each having issued one ID, the
//!    leases are `[0, 10)`, `[10, 20)`, `[20, 30)` and the values `1..=9` and
//!    `11..=19` are missing: eighteen in total.
//!
//! Violations are collected into the [`AuditReport`] rather than raised, so a
//! run always finishes with a full diagnostic summary.

use core::fmt;

use crate::{ClientLoad, IssuedId, Range, SequencerConfig};

/// Inputs the audit needs besides the issued IDs themselves.
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AuditParams {
    /// Number of IDs the clients requested in total.
    pub expected_ids: usize,
    /// Size of every leased range.
    pub range_size: u64,
    /// Start of the first range the assigner handed out; ranges are aligned
    /// to it.
    pub first_id: u64,
    /// Largest number of never-issued IDs the run may leave behind.
    pub max_missing_ids: u64,
}

impl AuditParams {
    /// Derives the audit inputs from the sequencer config and the load it
    /// was driven with. A load whose total overflows expects `usize::MAX`.
    ///
    /// # Example
    /// ```
    /// use core::num::{NonZeroU64, NonZeroUsize};
    /// use rangeseq::{AuditParams, ClientLoad, SequencerConfig};
    ///
    /// let config = SequencerConfig::new(NonZeroUsize::new(3).unwrap(), NonZeroU64::new(5).unwrap());
    /// let params = AuditParams::new(&config, &ClientLoad::new(10, 100));
    ///
    /// assert_eq!(params.expected_ids, 1_000);
    /// assert_eq!(params.max_missing_ids, 8);
    /// ```
    pub const fn new(config: &SequencerConfig, load: &ClientLoad) -> Self {
        Self {
            expected_ids: match load.expected_ids() {
                Some(n) => n,
                None => usize::MAX,
            },
            range_size: config.range_size.get(),
            first_id: config.first_id,
            max_missing_ids: config.max_missing_ids(),
        }
    }

    /// The leased range `value` falls in.
    fn range_of(&self, value: u64) -> Range {
        let offset = value.saturating_sub(self.first_id);
        let start = self.first_id + offset / self.range_size * self.range_size;
        Range::new(start, start.saturating_add(self.range_size))
    }
}

/// A run of never-issued values between two consecutive issued IDs.
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Gap {
    /// The tail of a range its worker had not finished when the run ended.
    Unfinished {
        /// The partly used range.
        range: Range,
        /// Highest ID issued from it.
        last_id: u64,
        /// Index of the worker that issued `last_id`.
        worker: usize,
    },
    /// `[from, to)` starts on a range boundary and nothing in it was issued.
    Lost {
        /// First never-issued value, on a range boundary.
        from: u64,
        /// Next issued value.
        to: u64,
    },
}

impl fmt::Display for Gap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unfinished {
                range,
                last_id,
                worker,
            } => write!(f, "{range}, last id: {last_id}, worker: #{worker}"),
            Self::Lost { from, to } => write!(f, "[{from}, {to}), LOST"),
        }
    }
}

/// Outcome of [`audit`].
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AuditReport {
    /// Number of IDs the clients requested.
    pub expected_ids: usize,
    /// Number of IDs actually returned, duplicates included.
    pub generated_ids: usize,
    /// Every occurrence of a value after its first.
    pub duplicates: Vec<IssuedId>,
    /// Values inside [`Self::span`] that nobody received.
    pub missing_ids: u64,
    /// Allowance `missing_ids` is checked against.
    pub max_missing_ids: u64,
    /// Descriptions of every hole between consecutive issued values, in
    /// ascending order.
    pub gaps: Vec<Gap>,
    /// `[lowest, highest + 1)` of the issued values, if any were issued.
    pub span: Option<Range>,
}

impl AuditReport {
    /// `true` if every requested ID was returned.
    pub fn is_complete(&self) -> bool {
        self.generated_ids == self.expected_ids
    }

    /// `true` if no value was returned twice.
    pub fn is_unique(&self) -> bool {
        self.duplicates.is_empty()
    }

    /// `true` if the never-issued values stay within the allowance.
    pub fn is_within_gap_bound(&self) -> bool {
        self.missing_ids <= self.max_missing_ids
    }

    /// `true` if every check passed.
    pub fn is_clean(&self) -> bool {
        self.is_complete() && self.is_unique() && self.is_within_gap_bound()
    }

    /// Emits one event per check: `error` for a violation, `info` otherwise.
    #[cfg(feature = "tracing")]
    pub fn log(&self) {
        if self.is_complete() {
            tracing::info!(generated = self.generated_ids, "generated expected number of ids");
        } else {
            tracing::error!(
                expected = self.expected_ids,
                generated = self.generated_ids,
                "result size mismatch"
            );
        }

        if self.is_unique() {
            tracing::info!("no duplicates found");
        } else {
            tracing::error!(
                count = self.duplicates.len(),
                duplicates = %join(&self.duplicates),
                "found duplicate ids"
            );
        }

        if self.is_within_gap_bound() {
            tracing::info!(
                missing = self.missing_ids,
                allowed = self.max_missing_ids,
                unfinished = %join(&self.gaps),
                "id ranges depleted evenly"
            );
        } else {
            tracing::error!(
                missing = self.missing_ids,
                allowed = self.max_missing_ids,
                unfinished = %join(&self.gaps),
                "missing ids exceed allowance"
            );
        }
    }
}

#[cfg(feature = "tracing")]
fn join<T: fmt::Display>(items: &[T]) -> String {
    use core::fmt::Write;

    let mut out = String::new();
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            out.push_str("; ");
        }
        let _ = write!(out, "{item}");
    }
    out
}

/// Sorts `issued` by value and checks it against `params`.
pub fn audit(mut issued: Vec<IssuedId>, params: &AuditParams) -> AuditReport {
    issued.sort_by_key(|id| id.value);

    let mut duplicates = Vec::new();
    let mut gaps = Vec::new();
    let mut missing_ids = 0u64;

    for pair in issued.windows(2) {
        let (prev, next) = (&pair[0], &pair[1]);
        let diff = next.value - prev.value;
        match diff {
            0 => duplicates.push(*next),
            1 => {}
            _ => {
                missing_ids = missing_ids.saturating_add(diff - 1);
                describe_gap(prev, next.value, params, &mut gaps);
            }
        }
    }

    let span = match (issued.first(), issued.last()) {
        (Some(lo), Some(hi)) => Some(Range::new(lo.value, hi.value.saturating_add(1))),
        _ => None,
    };

    AuditReport {
        expected_ids: params.expected_ids,
        generated_ids: issued.len(),
        duplicates,
        missing_ids,
        max_missing_ids: params.max_missing_ids,
        gaps,
        span,
    }
}

/// Splits the hole `(prev.value, next)` into the unfinished tail of `prev`'s
/// range, if any, and the span after it that nobody issued from.
fn describe_gap(prev: &IssuedId, next: u64, params: &AuditParams, gaps: &mut Vec<Gap>) {
    let range = params.range_of(prev.value);
    let mut cursor = prev.value + 1;

    if range.contains(cursor) {
        gaps.push(Gap::Unfinished {
            range,
            last_id: prev.value,
            worker: prev.worker,
        });
        cursor = range.end();
    }

    if cursor < next {
        gaps.push(Gap::Lost {
            from: cursor,
            to: next,
        });
    }
}
