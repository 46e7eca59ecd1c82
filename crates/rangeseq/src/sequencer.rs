use core::{
    fmt,
    num::{NonZeroU64, NonZeroUsize},
    str::FromStr,
};
use std::sync::Arc;

#[cfg(feature = "tracing")]
use tracing::instrument;

use crate::{
    AtomicIdGenerator, Error, IdGenerator, LoadBalancer, Range, RangeAssigner, Result,
    RwLockIdGenerator,
};

/// Selects the concurrency strategy used by every worker of a [`Sequencer`].
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "kebab-case"))]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum GeneratorKind {
    /// [`RwLockIdGenerator`]: shared-lock fast path, exclusive-lock rotation.
    RwLock,
    /// [`AtomicIdGenerator`]: lock-free compare-and-swap loop.
    #[default]
    NonBlocking,
}

impl GeneratorKind {
    /// Canonical name, as accepted by [`FromStr`] and printed by `Display`.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::RwLock => "rw-lock",
            Self::NonBlocking => "non-blocking",
        }
    }
}

impl fmt::Display for GeneratorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for GeneratorKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "rw-lock" | "rwlock" | "lock" => Ok(Self::RwLock),
            "non-blocking" | "nonblocking" | "atomic" | "lock-free" => Ok(Self::NonBlocking),
            _ => Err(Error::UnknownGeneratorKind(s.to_owned())),
        }
    }
}

/// Construction-time settings for a [`Sequencer`]. Fixed for its lifetime.
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SequencerConfig {
    /// Number of workers in the round-robin pool.
    pub num_workers: NonZeroUsize,
    /// Number of IDs in every leased range.
    pub range_size: NonZeroU64,
    /// Start of the first range the assigner hands out.
    pub first_id: u64,
    /// Concurrency strategy of every worker.
    pub kind: GeneratorKind,
}

impl SequencerConfig {
    /// Creates a config with numbering starting at `0` and non-blocking
    /// workers.
    ///
    /// # Example
    /// ```
    /// use core::num::{NonZeroU64, NonZeroUsize};
    /// use rangeseq::{GeneratorKind, SequencerConfig};
    ///
    /// let config = SequencerConfig::new(NonZeroUsize::new(3).unwrap(), NonZeroU64::new(5).unwrap())
    ///     .with_first_id(1_000)
    ///     .with_kind(GeneratorKind::RwLock);
    ///
    /// assert_eq!(config.first_id, 1_000);
    /// assert_eq!(config.max_missing_ids(), 8);
    /// ```
    pub const fn new(num_workers: NonZeroUsize, range_size: NonZeroU64) -> Self {
        Self {
            num_workers,
            range_size,
            first_id: 0,
            kind: GeneratorKind::NonBlocking,
        }
    }

    /// Sets the start of the first range handed out.
    #[must_use]
    pub const fn with_first_id(mut self, first_id: u64) -> Self {
        self.first_id = first_id;
        self
    }

    /// Sets the concurrency strategy of every worker.
    #[must_use]
    pub const fn with_kind(mut self, kind: GeneratorKind) -> Self {
        self.kind = kind;
        self
    }

    /// Upper bound on never-issued IDs at any snapshot:
    /// `(num_workers - 1) * (range_size - 1)`, saturating.
    pub const fn max_missing_ids(&self) -> u64 {
        let idle_workers = (self.num_workers.get() - 1) as u64;
        idle_workers.saturating_mul(self.range_size.get() - 1)
    }
}

/// A worker of either kind, so one pool type serves both strategies.
pub enum Worker {
    /// See [`GeneratorKind::RwLock`].
    RwLock(RwLockIdGenerator),
    /// See [`GeneratorKind::NonBlocking`].
    NonBlocking(AtomicIdGenerator),
}

impl Worker {
    /// Creates a worker of the given kind and leases its first range.
    ///
    /// # Errors
    ///
    /// Returns [`Error::RangeSpaceExhausted`] if no range is left to lease.
    pub fn new(
        kind: GeneratorKind,
        worker_id: impl Into<String>,
        assigner: Arc<RangeAssigner>,
    ) -> Result<Self> {
        Ok(match kind {
            GeneratorKind::RwLock => Self::RwLock(RwLockIdGenerator::new(worker_id, assigner)?),
            GeneratorKind::NonBlocking => {
                Self::NonBlocking(AtomicIdGenerator::new(worker_id, assigner)?)
            }
        })
    }

    /// The strategy this worker was built with.
    pub const fn kind(&self) -> GeneratorKind {
        match self {
            Self::RwLock(_) => GeneratorKind::RwLock,
            Self::NonBlocking(_) => GeneratorKind::NonBlocking,
        }
    }
}

impl IdGenerator for Worker {
    fn worker_id(&self) -> &str {
        match self {
            Self::RwLock(g) => g.worker_id(),
            Self::NonBlocking(g) => g.worker_id(),
        }
    }

    fn current_range(&self) -> Range {
        match self {
            Self::RwLock(g) => g.current_range(),
            Self::NonBlocking(g) => g.current_range(),
        }
    }

    #[inline]
    fn try_next_id(&self) -> Result<u64> {
        match self {
            Self::RwLock(g) => g.try_next_id(),
            Self::NonBlocking(g) => g.try_next_id(),
        }
    }
}

/// One self-contained ID sequencer: a [`RangeAssigner`] shared by a pool of
/// workers named `W1..Wn` behind a round-robin [`LoadBalancer`].
///
/// Nothing is global. Dropping a sequencer and building a new one with the
/// same config restarts numbering at `first_id`.
///
/// # Example
/// ```
/// use core::num::{NonZeroU64, NonZeroUsize};
/// use rangeseq::{GeneratorKind, IdGenerator, Sequencer, SequencerConfig};
///
/// let config = SequencerConfig::new(NonZeroUsize::new(3).unwrap(), NonZeroU64::new(5).unwrap())
///     .with_kind(GeneratorKind::RwLock);
/// let sequencer = Sequencer::new(config).unwrap();
///
/// // W1 leased [0, 5), W2 [5, 10), W3 [10, 15).
/// assert_eq!(sequencer.next_id(), 0);
/// assert_eq!(sequencer.next_id(), 5);
/// assert_eq!(sequencer.next_id(), 10);
/// assert_eq!(sequencer.next_id(), 1);
/// ```
pub struct Sequencer {
    config: SequencerConfig,
    assigner: Arc<RangeAssigner>,
    balancer: LoadBalancer<Worker>,
}

impl Sequencer {
    /// Builds the assigner and the worker pool described by `config`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::RangeSpaceExhausted`] if `first_id` leaves too little
    /// room to lease one range per worker.
    #[cfg_attr(feature = "tracing", instrument(level = "debug"))]
    pub fn new(config: SequencerConfig) -> Result<Self> {
        let assigner = Arc::new(RangeAssigner::with_start(
            config.first_id,
            config.range_size,
        ));
        let workers = (1..=config.num_workers.get())
            .map(|i| Worker::new(config.kind, format!("W{i}"), Arc::clone(&assigner)))
            .collect::<Result<Vec<_>>>()?;
        let balancer = LoadBalancer::new(workers)?;

        #[cfg(feature = "tracing")]
        tracing::debug!(
            workers = balancer.len(),
            next_start = assigner.peek_next_start(),
            "sequencer ready"
        );

        Ok(Self {
            config,
            assigner,
            balancer,
        })
    }

    /// The config this sequencer was built from.
    pub const fn config(&self) -> &SequencerConfig {
        &self.config
    }

    /// The assigner shared by every worker.
    pub fn assigner(&self) -> &RangeAssigner {
        &self.assigner
    }

    /// The round-robin pool, in worker order `W1..Wn`.
    pub const fn balancer(&self) -> &LoadBalancer<Worker> {
        &self.balancer
    }

    /// Generates an ID on the next worker in round-robin order.
    ///
    /// # Panics
    ///
    /// See [`IdGenerator::next_id`].
    pub fn next_id(&self) -> u64 {
        self.balancer.next().next_id()
    }

    /// Fallible counterpart to [`Self::next_id`].
    ///
    /// # Errors
    ///
    /// See [`IdGenerator::try_next_id`].
    pub fn try_next_id(&self) -> Result<u64> {
        self.balancer.next().try_next_id()
    }
}
