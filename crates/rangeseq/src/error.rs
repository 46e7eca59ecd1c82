use thiserror::Error;

/// A result type defaulting to this crate's [`Error`].
pub type Result<T, E = Error> = core::result::Result<T, E>;

/// All error variants that `rangeseq` can emit.
///
/// ID generation itself has no recoverable failure modes. The variants below
/// cover construction mistakes, client threads that fail to start, a poisoned
/// std lock and a counter that has run out of `u64` space.
#[derive(Error, Clone, Debug, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum Error {
    /// No further full range fits below `u64::MAX`.
    ///
    /// The assigner never wraps its cursor, so once this is returned every
    /// later request returns it too.
    #[error("range space exhausted: cannot issue {range_size} ids starting at {next_start}")]
    RangeSpaceExhausted {
        /// Start of the range that could not be issued.
        next_start: u64,
        /// Configured range size.
        range_size: u64,
    },

    /// A load balancer was built without any workers.
    #[error("load balancer pool must contain at least one worker")]
    EmptyPool,

    /// The OS refused to start a client thread.
    #[error("failed to spawn client thread C{client}: {kind}")]
    ClientSpawn {
        /// Index of the client whose thread could not be started.
        client: usize,
        /// Kind of the underlying I/O error.
        kind: std::io::ErrorKind,
    },

    /// A generator kind name did not match any known variant.
    #[error("unknown generator kind `{0}` (expected `rw-lock` or `non-blocking`)")]
    UnknownGeneratorKind(String),

    /// The operation failed because the lock was **poisoned**.
    ///
    /// This occurs when a thread panics while holding the lock. When the
    /// `parking-lot` feature is enabled, locks do **not** poison, so this
    /// variant is not available.
    #[cfg_attr(docsrs, doc(cfg(not(feature = "parking-lot"))))]
    #[cfg(not(feature = "parking-lot"))]
    #[error("generator lock poisoned")]
    LockPoisoned,
}

#[cfg(not(feature = "parking-lot"))]
impl<T> From<std::sync::PoisonError<T>> for Error {
    fn from(_: std::sync::PoisonError<T>) -> Self {
        Self::LockPoisoned
    }
}
