use core::fmt;
use std::thread::{Builder, scope};

#[cfg(feature = "tracing")]
use tracing::instrument;

use crate::{Error, IdGenerator, LoadBalancer, Result};

/// One issued ID together with who asked for it and who produced it.
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct IssuedId {
    /// The ID itself.
    pub value: u64,
    /// Index of the client thread, `0..clients`.
    pub client: usize,
    /// Index of the issuing worker in [`LoadBalancer::workers`].
    pub worker: usize,
}

impl fmt::Display for IssuedId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "C{}:#{} [{}]", self.client, self.worker, self.value)
    }
}

/// Shape of the synthetic load [`drive`] puts on a pool.
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ClientLoad {
    /// Number of concurrent client threads.
    pub clients: usize,
    /// Number of sequential calls each client makes.
    pub calls_per_client: usize,
}

impl ClientLoad {
    /// Describes `clients` threads making `calls_per_client` calls each.
    ///
    /// # Example
    /// ```
    /// use rangeseq::ClientLoad;
    ///
    /// let load = ClientLoad::new(10, 100);
    /// assert_eq!(load.expected_ids(), Some(1_000));
    /// assert_eq!(ClientLoad::new(2, usize::MAX).expected_ids(), None);
    /// ```
    pub const fn new(clients: usize, calls_per_client: usize) -> Self {
        Self {
            clients,
            calls_per_client,
        }
    }

    /// Total number of IDs the load requests, or `None` on overflow.
    pub const fn expected_ids(&self) -> Option<usize> {
        self.clients.checked_mul(self.calls_per_client)
    }
}

/// Runs `load.clients` concurrent client threads against `balancer` and
/// collects every ID they receive, in no particular order.
///
/// Client threads are named `C0..C{n-1}` after their index. Each performs
/// `load.calls_per_client` sequential calls, each routed to the next worker in
/// round-robin order.
///
/// # Errors
///
/// Returns the first generator error any client hit. The other clients still
/// run to completion before this returns.
///
/// Returns [`Error::ClientSpawn`] if a client thread cannot be started. Clients
/// already running are joined first.
///
/// # Panics
///
/// Re-raises the panic of a client thread that panicked.
#[cfg_attr(feature = "tracing", instrument(level = "debug", skip(balancer)))]
pub fn drive<G>(balancer: &LoadBalancer<G>, load: ClientLoad) -> Result<Vec<IssuedId>>
where
    G: IdGenerator + Sync,
{
    let per_client: Vec<Result<Vec<IssuedId>>> = scope(|s| {
        let handles = (0..load.clients)
            .map(|client| {
                Builder::new()
                    .name(format!("C{client}"))
                    .spawn_scoped(s, move || {
                        run_client(balancer, client, load.calls_per_client)
                    })
                    .map_err(|e| Error::ClientSpawn {
                        client,
                        kind: e.kind(),
                    })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok::<_, Error>(
            handles
                .into_iter()
                .map(|handle| match handle.join() {
                    Ok(ids) => ids,
                    Err(panic) => std::panic::resume_unwind(panic),
                })
                .collect::<Vec<_>>(),
        )
    })?;

    let mut issued = Vec::with_capacity(load.expected_ids().unwrap_or_default());
    for ids in per_client {
        issued.extend(ids?);
    }
    Ok(issued)
}

fn run_client<G>(balancer: &LoadBalancer<G>, client: usize, calls: usize) -> Result<Vec<IssuedId>>
where
    G: IdGenerator,
{
    let workers = balancer.workers();
    let mut issued = Vec::with_capacity(calls);

    for _ in 0..calls {
        let worker = balancer.next_worker_index();
        let value = workers[worker].try_next_id()?;

        #[cfg(feature = "tracing")]
        tracing::trace!(client, worker = workers[worker].worker_id(), value, "issued");

        issued.push(IssuedId {
            value,
            client,
            worker,
        });
    }

    Ok(issued)
}
