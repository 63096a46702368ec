//! Extendable event lifetimes.

use std::future::Future;

use tokio::task::JoinHandle;

/// Keeps work alive past the point where an event handler returns.
///
/// Every future passed to [`wait_until`](Self::wait_until) is spawned
/// immediately; [`settled`](Self::settled) resolves once all of them have
/// finished.
#[derive(Debug, Default)]
pub struct ExtendableEvent {
    pending: Vec<JoinHandle<()>>,
}

impl ExtendableEvent {
    pub fn new() -> Self {
        Self::default()
    }

    /// Extend the event's lifetime until `work` completes.
    pub fn wait_until<F>(&mut self, work: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        self.pending.push(tokio::spawn(work));
    }

    /// Number of extensions registered so far.
    pub fn pending(&self) -> usize {
        self.pending.len()
    }

    /// Wait for every extension to finish.
    pub async fn settled(self) {
        for handle in self.pending {
            if let Err(e) = handle.await {
                tracing::warn!(error = %e, "extended event task did not complete");
            }
        }
    }
}
