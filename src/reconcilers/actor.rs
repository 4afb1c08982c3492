//! Actor chain executor
//!
//! A reconcile pass runs an ordered list of actors. Each actor does one unit
//! of convergence work. The chain stops at the first actor that fails or asks
//! to be requeued; later actors only run on a future pass.

use std::fmt;
use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use kube::{Resource, ResourceExt};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::error::{Error, Result};

/// Identifies the one resource instance a reconcile pass works on
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ReconcileRequest {
    pub namespace: String,
    pub name: String,
}

impl ReconcileRequest {
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            name: name.into(),
        }
    }

    /// Request for the object's own namespaced name
    pub fn for_resource<K: Resource>(obj: &K) -> Self {
        Self::new(obj.namespace().unwrap_or_default(), obj.name_any())
    }
}

impl fmt::Display for ReconcileRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.namespace, self.name)
    }
}

/// Outcome of a reconcile pass or of a single actor
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ReconcileResult {
    /// Retry as soon as the scheduler allows
    pub requeue: bool,
    /// Retry after this delay
    pub requeue_after: Option<Duration>,
}

impl ReconcileResult {
    /// Fully reconciled, nothing to retry
    pub fn done() -> Self {
        Self::default()
    }

    /// Incomplete, retry soon
    pub fn requeue() -> Self {
        Self {
            requeue: true,
            requeue_after: None,
        }
    }

    /// Incomplete, retry after `delay`
    pub fn requeue_after(delay: Duration) -> Self {
        Self {
            requeue: false,
            requeue_after: Some(delay),
        }
    }

    pub fn is_requeue(&self) -> bool {
        self.requeue || self.requeue_after.is_some()
    }
}

/// One step of a reconcile pass
#[async_trait]
pub trait ReconcileActor: Send + Sync {
    /// Name used in logs
    fn name(&self) -> &'static str;

    async fn reconcile(&self, request: &ReconcileRequest) -> Result<ReconcileResult>;
}

/// An error or any kind of requeue aborts the chain
pub fn is_aborted(outcome: &Result<ReconcileResult>) -> bool {
    match outcome {
        Err(_) => true,
        Ok(result) => result.is_requeue(),
    }
}

/// Await `fut` unless `cancel` fires first, in which case return
/// [`Error::Cancelled`]
pub async fn cancellable<T, F>(cancel: &CancellationToken, fut: F) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(Error::Cancelled),
        outcome = fut => outcome,
    }
}

/// Run `actors` in order for `request`.
///
/// Returns the outcome of the first actor that aborts, otherwise the last
/// actor's result (the no-op result for an empty chain).
pub async fn run_actors(
    kind: &str,
    actors: &[Box<dyn ReconcileActor + '_>],
    request: &ReconcileRequest,
    cancel: &CancellationToken,
) -> Result<ReconcileResult> {
    let mut result = ReconcileResult::done();

    for actor in actors {
        debug!(kind, actor = actor.name(), request = %request, "Starting actor");
        let outcome = cancellable(cancel, actor.reconcile(request)).await;

        if is_aborted(&outcome) {
            match &outcome {
                Err(e) => debug!(
                    kind,
                    actor = actor.name(),
                    request = %request,
                    error = %e,
                    "Actor failed, aborting reconcile"
                ),
                Ok(r) => info!(
                    kind,
                    actor = actor.name(),
                    request = %request,
                    result = ?r,
                    "Actor requested requeue, aborting reconcile"
                ),
            }
            return outcome;
        }
        result = outcome?;
    }

    Ok(result)
}
