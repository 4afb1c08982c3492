//! Kubernetes controllers for the Vertica backup CRDs
//!
//! Each controller watches its own kind plus the kinds it references, and
//! hands every triggered object to the matching reconciler.

mod archive_controller;
mod backup_controller;
mod restore_controller;
pub mod watches;

pub use archive_controller::run as run_archive_controller;
pub use backup_controller::run as run_backup_controller;
pub use restore_controller::run as run_restore_controller;

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use futures::future::LocalBoxFuture;
use futures::stream::{FuturesUnordered, StreamExt};
use kube::api::{ApiResource, DynamicObject};
use kube::core::NamespaceResourceScope;
use kube::runtime::controller::Action;
use kube::{Api, Client, Resource};
use tokio_util::sync::CancellationToken;

use crate::config::OperatorConfig;
use crate::error::Error;
use crate::events::KubeEventPublisher;
use crate::reconcilers::{ArchiveReconciler, BackupReconciler, ReconcileResult, RestoreReconciler};
use crate::store::{KubeStore, ObjectStore};

/// Name reported on published events
pub const CONTROLLER_NAME: &str = "vertica-backup-operator";

/// Shared context for all controllers
pub struct Context {
    /// Kubernetes client
    pub client: Client,
    pub config: OperatorConfig,
    pub archives: ArchiveReconciler,
    pub backups: BackupReconciler,
    pub restores: RestoreReconciler,
    /// Cancelled when the operator shuts down; in-flight reconciles stop
    pub shutdown: CancellationToken,
}

impl Context {
    /// Create a new context talking to the API server through `client`
    pub fn new(client: Client, config: OperatorConfig, shutdown: CancellationToken) -> Self {
        let store: Arc<dyn ObjectStore> = Arc::new(KubeStore::new(client.clone()));
        let events = Arc::new(KubeEventPublisher::new(client.clone(), CONTROLLER_NAME));
        let attempts = config.status_update_attempts;

        Self {
            archives: ArchiveReconciler::new(store.clone(), attempts),
            backups: BackupReconciler::new(store.clone(), events.clone(), attempts),
            restores: RestoreReconciler::new(store, events, attempts),
            client,
            config,
            shutdown,
        }
    }

    /// Api for `K` scoped to the watched namespace, or cluster-wide
    pub fn api<K>(&self) -> Api<K>
    where
        K: Resource<Scope = NamespaceResourceScope>,
        K::DynamicType: Default,
    {
        match self.config.watch_namespace.as_deref() {
            Some(namespace) => Api::namespaced(self.client.clone(), namespace),
            None => Api::all(self.client.clone()),
        }
    }

    /// Dynamic Api for a kind without a Rust type, scoped like [`Context::api`]
    pub fn dynamic_api(&self, resource: &ApiResource) -> Api<DynamicObject> {
        match self.config.watch_namespace.as_deref() {
            Some(namespace) => Api::namespaced_with(self.client.clone(), namespace, resource),
            None => Api::all_with(self.client.clone(), resource),
        }
    }
}

/// Translate a reconcile outcome into a controller action
pub fn to_action(result: ReconcileResult, requeue_interval: Duration) -> Action {
    match result.requeue_after {
        Some(delay) => Action::requeue(delay),
        None if result.requeue => Action::requeue(requeue_interval),
        None => Action::await_change(),
    }
}

/// Retry delay after a failed reconcile
pub fn retry_delay(error: &Error) -> Option<Duration> {
    match error {
        Error::Cancelled => None,
        Error::Conflict(_) => Some(Duration::from_secs(5)),
        Error::Kube(_) => Some(Duration::from_secs(30)),
        Error::InvalidTransition { .. } | Error::MissingMetadata(_) => {
            Some(Duration::from_secs(300))
        }
        _ => Some(Duration::from_secs(60)),
    }
}

fn error_action(error: &Error) -> Action {
    retry_delay(error).map_or_else(Action::await_change, Action::requeue)
}

/// Drive `controllers` until one of them exits or `signal` fires.
///
/// On a signal `shutdown` is cancelled while every controller is still being
/// polled, so in-flight reconciles return [`Error::Cancelled`], and the
/// controllers are then drained. Returns whether the signal stopped them.
pub async fn run_until_signal<S>(
    controllers: Vec<LocalBoxFuture<'_, ()>>,
    signal: S,
    shutdown: &CancellationToken,
) -> bool
where
    S: Future<Output = ()>,
{
    let mut running: FuturesUnordered<_> = controllers.into_iter().collect();

    tokio::select! {
        _ = running.next() => false,
        _ = signal => {
            shutdown.cancel();
            while running.next().await.is_some() {}
            true
        }
    }
}
#[cfg(test)]
mod tests {
    use super::*;
    use futures::FutureExt;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn requeue_now_uses_configured_interval() {
        let interval = Duration::from_secs(10);
        assert_eq!(
            to_action(ReconcileResult::requeue(), interval),
            Action::requeue(interval)
        );
    }

    #[test]
    fn delayed_requeue_keeps_its_delay() {
        let delay = Duration::from_secs(42);
        assert_eq!(
            to_action(ReconcileResult::requeue_after(delay), Duration::from_secs(10)),
            Action::requeue(delay)
        );
    }

    #[test]
    fn done_waits_for_a_change() {
        assert_eq!(
            to_action(ReconcileResult::done(), Duration::from_secs(10)),
            Action::await_change()
        );
    }

    #[test]
    fn cancellation_is_not_retried() {
        assert_eq!(retry_delay(&Error::Cancelled), None);
        assert_eq!(
            retry_delay(&Error::Conflict("stale".to_string())),
            Some(Duration::from_secs(5))
        );
    }

    #[tokio::test]
    async fn signal_cancels_running_controllers_before_draining() {
        let shutdown = CancellationToken::new();
        let observed = Arc::new(AtomicUsize::new(0));

        let controllers: Vec<LocalBoxFuture<'_, ()>> = (0..3)
            .map(|_| {
                let token = shutdown.clone();
                let observed = observed.clone();
                async move {
                    token.cancelled().await;
                    observed.fetch_add(1, Ordering::SeqCst);
                }
                .boxed_local()
            })
            .collect();

        let stopped = run_until_signal(controllers, async {}, &shutdown).await;

        assert!(stopped);
        assert!(shutdown.is_cancelled());
        assert_eq!(observed.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn exiting_controller_stops_without_signal() {
        let shutdown = CancellationToken::new();
        let controllers: Vec<LocalBoxFuture<'_, ()>> = vec![
            async {}.boxed_local(),
            futures::future::pending::<()>().boxed_local(),
        ];

        let stopped =
            run_until_signal(controllers, futures::future::pending::<()>(), &shutdown).await;

        assert!(!stopped);
        assert!(!shutdown.is_cancelled());
    }
}
