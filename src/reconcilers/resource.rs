//! Top-level reconcile pass shared by every kind
//!
//! Fetch the object named by the request, honour the pause annotation, build
//! the kind's actor chain against the fetched copy and run it.

use async_trait::async_trait;
use kube::Resource;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use super::actor::{cancellable, run_actors, ReconcileActor, ReconcileRequest, ReconcileResult};
use super::reference_count::SyncArchiveReferences;
use super::status::{InitializeStatus, StatusSubresource};
use super::verify::{DependencyRef, VerifyDependency};
use crate::crd::JobResource;
use crate::error::Result;
use crate::events::EventPublisher;
use crate::meta;
use crate::store::ObjectStore;

/// A reconciler defined by the actor chain it runs for one object
#[async_trait]
pub trait ResourceReconciler: Send + Sync {
    type Resource: StatusSubresource + 'static;

    fn store(&self) -> &dyn ObjectStore;

    /// Actors to run, in order, for `obj`
    fn actors<'a>(&'a self, obj: &'a Self::Resource) -> Vec<Box<dyn ReconcileActor + 'a>>;

    /// Run one reconcile pass for `request`
    async fn reconcile(
        &self,
        request: &ReconcileRequest,
        cancel: &CancellationToken,
    ) -> Result<ReconcileResult> {
        let kind = Self::Resource::kind(&());
        info!(kind = %kind, request = %request, "Reconciling");

        let fetched = cancellable(
            cancel,
            Self::Resource::fetch(self.store(), &request.namespace, &request.name),
        )
        .await;
        let obj = match fetched {
            Ok(Some(obj)) => obj,
            Ok(None) => {
                info!(kind = %kind, request = %request, "Resource not found, it may have been deleted");
                return Ok(ReconcileResult::done());
            }
            Err(e) => {
                debug!(kind = %kind, request = %request, error = %e, "Failed to fetch resource");
                return Err(e);
            }
        };

        if meta::is_paused(&obj) {
            info!(
                kind = %kind,
                request = %request,
                annotation = meta::PAUSE_ANNOTATION,
                "Reconciliation paused"
            );
            return Ok(ReconcileResult::done());
        }

        let actors = self.actors(&obj);
        let outcome = run_actors(&kind, &actors, request, cancel).await;
        match &outcome {
            Ok(result) => info!(
                kind = %kind,
                request = %request,
                requeue = result.requeue,
                requeue_after = ?result.requeue_after,
                "Reconcile finished"
            ),
            Err(e) => debug!(kind = %kind, request = %request, error = %e, "Reconcile failed"),
        }
        outcome
    }
}

/// Chain shared by VerticaBackup and VerticaRestore: both dependencies must
/// exist before the status is initialized, then the archive is recounted.
pub fn job_actors<'a, K>(
    store: &'a dyn ObjectStore,
    events: &'a dyn EventPublisher,
    obj: &'a K,
    status_update_attempts: u32,
) -> Vec<Box<dyn ReconcileActor + 'a>>
where
    K: StatusSubresource + JobResource + 'static,
{
    let mut actors: Vec<Box<dyn ReconcileActor + 'a>> = Vec::with_capacity(4);
    actors.push(Box::new(VerifyDependency::new(
        store,
        events,
        obj,
        DependencyRef::vertica_db(obj.vertica_db_name()),
    )));
    actors.push(Box::new(VerifyDependency::new(
        store,
        events,
        obj,
        DependencyRef::archive(obj.archive_name()),
    )));
    actors.push(Box::new(InitializeStatus::<K>::new(store, status_update_attempts)));
    actors.push(Box::new(SyncArchiveReferences::new(
        store,
        obj.archive_name(),
        status_update_attempts,
    )));
    actors
}
