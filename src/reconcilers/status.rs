//! Version-conditional status updates
//!
//! Every status write carries the resourceVersion it was computed from. On a
//! conflict the object is fetched again and the change re-applied, up to a
//! bounded number of attempts within the same reconcile pass.

use std::marker::PhantomData;

use async_trait::async_trait;
use chrono::Utc;
use kube::{Resource, ResourceExt};
use tracing::{debug, info};

use super::actor::{ReconcileActor, ReconcileRequest, ReconcileResult};
use crate::crd::{
    JobPhase, JobResource, Transition, VerticaArchive, VerticaBackup, VerticaRestore,
};
use crate::error::Result;
use crate::metrics;
use crate::store::ObjectStore;

/// A resource whose status sub-resource the operator writes
#[async_trait]
pub trait StatusSubresource: Resource<DynamicType = ()> + Clone + Send + Sync + Sized {
    async fn fetch(store: &dyn ObjectStore, namespace: &str, name: &str)
        -> Result<Option<Self>>;

    async fn write_status(store: &dyn ObjectStore, obj: &Self) -> Result<Self>;
}

#[async_trait]
impl StatusSubresource for VerticaArchive {
    async fn fetch(store: &dyn ObjectStore, namespace: &str, name: &str) -> Result<Option<Self>> {
        store.get_archive(namespace, name).await
    }

    async fn write_status(store: &dyn ObjectStore, obj: &Self) -> Result<Self> {
        store.write_archive_status(obj).await
    }
}

#[async_trait]
impl StatusSubresource for VerticaBackup {
    async fn fetch(store: &dyn ObjectStore, namespace: &str, name: &str) -> Result<Option<Self>> {
        store.get_backup(namespace, name).await
    }

    async fn write_status(store: &dyn ObjectStore, obj: &Self) -> Result<Self> {
        store.write_backup_status(obj).await
    }
}

#[async_trait]
impl StatusSubresource for VerticaRestore {
    async fn fetch(store: &dyn ObjectStore, namespace: &str, name: &str) -> Result<Option<Self>> {
        store.get_restore(namespace, name).await
    }

    async fn write_status(store: &dyn ObjectStore, obj: &Self) -> Result<Self> {
        store.write_restore_status(obj).await
    }
}

/// Fetch `namespace/name`, let `mutate` change it, and write the status back.
///
/// `mutate` returns whether it changed anything; unchanged objects are not
/// written. Returns `None` if the object does not exist. A conflict on the
/// last of `attempts` writes is returned to the caller.
pub async fn modify_status<K, F>(
    store: &dyn ObjectStore,
    namespace: &str,
    name: &str,
    attempts: u32,
    mut mutate: F,
) -> Result<Option<K>>
where
    K: StatusSubresource,
    F: FnMut(&mut K) -> Result<bool> + Send,
{
    let attempts = attempts.max(1);
    let mut attempt = 0;

    loop {
        attempt += 1;

        let Some(mut obj) = K::fetch(store, namespace, name).await? else {
            return Ok(None);
        };
        if !mutate(&mut obj)? {
            return Ok(Some(obj));
        }

        match K::write_status(store, &obj).await {
            Ok(written) => return Ok(Some(written)),
            Err(e) if e.is_conflict() && attempt < attempts => {
                let kind = K::kind(&());
                metrics::STATUS_CONFLICTS.with_label_values(&[&*kind]).inc();
                debug!(
                    kind = %kind,
                    name = %obj.name_any(),
                    namespace = %namespace,
                    attempt = attempt,
                    "Status write conflicted, retrying with a fresh copy"
                );
            }
            Err(e) => return Err(e),
        }
    }
}

/// Actor giving a new backup or restore its first phase and recording the
/// archive it resolved to
pub struct InitializeStatus<'a, K> {
    store: &'a dyn ObjectStore,
    attempts: u32,
    _kind: PhantomData<fn() -> K>,
}

impl<'a, K> InitializeStatus<'a, K> {
    pub fn new(store: &'a dyn ObjectStore, attempts: u32) -> Self {
        Self {
            store,
            attempts,
            _kind: PhantomData,
        }
    }
}

/// Set the archive name once and enter `Initialized` if no phase is set yet
fn initialize<K: JobResource>(obj: &mut K) -> Result<bool> {
    let archive = obj.archive_name().to_string();
    let status = obj.job_status_mut();
    let mut changed = status.resolve_archive(&archive);
    if status.phase().is_none() {
        changed |= status.transition(Transition::to(JobPhase::Initialized, Utc::now()))?;
    }
    Ok(changed)
}

#[async_trait]
impl<'a, K> ReconcileActor for InitializeStatus<'a, K>
where
    K: StatusSubresource + JobResource,
{
    fn name(&self) -> &'static str {
        "InitializeStatus"
    }

    async fn reconcile(&self, request: &ReconcileRequest) -> Result<ReconcileResult> {
        let mut initialized = false;
        let updated = modify_status::<K, _>(
            self.store,
            &request.namespace,
            &request.name,
            self.attempts,
            |obj: &mut K| {
                let fresh = obj.phase().is_none();
                let changed = initialize(obj)?;
                initialized = fresh && changed;
                Ok(changed)
            },
        )
        .await?;

        if let Some(obj) = updated.filter(|_| initialized) {
            info!(
                kind = %K::kind(&()),
                request = %request,
                archive = obj.archive_name(),
                "Initialized status"
            );
        }
        Ok(ReconcileResult::done())
    }
}
