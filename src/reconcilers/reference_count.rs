//! VerticaArchive reference counting
//!
//! `status.referencedCount` is always recomputed from the Backups and
//! Restores currently in the namespace, never incremented or decremented.
//! Any interleaving of reconciles therefore converges on the same value.

use async_trait::async_trait;
use kube::ResourceExt;
use tracing::{debug, info};

use super::actor::{ReconcileActor, ReconcileRequest, ReconcileResult};
use super::status::modify_status;
use crate::crd::{
    JobResource, VerticaArchive, VerticaArchiveStatus, VerticaBackup, VerticaRestore,
};
use crate::error::Result;
use crate::metrics;
use crate::store::ObjectStore;

/// Number of backups and restores whose `spec.archive` names `archive`
pub fn count_references(
    archive: &str,
    backups: &[VerticaBackup],
    restores: &[VerticaRestore],
) -> u32 {
    let total = backups.iter().filter(|b| b.archive_name() == archive).count()
        + restores.iter().filter(|r| r.archive_name() == archive).count();
    u32::try_from(total).unwrap_or(u32::MAX)
}

/// Recompute the reference count of `namespace/archive` and store it if it
/// changed. Returns the count, or `None` if the archive does not exist.
pub async fn recompute(
    store: &dyn ObjectStore,
    namespace: &str,
    archive: &str,
    attempts: u32,
) -> Result<Option<u32>> {
    let Some(current) = store.get_archive(namespace, archive).await? else {
        debug!(archive = %archive, namespace = %namespace, "Archive not found, nothing to count");
        let _ = metrics::ARCHIVE_REFERENCED_COUNT.remove_label_values(&[namespace, archive]);
        return Ok(None);
    };

    let backups = store.list_backups(namespace).await?;
    let restores = store.list_restores(namespace).await?;
    let desired = count_references(archive, &backups, &restores);

    metrics::ARCHIVE_REFERENCED_COUNT
        .with_label_values(&[namespace, archive])
        .set(f64::from(desired));

    let stored = current.referenced_count();
    if stored == desired {
        return Ok(Some(desired));
    }

    let written = modify_status::<VerticaArchive, _>(store, namespace, archive, attempts, |a| {
        if a.referenced_count() == desired {
            return Ok(false);
        }
        a.status = Some(VerticaArchiveStatus {
            referenced_count: desired,
        });
        Ok(true)
    })
    .await?;

    if written.is_some() {
        info!(
            archive = %current.name_any(),
            namespace = %namespace,
            from = stored,
            to = desired,
            "Updated archive reference count"
        );
    }
    Ok(written.map(|_| desired))
}

/// Actor keeping one archive's reference count current
pub struct SyncArchiveReferences<'a> {
    store: &'a dyn ObjectStore,
    archive: String,
    attempts: u32,
}

impl<'a> SyncArchiveReferences<'a> {
    pub fn new(store: &'a dyn ObjectStore, archive: impl Into<String>, attempts: u32) -> Self {
        Self {
            store,
            archive: archive.into(),
            attempts,
        }
    }
}

#[async_trait]
impl<'a> ReconcileActor for SyncArchiveReferences<'a> {
    fn name(&self) -> &'static str {
        "SyncArchiveReferences"
    }

    async fn reconcile(&self, request: &ReconcileRequest) -> Result<ReconcileResult> {
        recompute(self.store, &request.namespace, &self.archive, self.attempts).await?;
        Ok(ReconcileResult::done())
    }
}
