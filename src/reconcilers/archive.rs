//! VerticaArchive reconciler
//!
//! An archive has no dependencies of its own. Its only convergence work is
//! keeping `status.referencedCount` in line with the Backups and Restores
//! that name it, so deleting one of those settles the count.

use std::sync::Arc;

use kube::ResourceExt;

use super::actor::ReconcileActor;
use super::reference_count::SyncArchiveReferences;
use super::resource::ResourceReconciler;
use crate::crd::VerticaArchive;
use crate::store::ObjectStore;

pub struct ArchiveReconciler {
    store: Arc<dyn ObjectStore>,
    status_update_attempts: u32,
}

impl ArchiveReconciler {
    pub fn new(store: Arc<dyn ObjectStore>, status_update_attempts: u32) -> Self {
        Self {
            store,
            status_update_attempts,
        }
    }
}

impl ResourceReconciler for ArchiveReconciler {
    type Resource = VerticaArchive;

    fn store(&self) -> &dyn ObjectStore {
        self.store.as_ref()
    }

    fn actors<'a>(&'a self, obj: &'a VerticaArchive) -> Vec<Box<dyn ReconcileActor + 'a>> {
        let recount: Box<dyn ReconcileActor + 'a> = Box::new(SyncArchiveReferences::new(
            self.store(),
            obj.name_any(),
            self.status_update_attempts,
        ));
        vec![recount]
    }
}
