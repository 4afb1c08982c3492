//! VerticaBackup reconciler

use std::sync::Arc;

use super::actor::ReconcileActor;
use super::resource::{job_actors, ResourceReconciler};
use crate::crd::VerticaBackup;
use crate::events::EventPublisher;
use crate::store::ObjectStore;

pub struct BackupReconciler {
    store: Arc<dyn ObjectStore>,
    events: Arc<dyn EventPublisher>,
    status_update_attempts: u32,
}

impl BackupReconciler {
    pub fn new(
        store: Arc<dyn ObjectStore>,
        events: Arc<dyn EventPublisher>,
        status_update_attempts: u32,
    ) -> Self {
        Self {
            store,
            events,
            status_update_attempts,
        }
    }
}

impl ResourceReconciler for BackupReconciler {
    type Resource = VerticaBackup;

    fn store(&self) -> &dyn ObjectStore {
        self.store.as_ref()
    }

    fn actors<'a>(&'a self, obj: &'a VerticaBackup) -> Vec<Box<dyn ReconcileActor + 'a>> {
        job_actors(
            self.store.as_ref(),
            self.events.as_ref(),
            obj,
            self.status_update_attempts,
        )
    }
}
