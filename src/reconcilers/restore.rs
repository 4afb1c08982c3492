//! VerticaRestore reconciler
//!
//! Same chain as a backup: the database to restore into and the archive to
//! restore from must both exist before the restore is initialized.

use std::sync::Arc;

use super::actor::ReconcileActor;
use super::resource::{job_actors, ResourceReconciler};
use crate::crd::VerticaRestore;
use crate::events::EventPublisher;
use crate::store::ObjectStore;

pub struct RestoreReconciler {
    store: Arc<dyn ObjectStore>,
    events: Arc<dyn EventPublisher>,
    status_update_attempts: u32,
}

impl RestoreReconciler {
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

impl ResourceReconciler for RestoreReconciler {
    type Resource = VerticaRestore;

    fn store(&self) -> &dyn ObjectStore {
        self.store.as_ref()
    }

    fn actors<'a>(&'a self, obj: &'a VerticaRestore) -> Vec<Box<dyn ReconcileActor + 'a>> {
        job_actors(
            self.store.as_ref(),
            self.events.as_ref(),
            obj,
            self.status_update_attempts,
        )
    }
}
