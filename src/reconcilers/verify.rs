//! Dependency verification
//!
//! A backup or restore names the VerticaDB and VerticaArchive it works with.
//! Those objects may not exist yet, or may be deleted at any time, so every
//! pass checks them again. A missing dependency is reported as a warning
//! event on the parent and answered with a requeue, never with an error.

use async_trait::async_trait;
use kube::core::GroupVersionKind;
use kube::runtime::events::EventType;
use kube::{Resource, ResourceExt};
use tracing::info;

use super::actor::{ReconcileActor, ReconcileRequest, ReconcileResult};
use crate::crd::VERTICA_DB_KIND;
use crate::error::Result;
use crate::events::{actions, reasons, EventPublisher};
use crate::metrics;
use crate::store::{ObjectStore, ResourceKind};

/// A named reference from a parent resource to an object it depends on
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DependencyRef {
    /// `spec.verticaDBName`
    VerticaDb { name: String },
    /// `spec.archive`
    Archive { name: String },
    /// A reference to a kind this operator has no dedicated handling for
    Unknown { kind: GroupVersionKind, name: String },
}

impl DependencyRef {
    pub fn vertica_db(name: impl Into<String>) -> Self {
        DependencyRef::VerticaDb { name: name.into() }
    }

    pub fn archive(name: impl Into<String>) -> Self {
        DependencyRef::Archive { name: name.into() }
    }

    /// Name of the referenced object
    pub fn name(&self) -> &str {
        match self {
            DependencyRef::VerticaDb { name }
            | DependencyRef::Archive { name }
            | DependencyRef::Unknown { name, .. } => name,
        }
    }

    /// Kind of the referenced object
    pub fn kind(&self) -> &str {
        match self {
            DependencyRef::VerticaDb { .. } => VERTICA_DB_KIND,
            DependencyRef::Archive { .. } => "VerticaArchive",
            DependencyRef::Unknown { kind, .. } => &kind.kind,
        }
    }

    /// Event reason emitted when the object is missing
    pub fn event_reason(&self) -> &'static str {
        match self {
            DependencyRef::VerticaDb { .. } => reasons::VERTICA_DB_NOT_FOUND,
            DependencyRef::Archive { .. } => reasons::ARCHIVE_NOT_FOUND,
            DependencyRef::Unknown { .. } => reasons::OBJECT_NOT_FOUND,
        }
    }

    /// Value of the parent's spec field holding the reference, as shown to users
    pub fn owned_name(&self) -> &str {
        match self {
            DependencyRef::VerticaDb { name } | DependencyRef::Archive { name } => name,
            DependencyRef::Unknown { .. } => "Unknown",
        }
    }

    /// Human-readable message for the missing-object event
    pub fn missing_message(&self) -> String {
        format!("The '{}' named '{}' was not found", self.kind(), self.owned_name())
    }

    fn resource_kind(&self) -> ResourceKind {
        match self {
            DependencyRef::VerticaDb { .. } => ResourceKind::VerticaDb,
            DependencyRef::Archive { .. } => ResourceKind::VerticaArchive,
            DependencyRef::Unknown { kind, .. } => ResourceKind::Other(kind.clone()),
        }
    }

    fn actor_name(&self) -> &'static str {
        match self {
            DependencyRef::VerticaDb { .. } => "VerifyVerticaDB",
            DependencyRef::Archive { .. } => "VerifyArchive",
            DependencyRef::Unknown { .. } => "VerifyObject",
        }
    }
}

/// Check that `dependency` exists in the parent's namespace.
///
/// Found: no-op result. Not found: warning event on `parent` and a requeue.
/// Any lookup failure is returned unchanged.
pub async fn verify<K>(
    store: &dyn ObjectStore,
    events: &dyn EventPublisher,
    parent: &K,
    dependency: &DependencyRef,
) -> Result<ReconcileResult>
where
    K: Resource<DynamicType = ()> + Send + Sync,
{
    let namespace = parent.namespace().unwrap_or_default();
    let found = !dependency.name().is_empty()
        && store
            .exists(&dependency.resource_kind(), &namespace, dependency.name())
            .await?;
    if found {
        return Ok(ReconcileResult::done());
    }

    info!(
        parent = %parent.name_any(),
        namespace = %namespace,
        kind = dependency.kind(),
        dependency = dependency.name(),
        "Referenced object not found, requeueing"
    );
    metrics::MISSING_DEPENDENCIES
        .with_label_values(&[dependency.kind()])
        .inc();

    events
        .publish(
            &parent.object_ref(&()),
            EventType::Warning,
            dependency.event_reason(),
            actions::VERIFY_DEPENDENCY,
            Some(dependency.missing_message()),
        )
        .await;

    Ok(ReconcileResult::requeue())
}

/// Actor verifying one dependency of `parent`
pub struct VerifyDependency<'a, K> {
    store: &'a dyn ObjectStore,
    events: &'a dyn EventPublisher,
    parent: &'a K,
    dependency: DependencyRef,
}

impl<'a, K> VerifyDependency<'a, K> {
    pub fn new(
        store: &'a dyn ObjectStore,
        events: &'a dyn EventPublisher,
        parent: &'a K,
        dependency: DependencyRef,
    ) -> Self {
        Self {
            store,
            events,
            parent,
            dependency,
        }
    }
}

#[async_trait]
impl<'a, K> ReconcileActor for VerifyDependency<'a, K>
where
    K: Resource<DynamicType = ()> + Send + Sync,
{
    fn name(&self) -> &'static str {
        self.dependency.actor_name()
    }

    async fn reconcile(&self, _request: &ReconcileRequest) -> Result<ReconcileResult> {
        verify(self.store, self.events, self.parent, &self.dependency).await
    }
}
