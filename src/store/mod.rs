//! Object store gateway
//!
//! Typed access to the custom resources the reconcilers read and write. All
//! status writes are conditional on the object's `resourceVersion`; a stale
//! version fails with [`Error::Conflict`](crate::Error::Conflict).

mod kube_store;

pub use kube_store::*;

use async_trait::async_trait;
use kube::core::GroupVersionKind;

#[cfg(test)]
use mockall::automock;

use crate::crd::{VerticaArchive, VerticaBackup, VerticaRestore};
use crate::error::Result;

/// Kinds a dependency lookup can target
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ResourceKind {
    VerticaDb,
    VerticaArchive,
    /// Anything else, resolved through API discovery
    Other(GroupVersionKind),
}

/// Trait abstracting the Kubernetes API for the reconcilers
///
/// Lets tests drive reconcilers against in-memory or mocked stores.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Fetch a VerticaArchive, `None` if it does not exist
    async fn get_archive(&self, namespace: &str, name: &str) -> Result<Option<VerticaArchive>>;

    /// Fetch a VerticaBackup, `None` if it does not exist
    async fn get_backup(&self, namespace: &str, name: &str) -> Result<Option<VerticaBackup>>;

    /// Fetch a VerticaRestore, `None` if it does not exist
    async fn get_restore(&self, namespace: &str, name: &str) -> Result<Option<VerticaRestore>>;

    /// All VerticaBackups in a namespace
    async fn list_backups(&self, namespace: &str) -> Result<Vec<VerticaBackup>>;

    /// All VerticaRestores in a namespace
    async fn list_restores(&self, namespace: &str) -> Result<Vec<VerticaRestore>>;

    /// Whether an object of `kind` named `name` exists in `namespace`
    async fn exists(&self, kind: &ResourceKind, namespace: &str, name: &str) -> Result<bool>;

    /// Write the archive's status, conditional on its resourceVersion
    async fn write_archive_status(&self, archive: &VerticaArchive) -> Result<VerticaArchive>;

    /// Write the backup's status, conditional on its resourceVersion
    async fn write_backup_status(&self, backup: &VerticaBackup) -> Result<VerticaBackup>;

    /// Write the restore's status, conditional on its resourceVersion
    async fn write_restore_status(&self, restore: &VerticaRestore) -> Result<VerticaRestore>;
}
