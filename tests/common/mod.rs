//! Shared fixtures for integration tests
//!
//! `MemoryStore` mimics the API server closely enough for the reconcilers:
//! every write bumps a global resourceVersion, status writes carrying a stale
//! version fail with a conflict, and a concurrent writer can be simulated.

#![allow(dead_code)]

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Mutex;

use async_trait::async_trait;
use k8s_openapi::api::core::v1::ObjectReference;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use kube::core::ErrorResponse;
use kube::runtime::events::EventType;
use kube::ResourceExt;

use vertica_backup_operator::crd::{
    ObjectRestoreMode, VerticaArchive, VerticaArchiveSpec, VerticaArchiveStatus, VerticaBackup,
    VerticaBackupSpec, VerticaRestore, VerticaRestoreSpec,
};
use vertica_backup_operator::events::EventPublisher;
use vertica_backup_operator::store::{ObjectStore, ResourceKind};
use vertica_backup_operator::{Error, Result};

pub const NAMESPACE: &str = "default";

type Key = (String, String);

fn key(namespace: &str, name: &str) -> Key {
    (namespace.to_string(), name.to_string())
}

fn metadata(name: &str) -> ObjectMeta {
    ObjectMeta {
        name: Some(name.to_string()),
        namespace: Some(NAMESPACE.to_string()),
        ..Default::default()
    }
}

// ============================================================================
// Object builders
// ============================================================================

pub fn archive(name: &str) -> VerticaArchive {
    VerticaArchive {
        metadata: metadata(name),
        spec: VerticaArchiveSpec {
            path: format!("s3://backups/{}", name),
            restore_point_limit: 1,
        },
        status: None,
    }
}

pub fn backup(name: &str, db: &str, archive: &str) -> VerticaBackup {
    VerticaBackup {
        metadata: metadata(name),
        spec: VerticaBackupSpec {
            vertica_db_name: db.to_string(),
            archive: archive.to_string(),
            encrypt_transport: true,
            ca_file: None,
            include_objects: None,
            exclude_objects: None,
        },
        status: None,
    }
}

pub fn restore(name: &str, db: &str, archive: &str) -> VerticaRestore {
    VerticaRestore {
        metadata: metadata(name),
        spec: VerticaRestoreSpec {
            vertica_db_name: db.to_string(),
            archive: archive.to_string(),
            timestamp: None,
            drop_foreign_constraints: false,
            include_objects: None,
            exclude_objects: None,
            object_restore_mode: ObjectRestoreMode::CreateOrReplace,
        },
        status: None,
    }
}

// ============================================================================
// In-memory object store
// ============================================================================

#[derive(Default)]
struct State {
    version: u64,
    archives: BTreeMap<Key, VerticaArchive>,
    backups: BTreeMap<Key, VerticaBackup>,
    restores: BTreeMap<Key, VerticaRestore>,
    databases: BTreeSet<Key>,
    racing_archive_writes: u32,
    exists_error: Option<u16>,
    status_writes: u32,
    conflicts: u32,
}

impl State {
    fn next_version(&mut self) -> String {
        self.version += 1;
        self.version.to_string()
    }
}

#[derive(Default)]
pub struct MemoryStore {
    state: Mutex<State>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn with<T>(&self, f: impl FnOnce(&mut State) -> T) -> T {
        let mut state = self.state.lock().unwrap();
        f(&mut state)
    }

    pub fn add_database(&self, name: &str) {
        self.with(|s| s.databases.insert(key(NAMESPACE, name)));
    }

    pub fn add_archive(&self, mut obj: VerticaArchive) {
        self.with(|s| {
            obj.metadata.resource_version = Some(s.next_version());
            s.archives.insert(key(NAMESPACE, &obj.name_any()), obj);
        });
    }

    pub fn add_backup(&self, mut obj: VerticaBackup) {
        self.with(|s| {
            obj.metadata.resource_version = Some(s.next_version());
            s.backups.insert(key(NAMESPACE, &obj.name_any()), obj);
        });
    }

    pub fn add_restore(&self, mut obj: VerticaRestore) {
        self.with(|s| {
            obj.metadata.resource_version = Some(s.next_version());
            s.restores.insert(key(NAMESPACE, &obj.name_any()), obj);
        });
    }

    pub fn delete_backup(&self, name: &str) {
        self.with(|s| s.backups.remove(&key(NAMESPACE, name)));
    }

    pub fn archive(&self, name: &str) -> Option<VerticaArchive> {
        self.with(|s| s.archives.get(&key(NAMESPACE, name)).cloned())
    }

    pub fn backup(&self, name: &str) -> Option<VerticaBackup> {
        self.with(|s| s.backups.get(&key(NAMESPACE, name)).cloned())
    }

    pub fn restore(&self, name: &str) -> Option<VerticaRestore> {
        self.with(|s| s.restores.get(&key(NAMESPACE, name)).cloned())
    }

    /// The next `n` archive status writes lose a race: another writer bumps
    /// the archive's resourceVersion just before each lands
    pub fn race_archive_writes(&self, n: u32) {
        self.with(|s| s.racing_archive_writes = n);
    }

    /// Make every `exists` lookup fail with this HTTP status
    pub fn fail_lookups_with(&self, code: u16) {
        self.with(|s| s.exists_error = Some(code));
    }

    pub fn status_writes(&self) -> u32 {
        self.with(|s| s.status_writes)
    }

    pub fn conflicts(&self) -> u32 {
        self.with(|s| s.conflicts)
    }
}

fn api_error(code: u16, reason: &str) -> Error {
    Error::Kube(kube::Error::Api(ErrorResponse {
        status: "Failure".to_string(),
        message: format!("simulated {}", reason),
        reason: reason.to_string(),
        code,
    }))
}

/// Replace the stored object's status if `incoming` carries the current
/// resourceVersion
fn write_status<K, S>(
    state: &mut State,
    select: impl FnOnce(&mut State) -> Option<&mut K>,
    incoming: &K,
    status: impl FnOnce(&K) -> S,
    apply: impl FnOnce(&mut K, S),
) -> Result<K>
where
    K: kube::Resource + Clone,
{
    let version = state.next_version();
    state.status_writes += 1;
    let Some(stored) = select(state) else {
        return Err(api_error(404, "NotFound"));
    };
    if stored.resource_version() != incoming.resource_version() {
        return Err(Error::Conflict(format!(
            "{} has been modified; please apply your changes to the latest version",
            incoming.name_any()
        )));
    }
    apply(stored, status(incoming));
    stored.meta_mut().resource_version = Some(version);
    Ok(stored.clone())
}

#[async_trait]
impl ObjectStore for MemoryStore {
    async fn get_archive(&self, namespace: &str, name: &str) -> Result<Option<VerticaArchive>> {
        Ok(self.with(|s| s.archives.get(&key(namespace, name)).cloned()))
    }

    async fn get_backup(&self, namespace: &str, name: &str) -> Result<Option<VerticaBackup>> {
        Ok(self.with(|s| s.backups.get(&key(namespace, name)).cloned()))
    }

    async fn get_restore(&self, namespace: &str, name: &str) -> Result<Option<VerticaRestore>> {
        Ok(self.with(|s| s.restores.get(&key(namespace, name)).cloned()))
    }

    async fn list_backups(&self, namespace: &str) -> Result<Vec<VerticaBackup>> {
        Ok(self.with(|s| {
            s.backups
                .iter()
                .filter(|((ns, _), _)| ns == namespace)
                .map(|(_, b)| b.clone())
                .collect()
        }))
    }

    async fn list_restores(&self, namespace: &str) -> Result<Vec<VerticaRestore>> {
        Ok(self.with(|s| {
            s.restores
                .iter()
                .filter(|((ns, _), _)| ns == namespace)
                .map(|(_, r)| r.clone())
                .collect()
        }))
    }

    async fn exists(&self, kind: &ResourceKind, namespace: &str, name: &str) -> Result<bool> {
        self.with(|s| {
            if let Some(code) = s.exists_error {
                return Err(api_error(code, "Forbidden"));
            }
            let k = key(namespace, name);
            Ok(match kind {
                ResourceKind::VerticaDb => s.databases.contains(&k),
                ResourceKind::VerticaArchive => s.archives.contains_key(&k),
                ResourceKind::Other(_) => false,
            })
        })
    }

    async fn write_archive_status(&self, archive: &VerticaArchive) -> Result<VerticaArchive> {
        self.with(|s| {
            let k = key(NAMESPACE, &archive.name_any());
            if s.racing_archive_writes > 0 {
                s.racing_archive_writes -= 1;
                s.conflicts += 1;
                let version = s.next_version();
                if let Some(stored) = s.archives.get_mut(&k) {
                    stored.metadata.resource_version = Some(version);
                }
            }
            write_status(
                s,
                |s| s.archives.get_mut(&k),
                archive,
                |a| a.status.clone(),
                |a, status: Option<VerticaArchiveStatus>| a.status = status,
            )
        })
    }

    async fn write_backup_status(&self, backup: &VerticaBackup) -> Result<VerticaBackup> {
        self.with(|s| {
            let k = key(NAMESPACE, &backup.name_any());
            write_status(
                s,
                |s| s.backups.get_mut(&k),
                backup,
                |b| b.status.clone(),
                |b, status| b.status = status,
            )
        })
    }

    async fn write_restore_status(&self, restore: &VerticaRestore) -> Result<VerticaRestore> {
        self.with(|s| {
            let k = key(NAMESPACE, &restore.name_any());
            write_status(
                s,
                |s| s.restores.get_mut(&k),
                restore,
                |r| r.status.clone(),
                |r, status| r.status = status,
            )
        })
    }
}

// ============================================================================
// Recording event publisher
// ============================================================================

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RecordedEvent {
    pub object_kind: Option<String>,
    pub object_name: Option<String>,
    pub warning: bool,
    pub reason: String,
    pub note: Option<String>,
}

#[derive(Default)]
pub struct RecordingEvents {
    events: Mutex<Vec<RecordedEvent>>,
}

impl RecordingEvents {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn recorded(&self) -> Vec<RecordedEvent> {
        self.events.lock().unwrap().clone()
    }
}

#[async_trait]
impl EventPublisher for RecordingEvents {
    async fn publish(
        &self,
        resource_ref: &ObjectReference,
        type_: EventType,
        reason: &str,
        _action: &str,
        note: Option<String>,
    ) {
        self.events.lock().unwrap().push(RecordedEvent {
            object_kind: resource_ref.kind.clone(),
            object_name: resource_ref.name.clone(),
            warning: matches!(type_, EventType::Warning),
            reason: reason.to_string(),
            note,
        });
    }
}
