//! ObjectStore backed by the Kubernetes API server

use std::fmt::Debug;

use async_trait::async_trait;
use kube::{
    api::{ApiResource, DynamicObject, ListParams, Patch, PatchParams},
    core::{GroupVersionKind, NamespaceResourceScope},
    Api, Client, Resource, ResourceExt,
};
use serde::{de::DeserializeOwned, Serialize};
use serde_json::json;
use tracing::debug;

use super::{ObjectStore, ResourceKind};
use crate::crd::{
    VerticaArchive, VerticaBackup, VerticaRestore, VERTICA_DB_GROUP, VERTICA_DB_KIND,
    VERTICA_DB_PLURAL, VERTICA_DB_VERSION,
};
use crate::error::{Error, Result};

/// Field manager recorded on status patches
pub const FIELD_MANAGER: &str = "vertica-backup-operator";

/// Real Kubernetes store implementation
#[derive(Clone)]
pub struct KubeStore {
    client: Client,
}

impl KubeStore {
    /// Create a new KubeStore wrapping the given kube Client
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    fn api<K>(&self, namespace: &str) -> Api<K>
    where
        K: Resource<Scope = NamespaceResourceScope>,
        K::DynamicType: Default,
    {
        Api::namespaced(self.client.clone(), namespace)
    }

    async fn get_opt<K>(&self, namespace: &str, name: &str) -> Result<Option<K>>
    where
        K: Resource<Scope = NamespaceResourceScope> + Clone + DeserializeOwned + Debug,
        K::DynamicType: Default,
    {
        if name.is_empty() {
            return Ok(None);
        }
        Ok(self.api::<K>(namespace).get_opt(name).await?)
    }

    async fn list<K>(&self, namespace: &str) -> Result<Vec<K>>
    where
        K: Resource<Scope = NamespaceResourceScope> + Clone + DeserializeOwned + Debug,
        K::DynamicType: Default,
    {
        let list = self
            .api::<K>(namespace)
            .list(&ListParams::default())
            .await?;
        Ok(list.items)
    }

    /// Merge-patch the status sub-resource with the object's resourceVersion
    /// embedded, so the API server rejects the write with 409 if the object
    /// changed since it was read.
    async fn write_status<K, S>(&self, obj: &K, status: &S) -> Result<K>
    where
        K: Resource<Scope = NamespaceResourceScope> + Clone + DeserializeOwned + Debug,
        K::DynamicType: Default,
        S: Serialize,
    {
        let name = obj.name_any();
        let namespace = obj
            .namespace()
            .ok_or_else(|| Error::missing_metadata(format!("{} has no namespace", name)))?;
        let resource_version = obj.resource_version().ok_or_else(|| {
            Error::missing_metadata(format!("{}/{} has no resourceVersion", namespace, name))
        })?;

        debug!(
            name = %name,
            namespace = %namespace,
            resource_version = %resource_version,
            "Writing status"
        );

        let patch = status_patch(&resource_version, status);
        self.api::<K>(&namespace)
            .patch_status(&name, &PatchParams::apply(FIELD_MANAGER), &Patch::Merge(&patch))
            .await
            .map_err(Error::from_write)
    }

    async fn dynamic_exists(
        &self,
        resource: &ApiResource,
        namespace: &str,
        name: &str,
    ) -> Result<bool> {
        let api: Api<DynamicObject> =
            Api::namespaced_with(self.client.clone(), namespace, resource);
        Ok(api.get_opt(name).await?.is_some())
    }
}

/// Merge patch body for a status write conditioned on `resource_version`
pub fn status_patch<S: Serialize>(resource_version: &str, status: &S) -> serde_json::Value {
    json!({
        "metadata": { "resourceVersion": resource_version },
        "status": status,
    })
}

/// ApiResource for the VerticaDB kind, which has no Rust type in this crate
pub fn vertica_db_resource() -> ApiResource {
    let gvk = GroupVersionKind::gvk(VERTICA_DB_GROUP, VERTICA_DB_VERSION, VERTICA_DB_KIND);
    ApiResource::from_gvk_with_plural(&gvk, VERTICA_DB_PLURAL)
}

#[async_trait]
impl ObjectStore for KubeStore {
    async fn get_archive(&self, namespace: &str, name: &str) -> Result<Option<VerticaArchive>> {
        self.get_opt(namespace, name).await
    }

    async fn get_backup(&self, namespace: &str, name: &str) -> Result<Option<VerticaBackup>> {
        self.get_opt(namespace, name).await
    }

    async fn get_restore(&self, namespace: &str, name: &str) -> Result<Option<VerticaRestore>> {
        self.get_opt(namespace, name).await
    }

    async fn list_backups(&self, namespace: &str) -> Result<Vec<VerticaBackup>> {
        self.list(namespace).await
    }

    async fn list_restores(&self, namespace: &str) -> Result<Vec<VerticaRestore>> {
        self.list(namespace).await
    }

    async fn exists(&self, kind: &ResourceKind, namespace: &str, name: &str) -> Result<bool> {
        if name.is_empty() {
            return Ok(false);
        }
        match kind {
            ResourceKind::VerticaArchive => Ok(self.get_archive(namespace, name).await?.is_some()),
            ResourceKind::VerticaDb => {
                self.dynamic_exists(&vertica_db_resource(), namespace, name)
                    .await
            }
            ResourceKind::Other(gvk) => {
                let (resource, _caps) = kube::discovery::pinned_kind(&self.client, gvk).await?;
                self.dynamic_exists(&resource, namespace, name).await
            }
        }
    }

    async fn write_archive_status(&self, archive: &VerticaArchive) -> Result<VerticaArchive> {
        self.write_status(archive, &archive.status).await
    }

    async fn write_backup_status(&self, backup: &VerticaBackup) -> Result<VerticaBackup> {
        self.write_status(backup, &backup.status).await
    }

    async fn write_restore_status(&self, restore: &VerticaRestore) -> Result<VerticaRestore> {
        self.write_status(restore, &restore.status).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crd::{JobPhase, JobResource, Transition, VerticaBackupSpec};
    use chrono::Utc;

    #[test]
    fn patch_carries_resource_version() {
        let patch = status_patch("42", &json!({ "referencedCount": 2 }));
        assert_eq!(patch["metadata"]["resourceVersion"], "42");
        assert_eq!(patch["status"]["referencedCount"], 2);
    }

    #[test]
    fn patch_clears_reason_after_reinitialize() {
        let mut backup = VerticaBackup::new(
            "b1",
            VerticaBackupSpec {
                vertica_db_name: "db1".to_string(),
                archive: "a1".to_string(),
                encrypt_transport: true,
                ca_file: None,
                include_objects: None,
                exclude_objects: None,
            },
        );
        let status = backup.job_status_mut();
        status
            .transition(Transition::to(JobPhase::Initialized, Utc::now()))
            .unwrap();
        status.fail("boom", Utc::now()).unwrap();
        status.transition(Transition::reinitialize(Utc::now())).unwrap();

        let patch = status_patch("7", &backup.status);
        let body = patch["status"].as_object().unwrap();
        assert!(body.contains_key("reason"));
        assert!(body["reason"].is_null());
        assert_eq!(body["phase"], "Initialized");
        assert_eq!(body["conditions"].as_array().unwrap().len(), 3);
    }
}
