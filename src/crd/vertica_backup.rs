//! VerticaBackup Custom Resource Definition

use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::{JobResource, JobStatus};

/// VerticaBackup resource specification
#[derive(CustomResource, Clone, Debug, Deserialize, Serialize, JsonSchema)]
#[kube(
    group = "vertica.com",
    version = "v1beta1",
    kind = "VerticaBackup",
    plural = "verticabackups",
    singular = "verticabackup",
    shortname = "vbu",
    namespaced,
    status = "VerticaBackupStatus",
    printcolumn = r#"{"name": "Phase", "type": "string", "jsonPath": ".status.phase"}"#,
    printcolumn = r#"{"name": "Database", "type": "string", "jsonPath": ".spec.verticaDBName"}"#,
    printcolumn = r#"{"name": "Archive", "type": "string", "jsonPath": ".status.archive"}"#,
    printcolumn = r#"{"name": "Age", "type": "date", "jsonPath": ".metadata.creationTimestamp"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct VerticaBackupSpec {
    /// Name of an existing VerticaDB in the same namespace to back up
    #[serde(rename = "verticaDBName")]
    pub vertica_db_name: String,

    /// Name of an existing VerticaArchive in the same namespace
    pub archive: String,

    /// Encrypt data sent to the backup location
    #[serde(default = "default_true")]
    pub encrypt_transport: bool,

    /// Path to an SSL certificate bundle, relative inside a VerticaDB pod
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ca_file: Option<String>,

    /// Objects to include in the backup
    #[serde(skip_serializing_if = "Option::is_none")]
    pub include_objects: Option<String>,

    /// Objects to exclude; only applies on top of `includeObjects`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exclude_objects: Option<String>,
}

fn default_true() -> bool {
    true
}

/// VerticaBackup status
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct VerticaBackupStatus {
    #[serde(flatten)]
    pub job: JobStatus,

    /// Status message for the current backup
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub backup_status: Option<String>,
}

impl VerticaBackupSpec {
    /// The exclude filter, or `None` when no include filter gives it meaning
    pub fn effective_exclude_objects(&self) -> Option<&str> {
        effective_exclude(self.include_objects.as_deref(), self.exclude_objects.as_deref())
    }
}

pub(crate) fn effective_exclude<'a>(
    include: Option<&str>,
    exclude: Option<&'a str>,
) -> Option<&'a str> {
    match include {
        Some(include) if !include.is_empty() => exclude.filter(|e| !e.is_empty()),
        _ => None,
    }
}

impl JobResource for VerticaBackup {
    fn vertica_db_name(&self) -> &str {
        &self.spec.vertica_db_name
    }

    fn archive_name(&self) -> &str {
        &self.spec.archive
    }

    fn job_status(&self) -> Option<&JobStatus> {
        self.status.as_ref().map(|s| &s.job)
    }

    fn job_status_mut(&mut self) -> &mut JobStatus {
        &mut self.status.get_or_insert_with(VerticaBackupStatus::default).job
    }
}
