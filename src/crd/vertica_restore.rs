//! VerticaRestore Custom Resource Definition

use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::vertica_backup::effective_exclude;
use super::{JobResource, JobStatus};

/// VerticaRestore resource specification
#[derive(CustomResource, Clone, Debug, Deserialize, Serialize, JsonSchema)]
#[kube(
    group = "vertica.com",
    version = "v1beta1",
    kind = "VerticaRestore",
    plural = "verticarestores",
    singular = "verticarestore",
    shortname = "vr",
    namespaced,
    status = "VerticaRestoreStatus",
    printcolumn = r#"{"name": "Phase", "type": "string", "jsonPath": ".status.phase"}"#,
    printcolumn = r#"{"name": "Database", "type": "string", "jsonPath": ".spec.verticaDBName"}"#,
    printcolumn = r#"{"name": "Archive", "type": "string", "jsonPath": ".status.archive"}"#,
    printcolumn = r#"{"name": "Age", "type": "date", "jsonPath": ".metadata.creationTimestamp"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct VerticaRestoreSpec {
    /// Name of an existing VerticaDB in the same namespace to restore into
    #[serde(rename = "verticaDBName")]
    pub vertica_db_name: String,

    /// Name of the VerticaArchive to restore from
    pub archive: String,

    /// Timestamp of the retained backup image to restore. The most recent
    /// backup is used when omitted.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,

    /// Drop foreign key constraints during an object-level restore.
    /// Ignored unless `objectRestoreMode` is `coexist`.
    #[serde(default)]
    pub drop_foreign_constraints: bool,

    /// Objects to restore from the backup
    #[serde(skip_serializing_if = "Option::is_none")]
    pub include_objects: Option<String>,

    /// Objects to leave out; only applies on top of `includeObjects`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exclude_objects: Option<String>,

    /// How to handle objects whose name already exists
    #[serde(default)]
    pub object_restore_mode: ObjectRestoreMode,
}

/// Name collision policy for object restores
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub enum ObjectRestoreMode {
    /// Create missing objects and overwrite existing ones
    #[default]
    CreateOrReplace,
    /// Create missing objects; fail if one already exists
    Create,
    /// Restore next to existing objects as `backup_timestamp_objectname`
    Coexist,
}

/// VerticaRestore status
pub type VerticaRestoreStatus = JobStatus;

impl VerticaRestoreSpec {
    /// Whether foreign constraints are actually dropped
    pub fn drops_foreign_constraints(&self) -> bool {
        self.drop_foreign_constraints && self.object_restore_mode == ObjectRestoreMode::Coexist
    }

    /// The exclude filter, or `None` when no include filter gives it meaning
    pub fn effective_exclude_objects(&self) -> Option<&str> {
        effective_exclude(self.include_objects.as_deref(), self.exclude_objects.as_deref())
    }
}

impl JobResource for VerticaRestore {
    fn vertica_db_name(&self) -> &str {
        &self.spec.vertica_db_name
    }

    fn archive_name(&self) -> &str {
        &self.spec.archive
    }

    fn job_status(&self) -> Option<&JobStatus> {
        self.status.as_ref()
    }

    fn job_status_mut(&mut self) -> &mut JobStatus {
        self.status.get_or_insert_with(JobStatus::default)
    }
}
