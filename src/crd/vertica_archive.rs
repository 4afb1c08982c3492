//! VerticaArchive Custom Resource Definition

use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// VerticaArchive resource specification
#[derive(CustomResource, Clone, Debug, Deserialize, Serialize, JsonSchema)]
#[kube(
    group = "vertica.com",
    version = "v1beta1",
    kind = "VerticaArchive",
    plural = "verticaarchives",
    singular = "verticaarchive",
    shortname = "varc",
    namespaced,
    status = "VerticaArchiveStatus",
    printcolumn = r#"{"name": "Path", "type": "string", "jsonPath": ".spec.path"}"#,
    printcolumn = r#"{"name": "Referenced", "type": "integer", "jsonPath": ".status.referencedCount"}"#,
    printcolumn = r#"{"name": "Age", "type": "date", "jsonPath": ".metadata.creationTimestamp"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct VerticaArchiveSpec {
    /// Where the archive is stored. For S3-compatible or cloud locations this
    /// is the bucket and backup path; for HDFS include the protocol.
    pub path: String,

    /// Number of earlier backups to retain alongside the most recent one.
    /// The default of 1 keeps the latest backup and the one before it.
    #[serde(default = "default_restore_point_limit")]
    pub restore_point_limit: u32,
}

fn default_restore_point_limit() -> u32 {
    1
}

/// VerticaArchive status
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct VerticaArchiveStatus {
    /// Number of VerticaBackup/VerticaRestore objects referencing this archive
    #[serde(default)]
    pub referenced_count: u32,
}

impl VerticaArchiveSpec {
    /// Total backups kept in the archive, the latest included
    pub fn retained_backups(&self) -> u32 {
        self.restore_point_limit.saturating_add(1)
    }
}

impl VerticaArchive {
    /// Stored reference count, zero when no status was written yet
    pub fn referenced_count(&self) -> u32 {
        self.status.as_ref().map_or(0, |s| s.referenced_count)
    }
}
