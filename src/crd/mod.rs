//! Custom Resource Definitions for the Vertica Backup Operator

mod lifecycle;
mod vertica_archive;
mod vertica_backup;
mod vertica_restore;

pub use lifecycle::*;
pub use vertica_archive::*;
pub use vertica_backup::*;
pub use vertica_restore::*;

use kube::CustomResourceExt;

/// API group of the VerticaDB resource this operator references but does not own
pub const VERTICA_DB_GROUP: &str = "vertica.com";
/// Served version of the VerticaDB resource
pub const VERTICA_DB_VERSION: &str = "v1";
/// Kind of the VerticaDB resource
pub const VERTICA_DB_KIND: &str = "VerticaDB";
/// Plural of the VerticaDB resource
pub const VERTICA_DB_PLURAL: &str = "verticadbs";

/// Generate all CRD YAML manifests
pub fn generate_crds() -> Result<Vec<String>, serde_yaml::Error> {
    Ok(vec![
        serde_yaml::to_string(&VerticaArchive::crd())?,
        serde_yaml::to_string(&VerticaBackup::crd())?,
        serde_yaml::to_string(&VerticaRestore::crd())?,
    ])
}
