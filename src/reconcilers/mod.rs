//! Reconcilers for the Vertica backup CRDs
//!
//! A reconcile pass for one object runs an ordered chain of actors:
//! - VerticaBackup / VerticaRestore: verify the VerticaDB, verify the
//!   archive, initialize status, recount the archive's references
//! - VerticaArchive: recount its own references

pub mod actor;
pub mod archive;
pub mod backup;
pub mod reference_count;
pub mod resource;
pub mod restore;
pub mod status;
pub mod verify;

pub use actor::{ReconcileActor, ReconcileRequest, ReconcileResult};
pub use archive::ArchiveReconciler;
pub use backup::BackupReconciler;
pub use resource::ResourceReconciler;
pub use restore::RestoreReconciler;
pub use verify::DependencyRef;
