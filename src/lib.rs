//! Vertica Backup Kubernetes Operator
//!
//! Reconciles VerticaArchive, VerticaBackup and VerticaRestore custom
//! resources. Every pass runs an ordered chain of actors: referenced objects
//! are verified, job status is initialized and archive reference counts are
//! recomputed.

pub mod config;
pub mod controllers;
pub mod crd;
pub mod error;
pub mod events;
pub mod meta;
pub mod metrics;
pub mod reconcilers;
pub mod store;

pub use error::{Error, Result};
