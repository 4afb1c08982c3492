//! Prometheus metrics for the Vertica Backup Operator
//!
//! Reconcile throughput and latency per kind, dependency lookups that came up
//! empty, status write conflicts and the last computed archive reference
//! counts, plus the health endpoints the Deployment probes.

mod prometheus;

pub use prometheus::*;
