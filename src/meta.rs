//! Annotations recognised on any of the operator's custom resources

use std::collections::BTreeMap;

use kube::ResourceExt;

/// When set to a true value the operator skips the resource entirely. Useful
/// to break an error-retry loop or to freeze an object by hand.
pub const PAUSE_ANNOTATION: &str = "vertica.com/pause";

/// Whether the pause annotation is set to a true value
pub fn is_pause_annotation_set(annotations: &BTreeMap<String, String>) -> bool {
    lookup_bool_annotation(annotations, PAUSE_ANNOTATION)
}

/// Whether reconciliation of `obj` is paused
pub fn is_paused<K: ResourceExt>(obj: &K) -> bool {
    is_pause_annotation_set(obj.annotations())
}

fn lookup_bool_annotation(annotations: &BTreeMap<String, String>, key: &str) -> bool {
    annotations
        .get(key)
        .and_then(|value| parse_bool(value))
        .unwrap_or(false)
}

// Accepts the spellings of Go's strconv.ParseBool.
fn parse_bool(value: &str) -> Option<bool> {
    match value {
        "1" | "t" | "T" | "true" | "TRUE" | "True" => Some(true),
        "0" | "f" | "F" | "false" | "FALSE" | "False" => Some(false),
        _ => None,
    }
}
