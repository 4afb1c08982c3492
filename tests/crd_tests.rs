//! Integration tests for the CRD types
//!
//! Defaults applied on deserialization, status serialization and the
//! generated CustomResourceDefinitions.

use kube::CustomResourceExt;
use serde_json::json;

use vertica_backup_operator::crd::{
    generate_crds, JobPhase, JobResource, ObjectRestoreMode, VerticaArchive, VerticaArchiveSpec, VerticaBackup,
    VerticaBackupSpec, VerticaRestore, VerticaRestoreSpec,
};

// ============================================================================
// Spec Defaults
// ============================================================================

#[test]
fn archive_defaults_to_one_restore_point() {
    let spec: VerticaArchiveSpec = serde_json::from_value(json!({
        "path": "s3://backups/db1"
    }))
    .unwrap();

    assert_eq!(spec.restore_point_limit, 1);
    assert_eq!(spec.retained_backups(), 2);
}

#[test]
fn backup_defaults_to_encrypted_transport() {
    let spec: VerticaBackupSpec = serde_json::from_value(json!({
        "verticaDBName": "db1",
        "archive": "a1"
    }))
    .unwrap();

    assert!(spec.encrypt_transport);
    assert!(spec.ca_file.is_none());
}

#[test]
fn exclude_objects_needs_include_objects() {
    let spec: VerticaBackupSpec = serde_json::from_value(json!({
        "verticaDBName": "db1",
        "archive": "a1",
        "excludeObjects": "public.tmp*"
    }))
    .unwrap();
    assert_eq!(spec.effective_exclude_objects(), None);

    let spec: VerticaBackupSpec = serde_json::from_value(json!({
        "verticaDBName": "db1",
        "archive": "a1",
        "includeObjects": "public.*",
        "excludeObjects": "public.tmp*"
    }))
    .unwrap();
    assert_eq!(spec.effective_exclude_objects(), Some("public.tmp*"));
}

#[test]
fn restore_defaults_and_coexist_only_flags() {
    let spec: VerticaRestoreSpec = serde_json::from_value(json!({
        "verticaDBName": "db1",
        "archive": "a1",
        "dropForeignConstraints": true
    }))
    .unwrap();

    assert_eq!(spec.object_restore_mode, ObjectRestoreMode::CreateOrReplace);
    assert!(spec.timestamp.is_none());
    assert!(!spec.drops_foreign_constraints());

    let spec: VerticaRestoreSpec = serde_json::from_value(json!({
        "verticaDBName": "db1",
        "archive": "a1",
        "dropForeignConstraints": true,
        "objectRestoreMode": "coexist"
    }))
    .unwrap();
    assert!(spec.drops_foreign_constraints());
}

// ============================================================================
// Status Serialization
// ============================================================================

#[test]
fn backup_status_round_trips_from_api_json() {
    let backup: VerticaBackup = serde_json::from_value(json!({
        "apiVersion": "vertica.com/v1beta1",
        "kind": "VerticaBackup",
        "metadata": { "name": "b1", "namespace": "default" },
        "spec": { "verticaDBName": "db1", "archive": "a1" },
        "status": {
            "phase": "Failed",
            "backupStatus": "vbr exited early",
            "reason": "vbr exited with status 1",
            "archive": "a1",
            "conditions": [
                { "type": "Initialized", "status": "True", "lastTransitionTime": "2024-05-01T10:00:00Z" },
                { "type": "Failed", "status": "True", "lastTransitionTime": "2024-05-01T10:05:00Z" }
            ]
        }
    }))
    .unwrap();

    let status = backup.job_status().unwrap();
    assert_eq!(status.phase(), Some(JobPhase::Failed));
    assert_eq!(status.reason(), Some("vbr exited with status 1"));
    assert_eq!(status.conditions().len(), 2);
    assert_eq!(
        backup.status.as_ref().and_then(|s| s.backup_status.as_deref()),
        Some("vbr exited early")
    );

    let value = serde_json::to_value(&backup).unwrap();
    assert_eq!(value["status"]["conditions"][1]["type"], "Failed");
    assert_eq!(value["status"]["phase"], "Failed");
    assert_eq!(value["status"]["backupStatus"], "vbr exited early");
    assert_eq!(value["spec"]["verticaDBName"], "db1");
}

#[test]
fn archive_status_is_camel_case() {
    let archive: VerticaArchive = serde_json::from_value(json!({
        "apiVersion": "vertica.com/v1beta1",
        "kind": "VerticaArchive",
        "metadata": { "name": "a1" },
        "spec": { "path": "s3://backups/db1" },
        "status": { "referencedCount": 4 }
    }))
    .unwrap();

    assert_eq!(archive.referenced_count(), 4);
}

// ============================================================================
// CRD Generation
// ============================================================================

#[test]
fn crds_carry_group_version_and_short_names() {
    let cases = [
        (VerticaArchive::crd(), "verticaarchives.vertica.com", "varc"),
        (VerticaBackup::crd(), "verticabackups.vertica.com", "vbu"),
        (VerticaRestore::crd(), "verticarestores.vertica.com", "vr"),
    ];

    for (crd, name, short) in cases {
        assert_eq!(crd.metadata.name.as_deref(), Some(name));
        assert_eq!(crd.spec.group, "vertica.com");
        assert_eq!(crd.spec.scope, "Namespaced");
        assert_eq!(crd.spec.versions[0].name, "v1beta1");
        assert!(crd.spec.versions[0]
            .subresources
            .as_ref()
            .is_some_and(|s| s.status.is_some()));
        assert_eq!(
            crd.spec.names.short_names.as_deref(),
            Some(&[short.to_string()][..])
        );
    }
}

#[test]
fn job_archive_column_shows_resolved_archive() {
    for crd in [VerticaBackup::crd(), VerticaRestore::crd()] {
        let columns = crd.spec.versions[0]
            .additional_printer_columns
            .clone()
            .unwrap_or_default();
        let archive = columns.iter().find(|c| c.name == "Archive").unwrap();
        assert_eq!(archive.json_path, ".status.archive");
    }
}

#[test]
fn generated_yaml_covers_all_kinds() {
    let docs = generate_crds().unwrap();

    assert_eq!(docs.len(), 3);
    assert!(docs[0].contains("kind: VerticaArchive"));
    assert!(docs[1].contains("kind: VerticaBackup"));
    assert!(docs[2].contains("kind: VerticaRestore"));
    assert!(docs[1].contains("verticaDBName"));
}
