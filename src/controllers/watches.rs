//! Watch mappers
//!
//! Translate a change on a related object into reconcile requests for the
//! objects that reference it. These are subscriptions only: nothing here
//! owns or cascades deletion of anything.

use std::sync::Arc;

use kube::api::DynamicObject;
use kube::runtime::reflector::ObjectRef;
use kube::{Resource, ResourceExt};

use crate::crd::{JobResource, VerticaArchive};

/// Jobs in the archive's namespace whose `spec.archive` names it
pub fn jobs_referencing_archive<K>(jobs: &[Arc<K>], archive: &VerticaArchive) -> Vec<ObjectRef<K>>
where
    K: Resource<DynamicType = ()> + JobResource,
{
    let name = archive.name_any();
    referencing(jobs, archive.namespace(), |job| job.archive_name() == name)
}

/// Jobs in the database's namespace whose `spec.verticaDBName` names it
pub fn jobs_referencing_db<K>(jobs: &[Arc<K>], db: &DynamicObject) -> Vec<ObjectRef<K>>
where
    K: Resource<DynamicType = ()> + JobResource,
{
    let name = db.name_any();
    referencing(jobs, db.namespace(), |job| job.vertica_db_name() == name)
}

/// Archives a job references: the one its spec names and, if different, the
/// one recorded in its status. A job whose `spec.archive` was edited thereby
/// still triggers a recount of the archive it used to name.
pub fn archives_of<K>(job: &K) -> Vec<ObjectRef<VerticaArchive>>
where
    K: Resource + JobResource,
{
    let resolved = job.job_status().and_then(|s| s.archive());
    let mut names = vec![job.archive_name()];
    if let Some(resolved) = resolved.filter(|r| *r != job.archive_name()) {
        names.push(resolved);
    }

    let namespace = job.namespace();
    names
        .into_iter()
        .filter(|name| !name.is_empty())
        .map(|name| {
            let obj_ref = ObjectRef::new(name);
            match &namespace {
                Some(ns) => obj_ref.within(ns),
                None => obj_ref,
            }
        })
        .collect()
}

fn referencing<K, F>(jobs: &[Arc<K>], namespace: Option<String>, refers: F) -> Vec<ObjectRef<K>>
where
    K: Resource<DynamicType = ()> + JobResource,
    F: Fn(&K) -> bool,
{
    jobs.iter()
        .map(Arc::as_ref)
        .filter(|job| job.namespace() == namespace && refers(*job))
        .map(ObjectRef::from_obj)
        .collect()
}
