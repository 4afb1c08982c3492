//! VerticaRestore controller
//!
//! Watches VerticaRestore resources together with the archive each one
//! restores from and the database it restores into.

use std::sync::Arc;

use futures::StreamExt;
use kube::{
    api::ListParams,
    runtime::{
        controller::{Action, Controller, Error as ControllerError},
        watcher::Config as WatcherConfig,
    },
    Api, ResourceExt,
};
use tracing::{error, info, instrument, warn};

use super::{error_action, to_action, watches, Context};
use crate::crd::{VerticaArchive, VerticaRestore};
use crate::error::{Error, Result};
use crate::metrics;
use crate::reconcilers::{ReconcileRequest, ResourceReconciler};
use crate::store::vertica_db_resource;

const KIND: &str = "VerticaRestore";

/// Run the VerticaRestore controller
pub async fn run(context: Arc<Context>) {
    let api: Api<VerticaRestore> = context.api();

    // Verify CRD is installed
    if let Err(e) = api.list(&ListParams::default().limit(1)).await {
        error!("VerticaRestore CRD not installed: {}", e);
        return;
    }

    info!("Starting VerticaRestore controller");

    let controller = Controller::new(api, WatcherConfig::default());
    let by_archive = controller.store();
    let by_db = controller.store();
    let db_resource = vertica_db_resource();

    controller
        .watches(
            context.api::<VerticaArchive>(),
            WatcherConfig::default(),
            move |archive| watches::jobs_referencing_archive(&by_archive.state(), &archive),
        )
        .watches_with(
            context.dynamic_api(&db_resource),
            db_resource,
            WatcherConfig::default(),
            move |db| watches::jobs_referencing_db(&by_db.state(), &db),
        )
        .shutdown_on_signal()
        .run(reconcile, error_policy, context)
        .for_each(|result| async move {
            match result {
                Ok((obj, _action)) => {
                    info!(
                        name = %obj.name,
                        namespace = obj.namespace.as_deref().unwrap_or("default"),
                        "Reconciled VerticaRestore"
                    );
                }
                Err(ControllerError::ReconcilerFailed(_, _)) => {
                    metrics::RECONCILIATION_ERRORS.with_label_values(&[KIND]).inc();
                }
                Err(e) => {
                    warn!(error = %e, "Controller error");
                }
            }
        })
        .await;
}

#[instrument(skip(obj, ctx), fields(name = %obj.name_any(), namespace = obj.namespace()))]
async fn reconcile(obj: Arc<VerticaRestore>, ctx: Arc<Context>) -> Result<Action> {
    let _timer = metrics::RECONCILE_DURATION
        .with_label_values(&[KIND])
        .start_timer();
    metrics::RECONCILIATIONS.with_label_values(&[KIND]).inc();

    let request = ReconcileRequest::for_resource(obj.as_ref());
    let result = ctx.restores.reconcile(&request, &ctx.shutdown).await?;
    Ok(to_action(result, ctx.config.requeue_interval()))
}

fn error_policy(obj: Arc<VerticaRestore>, error: &Error, _ctx: Arc<Context>) -> Action {
    error!(
        name = %obj.name_any(),
        error = %error,
        "Reconciliation failed, scheduling retry"
    );
    error_action(error)
}
