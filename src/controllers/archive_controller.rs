//! VerticaArchive controller
//!
//! Watches VerticaArchive resources. Any change to a VerticaBackup or
//! VerticaRestore, deletion included, triggers the archive it names so the
//! reference count converges.

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
use crate::crd::{VerticaArchive, VerticaBackup, VerticaRestore};
use crate::error::{Error, Result};
use crate::metrics;
use crate::reconcilers::{ReconcileRequest, ResourceReconciler};

const KIND: &str = "VerticaArchive";

/// Run the VerticaArchive controller
pub async fn run(context: Arc<Context>) {
    let api: Api<VerticaArchive> = context.api();

    if let Err(e) = api.list(&ListParams::default().limit(1)).await {
        error!("VerticaArchive CRD not installed: {}", e);
        return;
    }

    info!("Starting VerticaArchive controller");

    Controller::new(api, WatcherConfig::default())
        .watches(
            context.api::<VerticaBackup>(),
            WatcherConfig::default(),
            |backup| watches::archives_of(&backup),
        )
        .watches(
            context.api::<VerticaRestore>(),
            WatcherConfig::default(),
            |restore| watches::archives_of(&restore),
        )
        .shutdown_on_signal()
        .run(reconcile, error_policy, context)
        .for_each(|result| async move {
            match result {
                Ok((obj, _action)) => {
                    info!(
                        name = %obj.name,
                        namespace = obj.namespace.as_deref().unwrap_or("default"),
                        "Reconciled VerticaArchive"
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
async fn reconcile(obj: Arc<VerticaArchive>, ctx: Arc<Context>) -> Result<Action> {
    let _timer = metrics::RECONCILE_DURATION
        .with_label_values(&[KIND])
        .start_timer();
    metrics::RECONCILIATIONS.with_label_values(&[KIND]).inc();

    let request = ReconcileRequest::for_resource(obj.as_ref());
    let result = ctx.archives.reconcile(&request, &ctx.shutdown).await?;
    Ok(to_action(result, ctx.config.requeue_interval()))
}

fn error_policy(obj: Arc<VerticaArchive>, error: &Error, _ctx: Arc<Context>) -> Action {
    error!(
        name = %obj.name_any(),
        error = %error,
        "Reconciliation failed, scheduling retry"
    );
    error_action(error)
}
