//! Kubernetes resource watchers.
//!
//! Every watched kind runs its own `kube_runtime::Controller`. Besides
//! watch events, a controller reconciles all of its objects whenever the
//! periodic trigger fires, so NetBox changes are picked up without a
//! change on the Kubernetes side.
//!
//! Failed keys are requeued through the shared [`RequeueLimiter`], and a
//! success resets the key's backoff.
//!
//! [`RequeueLimiter`]: crate::backoff::RequeueLimiter

use std::fmt::Debug;
use std::hash::Hash;
use std::sync::Arc;
use std::time::Duration;

use crds::{ClusterImport, IPAddress, IPPoolImport, Update};
use futures::future::BoxFuture;
use futures::{FutureExt, StreamExt};
use kube::{Api, Resource};
use kube_runtime::controller::{Action, Config as ControllerConfig, Error as RuntimeError};
use kube_runtime::{watcher, Controller};
use serde::de::DeserializeOwned;
use tokio_stream::wrappers::ReceiverStream;
use tracing::{debug, error, info, warn};

use crate::error::ControllerError;
use crate::reconciler::{resource_key, Reconciler};
use crate::trigger::{periodic_trigger, Shutdown};

/// Wait after the last event of an object before reconciling it
const DEBOUNCE: Duration = Duration::from_secs(1);

/// Runtime knobs shared by all watchers
#[derive(Debug, Clone, Copy)]
pub struct WatchSettings {
    pub interval: Duration,
    pub concurrency: u16,
}

/// Run a controller for `K` until `shutdown` resolves.
///
/// `reconcile_fn` is one pass over a single object. Its errors are logged
/// here and requeued with the rate-limited delay of the object's key.
async fn watch_resource<K, F>(
    api: Api<K>,
    reconciler: Arc<Reconciler>,
    reconcile_fn: F,
    resource_name: &'static str,
    trigger: ReceiverStream<()>,
    shutdown: Shutdown,
    concurrency: u16,
) -> Result<(), ControllerError>
where
    K: Resource + Clone + Send + Sync + 'static + Debug + DeserializeOwned,
    K::DynamicType: Default + Eq + Hash + Clone + Debug + Unpin,
    F: Fn(Arc<Reconciler>, Arc<K>) -> BoxFuture<'static, Result<Action, ControllerError>>
        + Send
        + Sync
        + Clone
        + 'static,
{
    info!("Starting {} watcher", resource_name);

    let error_policy = move |obj: Arc<K>, error: &ControllerError, ctx: Arc<Reconciler>| {
        let key = format!("{}/{}", resource_name, resource_key(obj.as_ref()));
        let delay = ctx.limiter.when(&key);
        if error.is_conflict() {
            warn!("Conflict while reconciling {}, requeue in {:?}: {}", key, delay, error);
        } else {
            error!("Reconciliation error for {}, requeue in {:?}: {}", key, delay, error);
        }
        Action::requeue(delay)
    };

    let reconcile = move |obj: Arc<K>, ctx: Arc<Reconciler>| {
        let reconcile_fn = reconcile_fn.clone();
        async move {
            let key = format!("{}/{}", resource_name, resource_key(obj.as_ref()));
            debug!("Reconciling {}", key);
            let result = reconcile_fn(ctx.clone(), obj).await;
            if result.is_ok() {
                ctx.limiter.forget(&key);
            }
            result
        }
    };

    let controller_config = ControllerConfig::default()
        .debounce(DEBOUNCE)
        .concurrency(concurrency);

    Controller::new(api, watcher::Config::default())
        .with_config(controller_config)
        .reconcile_all_on(trigger)
        .graceful_shutdown_on(shutdown)
        .run(reconcile, error_policy, reconciler)
        .for_each(|res| async move {
            match res {
                Ok((obj, _)) => debug!("Reconciled {} {}", resource_name, obj.name),
                // Already logged by the error policy
                Err(RuntimeError::ReconcilerFailed(_, _)) => {}
                Err(e) => error!("Controller error for {}: {}", resource_name, e),
            }
        })
        .await;

    info!("{} watcher stopped", resource_name);
    Ok(())
}

/// Watches the Argora custom resources and capi IPAddress objects.
pub struct Watcher {
    reconciler: Arc<Reconciler>,
    update_api: Api<Update>,
    cluster_import_api: Api<ClusterImport>,
    ip_pool_import_api: Api<IPPoolImport>,
    ip_address_api: Api<IPAddress>,
    settings: WatchSettings,
    shutdown: Shutdown,
}

impl Watcher {
    pub fn new(
        reconciler: Arc<Reconciler>,
        update_api: Api<Update>,
        cluster_import_api: Api<ClusterImport>,
        ip_pool_import_api: Api<IPPoolImport>,
        ip_address_api: Api<IPAddress>,
        settings: WatchSettings,
        shutdown: Shutdown,
    ) -> Self {
        Self {
            reconciler,
            update_api,
            cluster_import_api,
            ip_pool_import_api,
            ip_address_api,
            settings,
            shutdown,
        }
    }

    /// Periodic trigger for one controller; the timer task ends on shutdown
    fn trigger(&self, name: &'static str) -> ReceiverStream<()> {
        let (_handle, stream) = periodic_trigger(name, self.settings.interval, self.shutdown.clone());
        stream
    }

    pub async fn watch_updates(&self) -> Result<(), ControllerError> {
        watch_resource(
            self.update_api.clone(),
            self.reconciler.clone(),
            |reconciler, update: Arc<Update>| {
                async move { reconciler.reconcile_update(&update).await }.boxed()
            },
            "Update",
            self.trigger("Update"),
            self.shutdown.clone(),
            self.settings.concurrency,
        )
        .await
    }

    pub async fn watch_cluster_imports(&self) -> Result<(), ControllerError> {
        watch_resource(
            self.cluster_import_api.clone(),
            self.reconciler.clone(),
            |reconciler, import: Arc<ClusterImport>| {
                async move { reconciler.reconcile_cluster_import(&import).await }.boxed()
            },
            "ClusterImport",
            self.trigger("ClusterImport"),
            self.shutdown.clone(),
            self.settings.concurrency,
        )
        .await
    }

    pub async fn watch_ip_pool_imports(&self) -> Result<(), ControllerError> {
        watch_resource(
            self.ip_pool_import_api.clone(),
            self.reconciler.clone(),
            |reconciler, import: Arc<IPPoolImport>| {
                async move { reconciler.reconcile_ip_pool_import(&import).await }.boxed()
            },
            "IPPoolImport",
            self.trigger("IPPoolImport"),
            self.shutdown.clone(),
            self.settings.concurrency,
        )
        .await
    }

    pub async fn watch_ip_addresses(&self) -> Result<(), ControllerError> {
        watch_resource(
            self.ip_address_api.clone(),
            self.reconciler.clone(),
            |reconciler, ip_address: Arc<IPAddress>| {
                async move { reconciler.reconcile_ip_address(&ip_address).await }.boxed()
            },
            "IPAddress",
            self.trigger("IPAddress"),
            self.shutdown.clone(),
            self.settings.concurrency,
        )
        .await
    }
}
