//! Periodic reconcile trigger
//!
//! A timer task pushes a token into a bounded channel once at startup and
//! then every interval. Controllers consume the channel as a stream and
//! reconcile all of their objects per token. A token still pending when the
//! next tick fires is not duplicated. The channel closes on shutdown.

use std::time::Duration;

use futures::future::{BoxFuture, Shared};
use futures::FutureExt;
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_stream::wrappers::ReceiverStream;
use tracing::debug;

/// Resolves once shutdown was requested; clones resolve together
pub type Shutdown = Shared<BoxFuture<'static, ()>>;

/// Shutdown future for a `true` on `stop`, or for its sender going away
pub fn shutdown_signal(mut stop: watch::Receiver<bool>) -> Shutdown {
    async move {
        let _ = stop.wait_for(|stop| *stop).await;
    }
    .boxed()
    .shared()
}

/// Spawn a trigger firing every `interval` until `shutdown` resolves
pub fn periodic_trigger(
    name: &'static str,
    interval: Duration,
    shutdown: Shutdown,
) -> (JoinHandle<()>, ReceiverStream<()>) {
    let (tx, rx) = mpsc::channel(1);

    let handle = tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut shutdown = shutdown;

        loop {
            tokio::select! {
                biased;
                () = &mut shutdown => {
                    debug!("Periodic trigger for {} stopped", name);
                    break;
                }
                _ = ticker.tick() => match tx.try_send(()) {
                    Ok(()) => debug!("Periodic trigger for {} fired", name),
                    Err(TrySendError::Full(())) => debug!("Periodic trigger for {} still pending", name),
                    Err(TrySendError::Closed(())) => break,
                },
            }
        }
    });

    (handle, ReceiverStream::new(rx))
}
