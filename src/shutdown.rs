//! Process shutdown signalling
//!
//! A [`ShutdownTrigger`] fires once; every cloned [`Shutdown`] handle observes
//! it, including handles that start waiting after it fired.

use tokio::signal;
use tokio::sync::watch;
use tracing::info;

/// Firing side of the shutdown channel
#[derive(Debug)]
pub struct ShutdownTrigger {
    tx: watch::Sender<bool>,
}

impl ShutdownTrigger {
    /// Request shutdown. Idempotent.
    pub fn trigger(&self) {
        self.tx.send_replace(true);
    }
}

/// Observing side of the shutdown channel
#[derive(Debug, Clone)]
pub struct Shutdown {
    rx: watch::Receiver<bool>,
}

impl Shutdown {
    /// Create a connected trigger/handle pair
    pub fn channel() -> (ShutdownTrigger, Shutdown) {
        let (tx, rx) = watch::channel(false);
        (ShutdownTrigger { tx }, Shutdown { rx })
    }

    /// A handle that never fires
    pub fn never() -> Shutdown {
        let (trigger, shutdown) = Self::channel();
        // Dropping the sender leaves the value at `false` forever
        drop(trigger);
        shutdown
    }

    /// Whether shutdown has been requested
    pub fn is_cancelled(&self) -> bool {
        *self.rx.borrow()
    }

    /// Resolve once shutdown has been requested
    ///
    /// Pends forever if the trigger is dropped without firing.
    pub async fn cancelled(&self) {
        let mut rx = self.rx.clone();
        let closed = rx.wait_for(|fired| *fired).await.is_err();
        if closed {
            std::future::pending::<()>().await;
        }
    }
}

/// Fire `trigger` on Ctrl+C or SIGTERM
pub async fn listen_for_signals(trigger: ShutdownTrigger) {
    tokio::select! {
        _ = signal::ctrl_c() => {
            info!("Received Ctrl+C, shutting down");
        }
        _ = wait_for_sigterm() => {
            info!("Received SIGTERM, shutting down");
        }
    }
    trigger.trigger();
}

#[cfg(unix)]
async fn wait_for_sigterm() {
    use tokio::signal::unix::{signal, SignalKind};
    match signal(SignalKind::terminate()) {
        Ok(mut sigterm) => {
            sigterm.recv().await;
        }
        Err(e) => {
            tracing::warn!("Failed to register SIGTERM handler: {}. Falling back to pending future.", e);
            std::future::pending::<()>().await;
        }
    }
}

#[cfg(not(unix))]
async fn wait_for_sigterm() {
    std::future::pending::<()>().await
}
