//! Cooperative shutdown signalling.
//!
//! One [`ShutdownController`] is owned by the coordinator; every task holds
//! a [`ShutdownSignal`] and races it against each of its suspension points.
//! A task observing the signal finishes its current pin write, releases the
//! actuator lock by leaving scope, and returns.

use std::time::Duration;
use tokio::sync::watch;

/// Sending side of the shutdown signal.
#[derive(Debug, Clone)]
pub struct ShutdownController {
    tx: std::sync::Arc<watch::Sender<bool>>,
}

/// Receiving side of the shutdown signal.
#[derive(Debug, Clone)]
pub struct ShutdownSignal {
    rx: watch::Receiver<bool>,
}

impl ShutdownController {
    /// Create a controller and its first signal.
    pub fn new() -> (Self, ShutdownSignal) {
        let (tx, rx) = watch::channel(false);
        (
            Self {
                tx: std::sync::Arc::new(tx),
            },
            ShutdownSignal { rx },
        )
    }

    /// Request shutdown. Idempotent.
    pub fn request_shutdown(&self) {
        // Receivers may already be gone during teardown.
        let _ = self.tx.send(true);
    }

    /// Create another signal handle.
    pub fn signal(&self) -> ShutdownSignal {
        ShutdownSignal {
            rx: self.tx.subscribe(),
        }
    }
}

impl ShutdownSignal {
    /// Whether shutdown has been requested.
    pub fn is_shutdown(&self) -> bool {
        *self.rx.borrow()
    }

    /// Wait until shutdown is requested.
    ///
    /// Also resolves if the controller is dropped, which only happens while
    /// the process is tearing down anyway.
    pub async fn requested(&mut self) {
        let _ = self.rx.wait_for(|stop| *stop).await;
    }

    /// Sleep for `duration`, or return early on shutdown.
    ///
    /// Returns `true` if shutdown was requested before the sleep finished.
    pub async fn sleep(&mut self, duration: Duration) -> bool {
        tokio::select! {
            _ = tokio::time::sleep(duration) => false,
            _ = self.requested() => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn starts_clear() {
        let (_controller, signal) = ShutdownController::new();
        assert!(!signal.is_shutdown());
    }

    #[tokio::test]
    async fn request_is_observed() {
        let (controller, mut signal) = ShutdownController::new();
        controller.request_shutdown();
        assert!(signal.is_shutdown());
        signal.requested().await;
    }

    #[tokio::test(start_paused = true)]
    async fn sleep_completes_without_shutdown() {
        let (_controller, mut signal) = ShutdownController::new();
        assert!(!signal.sleep(Duration::from_secs(5)).await);
    }

    #[tokio::test(start_paused = true)]
    async fn sleep_aborts_on_shutdown() {
        let (controller, mut signal) = ShutdownController::new();
        let waiter = tokio::spawn(async move { signal.sleep(Duration::from_secs(3600)).await });
        tokio::time::sleep(Duration::from_millis(1)).await;
        controller.request_shutdown();
        assert!(waiter.await.unwrap());
    }

    #[tokio::test]
    async fn dropped_controller_counts_as_shutdown() {
        let (controller, mut signal) = ShutdownController::new();
        drop(controller);
        signal.requested().await;
    }
}
