//! Shutdown coordination for the gateway.
//!
//! # Design Decisions
//! - One broadcast channel; every long-running task holds a receiver
//! - Ordered teardown: stop accepting, then await the health monitor

use tokio::sync::broadcast;
use tokio::task::JoinHandle;

/// Coordinator for graceful shutdown. Cloning shares the same channel.
#[derive(Clone)]
pub struct Shutdown {
    tx: broadcast::Sender<()>,
}

impl Shutdown {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(1);
        Self { tx }
    }

    /// Subscribe to the shutdown signal.
    pub fn subscribe(&self) -> broadcast::Receiver<()> {
        self.tx.subscribe()
    }

    /// Trigger the shutdown signal.
    pub fn trigger(&self) {
        let _ = self.tx.send(());
    }

    /// Trigger shutdown when the process receives Ctrl+C.
    pub fn trigger_on_ctrl_c(&self) -> JoinHandle<()> {
        let tx = self.tx.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::info!("shutdown signal received");
                let _ = tx.send(());
            }
        })
    }
}

impl Default for Shutdown {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_all_subscribers_observe_trigger() {
        let shutdown = Shutdown::new();
        let mut rx1 = shutdown.subscribe();
        let mut rx2 = shutdown.clone().subscribe();

        shutdown.trigger();

        assert!(rx1.recv().await.is_ok());
        assert!(rx2.recv().await.is_ok());
    }
}
