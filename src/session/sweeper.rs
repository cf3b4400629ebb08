//! Periodic removal of idle sessions.

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::time;

use crate::session::store::SessionStore;

pub struct SessionSweeper {
    store: Arc<SessionStore>,
    interval: Duration,
}

impl SessionSweeper {
    pub fn new(store: Arc<SessionStore>, interval: Duration) -> Self {
        Self { store, interval }
    }

    pub async fn run(self, mut shutdown: broadcast::Receiver<()>) {
        if self.store.policy().idle_ttl.is_none() {
            tracing::info!("Session expiry disabled, sweeper not started");
            return;
        }

        tracing::info!(interval = ?self.interval, "Session sweeper starting");

        let mut ticker = time::interval(self.interval);
        // The first tick completes immediately.
        ticker.tick().await;

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let removed = self.store.sweep();
                    if removed > 0 {
                        tracing::info!(removed, remaining = self.store.len(), "Expired sessions swept");
                    }
                }
                _ = shutdown.recv() => {
                    tracing::info!("Session sweeper stopping");
                    break;
                }
            }
        }
    }
}
