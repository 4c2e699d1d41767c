use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use super::client::ApiClient;

/// Connectivity polling cadence and retry policy
#[derive(Debug, Clone)]
pub struct StatusConfig {
    /// How often to probe the API
    pub check_interval: Duration,
    /// Base delay between retries; attempt N waits N times this
    pub retry_delay: Duration,
    /// Retries after the first failed probe before reporting disconnected
    pub max_retries: u32,
}

impl Default for StatusConfig {
    fn default() -> Self {
        Self {
            check_interval: Duration::from_secs(30),
            retry_delay: Duration::from_secs(2),
            max_retries: 3,
        }
    }
}

/// Last known reachability of the platform API
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionStatus {
    /// No probe has completed yet
    Unknown,
    Connected,
    Disconnected,
}

/// Background connectivity monitor.
///
/// Probes the API on a fixed interval, retrying with a growing backoff
/// before declaring the connection lost. Consumers watch the status channel
/// instead of probing themselves.
pub struct ConnectionMonitor {
    status_rx: watch::Receiver<ConnectionStatus>,
    shutdown_tx: mpsc::Sender<()>,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl ConnectionMonitor {
    /// Spawn the monitor task. The first probe runs immediately.
    pub fn start(client: Arc<ApiClient>, config: StatusConfig) -> Self {
        let (status_tx, status_rx) = watch::channel(ConnectionStatus::Unknown);
        let (shutdown_tx, mut shutdown_rx) = mpsc::channel::<()>(1);

        let task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(config.check_interval);
            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        let status = probe_with_retry(&client, &config).await;
                        if *status_tx.borrow() != status {
                            info!("API connection status changed: {:?}", status);
                        }
                        let _ = status_tx.send(status);
                    }
                    _ = shutdown_rx.recv() => {
                        debug!("Connection monitor shutting down");
                        break;
                    }
                }
            }
        });

        Self {
            status_rx,
            shutdown_tx,
            task: Mutex::new(Some(task)),
        }
    }

    /// Last reported status.
    pub fn status(&self) -> ConnectionStatus {
        *self.status_rx.borrow()
    }

    /// Watch receiver for status changes.
    pub fn subscribe(&self) -> watch::Receiver<ConnectionStatus> {
        self.status_rx.clone()
    }

    /// Stop the monitor task and wait for it to exit.
    pub async fn stop(&self) {
        let _ = self.shutdown_tx.send(()).await;
        let task = { self.task.lock().unwrap().take() };
        if let Some(task) = task {
            if let Err(e) = task.await {
                error!("Connection monitor task failed: {}", e);
            }
        }
    }
}

async fn probe_with_retry(client: &ApiClient, config: &StatusConfig) -> ConnectionStatus {
    for attempt in 0..=config.max_retries {
        if attempt > 0 {
            let delay = config.retry_delay * attempt;
            debug!("Connectivity retry {} in {:?}", attempt, delay);
            tokio::time::sleep(delay).await;
        }
        if client.check_reachable().await {
            return ConnectionStatus::Connected;
        }
    }
    warn!(
        "API unreachable after {} retries",
        config.max_retries
    );
    ConnectionStatus::Disconnected
}
