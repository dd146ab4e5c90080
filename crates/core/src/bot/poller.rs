use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{broadcast, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::config::TelegramConfig;
use crate::metrics;
use crate::telegram::{BotApi, GetUpdates};

use super::BotDispatcher;

/// Long-poll settings.
#[derive(Debug, Clone)]
pub struct PollerConfig {
    /// `timeout` passed to getUpdates, in seconds.
    pub poll_timeout_secs: u32,
    /// Pause after a failed getUpdates call.
    pub retry_delay: Duration,
}

impl From<&TelegramConfig> for PollerConfig {
    fn from(config: &TelegramConfig) -> Self {
        Self {
            poll_timeout_secs: config.poll_timeout_secs,
            retry_delay: Duration::from_millis(config.retry_delay_ms),
        }
    }
}

/// Fetches updates from the Bot API and feeds them to the dispatcher, one at
/// a time and in update order.
pub struct BotPoller {
    api: Arc<dyn BotApi>,
    dispatcher: Arc<BotDispatcher>,
    config: PollerConfig,
    running: Arc<AtomicBool>,
    shutdown_tx: broadcast::Sender<()>,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl BotPoller {
    pub fn new(api: Arc<dyn BotApi>, dispatcher: Arc<BotDispatcher>, config: PollerConfig) -> Self {
        let (shutdown_tx, _) = broadcast::channel(1);
        Self {
            api,
            dispatcher,
            config,
            running: Arc::new(AtomicBool::new(false)),
            shutdown_tx,
            task: Mutex::new(None),
        }
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Spawn the polling loop.
    pub async fn start(&self) {
        if self.running.swap(true, Ordering::SeqCst) {
            warn!("Bot poller already running");
            return;
        }

        let api = Arc::clone(&self.api);
        let dispatcher = Arc::clone(&self.dispatcher);
        let config = self.config.clone();
        let running = Arc::clone(&self.running);
        let shutdown_rx = self.shutdown_tx.subscribe();

        let handle = tokio::spawn(async move {
            poll_loop(api, dispatcher, config, shutdown_rx).await;
            running.store(false, Ordering::SeqCst);
        });
        *self.task.lock().await = Some(handle);

        info!("Bot poller started");
    }

    /// Signal the loop to stop and wait for it. An update being dispatched is
    /// finished first.
    pub async fn stop(&self) {
        if !self.running.load(Ordering::SeqCst) {
            debug!("Bot poller not running");
        }

        let _ = self.shutdown_tx.send(());
        if let Some(handle) = self.task.lock().await.take() {
            if let Err(e) = handle.await {
                warn!("Bot poller task ended abnormally: {}", e);
            }
        }
        self.running.store(false, Ordering::SeqCst);

        info!("Bot poller stopped");
    }
}

async fn poll_loop(
    api: Arc<dyn BotApi>,
    dispatcher: Arc<BotDispatcher>,
    config: PollerConfig,
    mut shutdown_rx: broadcast::Receiver<()>,
) {
    let mut offset: Option<i64> = None;

    loop {
        let expired = dispatcher.desk().expire_pending().await;
        if expired > 0 {
            info!(count = expired, "Closed expired pending tickets");
        }

        let request = GetUpdates {
            offset,
            timeout: config.poll_timeout_secs,
            allowed_updates: vec!["message".to_string(), "callback_query".to_string()],
        };

        let result = tokio::select! {
            _ = shutdown_rx.recv() => break,
            result = api.get_updates(&request) => result,
        };

        match result {
            Ok(updates) => {
                if !updates.is_empty() {
                    debug!(count = updates.len(), "Received bot updates");
                }
                for update in updates {
                    // Acknowledge before handling so a failing update is not redelivered.
                    offset = Some(update.update_id + 1);
                    dispatcher.dispatch(update).await;
                }
            }
            Err(e) => {
                metrics::BOT_POLL_ERRORS.inc();
                warn!(error = %e, "Failed to fetch bot updates");
                tokio::select! {
                    _ = shutdown_rx.recv() => break,
                    _ = tokio::time::sleep(config.retry_delay) => {}
                }
            }
        }
    }

    info!("Bot polling loop stopped");
}
