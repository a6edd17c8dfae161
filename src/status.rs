//! Monitor status controller: status polling plus start/stop commands

use crate::client::ApiClient;
use crate::errors::Result;
use crate::models::MonitorStatus;
use crate::refresh::{RefreshController, RefreshSource, RefreshState};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing::instrument;

pub const STATUS_REFRESH_INTERVAL: Duration = Duration::from_secs(10);

pub struct StatusSource {
    client: Arc<ApiClient>,
}

#[async_trait]
impl RefreshSource for StatusSource {
    type Output = MonitorStatus;

    fn name(&self) -> &'static str {
        "status"
    }

    async fn fetch(&self) -> Result<MonitorStatus> {
        self.client.get_status().await
    }
}

pub struct StatusController {
    client: Arc<ApiClient>,
    refresh: RefreshController<StatusSource>,
    interval: Duration,
}

impl StatusController {
    pub fn new(client: Arc<ApiClient>) -> Self {
        Self::with_interval(client, STATUS_REFRESH_INTERVAL)
    }

    pub fn with_interval(client: Arc<ApiClient>, interval: Duration) -> Self {
        let source = StatusSource {
            client: Arc::clone(&client),
        };

        Self {
            client,
            refresh: RefreshController::new(source),
            interval,
        }
    }

    pub fn state(&self) -> RefreshState<MonitorStatus> {
        self.refresh.state()
    }

    pub fn subscribe(&self) -> watch::Receiver<RefreshState<MonitorStatus>> {
        self.refresh.subscribe()
    }

    /// Fetch immediately, then keep polling
    pub async fn load_initial(&mut self) {
        self.refresh.refresh_once().await;
        self.start_auto_refresh();
    }

    pub async fn refresh(&self) -> bool {
        self.refresh.refresh_once().await
    }

    pub fn start_auto_refresh(&mut self) {
        self.refresh.start_auto_refresh(self.interval);
    }

    pub fn stop(&mut self) {
        self.refresh.stop();
    }

    pub fn is_auto_refreshing(&self) -> bool {
        self.refresh.is_auto_refreshing()
    }

    /// Start the remote monitor, then refresh the status
    #[instrument(skip(self))]
    pub async fn start_monitor(&self) -> bool {
        let result = self.refresh.while_busy(self.client.start_monitor()).await;
        self.after_command(result, "start").await
    }

    /// Stop the remote monitor, then refresh the status
    #[instrument(skip(self))]
    pub async fn stop_monitor(&self) -> bool {
        let result = self.refresh.while_busy(self.client.stop_monitor()).await;
        self.after_command(result, "stop").await
    }

    async fn after_command(&self, result: Result<()>, action: &str) -> bool {
        match result {
            Ok(()) => self.refresh.refresh_once().await,
            Err(e) => {
                self.refresh
                    .record_error(format!("Failed to {} monitor: {}", action, e));
                false
            }
        }
    }
}
