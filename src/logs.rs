//! Log tail controller with an adjustable line count

use crate::client::ApiClient;
use crate::errors::Result;
use crate::models::LogLineCount;
use crate::refresh::{RefreshController, RefreshSource, RefreshState};
use async_trait::async_trait;
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;
use tokio::sync::watch;

pub const LOGS_REFRESH_INTERVAL: Duration = Duration::from_secs(5);

pub struct LogsSource {
    client: Arc<ApiClient>,
    line_count: Arc<AtomicU32>,
}

#[async_trait]
impl RefreshSource for LogsSource {
    type Output = Vec<String>;

    fn name(&self) -> &'static str {
        "logs"
    }

    async fn fetch(&self) -> Result<Vec<String>> {
        let lines = self.line_count.load(Ordering::SeqCst);
        self.client.get_logs(lines).await
    }
}

pub struct LogsController {
    refresh: RefreshController<LogsSource>,
    line_count: Arc<AtomicU32>,
    interval: Duration,
}

impl LogsController {
    pub fn new(client: Arc<ApiClient>) -> Self {
        Self::with_interval(client, LOGS_REFRESH_INTERVAL)
    }

    pub fn with_interval(client: Arc<ApiClient>, interval: Duration) -> Self {
        let line_count = Arc::new(AtomicU32::new(LogLineCount::default().as_u32()));
        let source = LogsSource {
            client,
            line_count: Arc::clone(&line_count),
        };

        Self {
            refresh: RefreshController::new(source),
            line_count,
            interval,
        }
    }

    pub fn state(&self) -> RefreshState<Vec<String>> {
        self.refresh.state()
    }

    pub fn subscribe(&self) -> watch::Receiver<RefreshState<Vec<String>>> {
        self.refresh.subscribe()
    }

    pub fn line_count(&self) -> LogLineCount {
        LogLineCount::try_from(self.line_count.load(Ordering::SeqCst)).unwrap_or_default()
    }

    /// Takes effect on the next scheduled or manual refresh
    pub fn set_line_count(&self, count: LogLineCount) {
        self.line_count.store(count.as_u32(), Ordering::SeqCst);
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
}
