//! Authenticated client for the monitor HTTP API

use crate::errors::{ApiError, Result};
use crate::models::{
    CommandAck, ConfigResponse, HealthSnapshot, LogSnapshot, LogsResponse, MonitorConfig,
    MonitorStatus, PreferencesUpdate, StatusResponse,
};
use crate::transport::{ApiRequest, HttpTransport, TransportConfig, TransportOptions};
use reqwest::Method;
use serde::de::DeserializeOwned;
use std::sync::{PoisonError, RwLock};
use tracing::{debug, info, warn};

/// Line count used when the caller does not pick one
pub const DEFAULT_LOG_LINES: u32 = 50;

const HEALTH_PATH: &str = "health";
const STATUS_PATH: &str = "api/status";
const START_PATH: &str = "api/monitor/start";
const STOP_PATH: &str = "api/monitor/stop";
const CONFIG_PATH: &str = "api/config";
const PREFERENCES_PATH: &str = "api/config/preferences";
const LOGS_PATH: &str = "api/monitor/logs";

/// Client for a single monitor server.
///
/// Share one instance (behind an `Arc`) between whatever owns the refresh
/// controllers. Every call is a single request/response with no retries.
#[derive(Debug)]
pub struct ApiClient {
    transport: HttpTransport,
    config: RwLock<TransportConfig>,
}

impl ApiClient {
    /// Create an unconfigured client
    pub fn new(options: TransportOptions) -> Result<Self> {
        Ok(Self {
            transport: HttpTransport::new(&options)?,
            config: RwLock::new(TransportConfig::default()),
        })
    }

    /// Replace endpoint and credential together.
    ///
    /// A malformed endpoint leaves the current configuration untouched and is
    /// not reported to the caller.
    pub fn configure(&self, endpoint: &str, credential: &str) {
        match TransportConfig::parse(endpoint, credential) {
            Some(config) => {
                info!("Configured monitor endpoint {}", endpoint);
                *self.config.write().unwrap_or_else(PoisonError::into_inner) = config;
            }
            None => {
                warn!("Ignoring malformed endpoint {:?}", endpoint);
            }
        }
    }

    pub fn is_configured(&self) -> bool {
        self.transport_config().is_configured()
    }

    /// Snapshot of the current endpoint and credential
    pub fn transport_config(&self) -> TransportConfig {
        self.config
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Unauthenticated liveness probe
    pub async fn health_check(&self) -> Result<HealthSnapshot> {
        let url = self.transport_config().resolve(HEALTH_PATH)?;
        self.send(ApiRequest::new(Method::GET, url)).await
    }

    pub async fn get_status(&self) -> Result<MonitorStatus> {
        let request = self.authenticated(Method::GET, STATUS_PATH)?;
        let response: StatusResponse = self.send(request).await?;
        Ok(MonitorStatus::from(response))
    }

    pub async fn start_monitor(&self) -> Result<()> {
        let request = self.authenticated(Method::POST, START_PATH)?;
        let ack: CommandAck = self.send(request).await?;
        debug!("Start acknowledged: {}", ack.status);
        Ok(())
    }

    pub async fn stop_monitor(&self) -> Result<()> {
        let request = self.authenticated(Method::POST, STOP_PATH)?;
        let ack: CommandAck = self.send(request).await?;
        debug!("Stop acknowledged: {}", ack.status);
        Ok(())
    }

    pub async fn get_config(&self) -> Result<MonitorConfig> {
        let request = self.authenticated(Method::GET, CONFIG_PATH)?;
        let response: ConfigResponse = self.send(request).await?;
        Ok(MonitorConfig::from(response))
    }

    /// Send a partial preferences update. Fields left as `None` are not sent.
    pub async fn update_preferences(&self, update: &PreferencesUpdate) -> Result<MonitorConfig> {
        let body = serde_json::to_vec(update).map_err(|_| ApiError::Unknown)?;
        let request = self
            .authenticated(Method::POST, PREFERENCES_PATH)?
            .with_json_body(body);
        let response: ConfigResponse = self.send(request).await?;
        Ok(MonitorConfig::from(response))
    }

    /// Fetch the last `lines` lines of the monitor log
    pub async fn get_logs(&self, lines: u32) -> Result<Vec<String>> {
        Ok(self.get_log_snapshot(lines).await?.lines)
    }

    /// Same request as [`ApiClient::get_logs`], keeping the server's totals
    pub async fn get_log_snapshot(&self, lines: u32) -> Result<LogSnapshot> {
        let mut request = self.authenticated(Method::GET, LOGS_PATH)?;
        request
            .url
            .query_pairs_mut()
            .append_pair("lines", &lines.to_string());
        let response: LogsResponse = self.send(request).await?;
        Ok(LogSnapshot::from(response))
    }

    fn authenticated(&self, method: Method, path: &str) -> Result<ApiRequest> {
        let config = self.transport_config();
        let url = config.resolve(path)?;
        Ok(ApiRequest::new(method, url).with_credential(config.credential()))
    }

    async fn send<T: DeserializeOwned>(&self, request: ApiRequest) -> Result<T> {
        let body = self.transport.execute(request).await?;
        let decoded = serde_json::from_slice(&body).map_err(|err| {
            debug!("Response body did not match schema: {}", err);
            ApiError::from(err)
        })?;
        Ok(decoded)
    }
}
