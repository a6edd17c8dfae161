//! Runtime configuration for the command-line client

use crate::logs::LOGS_REFRESH_INTERVAL;
use crate::models::LogLineCount;
use crate::status::STATUS_REFRESH_INTERVAL;
use crate::transport::{TransportOptions, parse_endpoint};
use std::env;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct Config {
    /// Base URL of the monitor server
    pub endpoint: Option<String>,

    /// Shared secret sent as `X-Token`
    pub credential: String,

    /// Optional request timeout; none by default
    pub http_timeout: Option<Duration>,

    /// Status polling interval
    pub status_interval: Duration,

    /// Log polling interval
    pub logs_interval: Duration,

    /// Number of log lines fetched per refresh
    pub log_lines: LogLineCount,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            endpoint: None,
            credential: String::new(),
            http_timeout: None,
            status_interval: STATUS_REFRESH_INTERVAL,
            logs_interval: LOGS_REFRESH_INTERVAL,
            log_lines: LogLineCount::default(),
        }
    }
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Config::default();

        if let Some(endpoint) = lookup("MONITOR_ENDPOINT") {
            if !endpoint.trim().is_empty() {
                config.endpoint = Some(endpoint);
            }
        }

        if let Some(credential) = lookup("MONITOR_TOKEN") {
            config.credential = credential;
        }

        if let Some(timeout) = lookup("HTTP_TIMEOUT_SECONDS") {
            if let Ok(seconds) = timeout.parse::<u64>() {
                config.http_timeout = Some(Duration::from_secs(seconds));
            }
        }

        if let Some(interval) = lookup("STATUS_REFRESH_SECONDS") {
            if let Ok(seconds) = interval.parse::<u64>() {
                config.status_interval = Duration::from_secs(seconds);
            }
        }

        if let Some(interval) = lookup("LOGS_REFRESH_SECONDS") {
            if let Ok(seconds) = interval.parse::<u64>() {
                config.logs_interval = Duration::from_secs(seconds);
            }
        }

        if let Some(lines) = lookup("LOG_LINES") {
            if let Ok(count) = lines.parse() {
                config.log_lines = count;
            }
        }

        config
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), String> {
        match &self.endpoint {
            None => return Err("endpoint must be set (--endpoint or MONITOR_ENDPOINT)".to_string()),
            Some(endpoint) if parse_endpoint(endpoint).is_none() => {
                return Err(format!("endpoint is not an absolute http(s) URL: {}", endpoint));
            }
            Some(_) => {}
        }

        if self.credential.is_empty() {
            return Err("token must be set (--token or MONITOR_TOKEN)".to_string());
        }

        if self.http_timeout == Some(Duration::ZERO) {
            return Err("http timeout must be greater than 0".to_string());
        }

        if self.status_interval.is_zero() {
            return Err("status refresh interval must be greater than 0".to_string());
        }

        if self.logs_interval.is_zero() {
            return Err("logs refresh interval must be greater than 0".to_string());
        }

        Ok(())
    }

    pub fn transport_options(&self) -> TransportOptions {
        TransportOptions {
            request_timeout: self.http_timeout,
            ..TransportOptions::default()
        }
    }
}
