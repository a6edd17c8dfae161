//! Court Monitor Client Library
//!
//! This library provides an authenticated client for the court monitor HTTP
//! API together with cancellable polling controllers that keep a local view of
//! the server's status, logs and settings up to date.

pub mod client;
pub mod config;
pub mod errors;
pub mod logs;
pub mod models;
pub mod refresh;
pub mod settings;
pub mod status;
pub mod transport;

pub use client::ApiClient;
pub use config::Config;
pub use errors::{ApiError, Result};
pub use logs::LogsController;
pub use models::{HealthSnapshot, LogLineCount, LogSnapshot, MonitorConfig, MonitorStatus, PreferencesUpdate};
pub use refresh::{RefreshController, RefreshSource, RefreshState};
pub use settings::{PreferencesForm, SettingsController};
pub use status::StatusController;
