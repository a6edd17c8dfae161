//! Connection test and preference editing

use crate::client::ApiClient;
use crate::models::{MonitorConfig, PreferencesUpdate};
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{info, instrument, warn};

pub const DEFAULT_CHECK_INTERVAL_SECONDS: u64 = 300;
pub const DEFAULT_ALIVE_CHECK_HOUR: u8 = 10;

/// Free-text preference fields as a user would type them
#[derive(Clone, Debug, Default, PartialEq)]
pub struct PreferencesForm {
    /// Comma-separated court names, e.g. `"Court11, Court12"`
    pub courts: String,
    /// Comma-separated times, e.g. `"18:00, 19:00"`
    pub time_slots: String,
    pub check_interval: String,
    pub alive_check_hour: String,
}

impl PreferencesForm {
    /// Prefill the form from the server's current configuration
    pub fn from_config(config: &MonitorConfig) -> Self {
        Self {
            courts: config.preferred_courts.join(", "),
            time_slots: config.preferred_time_slots.join(", "),
            check_interval: config.check_interval_seconds.to_string(),
            alive_check_hour: config.alive_check_hour.to_string(),
        }
    }

    /// Build the update to send.
    ///
    /// Empty lists are left out so the server keeps its values. Unparsable
    /// numbers fall back to the defaults; parsable but out-of-range values
    /// are rejected.
    pub fn to_update(&self) -> Result<PreferencesUpdate, String> {
        let mut update = PreferencesUpdate::new();

        let courts = split_list(&self.courts);
        if !courts.is_empty() {
            update = update.with_courts(courts);
        }

        let time_slots = split_list(&self.time_slots);
        if !time_slots.is_empty() {
            update = update.with_time_slots(time_slots);
        }

        let interval = self
            .check_interval
            .trim()
            .parse::<u64>()
            .unwrap_or(DEFAULT_CHECK_INTERVAL_SECONDS);
        if interval == 0 {
            return Err("check interval must be greater than 0".to_string());
        }

        let hour = self
            .alive_check_hour
            .trim()
            .parse::<u8>()
            .unwrap_or(DEFAULT_ALIVE_CHECK_HOUR);
        if hour > 23 {
            return Err(format!("alive check hour must be between 0 and 23, got {}", hour));
        }

        Ok(update
            .with_check_interval(interval)
            .with_alive_check_hour(hour))
    }
}

/// Split a comma-separated list, trimming entries and dropping empty ones
pub fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(str::to_string)
        .collect()
}

/// State published by the settings controller
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SettingsState {
    pub config: Option<MonitorConfig>,
    pub in_flight: bool,
    pub connection_test_passed: bool,
    pub error_message: Option<String>,
    pub success_message: Option<String>,
}

pub struct SettingsController {
    client: Arc<ApiClient>,
    state: watch::Sender<SettingsState>,
}

impl SettingsController {
    pub fn new(client: Arc<ApiClient>) -> Self {
        let (state, _) = watch::channel(SettingsState::default());
        Self { client, state }
    }

    pub fn state(&self) -> SettingsState {
        self.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<SettingsState> {
        self.state.subscribe()
    }

    /// Configure the client and probe the server; loads the config on success
    #[instrument(skip(self, credential))]
    pub async fn test_connection(&self, endpoint: &str, credential: &str) -> bool {
        self.state.send_modify(|state| {
            state.in_flight = true;
            state.error_message = None;
            state.success_message = None;
        });

        self.client.configure(endpoint, credential);

        match self.client.health_check().await {
            Ok(health) => {
                info!("Connection test passed, server status {}", health.status);
                self.state.send_modify(|state| {
                    state.connection_test_passed = true;
                    state.success_message = Some("Connected successfully!".to_string());
                });
                self.load_config().await;
                true
            }
            Err(e) => {
                warn!("Connection test failed: {}", e);
                self.state.send_modify(|state| {
                    state.connection_test_passed = false;
                    state.in_flight = false;
                    state.error_message = Some(format!("Connection failed: {}", e));
                });
                false
            }
        }
    }

    pub async fn load_config(&self) -> Option<MonitorConfig> {
        self.state.send_modify(|state| state.in_flight = true);

        let result = self.client.get_config().await;
        self.state.send_modify(|state| {
            state.in_flight = false;
            match &result {
                Ok(config) => {
                    state.config = Some(config.clone());
                    state.error_message = None;
                }
                Err(e) => {
                    state.error_message = Some(format!("Failed to load configuration: {}", e));
                }
            }
        });

        result.ok()
    }

    #[instrument(skip(self))]
    pub async fn save_preferences(&self, form: &PreferencesForm) -> bool {
        self.state.send_modify(|state| {
            state.in_flight = true;
            state.error_message = None;
            state.success_message = None;
        });

        let result = match form.to_update() {
            Ok(update) => self
                .client
                .update_preferences(&update)
                .await
                .map_err(|e| e.to_string()),
            Err(reason) => Err(reason),
        };

        let saved = result.is_ok();
        self.state.send_modify(|state| {
            state.in_flight = false;
            match result {
                Ok(config) => {
                    state.config = Some(config);
                    state.success_message = Some("Settings saved successfully!".to_string());
                }
                Err(message) => {
                    state.error_message = Some(format!("Failed to save settings: {}", message));
                }
            }
        });

        saved
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::TransportOptions;
    use serde_json::json;
    use wiremock::matchers::{body_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn config_body() -> serde_json::Value {
        json!({
            "booking_system_url": "https://booking.example.com",
            "preferred_courts": ["Court11"],
            "preferred_time_slots": ["18:00"],
            "check_interval_seconds": 300,
            "auto_book_enabled": true,
            "alive_check_enabled": true,
            "alive_check_hour": 10
        })
    }

    fn controller() -> SettingsController {
        SettingsController::new(Arc::new(ApiClient::new(TransportOptions::default()).unwrap()))
    }

    #[test]
    fn test_form_trims_and_drops_empty_entries() {
        let form = PreferencesForm {
            courts: " Court11 , ,Court12,".to_string(),
            time_slots: "18:00,19:00 ".to_string(),
            check_interval: " 120 ".to_string(),
            alive_check_hour: "7".to_string(),
        };

        let update = form.to_update().unwrap();
        assert_eq!(
            update.preferred_courts,
            Some(vec!["Court11".to_string(), "Court12".to_string()])
        );
        assert_eq!(
            update.preferred_time_slots,
            Some(vec!["18:00".to_string(), "19:00".to_string()])
        );
        assert_eq!(update.check_interval_seconds, Some(120));
        assert_eq!(update.alive_check_hour, Some(7));
    }

    #[test]
    fn test_form_omits_empty_lists_and_defaults_numbers() {
        let form = PreferencesForm {
            courts: " , ".to_string(),
            check_interval: "soon".to_string(),
            ..PreferencesForm::default()
        };

        let update = form.to_update().unwrap();
        assert_eq!(update.preferred_courts, None);
        assert_eq!(update.preferred_time_slots, None);
        assert_eq!(update.check_interval_seconds, Some(DEFAULT_CHECK_INTERVAL_SECONDS));
        assert_eq!(update.alive_check_hour, Some(DEFAULT_ALIVE_CHECK_HOUR));
    }

    #[test]
    fn test_form_rejects_out_of_range_values() {
        let form = PreferencesForm {
            alive_check_hour: "24".to_string(),
            ..PreferencesForm::default()
        };
        assert!(form.to_update().is_err());

        let form = PreferencesForm {
            check_interval: "0".to_string(),
            ..PreferencesForm::default()
        };
        assert!(form.to_update().is_err());
    }

    #[test]
    fn test_form_prefills_from_config() {
        let config = MonitorConfig {
            booking_system_url: "https://booking.example.com".to_string(),
            preferred_courts: vec!["Court11".to_string(), "Court12".to_string()],
            preferred_time_slots: vec!["18:00".to_string()],
            check_interval_seconds: 60,
            auto_book_enabled: false,
            alive_check_enabled: true,
            alive_check_hour: 9,
        };

        let form = PreferencesForm::from_config(&config);
        assert_eq!(form.courts, "Court11, Court12");
        assert_eq!(form.time_slots, "18:00");
        assert_eq!(form.check_interval, "60");
        assert_eq!(form.alive_check_hour, "9");
    }

    #[tokio::test]
    async fn test_connection_success_loads_config() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/health"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "status": "healthy",
                "timestamp": "2024-01-15T10:00:00Z",
                "monitor_running": false
            })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/api/config"))
            .respond_with(ResponseTemplate::new(200).set_body_json(config_body()))
            .expect(1)
            .mount(&server)
            .await;

        let controller = controller();
        assert!(controller.test_connection(&server.uri(), "test-token").await);

        let state = controller.state();
        assert!(state.connection_test_passed);
        assert!(!state.in_flight);
        assert_eq!(state.success_message.as_deref(), Some("Connected successfully!"));
        assert_eq!(state.config.unwrap().check_interval_seconds, 300);
    }

    #[tokio::test]
    async fn test_connection_with_malformed_endpoint_fails() {
        let controller = controller();
        assert!(!controller.test_connection("not a url", "secret").await);

        let state = controller.state();
        assert!(!state.connection_test_passed);
        assert_eq!(state.error_message.as_deref(), Some("Connection failed: Invalid URL"));
    }

    #[tokio::test]
    async fn test_save_preferences_sends_form_values() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/config/preferences"))
            .and(body_json(json!({
                "preferred_courts": ["Court11"],
                "check_interval_seconds": 300,
                "alive_check_hour": 10
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(config_body()))
            .expect(1)
            .mount(&server)
            .await;

        let controller = controller();
        controller.client.configure(&server.uri(), "test-token");

        let form = PreferencesForm {
            courts: "Court11".to_string(),
            check_interval: "300".to_string(),
            alive_check_hour: "10".to_string(),
            ..PreferencesForm::default()
        };
        assert!(controller.save_preferences(&form).await);

        let state = controller.state();
        assert_eq!(state.success_message.as_deref(), Some("Settings saved successfully!"));
        assert!(state.config.is_some());
    }

    #[tokio::test]
    async fn test_save_preferences_reports_server_failure() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/config/preferences"))
            .respond_with(ResponseTemplate::new(422))
            .mount(&server)
            .await;

        let controller = controller();
        controller.client.configure(&server.uri(), "test-token");

        assert!(!controller.save_preferences(&PreferencesForm::default()).await);
        assert_eq!(
            controller.state().error_message.as_deref(),
            Some("Failed to save settings: Server error: HTTP 422")
        );
    }
}
