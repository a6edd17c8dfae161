//! Wire schemas for the monitor API and their in-memory representations

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use tracing::warn;

// Wire records. Field names follow the server's snake_case JSON.

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct StatusResponse {
    pub is_running: bool,
    pub checks_performed_today: u64,
    pub slots_found_today: u64,
    pub last_update: String,
    pub next_check_in_seconds: u64,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct ConfigResponse {
    pub booking_system_url: String,
    pub preferred_courts: Vec<String>,
    pub preferred_time_slots: Vec<String>,
    pub check_interval_seconds: u64,
    pub auto_book_enabled: bool,
    pub alive_check_enabled: bool,
    pub alive_check_hour: u8,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct LogsResponse {
    pub logs: Vec<String>,
    pub total_lines: u64,
    pub returned_lines: u64,
    #[serde(default)]
    pub error: Option<String>,
}

/// Acknowledgement returned by start/stop commands
#[derive(Clone, Debug, Deserialize)]
pub(crate) struct CommandAck {
    pub status: String,
}

/// Unauthenticated health probe result
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct HealthSnapshot {
    pub status: String,
    pub timestamp: String,
    pub monitor_running: bool,
}

/// Partial preferences update. Unset fields are left out of the request body
/// so the server keeps their current values.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
pub struct PreferencesUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub preferred_courts: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub preferred_time_slots: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub check_interval_seconds: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alive_check_hour: Option<u8>,
}

impl PreferencesUpdate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_courts(mut self, courts: Vec<String>) -> Self {
        self.preferred_courts = Some(courts);
        self
    }

    pub fn with_time_slots(mut self, time_slots: Vec<String>) -> Self {
        self.preferred_time_slots = Some(time_slots);
        self
    }

    pub fn with_check_interval(mut self, seconds: u64) -> Self {
        self.check_interval_seconds = Some(seconds);
        self
    }

    pub fn with_alive_check_hour(mut self, hour: u8) -> Self {
        self.alive_check_hour = Some(hour);
        self
    }

    /// True when no field would be sent
    pub fn is_empty(&self) -> bool {
        self.preferred_courts.is_none()
            && self.preferred_time_slots.is_none()
            && self.check_interval_seconds.is_none()
            && self.alive_check_hour.is_none()
    }
}

// In-memory models handed to callers.

#[derive(Clone, Debug, Serialize, PartialEq)]
pub struct MonitorStatus {
    pub running: bool,
    pub checks_today: u64,
    pub slots_found_today: u64,
    pub last_update: DateTime<Utc>,
    pub next_check_in_seconds: u64,
}

impl From<StatusResponse> for MonitorStatus {
    fn from(response: StatusResponse) -> Self {
        let last_update = parse_timestamp(&response.last_update).unwrap_or_else(|| {
            warn!(
                "Unparsable last_update timestamp {:?}, substituting current time",
                response.last_update
            );
            Utc::now()
        });

        Self {
            running: response.is_running,
            checks_today: response.checks_performed_today,
            slots_found_today: response.slots_found_today,
            last_update,
            next_check_in_seconds: response.next_check_in_seconds,
        }
    }
}

#[derive(Clone, Debug, Serialize, PartialEq)]
pub struct MonitorConfig {
    pub booking_system_url: String,
    pub preferred_courts: Vec<String>,
    pub preferred_time_slots: Vec<String>,
    pub check_interval_seconds: u64,
    pub auto_book_enabled: bool,
    pub alive_check_enabled: bool,
    pub alive_check_hour: u8,
}

impl From<ConfigResponse> for MonitorConfig {
    fn from(response: ConfigResponse) -> Self {
        Self {
            booking_system_url: response.booking_system_url,
            preferred_courts: response.preferred_courts,
            preferred_time_slots: response.preferred_time_slots,
            check_interval_seconds: response.check_interval_seconds,
            auto_book_enabled: response.auto_book_enabled,
            alive_check_enabled: response.alive_check_enabled,
            alive_check_hour: response.alive_check_hour,
        }
    }
}

#[derive(Clone, Debug, Serialize, PartialEq)]
pub struct LogSnapshot {
    pub lines: Vec<String>,
    pub total_lines: u64,
    pub returned_lines: u64,
    pub error: Option<String>,
}

impl From<LogsResponse> for LogSnapshot {
    fn from(response: LogsResponse) -> Self {
        Self {
            lines: response.logs,
            total_lines: response.total_lines,
            returned_lines: response.returned_lines,
            error: response.error,
        }
    }
}

/// Number of log lines requested per fetch
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum LogLineCount {
    Twenty,
    #[default]
    Fifty,
    Hundred,
}

impl LogLineCount {
    pub fn as_u32(self) -> u32 {
        match self {
            LogLineCount::Twenty => 20,
            LogLineCount::Fifty => 50,
            LogLineCount::Hundred => 100,
        }
    }
}

impl TryFrom<u32> for LogLineCount {
    type Error = String;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        match value {
            20 => Ok(LogLineCount::Twenty),
            50 => Ok(LogLineCount::Fifty),
            100 => Ok(LogLineCount::Hundred),
            other => Err(format!("line count must be 20, 50 or 100, got {}", other)),
        }
    }
}

impl FromStr for LogLineCount {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let value: u32 = s
            .trim()
            .parse()
            .map_err(|_| format!("invalid line count: {}", s))?;
        LogLineCount::try_from(value)
    }
}

impl fmt::Display for LogLineCount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_u32())
    }
}

/// Parse an ISO-8601 timestamp. Values without an offset are taken as UTC.
pub fn parse_timestamp(value: &str) -> Option<DateTime<Utc>> {
    if let Ok(parsed) = DateTime::parse_from_rfc3339(value) {
        return Some(parsed.with_timezone(&Utc));
    }

    NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .map(|naive| naive.and_utc())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn status_response(last_update: &str) -> StatusResponse {
        StatusResponse {
            is_running: true,
            checks_performed_today: 42,
            slots_found_today: 3,
            last_update: last_update.to_string(),
            next_check_in_seconds: 120,
        }
    }

    #[test]
    fn test_status_with_valid_timestamp() {
        let status = MonitorStatus::from(status_response("2024-01-15T10:00:00Z"));

        assert!(status.running);
        assert_eq!(status.checks_today, 42);
        assert_eq!(status.slots_found_today, 3);
        assert_eq!(status.next_check_in_seconds, 120);
        assert_eq!(
            status.last_update,
            Utc.with_ymd_and_hms(2024, 1, 15, 10, 0, 0).unwrap()
        );
    }

    #[test]
    fn test_status_with_unparsable_timestamp_falls_back_to_now() {
        let before = Utc::now();
        let status = MonitorStatus::from(status_response("yesterday-ish"));
        let after = Utc::now();

        assert!(status.last_update >= before);
        assert!(status.last_update <= after);
        assert_eq!(status.checks_today, 42);
    }

    #[test]
    fn test_parse_timestamp_variants() {
        let expected = Utc.with_ymd_and_hms(2024, 1, 15, 10, 0, 0).unwrap();
        assert_eq!(parse_timestamp("2024-01-15T10:00:00Z"), Some(expected));
        assert_eq!(parse_timestamp("2024-01-15T11:00:00+01:00"), Some(expected));
        assert_eq!(parse_timestamp("2024-01-15T10:00:00"), Some(expected));
        assert!(parse_timestamp("2024-01-15T10:00:00.250Z").is_some());
        assert_eq!(parse_timestamp(""), None);
    }

    #[test]
    fn test_status_decodes_from_wire_json() {
        let json = r#"{
            "is_running": false,
            "checks_performed_today": 0,
            "slots_found_today": 0,
            "last_update": "2024-01-15T10:00:00Z",
            "next_check_in_seconds": 300
        }"#;

        let response: StatusResponse = serde_json::from_str(json).unwrap();
        let status = MonitorStatus::from(response);
        assert!(!status.running);
        assert_eq!(status.next_check_in_seconds, 300);
    }

    #[test]
    fn test_config_maps_one_to_one() {
        let json = r#"{
            "booking_system_url": "https://booking.example.com",
            "preferred_courts": ["Court11", "Court12"],
            "preferred_time_slots": ["18:00", "19:00"],
            "check_interval_seconds": 300,
            "auto_book_enabled": true,
            "alive_check_enabled": false,
            "alive_check_hour": 10
        }"#;

        let config = MonitorConfig::from(serde_json::from_str::<ConfigResponse>(json).unwrap());
        assert_eq!(config.booking_system_url, "https://booking.example.com");
        assert_eq!(config.preferred_courts, vec!["Court11", "Court12"]);
        assert_eq!(config.preferred_time_slots, vec!["18:00", "19:00"]);
        assert_eq!(config.check_interval_seconds, 300);
        assert!(config.auto_book_enabled);
        assert!(!config.alive_check_enabled);
        assert_eq!(config.alive_check_hour, 10);
    }

    #[test]
    fn test_config_missing_field_is_an_error() {
        let json = r#"{"booking_system_url": "https://booking.example.com"}"#;
        assert!(serde_json::from_str::<ConfigResponse>(json).is_err());
    }

    #[test]
    fn test_partial_update_omits_unset_fields() {
        let update = PreferencesUpdate::new().with_check_interval(60);
        let body = serde_json::to_value(&update).unwrap();

        assert_eq!(body, serde_json::json!({ "check_interval_seconds": 60 }));
        assert!(!update.is_empty());
        assert!(PreferencesUpdate::new().is_empty());
    }

    #[test]
    fn test_logs_response_without_error_field() {
        let json = r#"{"logs": ["a", "b"], "total_lines": 10, "returned_lines": 2}"#;
        let snapshot = LogSnapshot::from(serde_json::from_str::<LogsResponse>(json).unwrap());

        assert_eq!(snapshot.lines, vec!["a", "b"]);
        assert_eq!(snapshot.total_lines, 10);
        assert_eq!(snapshot.returned_lines, 2);
        assert_eq!(snapshot.error, None);
    }

    #[test]
    fn test_log_line_count_parsing() {
        assert_eq!(LogLineCount::default().as_u32(), 50);
        assert_eq!("20".parse::<LogLineCount>(), Ok(LogLineCount::Twenty));
        assert_eq!("100".parse::<LogLineCount>(), Ok(LogLineCount::Hundred));
        assert!("30".parse::<LogLineCount>().is_err());
        assert!("lots".parse::<LogLineCount>().is_err());
        assert_eq!(LogLineCount::Twenty.to_string(), "20");
    }
}
