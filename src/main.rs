//! Court Monitor command-line client

use clap::{Parser, Subcommand};
use court_monitor_client::settings::split_list;
use court_monitor_client::{
    ApiClient, Config, LogLineCount, LogsController, MonitorConfig, MonitorStatus,
    PreferencesUpdate, Result, StatusController,
};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Log filter used when `RUST_LOG` is not set
const DEFAULT_LOG_FILTER: &str = "info";

#[derive(Debug, Parser)]
#[command(name = "court-monitor", version, about = "Remote control for the court availability monitor")]
struct Cli {
    /// Base URL of the monitor server
    #[arg(long, env = "MONITOR_ENDPOINT")]
    endpoint: Option<String>,

    /// Shared secret sent as X-Token
    #[arg(long, env = "MONITOR_TOKEN", hide_env_values = true)]
    token: Option<String>,

    /// Request timeout in seconds (no timeout by default)
    #[arg(long)]
    timeout_secs: Option<u64>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Probe the unauthenticated health endpoint
    Health,
    /// Show the monitor status
    Status,
    /// Start the monitor
    Start,
    /// Stop the monitor
    Stop,
    /// Show the monitor configuration
    Config,
    /// Update monitor preferences; omitted options are left unchanged
    SetPrefs {
        /// Comma-separated court names
        #[arg(long)]
        courts: Option<String>,
        /// Comma-separated time slots
        #[arg(long)]
        times: Option<String>,
        /// Check interval in seconds
        #[arg(long, value_parser = clap::value_parser!(u64).range(1..))]
        interval: Option<u64>,
        /// Hour of the daily alive check (0-23)
        #[arg(long, value_parser = clap::value_parser!(u8).range(0..=23))]
        alive_hour: Option<u8>,
    },
    /// Print the tail of the monitor log
    Logs {
        /// 20, 50 or 100
        #[arg(long)]
        lines: Option<LogLineCount>,
    },
    /// Keep polling and print every change until interrupted
    Watch {
        /// Also follow the monitor log
        #[arg(long)]
        logs: bool,
        /// 20, 50 or 100
        #[arg(long)]
        lines: Option<LogLineCount>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    initialize_tracing();

    let cli = Cli::parse();

    let mut config = Config::from_env();
    if let Some(endpoint) = cli.endpoint.clone() {
        config.endpoint = Some(endpoint);
    }
    if let Some(token) = cli.token.clone() {
        config.credential = token;
    }
    if let Some(seconds) = cli.timeout_secs {
        config.http_timeout = Some(Duration::from_secs(seconds));
    }

    if let Err(e) = config.validate() {
        error!("Configuration validation failed: {}", e);
        eprintln!("error: {}", e);
        std::process::exit(2);
    }

    debug!("Client configuration: {:?}", config.endpoint);

    if let Err(e) = run(cli.command, config).await {
        error!("Command failed: {}", e);
        eprintln!("error: {}", e);
        std::process::exit(1);
    }

    Ok(())
}

async fn run(command: Command, config: Config) -> Result<()> {
    let client = ApiClient::new(config.transport_options())?;
    client.configure(config.endpoint.as_deref().unwrap_or_default(), &config.credential);
    let client = Arc::new(client);

    match command {
        Command::Health => {
            let health = client.health_check().await?;
            println!("status:          {}", health.status);
            println!("timestamp:       {}", health.timestamp);
            println!("monitor running: {}", health.monitor_running);
        }
        Command::Status => print_status(&client.get_status().await?),
        Command::Start => {
            client.start_monitor().await?;
            print_status(&client.get_status().await?);
        }
        Command::Stop => {
            client.stop_monitor().await?;
            print_status(&client.get_status().await?);
        }
        Command::Config => print_config(&client.get_config().await?),
        Command::SetPrefs {
            courts,
            times,
            interval,
            alive_hour,
        } => {
            let update = preferences_update(courts, times, interval, alive_hour);
            if update.is_empty() {
                eprintln!("nothing to update: pass at least one of --courts, --times, --interval, --alive-hour");
                return Ok(());
            }
            print_config(&client.update_preferences(&update).await?);
        }
        Command::Logs { lines } => {
            let lines = lines.unwrap_or(config.log_lines);
            let snapshot = client.get_log_snapshot(lines.as_u32()).await?;
            for line in &snapshot.lines {
                println!("{}", line);
            }
            if let Some(server_error) = snapshot.error {
                eprintln!("server reported: {}", server_error);
            }
        }
        Command::Watch { logs, lines } => {
            watch(client, &config, logs, lines.unwrap_or(config.log_lines)).await?;
        }
    }

    Ok(())
}

fn preferences_update(
    courts: Option<String>,
    times: Option<String>,
    interval: Option<u64>,
    alive_hour: Option<u8>,
) -> PreferencesUpdate {
    let mut update = PreferencesUpdate::new();
    // An empty list would clear the server's value; leave it out instead.
    let courts = courts.map(|value| split_list(&value)).unwrap_or_default();
    if !courts.is_empty() {
        update = update.with_courts(courts);
    }
    let times = times.map(|value| split_list(&value)).unwrap_or_default();
    if !times.is_empty() {
        update = update.with_time_slots(times);
    }
    if let Some(interval) = interval {
        update = update.with_check_interval(interval);
    }
    if let Some(hour) = alive_hour {
        update = update.with_alive_check_hour(hour);
    }
    update
}

async fn watch(
    client: Arc<ApiClient>,
    config: &Config,
    follow_logs: bool,
    lines: LogLineCount,
) -> Result<()> {
    let mut status = StatusController::with_interval(Arc::clone(&client), config.status_interval);
    let mut status_rx = status.subscribe();
    status.load_initial().await;

    let mut logs = LogsController::with_interval(client, config.logs_interval);
    logs.set_line_count(lines);
    let mut logs_rx = logs.subscribe();
    if follow_logs {
        logs.refresh().await;
        logs.start_auto_refresh();
    }

    info!("Watching monitor, press Ctrl-C to stop");
    let mut last_printed_line: Option<String> = None;
    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            signal = &mut shutdown => {
                if let Err(e) = signal {
                    error!("Failed to wait for shutdown signal: {}", e);
                }
                break;
            }
            changed = status_rx.changed() => {
                if changed.is_err() {
                    break;
                }
                let state = status_rx.borrow_and_update().clone();
                if state.in_flight {
                    continue;
                }
                match (&state.snapshot, &state.last_error) {
                    (_, Some(message)) => eprintln!("status error: {}", message),
                    (Some(snapshot), None) => print_status(snapshot),
                    (None, None) => {}
                }
            }
            changed = logs_rx.changed(), if follow_logs => {
                if changed.is_err() {
                    break;
                }
                let state = logs_rx.borrow_and_update().clone();
                if state.in_flight {
                    continue;
                }
                if let Some(message) = &state.last_error {
                    eprintln!("logs error: {}", message);
                }
                if let Some(snapshot) = &state.snapshot {
                    let start = last_printed_line
                        .as_ref()
                        .and_then(|last| snapshot.iter().rposition(|line| line == last))
                        .map_or(0, |index| index + 1);
                    for line in &snapshot[start..] {
                        println!("{}", line);
                    }
                    if let Some(last) = snapshot.last() {
                        last_printed_line = Some(last.clone());
                    }
                }
            }
        }
    }

    status.stop();
    logs.stop();
    info!("Stopped watching monitor");
    Ok(())
}

fn print_status(status: &MonitorStatus) {
    println!(
        "monitor: {} | checks today: {} | slots found today: {} | next check in {}s | updated {}",
        if status.running { "running" } else { "stopped" },
        status.checks_today,
        status.slots_found_today,
        status.next_check_in_seconds,
        status.last_update.to_rfc3339(),
    );
}

fn print_config(config: &MonitorConfig) {
    println!("booking system:   {}", config.booking_system_url);
    println!("preferred courts: {}", config.preferred_courts.join(", "));
    println!("preferred times:  {}", config.preferred_time_slots.join(", "));
    println!("check interval:   {}s", config.check_interval_seconds);
    println!("auto book:        {}", config.auto_book_enabled);
    println!(
        "alive check:      {} at {:02}:00",
        config.alive_check_enabled, config.alive_check_hour
    );
}

/// Initialize structured logging on stderr
fn initialize_tracing() {
    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_thread_ids(false)
        .with_thread_names(false)
        .with_file(false)
        .with_line_number(false)
        .json();

    let filter_layer = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(DEFAULT_LOG_FILTER));

    tracing_subscriber::registry()
        .with(filter_layer)
        .with(fmt_layer)
        .init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_log_filter_is_info() {
        let filter = tracing_subscriber::EnvFilter::new(DEFAULT_LOG_FILTER);
        assert_eq!(
            filter.max_level_hint(),
            Some(tracing_subscriber::filter::LevelFilter::INFO)
        );
    }

    #[test]
    fn test_blank_lists_are_left_out_of_update() {
        let update = preferences_update(Some(String::new()), Some(" , ".to_string()), None, None);
        assert!(update.is_empty());

        let update = preferences_update(Some(" , ".to_string()), None, Some(120), None);
        assert_eq!(update.preferred_courts, None);
        assert_eq!(update.check_interval_seconds, Some(120));
    }

    #[test]
    fn test_lists_are_split_and_trimmed() {
        let update = preferences_update(
            Some("Court11, Court12".to_string()),
            Some("18:00,".to_string()),
            None,
            Some(7),
        );
        assert_eq!(
            update.preferred_courts,
            Some(vec!["Court11".to_string(), "Court12".to_string()])
        );
        assert_eq!(update.preferred_time_slots, Some(vec!["18:00".to_string()]));
        assert_eq!(update.alive_check_hour, Some(7));
    }
}
