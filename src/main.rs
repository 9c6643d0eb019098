// MIT License - Copyright (c) 2026 Peter Wright
// Zigbee coordinator daemon

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use serde::Deserialize;
use tokio::signal::unix::{signal, SignalKind};
use tracing::{debug, error, info, warn};

use ezstack::{NetworkConfiguration, SerialConfig, Stack, StackConfig, StackEvents};

// ---------------------------------------------------------------------------
// CLI
// ---------------------------------------------------------------------------

#[derive(Parser)]
#[command(name = "ezstack")]
#[command(about = "Zigbee coordinator for TI Z-Stack network processors")]
struct Cli {
    /// Path to the TOML configuration file
    #[arg(long, default_value = "config.toml")]
    config: String,

    /// Overwrite the radio's network settings when they differ from the configuration
    #[arg(long)]
    settings_flash: bool,

    /// Log every inbound frame to this file
    #[arg(long)]
    packet_capture: Option<PathBuf>,

    /// Permit devices to join for the first two minutes
    #[arg(long)]
    join_enable: bool,
}

// ---------------------------------------------------------------------------
// Config
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct Config {
    network: NetworkConfiguration,
    serial: SerialConfig,
    #[serde(default)]
    stack: StackToml,
}

#[derive(Debug, Deserialize)]
struct StackToml {
    #[serde(default = "default_led")]
    led: bool,
    #[serde(default)]
    permit_join: bool,
    #[serde(default)]
    settings_flash: bool,
    #[serde(default)]
    packet_capture: Option<PathBuf>,
    #[serde(default = "default_database_path")]
    database_path: PathBuf,
}

impl Default for StackToml {
    fn default() -> Self {
        Self {
            led: default_led(),
            permit_join: false,
            settings_flash: false,
            packet_capture: None,
            database_path: default_database_path(),
        }
    }
}

fn default_led() -> bool {
    true
}
fn default_database_path() -> PathBuf {
    PathBuf::from("nodedb.json")
}

/// Merge the file with the command line; flags only ever switch features on.
fn build_stack_config(config: Config, cli: &Cli) -> StackConfig {
    let mut builder = StackConfig::builder()
        .network(config.network)
        .serial_port(config.serial.port)
        .baud_rate(config.serial.baud_rate)
        .led(config.stack.led)
        .permit_join(config.stack.permit_join || cli.join_enable)
        .settings_flash(config.stack.settings_flash || cli.settings_flash)
        .database_path(config.stack.database_path);
    if let Some(path) = cli.packet_capture.clone().or(config.stack.packet_capture) {
        builder = builder.packet_capture(path);
    }
    builder.build()
}

// ---------------------------------------------------------------------------
// Events
// ---------------------------------------------------------------------------

async fn log_events(mut events: StackEvents) {
    loop {
        tokio::select! {
            Some(device) = events.registered.recv() => {
                info!("Device registered: {} [{}] {} {}", device.ieee_address, device.network_address, device.manufacturer, device.model);
            }
            Some(device) = events.became_available.recv() => {
                info!("Device available: {} [{}] {}", device.ieee_address, device.network_address, device.model);
            }
            Some(device) = events.unregistered.recv() => {
                info!("Device unregistered: {} {}", device.ieee_address, device.model);
            }
            Some(incoming) = events.incoming.recv() => {
                let frame = &incoming.message.data;
                info!(
                    "{} [{}] cluster {:#06x}: {}",
                    incoming.device.model,
                    incoming.device.ieee_address,
                    incoming.message.cluster_id,
                    frame.command_name
                );
                match serde_json::to_string(&frame.command) {
                    Ok(json) => debug!("{json}"),
                    Err(e) => warn!("Failed to serialize incoming command: {e}"),
                }
            }
            Some(err) = events.errors.recv() => {
                if err.is_fatal() {
                    error!("Stack error: {err}");
                } else {
                    warn!("Stack error: {err}");
                }
            }
            else => break,
        }
    }
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

#[tokio::main]
async fn main() -> Result<()> {
    // RUST_LOG controls verbosity (e.g. RUST_LOG=debug or RUST_LOG=ezstack=trace).
    // Default: info.
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    // systemd journal already adds timestamps, so omit them when running under systemd
    if std::env::var_os("JOURNAL_STREAM").is_some() {
        tracing_subscriber::fmt().without_time().with_env_filter(env_filter).init();
    } else {
        tracing_subscriber::fmt().with_env_filter(env_filter).init();
    }

    let cli = Cli::parse();

    // Load config
    let config_text =
        std::fs::read_to_string(&cli.config).context("Failed to read config file")?;
    let config: Config = toml::from_str(&config_text).context("Failed to parse config file")?;
    let stack_config = build_stack_config(config, &cli);
    stack_config.validate().context("Invalid configuration")?;

    let port = ezstack::serial::open(&stack_config.serial)
        .with_context(|| format!("Failed to open serial port {}", stack_config.serial.port))?;
    let (reader, writer) = tokio::io::split(port);

    let mut sigterm = signal(SignalKind::terminate())?;

    let (stack, events, mut handle) = Stack::start(reader, writer, stack_config)
        .await
        .context("Failed to start the Zigbee stack")?;
    info!("{} known device(s)", stack.devices().len());
    let logger = tokio::spawn(log_events(events));

    tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            info!("Received SIGINT, shutting down...");
        }
        _ = sigterm.recv() => {
            info!("Received SIGTERM, shutting down...");
        }
        result = handle.stopped() => match result {
            Ok(()) => warn!("Radio connection closed"),
            Err(e) => error!("Radio connection failed: {e}"),
        },
    }

    handle.shutdown().await.context("Shutdown failed")?;
    logger.abort();
    info!("Shutdown complete");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const CONFIG: &str = r#"
        [network]
        ieee_address = "0x00124b0001020304"
        pan_id = 0x1a62
        ext_pan_id = "dddddddddddddddd"
        network_key = [1, 3, 5, 7, 9, 11, 13, 15, 0, 2, 4, 6, 8, 10, 12, 13]
        channel = 11

        [serial]
        port = "/dev/ttyACM0"
    "#;

    fn cli(args: &[&str]) -> Cli {
        Cli::parse_from(std::iter::once("ezstack").chain(args.iter().copied()))
    }

    #[test]
    fn test_defaults_fill_missing_tables() {
        let config: Config = toml::from_str(CONFIG).unwrap();
        let stack = build_stack_config(config, &cli(&[]));
        stack.validate().unwrap();
        assert_eq!(stack.serial.baud_rate, 115_200);
        assert!(stack.led);
        assert!(!stack.permit_join);
        assert!(!stack.settings_flash);
        assert_eq!(stack.packet_capture, None);
        assert_eq!(stack.database_path, PathBuf::from("nodedb.json"));
        assert_eq!(stack.network.ext_pan_id, 0xdddd_dddd_dddd_dddd);
    }

    #[test]
    fn test_flags_override_file() {
        let config: Config = toml::from_str(CONFIG).unwrap();
        let stack = build_stack_config(
            config,
            &cli(&["--settings-flash", "--join-enable", "--packet-capture", "znp.log"]),
        );
        assert!(stack.permit_join);
        assert!(stack.settings_flash);
        assert_eq!(stack.packet_capture, Some(PathBuf::from("znp.log")));
    }
}
