//! `brewlink`: talk to the espresso controller from a terminal.
//!
//! ```text
//! brewlink ports
//! brewlink monitor --port /dev/ttyUSB0
//! brewlink --config brewlink.toml monitor --json
//! brewlink demo --seconds 30
//! ```
//!
//! Logs go to stderr and follow `RUST_LOG`; device output is logged under
//! the `brewlink::serial` target. Statuses go to stdout.

mod cli;
mod session;

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use clap::Parser;
use tracing::debug;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::prelude::*;

use brewlink_emulator::MachineProfile;
use brewlink_link::{
    ConnectionController, LinkConfig, MockChannel, SerialChannel, event_channel, list_ports,
};

use crate::cli::{Cli, Command};

fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(true);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .init();
}

fn load_config(cli: &Cli) -> Result<LinkConfig> {
    match &cli.config {
        Some(path) => LinkConfig::load(path)
            .with_context(|| format!("loading configuration from {}", path.display())),
        None => Ok(LinkConfig::default()),
    }
}

fn print_ports(json: bool) -> Result<()> {
    let ports = list_ports().context("enumerating serial ports")?;
    if ports.is_empty() && !json {
        println!("No serial ports found");
    }

    for port in ports {
        if json {
            let value = serde_json::json!({
                "name": port.name,
                "device_info": port.device_info,
                "manufacturer": port.manufacturer,
                "product": port.product,
            });
            println!("{value}");
        } else {
            let detail = match (&port.manufacturer, &port.product) {
                (Some(m), Some(p)) => format!(" ({m} {p})"),
                (Some(m), None) => format!(" ({m})"),
                (None, Some(p)) => format!(" ({p})"),
                (None, None) => String::new(),
            };
            println!("{:<20} {}{detail}", port.name, port.device_info);
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let mut config = load_config(&cli)?;
    debug!(?config, "Configuration loaded");

    match cli.command {
        Command::Ports { json } => print_ports(json),
        Command::Monitor {
            port,
            baud,
            no_auto_poll,
            output,
        } => {
            if let Some(port) = port {
                config.port = Some(port);
            }
            if let Some(baud) = baud {
                config.serial.baud_rate = baud;
            }
            if no_auto_poll {
                config.poll.auto_poll = false;
            }
            config.validate()?;

            let Some(port) = config.port.clone() else {
                bail!("no serial port given; use --port or set `port` in the configuration");
            };
            let channel = SerialChannel::new(port, config.serial.clone());
            let (forwarder, events) = event_channel();
            let controller = ConnectionController::with_observer(channel, config, Arc::new(forwarder));
            session::run_monitor(controller, events, output).await
        }
        Command::Demo {
            seconds,
            start_after,
            output,
        } => {
            let (channel, device) = MockChannel::with_device_info("Brewlink Emulator");
            session::spawn_emulator(device, MachineProfile::default());

            let (forwarder, events) = event_channel();
            let controller = ConnectionController::with_observer(channel, config, Arc::new(forwarder));
            session::run_demo(
                controller,
                events,
                Duration::from_secs(seconds),
                Duration::from_secs(start_after),
                output,
            )
            .await
        }
    }
}
