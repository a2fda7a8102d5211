//! Interactive and demo sessions on top of a [`ConnectionController`].

use std::time::Duration;

use anyhow::{Context, Result};
use chrono::Local;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc::UnboundedReceiver;
use tracing::{info, warn};

use brewlink_core::MachineStatus;
use brewlink_emulator::{EmulatedController, MachineProfile};
use brewlink_link::{Channel, ConnectionController, LinkEvent, MockDevice};

use crate::cli::{ConsoleInput, OutputArgs};

/// One-line human summary of a status.
pub fn format_status(status: &MachineStatus) -> String {
    let mut line = format!(
        "stage {}/{} | brew {:.1}°C {:.1} bar | flow {:.1} g/s | weight {:.1} g",
        status.current_stage,
        status.total_stage,
        status.brew_boiler_temperature,
        status.brew_boiler_pressure,
        status.flow_rate,
        status.liquid_weight,
    );
    if status.is_extracting() {
        line.push_str(" | extracting");
    }
    if status.has_error() {
        line.push_str(&format!(" | error {}", status.error_code));
    }
    line
}

fn timestamp() -> String {
    Local::now().format("%H:%M:%S%.3f").to_string()
}

/// Print one event. Returns false once the read loop has stopped.
fn print_event(event: &LinkEvent, output: OutputArgs) -> Result<bool> {
    match event {
        LinkEvent::StatusUpdate(status) if output.json => {
            println!("{}", serde_json::to_string(status)?);
        }
        LinkEvent::StatusUpdate(status) => {
            println!("{} {}", timestamp(), format_status(status));
        }
        LinkEvent::DataReceived(chunk) if output.raw => {
            println!("{} <- {}", timestamp(), chunk.escape_debug());
        }
        LinkEvent::ConnectionChanged {
            connected: true,
            device_info,
        } => {
            println!("{} connected to {device_info}", timestamp());
        }
        LinkEvent::ConnectionChanged { connected: false, .. } => {
            println!("{} disconnected", timestamp());
        }
        LinkEvent::ReadStopped(reason) => {
            eprintln!("{} link lost: {reason}", timestamp());
            return Ok(false);
        }
        _ => {}
    }
    Ok(true)
}

/// Apply one operator line. Returns false when the operator asked to quit.
async fn handle_input<C: Channel>(
    controller: &mut ConnectionController<C>,
    line: &str,
) -> bool {
    let result = match ConsoleInput::parse(line) {
        ConsoleInput::Quit => return false,
        ConsoleInput::Empty => return true,
        ConsoleInput::Unknown(text) => {
            eprintln!("unknown directive {text}; try /start /stop /poll on|off /quit");
            return true;
        }
        ConsoleInput::Start => controller.start_extraction().await,
        ConsoleInput::Stop => controller.stop_extraction().await,
        ConsoleInput::Poll(enabled) => {
            controller.set_auto_poll(enabled).await;
            Ok(())
        }
        ConsoleInput::Raw(text) => controller.send_raw(&text).await,
    };

    if let Err(e) = result {
        warn!(error = %e, "Command failed");
    }
    controller.is_connected()
}

/// Connect, then relay events to stdout and stdin lines to the controller
/// until `/quit`, end of input, Ctrl-C or loss of the link.
pub async fn run_monitor<C: Channel>(
    mut controller: ConnectionController<C>,
    mut events: UnboundedReceiver<LinkEvent>,
    output: OutputArgs,
) -> Result<()> {
    controller.connect().await.context("could not connect")?;
    let mut stdin = BufReader::new(tokio::io::stdin()).lines();

    loop {
        tokio::select! {
            event = events.recv() => {
                let Some(event) = event else { break };
                if !print_event(&event, output)? {
                    break;
                }
            }
            line = stdin.next_line() => {
                match line.context("reading stdin")? {
                    Some(line) => {
                        if !handle_input(&mut controller, &line).await {
                            break;
                        }
                    }
                    None => break,
                }
            }
            _ = tokio::signal::ctrl_c() => {
                info!("Interrupted");
                break;
            }
        }
    }

    controller.disconnect().await;
    while let Ok(event) = events.try_recv() {
        print_event(&event, output)?;
    }
    Ok(())
}

/// Serve every stream the mock channel opens with a fresh emulator.
pub fn spawn_emulator(mut device: MockDevice, profile: MachineProfile) {
    tokio::spawn(async move {
        while let Some(stream) = device.accept().await {
            let controller = EmulatedController::new(profile.clone());
            if let Err(e) = controller.serve(stream).await {
                warn!(error = %e, "Emulator session ended with an error");
            }
        }
    });
}

/// Run a scripted session: connect, start a shot after `start_after`,
/// disconnect after `duration`.
pub async fn run_demo<C: Channel>(
    mut controller: ConnectionController<C>,
    mut events: UnboundedReceiver<LinkEvent>,
    duration: Duration,
    start_after: Duration,
    output: OutputArgs,
) -> Result<()> {
    controller.connect().await.context("could not connect")?;

    let end = tokio::time::sleep(duration);
    let start = tokio::time::sleep(start_after);
    tokio::pin!(end, start);
    let mut started = false;

    loop {
        tokio::select! {
            event = events.recv() => {
                let Some(event) = event else { break };
                if !print_event(&event, output)? {
                    break;
                }
            }
            () = &mut start, if !started => {
                started = true;
                info!("Starting extraction");
                if let Err(e) = controller.start_extraction().await {
                    warn!(error = %e, "Start failed");
                }
            }
            () = &mut end => break,
            _ = tokio::signal::ctrl_c() => {
                info!("Interrupted");
                break;
            }
        }
    }

    controller.disconnect().await;
    while let Ok(event) = events.try_recv() {
        print_event(&event, output)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_status() {
        let status = MachineStatus {
            current_stage: 2,
            total_stage: 3,
            brew_boiler_temperature: 93.04,
            brew_boiler_pressure: 1.24,
            flow_rate: 1.6,
            liquid_weight: 18.0,
            drink_making_flag: 1,
            ..Default::default()
        };
        assert_eq!(
            format_status(&status),
            "stage 2/3 | brew 93.0°C 1.2 bar | flow 1.6 g/s | weight 18.0 g | extracting"
        );
    }

    #[test]
    fn test_format_status_with_error() {
        let status = MachineStatus {
            error_code: 7,
            ..Default::default()
        };
        assert!(format_status(&status).ends_with("| error 7"));
    }
}
