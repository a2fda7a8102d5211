//! Host-side view of an emulator session over an in-memory pipe.

use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt, DuplexStream};

use brewlink_core::constants::{EXTRACT_START, EXTRACT_STOP, POLL_REQUEST};
use brewlink_emulator::{BOOT_BANNER, EmulatedController, ExtractionState, MachineProfile};
use brewlink_protocol::{LineLogBuffer, LogEntry, StreamParser};

/// Reads everything the emulator sends until `expected` statuses and
/// `lines` log lines have arrived.
async fn collect(
    host: &mut DuplexStream,
    statuses: usize,
    lines: usize,
) -> (Vec<brewlink_core::MachineStatus>, Vec<String>) {
    let mut parser = StreamParser::new();
    let mut log = LineLogBuffer::new();
    let mut got_statuses = Vec::new();
    let mut got_lines = Vec::new();
    let mut buf = [0u8; 512];

    while got_statuses.len() < statuses || got_lines.len() < lines {
        let n = host.read(&mut buf).await.unwrap();
        assert!(n > 0, "emulator closed early");
        let text = std::str::from_utf8(&buf[..n]).unwrap();

        parser.feed(text);
        got_statuses.extend(parser.drain_statuses());
        for entry in log.push(text) {
            if let LogEntry::Line(line) = entry {
                got_lines.push(line);
            }
        }
    }
    (got_statuses, got_lines)
}

#[tokio::test(start_paused = true)]
async fn test_banner_then_status() {
    let (mut host, device) = tokio::io::duplex(4096);
    let server = tokio::spawn(EmulatedController::new(MachineProfile::default()).serve(device));

    let (_, lines) = collect(&mut host, 0, BOOT_BANNER.len()).await;
    assert_eq!(lines, BOOT_BANNER);

    host.write_all(POLL_REQUEST.as_bytes()).await.unwrap();
    let (statuses, _) = collect(&mut host, 1, 0).await;
    assert_eq!(statuses[0].firmware_version, "FW2.1");
    assert_eq!(statuses[0].current_stage, 0);

    drop(host);
    let machine = server.await.unwrap().unwrap();
    assert_eq!(machine.state(), ExtractionState::Idle);
}

#[tokio::test(start_paused = true)]
async fn test_full_shot_over_the_wire() {
    let (mut host, device) = tokio::io::duplex(4096);
    let server =
        tokio::spawn(EmulatedController::new(MachineProfile::default()).without_banner().serve(device));

    host.write_all(EXTRACT_START.as_bytes()).await.unwrap();
    let (_, lines) = collect(&mut host, 0, 1).await;
    assert_eq!(lines, vec!["EXTRACT START OK"]);

    tokio::time::sleep(Duration::from_secs(10)).await;
    host.write_all(POLL_REQUEST.as_bytes()).await.unwrap();
    let (statuses, _) = collect(&mut host, 1, 0).await;
    assert_eq!(statuses[0].current_stage, 2);
    assert!(statuses[0].is_extracting());
    assert!(statuses[0].liquid_weight > 0.0);

    host.write_all(EXTRACT_STOP.as_bytes()).await.unwrap();
    host.write_all(b"VERSION\r\n").await.unwrap();
    let (_, lines) = collect(&mut host, 0, 2).await;
    assert_eq!(lines, vec!["EXTRACT STOP OK", "ECHO VERSION"]);

    drop(host);
    let machine = server.await.unwrap().unwrap();
    assert_eq!(machine.state(), ExtractionState::Finished);
    assert_eq!(machine.history().len(), 3);
}

#[tokio::test]
async fn test_noise_between_commands_is_ignored() {
    let (mut host, device) = tokio::io::duplex(4096);
    let server =
        tokio::spawn(EmulatedController::new(MachineProfile::default()).without_banner().serve(device));

    let noisy = format!("\x00\x7f{POLL_REQUEST}zz{POLL_REQUEST}");
    host.write_all(noisy.as_bytes()).await.unwrap();
    let (statuses, _) = collect(&mut host, 2, 0).await;
    assert_eq!(statuses.len(), 2);

    drop(host);
    server.await.unwrap().unwrap();
}
