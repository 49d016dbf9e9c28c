// src/gps/reader.rs v2
//! Serial GPS fix acquisition

use super::nmea;
use crate::error::{Result, ScoutError};
use crate::model::GeoPoint;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};
use tokio::time::Instant;
use tokio_serial::SerialPortBuilderExt;
use tracing::{debug, info, trace, warn};

/// How often the read loop re-checks the cancel flag and deadline while
/// waiting on the stream.
const CANCEL_POLL: Duration = Duration::from_millis(250);

/// Result of one fix acquisition attempt.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FixOutcome {
    /// First valid RMC fix from the stream.
    Acquired(GeoPoint),
    /// The stream ended or errored before a valid sentence arrived.
    NoFix,
    /// The deadline passed.
    TimedOut,
    /// The cancel flag was raised.
    Cancelled,
}

/// Acquire a single GPS fix from a serial NMEA stream.
///
/// The port is opened fresh on every call; a failure to open propagates as
/// an error while everything after that resolves to a [`FixOutcome`].
pub async fn acquire_fix(
    port: &str,
    baudrate: u32,
    deadline: Duration,
    cancel: Arc<AtomicBool>,
) -> Result<FixOutcome> {
    info!(port, baudrate, "opening GPS serial port");

    let serial = tokio_serial::new(port, baudrate)
        .timeout(Duration::from_millis(1000))
        .open_native_async()
        .map_err(|e| {
            ScoutError::Connection(format!("Failed to open serial port {}: {}", port, e))
        })?;

    Ok(read_fix(BufReader::new(serial), deadline, &cancel).await)
}

/// Read lines until the first valid RMC fix, the deadline, or cancellation.
///
/// First valid fix wins: no averaging, no accuracy filtering. Blank reads
/// and malformed sentences are logged and skipped.
pub async fn read_fix<R>(mut reader: R, deadline: Duration, cancel: &AtomicBool) -> FixOutcome
where
    R: AsyncBufRead + Unpin,
{
    let started = Instant::now();
    let mut line = String::new();

    loop {
        if cancel.load(Ordering::Relaxed) {
            debug!("fix acquisition cancelled");
            return FixOutcome::Cancelled;
        }

        let elapsed = started.elapsed();
        if elapsed >= deadline {
            debug!("fix acquisition deadline passed");
            return FixOutcome::TimedOut;
        }
        let wait = (deadline - elapsed).min(CANCEL_POLL);

        line.clear();
        match tokio::time::timeout(wait, reader.read_line(&mut line)).await {
            Err(_) => continue, // wait window elapsed, re-check cancel/deadline
            Ok(Ok(0)) => {
                debug!("GPS stream ended before a fix");
                return FixOutcome::NoFix;
            }
            Ok(Ok(_)) => {
                let line = line.trim();
                if line.is_empty() {
                    trace!("blank read from GPS");
                    continue;
                }
                if !line.starts_with('$') {
                    trace!(line, "non-NMEA line");
                    continue;
                }
                match nmea::parse_rmc(line) {
                    Some(point) => {
                        info!(%point, "GPS fix acquired");
                        return FixOutcome::Acquired(point);
                    }
                    None => trace!(line, "no fix in sentence"),
                }
            }
            Ok(Err(e)) => {
                warn!(error = %e, "GPS stream error before a fix");
                return FixOutcome::NoFix;
            }
        }
    }
}

/// List available serial ports to stdout.
pub fn list_serial_ports() -> Result<()> {
    let ports = tokio_serial::available_ports()
        .map_err(|e| ScoutError::Other(format!("Failed to list serial ports: {}", e)))?;

    if ports.is_empty() {
        println!("No serial ports found.");
    } else {
        println!("Available serial ports:");
        for port in ports {
            println!("  {} - {:?}", port.port_name, port.port_type);
        }
    }

    Ok(())
}
