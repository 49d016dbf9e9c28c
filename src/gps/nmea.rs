// src/gps/nmea.rs
//! NMEA sentence parsing
//!
//! Only RMC (Recommended Minimum) sentences are consulted; everything else
//! the receiver emits is ignored by the fix reader.

use crate::model::GeoPoint;

/// Parse one NMEA coordinate in ddmm.mmmm form with its hemisphere letter.
fn parse_coordinate(value: &str, hemisphere: &str) -> Option<f64> {
    let raw: f64 = value.parse().ok()?;
    let degrees = (raw / 100.0) as i32;
    let minutes = raw % 100.0;
    let mut result = degrees as f64 + minutes / 60.0;
    if hemisphere == "S" || hemisphere == "W" {
        result = -result;
    }
    Some(result)
}

/// Parse an RMC sentence into a position fix.
///
/// Returns `None` unless the sentence is RMC-typed, flagged valid (`A` in
/// the status field), and both coordinates decode to a non-zero pair.
pub fn parse_rmc(line: &str) -> Option<GeoPoint> {
    if !line.starts_with("$GPRMC") && !line.starts_with("$GNRMC") {
        return None;
    }

    let parts: Vec<&str> = line.split(',').collect();
    if parts.len() < 7 {
        return None;
    }

    // Status field: A = active fix, V = void
    if parts[2] != "A" {
        return None;
    }

    if parts[3].is_empty() || parts[4].is_empty() || parts[5].is_empty() || parts[6].is_empty() {
        return None;
    }

    let latitude = parse_coordinate(parts[3], parts[4])?;
    let longitude = parse_coordinate(parts[5], parts[6])?;

    let point = GeoPoint::new(latitude, longitude);
    if point.is_zero() {
        return None;
    }
    Some(point)
}
