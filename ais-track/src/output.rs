//! Terminal rendering: tables, JSON lines, and UTC timestamps.

use chrono::DateTime;
use comfy_table::{Cell, Table};
use serde_json::json;

use ais_core::tracker::{TrackPoint, Tracker};
use ais_core::types::DecodedMessage;

/// Render epoch seconds as `YYYY-MM-DD HH:MM:SS` UTC.
pub fn format_timestamp(ts: i64) -> String {
    match DateTime::from_timestamp(ts, 0) {
        Some(dt) => dt.format("%Y-%m-%d %H:%M:%S").to_string(),
        None => ts.to_string(),
    }
}

/// One JSON object per decoded message.
pub fn message_json(timestamp: i64, msg: &DecodedMessage) -> serde_json::Value {
    json!({
        "timestamp": timestamp,
        "time": format_timestamp(timestamp),
        "message": msg,
    })
}

/// One JSON object per track point, fields in output order.
pub fn point_json(point: &TrackPoint) -> String {
    serde_json::to_string(point).unwrap_or_default()
}

fn opt<T>(value: Option<T>, f: impl Fn(T) -> String) -> String {
    value.map(f).unwrap_or_else(|| "-".into())
}

pub fn points_table(points: &[TrackPoint]) -> Table {
    let mut table = Table::new();
    table.set_header(vec![
        "Time (UTC)", "MMSI", "Name", "Type", "Lat", "Lon", "SOG", "COG", "Hdg", "Source",
    ]);

    for p in points {
        table.add_row(vec![
            Cell::new(format_timestamp(p.timestamp)),
            Cell::new(p.mmsi),
            Cell::new(p.vessel_name.as_deref().unwrap_or("-")),
            Cell::new(p.ship_type_name.as_deref().unwrap_or("-")),
            Cell::new(format!("{:.5}", p.latitude)),
            Cell::new(format!("{:.5}", p.longitude)),
            Cell::new(format!("{:.1}", p.speed_over_ground)),
            Cell::new(format!("{:.1}", p.course_over_ground)),
            Cell::new(opt(
                (p.true_heading < 360).then_some(p.true_heading),
                |h| h.to_string(),
            )),
            Cell::new(if p.is_dead_reckoned { "DR" } else { "fix" }),
        ]);
    }

    table
}

/// Per-vessel summary after a track run, most recently seen first.
pub fn vessels_table(tracker: &Tracker) -> Table {
    let mut table = Table::new();
    table.set_header(vec![
        "MMSI", "Name", "Type", "Msgs", "Fixes", "DR", "First seen", "Last seen",
    ]);

    for v in tracker.vessels_by_recency() {
        table.add_row(vec![
            Cell::new(v.mmsi),
            Cell::new(v.vessel_name().unwrap_or_else(|| "-".into())),
            Cell::new(v.ship_type_name().unwrap_or_else(|| "-".into())),
            Cell::new(v.messages),
            Cell::new(v.real_points),
            Cell::new(v.dead_reckoned_points),
            Cell::new(format_timestamp(v.first_seen)),
            Cell::new(format_timestamp(v.last_seen)),
        ]);
    }

    table
}

/// Run statistics, one `label: value` pair per line.
pub fn run_stats(tracker: &Tracker) -> Vec<(&'static str, u64)> {
    vec![
        ("lines", tracker.total_lines),
        ("rejected", tracker.rejected_lines),
        ("checksum failures", tracker.checksum_failures),
        ("decoded", tracker.decoded_messages),
        ("unsupported", tracker.unsupported_messages),
        ("truncated", tracker.truncated_messages),
        ("real fixes", tracker.real_fixes),
        ("dead-reckoned", tracker.dead_reckoned_fixes),
        ("dropped", tracker.dropped_reports),
        ("vessels", tracker.vessels().len() as u64),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    const LINE: &str =
        "\\s:KlaipedaVTS,c:1758574798*59\\!AIVDM,1,1,,B,24SR`F0000QPgE0OoVBUUrUj0@R9,0*75";

    #[test]
    fn test_format_timestamp() {
        assert_eq!(format_timestamp(0), "1970-01-01 00:00:00");
        assert_eq!(format_timestamp(1758574798), "2025-09-22 20:59:58");
    }

    #[test]
    fn test_point_json_field_order() {
        let mut tracker = Tracker::default();
        let point = tracker.process_line(LINE).cloned().unwrap();
        let text = point_json(&point);
        assert!(text.starts_with("{\"timestamp\":1758574798,\"mmsi\":305703000,"));
        assert!(text.ends_with("\"is_dead_reckoned\":false}"));
        assert!(text.contains("\"vessel_name\":null"));
    }

    #[test]
    fn test_message_json() {
        let msg = ais_core::decode_payload("24SR`F0000QPgE0OoVBUUrUj0@R9").unwrap();
        let value = message_json(1758574798, &msg);
        assert_eq!(value["message"]["type"], "PositionReport");
        assert_eq!(value["message"]["mmsi"], 305703000);
        assert_eq!(value["time"], "2025-09-22 20:59:58");
    }

    #[test]
    fn test_tables_render() {
        let mut tracker = Tracker::default();
        tracker.process_line(LINE);
        let points = points_table(tracker.track()).to_string();
        assert!(points.contains("305703000"));
        assert!(points.contains("fix"));

        let vessels = vessels_table(&tracker).to_string();
        assert!(vessels.contains("305703000"));
        assert!(vessels.contains("2025-09-22 20:59:58"));

        let stats = run_stats(&tracker);
        assert!(stats.contains(&("real fixes", 1)));
        assert!(stats.contains(&("vessels", 1)));
    }
}
