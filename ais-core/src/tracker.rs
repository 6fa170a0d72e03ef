//! Per-vessel state machine with dead-reckoned gap filling.
//!
//! Pure logic, no I/O. Feed capture lines (or decoded messages) in time
//! order; every usable position report produces exactly one `TrackPoint`,
//! either the reported fix or a dead-reckoned estimate.
//!
//! Tracks per-vessel: last fix (position, speed, course, time), latest
//! static/voyage data, and point counts.

use std::collections::HashMap;

use serde::Serialize;
use tracing::debug;

use crate::armor::Bitstream;
use crate::deadreckon;
use crate::decode::{dispatch, Dispatch};
use crate::nmea::{self, FragmentAssembler};
use crate::types::*;

/// Reports arriving this many seconds (or more) after the last fix are not
/// dead-reckoned.
pub const MAX_GAP_SECS: i64 = 3600;

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Tunables for track reconstruction.
#[derive(Debug, Clone, PartialEq)]
pub struct TrackerConfig {
    /// Exclusive upper bound on the gap bridged by dead reckoning.
    pub max_gap_secs: i64,
    /// Projections shorter than this use the flat-earth approximation.
    pub flat_earth_limit_km: f64,
    /// Skip sentences whose NMEA checksum does not match.
    pub verify_checksum: bool,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        TrackerConfig {
            max_gap_secs: MAX_GAP_SECS,
            flat_earth_limit_km: deadreckon::FLAT_EARTH_LIMIT_KM,
            verify_checksum: false,
        }
    }
}

// ---------------------------------------------------------------------------
// Track points (output)
// ---------------------------------------------------------------------------

/// One point of a reconstructed vessel track.
///
/// Field order is the output contract consumed downstream.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrackPoint {
    pub timestamp: i64,
    pub mmsi: Mmsi,
    pub ship_type: u8,
    pub ship_type_name: Option<String>,
    pub vessel_name: Option<String>,
    pub latitude: f64,
    pub longitude: f64,
    pub speed_over_ground: f64,
    pub course_over_ground: f64,
    pub nav_status: u8,
    pub position_accuracy: bool,
    pub true_heading: u16,
    pub is_dead_reckoned: bool,
}

// ---------------------------------------------------------------------------
// Vessel state
// ---------------------------------------------------------------------------

/// Last known kinematic state of a vessel.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Fix {
    pub latitude: f64,
    pub longitude: f64,
    pub speed_over_ground: f64,
    pub course_over_ground: f64,
    pub timestamp: i64,
}

/// Mutable state for a single vessel.
#[derive(Debug, Clone, PartialEq)]
pub struct VesselState {
    pub mmsi: Mmsi,
    pub last_fix: Option<Fix>,
    pub static_data: Option<StaticVoyageData>,
    pub first_seen: i64,
    pub last_seen: i64,
    pub messages: u64,
    pub real_points: u64,
    pub dead_reckoned_points: u64,
}

impl VesselState {
    pub fn new(mmsi: Mmsi, timestamp: i64) -> Self {
        VesselState {
            mmsi,
            last_fix: None,
            static_data: None,
            first_seen: timestamp,
            last_seen: timestamp,
            messages: 0,
            real_points: 0,
            dead_reckoned_points: 0,
        }
    }

    /// True once a fix is known and gaps can be bridged.
    pub fn is_tracked(&self) -> bool {
        self.last_fix.is_some()
    }

    /// Ship type code, 0 until static data arrives.
    pub fn ship_type(&self) -> u8 {
        self.static_data.as_ref().map_or(0, |s| s.ship_type)
    }

    pub fn ship_type_name(&self) -> Option<String> {
        self.static_data.as_ref().map(|s| s.ship_type_name())
    }

    pub fn vessel_name(&self) -> Option<String> {
        self.static_data
            .as_ref()
            .map(|s| s.vessel_name.clone())
            .filter(|n| !n.is_empty())
    }

    pub fn total_points(&self) -> u64 {
        self.real_points + self.dead_reckoned_points
    }

    fn point(&self, report: &PositionReport, fix: &Fix, is_dead_reckoned: bool) -> TrackPoint {
        TrackPoint {
            timestamp: fix.timestamp,
            mmsi: self.mmsi,
            ship_type: self.ship_type(),
            ship_type_name: self.ship_type_name(),
            vessel_name: self.vessel_name(),
            latitude: fix.latitude,
            longitude: fix.longitude,
            speed_over_ground: fix.speed_over_ground,
            course_over_ground: fix.course_over_ground,
            nav_status: report.nav_status,
            position_accuracy: report.position_accuracy,
            true_heading: report.true_heading,
            is_dead_reckoned,
        }
    }
}

// ---------------------------------------------------------------------------
// Tracker
// ---------------------------------------------------------------------------

/// Reconstruct per-vessel tracks from a time-ordered message stream.
///
/// Deterministic: the same input sequence always yields the same points.
pub struct Tracker {
    pub config: TrackerConfig,
    vessels: HashMap<Mmsi, VesselState>,
    points: Vec<TrackPoint>,
    assembler: FragmentAssembler,

    // Counters
    pub total_lines: u64,
    pub rejected_lines: u64,
    pub checksum_failures: u64,
    pub decoded_messages: u64,
    pub unsupported_messages: u64,
    pub truncated_messages: u64,
    pub real_fixes: u64,
    pub dead_reckoned_fixes: u64,
    pub dropped_reports: u64,
}

impl Default for Tracker {
    fn default() -> Self {
        Tracker::new(TrackerConfig::default())
    }
}

impl Tracker {
    pub fn new(config: TrackerConfig) -> Self {
        Tracker {
            config,
            vessels: HashMap::new(),
            points: Vec::new(),
            assembler: FragmentAssembler::new(),
            total_lines: 0,
            rejected_lines: 0,
            checksum_failures: 0,
            decoded_messages: 0,
            unsupported_messages: 0,
            truncated_messages: 0,
            real_fixes: 0,
            dead_reckoned_fixes: 0,
            dropped_reports: 0,
        }
    }

    /// Process one raw capture line. Returns the track point it produced, if any.
    pub fn process_line(&mut self, line: &str) -> Option<&TrackPoint> {
        self.total_lines += 1;

        let Some(raw) = nmea::parse_line(line) else {
            self.rejected_lines += 1;
            debug!(line = %truncate(line, 80), "no AIS sentence");
            return None;
        };

        if self.config.verify_checksum && !nmea::verify_checksum(line) {
            self.checksum_failures += 1;
            debug!(line = %truncate(line, 80), "checksum mismatch");
            return None;
        }

        let raw = self.assembler.push(raw)?;
        let bits = Bitstream::from_payload(&raw.payload);

        match dispatch(&bits) {
            Dispatch::Decoded(msg) => {
                self.decoded_messages += 1;
                self.process_message(raw.timestamp, &msg)
            }
            Dispatch::Truncated { kind, bits } => {
                self.truncated_messages += 1;
                debug!(kind, bits, "truncated message");
                None
            }
            Dispatch::Unsupported(_) => {
                self.unsupported_messages += 1;
                None
            }
            Dispatch::Empty => {
                self.rejected_lines += 1;
                None
            }
        }
    }

    /// Apply an already-decoded message captured at `timestamp`.
    ///
    /// Static data is recorded and emits nothing. A report with a fix emits a
    /// real point. A report without one is dead-reckoned from the last fix
    /// when the gap is inside the window, otherwise dropped without touching
    /// vessel state.
    pub fn process_message(&mut self, timestamp: i64, msg: &DecodedMessage) -> Option<&TrackPoint> {
        let mmsi = msg.mmsi();

        let report = match msg {
            DecodedMessage::StaticVoyageData(data) => {
                let vessel = self
                    .vessels
                    .entry(mmsi)
                    .or_insert_with(|| VesselState::new(mmsi, timestamp));
                vessel.static_data = Some(data.clone());
                vessel.last_seen = timestamp;
                vessel.messages += 1;
                return None;
            }
            DecodedMessage::PositionReport(report) => report,
        };

        let point = match report.position() {
            Some((latitude, longitude)) => {
                let vessel = self
                    .vessels
                    .entry(mmsi)
                    .or_insert_with(|| VesselState::new(mmsi, timestamp));
                let fix = Fix {
                    latitude,
                    longitude,
                    speed_over_ground: report.speed_over_ground,
                    course_over_ground: report.course_over_ground,
                    timestamp,
                };
                vessel.last_fix = Some(fix);
                vessel.last_seen = timestamp;
                vessel.messages += 1;
                vessel.real_points += 1;
                self.real_fixes += 1;
                vessel.point(report, &fix, false)
            }
            None => {
                let Some((vessel, last)) = self
                    .vessels
                    .get_mut(&mmsi)
                    .and_then(|v| v.last_fix.map(|fix| (v, fix)))
                else {
                    self.dropped_reports += 1;
                    debug!(mmsi, timestamp, "no fix and no prior position");
                    return None;
                };

                let elapsed = timestamp - last.timestamp;
                if elapsed <= 0 || elapsed >= self.config.max_gap_secs {
                    self.dropped_reports += 1;
                    debug!(mmsi, timestamp, elapsed, "gap outside dead-reckoning window");
                    return None;
                }

                let (latitude, longitude) = deadreckon::estimate_with_limit(
                    last.latitude,
                    last.longitude,
                    last.speed_over_ground,
                    last.course_over_ground,
                    elapsed as f64,
                    self.config.flat_earth_limit_km,
                );

                let fix = Fix {
                    latitude,
                    longitude,
                    speed_over_ground: if report.speed_over_ground > 0.0 {
                        report.speed_over_ground
                    } else {
                        last.speed_over_ground
                    },
                    course_over_ground: if report.course_over_ground >= 0.0 {
                        report.course_over_ground
                    } else {
                        last.course_over_ground
                    },
                    timestamp,
                };
                vessel.last_fix = Some(fix);
                vessel.last_seen = timestamp;
                vessel.messages += 1;
                vessel.dead_reckoned_points += 1;
                self.dead_reckoned_fixes += 1;
                vessel.point(report, &fix, true)
            }
        };

        self.points.push(point);
        self.points.last()
    }

    /// All points emitted so far, in input order.
    pub fn track(&self) -> &[TrackPoint] {
        &self.points
    }

    /// Consume the tracker and return its points.
    pub fn into_track(self) -> Vec<TrackPoint> {
        self.points
    }

    /// Points for a single vessel, in input order.
    pub fn track_for(&self, mmsi: Mmsi) -> impl Iterator<Item = &TrackPoint> {
        self.points.iter().filter(move |p| p.mmsi == mmsi)
    }

    /// Per-vessel state keyed by MMSI.
    pub fn vessels(&self) -> &HashMap<Mmsi, VesselState> {
        &self.vessels
    }

    pub fn vessel(&self, mmsi: Mmsi) -> Option<&VesselState> {
        self.vessels.get(&mmsi)
    }

    /// All vessels, most recently seen first.
    pub fn vessels_by_recency(&self) -> Vec<&VesselState> {
        let mut vessels: Vec<_> = self.vessels.values().collect();
        vessels.sort_by(|a, b| b.last_seen.cmp(&a.last_seen).then(a.mmsi.cmp(&b.mmsi)));
        vessels
    }

    /// Multi-sentence messages still waiting for fragments.
    pub fn pending_fragments(&self) -> usize {
        self.assembler.len()
    }
}

/// Reconstruct tracks from a sequence of capture lines.
pub fn reconstruct<I, S>(lines: I, config: TrackerConfig) -> Vec<TrackPoint>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut tracker = Tracker::new(config);
    for line in lines {
        tracker.process_line(line.as_ref());
    }
    tracker.into_track()
}

fn truncate(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
