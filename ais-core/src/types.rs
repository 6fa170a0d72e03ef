//! Shared types, error enum, and decoded message types for ais-core.

use serde::Serialize;
use thiserror::Error;

/// All errors produced by ais-core.
///
/// Decoding never fails with an error: unparseable lines and truncated
/// messages come back as `None`. These variants cover the file and config
/// plumbing around the decoder.
#[derive(Debug, Error)]
pub enum AisError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("config error: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, AisError>;

/// Maritime Mobile Service Identity (30-bit field, up to 9 decimal digits).
pub type Mmsi = u32;

// ---------------------------------------------------------------------------
// Message kinds
// ---------------------------------------------------------------------------

/// Message kinds routed to the position report decoder.
pub const POSITION_KINDS: &[u8] = &[1, 2, 3];

/// Message kind for static and voyage related data.
pub const STATIC_VOYAGE_KIND: u8 = 5;

/// Minimum bitstream length for a kind 1/2/3 position report.
pub const POSITION_REPORT_BITS: usize = 168;

/// Minimum bitstream length for a kind 5 static/voyage message.
pub const STATIC_VOYAGE_BITS: usize = 424;

// ---------------------------------------------------------------------------
// Sentinel values
// ---------------------------------------------------------------------------

/// Raw longitude meaning "not available" (181 degrees).
pub const LON_NOT_AVAILABLE: u64 = 0x6791AC0;

/// Raw latitude meaning "not available" (91 degrees).
pub const LAT_NOT_AVAILABLE: u64 = 0x3412140;

/// Raw speed over ground meaning "not available" (102.3 knots).
pub const SOG_NOT_AVAILABLE: u16 = 1023;

/// Raw course over ground meaning "not available" (360.0 degrees).
pub const COG_NOT_AVAILABLE: u16 = 3600;

/// True heading meaning "not available".
pub const HEADING_NOT_AVAILABLE: u16 = 511;

/// Coordinates are carried in 1/10000 minute.
pub const COORD_SCALE: f64 = 600_000.0;

// ---------------------------------------------------------------------------
// Lookup tables
// ---------------------------------------------------------------------------

/// Ship type code → description.
const SHIP_TYPES: &[(u8, &str)] = &[
    (20, "Wing in ground (WIG)"),
    (21, "Wing in ground (WIG)"),
    (22, "Wing in ground (WIG)"),
    (23, "Wing in ground (WIG)"),
    (30, "Fishing"),
    (31, "Towing"),
    (32, "Towing (large)"),
    (33, "Dredging or underwater ops"),
    (34, "Diving ops"),
    (35, "Military ops"),
    (36, "Sailing"),
    (37, "Pleasure craft"),
    (50, "Pilot vessel"),
    (51, "Search and rescue"),
    (52, "Tug"),
    (53, "Port tender"),
    (54, "Anti-pollution equipment"),
    (55, "Law enforcement"),
    (56, "Spare - local vessel"),
    (57, "Spare - local vessel"),
    (58, "Medical transport"),
    (59, "Non-combatant ship"),
];

/// Look up the description for a ship type code.
///
/// Unknown codes render as `"Unknown (<code>)"`.
pub fn ship_type_name(code: u8) -> String {
    if let Some((_, name)) = SHIP_TYPES.iter().find(|(c, _)| *c == code) {
        return (*name).to_string();
    }
    match code {
        60..=69 => "Passenger".into(),
        70..=79 => "Cargo".into(),
        80..=89 => "Tanker".into(),
        90 => "Other".into(),
        _ => format!("Unknown ({code})"),
    }
}

/// Navigational status code → description.
pub fn nav_status_name(code: u8) -> &'static str {
    match code {
        0 => "Under way using engine",
        1 => "At anchor",
        2 => "Not under command",
        3 => "Restricted manoeuvrability",
        4 => "Constrained by her draught",
        5 => "Moored",
        6 => "Aground",
        7 => "Engaged in fishing",
        8 => "Under way sailing",
        9..=14 => "Reserved for future use",
        _ => "Undefined",
    }
}

// ---------------------------------------------------------------------------
// Decoded message types
// ---------------------------------------------------------------------------

/// Kinds 1, 2, 3: Class A position report.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PositionReport {
    pub kind: u8,
    pub mmsi: Mmsi,
    pub nav_status: u8,
    /// Raw rate-of-turn field.
    pub rate_of_turn: u16,
    /// Knots, 0.1 resolution.
    pub speed_over_ground: f64,
    pub position_accuracy: bool,
    pub longitude: Option<f64>,
    pub latitude: Option<f64>,
    /// Degrees, 0.1 resolution.
    pub course_over_ground: f64,
    pub true_heading: u16,
    pub second_of_minute: u8,
}

impl PositionReport {
    /// Both coordinates, if the report carries a usable fix.
    pub fn position(&self) -> Option<(f64, f64)> {
        Some((self.latitude?, self.longitude?))
    }

    /// Speed over ground, `None` when the transponder reports it unavailable.
    pub fn speed(&self) -> Option<f64> {
        let raw = (self.speed_over_ground * 10.0).round() as u16;
        (raw != SOG_NOT_AVAILABLE).then_some(self.speed_over_ground)
    }

    /// Course over ground, `None` for the 360.0 "not available" value.
    pub fn course(&self) -> Option<f64> {
        let raw = (self.course_over_ground * 10.0).round() as u16;
        (raw < COG_NOT_AVAILABLE).then_some(self.course_over_ground)
    }

    /// True heading in degrees, `None` for 511.
    pub fn heading(&self) -> Option<u16> {
        (self.true_heading != HEADING_NOT_AVAILABLE && self.true_heading < 360)
            .then_some(self.true_heading)
    }

    pub fn nav_status_name(&self) -> &'static str {
        nav_status_name(self.nav_status)
    }
}

/// Vessel dimensions relative to the position reference point, in metres.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct Dimensions {
    pub to_bow: u16,
    pub to_stern: u16,
    pub to_port: u16,
    pub to_starboard: u16,
}

impl Dimensions {
    pub fn length(&self) -> u16 {
        self.to_bow + self.to_stern
    }

    pub fn beam(&self) -> u16 {
        self.to_port + self.to_starboard
    }
}

/// Estimated time of arrival. Zero fields mean "not available".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct Eta {
    pub month: u8,
    pub day: u8,
    pub hour: u8,
    pub minute: u8,
}

impl std::fmt::Display for Eta {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{:02}-{:02} {:02}:{:02}",
            self.month, self.day, self.hour, self.minute
        )
    }
}

/// Kind 5: Static and voyage related data.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StaticVoyageData {
    pub mmsi: Mmsi,
    pub ais_version: u8,
    pub imo: u32,
    pub call_sign: String,
    pub vessel_name: String,
    pub ship_type: u8,
    pub dims: Dimensions,
    pub eta: Eta,
    /// Metres, 0.1 resolution.
    pub draught: f64,
    pub destination: String,
    /// Data terminal equipment flag (`false` = ready).
    pub dte: bool,
}

impl StaticVoyageData {
    pub fn ship_type_name(&self) -> String {
        ship_type_name(self.ship_type)
    }
}

/// Union type for all decoded messages.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type")]
pub enum DecodedMessage {
    PositionReport(PositionReport),
    StaticVoyageData(StaticVoyageData),
}

impl DecodedMessage {
    /// Get the MMSI from any message type.
    pub fn mmsi(&self) -> Mmsi {
        match self {
            DecodedMessage::PositionReport(m) => m.mmsi,
            DecodedMessage::StaticVoyageData(m) => m.mmsi,
        }
    }

    /// Message kind from the leading 6-bit field.
    pub fn kind(&self) -> u8 {
        match self {
            DecodedMessage::PositionReport(m) => m.kind,
            DecodedMessage::StaticVoyageData(_) => STATIC_VOYAGE_KIND,
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn report() -> PositionReport {
        PositionReport {
            kind: 1,
            mmsi: 305703000,
            nav_status: 0,
            rate_of_turn: 0,
            speed_over_ground: 12.3,
            position_accuracy: true,
            longitude: Some(21.1),
            latitude: Some(55.7),
            course_over_ground: 143.1,
            true_heading: 338,
            second_of_minute: 57,
        }
    }

    #[test]
    fn test_ship_type_table() {
        assert_eq!(ship_type_name(21), "Wing in ground (WIG)");
        assert_eq!(ship_type_name(30), "Fishing");
        assert_eq!(ship_type_name(52), "Tug");
        assert_eq!(ship_type_name(65), "Passenger");
        assert_eq!(ship_type_name(70), "Cargo");
        assert_eq!(ship_type_name(89), "Tanker");
        assert_eq!(ship_type_name(90), "Other");
        assert_eq!(ship_type_name(0), "Unknown (0)");
        assert_eq!(ship_type_name(99), "Unknown (99)");
    }

    #[test]
    fn test_nav_status_names() {
        assert_eq!(nav_status_name(0), "Under way using engine");
        assert_eq!(nav_status_name(5), "Moored");
        assert_eq!(nav_status_name(12), "Reserved for future use");
        assert_eq!(nav_status_name(15), "Undefined");
    }

    #[test]
    fn test_position_requires_both_coordinates() {
        let mut r = report();
        assert_eq!(r.position(), Some((55.7, 21.1)));
        r.longitude = None;
        assert!(r.position().is_none());
    }

    #[test]
    fn test_not_available_accessors() {
        let mut r = report();
        assert_eq!(r.speed(), Some(12.3));
        assert_eq!(r.course(), Some(143.1));
        assert_eq!(r.heading(), Some(338));

        r.speed_over_ground = 102.3;
        r.course_over_ground = 360.0;
        r.true_heading = HEADING_NOT_AVAILABLE;
        assert!(r.speed().is_none());
        assert!(r.course().is_none());
        assert!(r.heading().is_none());
    }

    #[test]
    fn test_dimensions() {
        let d = Dimensions {
            to_bow: 120,
            to_stern: 30,
            to_port: 10,
            to_starboard: 12,
        };
        assert_eq!(d.length(), 150);
        assert_eq!(d.beam(), 22);
    }

    #[test]
    fn test_eta_display() {
        let eta = Eta {
            month: 9,
            day: 23,
            hour: 6,
            minute: 5,
        };
        assert_eq!(eta.to_string(), "09-23 06:05");
    }

    #[test]
    fn test_message_accessors() {
        let msg = DecodedMessage::PositionReport(report());
        assert_eq!(msg.mmsi(), 305703000);
        assert_eq!(msg.kind(), 1);
    }
}
