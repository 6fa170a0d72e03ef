//! Decode AIS bitstreams into typed vessel messages.
//!
//! Handles:
//! - Kinds 1, 2, 3: Class A position report (168 bits)
//! - Kind 5:        Static and voyage related data (424 bits)
//!
//! Every other kind is reported as unsupported and dropped by the caller.
//!
//! Position report layout (bit offsets, inclusive-exclusive):
//!
//! | Field              | Bits        | Notes                               |
//! |--------------------|-------------|-------------------------------------|
//! | kind               | `[0,6)`     |                                     |
//! | MMSI               | `[8,38)`    |                                     |
//! | nav status         | `[38,42)`   |                                     |
//! | rate of turn       | `[42,50)`   | raw                                 |
//! | SOG                | `[50,60)`   | 0.1 knot                            |
//! | position accuracy  | `[60,61)`   |                                     |
//! | longitude          | `[61,89)`   | 28-bit signed, 1/10000 min, `0x6791AC0` = n/a |
//! | latitude           | `[89,116)`  | 27-bit signed, 1/10000 min, `0x3412140` = n/a |
//! | COG                | `[116,128)` | 0.1 degree                          |
//! | true heading       | `[128,137)` | 511 = n/a                           |
//! | second of minute   | `[137,143)` |                                     |

use tracing::trace;

use crate::armor::{sign_extend, Bitstream};
use crate::types::*;

/// Outcome of routing a bitstream by its leading kind field.
#[derive(Debug, Clone, PartialEq)]
pub enum Dispatch {
    Decoded(DecodedMessage),
    /// Kind is known but the bitstream is too short for its layout.
    Truncated { kind: u8, bits: usize },
    /// Kind this decoder does not handle.
    Unsupported(u8),
    /// Fewer than 6 bits; no kind to read.
    Empty,
}

/// Read the message kind and route to the matching decoder.
pub fn dispatch(bits: &Bitstream) -> Dispatch {
    if bits.len() < 6 {
        return Dispatch::Empty;
    }

    let kind = message_kind(bits);
    let decoded = match kind {
        1..=3 => decode_position_report(bits).map(DecodedMessage::PositionReport),
        STATIC_VOYAGE_KIND => decode_static_voyage(bits).map(DecodedMessage::StaticVoyageData),
        _ => return Dispatch::Unsupported(kind),
    };

    match decoded {
        Some(msg) => {
            trace!(kind, mmsi = msg.mmsi(), "decoded message");
            Dispatch::Decoded(msg)
        }
        None => Dispatch::Truncated {
            kind,
            bits: bits.len(),
        },
    }
}

/// Decode a bitstream into a message, dropping unsupported and truncated ones.
pub fn decode(bits: &Bitstream) -> Option<DecodedMessage> {
    match dispatch(bits) {
        Dispatch::Decoded(msg) => Some(msg),
        _ => None,
    }
}

/// Decode an armored payload string.
pub fn decode_payload(payload: &str) -> Option<DecodedMessage> {
    decode(&Bitstream::from_payload(payload))
}

/// Leading 6-bit message kind.
pub fn message_kind(bits: &Bitstream) -> u8 {
    bits.uint(0, 6) as u8
}

// ---------------------------------------------------------------------------
// Coordinates
// ---------------------------------------------------------------------------

/// Decode a raw 28-bit longitude field into (-180, 180].
pub fn decode_longitude(raw: u64) -> Option<f64> {
    decode_coordinate(raw, 28, LON_NOT_AVAILABLE, 180.0)
}

/// Decode a raw 27-bit latitude field into (-90, 90].
pub fn decode_latitude(raw: u64) -> Option<f64> {
    decode_coordinate(raw, 27, LAT_NOT_AVAILABLE, 90.0)
}

fn decode_coordinate(raw: u64, width: u32, not_available: u64, limit: f64) -> Option<f64> {
    if raw == not_available {
        return None;
    }
    let degrees = sign_extend(raw, width) as f64 / COORD_SCALE;
    (degrees > -limit && degrees <= limit).then_some(degrees)
}

// ---------------------------------------------------------------------------
// Message decoders
// ---------------------------------------------------------------------------

/// Decode kinds 1-3: Class A position report.
///
/// Returns `None` only for structural problems (wrong kind, fewer than 168
/// bits). A missing or out-of-range fix is reported through `None`
/// coordinates on an otherwise valid report.
pub fn decode_position_report(bits: &Bitstream) -> Option<PositionReport> {
    let kind = message_kind(bits);
    if !POSITION_KINDS.contains(&kind) || bits.len() < POSITION_REPORT_BITS {
        return None;
    }

    Some(PositionReport {
        kind,
        mmsi: bits.uint(8, 38) as Mmsi,
        nav_status: bits.uint(38, 42) as u8,
        rate_of_turn: bits.uint(42, 50) as u16,
        speed_over_ground: bits.uint(50, 60) as f64 / 10.0,
        position_accuracy: bits.bit(60),
        longitude: decode_longitude(bits.uint(61, 89)),
        latitude: decode_latitude(bits.uint(89, 116)),
        course_over_ground: bits.uint(116, 128) as f64 / 10.0,
        true_heading: bits.uint(128, 137) as u16,
        second_of_minute: bits.uint(137, 143) as u8,
    })
}

/// Decode kind 5: static and voyage related data.
///
/// Layout: MMSI `[8,38)`, AIS version `[38,40)`, IMO `[40,70)`, call sign
/// `[70,112)`, name `[112,232)`, ship type `[232,240)`, bow/stern/port/starboard
/// `[240,249)` `[249,258)` `[258,264)` `[264,270)`, ETA month/day/hour/minute
/// `[270,274)` `[274,279)` `[279,284)` `[284,290)`, draught `[290,298)`,
/// destination `[298,422)`, DTE `[422,423)`.
pub fn decode_static_voyage(bits: &Bitstream) -> Option<StaticVoyageData> {
    if message_kind(bits) != STATIC_VOYAGE_KIND || bits.len() < STATIC_VOYAGE_BITS {
        return None;
    }

    Some(StaticVoyageData {
        mmsi: bits.uint(8, 38) as Mmsi,
        ais_version: bits.uint(38, 40) as u8,
        imo: bits.uint(40, 70) as u32,
        call_sign: bits.text(70, 112),
        vessel_name: bits.text(112, 232),
        ship_type: bits.uint(232, 240) as u8,
        dims: Dimensions {
            to_bow: bits.uint(240, 249) as u16,
            to_stern: bits.uint(249, 258) as u16,
            to_port: bits.uint(258, 264) as u16,
            to_starboard: bits.uint(264, 270) as u16,
        },
        eta: Eta {
            month: bits.uint(270, 274) as u8,
            day: bits.uint(274, 279) as u8,
            hour: bits.uint(279, 284) as u8,
            minute: bits.uint(284, 290) as u8,
        },
        draught: bits.uint(290, 298) as f64 / 10.0,
        destination: bits.text(298, 422),
        dte: bits.bit(422),
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
