//! Pull AIS sentences out of raw capture lines.
//!
//! Capture lines look like
//! `\s:KlaipedaVTS,c:1758574798*59\!AIVDM,1,1,,B,24SR`F0000QPgE0OoVBUUrUj0@R9,0*75`:
//! an optional tag block carrying the capture epoch (`c:<digits>`) followed by
//! an `!AIVDM` sentence. Lines missing either part are skipped, not errors.
//!
//! Multi-sentence messages (usually kind 5) are stitched back together by
//! `FragmentAssembler`.

use std::collections::HashMap;

use tracing::debug;

const SENTENCE_MARKER: &str = "!AIVDM,";
const TIMESTAMP_MARKER: &str = "c:";

/// One AIS sentence extracted from a capture line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawLine {
    /// Capture time, epoch seconds.
    pub timestamp: i64,
    /// Armored payload (never contains commas).
    pub payload: String,
    pub fragment_count: u8,
    pub fragment_number: u8,
    pub sequence_id: Option<u8>,
    pub channel: char,
    pub fill_bits: u8,
}

impl RawLine {
    pub fn is_fragmented(&self) -> bool {
        self.fragment_count > 1
    }
}

/// Extract the capture timestamp and armored payload from one line.
///
/// Returns `None` when the timestamp marker or the sentence marker is absent
/// or malformed.
pub fn parse_line(line: &str) -> Option<RawLine> {
    let timestamp = extract_timestamp(line)?;

    let start = line.find(SENTENCE_MARKER)?;
    let body = &line[start + SENTENCE_MARKER.len()..];
    let mut fields = body.splitn(6, ',');

    let fragment_count = parse_digits(fields.next()?)?;
    let fragment_number = parse_digits(fields.next()?)?;

    let seq = fields.next()?;
    let sequence_id = if seq.is_empty() {
        None
    } else {
        Some(parse_digits(seq)?)
    };

    let mut channel_field = fields.next()?.chars();
    let channel = channel_field.next()?;
    if channel_field.next().is_some() {
        return None;
    }

    let payload = fields.next()?;
    if payload.is_empty() {
        return None;
    }

    // Trailing "<fill>*<checksum>" is optional in the captures we accept.
    let fill_bits = fields
        .next()
        .and_then(|tail| tail.split('*').next())
        .and_then(|fill| fill.trim().parse::<u8>().ok())
        .unwrap_or(0);

    Some(RawLine {
        timestamp,
        payload: payload.to_string(),
        fragment_count,
        fragment_number,
        sequence_id,
        channel,
        fill_bits,
    })
}

/// Find `c:<digits>` and parse the digits.
fn extract_timestamp(line: &str) -> Option<i64> {
    let mut rest = line;
    while let Some(pos) = rest.find(TIMESTAMP_MARKER) {
        let after = &rest[pos + TIMESTAMP_MARKER.len()..];
        let digits_len = after.bytes().take_while(u8::is_ascii_digit).count();
        if digits_len > 0 {
            return after[..digits_len].parse().ok();
        }
        rest = after;
    }
    None
}

fn parse_digits(field: &str) -> Option<u8> {
    if field.is_empty() || !field.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    field.parse().ok()
}

// ---------------------------------------------------------------------------
// Checksum
// ---------------------------------------------------------------------------

/// XOR of every byte between the leading `!` (or `$`) and `*`.
pub fn nmea_checksum(sentence: &str) -> u8 {
    let body = sentence
        .strip_prefix('!')
        .or_else(|| sentence.strip_prefix('$'))
        .unwrap_or(sentence);
    let body = body.split('*').next().unwrap_or(body);
    body.bytes().fold(0u8, |acc, b| acc ^ b)
}

/// Verify the checksum of the AIS sentence embedded in `line`.
///
/// Returns `false` if there is no sentence or no two-digit checksum.
pub fn verify_checksum(line: &str) -> bool {
    let Some(start) = line.find(SENTENCE_MARKER) else {
        return false;
    };
    let sentence = &line[start..];
    let Some((body, tail)) = sentence.split_once('*') else {
        return false;
    };
    let Some(hex) = tail.get(..2) else {
        return false;
    };
    match u8::from_str_radix(hex, 16) {
        Ok(expected) => nmea_checksum(body) == expected,
        Err(_) => false,
    }
}

// ---------------------------------------------------------------------------
// Fragment reassembly
// ---------------------------------------------------------------------------

#[derive(Debug)]
struct PendingMessage {
    fragment_count: u8,
    next_fragment: u8,
    payload: String,
}

/// Reassemble multi-sentence AIS messages.
///
/// Fragments are keyed by (sequence id, channel) and must arrive in order.
/// A group that is interrupted (out-of-order fragment, or a new first
/// fragment on the same key) is discarded.
#[derive(Debug, Default)]
pub struct FragmentAssembler {
    pending: HashMap<(Option<u8>, char), PendingMessage>,
    pub discarded: u64,
}

impl FragmentAssembler {
    pub fn new() -> Self {
        FragmentAssembler::default()
    }

    /// Feed one sentence. Returns a complete message when one is ready.
    ///
    /// Single-sentence lines are returned unchanged.
    pub fn push(&mut self, raw: RawLine) -> Option<RawLine> {
        if !raw.is_fragmented() {
            return Some(raw);
        }

        let key = (raw.sequence_id, raw.channel);

        if raw.fragment_number == 1 {
            if self.pending.remove(&key).is_some() {
                self.discarded += 1;
                debug!(?key, "incomplete multi-sentence message replaced");
            }
            self.pending.insert(
                key,
                PendingMessage {
                    fragment_count: raw.fragment_count,
                    next_fragment: 2,
                    payload: raw.payload,
                },
            );
            return None;
        }

        let Some(pending) = self.pending.get_mut(&key) else {
            debug!(?key, fragment = raw.fragment_number, "orphan fragment");
            return None;
        };

        if pending.fragment_count != raw.fragment_count
            || pending.next_fragment != raw.fragment_number
        {
            self.pending.remove(&key);
            self.discarded += 1;
            debug!(?key, fragment = raw.fragment_number, "out-of-order fragment");
            return None;
        }

        pending.payload.push_str(&raw.payload);

        if raw.fragment_number < raw.fragment_count {
            pending.next_fragment += 1;
            return None;
        }

        let done = self.pending.remove(&key)?;
        Some(RawLine {
            payload: done.payload,
            fragment_count: 1,
            fragment_number: 1,
            ..raw
        })
    }

    /// Number of partially assembled messages.
    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    const LINE: &str =
        "\\s:KlaipedaVTS,c:1758574798*59\\!AIVDM,1,1,,B,24SR`F0000QPgE0OoVBUUrUj0@R9,0*75";

    #[test]
    fn test_parse_capture_line() {
        let raw = parse_line(LINE).unwrap();
        assert_eq!(raw.timestamp, 1758574798);
        assert_eq!(raw.payload, "24SR`F0000QPgE0OoVBUUrUj0@R9");
        assert_eq!(raw.channel, 'B');
        assert_eq!(raw.fragment_count, 1);
        assert_eq!(raw.sequence_id, None);
        assert_eq!(raw.fill_bits, 0);
        assert!(!raw.is_fragmented());
    }

    #[test]
    fn test_missing_timestamp() {
        let line = "!AIVDM,1,1,,B,24SR`F0000QPgE0OoVBUUrUj0@R9,0*75";
        assert!(parse_line(line).is_none());
        let line = "\\s:X,c:abc*00\\!AIVDM,1,1,,B,24SR`F0000QPgE0OoVBUUrUj0@R9,0*75";
        assert!(parse_line(line).is_none());
    }

    #[test]
    fn test_missing_sentence() {
        assert!(parse_line("\\c:1758574798*00\\$GPGGA,123519,4807.038,N").is_none());
        assert!(parse_line("c:1758574798").is_none());
        assert!(parse_line("").is_none());
    }

    #[test]
    fn test_malformed_sentence_fields() {
        // Channel must be a single character
        assert!(parse_line("c:1 !AIVDM,1,1,,AB,15M67F,0*00").is_none());
        // Non-numeric fragment count
        assert!(parse_line("c:1 !AIVDM,x,1,,A,15M67F,0*00").is_none());
        // Empty payload
        assert!(parse_line("c:1 !AIVDM,1,1,,A,,0*00").is_none());
        // Too few fields
        assert!(parse_line("c:1 !AIVDM,1,1,,A").is_none());
    }

    #[test]
    fn test_timestamp_marker_anywhere() {
        let raw = parse_line("!AIVDM,1,1,,A,15M67F,0*00 c:42").unwrap();
        assert_eq!(raw.timestamp, 42);
        assert_eq!(raw.payload, "15M67F");
    }

    #[test]
    fn test_checksum() {
        let body = "!AIVDM,1,1,,B,24SR`F0000QPgE0OoVBUUrUj0@R9,0";
        assert_eq!(nmea_checksum(body), 0x75);
        assert!(verify_checksum(LINE));
        assert!(!verify_checksum(&LINE.replace("*75", "*76")));
        assert!(!verify_checksum("c:1 !AIVDM,1,1,,A,15M67F,0"));
    }

    fn fragment(n: u8, seq: Option<u8>, payload: &str, ts: i64) -> RawLine {
        RawLine {
            timestamp: ts,
            payload: payload.into(),
            fragment_count: 2,
            fragment_number: n,
            sequence_id: seq,
            channel: 'A',
            fill_bits: if n == 2 { 2 } else { 0 },
        }
    }

    #[test]
    fn test_assembler_passes_single_sentences() {
        let mut asm = FragmentAssembler::new();
        let raw = parse_line(LINE).unwrap();
        assert_eq!(asm.push(raw.clone()), Some(raw));
        assert!(asm.is_empty());
    }

    #[test]
    fn test_assembler_joins_fragments() {
        let mut asm = FragmentAssembler::new();
        assert!(asm.push(fragment(1, Some(3), "55P5TL01", 10)).is_none());
        assert_eq!(asm.len(), 1);

        let done = asm.push(fragment(2, Some(3), "88888880", 11)).unwrap();
        assert_eq!(done.payload, "55P5TL0188888880");
        assert_eq!(done.timestamp, 11);
        assert_eq!(done.fill_bits, 2);
        assert!(!done.is_fragmented());
        assert!(asm.is_empty());
    }

    #[test]
    fn test_assembler_discards_interrupted_group() {
        let mut asm = FragmentAssembler::new();
        asm.push(fragment(1, Some(1), "AAAA", 1));
        asm.push(fragment(1, Some(1), "BBBB", 2));
        assert_eq!(asm.discarded, 1);

        let done = asm.push(fragment(2, Some(1), "CCCC", 3)).unwrap();
        assert_eq!(done.payload, "BBBBCCCC");
    }

    #[test]
    fn test_assembler_orphan_fragment() {
        let mut asm = FragmentAssembler::new();
        assert!(asm.push(fragment(2, Some(5), "CCCC", 3)).is_none());
        assert!(asm.is_empty());
    }

    #[test]
    fn test_assembler_max_fragment_count() {
        let mut asm = FragmentAssembler::new();
        let mut done = None;
        for n in 1..=u8::MAX {
            let raw = RawLine {
                fragment_count: u8::MAX,
                ..fragment(n, Some(9), "1", i64::from(n))
            };
            done = asm.push(raw);
            if n < u8::MAX {
                assert!(done.is_none());
            }
        }
        let done = done.unwrap();
        assert_eq!(done.payload.len(), 255);
        assert_eq!(done.timestamp, 255);
        assert!(asm.is_empty());
    }

    #[test]
    fn test_parse_multipart_line() {
        let raw = parse_line("c:100 !AIVDM,2,1,7,A,55P5TL01VIaAL@7WKO@mBplU@<PDhh,0*5E").unwrap();
        assert_eq!(raw.fragment_count, 2);
        assert_eq!(raw.fragment_number, 1);
        assert_eq!(raw.sequence_id, Some(7));
        assert!(raw.is_fragmented());
    }
}
