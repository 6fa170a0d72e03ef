//! 6-bit payload armoring and the bitstream it decodes into.
//!
//! Each armored character carries six bits:
//! - `'0'..='W'` → 0-39 (code point minus 48)
//! - `` '`'..='w' `` → 40-63 (code point minus 56)
//!
//! Anything else is fill or capture noise and is skipped. Fields are read
//! most-significant bit first with inclusive-exclusive bit offsets.

/// Punctuation for text values 37..=42.
const TEXT_PUNCTUATION: &[u8; 6] = b"@[\\]^_";

/// Character for a 6-bit text value.
///
/// 1-26 are `A-Z`, 27-36 are `0-9`, 37-42 are `@[\]^_`. Value 0 terminates
/// the field and everything above 42 is dropped.
pub fn text_char(value: u8) -> Option<char> {
    match value {
        1..=26 => Some((b'A' + value - 1) as char),
        27..=36 => Some((b'0' + value - 27) as char),
        37..=42 => Some(TEXT_PUNCTUATION[(value - 37) as usize] as char),
        _ => None,
    }
}

/// 6-bit text value for a character, the inverse of [`text_char`].
pub fn text_value(c: char) -> Option<u8> {
    let c = c.to_ascii_uppercase();
    match c {
        'A'..='Z' => Some(c as u8 - b'A' + 1),
        '0'..='9' => Some(c as u8 - b'0' + 27),
        _ => TEXT_PUNCTUATION
            .iter()
            .position(|&p| p as char == c)
            .map(|i| i as u8 + 37),
    }
}

/// Map one armored character to its 6-bit value.
pub fn dearmor(c: u8) -> Option<u8> {
    match c {
        b'0'..=b'W' => Some(c - 48),
        b'`'..=b'w' => Some(c - 56),
        _ => None,
    }
}

/// Map a 6-bit value back to its armored character.
pub fn armor(value: u8) -> Option<u8> {
    match value {
        0..=39 => Some(value + 48),
        40..=63 => Some(value + 56),
        _ => None,
    }
}

/// Decoded payload bits, stored as one 6-bit symbol per armored character.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Bitstream {
    symbols: Vec<u8>,
}

impl Bitstream {
    /// Decode an armored payload. Never fails; invalid characters are skipped.
    pub fn from_payload(payload: &str) -> Self {
        Bitstream {
            symbols: payload.bytes().filter_map(dearmor).collect(),
        }
    }

    /// Build from raw 6-bit symbols (values above 63 are masked).
    pub fn from_symbols(symbols: &[u8]) -> Self {
        Bitstream {
            symbols: symbols.iter().map(|s| s & 0x3F).collect(),
        }
    }

    /// Length in bits (always a multiple of 6).
    pub fn len(&self) -> usize {
        self.symbols.len() * 6
    }

    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }

    pub fn symbols(&self) -> &[u8] {
        &self.symbols
    }

    /// Single bit at `index`. Out-of-range bits read as 0.
    pub fn bit(&self, index: usize) -> bool {
        match self.symbols.get(index / 6) {
            Some(sym) => (sym >> (5 - index % 6)) & 1 == 1,
            None => false,
        }
    }

    /// Unsigned big-endian field over `[start, end)`. At most 64 bits.
    pub fn uint(&self, start: usize, end: usize) -> u64 {
        debug_assert!(end >= start && end - start <= 64);
        (start..end).fold(0u64, |acc, i| (acc << 1) | self.bit(i) as u64)
    }

    /// Two's-complement field over `[start, end)`.
    pub fn int(&self, start: usize, end: usize) -> i64 {
        let width = end - start;
        let raw = self.uint(start, end);
        if width == 0 || width >= 64 {
            return raw as i64;
        }
        sign_extend(raw, width as u32)
    }

    /// 6-bit text over `[start, end)`.
    ///
    /// Stops at the first value 0, skips values with no character, and trims
    /// trailing whitespace.
    pub fn text(&self, start: usize, end: usize) -> String {
        let mut text = String::with_capacity((end - start) / 6);
        let mut pos = start;
        while pos + 6 <= end {
            let value = self.uint(pos, pos + 6) as u8;
            if value == 0 {
                break;
            }
            text.extend(text_char(value));
            pos += 6;
        }
        text.trim_end().to_string()
    }

    /// Re-armor the symbols.
    pub fn to_payload(&self) -> String {
        self.symbols
            .iter()
            .filter_map(|&s| armor(s))
            .map(char::from)
            .collect()
    }
}

/// Sign-extend the low `width` bits of `raw`.
pub fn sign_extend(raw: u64, width: u32) -> i64 {
    let shift = 64 - width;
    ((raw << shift) as i64) >> shift
}

// ---------------------------------------------------------------------------
// Bit packing (used to build payloads)
// ---------------------------------------------------------------------------

/// Accumulates fields MSB-first and packs them into 6-bit symbols.
#[derive(Debug, Default)]
pub struct BitWriter {
    bits: Vec<bool>,
}

impl BitWriter {
    pub fn new() -> Self {
        BitWriter::default()
    }

    /// Append the low `width` bits of `value`.
    pub fn push(&mut self, value: u64, width: usize) -> &mut Self {
        for i in (0..width as u32).rev() {
            self.bits.push(value.checked_shr(i).unwrap_or(0) & 1 == 1);
        }
        self
    }

    /// Append `text` as 6-bit characters, zero-padded to `chars`.
    ///
    /// Characters outside the text alphabet are left out.
    pub fn push_text(&mut self, text: &str, chars: usize) -> &mut Self {
        let mut values = text.chars().filter_map(text_value);
        for _ in 0..chars {
            let v = values.next().unwrap_or(0);
            self.push(v as u64, 6);
        }
        self
    }

    pub fn len(&self) -> usize {
        self.bits.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bits.is_empty()
    }

    /// Pack into a bitstream, zero-padding the final symbol.
    pub fn finish(&self) -> Bitstream {
        let symbols = self
            .bits
            .chunks(6)
            .map(|chunk| {
                chunk
                    .iter()
                    .chain(std::iter::repeat(&false))
                    .take(6)
                    .fold(0u8, |acc, &b| (acc << 1) | b as u8)
            })
            .collect::<Vec<_>>();
        Bitstream { symbols }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dearmor_ranges() {
        assert_eq!(dearmor(b'0'), Some(0));
        assert_eq!(dearmor(b'9'), Some(9));
        assert_eq!(dearmor(b'@'), Some(16));
        assert_eq!(dearmor(b'A'), Some(17));
        assert_eq!(dearmor(b'W'), Some(39));
        assert_eq!(dearmor(b'`'), Some(40));
        assert_eq!(dearmor(b'a'), Some(41));
        assert_eq!(dearmor(b'w'), Some(63));
    }

    #[test]
    fn test_dearmor_rejects_outside_ranges() {
        for c in [b'X', b'Z', b'_', b'x', b'!', b',', b'*', b' ', b'/'] {
            assert!(dearmor(c).is_none(), "{} should be skipped", c as char);
        }
    }

    #[test]
    fn test_armor_roundtrip_all_values() {
        for v in 0..64u8 {
            let c = armor(v).unwrap();
            assert_eq!(dearmor(c), Some(v));
        }
        assert!(armor(64).is_none());
    }

    #[test]
    fn test_invalid_characters_skipped() {
        let clean = Bitstream::from_payload("15M67F");
        let noisy = Bitstream::from_payload("15 M6,7xF");
        assert_eq!(clean, noisy);
        assert_eq!(clean.len(), 36);
    }

    #[test]
    fn test_empty_payload() {
        let bits = Bitstream::from_payload("");
        assert!(bits.is_empty());
        assert_eq!(bits.len(), 0);
        assert_eq!(Bitstream::from_payload("xyz~").len(), 0);
    }

    #[test]
    fn test_uint_msb_first() {
        // '1' = 000001, 'w' = 111111
        let bits = Bitstream::from_payload("1w");
        assert_eq!(bits.uint(0, 6), 1);
        assert_eq!(bits.uint(6, 12), 63);
        assert_eq!(bits.uint(4, 8), 0b0111);
        assert!(bits.bit(5));
        assert!(!bits.bit(4));
        assert!(!bits.bit(100));
    }

    #[test]
    fn test_signed_field() {
        let mut w = BitWriter::new();
        w.push((-5i64 as u64) & 0xFF, 8).push(5, 8);
        let bits = w.finish();
        assert_eq!(bits.int(0, 8), -5);
        assert_eq!(bits.int(8, 16), 5);
    }

    #[test]
    fn test_sign_extend() {
        assert_eq!(sign_extend(0x7FFFFFF, 27), -1);
        assert_eq!(sign_extend(0x3FFFFFF, 27), 0x3FFFFFF);
        assert_eq!(sign_extend(0x8000000, 28), -0x8000000);
    }

    #[test]
    fn test_text_stops_at_terminator() {
        let mut w = BitWriter::new();
        w.push_text("MV42", 8);
        let bits = w.finish();
        assert_eq!(bits.text(0, 48), "MV42");

        let bits = Bitstream::from_symbols(&[1, 2, 0, 3]);
        assert_eq!(bits.text(0, 24), "AB");
    }

    #[test]
    fn test_text_alphabet() {
        let bits = Bitstream::from_symbols(&[27, 28, 36, 37]);
        assert_eq!(bits.text(0, 24), "019@");

        let bits = Bitstream::from_symbols(&[1, 26, 38, 39, 40, 41, 42]);
        assert_eq!(bits.text(0, 42), "AZ[\\]^_");

        // 32 sits inside the digit range
        assert_eq!(text_char(32), Some('5'));
    }

    #[test]
    fn test_text_skips_unmapped_values() {
        let bits = Bitstream::from_symbols(&[1, 43, 50, 63, 2]);
        assert_eq!(bits.text(0, 30), "AB");
        assert!(text_char(0).is_none());
    }

    #[test]
    fn test_text_value_inverse() {
        for v in 1..=42u8 {
            assert_eq!(text_value(text_char(v).unwrap()), Some(v));
        }
        assert_eq!(text_value('q'), Some(17));
        assert!(text_value(' ').is_none());
    }

    #[test]
    fn test_writer_pads_final_symbol() {
        let mut w = BitWriter::new();
        w.push(0b101, 3);
        let bits = w.finish();
        assert_eq!(bits.len(), 6);
        assert_eq!(bits.uint(0, 6), 0b101000);
    }

    #[test]
    fn test_payload_roundtrip() {
        let payload = "24SR`F0000QPgE0OoVBUUrUj0@R9";
        assert_eq!(Bitstream::from_payload(payload).to_payload(), payload);
    }
}
