//! UTF-8 ⇆ UCS-2LE transcoding.
//!
//! UEFI strings are UCS-2, not UTF-16: every character is exactly one 16-bit
//! code unit and surrogate pairs do not exist. Characters outside the Basic
//! Multilingual Plane therefore cannot be represented and are rejected.

use crate::error::{Error, Result};

/// Encode a string as UCS-2LE without a terminator.
///
/// Rejects embedded NUL (it would terminate the string early on the wire)
/// and characters outside the BMP.
pub fn encode(s: &str) -> Result<Vec<u8>> {
    let mut out = Vec::with_capacity(s.len() * 2);
    for c in s.chars() {
        let v = u32::from(c);
        if v == 0 {
            return Err(Error::invalid("embedded NUL in UCS-2 string"));
        }
        if v > 0xFFFF {
            return Err(Error::Invalid(format!(
                "character {c:?} is outside the Basic Multilingual Plane"
            )));
        }
        out.extend_from_slice(&(v as u16).to_le_bytes());
    }
    Ok(out)
}

/// Encode a string as UCS-2LE with a trailing NUL code unit.
pub fn encode_with_nul(s: &str) -> Result<Vec<u8>> {
    let mut out = encode(s)?;
    out.extend_from_slice(&[0, 0]);
    Ok(out)
}

/// Decode UCS-2LE bytes (no terminator) into a string.
///
/// An odd byte count or a code unit that does not map to a scalar value is
/// malformed input.
pub fn decode(bytes: &[u8]) -> Result<String> {
    if bytes.len() % 2 != 0 {
        return Err(Error::invalid("odd byte count in UCS-2 string"));
    }
    let units: Vec<u16> = bytes
        .chunks_exact(2)
        .map(|c| u16::from_le_bytes([c[0], c[1]]))
        .collect();
    String::from_utf16(&units).map_err(|_| Error::invalid("invalid UCS-2 code unit"))
}

/// Byte offset of the first NUL code unit (aligned u16 pair) in `bytes`.
pub fn find_nul(bytes: &[u8]) -> Option<usize> {
    bytes
        .chunks_exact(2)
        .position(|c| c == [0, 0])
        .map(|i| i * 2)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encodes_with_terminator() {
        let expected = vec![0x46, 0x00, 0x65, 0x00, 0x64, 0x00, 0x00, 0x00];
        assert_eq!(encode_with_nul("Fed").unwrap(), expected);
    }

    #[test]
    fn round_trips() {
        let text = "Fedora (Workstation)";
        let bytes = encode(text).unwrap();
        assert_eq!(decode(&bytes).unwrap(), text);
    }

    #[test]
    fn rejects_non_bmp() {
        assert!(encode("boot \u{1F980}").is_err());
    }

    #[test]
    fn rejects_embedded_nul() {
        assert!(encode("a\0b").is_err());
    }

    #[test]
    fn rejects_odd_length() {
        assert!(decode(&[0x46, 0x00, 0x65]).is_err());
    }

    #[test]
    fn finds_terminator() {
        let bytes = [0x41, 0x00, 0x00, 0x00, 0x42, 0x00];
        assert_eq!(find_nul(&bytes), Some(2));
        assert_eq!(find_nul(&bytes[4..]), None);
    }
}
