//! Input text decoding for playlist files
//!
//! Playlists in the wild arrive in a handful of encodings; the BOM is the
//! only signal we trust. Anything without one is treated as UTF-8 with
//! lossy replacement so a stray byte never aborts a run.

use tracing::debug;

/// Decode playlist bytes into text, honoring a UTF-8, UTF-16 LE/BE or
/// UTF-32 BE byte-order mark and falling back to lossy UTF-8.
pub fn decode_playlist_bytes(bytes: &[u8]) -> String {
    if bytes.starts_with(&[0x00, 0x00, 0xFE, 0xFF]) {
        debug!("Decoding playlist as UTF-32 BE (BOM)");
        return decode_utf32_be(&bytes[4..]);
    }
    if bytes.starts_with(&[0xFE, 0xFF]) {
        debug!("Decoding playlist as UTF-16 BE (BOM)");
        return decode_utf16(&bytes[2..], u16::from_be_bytes);
    }
    if bytes.starts_with(&[0xFF, 0xFE]) {
        debug!("Decoding playlist as UTF-16 LE (BOM)");
        return decode_utf16(&bytes[2..], u16::from_le_bytes);
    }
    let body = bytes.strip_prefix(&[0xEF, 0xBB, 0xBF]).unwrap_or(bytes);
    String::from_utf8_lossy(body).into_owned()
}

fn decode_utf16(bytes: &[u8], combine: fn([u8; 2]) -> u16) -> String {
    let units: Vec<u16> = bytes
        .chunks_exact(2)
        .map(|pair| combine([pair[0], pair[1]]))
        .collect();
    char::decode_utf16(units)
        .map(|r| r.unwrap_or(char::REPLACEMENT_CHARACTER))
        .collect()
}

fn decode_utf32_be(bytes: &[u8]) -> String {
    bytes
        .chunks_exact(4)
        .map(|quad| {
            let value = u32::from_be_bytes([quad[0], quad[1], quad[2], quad[3]]);
            char::from_u32(value).unwrap_or(char::REPLACEMENT_CHARACTER)
        })
        .collect()
}
