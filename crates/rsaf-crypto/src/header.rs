//! RSAF header codec and format validator
//!
//! Fixed 32-byte header, little-endian throughout:
//!
//! ```text
//! offset  size  field
//!      0     4  magic "RSAF"
//!      4     2  version (this crate writes 1)
//!      6     2  filename byte length
//!      8     8  original plaintext size
//!     16     4  plaintext chunk count
//!     20    12  reserved, zeroed by encoders, ignored by decoders
//! ```
//!
//! The filename follows immediately, UTF-8 with Latin-1 fallback on decode,
//! not null-terminated. Parsing is non-throwing: anything that is not an
//! RSAF file yields `None` so callers can branch without error handling.

use serde::Serialize;
use std::fs::File;
use std::io::Read;
use std::path::Path;
use tracing::debug;

use rsaf_core::{RsafError, RsafResult};

pub const RSAF_MAGIC: [u8; 4] = *b"RSAF";
pub const RSAF_VERSION: u16 = 1;
pub const HEADER_SIZE: usize = 32;

/// Fixed-size fields of a decoded header, before the filename is read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawHeader {
    pub version: u16,
    pub filename_len: u16,
    pub file_size: u64,
    pub block_count: u32,
}

/// Parsed metadata for a candidate RSAF file, obtained without touching
/// ciphertext.
#[derive(Debug, Clone, Serialize)]
pub struct Metadata {
    pub version: u16,
    pub filename: String,
    /// On-disk byte length of the filename field (authoritative; may differ
    /// from `filename.len()` after a Latin-1 fallback)
    pub filename_len: u16,
    pub file_size: u64,
    pub block_count: u32,
    pub total_size: u64,
}

/// Build the header followed by the encoded filename.
pub fn encode_header(filename: &str, file_size: u64, block_count: u32) -> RsafResult<Vec<u8>> {
    let name = filename.as_bytes();
    let name_len = u16::try_from(name.len()).map_err(|_| {
        RsafError::Encoding(format!(
            "filename too long: {} bytes (limit {})",
            name.len(),
            u16::MAX
        ))
    })?;

    let mut out = Vec::with_capacity(HEADER_SIZE + name.len());
    out.extend_from_slice(&RSAF_MAGIC);
    out.extend_from_slice(&RSAF_VERSION.to_le_bytes());
    out.extend_from_slice(&name_len.to_le_bytes());
    out.extend_from_slice(&file_size.to_le_bytes());
    out.extend_from_slice(&block_count.to_le_bytes());
    out.extend_from_slice(&[0u8; 12]);
    out.extend_from_slice(name);
    Ok(out)
}

/// Parse the fixed 32-byte prefix. `None` on short input, magic mismatch,
/// or unsupported version.
pub fn decode_header(bytes: &[u8]) -> Option<RawHeader> {
    if bytes.len() < HEADER_SIZE {
        return None;
    }
    if bytes[..4] != RSAF_MAGIC {
        debug!("magic mismatch: {:02x?}", &bytes[..4]);
        return None;
    }

    let version = u16::from_le_bytes([bytes[4], bytes[5]]);
    if version != RSAF_VERSION {
        debug!(version, "unsupported RSAF version");
        return None;
    }

    Some(RawHeader {
        version,
        filename_len: u16::from_le_bytes([bytes[6], bytes[7]]),
        file_size: u64::from_le_bytes(bytes[8..16].try_into().ok()?),
        block_count: u32::from_le_bytes(bytes[16..20].try_into().ok()?),
    })
}

/// Decode the filename field: UTF-8, degrading to Latin-1. A malformed
/// name never fails a decode.
pub fn decode_filename(bytes: &[u8]) -> String {
    match std::str::from_utf8(bytes) {
        Ok(s) => s.to_owned(),
        Err(_) => bytes.iter().map(|&b| b as char).collect(),
    }
}

/// Probe a candidate file: read the header-sized prefix and the filename,
/// returning parsed metadata. `None` for anything that is not a valid RSAF
/// file (short file, bad magic, unknown version, truncated filename field).
pub fn validate_file(path: &Path) -> Option<Metadata> {
    let mut file = File::open(path).ok()?;

    let mut header = [0u8; HEADER_SIZE];
    file.read_exact(&mut header).ok()?;
    let raw = decode_header(&header)?;

    let mut name = vec![0u8; raw.filename_len as usize];
    file.read_exact(&mut name).ok()?;

    let total_size = file.metadata().ok()?.len();

    Some(Metadata {
        version: raw.version,
        filename: decode_filename(&name),
        filename_len: raw.filename_len,
        file_size: raw.file_size,
        block_count: raw.block_count,
        total_size,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_decode_roundtrip() {
        let bytes = encode_header("photo.jpg", 123_456, 650).unwrap();
        assert_eq!(bytes.len(), HEADER_SIZE + "photo.jpg".len());

        let raw = decode_header(&bytes).unwrap();
        assert_eq!(raw.version, RSAF_VERSION);
        assert_eq!(raw.filename_len, 9);
        assert_eq!(raw.file_size, 123_456);
        assert_eq!(raw.block_count, 650);
        assert_eq!(decode_filename(&bytes[HEADER_SIZE..]), "photo.jpg");
    }

    #[test]
    fn test_reserved_bytes_are_zeroed() {
        let bytes = encode_header("a", 1, 1).unwrap();
        assert_eq!(&bytes[20..32], &[0u8; 12]);
    }

    #[test]
    fn test_short_input_rejected() {
        assert!(decode_header(&[]).is_none());
        assert!(decode_header(&[0u8; 31]).is_none());
    }

    #[test]
    fn test_bad_magic_rejected() {
        let mut bytes = encode_header("f", 10, 1).unwrap();
        bytes[0] = b'X';
        assert!(decode_header(&bytes).is_none());
    }

    #[test]
    fn test_unsupported_version_rejected() {
        let mut bytes = encode_header("f", 10, 1).unwrap();
        bytes[4] = 2;
        assert!(decode_header(&bytes).is_none());
    }

    #[test]
    fn test_filename_too_long_rejected() {
        let name = "x".repeat(u16::MAX as usize + 1);
        let result = encode_header(&name, 0, 0);
        assert!(matches!(result, Err(RsafError::Encoding(_))));
    }

    #[test]
    fn test_max_length_filename_accepted() {
        let name = "x".repeat(u16::MAX as usize);
        let bytes = encode_header(&name, 0, 0).unwrap();
        let raw = decode_header(&bytes).unwrap();
        assert_eq!(raw.filename_len, u16::MAX);
    }

    #[test]
    fn test_utf8_filename() {
        let bytes = encode_header("données.txt", 5, 1).unwrap();
        assert_eq!(decode_filename(&bytes[HEADER_SIZE..]), "données.txt");
    }

    #[test]
    fn test_latin1_fallback() {
        // 0xE9 is 'é' in Latin-1 but not valid standalone UTF-8
        let name = decode_filename(&[b'r', 0xE9, b's', b'u', b'm', 0xE9]);
        assert_eq!(name, "résumé");
    }

    #[test]
    fn test_validate_rejects_truncated_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("short.rsa");
        std::fs::write(&path, b"RSAF\x01\x00").unwrap();
        assert!(validate_file(&path).is_none());
    }

    #[test]
    fn test_validate_rejects_filename_past_eof() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cut.rsa");
        // Header declares a 20-byte filename, but the file ends after 4 of it
        let mut bytes = encode_header("name_of_20_bytes.txt", 10, 1).unwrap();
        bytes.truncate(HEADER_SIZE + 4);
        std::fs::write(&path, &bytes).unwrap();
        assert!(validate_file(&path).is_none());
    }

    #[test]
    fn test_validate_missing_file() {
        assert!(validate_file(Path::new("/nonexistent/file.rsa")).is_none());
    }

    #[test]
    fn test_validate_parses_metadata() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ok.rsa");
        let mut bytes = encode_header("doc.pdf", 400, 3).unwrap();
        bytes.extend_from_slice(&[0u8; 64]); // stand-in for ciphertext
        std::fs::write(&path, &bytes).unwrap();

        let meta = validate_file(&path).unwrap();
        assert_eq!(meta.version, 1);
        assert_eq!(meta.filename, "doc.pdf");
        assert_eq!(meta.filename_len, 7);
        assert_eq!(meta.file_size, 400);
        assert_eq!(meta.block_count, 3);
        assert_eq!(meta.total_size, (HEADER_SIZE + 7 + 64) as u64);
    }
}
