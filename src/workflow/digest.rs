//! Integrity records stored beside every artifact file
//!
//! A digest record is a sibling file named `<file>.blake3` holding the
//! lowercase hex BLAKE3 hash of the file.

use std::fs;
use std::io;
use std::path::Path;

pub const DIGEST_EXTENSION: &str = "blake3";

/// Returns the digest record path for a file path
pub fn digest_path(item: &str) -> String {
    format!("{}.{}", item, DIGEST_EXTENSION)
}

pub fn digest_bytes(bytes: &[u8]) -> String {
    blake3::hash(bytes).to_hex().to_string()
}

pub fn digest_file(path: &Path) -> io::Result<String> {
    Ok(digest_bytes(&fs::read(path)?))
}

/// Extracts the digest from a record. Anything after the first
/// whitespace-separated token is ignored.
pub fn parse_digest(contents: &str) -> Option<String> {
    let token = contents.split_whitespace().next()?.to_ascii_lowercase();
    if token.len() == 64 && token.chars().all(|c| c.is_ascii_hexdigit()) {
        Some(token)
    } else {
        None
    }
}
