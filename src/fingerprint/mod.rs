//! Suggestion identity and file content hashing.
//!
//! A fingerprint identifies a suggestion by where it points and what it is
//! about; a content hash identifies the exact bytes of a file. The baseline
//! store combines the two to decide whether a suggestion has already been
//! surfaced against an unchanged file.

use std::path::Path;

use sha2::{Digest, Sha256};

/// Delimiter joining the fingerprint components.
const DELIMITER: char = ':';

/// Compute the deterministic identity key for a suggestion.
///
/// Two comments with identical path, line, and title are the same
/// suggestion even if their body text or severity differ.
pub fn fingerprint(path: &str, line: u32, title: &str) -> String {
    format!("{path}{DELIMITER}{line}{DELIMITER}{title}")
}

/// SHA-256 hex digest of a file's current bytes.
///
/// Returns an empty string (never an error) when the file cannot be read.
/// Callers must treat empty as "unknown", never as "matches".
pub fn content_hash(path: &Path) -> String {
    match std::fs::read(path) {
        Ok(bytes) => {
            let mut hasher = Sha256::new();
            hasher.update(&bytes);
            hex::encode(hasher.finalize())
        }
        Err(_) => String::new(),
    }
}

/// SHA-256 hex digest of a string, used for idempotence markers.
pub fn checksum(content: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    hex::encode(hasher.finalize())
}
