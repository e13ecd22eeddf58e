//! Error types for tile encoding operations.
//!
//! Malformed inputs (column length mismatches, out-of-range selection
//! indices, primitives without an instance-id attribute) are programming
//! errors and panic at the point of detection. Everything in this module is
//! a condition the caller can actually react to: a failing output stream, a
//! section that cannot be described by the 32-bit header fields, or an
//! unreadable configuration or tileset file.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Result type for tile encoding operations.
pub type TileResult<T> = Result<T, TileError>;

/// Errors that can occur while encoding tiles and tilesets.
#[derive(Debug, Error)]
pub enum TileError {
    /// Writing to (or seeking in) the output stream failed.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// A JSON section could not be serialized or parsed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// The scene payload could not be serialized into a binary container.
    #[error("Scene serialization failed: {0}")]
    Glb(String),

    /// A section (or the whole tile) does not fit in a 32-bit length field.
    #[error("Section '{section}' is too large: {len} bytes")]
    SectionTooLarge { section: &'static str, len: usize },

    /// Bytes handed to the header decoder are not a known tile.
    #[error("Invalid tile header: {0}")]
    InvalidHeader(String),

    /// A configuration value could not be parsed.
    #[error("Invalid configuration value for {key}: {value}")]
    Config { key: String, value: String },

    /// A configuration file could not be read.
    #[error("Failed to read config {path}: {reason}")]
    ConfigRead { path: PathBuf, reason: String },

    /// An external tileset document is missing required fields.
    #[error("Invalid tileset {path}: {reason}")]
    InvalidTileset { path: PathBuf, reason: String },
}

impl TileError {
    /// Create a configuration error for a key/value pair.
    pub fn config(key: impl Into<String>, value: impl Into<String>) -> Self {
        TileError::Config {
            key: key.into(),
            value: value.into(),
        }
    }
}

/// Convert a byte length into a 32-bit header field.
pub(crate) fn header_len(section: &'static str, len: usize) -> TileResult<u32> {
    u32::try_from(len).map_err(|_| TileError::SectionTooLarge { section, len })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_io_error_display() {
        let err: TileError = io::Error::new(io::ErrorKind::WriteZero, "disk full").into();
        assert_eq!(err.to_string(), "I/O error: disk full");
        assert!(matches!(err, TileError::Io(_)));
    }

    #[test]
    fn test_section_too_large_display() {
        let err = TileError::SectionTooLarge {
            section: "batch table binary",
            len: 5_000_000_000,
        };
        assert_eq!(
            err.to_string(),
            "Section 'batch table binary' is too large: 5000000000 bytes"
        );
    }

    #[test]
    fn test_config_error_display() {
        let err = TileError::config("tileset.refine", "SIDEWAYS");
        assert_eq!(
            err.to_string(),
            "Invalid configuration value for tileset.refine: SIDEWAYS"
        );
    }

    #[test]
    fn test_header_len_fits() {
        assert_eq!(header_len("feature table json", 1024).unwrap(), 1024);
    }

    #[cfg(target_pointer_width = "64")]
    #[test]
    fn test_header_len_overflow() {
        let result = header_len("payload", u32::MAX as usize + 1);
        assert!(matches!(
            result,
            Err(TileError::SectionTooLarge {
                section: "payload",
                ..
            })
        ));
    }
}
