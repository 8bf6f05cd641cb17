//! Error types for ucm

use std::io;
use thiserror::Error;

use crate::header::TypeTag;

/// Result type for ucm operations
pub type Result<T> = std::result::Result<T, UcmError>;

/// Errors that can occur while reading or writing ucm frames
#[derive(Debug, Error)]
pub enum UcmError {
    /// I/O error from the underlying stream
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// First four bytes match the magic number in neither byte order
    #[error("not a recognized frame file: magic bytes {found:02x?}")]
    BadMagic {
        /// The four bytes found at the start of the stream
        found: [u8; 4],
    },

    /// Header item carries a type code outside the type table
    #[error("unrecognized header type tag {tag} at offset {offset}")]
    UnknownTypeTag {
        /// Raw type code read from the stream
        tag: i32,
        /// Offset of the type code
        offset: u64,
    },

    /// Header item uses a type that is defined but not implemented
    #[error("header item '{name}' uses unsupported type '{tag}'")]
    UnsupportedType {
        /// The reserved tag
        tag: TypeTag,
        /// Name of the offending item
        name: String,
    },

    /// Window pixel payload uses an unknown `iout` selector
    #[error("unrecognized pixel encoding iout = {iout} at offset {offset}")]
    UnknownPixelEncoding {
        /// Raw selector read from the stream
        iout: i32,
        /// Offset of the selector
        offset: u64,
    },

    /// Stream ended in the middle of a field
    #[error("truncated stream at offset {offset} while reading {context}")]
    Truncated {
        /// Offset at which the short read started
        offset: u64,
        /// Field being read
        context: &'static str,
    },

    /// Structurally invalid content (negative counts, limits exceeded, bad text)
    #[error("invalid frame format at offset {offset}: {reason}")]
    InvalidFormat {
        /// Offset of the offending field
        offset: u64,
        /// What was wrong
        reason: String,
    },

    /// In-memory frame cannot be represented on the wire
    #[error("invalid frame: {0}")]
    InvalidFrame(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    ConfigError(String),
}

impl UcmError {
    /// True for errors meaning "this byte stream is not a valid frame".
    ///
    /// Unsupported types, I/O failures and configuration problems are not
    /// format errors.
    #[must_use]
    pub fn is_format_error(&self) -> bool {
        matches!(
            self,
            Self::BadMagic { .. }
                | Self::UnknownTypeTag { .. }
                | Self::UnknownPixelEncoding { .. }
                | Self::Truncated { .. }
                | Self::InvalidFormat { .. }
        )
    }

    /// True if a reserved header type was encountered
    #[must_use]
    pub fn is_unsupported(&self) -> bool {
        matches!(self, Self::UnsupportedType { .. })
    }

    pub(crate) fn invalid(offset: u64, reason: impl Into<String>) -> Self {
        Self::InvalidFormat {
            offset,
            reason: reason.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_classification() {
        let bad_magic = UcmError::BadMagic { found: [0; 4] };
        assert!(bad_magic.is_format_error());
        assert!(!bad_magic.is_unsupported());

        let unsupported = UcmError::UnsupportedType {
            tag: TypeTag::Date,
            name: "Obs.Date".to_string(),
        };
        assert!(unsupported.is_unsupported());
        assert!(!unsupported.is_format_error());

        let io = UcmError::from(io::Error::new(io::ErrorKind::Other, "disk"));
        assert!(!io.is_format_error());
    }

    #[test]
    fn test_error_messages_carry_context() {
        let err = UcmError::UnknownTypeTag { tag: 42, offset: 17 };
        let msg = err.to_string();
        assert!(msg.contains("42"));
        assert!(msg.contains("17"));

        let err = UcmError::UnsupportedType {
            tag: TypeTag::Telescope,
            name: "Site.Scope".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "header item 'Site.Scope' uses unsupported type 'telescope'"
        );
    }
}
