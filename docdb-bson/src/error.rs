//! Codec error types.

use thiserror::Error;

/// Errors raised while encoding or decoding documents.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CodecError {
    #[error("truncated document: need {needed} more bytes")]
    Truncated { needed: usize },

    #[error("invalid length prefix: {0}")]
    InvalidLength(i32),

    #[error("length prefix {declared} does not match buffer length {actual}")]
    LengthMismatch { declared: usize, actual: usize },

    #[error("missing document terminator")]
    MissingTerminator,

    #[error("unknown element type {tag:#04x} for key '{key}'")]
    UnknownType { tag: u8, key: String },

    #[error("invalid UTF-8 in {0}")]
    InvalidUtf8(&'static str),

    #[error("invalid boolean byte: {0:#04x}")]
    InvalidBoolean(u8),

    #[error("{0} contains an interior NUL byte")]
    InteriorNul(&'static str),

    #[error("document too large: {size} bytes (max {max})")]
    DocumentTooLarge { size: usize, max: usize },

    #[error("nesting deeper than {0} levels")]
    TooDeep(usize),

    #[error("invalid object id: {0}")]
    InvalidObjectId(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codec_error_display() {
        let err = CodecError::Truncated { needed: 7 };
        assert!(err.to_string().contains('7'));

        let err = CodecError::UnknownType {
            tag: 0x42,
            key: "weird".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("0x42"));
        assert!(msg.contains("weird"));

        let err = CodecError::InteriorNul("key");
        assert!(err.to_string().contains("NUL"));

        let err = CodecError::DocumentTooLarge { size: 100, max: 50 };
        assert!(err.to_string().contains("100"));

        let err = CodecError::InvalidUtf8("string value");
        assert!(err.to_string().contains("UTF-8"));
    }
}
