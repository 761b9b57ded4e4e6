use thiserror::Error;

/// Errors raised while decoding client-supplied binary or text structures.
///
/// Every decoder in this crate reports malformed input through this type
/// instead of truncating or panicking. Variants carry enough context to tell
/// which field was at fault.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    /// The buffer ended before a fixed-size or length-prefixed field.
    #[error("{field} truncated: needed {needed} bytes, {available} available")]
    Truncated {
        /// Name of the field being read.
        field: &'static str,
        /// Bytes the field requires.
        needed: usize,
        /// Bytes left in the buffer.
        available: usize,
    },

    /// The input is not well-formed CBOR.
    #[error("invalid CBOR: {0}")]
    Cbor(String),

    /// Bytes were left over after a complete structure was decoded.
    #[error("{0} trailing bytes after {1}")]
    TrailingBytes(usize, &'static str),

    /// A required map entry is absent.
    #[error("missing {0}")]
    MissingField(&'static str),

    /// A map entry is present with the wrong CBOR type.
    #[error("unexpected type for {0}")]
    UnexpectedType(&'static str),

    /// An elliptic-curve coordinate does not have the expected length.
    #[error("COSE coordinate {label} must be {expected} bytes, got {actual}")]
    CoordinateLength {
        /// COSE label of the coordinate (-2 for x, -3 for y).
        label: i64,
        /// Required length.
        expected: usize,
        /// Length found.
        actual: usize,
    },

    /// A field is too long for its length prefix.
    #[error("{field} is {actual} bytes, at most {max} fit")]
    TooLong {
        /// Name of the field being written.
        field: &'static str,
        /// Largest length the prefix can express.
        max: usize,
        /// Length of the field.
        actual: usize,
    },

    /// Base64 or base64url text could not be decoded.
    #[error("invalid base64: {0}")]
    Base64(String),

    /// PEM framing is missing or inconsistent.
    #[error("invalid PEM: {0}")]
    Pem(String),

    /// JSON text could not be decoded.
    #[error("invalid JSON: {0}")]
    Json(String),

    /// Public key bytes are malformed or use an unsupported algorithm.
    #[error("invalid key material: {0}")]
    KeyMaterial(String),

    /// An X.509 certificate could not be decoded.
    #[error("invalid certificate: {0}")]
    Certificate(String),
}

impl From<base64::DecodeError> for ParseError {
    fn from(value: base64::DecodeError) -> Self {
        ParseError::Base64(value.to_string())
    }
}
