//! Raw payload codec
//!
//! The untouched provider response is stored next to each cache entry for
//! diagnostics, as gzip + base64 text. Nothing ever depends on it to serve
//! weather, so neither direction is allowed to fail:
//!
//! - [`PayloadCodec::compress`] falls back to plain JSON when compression
//!   breaks, and to `None` only when the value cannot be serialized at all.
//! - [`PayloadCodec::decompress`] falls back to a plain JSON parse and then
//!   to [`DecodedPayload::Unavailable`].

use std::io::{Read, Write};

use base64::{Engine, engine::general_purpose::STANDARD};
use flate2::{Compression, read::GzDecoder, write::GzEncoder};
use serde::{Serialize, Serializer};
use tracing::{debug, warn};

/// Outcome of decoding a stored diagnostic blob
#[derive(Debug, Clone, PartialEq)]
pub enum DecodedPayload {
    /// The blob decoded to JSON
    Decoded(serde_json::Value),
    /// No usable payload
    Unavailable,
}

impl DecodedPayload {
    /// Decoded JSON, if any
    #[must_use]
    pub const fn as_json(&self) -> Option<&serde_json::Value> {
        match self {
            Self::Decoded(value) => Some(value),
            Self::Unavailable => None,
        }
    }

    /// Whether a payload was recovered
    #[must_use]
    pub const fn is_available(&self) -> bool {
        matches!(self, Self::Decoded(_))
    }
}

impl Serialize for DecodedPayload {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Decoded(value) => value.serialize(serializer),
            Self::Unavailable => serializer.serialize_str("unavailable"),
        }
    }
}

/// Errors inside the codec; never leave this module
#[derive(Debug, thiserror::Error)]
enum CodecError {
    #[error("serialize: {0}")]
    Json(#[from] serde_json::Error),
    #[error("gzip: {0}")]
    Io(#[from] std::io::Error),
    #[error("base64: {0}")]
    Base64(#[from] base64::DecodeError),
}

/// Best-effort gzip/base64 codec for diagnostic payloads
#[derive(Debug, Clone, Copy, Default)]
pub struct PayloadCodec;

impl PayloadCodec {
    /// Serialize, gzip and base64-encode a value
    ///
    /// Returns the plain JSON text if compression fails, or `None` if the
    /// value cannot be serialized.
    #[must_use]
    pub fn compress<T: Serialize + ?Sized>(value: &T) -> Option<String> {
        let json = match serde_json::to_vec(value) {
            Ok(json) => json,
            Err(e) => {
                warn!(error = %e, "Raw payload not serializable, storing none");
                return None;
            },
        };

        match Self::gzip_base64(&json) {
            Ok(blob) => {
                debug!(
                    plain_bytes = json.len(),
                    compressed_bytes = blob.len(),
                    "Compressed raw payload"
                );
                Some(blob)
            },
            Err(e) => {
                warn!(error = %e, "Payload compression failed, storing plain JSON");
                Self::plain_json_fallback(json)
            },
        }
    }

    /// Decode a blob written by [`Self::compress`]
    ///
    /// Accepts both compressed blobs and plain-JSON fallbacks.
    #[must_use]
    pub fn decompress(blob: &str) -> DecodedPayload {
        match Self::gunzip_base64(blob) {
            Ok(value) => DecodedPayload::Decoded(value),
            Err(e) => {
                debug!(error = %e, "Blob is not gzip/base64, trying plain JSON");
                Self::parse_plain_json(blob)
            },
        }
    }

    /// Store JSON text uncompressed when gzip/base64 failed
    fn plain_json_fallback(json: Vec<u8>) -> Option<String> {
        String::from_utf8(json).ok()
    }

    /// Interpret a blob as plain JSON, or give up
    fn parse_plain_json(blob: &str) -> DecodedPayload {
        serde_json::from_str(blob).map_or_else(
            |e| {
                warn!(error = %e, "Raw payload unreadable");
                DecodedPayload::Unavailable
            },
            DecodedPayload::Decoded,
        )
    }

    fn gzip_base64(json: &[u8]) -> Result<String, CodecError> {
        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(json)?;
        let compressed = encoder.finish()?;
        Ok(STANDARD.encode(compressed))
    }

    fn gunzip_base64(blob: &str) -> Result<serde_json::Value, CodecError> {
        let compressed = STANDARD.decode(blob.trim())?;
        let mut json = Vec::new();
        GzDecoder::new(compressed.as_slice()).read_to_end(&mut json)?;
        Ok(serde_json::from_slice(&json)?)
    }
}
