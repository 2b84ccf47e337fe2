//! Body buffering.
//!
//! # Responsibilities
//! - Drain a streamed body into one contiguous buffer (`capture`)
//! - Re-emit the buffered bytes as a fresh body (`replay`)
//! - Decode buffered bytes using the declared charset
//!
//! # Design Decisions
//! - `capture` suspends the caller until the stream ends; nothing downstream
//!   runs while bytes are still arriving
//! - A stream error discards the partial buffer and surfaces as
//!   `GatewayError::StreamRead`
//! - Dropping a pending `capture` (client went away) frees the partial buffer
//! - Replay emits a single chunk regardless of the original chunking

use std::borrow::Cow;

use axum::body::{Body, Bytes};
use axum::http::{header, HeaderMap};
use futures_util::StreamExt;

use crate::error::{GatewayError, GatewayResult};

/// Character encoding tag attached to a captured body.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Charset {
    #[default]
    Utf8,
    Latin1,
    /// Any other label; decoded as lossy UTF-8.
    Other(String),
}

impl Charset {
    /// Resolve a charset label (`utf-8`, `ISO-8859-1`, ...).
    pub fn from_label(label: &str) -> Self {
        let label = label.trim().trim_matches('"').to_ascii_lowercase();
        match label.as_str() {
            "utf-8" | "utf8" => Charset::Utf8,
            "iso-8859-1" | "latin1" | "latin-1" | "iso8859-1" => Charset::Latin1,
            _ => Charset::Other(label),
        }
    }

    /// Read the `charset` parameter of the `Content-Type` header, falling
    /// back to UTF-8.
    pub fn from_headers(headers: &HeaderMap) -> Self {
        headers
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .and_then(|ct| {
                ct.split(';').skip(1).find_map(|param| {
                    let (name, value) = param.split_once('=')?;
                    name.trim()
                        .eq_ignore_ascii_case("charset")
                        .then(|| Charset::from_label(value))
                })
            })
            .unwrap_or_default()
    }

    /// Decode bytes to text in this charset.
    pub fn decode<'a>(&self, bytes: &'a [u8]) -> Cow<'a, str> {
        match self {
            Charset::Latin1 => Cow::Owned(bytes.iter().map(|&b| b as char).collect()),
            Charset::Utf8 | Charset::Other(_) => String::from_utf8_lossy(bytes),
        }
    }
}

/// A fully buffered body. Immutable once captured.
#[derive(Debug, Clone)]
pub struct CapturedBody {
    bytes: Bytes,
    charset: Charset,
}

impl CapturedBody {
    pub fn bytes(&self) -> &Bytes {
        &self.bytes
    }

    pub fn charset(&self) -> &Charset {
        &self.charset
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Body text decoded with the captured charset.
    pub fn text(&self) -> Cow<'_, str> {
        self.charset.decode(&self.bytes)
    }

    /// Give up the buffer.
    pub fn into_bytes(self) -> Bytes {
        self.bytes
    }
}

/// Buffers streamed bodies up to a byte limit.
#[derive(Debug, Clone, Copy)]
pub struct BodyBuffer {
    max_bytes: usize,
}

impl BodyBuffer {
    pub fn new(max_bytes: usize) -> Self {
        Self { max_bytes }
    }

    /// A buffer without a practical size limit.
    pub fn unbounded() -> Self {
        Self::new(usize::MAX)
    }

    pub fn max_bytes(&self) -> usize {
        self.max_bytes
    }

    /// Consume the whole stream and return its bytes. Never returns a
    /// partial result.
    pub async fn capture(&self, body: Body, charset: Charset) -> GatewayResult<CapturedBody> {
        // Not `axum::body::to_bytes`: its error does not separate an
        // exceeded limit from a failed stream.
        let mut stream = body.into_data_stream();
        let mut buf: Vec<u8> = Vec::new();

        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(GatewayError::StreamRead)?;
            if buf.len().saturating_add(chunk.len()) > self.max_bytes {
                return Err(GatewayError::BodyTooLarge {
                    limit: self.max_bytes,
                });
            }
            buf.extend_from_slice(&chunk);
        }

        Ok(CapturedBody {
            bytes: Bytes::from(buf),
            charset,
        })
    }

    /// Emit the captured bytes as a new body. An empty capture replays as
    /// an empty body.
    pub fn replay(captured: &CapturedBody) -> Body {
        if captured.is_empty() {
            Body::empty()
        } else {
            Body::from(captured.bytes.clone())
        }
    }
}

impl Default for BodyBuffer {
    fn default() -> Self {
        Self::unbounded()
    }
}
