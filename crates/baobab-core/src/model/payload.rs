// ── Record payloads ──
//
// Data records may carry one binary attachment, transmitted base64-encoded
// with an optional MIME type. Decoding happens on first access.

use std::sync::OnceLock;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use bytes::Bytes;
use serde::Serialize;

use crate::error::CoreError;

/// Broad media class of a payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, strum::Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum PayloadKind {
    Image,
    Video,
    Audio,
    Text,
    Pdf,
    Binary,
}

impl PayloadKind {
    /// Classify a MIME type string. `None` when the type says nothing useful.
    pub fn from_mime(mime: &str) -> Option<Self> {
        let mime = mime.trim().to_ascii_lowercase();
        let essence = mime.split(';').next().unwrap_or_default();
        if essence.starts_with("image/") {
            Some(Self::Image)
        } else if essence.starts_with("video/") {
            Some(Self::Video)
        } else if essence.starts_with("audio/") {
            Some(Self::Audio)
        } else if essence == "application/pdf" {
            Some(Self::Pdf)
        } else if essence.starts_with("text/")
            || matches!(essence, "application/json" | "application/xml")
        {
            Some(Self::Text)
        } else {
            None
        }
    }

    /// Classify raw bytes by their leading signature.
    pub fn sniff(bytes: &[u8]) -> Self {
        const IMAGE_MAGIC: [&[u8]; 6] = [
            b"\x89PNG\r\n\x1a\n",
            b"\xff\xd8\xff",
            b"GIF87a",
            b"GIF89a",
            b"II*\0",
            b"MM\0*",
        ];
        const AUDIO_MAGIC: [&[u8]; 5] = [b"ID3", b"\xff\xfb", b"\xff\xf3", b"OggS", b"fLaC"];

        if bytes.starts_with(b"%PDF") {
            return Self::Pdf;
        }
        if IMAGE_MAGIC.iter().any(|m| bytes.starts_with(m)) {
            return Self::Image;
        }
        if AUDIO_MAGIC.iter().any(|m| bytes.starts_with(m)) {
            return Self::Audio;
        }
        if bytes.starts_with(b"RIFF") {
            return match bytes.get(8..12) {
                Some(b"WEBP") => Self::Image,
                Some(b"WAVE") => Self::Audio,
                Some(b"AVI ") => Self::Video,
                _ => Self::Binary,
            };
        }
        if bytes.get(4..8) == Some(&b"ftyp"[..]) {
            // ISO base media: M4A brands are audio, everything else video.
            return match bytes.get(8..11) {
                Some(b"M4A") => Self::Audio,
                _ => Self::Video,
            };
        }
        if bytes.starts_with(b"\x1a\x45\xdf\xa3") {
            return Self::Video;
        }
        if !bytes.is_empty() && !bytes.contains(&0) && std::str::from_utf8(bytes).is_ok() {
            return Self::Text;
        }
        Self::Binary
    }
}

/// A base64 payload plus its declared MIME type.
#[derive(Debug, Clone)]
pub struct Payload {
    encoded: String,
    mime_type: Option<String>,
    decoded: OnceLock<Bytes>,
}

impl Payload {
    /// Wrap a payload exactly as received from the server.
    pub fn from_base64(encoded: impl Into<String>, mime_type: Option<String>) -> Self {
        Self {
            encoded: encoded.into(),
            mime_type,
            decoded: OnceLock::new(),
        }
    }

    /// Build a payload from raw bytes (for uploads).
    pub fn from_bytes(bytes: &[u8], mime_type: Option<String>) -> Self {
        let decoded = OnceLock::new();
        let _ = decoded.set(Bytes::copy_from_slice(bytes));
        Self {
            encoded: STANDARD.encode(bytes),
            mime_type,
            decoded,
        }
    }

    pub fn encoded(&self) -> &str {
        &self.encoded
    }

    pub fn mime_type(&self) -> Option<&str> {
        self.mime_type.as_deref()
    }

    /// Decode the payload, caching the result.
    ///
    /// Whitespace inside the encoded text (line-wrapped base64) is ignored.
    pub fn decode(&self) -> Result<Bytes, CoreError> {
        if let Some(bytes) = self.decoded.get() {
            return Ok(bytes.clone());
        }
        let compact: String = self
            .encoded
            .chars()
            .filter(|c| !c.is_ascii_whitespace())
            .collect();
        let bytes = Bytes::from(
            STANDARD
                .decode(compact.as_bytes())
                .map_err(|e| CoreError::data(format!("invalid base64 payload: {e}"), None))?,
        );
        let _ = self.decoded.set(bytes.clone());
        Ok(bytes)
    }

    /// The payload's media class: the MIME type when it is conclusive,
    /// otherwise a sniff of the decoded bytes.
    pub fn kind(&self) -> Result<PayloadKind, CoreError> {
        if let Some(kind) = self.mime_type.as_deref().and_then(PayloadKind::from_mime) {
            return Ok(kind);
        }
        Ok(PayloadKind::sniff(&self.decode()?))
    }
}

impl PartialEq for Payload {
    fn eq(&self, other: &Self) -> bool {
        self.encoded == other.encoded && self.mime_type == other.mime_type
    }
}
