// ── Core error types ──
//
// User-facing errors from baobab-core, grouped into three categories:
// connection, data, and operational. The `From<baobab_api::Error>` impl
// translates transport-layer errors into this taxonomy.

use bytes::Bytes;
use thiserror::Error;

use crate::model::{RecordKey, RecordKind};

/// Broad class of a [`CoreError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
#[strum(serialize_all = "snake_case")]
pub enum ErrorCategory {
    /// Bad or unreachable server, or a non-success HTTP status.
    Connection,
    /// A response that could not be turned into records.
    Data,
    /// The caller asked for something invalid; no network activity happened.
    Operational,
}

/// Unified error type for the core crate.
#[derive(Debug, Clone, Error)]
pub enum CoreError {
    // ── Connection errors ────────────────────────────────────────────
    #[error("Cannot connect to server at {url}: {reason}")]
    ConnectionFailed { url: String, reason: String },

    #[error("Invalid server URL: {reason}")]
    InvalidServerUrl { reason: String },

    #[error("Server answered HTTP {status} for {url}")]
    HttpStatus {
        status: u16,
        url: String,
        body: Option<Bytes>,
    },

    #[error("Disconnected: server connection invalid")]
    ServerConnectionInvalid,

    // ── Data errors ──────────────────────────────────────────────────
    #[error("Data error: {message}")]
    Data {
        message: String,
        /// The offending raw bytes, when available.
        body: Option<Bytes>,
    },

    // ── Operation errors ─────────────────────────────────────────────
    #[error("Invalid parameters: {message}")]
    InvalidParameters { message: String },

    #[error("Authentication failed: {message}")]
    AuthenticationFailed { message: String },

    #[error("Not connected to a valid server")]
    NotConnected,

    #[error("Not logged in")]
    NotLoggedIn,

    #[error("Record {id} is not writeable")]
    NotWriteable { id: i64 },

    #[error("Expected a {expected} record, found {actual}")]
    WrongKind {
        expected: &'static str,
        actual: RecordKind,
    },

    #[error("Permission denied: {message}")]
    PermissionDenied { message: String },

    #[error("Record {key} is not in the cache")]
    RecordNotFound { key: RecordKey },
}

impl CoreError {
    /// Which of the three error categories this error belongs to.
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::ConnectionFailed { .. }
            | Self::InvalidServerUrl { .. }
            | Self::HttpStatus { .. }
            | Self::ServerConnectionInvalid => ErrorCategory::Connection,
            Self::Data { .. } => ErrorCategory::Data,
            Self::InvalidParameters { .. }
            | Self::AuthenticationFailed { .. }
            | Self::NotConnected
            | Self::NotLoggedIn
            | Self::NotWriteable { .. }
            | Self::WrongKind { .. }
            | Self::PermissionDenied { .. }
            | Self::RecordNotFound { .. } => ErrorCategory::Operational,
        }
    }

    /// The raw response bytes attached to this error, if any.
    pub fn body(&self) -> Option<&Bytes> {
        match self {
            Self::HttpStatus { body, .. } | Self::Data { body, .. } => body.as_ref(),
            _ => None,
        }
    }

    pub(crate) fn data(message: impl Into<String>, body: Option<Bytes>) -> Self {
        Self::Data {
            message: message.into(),
            body,
        }
    }
}

// ── Conversion from transport-layer errors ───────────────────────────

impl From<baobab_api::Error> for CoreError {
    fn from(err: baobab_api::Error) -> Self {
        match err {
            baobab_api::Error::Authentication { message } => {
                CoreError::AuthenticationFailed { message }
            }
            baobab_api::Error::Transport(ref e) => CoreError::ConnectionFailed {
                url: e
                    .url()
                    .map_or_else(|| "<unknown>".into(), |u| u.path().to_owned()),
                reason: e.to_string(),
            },
            baobab_api::Error::InvalidUrl(e) => CoreError::InvalidServerUrl {
                reason: e.to_string(),
            },
            baobab_api::Error::UnusableBaseUrl(url) => CoreError::InvalidServerUrl {
                reason: format!("{url} cannot be a base URL"),
            },
            baobab_api::Error::Tls(reason) => CoreError::ConnectionFailed {
                url: String::new(),
                reason: format!("TLS error: {reason}"),
            },
            baobab_api::Error::HttpStatus { status, url, body } => CoreError::HttpStatus {
                status,
                url,
                body: Some(body),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn http_status_is_a_connection_error() {
        let err = CoreError::from(baobab_api::Error::HttpStatus {
            status: 500,
            url: "/json/places/1".into(),
            body: Bytes::from_static(b"boom"),
        });
        assert_eq!(err.category(), ErrorCategory::Connection);
        assert_eq!(err.body().map(|b| b.as_ref()), Some(&b"boom"[..]));
    }

    #[test]
    fn categories() {
        assert_eq!(
            CoreError::data("bad", None).category(),
            ErrorCategory::Data
        );
        assert_eq!(
            CoreError::InvalidParameters {
                message: "x".into()
            }
            .category(),
            ErrorCategory::Operational
        );
        assert_eq!(
            CoreError::ServerConnectionInvalid.category(),
            ErrorCategory::Connection
        );
    }
}
