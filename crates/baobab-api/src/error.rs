use thiserror::Error;

/// Top-level error type for the `baobab-api` crate.
///
/// Covers every failure mode of the HTTP surface: URL construction,
/// transport, and non-success status codes. Bodies are handed back raw.
/// `baobab-core` maps these into its connection / data / operational
/// taxonomy.
#[derive(Debug, Error)]
pub enum Error {
    // ── Authentication ──────────────────────────────────────────────
    /// Login was rejected, or an authenticated call was attempted
    /// without an API key.
    #[error("Authentication failed: {message}")]
    Authentication { message: String },

    // ── Transport ───────────────────────────────────────────────────
    /// HTTP transport error (connection refused, DNS failure, etc.)
    #[error("HTTP transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// URL parsing error.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// The base URL cannot carry path segments (e.g. `mailto:`).
    #[error("URL cannot be used as a server base: {0}")]
    UnusableBaseUrl(String),

    /// TLS setup error.
    #[error("TLS error: {0}")]
    Tls(String),

    /// The server answered outside the 2xx range.
    #[error("HTTP {status} from {url}")]
    HttpStatus {
        status: u16,
        url: String,
        body: bytes::Bytes,
    },
}

impl Error {
    /// The HTTP status, if this error came from a non-success response.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::HttpStatus { status, .. } => Some(*status),
            Self::Transport(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }

    /// The raw response body carried by this error, if any.
    pub fn body(&self) -> Option<&bytes::Bytes> {
        match self {
            Self::HttpStatus { body, .. } => Some(body),
            _ => None,
        }
    }
}
