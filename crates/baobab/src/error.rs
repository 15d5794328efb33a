//! CLI error types with miette diagnostics.
//!
//! Maps `CoreError` and `ConfigError` into user-facing errors with
//! actionable help text.

use miette::Diagnostic;
use thiserror::Error;

use baobab_config::ConfigError;
use baobab_core::CoreError;

/// Process exit codes.
pub mod exit_code {
    pub const GENERAL: i32 = 1;
    pub const USAGE: i32 = 2;
    pub const AUTH: i32 = 3;
    pub const NOT_FOUND: i32 = 4;
    pub const PERMISSION: i32 = 5;
    pub const DATA: i32 = 6;
    pub const CONNECTION: i32 = 7;
}

#[derive(Debug, Error, Diagnostic)]
pub enum CliError {
    // ── Connection ───────────────────────────────────────────────────
    #[error("Could not connect to server at {url}")]
    #[diagnostic(
        code(baobab::connection_failed),
        help(
            "Check that the server is running and reachable.\n\
             Reason: {reason}\n\
             Try: baobab plugins --insecure"
        )
    )]
    ConnectionFailed { url: String, reason: String },

    #[error("Server answered HTTP {status}")]
    #[diagnostic(
        code(baobab::http_status),
        help("Request: {url}\nA 403 usually means the server secret is wrong.")
    )]
    HttpStatus { status: u16, url: String },

    // ── Authentication ───────────────────────────────────────────────
    #[error("Authentication failed: {message}")]
    #[diagnostic(
        code(baobab::auth_failed),
        help(
            "Verify the login id and password.\n\
             Run: baobab config store-secret password --profile <name>"
        )
    )]
    AuthFailed { message: String },

    #[error("This command needs a login")]
    #[diagnostic(
        code(baobab::not_logged_in),
        help(
            "Pass --login-id and set BAOBAB_PASSWORD, or add login_id to the profile.\n\
             Profile in use: {profile}"
        )
    )]
    NotLoggedIn { profile: String },

    #[error("No server secret configured for profile '{profile}'")]
    #[diagnostic(
        code(baobab::no_credentials),
        help(
            "Pass --secret, set BAOBAB_SERVER_SECRET, or run:\n\
             baobab config store-secret server-secret"
        )
    )]
    NoCredentials { profile: String },

    #[error("Permission denied: {message}")]
    #[diagnostic(code(baobab::permission_denied))]
    PermissionDenied { message: String },

    // ── Records ──────────────────────────────────────────────────────
    #[error("No {resource_type} found for {identifier}")]
    #[diagnostic(code(baobab::not_found))]
    NotFound {
        resource_type: String,
        identifier: String,
    },

    #[error("Unexpected server response: {message}")]
    #[diagnostic(
        code(baobab::data),
        help("Re-run with -vv to log the raw response handling.")
    )]
    Data { message: String },

    // ── Validation ───────────────────────────────────────────────────
    #[error("Invalid value for {field}: {reason}")]
    #[diagnostic(code(baobab::validation))]
    Validation { field: String, reason: String },

    // ── Configuration ────────────────────────────────────────────────
    #[error("Profile '{name}' not found in configuration")]
    #[diagnostic(
        code(baobab::profile_not_found),
        help(
            "Available profiles: {available}\n\
             Create one with: baobab --server <url> --secret <secret> config init"
        )
    )]
    ProfileNotFound { name: String, available: String },

    #[error("No server configured")]
    #[diagnostic(
        code(baobab::no_config),
        help(
            "Pass --server, or create a profile with:\n\
             baobab --server <url> --secret <secret> config init\n\
             Expected at: {path}"
        )
    )]
    NoConfig { path: String },

    #[error(transparent)]
    #[diagnostic(code(baobab::config))]
    Config(Box<ConfigError>),

    #[error("Keyring error: {0}")]
    #[diagnostic(code(baobab::keyring))]
    Keyring(#[from] keyring::Error),

    // ── IO / Serialization ───────────────────────────────────────────
    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("JSON output failed: {0}")]
    #[diagnostic(code(baobab::json))]
    Json(#[from] serde_json::Error),

    #[error("YAML output failed: {0}")]
    #[diagnostic(code(baobab::yaml))]
    Yaml(#[from] serde_yaml::Error),
}

impl CliError {
    /// Map this error to an exit code for process termination.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::ConnectionFailed { .. } | Self::HttpStatus { .. } => exit_code::CONNECTION,
            Self::AuthFailed { .. } | Self::NotLoggedIn { .. } | Self::NoCredentials { .. } => {
                exit_code::AUTH
            }
            Self::NotFound { .. } => exit_code::NOT_FOUND,
            Self::PermissionDenied { .. } => exit_code::PERMISSION,
            Self::Data { .. } => exit_code::DATA,
            Self::Validation { .. } | Self::ProfileNotFound { .. } | Self::NoConfig { .. } => {
                exit_code::USAGE
            }
            _ => exit_code::GENERAL,
        }
    }
}

// ── CoreError → CliError mapping ─────────────────────────────────────

impl From<CoreError> for CliError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::ConnectionFailed { url, reason } => CliError::ConnectionFailed { url, reason },

            CoreError::InvalidServerUrl { reason } => CliError::Validation {
                field: "server".into(),
                reason,
            },

            CoreError::HttpStatus { status, url, .. } => CliError::HttpStatus { status, url },

            CoreError::ServerConnectionInvalid | CoreError::NotConnected => {
                CliError::ConnectionFailed {
                    url: "(invalid)".into(),
                    reason: "server connection invalid".into(),
                }
            }

            CoreError::Data { message, .. } => CliError::Data { message },

            CoreError::InvalidParameters { message } => CliError::Validation {
                field: "input".into(),
                reason: message,
            },

            CoreError::AuthenticationFailed { message } => CliError::AuthFailed { message },

            CoreError::NotLoggedIn => CliError::NotLoggedIn {
                profile: "current".into(),
            },

            CoreError::NotWriteable { id } => CliError::PermissionDenied {
                message: format!("record {id} is not writeable"),
            },

            CoreError::PermissionDenied { message } => CliError::PermissionDenied { message },

            CoreError::WrongKind { expected, actual } => CliError::NotFound {
                resource_type: expected.into(),
                identifier: format!("a {actual} record"),
            },

            CoreError::RecordNotFound { key } => CliError::NotFound {
                resource_type: "record".into(),
                identifier: key.to_string(),
            },
        }
    }
}

// ── ConfigError → CliError mapping ───────────────────────────────────

impl From<ConfigError> for CliError {
    fn from(err: ConfigError) -> Self {
        match err {
            ConfigError::Validation { field, reason } => CliError::Validation { field, reason },
            ConfigError::NoCredentials { profile } => CliError::NoCredentials { profile },
            ConfigError::UnknownProfile { name } => CliError::ProfileNotFound {
                name,
                available: "(see: baobab config profiles)".into(),
            },
            other => CliError::Config(Box::new(other)),
        }
    }
}
