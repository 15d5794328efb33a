//! Shared configuration for BAOBAB tools.
//!
//! TOML profiles, credential resolution (env + keyring + plaintext),
//! and translation to `baobab_core::SdkConfig`. The CLI layers its
//! command-line overrides on top.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use baobab_core::{SdkConfig, TlsVerification};
use directories::ProjectDirs;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

/// Keyring service name credentials are stored under.
pub const KEYRING_SERVICE: &str = "baobab";

/// Environment variable consulted for the login password.
pub const PASSWORD_ENV: &str = "BAOBAB_PASSWORD";

/// Environment variable consulted when a profile names no login id.
pub const LOGIN_ID_ENV: &str = "BAOBAB_LOGIN_ID";

// ── Error ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("profile '{name}' not found")]
    UnknownProfile { name: String },

    #[error("no server secret configured for profile '{profile}'")]
    NoCredentials { profile: String },

    #[error("failed to serialize config: {0}")]
    Serialization(#[from] toml::ser::Error),

    #[error("config loading failed: {0}")]
    Figment(Box<figment::Error>),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Figment(Box::new(err))
    }
}

// ── TOML config structs ─────────────────────────────────────────────

/// Top-level TOML configuration.
#[derive(Debug, Deserialize, Serialize)]
pub struct Config {
    /// Profile used when none is named.
    pub default_profile: Option<String>,

    #[serde(default)]
    pub defaults: Defaults,

    /// Named server profiles.
    #[serde(default)]
    pub profiles: BTreeMap<String, Profile>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            default_profile: Some("default".into()),
            defaults: Defaults::default(),
            profiles: BTreeMap::new(),
        }
    }
}

impl Config {
    /// Look up `name`, or the default profile when `name` is `None`.
    pub fn profile<'a>(
        &'a self,
        name: Option<&'a str>,
    ) -> Result<(&'a str, &'a Profile), ConfigError> {
        let name = name
            .or(self.default_profile.as_deref())
            .unwrap_or("default");
        self.profiles
            .get(name)
            .map(|profile| (name, profile))
            .ok_or_else(|| ConfigError::UnknownProfile { name: name.into() })
    }
}

#[derive(Debug, Deserialize, Serialize)]
pub struct Defaults {
    #[serde(default = "default_output")]
    pub output: String,

    #[serde(default)]
    pub insecure: bool,

    /// Request timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout: u64,

    /// How long a login stays valid, in seconds.
    #[serde(default = "default_login_timeout")]
    pub login_timeout: u64,
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            output: default_output(),
            insecure: false,
            timeout: default_timeout(),
            login_timeout: default_login_timeout(),
        }
    }
}

fn default_output() -> String {
    "table".into()
}
fn default_timeout() -> u64 {
    30
}
fn default_login_timeout() -> u64 {
    3600
}

/// A named server profile.
#[derive(Debug, Default, Deserialize, Serialize)]
pub struct Profile {
    /// Server base URL (e.g., "https://baobab.example.org/api").
    pub server: String,

    /// Shared server secret (plaintext; prefer keyring or env var).
    pub server_secret: Option<String>,

    /// Environment variable name containing the server secret.
    pub server_secret_env: Option<String>,

    /// Login to use; without one the SDK connects anonymously.
    pub login_id: Option<String>,

    /// Login password (plaintext; prefer keyring).
    pub password: Option<String>,

    /// Override the login lifetime, in seconds.
    pub login_timeout: Option<u64>,

    /// Path to a custom CA certificate.
    pub ca_cert: Option<PathBuf>,

    /// Override the insecure TLS setting.
    pub insecure: Option<bool>,

    /// Override the request timeout, in seconds.
    pub timeout: Option<u64>,
}

// ── Config file path ────────────────────────────────────────────────

/// Resolve the config file path via XDG / platform conventions.
pub fn config_path() -> PathBuf {
    ProjectDirs::from("org", "baobab", "baobab").map_or_else(
        || {
            let mut p = dirs_fallback();
            p.push("config.toml");
            p
        },
        |dirs| dirs.config_dir().join("config.toml"),
    )
}

fn dirs_fallback() -> PathBuf {
    let mut p = PathBuf::from(std::env::var("HOME").unwrap_or_else(|_| ".".into()));
    p.push(".config");
    p.push("baobab");
    p
}

// ── Config loading ──────────────────────────────────────────────────

/// Load the full Config from the canonical file + environment.
pub fn load_config() -> Result<Config, ConfigError> {
    load_config_from(&config_path())
}

/// Load the full Config from `path` + environment.
///
/// Environment variables use the `BAOBAB_` prefix with `__` between
/// levels, e.g. `BAOBAB_DEFAULTS__OUTPUT=json`.
pub fn load_config_from(path: &Path) -> Result<Config, ConfigError> {
    debug!(path = %path.display(), "loading config");
    let figment = Figment::new()
        .merge(Serialized::defaults(Config::default()))
        .merge(Toml::file(path))
        .merge(Env::prefixed("BAOBAB_").split("__"));

    let config: Config = figment.extract()?;
    Ok(config)
}

/// Load config, returning a default if the file doesn't exist.
pub fn load_config_or_default() -> Config {
    load_config().unwrap_or_default()
}

// ── Config saving ───────────────────────────────────────────────────

/// Serialize config to TOML and write to the canonical config path.
pub fn save_config(cfg: &Config) -> Result<PathBuf, ConfigError> {
    let path = config_path();
    save_config_to(cfg, &path)?;
    Ok(path)
}

pub fn save_config_to(cfg: &Config, path: &Path) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let toml_str = toml::to_string_pretty(cfg)?;
    std::fs::write(path, toml_str)?;
    Ok(())
}

// ── Credential resolution ───────────────────────────────────────────

fn keyring_secret(profile_name: &str, item: &str) -> Option<String> {
    keyring::Entry::new(KEYRING_SERVICE, &format!("{profile_name}/{item}"))
        .and_then(|entry| entry.get_password())
        .ok()
}

/// Resolve the shared server secret: profile's env var, then keyring,
/// then plaintext.
pub fn resolve_server_secret(
    profile: &Profile,
    profile_name: &str,
) -> Result<SecretString, ConfigError> {
    if let Some(ref env_name) = profile.server_secret_env {
        if let Ok(val) = std::env::var(env_name) {
            return Ok(SecretString::from(val));
        }
    }

    if let Some(secret) = keyring_secret(profile_name, "server-secret") {
        return Ok(SecretString::from(secret));
    }

    if let Some(ref secret) = profile.server_secret {
        return Ok(SecretString::from(secret.clone()));
    }

    Err(ConfigError::NoCredentials {
        profile: profile_name.into(),
    })
}

/// Resolve the login id and password, if the profile logs in at all.
///
/// The password comes from `BAOBAB_PASSWORD`, then keyring, then
/// plaintext. A login id without any password is a validation error.
pub fn resolve_login(
    profile: &Profile,
    profile_name: &str,
) -> Result<Option<(String, SecretString)>, ConfigError> {
    let Some(login_id) = profile
        .login_id
        .clone()
        .or_else(|| std::env::var(LOGIN_ID_ENV).ok())
    else {
        return Ok(None);
    };

    if let Ok(pw) = std::env::var(PASSWORD_ENV) {
        return Ok(Some((login_id, SecretString::from(pw))));
    }

    if let Some(pw) = keyring_secret(profile_name, "password") {
        return Ok(Some((login_id, SecretString::from(pw))));
    }

    if let Some(ref pw) = profile.password {
        return Ok(Some((login_id, SecretString::from(pw.clone()))));
    }

    Err(ConfigError::Validation {
        field: "password".into(),
        reason: format!("login '{login_id}' of profile '{profile_name}' has no password"),
    })
}

/// Build an `SdkConfig` from a profile, falling back to `defaults`.
pub fn profile_to_sdk_config(
    profile: &Profile,
    profile_name: &str,
    defaults: &Defaults,
) -> Result<SdkConfig, ConfigError> {
    let url: url::Url = profile
        .server
        .parse()
        .map_err(|_| ConfigError::Validation {
            field: "server".into(),
            reason: format!("invalid URL: {}", profile.server),
        })?;

    let secret = resolve_server_secret(profile, profile_name)?;

    let tls = if profile.insecure.unwrap_or(defaults.insecure) {
        TlsVerification::DangerAcceptInvalid
    } else if let Some(ref ca_path) = profile.ca_cert {
        TlsVerification::CustomCa(ca_path.clone())
    } else {
        TlsVerification::SystemDefaults
    };

    let login_timeout = profile.login_timeout.unwrap_or(defaults.login_timeout);
    if login_timeout == 0 {
        return Err(ConfigError::Validation {
            field: "login_timeout".into(),
            reason: "must be positive".into(),
        });
    }

    let mut config = SdkConfig::new(url, secret);
    config.tls = tls;
    config.timeout = Duration::from_secs(profile.timeout.unwrap_or(defaults.timeout));
    if let Some((login_id, password)) = resolve_login(profile, profile_name)? {
        config = config.with_login(login_id, password, Duration::from_secs(login_timeout));
    }
    Ok(config)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use secrecy::ExposeSecret;

    fn profile() -> Profile {
        Profile {
            server: "https://baobab.example.org/api".into(),
            server_secret: Some("s3cret".into()),
            ..Profile::default()
        }
    }

    #[test]
    fn loads_profiles_from_toml() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            r#"
default_profile = "museum"

[defaults]
output = "json"

[profiles.museum]
server = "https://museum.example.org"
server_secret = "abc"
login_id = "curator"
password = "pw"
timeout = 5
"#,
        )
        .unwrap();

        let cfg = load_config_from(&path).unwrap();
        assert_eq!(cfg.defaults.output, "json");
        assert_eq!(cfg.defaults.login_timeout, 3600);

        let (name, museum) = cfg.profile(None).unwrap();
        assert_eq!(name, "museum");
        assert_eq!(museum.login_id.as_deref(), Some("curator"));
        assert_eq!(museum.timeout, Some(5));
    }

    #[test]
    fn missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = load_config_from(&dir.path().join("absent.toml")).unwrap();
        assert_eq!(cfg.default_profile.as_deref(), Some("default"));
        assert!(cfg.profiles.is_empty());
        assert!(matches!(
            cfg.profile(None),
            Err(ConfigError::UnknownProfile { .. })
        ));
    }

    #[test]
    fn saved_config_loads_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");
        let mut cfg = Config::default();
        cfg.profiles.insert("default".into(), profile());

        save_config_to(&cfg, &path).unwrap();
        let loaded = load_config_from(&path).unwrap();
        let (_, p) = loaded.profile(Some("default")).unwrap();
        assert_eq!(p.server, "https://baobab.example.org/api");
        assert_eq!(p.server_secret.as_deref(), Some("s3cret"));
    }

    #[test]
    fn anonymous_profile_translates() {
        let sdk = profile_to_sdk_config(&profile(), "anon-test", &Defaults::default()).unwrap();
        assert_eq!(sdk.url.as_str(), "https://baobab.example.org/api");
        assert_eq!(sdk.server_secret.expose_secret(), "s3cret");
        assert_eq!(sdk.tls, TlsVerification::SystemDefaults);
        assert_eq!(sdk.timeout, Duration::from_secs(30));
        assert!(sdk.login_credentials().unwrap().is_none());
    }

    #[test]
    fn login_profile_carries_triple() {
        let p = Profile {
            login_id: Some("curator".into()),
            password: Some("pw".into()),
            login_timeout: Some(600),
            insecure: Some(true),
            ..profile()
        };
        let sdk = profile_to_sdk_config(&p, "login-test", &Defaults::default()).unwrap();
        assert_eq!(sdk.tls, TlsVerification::DangerAcceptInvalid);
        let creds = sdk.login_credentials().unwrap().unwrap();
        assert_eq!(creds.login_id, "curator");
        assert_eq!(creds.timeout, Duration::from_secs(600));
    }

    #[test]
    fn custom_ca_is_used() {
        let p = Profile {
            ca_cert: Some(PathBuf::from("/etc/baobab/ca.pem")),
            ..profile()
        };
        let sdk = profile_to_sdk_config(&p, "ca-test", &Defaults::default()).unwrap();
        assert_eq!(
            sdk.tls,
            TlsVerification::CustomCa(PathBuf::from("/etc/baobab/ca.pem"))
        );
    }

    #[test]
    fn bad_url_is_rejected() {
        let p = Profile {
            server: "not a url".into(),
            ..profile()
        };
        let err = profile_to_sdk_config(&p, "url-test", &Defaults::default()).unwrap_err();
        assert!(matches!(err, ConfigError::Validation { ref field, .. } if field == "server"));
    }

    #[test]
    fn zero_login_timeout_is_rejected() {
        let p = Profile {
            login_timeout: Some(0),
            ..profile()
        };
        let err = profile_to_sdk_config(&p, "timeout-test", &Defaults::default()).unwrap_err();
        assert!(matches!(err, ConfigError::Validation { ref field, .. } if field == "login_timeout"));
    }

    #[test]
    fn unknown_named_profile() {
        let cfg = Config::default();
        let err = cfg.profile(Some("nope")).unwrap_err();
        assert_eq!(err.to_string(), "profile 'nope' not found");
    }
}
