// ── Runtime SDK configuration ──
//
// Describes which server to talk to and, optionally, who to log in as.
// Never touches disk; `baobab-config` or the embedding application builds
// one and hands it to `Sdk::new`.

use std::path::PathBuf;
use std::time::Duration;

use secrecy::SecretString;
use url::Url;

use crate::error::CoreError;

/// TLS verification strategy.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum TlsVerification {
    /// System CA store.
    #[default]
    SystemDefaults,
    /// Trust an additional CA certificate (PEM file).
    CustomCa(PathBuf),
    /// Skip verification (self-signed test servers).
    DangerAcceptInvalid,
}

/// A complete login triple.
#[derive(Debug, Clone)]
pub struct LoginCredentials {
    pub login_id: String,
    pub password: SecretString,
    /// How long a login stays valid after it succeeds.
    pub timeout: Duration,
}

/// Configuration for one SDK instance.
#[derive(Debug, Clone)]
pub struct SdkConfig {
    /// Server root, e.g. `https://example.org/baobab/`.
    pub url: Url,
    /// Shared secret the server requires on every call.
    pub server_secret: SecretString,
    pub login_id: Option<String>,
    pub password: Option<SecretString>,
    pub login_timeout: Option<Duration>,
    pub tls: TlsVerification,
    /// Per-request timeout.
    pub timeout: Duration,
}

impl SdkConfig {
    pub fn new(url: Url, server_secret: SecretString) -> Self {
        Self {
            url,
            server_secret,
            login_id: None,
            password: None,
            login_timeout: None,
            tls: TlsVerification::default(),
            timeout: Duration::from_secs(30),
        }
    }

    /// Add a login triple.
    pub fn with_login(
        mut self,
        login_id: impl Into<String>,
        password: SecretString,
        timeout: Duration,
    ) -> Self {
        self.login_id = Some(login_id.into());
        self.password = Some(password);
        self.login_timeout = Some(timeout);
        self
    }

    /// The login triple, if configured.
    ///
    /// All three parts come together or not at all; one or two of them is
    /// an invalid-parameters error.
    pub fn login_credentials(&self) -> Result<Option<LoginCredentials>, CoreError> {
        match (&self.login_id, &self.password, self.login_timeout) {
            (None, None, None) => Ok(None),
            (Some(login_id), Some(password), Some(timeout)) => {
                if login_id.is_empty() {
                    return Err(CoreError::InvalidParameters {
                        message: "login id is empty".into(),
                    });
                }
                if timeout.is_zero() {
                    return Err(CoreError::InvalidParameters {
                        message: "login timeout must be positive".into(),
                    });
                }
                Ok(Some(LoginCredentials {
                    login_id: login_id.clone(),
                    password: password.clone(),
                    timeout,
                }))
            }
            _ => Err(CoreError::InvalidParameters {
                message: "login requires a login id, a password and a timeout together".into(),
            }),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn base() -> SdkConfig {
        SdkConfig::new(
            Url::parse("https://example.org/").unwrap(),
            SecretString::from("secret".to_string()),
        )
    }

    #[test]
    fn no_login_is_fine() {
        assert!(base().login_credentials().unwrap().is_none());
    }

    #[test]
    fn full_triple() {
        let config = base().with_login(
            "admin",
            SecretString::from("pw".to_string()),
            Duration::from_secs(600),
        );
        let creds = config.login_credentials().unwrap().unwrap();
        assert_eq!(creds.login_id, "admin");
        assert_eq!(creds.timeout, Duration::from_secs(600));
    }

    #[test]
    fn partial_triples_are_rejected() {
        let mut only_id = base();
        only_id.login_id = Some("admin".into());
        assert!(matches!(
            only_id.login_credentials(),
            Err(CoreError::InvalidParameters { .. })
        ));

        let mut no_timeout = base();
        no_timeout.login_id = Some("admin".into());
        no_timeout.password = Some(SecretString::from("pw".to_string()));
        assert!(matches!(
            no_timeout.login_credentials(),
            Err(CoreError::InvalidParameters { .. })
        ));
    }
}
