//! CLI configuration: a thin wrapper around `baobab_config`.
//!
//! Adds resolution that respects `GlobalOpts` flag overrides
//! (--server, --secret, --login-id, ...).

use std::io::IsTerminal;
use std::time::Duration;

use secrecy::SecretString;

use baobab_core::{SdkConfig, TlsVerification};

use crate::cli::GlobalOpts;
use crate::error::CliError;

pub use baobab_config::{
    Config, Profile, config_path, load_config_or_default, resolve_login, resolve_server_secret,
    save_config,
};

/// Resolve the active profile name from CLI flags and config.
pub fn active_profile_name(global: &GlobalOpts, config: &Config) -> String {
    global
        .profile
        .clone()
        .or_else(|| config.default_profile.clone())
        .unwrap_or_else(|| "default".into())
}

/// Build an `SdkConfig` from the config file, profile, and CLI overrides.
///
/// Without a matching profile, the flags alone must name a server.
pub fn build_sdk_config(global: &GlobalOpts) -> Result<SdkConfig, CliError> {
    let cfg = load_config_or_default();
    let profile_name = active_profile_name(global, &cfg);

    let fallback = Profile::default();
    let profile = match cfg.profiles.get(&profile_name) {
        Some(profile) => profile,
        None if global.server.is_some() => &fallback,
        None if global.profile.is_some() => {
            return Err(CliError::ProfileNotFound {
                name: profile_name,
                available: available_profiles(&cfg),
            });
        }
        None => {
            return Err(CliError::NoConfig {
                path: config_path().display().to_string(),
            });
        }
    };
    resolve_profile(profile, &profile_name, &cfg, global)
}

/// Translate a `Profile` + global flags into an `SdkConfig`.
///
/// Flag values take priority over profile values.
pub fn resolve_profile(
    profile: &Profile,
    profile_name: &str,
    cfg: &Config,
    global: &GlobalOpts,
) -> Result<SdkConfig, CliError> {
    // 1. Server URL (flag > env > profile)
    let url_str = global.server.as_deref().unwrap_or(&profile.server);
    let url: url::Url = url_str.parse().map_err(|_| CliError::Validation {
        field: "server".into(),
        reason: format!("invalid URL: {url_str}"),
    })?;

    // 2. Server secret
    let secret = match global.secret {
        Some(ref secret) => SecretString::from(secret.clone()),
        None => resolve_server_secret(profile, profile_name)?,
    };

    let mut config = SdkConfig::new(url, secret);

    // 3. TLS verification
    config.tls = if global.insecure || profile.insecure.unwrap_or(cfg.defaults.insecure) {
        TlsVerification::DangerAcceptInvalid
    } else if let Some(ref ca_path) = profile.ca_cert {
        TlsVerification::CustomCa(ca_path.clone())
    } else {
        TlsVerification::SystemDefaults
    };

    // 4. Timeouts
    config.timeout = Duration::from_secs(
        global
            .timeout
            .or(profile.timeout)
            .unwrap_or(cfg.defaults.timeout),
    );
    let login_timeout = Duration::from_secs(
        global
            .login_timeout
            .or(profile.login_timeout)
            .unwrap_or(cfg.defaults.login_timeout),
    );

    // 5. Login (flag > profile chain)
    let login = match global.login_id {
        Some(ref login_id) => Some((login_id.clone(), flag_password(global, login_id)?)),
        None => resolve_login(profile, profile_name)?,
    };
    if let Some((login_id, password)) = login {
        config = config.with_login(login_id, password, login_timeout);
    }
    Ok(config)
}

/// Password for a `--login-id` given on the command line: the flag or
/// env var, else an interactive prompt.
fn flag_password(global: &GlobalOpts, login_id: &str) -> Result<SecretString, CliError> {
    if let Some(ref pw) = global.password {
        return Ok(SecretString::from(pw.clone()));
    }
    if !std::io::stdin().is_terminal() {
        return Err(CliError::Validation {
            field: "password".into(),
            reason: format!("no password for '{login_id}'; set BAOBAB_PASSWORD"),
        });
    }
    let pw = rpassword::prompt_password(format!("Password for {login_id}: "))?;
    Ok(SecretString::from(pw))
}

pub fn available_profiles(cfg: &Config) -> String {
    if cfg.profiles.is_empty() {
        "(none)".into()
    } else {
        cfg.profiles.keys().cloned().collect::<Vec<_>>().join(", ")
    }
}
