//! Config subcommand handlers.

use serde_json::Value;

use baobab_config::KEYRING_SERVICE;

use crate::cli::{ConfigArgs, ConfigCommand, GlobalOpts, SecretItem};
use crate::config::{self, Config, Profile};
use crate::error::CliError;
use crate::output;

const REDACTED: &str = "********";

// ── Helpers ─────────────────────────────────────────────────────────

fn store_in_keyring(profile_name: &str, item: SecretItem, secret: &str) -> Result<(), CliError> {
    let entry = keyring::Entry::new(
        KEYRING_SERVICE,
        &format!("{profile_name}/{}", item.keyring_suffix()),
    )?;
    entry.set_password(secret)?;
    Ok(())
}

/// Blank out secret values anywhere in a serialized config and drop unset
/// fields, which TOML cannot express.
fn redact(value: &mut Value) {
    match value {
        Value::Object(map) => {
            map.retain(|_, v| !v.is_null());
            for (key, v) in map.iter_mut() {
                if matches!(key.as_str(), "server_secret" | "password") {
                    *v = Value::String(REDACTED.into());
                } else {
                    redact(v);
                }
            }
        }
        Value::Array(items) => items.iter_mut().for_each(redact),
        _ => {}
    }
}

// ── Handler ─────────────────────────────────────────────────────────

pub fn handle(args: ConfigArgs, global: &GlobalOpts) -> Result<(), CliError> {
    match args.command {
        // ── Init: profile from global flags ─────────────────────────
        ConfigCommand::Init { keyring } => {
            let mut cfg = config::load_config_or_default();
            let profile_name = global.profile.clone().unwrap_or_else(|| "default".into());

            let server = global.server.clone().ok_or_else(|| CliError::Validation {
                field: "server".into(),
                reason: "pass --server <url>".into(),
            })?;
            if server.parse::<url::Url>().is_err() {
                return Err(CliError::Validation {
                    field: "server".into(),
                    reason: format!("invalid URL: {server}"),
                });
            }

            let mut server_secret = global.secret.clone();
            let mut password = global.password.clone();
            if keyring {
                if let Some(secret) = server_secret.take() {
                    store_in_keyring(&profile_name, SecretItem::ServerSecret, &secret)?;
                    eprintln!("   ✓ Server secret stored in system keyring");
                }
                if let Some(pw) = password.take() {
                    store_in_keyring(&profile_name, SecretItem::Password, &pw)?;
                    eprintln!("   ✓ Password stored in system keyring");
                }
            }

            let profile = Profile {
                server,
                server_secret,
                login_id: global.login_id.clone(),
                password,
                login_timeout: global.login_timeout,
                insecure: global.insecure.then_some(true),
                timeout: global.timeout,
                ..Profile::default()
            };
            cfg.profiles.insert(profile_name.clone(), profile);
            if cfg.default_profile.is_none() || cfg.profiles.len() == 1 {
                cfg.default_profile = Some(profile_name.clone());
            }

            let path = config::save_config(&cfg)?;
            eprintln!("✓ Configuration written to {}", path.display());
            eprintln!("  Profile: {profile_name}");
            eprintln!("\n  Test it: baobab plugins");
            Ok(())
        }

        // ── Show ────────────────────────────────────────────────────
        ConfigCommand::Show => {
            let cfg = config::load_config_or_default();
            let mut value = serde_json::to_value(&cfg)?;
            redact(&mut value);
            let out = output::render_single(
                &global.output,
                &value,
                |v| toml::to_string_pretty(v).unwrap_or_else(|_| v.to_string()),
                |_| config::config_path().display().to_string(),
            )?;
            output::print_output(&out, global.quiet);
            Ok(())
        }

        // ── Path ────────────────────────────────────────────────────
        ConfigCommand::Path => {
            println!("{}", config::config_path().display());
            Ok(())
        }

        // ── Profiles ────────────────────────────────────────────────
        ConfigCommand::Profiles => {
            let cfg = config::load_config_or_default();
            let default = cfg.default_profile.as_deref().unwrap_or("default");
            if cfg.profiles.is_empty() {
                eprintln!("No profiles configured. Run: baobab --server <url> config init");
            } else {
                for (name, profile) in &cfg.profiles {
                    let marker = if name == default { " *" } else { "" };
                    println!("{name}{marker}\t{}", profile.server);
                }
            }
            Ok(())
        }

        // ── Use <name> ──────────────────────────────────────────────
        ConfigCommand::Use { name } => {
            let mut cfg: Config = config::load_config_or_default();
            if !cfg.profiles.contains_key(&name) {
                return Err(CliError::ProfileNotFound {
                    available: config::available_profiles(&cfg),
                    name,
                });
            }
            cfg.default_profile = Some(name.clone());
            config::save_config(&cfg)?;
            eprintln!("✓ Default profile set to '{name}'");
            Ok(())
        }

        // ── StoreSecret ─────────────────────────────────────────────
        ConfigCommand::StoreSecret { item } => {
            let cfg = config::load_config_or_default();
            let profile_name = config::active_profile_name(global, &cfg);
            if !cfg.profiles.contains_key(&profile_name) {
                return Err(CliError::ProfileNotFound {
                    available: config::available_profiles(&cfg),
                    name: profile_name,
                });
            }

            let label = match item {
                SecretItem::ServerSecret => "Server secret: ",
                SecretItem::Password => "Password: ",
            };
            let secret = rpassword::prompt_password(label)?;
            if secret.is_empty() {
                return Err(CliError::Validation {
                    field: "secret".into(),
                    reason: "value cannot be empty".into(),
                });
            }
            store_in_keyring(&profile_name, item, &secret)?;
            eprintln!("✓ Secret stored in system keyring for profile '{profile_name}'");
            Ok(())
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn redacts_nested_secrets() {
        let mut value = json!({
            "default_profile": "museum",
            "profiles": {
                "museum": {"server": "https://x", "server_secret": "abc", "password": "pw"},
                "anon": {"server": "https://y", "server_secret": null}
            }
        });
        redact(&mut value);
        assert_eq!(value["profiles"]["museum"]["server_secret"], REDACTED);
        assert_eq!(value["profiles"]["museum"]["password"], REDACTED);
        assert_eq!(value["profiles"]["museum"]["server"], "https://x");
        assert!(value["profiles"]["anon"].get("server_secret").is_none());
    }
}
