//! Config subcommand handlers.

use dialoguer::{Input, Select};

use etch_config::{Config, Credential, Profile};

use crate::cli::{ConfigArgs, ConfigCommand, GlobalOpts, KeyKind};
use crate::config;
use crate::error::CliError;
use crate::output;

use super::util::prompt_err;

const REDACTED: &str = "********";

const SETTABLE_KEYS: &str = "data_url, anon_key, anon_key_env, flags_url, client_key, \
                             client_key_env, user_id, environment, service_id, timeout, \
                             max_retries, base_delay_ms, max_jitter_ms";

// ── Helpers ─────────────────────────────────────────────────────────

impl From<KeyKind> for Credential {
    fn from(kind: KeyKind) -> Self {
        match kind {
            KeyKind::Client => Self::ClientKey,
            KeyKind::Anon => Self::AnonKey,
        }
    }
}

/// Prompt for a secret, then store it in the keyring or return it for the file.
fn prompt_secret(
    profile_name: &str,
    credential: Credential,
    label: &str,
) -> Result<Option<String>, CliError> {
    let secret = rpassword::prompt_password(format!("{label}: ")).map_err(prompt_err)?;
    if secret.is_empty() {
        return Err(CliError::Validation {
            field: label.into(),
            reason: "value cannot be empty".into(),
        });
    }

    let store_choices = &[
        "Store in system keyring (recommended)",
        "Save to config file (plaintext)",
    ];
    let store_selection = Select::new()
        .with_prompt(format!("Where to store the {label}?"))
        .items(store_choices)
        .default(0)
        .interact()
        .map_err(prompt_err)?;

    if store_selection == 0 {
        etch_config::store_credential(profile_name, credential, &secret)?;
        eprintln!("   ✓ {label} stored in system keyring");
        Ok(None)
    } else {
        Ok(Some(secret))
    }
}

fn optional_input(prompt: &str) -> Result<Option<String>, CliError> {
    let value: String = Input::new()
        .with_prompt(prompt)
        .allow_empty(true)
        .interact_text()
        .map_err(prompt_err)?;
    Ok(Some(value).filter(|v| !v.is_empty()))
}

fn parse_number<T: std::str::FromStr>(field: &str, value: &str) -> Result<T, CliError> {
    value.parse().map_err(|_| CliError::Validation {
        field: field.into(),
        reason: "must be a non-negative number".into(),
    })
}

/// Copy of `cfg` with plaintext keys masked.
fn redacted(cfg: &Config) -> Config {
    let mut cfg = cfg.clone();
    for profile in cfg.profiles.values_mut() {
        for key in [&mut profile.anon_key, &mut profile.client_key] {
            if key.is_some() {
                *key = Some(REDACTED.into());
            }
        }
    }
    cfg
}

/// Apply `key = value` to `profile`.
fn set_profile_value(profile: &mut Profile, key: &str, value: String) -> Result<(), CliError> {
    match key {
        "data_url" | "data-url" => profile.data_url = Some(value),
        "anon_key" | "anon-key" => profile.anon_key = Some(value),
        "anon_key_env" | "anon-key-env" => profile.anon_key_env = Some(value),
        "flags_url" | "flags-url" => profile.flags_url = Some(value),
        "client_key" | "client-key" => profile.client_key = Some(value),
        "client_key_env" | "client-key-env" => profile.client_key_env = Some(value),
        "user_id" | "user-id" => profile.user_id = Some(value),
        "environment" => profile.environment = Some(value),
        "service_id" | "service-id" => profile.service_id = Some(value),
        "timeout" => profile.timeout = Some(parse_number("timeout", &value)?),
        "max_retries" | "max-retries" => {
            profile.max_retries = Some(parse_number("max_retries", &value)?);
        }
        "base_delay_ms" | "base-delay-ms" => {
            profile.base_delay_ms = Some(parse_number("base_delay_ms", &value)?);
        }
        "max_jitter_ms" | "max-jitter-ms" => {
            profile.max_jitter_ms = Some(parse_number("max_jitter_ms", &value)?);
        }
        other => {
            return Err(CliError::Validation {
                field: other.into(),
                reason: format!("unknown config key '{other}'. Valid keys: {SETTABLE_KEYS}"),
            });
        }
    }
    Ok(())
}

// ── Handler ─────────────────────────────────────────────────────────

pub fn handle(args: ConfigArgs, global: &GlobalOpts) -> Result<(), CliError> {
    match args.command {
        // ── Init: interactive wizard ────────────────────────────────
        ConfigCommand::Init => {
            let config_path = etch_config::config_path();
            eprintln!("etch configuration wizard");
            eprintln!("   Config path: {}\n", config_path.display());

            let profile_name: String = Input::new()
                .with_prompt("Profile name")
                .default("default".into())
                .interact_text()
                .map_err(prompt_err)?;

            let data_url: String = Input::new()
                .with_prompt("Data store URL")
                .interact_text()
                .map_err(prompt_err)?;
            let anon_key = prompt_secret(&profile_name, Credential::AnonKey, "anon key")?;
            let service_id = optional_input("Default service ID (optional)")?;

            let flags_url: String = Input::new()
                .with_prompt("Feature-flag service URL")
                .interact_text()
                .map_err(prompt_err)?;
            let client_key = prompt_secret(&profile_name, Credential::ClientKey, "client key")?;
            let user_id = optional_input("User ID for flag evaluation (optional)")?;
            let environment = optional_input("Environment tier (optional)")?;

            let profile = Profile {
                data_url: Some(data_url),
                anon_key,
                flags_url: Some(flags_url),
                client_key,
                user_id,
                environment,
                service_id,
                ..Profile::default()
            };

            let mut cfg = etch_config::load_config()?;
            cfg.profiles.insert(profile_name.clone(), profile);
            cfg.default_profile = Some(profile_name.clone());
            let path = etch_config::save_config(&cfg)?;

            eprintln!("\n✓ Configuration written to {}", path.display());
            eprintln!("  Active profile: {profile_name}");
            eprintln!("\n  Test it: etch reviews summary");
            Ok(())
        }

        // ── Show ────────────────────────────────────────────────────
        ConfigCommand::Show => {
            let cfg = redacted(&etch_config::load_config()?);
            let out = output::render_single(
                &global.output,
                &cfg,
                |c| serde_yaml::to_string(c).unwrap_or_else(|_| format!("{c:#?}")),
                |c| c.active_profile_name(global.profile.as_deref()),
            );
            output::print_output(&out, global.quiet);
            Ok(())
        }

        // ── Path ────────────────────────────────────────────────────
        ConfigCommand::Path => {
            println!("{}", etch_config::config_path().display());
            Ok(())
        }

        // ── Set <key> <value> ───────────────────────────────────────
        ConfigCommand::Set { key, value } => {
            let mut cfg = etch_config::load_config()?;
            let profile_name = config::active_profile_name(global, &cfg);
            let profile = cfg.profiles.entry(profile_name.clone()).or_default();
            set_profile_value(profile, &key, value)?;

            etch_config::save_config(&cfg)?;
            if !global.quiet {
                eprintln!("✓ Set {key} on profile '{profile_name}'");
            }
            Ok(())
        }

        // ── Profiles ────────────────────────────────────────────────
        ConfigCommand::Profiles => {
            let cfg = etch_config::load_config_or_default();
            let default = cfg.active_profile_name(None);
            if cfg.profiles.is_empty() {
                eprintln!("No profiles configured. Run: etch config init");
            } else {
                for name in cfg.profiles.keys() {
                    let marker = if *name == default { " *" } else { "" };
                    println!("{name}{marker}");
                }
            }
            Ok(())
        }

        // ── Use <name> ─────────────────────────────────────────────
        ConfigCommand::Use { name } => {
            let mut cfg = etch_config::load_config()?;
            if !cfg.profiles.contains_key(&name) {
                return Err(CliError::ProfileNotFound {
                    available: cfg.profile_names(),
                    name,
                });
            }

            cfg.default_profile = Some(name.clone());
            etch_config::save_config(&cfg)?;
            if !global.quiet {
                eprintln!("✓ Default profile set to '{name}'");
            }
            Ok(())
        }

        // ── SetKey ──────────────────────────────────────────────────
        ConfigCommand::SetKey { kind } => {
            let cfg = etch_config::load_config_or_default();
            let profile_name = config::active_profile_name(global, &cfg);
            let credential = Credential::from(kind);

            let secret = rpassword::prompt_password("Key: ").map_err(prompt_err)?;
            if secret.is_empty() {
                return Err(CliError::Validation {
                    field: "key".into(),
                    reason: "value cannot be empty".into(),
                });
            }

            etch_config::store_credential(&profile_name, credential, &secret)?;
            if !global.quiet {
                eprintln!("✓ Key stored in system keyring for profile '{profile_name}'");
            }
            Ok(())
        }
    }
}
