//! Profile resolution with command-line overrides.
//!
//! Precedence is flag / `ETCH_*` env var, then the profile, then
//! `[defaults]`. Translation to core configs lives in `etch_config`.

use std::time::Duration;

use secrecy::SecretString;

use etch_config::{Config, Profile};
use etch_core::{FlagClientConfig, ReviewListConfig};

use crate::cli::{FlagClientArgs, GlobalOpts};
use crate::error::CliError;

/// `--profile`, else the configured default, else `"default"`.
pub fn active_profile_name(global: &GlobalOpts, cfg: &Config) -> String {
    cfg.active_profile_name(global.profile.as_deref())
}

/// The active profile with global overrides applied.
///
/// An explicitly requested profile must exist. The implicit default may be
/// absent, in which case flags and env vars supply everything.
fn resolve_profile(global: &GlobalOpts, cfg: &Config) -> Result<(String, Profile), CliError> {
    let name = active_profile_name(global, cfg);
    let mut profile = match cfg.profiles.get(&name) {
        Some(p) => p.clone(),
        None if global.profile.is_some() => {
            return Err(CliError::ProfileNotFound {
                name,
                available: cfg.profile_names(),
            });
        }
        None => Profile::default(),
    };

    if let Some(url) = &global.data_url {
        profile.data_url = Some(url.clone());
    }
    if let Some(url) = &global.flags_url {
        profile.flags_url = Some(url.clone());
    }
    if let Some(key) = &global.anon_key {
        profile.anon_key = Some(key.clone());
    }
    if let Some(key) = &global.client_key {
        profile.client_key = Some(key.clone());
    }
    if let Some(secs) = global.timeout {
        profile.timeout = Some(secs);
    }
    Ok((name, profile))
}

/// Build the flag client config for this invocation.
pub fn flag_config(
    global: &GlobalOpts,
    args: &FlagClientArgs,
    cfg: &Config,
) -> Result<FlagClientConfig, CliError> {
    let (name, mut profile) = resolve_profile(global, cfg)?;
    if let Some(user) = &args.user {
        profile.user_id = Some(user.clone());
    }
    if let Some(tier) = &args.environment {
        profile.environment = Some(tier.clone());
    }
    if let Some(n) = args.max_retries {
        profile.max_retries = Some(n);
    }

    let mut config = etch_config::profile_to_flag_config(&profile, &name, &cfg.defaults)?;
    // A key on the command line beats anything the credential chain finds.
    if let Some(key) = &global.client_key {
        config.client_key = SecretString::from(key.clone());
    }
    Ok(config)
}

/// Build the review list config for this invocation.
pub fn review_config(
    global: &GlobalOpts,
    service: Option<&str>,
    cfg: &Config,
) -> Result<ReviewListConfig, CliError> {
    let (name, profile) = resolve_profile(global, cfg)?;
    let mut config =
        etch_config::profile_to_review_config(&profile, &name, &cfg.defaults, service)?;
    if let Some(key) = &global.anon_key {
        config.anon_key = SecretString::from(key.clone());
    }
    if let Some(secs) = global.timeout {
        config.timeout = Duration::from_secs(secs);
    }
    Ok(config)
}
