//! Flag command handlers.

use serde::Serialize;
use serde_json::Value;
use tabled::Tabled;

use etch_config::Config;
use etch_core::{FlagBackend, FlagClientLifecycle, FlagClientState, FlagStatus};

use crate::cli::{FlagsArgs, FlagsCommand, GlobalOpts};
use crate::config;
use crate::error::CliError;
use crate::output;

use super::util;

// ── Output types ────────────────────────────────────────────────────

#[derive(Serialize)]
struct GateResult {
    name: String,
    value: bool,
}

#[derive(Tabled)]
struct GateRow {
    #[tabled(rename = "Gate")]
    name: String,
    #[tabled(rename = "Value")]
    value: String,
}

#[derive(Serialize)]
struct ConfigResult {
    name: String,
    value: Value,
}

// ── Handler ─────────────────────────────────────────────────────────

pub async fn handle(args: FlagsArgs, global: &GlobalOpts, cfg: &Config) -> Result<(), CliError> {
    let flag_config = config::flag_config(global, &args.client, cfg)?;
    let lifecycle = FlagClientLifecycle::from_config(&flag_config)?;
    tracing::debug!(user_id = %flag_config.user_id, "flag client built");

    let result = run(&lifecycle, args.command, global).await;
    lifecycle.shutdown().await;
    result
}

async fn run<B: FlagBackend>(
    lifecycle: &FlagClientLifecycle<B>,
    command: FlagsCommand,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let state = initialize(lifecycle, global).await;

    match command {
        FlagsCommand::Init => {
            let color = output::should_color(&global.color);
            let out = output::render_single(
                &global.output,
                &state,
                |s| state_detail(s, color),
                |s| s.status.to_string(),
            );
            output::print_output(&out, global.quiet);
            ensure_ready(&state)
        }

        FlagsCommand::Gate { names } => {
            ensure_ready(&state)?;
            let results: Vec<GateResult> = names
                .into_iter()
                .map(|name| GateResult {
                    value: lifecycle.check_gate(&name),
                    name,
                })
                .collect();

            let color = output::should_color(&global.color);
            let out = output::render_list(
                &global.output,
                &results,
                |g| GateRow {
                    name: g.name.clone(),
                    value: output::gate_label(g.value, color),
                },
                |g| format!("{}\t{}", g.name, g.value),
            );
            output::print_output(&out, global.quiet);
            Ok(())
        }

        FlagsCommand::Config { name } => {
            ensure_ready(&state)?;
            let value = lifecycle
                .dynamic_config(&name)
                .unwrap_or_else(|| Value::Object(serde_json::Map::new()));
            let result = ConfigResult { name, value };
            let out = output::render_single(
                &global.output,
                &result,
                |c| serde_json::to_string_pretty(&c.value).unwrap_or_default(),
                |c| c.value.to_string(),
            );
            output::print_output(&out, global.quiet);
            Ok(())
        }
    }
}

/// Drive initialization to a terminal state, narrating retries on a spinner.
async fn initialize<B: FlagBackend>(
    lifecycle: &FlagClientLifecycle<B>,
    global: &GlobalOpts,
) -> FlagClientState {
    let spinner = util::spinner(global, "Initializing flag client");
    let max = lifecycle.policy().max_retries;
    let mut rx = lifecycle.subscribe();
    let watcher = {
        let spinner = spinner.clone();
        tokio::spawn(async move {
            while rx.changed().await.is_ok() {
                let state = rx.borrow_and_update().clone();
                if let (FlagStatus::Loading, Some(kind)) = (state.status, state.last_error_type) {
                    spinner.set_message(format!(
                        "Retrying after {kind} error ({}/{max} retries used)",
                        state.retry_count
                    ));
                }
            }
        })
    };

    if let Err(e) = lifecycle.initialize().await {
        tracing::debug!(error = %e, "flag initialization failed");
    }
    watcher.abort();
    spinner.finish_and_clear();
    lifecycle.state()
}

fn ensure_ready(state: &FlagClientState) -> Result<(), CliError> {
    if state.is_ready() {
        return Ok(());
    }
    Err(CliError::FlagInit {
        kind: state.last_error_type.unwrap_or(etch_core::FlagErrorKind::Unknown),
        message: state
            .error
            .clone()
            .unwrap_or_else(|| "flag client is not ready".into()),
    })
}

fn state_detail(state: &FlagClientState, color: bool) -> String {
    use owo_colors::OwoColorize;

    let status = match (state.status, color) {
        (FlagStatus::Success, true) => state.status.green().to_string(),
        (FlagStatus::Error, true) => state.status.red().to_string(),
        _ => state.status.to_string(),
    };
    let mut lines = vec![
        format!("Status:      {status}"),
        format!("Retries:     {}", state.retry_count),
    ];
    if let Some(kind) = state.last_error_type {
        lines.push(format!("Error type:  {kind}"));
    }
    if let Some(err) = &state.error {
        lines.push(format!("Error:       {err}"));
    }
    lines.join("\n")
}
