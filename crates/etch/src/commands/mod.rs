//! Command dispatch: bridges CLI args -> core controllers -> output formatting.

pub mod config_cmd;
pub mod flags;
pub mod reviews;
pub mod util;

use etch_config::Config;

use crate::cli::{Command, GlobalOpts};
use crate::error::CliError;

/// Dispatch a service-bound command to the appropriate handler.
pub async fn dispatch(cmd: Command, global: &GlobalOpts, cfg: &Config) -> Result<(), CliError> {
    match cmd {
        Command::Flags(args) => flags::handle(args, global, cfg).await,
        Command::Reviews(args) => reviews::handle(args, global, cfg).await,
        // Config and Completions are handled before dispatch
        Command::Config(_) | Command::Completions(_) => Ok(()),
    }
}
