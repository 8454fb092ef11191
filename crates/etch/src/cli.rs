//! Clap derive structures for the `etch` CLI.
//!
//! Defines the command tree, global flags, and shared types.

use clap::{Args, Parser, Subcommand, ValueEnum};

use etch_core::ReviewSort;

// ── Top-Level CLI ────────────────────────────────────────────────────

/// etch -- feature flags and service reviews from the command line
#[derive(Debug, Parser)]
#[command(
    name = "etch",
    version,
    about = "Query Etch feature flags and service reviews from the command line",
    propagate_version = true,
    subcommand_required = true,
    arg_required_else_help = true
)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalOpts,

    #[command(subcommand)]
    pub command: Command,
}

// ── Global Options ───────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct GlobalOpts {
    /// Configuration profile to use
    #[arg(long, short = 'p', env = "ETCH_PROFILE", global = true)]
    pub profile: Option<String>,

    /// Data store base URL (overrides profile)
    #[arg(long, env = "ETCH_DATA_URL", global = true)]
    pub data_url: Option<String>,

    /// Feature-flag service base URL (overrides profile)
    #[arg(long, env = "ETCH_FLAGS_URL", global = true)]
    pub flags_url: Option<String>,

    /// Data store anon key
    #[arg(long, env = "ETCH_ANON_KEY", global = true, hide_env_values = true)]
    pub anon_key: Option<String>,

    /// Feature-flag client key
    #[arg(long, env = "ETCH_CLIENT_KEY", global = true, hide_env_values = true)]
    pub client_key: Option<String>,

    /// Output format
    #[arg(
        long,
        short = 'o',
        env = "ETCH_OUTPUT",
        default_value = "table",
        global = true
    )]
    pub output: OutputFormat,

    /// When to use color output
    #[arg(long, default_value = "auto", global = true)]
    pub color: ColorMode,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(long, short = 'v', action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(long, short = 'q', global = true)]
    pub quiet: bool,

    /// Request timeout in seconds (overrides profile)
    #[arg(long, env = "ETCH_TIMEOUT", global = true)]
    pub timeout: Option<u64>,
}

// ── Output & Color Enums ─────────────────────────────────────────────

#[derive(Debug, Clone, ValueEnum)]
pub enum OutputFormat {
    /// Pretty table (default, interactive)
    Table,
    /// Pretty-printed JSON
    Json,
    /// Compact single-line JSON
    JsonCompact,
    /// YAML
    Yaml,
    /// Plain text, one value per line (scripting)
    Plain,
}

#[derive(Debug, Clone, ValueEnum)]
pub enum ColorMode {
    /// Auto-detect (color if terminal is interactive)
    Auto,
    /// Always emit color codes
    Always,
    /// Never emit color codes
    Never,
}

// ── Top-Level Command Enum ───────────────────────────────────────────

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Initialize the flag client and read gates and dynamic configs
    #[command(alias = "f")]
    Flags(FlagsArgs),

    /// List and summarize service reviews
    #[command(alias = "r")]
    Reviews(ReviewsArgs),

    /// Manage CLI configuration and profiles
    Config(ConfigArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  FLAGS
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct FlagsArgs {
    #[command(flatten)]
    pub client: FlagClientArgs,

    #[command(subcommand)]
    pub command: FlagsCommand,
}

/// How to build the flag client for this invocation.
#[derive(Debug, Args)]
pub struct FlagClientArgs {
    /// User to evaluate flags for (overrides profile)
    #[arg(long, short = 'u', env = "ETCH_USER_ID", global = true)]
    pub user: Option<String>,

    /// Deployment tier sent to the flag service (e.g. development, production)
    #[arg(long, short = 'e', global = true)]
    pub environment: Option<String>,

    /// Maximum initialization retries (overrides profile)
    #[arg(long, global = true)]
    pub max_retries: Option<u32>,
}

#[derive(Debug, Subcommand)]
pub enum FlagsCommand {
    /// Initialize the client and report the lifecycle state
    Init,

    /// Evaluate one or more gates
    Gate {
        /// Gate names
        #[arg(required = true)]
        names: Vec<String>,
    },

    /// Read a dynamic config
    Config {
        /// Dynamic config name
        name: String,
    },
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  REVIEWS
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct ReviewsArgs {
    #[command(subcommand)]
    pub command: ReviewsCommand,
}

/// Filter and sort arguments shared by review commands.
#[derive(Debug, Args)]
pub struct ReviewQueryArgs {
    /// Service ID (overrides profile)
    #[arg(long, short = 's')]
    pub service: Option<String>,

    /// Only reviews with this star rating
    #[arg(long, short = 'r', value_parser = clap::value_parser!(u8).range(1..=5))]
    pub rating: Option<u8>,

    /// Only reviews the provider answered
    #[arg(long, conflicts_with = "unanswered")]
    pub answered: bool,

    /// Only reviews without a provider response
    #[arg(long)]
    pub unanswered: bool,

    /// Sort order
    #[arg(long, default_value = "newest")]
    pub sort: SortArg,
}

#[derive(Debug, Subcommand)]
pub enum ReviewsCommand {
    /// List reviews, one page at a time
    #[command(alias = "ls")]
    List {
        #[command(flatten)]
        query: ReviewQueryArgs,

        /// Number of pages to load
        #[arg(long, default_value = "1", value_parser = clap::value_parser!(u32).range(1..))]
        pages: u32,

        /// Load every page
        #[arg(long, short = 'a', conflicts_with = "pages")]
        all: bool,
    },

    /// Average rating and distribution across all matching reviews
    Summary {
        #[command(flatten)]
        query: ReviewQueryArgs,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum SortArg {
    Newest,
    Oldest,
    Highest,
    Lowest,
}

impl From<SortArg> for ReviewSort {
    fn from(arg: SortArg) -> Self {
        match arg {
            SortArg::Newest => Self::Newest,
            SortArg::Oldest => Self::Oldest,
            SortArg::Highest => Self::Highest,
            SortArg::Lowest => Self::Lowest,
        }
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  CONFIG
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Create initial config file with guided setup
    Init,

    /// Display current resolved configuration
    Show,

    /// Print the config file path
    Path,

    /// Set a value on the active profile
    Set {
        /// Profile key (e.g. data_url, flags_url, user_id, service_id)
        key: String,

        /// Value to set
        value: String,
    },

    /// List configured profiles
    Profiles,

    /// Set the default profile
    Use {
        /// Profile name to set as default
        name: String,
    },

    /// Store a key in the system keyring
    SetKey {
        /// Which key to store
        kind: KeyKind,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum KeyKind {
    /// Feature-flag client key
    Client,
    /// Data store anon key
    Anon,
}

#[derive(Debug, Args)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    pub shell: clap_complete::Shell,
}
