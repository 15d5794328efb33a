//! Clap derive structures for the `baobab` CLI.
//!
//! Defines the command tree, global flags, and shared types.

use clap::{Args, Parser, Subcommand, ValueEnum};

use baobab_core::RecordKind;

// ── Top-Level CLI ────────────────────────────────────────────────────

/// baobab -- query a BAOBAB server from the command line
#[derive(Debug, Parser)]
#[command(
    name = "baobab",
    version,
    about = "Query BAOBAB servers from the command line",
    long_about = "Fetch logins, people, places and things from a BAOBAB server.\n\n\
        Connection settings come from a config profile, environment variables,\n\
        or the global flags below, in increasing order of priority.",
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
    /// Config profile to use
    #[arg(long, short = 'p', env = "BAOBAB_PROFILE", global = true)]
    pub profile: Option<String>,

    /// Server base URL (overrides profile)
    #[arg(long, short = 's', env = "BAOBAB_SERVER", global = true)]
    pub server: Option<String>,

    /// Shared server secret
    #[arg(long, env = "BAOBAB_SERVER_SECRET", global = true, hide_env_values = true)]
    pub secret: Option<String>,

    /// Login to authenticate as
    #[arg(long, short = 'u', env = "BAOBAB_LOGIN_ID", global = true)]
    pub login_id: Option<String>,

    /// Password for --login-id
    #[arg(long, env = "BAOBAB_PASSWORD", global = true, hide_env_values = true)]
    pub password: Option<String>,

    /// Login lifetime in seconds
    #[arg(long, env = "BAOBAB_LOGIN_TIMEOUT", global = true)]
    pub login_timeout: Option<u64>,

    /// Output format
    #[arg(
        long,
        short = 'o',
        env = "BAOBAB_OUTPUT",
        default_value = "table",
        global = true
    )]
    pub output: OutputFormat,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(long, short = 'v', action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(long, short = 'q', global = true)]
    pub quiet: bool,

    /// Accept self-signed TLS certificates
    #[arg(long, short = 'k', env = "BAOBAB_INSECURE", global = true)]
    pub insecure: bool,

    /// Request timeout in seconds
    #[arg(long, env = "BAOBAB_TIMEOUT", global = true)]
    pub timeout: Option<u64>,
}

// ── Output ───────────────────────────────────────────────────────────

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

// ── Top-Level Command Enum ───────────────────────────────────────────

#[derive(Debug, Subcommand)]
pub enum Command {
    /// List the plugins the server exposes
    Plugins,

    /// Show the logged-in login, its user, and its permissions
    Whoami,

    /// Fetch records of one kind by id
    #[command(alias = "get")]
    Fetch(FetchArgs),

    /// Fetch things by their string key
    Things(ThingsArgs),

    /// Fetch logins by id or login name
    Logins(LoginsArgs),

    /// Fetch data records by id without knowing their kind
    Baseline(BaselineArgs),

    /// Find records near a point
    Search(SearchArgs),

    /// Manage CLI configuration and profiles
    Config(ConfigArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  RECORDS
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct FetchArgs {
    /// Record kind (login, token, user, place, thing)
    pub kind: RecordKind,

    /// Record ids
    #[arg(required = true, value_delimiter = ',')]
    pub ids: Vec<i64>,
}

#[derive(Debug, Args)]
pub struct ThingsArgs {
    /// Thing keys
    #[arg(required = true, value_delimiter = ',')]
    pub keys: Vec<String>,
}

#[derive(Debug, Args)]
pub struct LoginsArgs {
    /// Login record ids
    #[arg(long, value_delimiter = ',')]
    pub ids: Vec<i64>,

    /// Login names
    #[arg(value_delimiter = ',', required_unless_present = "ids")]
    pub names: Vec<String>,
}

#[derive(Debug, Args)]
pub struct BaselineArgs {
    /// Data record ids
    #[arg(required = true, value_delimiter = ',')]
    pub ids: Vec<i64>,
}

#[derive(Debug, Args)]
pub struct SearchArgs {
    /// Data kind to search (user, place, thing)
    pub kind: RecordKind,

    /// Latitude of the search center
    #[arg(long, allow_negative_numbers = true)]
    pub lat: f64,

    /// Longitude of the search center
    #[arg(long, allow_negative_numbers = true)]
    pub lng: f64,

    /// Search radius in kilometers
    #[arg(long, short = 'r')]
    pub radius: f64,
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
    /// Write a profile from --server, --secret and --login-id
    Init {
        /// Store secrets in the system keyring instead of the file
        #[arg(long)]
        keyring: bool,
    },

    /// Display the current configuration (secrets redacted)
    Show,

    /// Print the config file path
    Path,

    /// List configured profiles
    Profiles,

    /// Set the default profile
    Use {
        /// Profile name to set as default
        name: String,
    },

    /// Store a secret in the system keyring
    StoreSecret {
        /// Which secret to store
        item: SecretItem,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum SecretItem {
    /// The shared server secret
    ServerSecret,
    /// The login password
    Password,
}

impl SecretItem {
    /// Keyring entry suffix, as read by `baobab-config`.
    pub fn keyring_suffix(self) -> &'static str {
        match self {
            Self::ServerSecret => "server-secret",
            Self::Password => "password",
        }
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  COMPLETIONS
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    pub shell: clap_complete::Shell,
}
