//! Clap derive structures for the `zerofly` CLI.
//!
//! Defines the complete command tree, global flags, and shared types.

use clap::{Args, Parser, Subcommand, ValueEnum};

// ── Top-Level CLI ────────────────────────────────────────────────────

/// zerofly -- command-line companion for ZeroTier One
#[derive(Debug, Parser)]
#[command(
    name = "zerofly",
    version,
    about = "Inspect and control the local ZeroTier service",
    long_about = "Inspect and control the local ZeroTier One service.\n\n\
        Reads node, network, and peer state from the service's local API\n\
        and drives the system service and network interfaces on this host.",
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
    /// Local API URL of the ZeroTier service (overrides config)
    #[arg(long, short = 'u', env = "ZEROFLY_URL", global = true)]
    pub url: Option<String>,

    /// Auth token (default: ZEROFLY_TOKEN, keyring, then authtoken.secret)
    #[arg(long, global = true, hide_env = true)]
    pub token: Option<String>,

    /// Output format
    #[arg(
        long,
        short = 'o',
        env = "ZEROFLY_OUTPUT",
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

    /// Skip confirmation prompts
    #[arg(long, short = 'y', global = true)]
    pub yes: bool,

    /// Local API request timeout in seconds (overrides config)
    #[arg(long, env = "ZEROFLY_TIMEOUT", global = true)]
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
    /// Show node identity, service health, and totals
    #[command(alias = "st")]
    Status,

    /// List, join, leave, and configure networks
    #[command(alias = "net", alias = "n")]
    Networks(NetworksArgs),

    /// List peers and their paths
    #[command(alias = "p")]
    Peers(PeersArgs),

    /// Control the ZeroTier system service
    #[command(alias = "svc")]
    Service(ServiceArgs),

    /// Follow model changes until interrupted
    Watch(WatchArgs),

    /// Manage CLI configuration
    Config(ConfigArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

// ── Networks ─────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct NetworksArgs {
    #[command(subcommand)]
    pub command: NetworksCommand,
}

#[derive(Debug, Subcommand)]
pub enum NetworksCommand {
    /// List joined networks
    #[command(alias = "ls")]
    List,

    /// Show one network in detail
    Get {
        /// 16-hex-digit network ID
        id: String,
    },

    /// Join a network
    Join {
        /// 16-hex-digit network ID
        id: String,

        /// Wait up to SECS for the network to leave REQUESTING_CONFIGURATION
        #[arg(long, value_name = "SECS")]
        wait: Option<u64>,
    },

    /// Leave a network
    Leave {
        /// 16-hex-digit network ID
        id: String,
    },

    /// Bring the network's host interface up
    Up {
        /// 16-hex-digit network ID
        id: String,
    },

    /// Take the network's host interface down
    Down {
        /// 16-hex-digit network ID
        id: String,
    },

    /// Change what the network is allowed to configure on this host
    Set(NetworkSetArgs),
}

#[derive(Debug, Args)]
pub struct NetworkSetArgs {
    /// 16-hex-digit network ID
    pub id: String,

    /// Allow the network to override the default route
    #[arg(long)]
    pub allow_default: Option<bool>,

    /// Allow managed addresses that overlap public IP space
    #[arg(long)]
    pub allow_global: Option<bool>,

    /// Allow managed addresses and routes
    #[arg(long)]
    pub allow_managed: Option<bool>,

    /// Allow the network to push DNS settings
    #[arg(long)]
    pub allow_dns: Option<bool>,
}

// ── Peers ────────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct PeersArgs {
    #[command(subcommand)]
    pub command: PeersCommand,
}

#[derive(Debug, Subcommand)]
pub enum PeersCommand {
    /// List known peers
    #[command(alias = "ls")]
    List {
        /// Only show peers with this role (LEAF, MOON, PLANET)
        #[arg(long)]
        role: Option<String>,
    },

    /// Show the physical paths to one peer
    Paths {
        /// 10-hex-digit peer address
        address: String,
    },
}

// ── Service ──────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct ServiceArgs {
    #[command(subcommand)]
    pub command: ServiceCommand,
}

#[derive(Debug, Subcommand)]
pub enum ServiceCommand {
    /// Show the service unit's run and boot state
    Status,
    /// Start the service
    Start,
    /// Stop the service
    Stop,
    /// Start the service at boot
    Enable,
    /// Do not start the service at boot
    Disable,
}

// ── Watch ────────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct WatchArgs {
    /// Poll interval in milliseconds (overrides config)
    #[arg(long)]
    pub interval_ms: Option<u64>,

    /// Exit after this many change sets
    #[arg(long)]
    pub count: Option<usize>,
}

// ── Config ───────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Print the config file location
    Path,

    /// Show the effective configuration and where the token comes from
    Show,

    /// Write a config file (interactive unless --yes)
    Init {
        /// Overwrite an existing config file
        #[arg(long)]
        force: bool,
    },

    /// Store an auth token in the system keyring
    SetToken {
        /// Read the token from this file instead of prompting
        #[arg(long)]
        from_file: Option<std::path::PathBuf>,
    },

    /// Copy the service's auth token into the config directory (asks for
    /// your password; starts the service first if it never ran)
    FetchToken {
        /// Replace an existing copy
        #[arg(long)]
        force: bool,
    },
}

// ── Completions ──────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    pub shell: clap_complete::Shell,
}
