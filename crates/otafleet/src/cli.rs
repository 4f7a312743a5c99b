//! Clap derive structures for the `otafleet` CLI.
//!
//! Defines the command tree, global flags, and shared types.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

// ── Top-Level CLI ────────────────────────────────────────────────────

/// otafleet -- admin console for OTA fleet servers
#[derive(Debug, Parser)]
#[command(
    name = "otafleet",
    version,
    about = "Manage OTA fleet devices and firmware from the command line",
    long_about = "Administer an over-the-air update server: list and edit the\n\
        device registry, upload and remove firmware images, and manage the\n\
        admin API key used to authorize every request.",
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
    /// Server profile to use
    #[arg(long, short = 'p', env = "OTAFLEET_PROFILE", global = true)]
    pub profile: Option<String>,

    /// Server base URL (overrides profile)
    #[arg(long, short = 's', env = "OTAFLEET_SERVER", global = true)]
    pub server: Option<String>,

    /// Admin API key (skips keyring/config resolution)
    #[arg(long, env = "OTAFLEET_API_KEY", global = true, hide_env = true)]
    pub api_key: Option<String>,

    /// Output format
    #[arg(
        long,
        short = 'o',
        env = "OTAFLEET_OUTPUT",
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

    /// Accept self-signed TLS certificates
    #[arg(long, short = 'k', env = "OTAFLEET_INSECURE", global = true)]
    pub insecure: bool,

    /// Request timeout in seconds
    #[arg(long, env = "OTAFLEET_TIMEOUT", default_value = "30", global = true)]
    pub timeout: u64,
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
    /// Manage registered devices
    #[command(alias = "dev", alias = "d")]
    Devices(DevicesArgs),

    /// Manage firmware images
    #[command(alias = "fw", alias = "f")]
    Firmware(FirmwareArgs),

    /// Manage CLI configuration and profiles
    Config(ConfigArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  DEVICES
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct DevicesArgs {
    #[command(subcommand)]
    pub command: DevicesCommand,
}

#[derive(Debug, Subcommand)]
pub enum DevicesCommand {
    /// List registered devices
    #[command(alias = "ls")]
    List,

    /// Show a single device
    Show {
        /// Device MAC address
        #[arg(value_name = "MAC")]
        mac: String,
    },

    /// Register a new device
    Add {
        /// Device MAC address
        #[arg(long, required = true, value_name = "MAC")]
        mac: String,

        /// Device field as key=value (repeatable); values parse as
        /// JSON when possible, else as strings
        #[arg(long = "field", short = 'f', value_name = "KEY=VALUE")]
        fields: Vec<String>,

        /// Read device fields from a JSON file ('-' for stdin)
        #[arg(long, short = 'F', value_name = "FILE")]
        from_file: Option<PathBuf>,
    },

    /// Update an existing device
    Update {
        /// Device MAC address
        #[arg(value_name = "MAC")]
        mac: String,

        /// Device field as key=value (repeatable)
        #[arg(long = "field", short = 'f', value_name = "KEY=VALUE")]
        fields: Vec<String>,

        /// Read device fields from a JSON file ('-' for stdin)
        #[arg(long, short = 'F', value_name = "FILE")]
        from_file: Option<PathBuf>,
    },

    /// Remove a device from the registry
    #[command(alias = "rm")]
    Delete {
        /// Device MAC address
        #[arg(value_name = "MAC")]
        mac: String,
    },
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  FIRMWARE
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct FirmwareArgs {
    #[command(subcommand)]
    pub command: FirmwareCommand,
}

#[derive(Debug, Subcommand)]
pub enum FirmwareCommand {
    /// List firmware images on the server
    #[command(alias = "ls")]
    List,

    /// Show a single firmware image
    Show {
        /// Firmware filename
        #[arg(value_name = "FILENAME")]
        filename: String,
    },

    /// Upload a firmware image
    Upload {
        /// Path to the firmware file
        #[arg(value_name = "PATH")]
        path: PathBuf,

        /// Filename to store on the server (default: the local name)
        #[arg(long, value_name = "NAME")]
        name: Option<String>,
    },

    /// Remove a firmware image from the server
    #[command(alias = "rm")]
    Delete {
        /// Firmware filename
        #[arg(value_name = "FILENAME")]
        filename: String,
    },
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

    /// List configured profiles
    Profiles,

    /// Set the default profile
    Use {
        /// Profile name to set as default
        name: String,
    },

    /// Store the admin API key in the system keyring
    SetKey {
        /// Profile name (default: active profile)
        #[arg(long)]
        profile: Option<String>,
    },
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  COMPLETIONS
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    pub shell: clap_complete::Shell,
}
