//! Command-line argument definitions.

use std::path::PathBuf;
use std::time::Duration;

use clap::{Args, Parser, Subcommand};

use promethium::{WorkflowKind, WorkflowStatus};

/// Promethium - submit and track computational-chemistry workflows
#[derive(Parser, Debug)]
#[command(name = "promethium")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// API key (overrides PM_API_KEY and the config file)
    #[arg(short = 'k', long)]
    pub api_key: Option<String>,

    /// API base URL (overrides PM_BASE_URL and the config file)
    #[arg(short = 'b', long, hide = true)]
    pub base_url: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Read and write ~/.promethium.ini
    Config {
        #[command(subcommand)]
        action: ConfigCommand,
    },

    /// Submit, inspect and manage workflows
    #[command(visible_alias = "wf")]
    Workflows {
        #[command(subcommand)]
        action: WorkflowCommand,
    },

    /// Manage files in the remote file tree
    Files {
        #[command(subcommand)]
        action: FileCommand,
    },
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommand {
    /// Print the current configuration
    Read,

    /// Store an API key
    Credentials {
        /// The API key to store
        api_key: String,
    },

    /// Store the API base URL
    BaseUrl {
        /// The base URL to store
        url: String,
    },
}

/// Polling flags shared by commands that can wait for a workflow.
#[derive(Args, Debug, Clone)]
pub struct WaitArgs {
    /// Wait for the workflow to reach a terminal status
    #[arg(short, long)]
    pub wait: bool,

    /// Give up waiting after this long (e.g. "24h", "13h 23m 42s", "90")
    #[arg(short, long, default_value = "24h", value_parser = parse_duration)]
    pub timeout: Duration,

    /// Seconds between status checks
    #[arg(short, long, default_value_t = 10, value_parser = clap::value_parser!(u64).range(1..))]
    pub interval: u64,
}

#[derive(Subcommand, Debug)]
pub enum WorkflowCommand {
    /// List workflows
    #[command(visible_alias = "ls")]
    List {
        /// Only workflows of this kind
        #[arg(short, long, value_parser = parse_kind)]
        kind: Option<WorkflowKind>,

        /// Only workflows whose name contains this text
        #[arg(short, long)]
        search: Option<String>,

        /// Only workflows with this status (repeatable)
        #[arg(short = 't', long, value_parser = parse_status)]
        status: Vec<WorkflowStatus>,

        /// Page number
        #[arg(short, long, default_value_t = 1, value_parser = clap::value_parser!(u32).range(1..))]
        page: u32,

        /// Page size
        #[arg(short = 'z', long, default_value_t = 10, value_parser = clap::value_parser!(u32).range(1..))]
        size: u32,
    },

    /// Submit a workflow from a JSON definition
    #[command(visible_alias = "n")]
    New {
        /// JSON workflow definition
        input_file: PathBuf,

        #[command(flatten)]
        wait: WaitArgs,

        /// Save the results archive here after waiting
        #[arg(short, long)]
        output_dir: Option<PathBuf>,
    },

    /// Print workflow results
    #[command(visible_alias = "res")]
    Results {
        id: String,

        #[command(flatten)]
        wait: WaitArgs,
    },

    /// Download the results archive
    #[command(visible_alias = "dl")]
    Download {
        id: String,

        #[command(flatten)]
        wait: WaitArgs,

        /// Directory to write `<id>-results.zip` into
        #[arg(short, long)]
        output_dir: PathBuf,
    },

    /// Print the current status
    #[command(visible_alias = "s")]
    Status { id: String },

    /// Print the full workflow record
    #[command(visible_alias = "r")]
    Read { id: String },

    /// Stop a running workflow
    Stop { id: String },

    /// Delete a finished workflow
    Delete { id: String },

    /// Estimate peak memory for a JSON workflow definition
    Memory { input_file: PathBuf },
}

#[derive(Subcommand, Debug)]
pub enum FileCommand {
    /// List a directory (the root when omitted)
    Ls {
        dir: Option<String>,

        /// Only entries whose name contains this text
        #[arg(short, long)]
        search: Option<String>,
    },

    /// Copy between local and remote: a file id downloads, a local path uploads
    Cp { src: String, dest: String },

    /// Move a file or directory (to the root when DIR is omitted)
    Mv { src: String, dir: Option<String> },

    /// Create a directory
    Mkdir { name: String, dir: Option<String> },

    /// Delete a file or directory
    Rm { id: String },

    /// Print file metadata
    Get { id: String },

    /// Write file content to stdout
    Data { id: String },
}

/// Parse a workflow kind, case-insensitively, rejecting unknown labels.
pub fn parse_kind(input: &str) -> Result<WorkflowKind, String> {
    match input.parse::<WorkflowKind>() {
        Ok(WorkflowKind::Other(label)) => Err(format!(
            "unknown workflow kind '{label}' (expected one of: {})",
            WorkflowKind::KNOWN.join(", ")
        )),
        Ok(kind) => Ok(kind),
        Err(never) => match never {},
    }
}

/// Parse a workflow status, case-insensitively, rejecting unknown labels.
pub fn parse_status(input: &str) -> Result<WorkflowStatus, String> {
    match input.parse::<WorkflowStatus>() {
        Ok(WorkflowStatus::Other(label)) => Err(format!(
            "unknown workflow status '{label}' (expected one of: {})",
            WorkflowStatus::KNOWN.join(", ")
        )),
        Ok(status) => Ok(status),
        Err(never) => match never {},
    }
}

/// Parse a human duration: bare seconds (`90`), or unit spans such as
/// `24h`, `13h 23m 42s` or `15 minutes`.
pub fn parse_duration(input: &str) -> Result<Duration, String> {
    let input = input.trim();
    if let Ok(secs) = input.parse::<u64>() {
        return Ok(Duration::from_secs(secs));
    }
    humantime::parse_duration(input).map_err(|e| format!("invalid duration '{input}': {e}"))
}
