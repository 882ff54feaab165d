use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};
use hydra_settings::models::{DownloadDestination, MediaLongPressAction};
use hydra_settings::SettingValueType;

#[derive(Parser)]
#[command(name = "hydra-settings")]
#[command(about = "Inspect and edit Hydra account settings from the command line")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    #[command(flatten)]
    pub locations: LocationArgs,
}

/// Where the engine keeps its state. Each path falls back to an environment
/// variable, then to the platform data directory.
#[derive(Args, Debug, Clone, Default)]
pub struct LocationArgs {
    /// Path to the settings config JSON file
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Path to the local settings database
    #[arg(long, global = true, value_name = "PATH")]
    pub store: Option<PathBuf>,

    /// Path to the shared cloud settings document
    #[arg(long, global = true, value_name = "PATH")]
    pub cloud: Option<PathBuf>,

    /// Path to the durability snapshot file
    #[arg(long, global = true, value_name = "PATH")]
    pub snapshot: Option<PathBuf>,

    /// Run without cloud sync
    #[arg(long, global = true)]
    pub no_cloud: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Show the active account
    Whoami,
    /// Switch to an account and sync its settings
    Login {
        /// Account username
        username: String,
    },
    /// Switch back to guest settings
    Logout,
    /// Read a setting
    Get {
        /// Setting key, e.g. showUsername
        key: String,
        /// Account to read from (active account when omitted)
        #[arg(short, long)]
        user: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Write a setting
    Set {
        /// Setting key
        key: String,
        /// New value
        value: String,
        /// Value type
        #[arg(short = 't', long = "type", value_enum, default_value_t = ValueTypeArg::String)]
        value_type: ValueTypeArg,
        /// Account to write to (active account when omitted)
        #[arg(short, long)]
        user: Option<String>,
    },
    /// Delete a setting
    #[command(alias = "rm")]
    Delete {
        /// Setting key
        key: String,
        /// Account to delete from (active account when omitted)
        #[arg(short, long)]
        user: Option<String>,
    },
    /// List every setting of an account
    List {
        /// Account to list (active account when omitted)
        #[arg(short, long)]
        user: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Manage the durability snapshot file
    Snapshot {
        #[command(subcommand)]
        command: SnapshotCommands,
    },
    /// Reconcile an account with the cloud store
    Sync {
        /// Account to sync (active account when omitted)
        #[arg(short, long)]
        user: Option<String>,
    },
    /// Inspect the cloud store
    Cloud {
        #[command(subcommand)]
        command: CloudCommands,
    },
    /// Manage the download settings backup
    Backup {
        #[command(subcommand)]
        command: BackupCommands,
    },
    /// Generate shell completion scripts
    Completions {
        /// Target shell
        #[arg(value_enum)]
        shell: CompletionShell,
        /// Optional output path (stdout when omitted)
        #[arg(short, long, value_name = "PATH")]
        output: Option<PathBuf>,
    },
}

#[derive(Subcommand)]
pub enum SnapshotCommands {
    /// Write the snapshot file now
    Save,
    /// Replay the snapshot file into the store
    Restore,
    /// Print the snapshot file
    Show,
}

#[derive(Subcommand)]
pub enum CloudCommands {
    /// Print an account's cloud record
    Show {
        /// Account to show (active account when omitted)
        #[arg(short, long)]
        user: Option<String>,
    },
    /// List accounts that have a cloud record
    List,
}

#[derive(Subcommand)]
pub enum BackupCommands {
    /// Print an account's download settings backup
    Show {
        /// Account to show (active account when omitted)
        #[arg(short, long)]
        user: Option<String>,
    },
    /// Replace an account's download settings backup
    Set {
        /// Long-press action
        #[arg(long, value_enum)]
        action: Option<LongPressActionArg>,
        /// Download destination
        #[arg(long, value_enum)]
        destination: Option<DestinationArg>,
        /// Files folder URI
        #[arg(long, value_name = "URI")]
        folder: Option<String>,
        /// Account to update (active account when omitted)
        #[arg(short, long)]
        user: Option<String>,
    },
    /// Fill missing download settings from the backup
    Restore {
        /// Account to restore (active account when omitted)
        #[arg(short, long)]
        user: Option<String>,
    },
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, ValueEnum)]
pub enum ValueTypeArg {
    String,
    Number,
    #[value(alias = "bool")]
    Boolean,
}

impl From<ValueTypeArg> for SettingValueType {
    fn from(value: ValueTypeArg) -> Self {
        match value {
            ValueTypeArg::String => Self::String,
            ValueTypeArg::Number => Self::Number,
            ValueTypeArg::Boolean => Self::Boolean,
        }
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, ValueEnum)]
pub enum LongPressActionArg {
    Share,
    Download,
}

impl From<LongPressActionArg> for MediaLongPressAction {
    fn from(value: LongPressActionArg) -> Self {
        match value {
            LongPressActionArg::Share => Self::Share,
            LongPressActionArg::Download => Self::Download,
        }
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, ValueEnum)]
pub enum DestinationArg {
    Photos,
    Files,
}

impl From<DestinationArg> for DownloadDestination {
    fn from(value: DestinationArg) -> Self {
        match value {
            DestinationArg::Photos => Self::Photos,
            DestinationArg::Files => Self::Files,
        }
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, ValueEnum)]
pub enum CompletionShell {
    Bash,
    Zsh,
    Fish,
}

impl From<CompletionShell> for clap_complete::Shell {
    fn from(value: CompletionShell) -> Self {
        match value {
            CompletionShell::Bash => Self::Bash,
            CompletionShell::Zsh => Self::Zsh,
            CompletionShell::Fish => Self::Fish,
        }
    }
}
