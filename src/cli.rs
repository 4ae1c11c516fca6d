use clap::{Parser, Subcommand};

/// claude_env - Switch between Claude CLI accounts
///
/// Each environment is a directory holding its own copy of the Claude CLI
/// configuration (`~/.claude.json` and `~/.claude/` by default). The active
/// environment is the one those paths are symlinked into, so the CLI reads
/// and writes straight through to it.
#[derive(Parser, Debug)]
#[command(name = "claude_env", author, version, about, long_about)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Adopt the existing Claude configuration as the first environment
    Init,

    /// Create an empty environment and switch to it
    Add {
        /// Environment name (letters, digits, '.', '_', '@', '+', '-')
        #[arg(value_name = "NAME")]
        name: String,
    },

    /// Activate an environment
    Switch {
        #[arg(value_name = "NAME")]
        name: String,
    },

    /// Rename the active environment
    Rename {
        /// New name for the active environment
        #[arg(value_name = "NEW_NAME")]
        name: String,
    },

    /// List environments and their credentials
    #[command(alias = "ls")]
    List,

    /// Write detached configuration back into the active environment
    Save,

    /// Show which environment is active and whether it is linked correctly
    Status,

    /// Configure the active environment to use an API key
    SetApi {
        /// API key
        #[arg(value_name = "KEY")]
        key: String,

        /// API endpoint URL
        #[arg(value_name = "ENDPOINT")]
        endpoint: String,
    },

    /// Delete an environment and its stored configuration
    #[command(alias = "rm")]
    Remove {
        #[arg(value_name = "NAME")]
        name: String,

        /// Skip the confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },

    /// Remove the claude_env launcher
    Uninstall {
        /// Skip the confirmation prompt
        #[arg(short, long)]
        yes: bool,

        /// Also delete all stored environments and claude_env's own files
        #[arg(long)]
        purge: bool,
    },
}
