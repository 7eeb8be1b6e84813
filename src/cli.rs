//! CLI argument parsing with clap.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::config::DEFAULT_CONFIG_PATH;

#[derive(Parser, Debug)]
#[command(name = "ipset-exec")]
#[command(author, version, about = "Run ipset subcommands with typed output")]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Config file path
    #[arg(short, long, default_value = DEFAULT_CONFIG_PATH, global = true)]
    pub config: PathBuf,

    /// Path to the ipset binary (overrides config and PATH search)
    #[arg(long, global = true)]
    pub binary: Option<PathBuf>,

    /// Per-invocation timeout, e.g. 30s or 2m ("0s" disables)
    #[arg(long, global = true)]
    pub timeout: Option<String>,

    /// Quiet mode (errors only)
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Verbose mode (debug output, shows every ipset invocation)
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Create a new set
    Create {
        name: String,
        /// Set type, e.g. hash:ip, hash:net, bitmap:port
        set_type: String,
        /// Bare keyword option (counters, comment, skbinfo); repeatable
        #[arg(long = "flag")]
        flags: Vec<String>,
        /// Trailing key/value options, e.g. `timeout 300 maxelem 1024`
        #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
        options: Vec<String>,
    },

    /// Add an entry to a set
    Add {
        name: String,
        entry: String,
        /// Do not fail if the entry is already present
        #[arg(long)]
        exist: bool,
        #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
        options: Vec<String>,
    },

    /// Delete an entry from a set
    Del {
        name: String,
        entry: String,
        #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
        options: Vec<String>,
    },

    /// Test whether an entry is in a set (exit status 1 when it is not)
    Test {
        name: String,
        entry: String,
        #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
        options: Vec<String>,
    },

    /// Destroy a set, or all sets when no name is given
    Destroy { name: Option<String> },

    /// Flush a set, or all sets when no name is given
    Flush { name: Option<String> },

    /// Rename a set
    Rename { from: String, to: String },

    /// Swap the content of two sets
    Swap { from: String, to: String },

    /// Save a set (or all sets) to a file, or to stdout without --file
    Save {
        name: Option<String>,
        #[arg(short, long)]
        file: Option<PathBuf>,
    },

    /// Restore sets from a file, or from stdin without --file
    Restore {
        #[arg(short, long)]
        file: Option<PathBuf>,
        /// Ignore sets and entries that already exist (stdin only)
        #[arg(long, conflicts_with = "file")]
        exist: bool,
    },

    /// List one set, or all sets when no name is given
    List {
        name: Option<String>,
        /// Headers only, no members
        #[arg(short = 't', long)]
        terse: bool,
    },

    /// List set names
    Names,

    /// List the entries of a set
    Entries { name: String },

    /// Show how many kernel references point at a set
    Refs { name: String },

    /// Atomically replace the contents of a set
    Refresh {
        name: String,
        entries: Vec<String>,
        /// Read entries from a file, one per line ('#' starts a comment)
        #[arg(long)]
        from_file: Option<PathBuf>,
    },

    /// Show the ipset binary version
    Version,
}
