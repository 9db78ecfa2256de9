use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "warden", version, about = "Policy-driven governance for self-modifying codebases")]
pub(crate) struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Output as structured JSON
    #[arg(long, global = true)]
    pub json: bool,

    /// Log progress to stderr
    #[arg(long, global = true)]
    pub verbose: bool,

    /// Repository root (default: current directory)
    #[arg(long, global = true, env = "WARDEN_ROOT")]
    pub root: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub(crate) enum Commands {
    /// Run every policy check over the repository
    Audit {
        /// Stop starting new checks after this many seconds (0 = no limit)
        #[arg(long)]
        timeout: Option<u64>,
        /// Worker threads for check execution
        #[arg(long)]
        workers: Option<usize>,
    },

    /// Validate candidate paths against hard invariants and policy rules
    CheckPaths {
        /// Repository-relative or absolute paths
        #[arg(required = true)]
        paths: Vec<String>,
        /// Judge the write of this file's content to the (single) path
        #[arg(long)]
        content_from: Option<PathBuf>,
    },

    /// Prove an edit only touches comments, docs, and layout
    VerifyEdit {
        /// File before the edit
        original: PathBuf,
        /// File after the edit
        modified: PathBuf,
        /// Path used for language detection and reporting (default: ORIGINAL)
        #[arg(long)]
        path: Option<String>,
        /// Longest permitted new comment line
        #[arg(long)]
        max_comment_length: Option<usize>,
        /// Comma-separated permitted edit categories (default: all)
        #[arg(long, value_delimiter = ',')]
        allow: Vec<String>,
    },

    /// Inspect and run governed actions
    Actions {
        #[command(subcommand)]
        command: ActionCommands,
    },
}

#[derive(Subcommand, Debug)]
pub(crate) enum ActionCommands {
    /// List registered actions
    List {
        /// Only actions in this category
        #[arg(long)]
        category: Option<String>,
    },

    /// Dispatch one action
    Run {
        /// Action id
        id: String,
        /// JSON parameters
        #[arg(long, default_value = "{}")]
        params: String,
        /// Apply changes instead of reporting them
        #[arg(long)]
        write: bool,
    },
}

#[cfg(test)]
#[path = "cli_args_tests.rs"]
mod tests;
