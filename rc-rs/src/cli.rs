//! Command-line interface definitions

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Recycle bin for the command line: trash, list, restore and purge files
#[derive(Parser, Debug)]
#[command(name = "rc", version, about, long_about = None)]
pub struct Cli {
    /// Configuration file (defaults to ~/.trashrc)
    #[arg(long = "config", global = true, env = "RC_CONFIG", value_name = "PATH")]
    pub config_path: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Move files or directories to the trash
    #[command(visible_aliases = ["trash", "rm"])]
    Put {
        #[arg(required = true, value_name = "PATH")]
        paths: Vec<PathBuf>,
    },

    /// List items in the trash, oldest first
    #[command(visible_alias = "ls")]
    List,

    /// Restore an item to its original location (interactive without TARGET)
    Restore {
        /// Trash name or original path
        target: Option<String>,
    },

    /// Permanently delete one item from the trash
    #[command(visible_alias = "delete")]
    Remove {
        /// Trash name or original path
        target: String,

        /// Skip the confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },

    /// Permanently delete everything in the trash
    Empty {
        /// Skip the confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },

    /// Show the total size of the trash
    Size,

    /// Delete items past auto_empty_days, then the oldest until under max_trash_size_mb
    Prune {
        /// Skip the confirmation prompt
        #[arg(short, long)]
        yes: bool,

        /// Only show what would be deleted
        #[arg(long)]
        dry_run: bool,
    },

    /// Check that every payload has a record and vice versa
    Doctor {
        /// Drop broken records and adopt payloads that lost theirs
        #[arg(long)]
        fix: bool,
    },

    /// Show or change configuration
    Config {
        #[command(subcommand)]
        action: Option<ConfigAction>,
    },
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum ConfigAction {
    /// Print one value
    Get { key: String },

    /// Change one value and save
    Set { key: String, value: String },

    /// Restore every value to its default
    Reset,
}
