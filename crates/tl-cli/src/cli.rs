//! Command-line argument definitions.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

/// Flat-file time tracker.
///
/// Start and stop tasks; every task keeps its history in its own CSV file.
#[derive(Debug, Parser)]
#[command(name = "tl", version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Path to config file.
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Directory holding the task files.
    #[arg(short, long, global = true)]
    pub data_dir: Option<PathBuf>,

    /// Keep the previous version of rewritten task files as `<task>.csv~`.
    #[arg(long, global = true)]
    pub backup: bool,

    /// Do not write the parse cache.
    #[arg(long, global = true)]
    pub no_cache: bool,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available subcommands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Start a task. Without a name, resumes the most recent task.
    Start {
        task: Option<String>,

        /// Allow starting a task that has no history yet.
        #[arg(short, long)]
        new: bool,

        /// Start time instead of now (e.g., 2024-01-15T09:00:00Z).
        #[arg(long)]
        at: Option<String>,
    },

    /// Stop the running task.
    Stop {
        /// Note attached to the stopped event.
        #[arg(short, long)]
        message: Option<String>,

        /// Re-stop the most recent event if nothing is running.
        #[arg(short, long)]
        amend: bool,
    },

    /// Stop the running task and start another one.
    ///
    /// Without a name, switches back to the previous task.
    Switch {
        task: Option<String>,

        /// Note attached to the stopped event.
        #[arg(short, long)]
        message: Option<String>,

        /// Allow switching to a task that has no history yet.
        #[arg(short, long)]
        new: bool,

        /// Switch time instead of now.
        #[arg(long)]
        at: Option<String>,
    },

    /// Track a task for as long as a command runs.
    Run {
        task: String,

        /// Allow a task that has no history yet.
        #[arg(short, long)]
        new: bool,

        /// The command and its arguments.
        #[arg(last = true, required = true)]
        command: Vec<String>,
    },

    /// Show time per task.
    Report(Filter),

    /// Print events in ledger timeclock format.
    Ledger(Filter),

    /// Show the most recent event.
    Last(Filter),

    /// Print the running task, if any.
    Running,

    /// Check the task files for overlapping or future events.
    ///
    /// Exits with the number of problems found.
    Fsck,
}

/// Event selection shared by the reporting commands.
#[derive(Debug, Clone, Args)]
pub struct Filter {
    /// Only events of this task.
    pub task: Option<String>,

    /// Only events starting in the current day, week, month or year (UTC).
    #[arg(short, long, value_enum, default_value_t = Period::All)]
    pub period: Period,
}

/// Reporting period, relative to today.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum Period {
    Day,
    Week,
    Month,
    Year,
    #[default]
    All,
}
