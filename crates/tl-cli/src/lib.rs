//! Command-line interface of the tl time tracker.
//!
//! Argument parsing, configuration and output rendering. All storage
//! semantics live in `tl-store`.

mod cli;
pub mod commands;
mod config;
pub mod exit;

pub use cli::{Cli, Commands, Filter, Period};
pub use config::Config;
