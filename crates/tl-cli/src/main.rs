use std::io;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use tl_cli::commands::{fsck, ledger, report, status, track};
use tl_cli::{Cli, Commands, Config, exit};

/// Loads config and applies command-line overrides.
fn load_config(cli: &Cli) -> Result<Config> {
    let mut config =
        Config::load_from(cli.config.as_deref()).context("failed to load configuration")?;

    if let Some(data_dir) = &cli.data_dir {
        config.data_dir.clone_from(data_dir);
    }
    if cli.backup {
        config.backup = true;
    }
    if cli.no_cache {
        config.cache = false;
    }

    tracing::debug!(?config, "loaded configuration");
    Ok(config)
}

/// Dispatches the subcommand and returns the exit code on success.
fn run(cli: &Cli) -> Result<u8> {
    let mut out = io::stdout();

    let Some(command) = &cli.command else {
        // No subcommand, show help
        use clap::CommandFactory;
        Cli::command().print_help()?;
        println!();
        return Ok(0);
    };

    let config = load_config(cli)?;

    match command {
        Commands::Start { task, new, at } => {
            track::start(&mut out, &config, task.as_deref(), *new, at.as_deref())?;
        }
        Commands::Stop { message, amend } => {
            track::stop(&mut out, &config, message.clone(), *amend)?;
        }
        Commands::Switch {
            task,
            message,
            new,
            at,
        } => {
            track::switch(
                &mut out,
                &config,
                task.as_deref(),
                message.clone(),
                *new,
                at.as_deref(),
            )?;
        }
        Commands::Run { task, new, command } => {
            return track::run(&mut out, &config, task, *new, command);
        }
        Commands::Report(filter) => report::run(&mut out, &config, filter)?,
        Commands::Ledger(filter) => ledger::run(&mut out, &config, filter)?,
        Commands::Last(filter) => status::last(&mut out, &config, filter)?,
        Commands::Running => status::running(&mut out, &config)?,
        Commands::Fsck => return fsck::run(&mut out, &config),
    }

    Ok(0)
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    // Initialize tracing with verbose flag support
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::from_default_env()
    };
    // Use try_init to avoid panic if tracing is already initialized (e.g., in tests)
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .try_init();

    match run(&cli) {
        Ok(code) => ExitCode::from(code),
        Err(err) => {
            eprintln!("tl: {err:#}");
            ExitCode::from(exit::code_for(&err))
        }
    }
}
