//! Ledger command: events as timeclock entries.
//!
//! Each stopped event becomes a check-in and a check-out line; a running
//! event only has its check-in. Times are UTC.
//!
//! ```text
//! i 2024/01/15 09:00:00 coding  wrote the parser
//! o 2024/01/15 10:30:00
//! ```

use std::io::Write;

use anyhow::Result;
use chrono::{DateTime, Utc};
use tl_core::{Event, codec};
use tl_store::EventStore;

use super::util::select;
use crate::Config;
use crate::cli::Filter;

const TIMECLOCK_FORMAT: &str = "%Y/%m/%d %H:%M:%S";

fn timeclock(timestamp: DateTime<Utc>) -> String {
    timestamp.format(TIMECLOCK_FORMAT).to_string()
}

/// Runs the ledger command.
pub fn run<W: Write>(writer: &mut W, config: &Config, filter: &Filter) -> Result<()> {
    let store = EventStore::read(&config.data_dir, config.cache)?;
    let today = codec::now().date_naive();
    render(writer, &select(&store, filter, today))
}

/// Writes every event of `store` in timeclock format.
pub fn render<W: Write>(writer: &mut W, store: &EventStore) -> Result<()> {
    for event in store {
        write_entry(writer, event)?;
    }
    Ok(())
}

fn write_entry<W: Write>(writer: &mut W, event: &Event) -> Result<()> {
    let check_in = format!("i {} {}", timeclock(event.start()), event.task());
    if event.message().is_empty() {
        writeln!(writer, "{check_in}")?;
    } else {
        // Messages are single-line in timeclock.
        let message = event.message().replace(['\n', '\r'], " ");
        writeln!(writer, "{check_in}  {message}")?;
    }

    if event.is_running().is_none() {
        writeln!(writer, "o {}", timeclock(event.end()))?;
    }
    Ok(())
}
