//! Report command: time per task over a period.

use std::io::Write;

use anyhow::Result;
use tl_core::{codec, format_timestamp};
use tl_store::EventStore;

use super::util::{format_hours, select};
use crate::Config;
use crate::cli::Filter;

const TOTAL_LABEL: &str = "total";

/// Runs the report command.
pub fn run<W: Write>(writer: &mut W, config: &Config, filter: &Filter) -> Result<()> {
    let store = EventStore::read(&config.data_dir, config.cache)?;
    let today = codec::now().date_naive();
    let selected = select(&store, filter, today);
    tracing::debug!(events = selected.len(), ?filter, "rendering report");
    render(writer, &selected)
}

/// Writes one line per task, a grand total, and the running task if any.
///
/// Running events contribute nothing to the totals.
pub fn render<W: Write>(writer: &mut W, store: &EventStore) -> Result<()> {
    if store.is_empty() {
        writeln!(writer, "No events recorded.")?;
        return Ok(());
    }

    let totals = store.totals_by_task();
    let width = totals
        .keys()
        .map(|task| task.as_str().len())
        .chain(std::iter::once(TOTAL_LABEL.len()))
        .max()
        .unwrap_or_default();

    for (task, duration) in &totals {
        writeln!(
            writer,
            "{:<width$}  {:>8}",
            task.as_str(),
            format_hours(*duration)
        )?;
    }
    writeln!(
        writer,
        "{TOTAL_LABEL:<width$}  {:>8}",
        format_hours(store.sum())
    )?;

    if let Some(event) = store.running_event() {
        writeln!(writer)?;
        writeln!(
            writer,
            "{} running since {}",
            event.task(),
            format_timestamp(event.start())
        )?;
    }

    Ok(())
}
