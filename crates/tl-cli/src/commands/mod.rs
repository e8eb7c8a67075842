//! CLI subcommand implementations.

pub mod fsck;
pub mod ledger;
pub mod report;
pub mod status;
pub mod track;
pub mod util;
