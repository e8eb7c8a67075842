//! Process exit codes.

use std::io;

use tl_core::{NotRunningError, ParseError, StopError, ValidationError};
use tl_store::StoreError;

use crate::commands::track::NoPreviousTask;

/// Exit code for rejected operations and malformed data.
pub const DOMAIN_ERROR: u8 = 2;

/// Exit code for failures without a more specific code.
pub const FAILURE: u8 = 1;

/// Maps an error to the process exit code.
///
/// Domain errors exit with [`DOMAIN_ERROR`]; I/O errors with their OS error
/// number. The first recognised error in the chain decides.
pub fn code_for(err: &anyhow::Error) -> u8 {
    for cause in err.chain() {
        if let Some(store) = cause.downcast_ref::<StoreError>() {
            return store.io_error().map_or(DOMAIN_ERROR, os_code);
        }
        if cause.is::<ValidationError>()
            || cause.is::<ParseError>()
            || cause.is::<NotRunningError>()
            || cause.is::<StopError>()
            || cause.is::<NoPreviousTask>()
        {
            return DOMAIN_ERROR;
        }
        if let Some(io) = cause.downcast_ref::<io::Error>() {
            return os_code(io);
        }
    }
    FAILURE
}

fn os_code(err: &io::Error) -> u8 {
    err.raw_os_error()
        .and_then(|code| u8::try_from(code).ok())
        .filter(|code| *code != 0)
        .unwrap_or(FAILURE)
}
