//! Provides basic abstraction over valid (i.e. allocated) driver handles.
//!
//! Two decisions are already baked into this module:
//!
//! * Treat warnings by logging them with `log`.
//! * Use the text width selected at compile time (see [`SqlChar`]) for all string arguments.

mod as_handle;
mod buffer;
mod column_description;
mod connection;
mod diagnostics;
mod environment;
mod error;
mod logging;
mod sql_char;
mod sql_result;
mod statement;

pub use {
    as_handle::AsHandle,
    column_description::{ColumnDescription, Nullable},
    connection::Connection,
    diagnostics::{DiagnosticResult, Diagnostics, Record, State},
    environment::Environment,
    error::Error,
    logging::log_diagnostics,
    sql_char::{SqlChar, SqlText, TEXT_C_TYPE, slice_to_cow_utf8, slice_to_utf8},
    sql_result::{ExtSqlReturn, SqlResult},
    statement::Statement,
};

use crate::sys::{Driver, Handle, HandleType, SqlReturn};
use log::debug;
use std::thread::panicking;

/// Helper function freeing a handle and panicking on errors. Yet if the drop is triggered during
/// another panic, the function will simply ignore errors from failed drops.
///
/// # Safety
///
/// `handle` must be a valid handle of type `handle_type` allocated by `driver`. It must not be
/// used afterwards.
unsafe fn drop_handle(driver: &dyn Driver, handle: Handle, handle_type: HandleType) {
    match unsafe { driver.free_handle(handle_type, handle) } {
        SqlReturn::SUCCESS => debug!("Freed {handle_type:?} handle."),
        other => {
            // Avoid panicking, if we already have a panic. We don't want to mask the
            // original error.
            if !panicking() {
                panic!("Unexpected return value of SQLFreeHandle: {other:?}")
            }
        }
    }
}
