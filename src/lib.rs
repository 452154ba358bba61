//! # odbc-lite
//!
//! Thin wrappers around the handles of an ODBC style driver. A [`Connection`] owns an environment
//! and a connection handle, a [`Statement`] owns a statement handle and the storage of its bound
//! parameters, a [`Field`] decodes a single cell of the current row.
//!
//! Operations report failure as `false` (or a zero / empty sentinel). The reason is available
//! through `last_error` and `last_error_status_code` right after the failing call.
//!
//! The driver is anything implementing [`sys::Driver`].
//!
//! ```no_run
//! use odbc_lite::{Connection, Statement, sys::Driver};
//! use std::rc::Rc;
//!
//! fn print_books(driver: Rc<dyn Driver>) {
//!     let connection = Connection::with_data_source(driver, "MyDSN", "", "");
//!     if !connection.connected() {
//!         eprintln!("Error connecting with server: {}", connection.last_error());
//!         return;
//!     }
//!     let mut statement = Statement::new();
//!     if !statement.execute_direct(&connection, "SELECT * FROM books") {
//!         eprintln!("Cannot execute query: {}", statement.last_error());
//!         return;
//!     }
//!     while statement.fetch_next() {
//!         for column in 1..=statement.count_columns() {
//!             print!("{}\t", statement.field(column as u16).as_string());
//!         }
//!         println!();
//!     }
//! }
//! ```

mod connection;
mod field;
mod fixed_sized;
mod parameter;
mod statement;

pub mod handles;
pub mod sys;

pub use self::{
    connection::{Connection, ConnectionOptions},
    field::Field,
    fixed_sized::FixedSizedCType,
    handles::{ColumnDescription, Error, Nullable},
    parameter::{Param, Parameter},
    statement::Statement,
};
// Reexports
pub use widestring::{U16Str, U16String};

/// Major version. Only increased for major changes.
pub fn version_major() -> u16 {
    version_component(env!("CARGO_PKG_VERSION_MAJOR"))
}

/// Minor version. Increased when features are added or removed.
pub fn version_minor() -> u16 {
    version_component(env!("CARGO_PKG_VERSION_MINOR"))
}

/// Revision. Changed for bug fixes only.
pub fn version_revision() -> u16 {
    version_component(env!("CARGO_PKG_VERSION_PATCH"))
}

fn version_component(text: &str) -> u16 {
    atoi::atoi(text.as_bytes()).unwrap_or(0)
}
