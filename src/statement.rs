use crate::{
    Connection, Field,
    handles::{self, ColumnDescription, Record},
    parameter::{Param, Parameter},
    sys::Handle,
};
use log::debug;
use std::{collections::BTreeMap, marker::PhantomData, ptr::null_mut};

/// A statement on the data source. Used to execute queries directly, or to prepare them and
/// execute them multiple times with the same or different parameters.
///
/// A statement is open from the moment its handle has been allocated until [`Statement::close`].
/// A closed statement can be reused by opening it again, which [`Statement::prepare`] and
/// [`Statement::execute_direct`] do implicitly. The lifetime `'c` ties the statement to the
/// [`Connection`] it has been opened on.
///
/// Failures are reported as `false`. Call [`Statement::last_error`] right after the failing call
/// to learn why. Errors which happen before a statement handle exists, e.g. while opening, are
/// reported by [`Connection::last_error`] instead.
pub struct Statement<'c> {
    /// `Some` while the statement is open.
    handle: Option<handles::Statement>,
    /// Input parameters bound to `handle`, by parameter number. Boxed, since the driver keeps
    /// pointers into them.
    parameters: BTreeMap<u16, Box<Parameter>>,
    connection: PhantomData<&'c Connection>,
}

impl Default for Statement<'_> {
    fn default() -> Self {
        Self::new()
    }
}

impl<'c> Statement<'c> {
    /// A closed statement, ready to be opened.
    pub fn new() -> Self {
        Self {
            handle: None,
            parameters: BTreeMap::new(),
            connection: PhantomData,
        }
    }

    /// Opens a statement on `connection` and prepares `statement_text`. Check
    /// [`Statement::is_open`] to learn whether opening worked.
    pub fn with_query(connection: &'c Connection, statement_text: &str) -> Self {
        let mut statement = Self::new();
        statement.prepare(connection, statement_text);
        statement
    }

    /// Closes the statement, then allocates a new statement handle on `connection`.
    ///
    /// There is no need to call this directly, `prepare` and `execute_direct` do so.
    pub fn open(&mut self, connection: &'c Connection) -> bool {
        self.close();

        let Some(connection) = connection.handle() else {
            debug!("Opening statement failed. Connection handle is not allocated.");
            return false;
        };
        match connection.allocate_statement().into_result(connection) {
            Ok(handle) => {
                self.handle = Some(handle);
                true
            }
            Err(error) => {
                debug!("Opening statement failed: {error}");
                false
            }
        }
    }

    /// `true` if a statement handle has been allocated.
    pub fn is_open(&self) -> bool {
        self.handle.is_some()
    }

    /// Discards results, the prepared statement text and all parameters, then frees the statement
    /// handle.
    pub fn close(&mut self) {
        if let Some(mut handle) = self.handle.take() {
            // The cursor may well be closed already. Any error is irrelevant since the handle is
            // freed right away.
            let _ = handle.close_cursor();
            drop(handle);
            debug!("Statement closed.");
        }
        self.parameters.clear();
    }

    /// Closes the statement, opens a new one on `connection` and prepares `statement_text` for
    /// execution. Parameter markers (`?`) can be bound using [`Statement::param`].
    ///
    /// If preparation fails the statement stays open, yet [`Statement::execute`] must not be
    /// relied upon.
    pub fn prepare(&mut self, connection: &'c Connection, statement_text: &str) -> bool {
        if !self.open(connection) {
            return false;
        }
        let Some(handle) = self.handle.as_mut() else {
            return false;
        };
        let result = handle.prepare(statement_text).into_result(&*handle);
        report("prepare", result)
    }

    /// Closes the statement, opens a new one on `connection` and executes `statement_text`.
    ///
    /// A statement which did not affect any rows (driver reports no data) counts as success.
    pub fn execute_direct(&mut self, connection: &'c Connection, statement_text: &str) -> bool {
        if !self.open(connection) {
            return false;
        }
        let Some(handle) = self.handle.as_mut() else {
            return false;
        };
        let result = handle.exec_direct(statement_text).into_result(&*handle);
        report("execute_direct", result.map(|_| ()))
    }

    /// Executes the prepared statement using the current parameter values.
    pub fn execute(&mut self) -> bool {
        let Some(handle) = self.handle.as_mut() else {
            debug!("Execute failed. Statement is not open.");
            return false;
        };
        let result = handle.execute().into_result(&*handle);
        report("execute", result.map(|_| ()))
    }

    /// Moves the cursor to the next row. Must be called once before the fields of the first row
    /// can be read.
    ///
    /// # Return
    ///
    /// `true` if the cursor is positioned on a row. `false` past the last row, if there is no
    /// result set or the statement is closed. After the last row the cursor is closed, so the
    /// statement can be executed again.
    pub fn fetch_next(&mut self) -> bool {
        let Some(handle) = self.handle.as_mut() else {
            return false;
        };
        match handle.fetch().into_result(&*handle) {
            Ok(true) => true,
            Ok(false) => {
                // Past the last row. The cursor is closed on the driver side.
                if let Err(error) = handle.close_cursor().into_result(&*handle) {
                    debug!("Closing cursor after last row failed: {error}");
                }
                false
            }
            Err(error) => {
                debug!("fetch_next failed: {error}");
                false
            }
        }
    }

    /// Accessor for column `column` (starting at `1`) of the current row. The column number is
    /// not validated, out of range columns fail to decode.
    pub fn field(&self, column: u16) -> Field<'_> {
        Field::new(self.handle.as_ref(), column)
    }

    /// Number of columns in the result set. `-1` if the statement is closed or the driver
    /// reported an error.
    pub fn count_columns(&self) -> i16 {
        let Some(handle) = self.handle.as_ref() else {
            return -1;
        };
        handle
            .num_result_cols()
            .into_result(handle)
            .map_err(|error| debug!("count_columns failed: {error}"))
            .unwrap_or(-1)
    }

    /// Name of column `column` (starting at `1`). Empty if not available.
    pub fn column_name(&self, column: u16) -> String {
        self.describe_column(column)
            .map(|description| description.name_to_string())
            .unwrap_or_default()
    }

    /// Name, type and nullability of column `column` (starting at `1`).
    pub fn describe_column(&self, column: u16) -> Option<ColumnDescription> {
        let handle = self.handle.as_ref()?;
        let mut description = ColumnDescription::default();
        handle
            .describe_col(column, &mut description)
            .into_result(handle)
            .map_err(|error| debug!("Describing column {column} failed: {error}"))
            .ok()?;
        Some(description)
    }

    /// Closes the cursor. Prepared text and parameter bindings are kept.
    pub fn free_results(&mut self) {
        if let Some(handle) = self.handle.as_mut() {
            if let Err(error) = handle.close_cursor().into_result(&*handle) {
                debug!("free_results failed: {error}");
            }
        }
    }

    /// Parameter `number` (starting at `1`). A new, zero valued parameter is created on first
    /// access. Its storage is owned by the statement until [`Statement::close`] or
    /// [`Statement::reset_parameters`].
    ///
    /// ```no_run
    /// # use odbc_lite::{Connection, Statement};
    /// # fn books(connection: &Connection) {
    /// let mut statement = Statement::new();
    /// statement.prepare(connection, "SELECT * FROM books WHERE author_id = ?");
    /// statement.param(1).set_as_long(2);
    /// statement.execute();
    /// # }
    /// ```
    pub fn param(&mut self, number: u16) -> Param<'_> {
        let parameter = self
            .parameters
            .entry(number)
            .or_insert_with(|| Box::new(Parameter::new(number)));
        Param::new(self.handle.as_mut(), parameter)
    }

    /// Unbinds all parameters on the driver side and releases their storage. A subsequent
    /// [`Statement::param`] starts with a fresh, zero valued parameter. No-op if closed.
    pub fn reset_parameters(&mut self) {
        let Some(handle) = self.handle.as_mut() else {
            return;
        };
        if let Err(error) = handle.reset_parameters().into_result(&*handle) {
            debug!("reset_parameters failed: {error}");
            // The driver may still point into the buffers. Keep them alive.
            return;
        }
        self.parameters.clear();
    }

    /// Number of parameters currently owned by the statement.
    pub fn num_params(&self) -> usize {
        self.parameters.len()
    }

    /// First diagnostic record of the statement handle. `None` if closed.
    pub fn last_record(&self) -> Option<Record> {
        self.handle.as_ref().and_then(Record::first_of)
    }

    /// Message of the diagnostic the driver left behind for the last call on this statement.
    /// Empty if the last call succeeded or the statement is closed.
    pub fn last_error(&self) -> String {
        self.last_record()
            .map(|record| record.message_to_string())
            .unwrap_or_default()
    }

    /// Five character SQLSTATE of the last diagnostic on this statement. Empty if the last call
    /// succeeded or the statement is closed.
    pub fn last_error_status_code(&self) -> String {
        self.last_record()
            .map(|record| record.state.as_str().to_owned())
            .unwrap_or_default()
    }

    /// Raw statement handle, for use with the driver directly. Null if closed.
    pub fn native_stmt_handle(&self) -> Handle {
        self.handle
            .as_ref()
            .map_or(null_mut(), handles::Statement::as_raw)
    }
}

impl Drop for Statement<'_> {
    fn drop(&mut self) {
        self.close();
    }
}

fn report(operation: &str, result: Result<(), handles::Error>) -> bool {
    match result {
        Ok(()) => true,
        Err(error) => {
            debug!("{operation} failed: {error}");
            false
        }
    }
}
