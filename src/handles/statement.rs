use super::{
    AsHandle, ExtSqlReturn, SqlResult,
    buffer::{clamp_int, clamp_small_int, mut_buf_ptr},
    column_description::ColumnDescription,
    drop_handle,
    sql_char::SqlText,
};
use crate::sys::{
    CDataType, Driver, FreeStmtOption, Handle, HandleType, Len, Nullability, ParamType, Pointer,
    SqlDataType, ULen,
};
use std::rc::Rc;

/// Wraps a valid (i.e. successfully allocated) statement handle.
pub struct Statement {
    driver: Rc<dyn Driver>,
    handle: Handle,
}

unsafe impl AsHandle for Statement {
    fn as_handle(&self) -> Handle {
        self.handle
    }

    fn handle_type(&self) -> HandleType {
        HandleType::Stmt
    }

    fn driver(&self) -> &dyn Driver {
        self.driver.as_ref()
    }
}

impl Drop for Statement {
    fn drop(&mut self) {
        unsafe {
            drop_handle(self.driver.as_ref(), self.handle, HandleType::Stmt);
        }
    }
}

impl Statement {
    /// # Safety
    ///
    /// `handle` must be a valid (successfully allocated) statement handle of `driver`.
    pub unsafe fn new(driver: Rc<dyn Driver>, handle: Handle) -> Self {
        Self { driver, handle }
    }

    /// Provides access to the raw statement handle.
    pub fn as_raw(&self) -> Handle {
        self.handle
    }

    /// Send an SQL statement to the data source for preparation. The application can include one
    /// or more parameter markers in the SQL statement. To include a parameter marker, the
    /// application embeds a question mark (?) into the SQL string at the appropriate position.
    pub fn prepare(&mut self, statement_text: &str) -> SqlResult<()> {
        let text = SqlText::new(statement_text);
        unsafe {
            self.driver
                .prepare(self.handle, text.ptr(), clamp_int(text.len()))
                .into_sql_result("SQLPrepare")
        }
    }

    /// Executes a preparable statement, using the current values of the parameter marker variables
    /// if any parameters exist in the statement. SQLExecDirect is the fastest way to submit an SQL
    /// statement for one-time execution.
    ///
    /// # Return
    ///
    /// `false` if the driver reported `NO_DATA`, e.g. for a searched update which did not affect
    /// any row.
    pub fn exec_direct(&mut self, statement_text: &str) -> SqlResult<bool> {
        let text = SqlText::new(statement_text);
        unsafe {
            self.driver
                .exec_direct(self.handle, text.ptr(), clamp_int(text.len()))
                .into_sql_result_bool("SQLExecDirect")
        }
    }

    /// Executes a statement prepared by `prepare`. After the application processes or discards the
    /// results from a call to `execute`, the application can call `execute` again with new
    /// parameter values.
    pub fn execute(&mut self) -> SqlResult<bool> {
        unsafe { self.driver.execute(self.handle) }.into_sql_result_bool("SQLExecute")
    }

    /// Returns the next row of the result set. `false` once the cursor moved past the last row.
    ///
    /// It can be called only while a result set exists: I.e., after a call that creates a result
    /// set and before the cursor over that result set is closed.
    pub fn fetch(&mut self) -> SqlResult<bool> {
        unsafe { self.driver.fetch(self.handle) }.into_sql_result_bool("SQLFetch")
    }

    /// Close an open cursor.
    pub fn close_cursor(&mut self) -> SqlResult<()> {
        unsafe { self.driver.close_cursor(self.handle) }.into_sql_result("SQLCloseCursor")
    }

    /// Release all parameter buffers bound by `bind_input_parameter`.
    pub fn reset_parameters(&mut self) -> SqlResult<()> {
        unsafe { self.driver.free_stmt(self.handle, FreeStmtOption::ResetParams) }
            .into_sql_result("SQLFreeStmt")
    }

    /// Number of columns in result set. `0` if the statement did not create a result set.
    pub fn num_result_cols(&self) -> SqlResult<i16> {
        let mut out: i16 = 0;
        unsafe { self.driver.num_result_cols(self.handle, &mut out) }
            .into_sql_result("SQLNumResultCols")
            .on_success(|| out)
    }

    /// Fetch a column description using the column index.
    ///
    /// # Parameters
    ///
    /// * `column_number`: Column index. `0` is the bookmark column. The other column indices start
    ///   with `1`.
    /// * `column_description`: Holds the description of the column after the call. This method
    ///   does not provide strong exception safety as the value of this argument is undefined in
    ///   case of an error.
    pub fn describe_col(
        &self,
        column_number: u16,
        column_description: &mut ColumnDescription,
    ) -> SqlResult<()> {
        let name = &mut column_description.name;
        // Use maximum available capacity.
        name.resize(name.capacity(), 0);
        let mut name_length: i16 = 0;
        let mut data_type = SqlDataType::UNKNOWN_TYPE;
        let mut column_size: ULen = 0;
        let mut decimal_digits = 0;
        let mut nullable = Nullability::UNKNOWN;

        let res = unsafe {
            self.driver
                .describe_col(
                    self.handle,
                    column_number,
                    mut_buf_ptr(name),
                    clamp_small_int(name.len()),
                    &mut name_length,
                    &mut data_type,
                    &mut column_size,
                    &mut decimal_digits,
                    &mut nullable,
                )
                .into_sql_result("SQLDescribeCol")
        };

        if res.is_err() {
            return res;
        }

        column_description.data_type = data_type;
        column_description.column_size = column_size;
        column_description.decimal_digits = decimal_digits;
        column_description.nullable = nullable.into();

        let name_length = name_length.max(0) as usize;
        if name_length + 1 > name.len() {
            // Buffer is too small to hold name, retry with larger buffer
            name.resize(name_length + 1, 0);
            self.describe_col(column_number, column_description)
        } else {
            name.resize(name_length, 0);
            res
        }
    }

    /// Retrieves data for a single column in the result set.
    ///
    /// `Success(false)` means the driver reported `NO_DATA`, i.e. all data of the column has
    /// already been retrieved.
    ///
    /// # Safety
    ///
    /// `target_value` must be valid for writes of `buffer_length` bytes and point to storage
    /// suitable for `target_type`. `indicator` must be valid for writes or null.
    pub unsafe fn get_data(
        &self,
        column_number: u16,
        target_type: CDataType,
        target_value: Pointer,
        buffer_length: Len,
        indicator: *mut Len,
    ) -> SqlResult<bool> {
        unsafe {
            self.driver.get_data(
                self.handle,
                column_number,
                target_type,
                target_value,
                buffer_length,
                indicator,
            )
        }
        .into_sql_result_bool("SQLGetData")
    }

    /// Binds a buffer holding an input parameter to a parameter marker in an SQL statement.
    ///
    /// # Safety
    ///
    /// * `value` and `indicator` must stay valid and at the same address until the parameter is
    ///   rebound, the bindings are reset or the statement handle is freed.
    /// * `value` must point to a value of `value_type`. For text it must either be zero terminated
    ///   (`indicator` holding `NTS`) or `indicator` must hold its length in bytes.
    #[allow(clippy::too_many_arguments)]
    pub unsafe fn bind_input_parameter(
        &mut self,
        parameter_number: u16,
        value_type: CDataType,
        parameter_type: SqlDataType,
        column_size: ULen,
        value: Pointer,
        buffer_length: Len,
        indicator: *mut Len,
    ) -> SqlResult<()> {
        unsafe {
            self.driver.bind_parameter(
                self.handle,
                parameter_number,
                ParamType::Input,
                value_type,
                parameter_type,
                column_size,
                0,
                value,
                buffer_length,
                indicator,
            )
        }
        .into_sql_result("SQLBindParameter")
    }
}
