//! The capability surface this crate requires from a driver.
//!
//! Names and values follow the ODBC C API. Any implementation with ODBC equivalent semantics can
//! be plugged in by implementing [`Driver`]. Every method is a direct, blocking call. Return codes
//! are reported as [`SqlReturn`], details are left behind as diagnostic records on the handle which
//! has been passed to the call.

use std::ffi::c_void;

use crate::handles::SqlChar;

/// Opaque handle to an environment, connection or statement.
pub type Handle = *mut c_void;
/// Untyped pointer to a value buffer.
pub type Pointer = *mut c_void;
/// Signed length, used for buffer lengths and length/indicator values.
pub type Len = isize;
/// Unsigned length, used for column sizes.
pub type ULen = usize;

/// Length of an SQLSTATE code, excluding the terminating zero.
pub const SQLSTATE_SIZE: usize = 5;

/// Indicator value: the value is NULL.
pub const NULL_DATA: Len = -1;
/// Indicator value: the length of the remaining data is not known.
pub const NO_TOTAL: Len = -4;
/// Length value: the input buffer is terminated by zero.
pub const NTS: Len = -3;

/// Kind of handle passed to [`Driver::alloc_handle`], [`Driver::free_handle`] and
/// [`Driver::get_diag_rec`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(i16)]
pub enum HandleType {
    Env = 1,
    Dbc = 2,
    Stmt = 3,
}

/// Return code of a driver call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(transparent)]
pub struct SqlReturn(pub i16);

impl SqlReturn {
    pub const INVALID_HANDLE: SqlReturn = SqlReturn(-2);
    pub const ERROR: SqlReturn = SqlReturn(-1);
    pub const SUCCESS: SqlReturn = SqlReturn(0);
    pub const SUCCESS_WITH_INFO: SqlReturn = SqlReturn(1);
    pub const STILL_EXECUTING: SqlReturn = SqlReturn(2);
    pub const NEED_DATA: SqlReturn = SqlReturn(99);
    pub const NO_DATA: SqlReturn = SqlReturn(100);
}

/// C representation a value is converted into (or from) by the driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(i16)]
pub enum CDataType {
    Char = 1,
    WChar = -8,
    SLong = -16,
    ULong = -18,
    SShort = -15,
    UShort = -17,
    Float = 7,
    Double = 8,
}

/// SQL data type of a column or parameter on the data source side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(transparent)]
pub struct SqlDataType(pub i16);

impl SqlDataType {
    pub const UNKNOWN_TYPE: SqlDataType = SqlDataType(0);
    pub const CHAR: SqlDataType = SqlDataType(1);
    pub const NUMERIC: SqlDataType = SqlDataType(2);
    pub const DECIMAL: SqlDataType = SqlDataType(3);
    pub const INTEGER: SqlDataType = SqlDataType(4);
    pub const SMALLINT: SqlDataType = SqlDataType(5);
    pub const FLOAT: SqlDataType = SqlDataType(6);
    pub const REAL: SqlDataType = SqlDataType(7);
    pub const DOUBLE: SqlDataType = SqlDataType(8);
    pub const VARCHAR: SqlDataType = SqlDataType(12);
    pub const EXT_W_VARCHAR: SqlDataType = SqlDataType(-9);
}

/// Direction of a bound parameter. Only input parameters are supported.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i16)]
pub enum ParamType {
    Input = 1,
}

/// Options for [`Driver::free_stmt`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u16)]
pub enum FreeStmtOption {
    /// Closes the cursor, discarding pending results.
    Close = 0,
    /// Releases all column buffers bound by the application.
    Unbind = 2,
    /// Releases all parameter buffers bound to the statement.
    ResetParams = 3,
}

/// ODBC version an environment declares to the driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum AttrOdbcVersion {
    Odbc3 = 3,
    Odbc3_80 = 380,
}

/// Nullability of a column as reported by [`Driver::describe_col`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(transparent)]
pub struct Nullability(pub i16);

impl Nullability {
    pub const NO_NULLS: Nullability = Nullability(0);
    pub const NULLABLE: Nullability = Nullability(1);
    pub const UNKNOWN: Nullability = Nullability(2);
}

/// Low level driver interface.
///
/// All text arguments are [`SqlChar`] buffers. Lengths of text arguments are given in characters
/// (or [`NTS`]), buffer lengths of value buffers are given in bytes, as in ODBC.
///
/// # Safety
///
/// All pointers passed to these functions must be valid for the documented extent. The caller has
/// to ensure buffers registered with [`Driver::bind_parameter`] stay valid and unmoved until they
/// are unbound, rebound or the statement handle is freed. Implementations must only dereference
/// pointers within the limits passed alongside them.
pub trait Driver {
    /// Allocates an environment (`input` is null), connection (`input` is an environment) or
    /// statement (`input` is a connection) handle and writes it to `output`.
    unsafe fn alloc_handle(
        &self,
        handle_type: HandleType,
        input: Handle,
        output: *mut Handle,
    ) -> SqlReturn;

    /// Frees a handle allocated with [`Driver::alloc_handle`].
    unsafe fn free_handle(&self, handle_type: HandleType, handle: Handle) -> SqlReturn;

    /// Declares the ODBC version the application expects on an environment handle.
    unsafe fn set_odbc_version(&self, environment: Handle, version: AttrOdbcVersion) -> SqlReturn;

    /// Opens a session with the data source `server_name`. `user` and `authentication` may be
    /// null, in which case the defaults stored with the data source are used.
    #[allow(clippy::too_many_arguments)]
    unsafe fn connect(
        &self,
        connection: Handle,
        server_name: *const SqlChar,
        server_name_length: i16,
        user: *const SqlChar,
        user_length: i16,
        authentication: *const SqlChar,
        authentication_length: i16,
    ) -> SqlReturn;

    /// Opens a session described by a connection string (e.g. `DSN=books;UID=sque;PWD=secret`).
    /// The driver never prompts for missing information.
    unsafe fn driver_connect(
        &self,
        connection: Handle,
        connection_string: *const SqlChar,
        connection_string_length: i16,
    ) -> SqlReturn;

    /// Closes the session of a connection handle.
    unsafe fn disconnect(&self, connection: Handle) -> SqlReturn;

    /// Compiles statement text for later execution.
    unsafe fn prepare(&self, statement: Handle, text: *const SqlChar, length: i32) -> SqlReturn;

    /// Compiles and executes statement text in one go.
    unsafe fn exec_direct(&self, statement: Handle, text: *const SqlChar, length: i32)
    -> SqlReturn;

    /// Executes previously prepared statement text, using the currently bound parameters.
    unsafe fn execute(&self, statement: Handle) -> SqlReturn;

    /// Advances the cursor by one row. Returns [`SqlReturn::NO_DATA`] past the last row.
    unsafe fn fetch(&self, statement: Handle) -> SqlReturn;

    /// Number of columns in the result set.
    unsafe fn num_result_cols(&self, statement: Handle, column_count: *mut i16) -> SqlReturn;

    /// Name, type, size and nullability of a result set column.
    #[allow(clippy::too_many_arguments)]
    unsafe fn describe_col(
        &self,
        statement: Handle,
        column_number: u16,
        column_name: *mut SqlChar,
        buffer_length: i16,
        name_length: *mut i16,
        data_type: *mut SqlDataType,
        column_size: *mut ULen,
        decimal_digits: *mut i16,
        nullable: *mut Nullability,
    ) -> SqlReturn;

    /// Closes the cursor, discarding any pending results.
    unsafe fn close_cursor(&self, statement: Handle) -> SqlReturn;

    /// Stops processing associated with a statement, see [`FreeStmtOption`].
    unsafe fn free_stmt(&self, statement: Handle, option: FreeStmtOption) -> SqlReturn;

    /// Retrieves data for a single column of the current row, converted to `target_type`.
    ///
    /// For character data the value is terminated by zero. If it does not fit into
    /// `buffer_length` the driver writes what fits, reports the length of the remaining data (or
    /// [`NO_TOTAL`]) in `str_len_or_ind` and returns [`SqlReturn::SUCCESS_WITH_INFO`]. The next
    /// call for the same column continues with the remaining data. Once all data has been
    /// returned further calls yield [`SqlReturn::NO_DATA`].
    unsafe fn get_data(
        &self,
        statement: Handle,
        column_number: u16,
        target_type: CDataType,
        target_value: Pointer,
        buffer_length: Len,
        str_len_or_ind: *mut Len,
    ) -> SqlReturn;

    /// Binds a buffer to a parameter marker. The driver keeps `parameter_value` and
    /// `str_len_or_ind` and reads them at execution time.
    #[allow(clippy::too_many_arguments)]
    unsafe fn bind_parameter(
        &self,
        statement: Handle,
        parameter_number: u16,
        input_output_type: ParamType,
        value_type: CDataType,
        parameter_type: SqlDataType,
        column_size: ULen,
        decimal_digits: i16,
        parameter_value: Pointer,
        buffer_length: Len,
        str_len_or_ind: *mut Len,
    ) -> SqlReturn;

    /// Copies diagnostic record `rec_number` (starting at 1) of a handle. The state is written as
    /// five characters plus terminating zero.
    #[allow(clippy::too_many_arguments)]
    unsafe fn get_diag_rec(
        &self,
        handle_type: HandleType,
        handle: Handle,
        rec_number: i16,
        state: *mut SqlChar,
        native_error: *mut i32,
        message_text: *mut SqlChar,
        buffer_length: i16,
        text_length: *mut i16,
    ) -> SqlReturn;
}
