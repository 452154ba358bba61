//! An in-memory driver for the integration tests.
//!
//! Behaves like a strict ODBC driver: it keeps diagnostics per handle, insists on the documented
//! call order (e.g. no execution with an open cursor) and hands out long text in parts. Queries are
//! not parsed. Each statement text the tests want to run is registered up front, together with a
//! closure computing its result from the bound parameters.

#![allow(dead_code)]

use odbc_lite::{
    handles::{SqlChar, SqlText, slice_to_utf8},
    sys::{
        AttrOdbcVersion, CDataType, Driver, FreeStmtOption, Handle, HandleType, Len, NO_TOTAL,
        NTS, NULL_DATA, Nullability, ParamType, Pointer, SqlDataType, SqlReturn, ULen,
    },
};
use std::{
    cell::RefCell,
    collections::{BTreeMap, HashMap, HashSet},
    ffi::c_void,
    mem::size_of,
    ptr,
    rc::Rc,
    slice,
};

/// Show log output of the crate under test. Safe to call from each test.
pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Value of a cell or a bound parameter.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Integer(i64),
    Real(f64),
    Text(String),
}

impl Value {
    pub fn text(text: &str) -> Self {
        Value::Text(text.to_owned())
    }

    fn to_text(&self) -> String {
        match self {
            Value::Null => String::new(),
            Value::Integer(value) => value.to_string(),
            Value::Real(value) => value.to_string(),
            Value::Text(value) => value.clone(),
        }
    }

    fn to_integer(&self) -> Result<i64, Diag> {
        match self {
            Value::Integer(value) => Ok(*value),
            Value::Real(value) => Ok(*value as i64),
            Value::Text(value) => value.trim().parse().map_err(|_| Diag::invalid_cast()),
            Value::Null => Err(Diag::invalid_cast()),
        }
    }

    fn to_real(&self) -> Result<f64, Diag> {
        match self {
            Value::Integer(value) => Ok(*value as f64),
            Value::Real(value) => Ok(*value),
            Value::Text(value) => value.trim().parse().map_err(|_| Diag::invalid_cast()),
            Value::Null => Err(Diag::invalid_cast()),
        }
    }
}

/// Rows and column names produced by a query.
#[derive(Debug, Clone, Default)]
pub struct ResultSet {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Value>>,
}

impl ResultSet {
    pub fn new(columns: &[&str], rows: Vec<Vec<Value>>) -> Self {
        Self {
            columns: columns.iter().map(|&name| name.to_owned()).collect(),
            rows,
        }
    }
}

/// Diagnostic record left behind on a handle, together with the return code of the call.
#[derive(Debug, Clone)]
pub struct Diag {
    ret: SqlReturn,
    state: &'static str,
    native_error: i32,
    message: String,
}

impl Diag {
    pub fn error(state: &'static str, message: impl Into<String>) -> Self {
        Self {
            ret: SqlReturn::ERROR,
            state,
            native_error: 0,
            message: message.into(),
        }
    }

    pub fn warning(state: &'static str, message: impl Into<String>) -> Self {
        Self {
            ret: SqlReturn::SUCCESS_WITH_INFO,
            ..Self::error(state, message)
        }
    }

    pub fn with_native_error(self, native_error: i32) -> Self {
        Self {
            native_error,
            ..self
        }
    }

    fn invalid_cursor_state() -> Self {
        Self::error("24000", "Invalid cursor state")
    }

    fn invalid_descriptor_index() -> Self {
        Self::error("07009", "Invalid descriptor index")
    }

    fn invalid_cast() -> Self {
        Self::error("22018", "Invalid character value for cast specification")
    }

    fn sequence_error() -> Self {
        Self::error("HY010", "Function sequence error")
    }
}

type Query = Rc<dyn Fn(&[Value]) -> Result<Option<ResultSet>, Diag>>;

/// Everything the driver knows about, apart from its handles.
#[derive(Default)]
struct Catalog {
    /// Data source name to default credentials. `None` if no credentials are required.
    data_sources: HashMap<String, Option<(String, String)>>,
    queries: HashMap<String, Query>,
    /// Statement text and parameters of each successful execution.
    executions: Vec<(String, Vec<Value>)>,
    /// Report the length of truncated text as unknown.
    no_total: bool,
    failing_allocations: HashSet<HandleType>,
    /// Refuse to disconnect, like drivers do while a transaction is pending.
    transaction_pending: bool,
    reject_bindings: bool,
}

struct Binding {
    value_type: CDataType,
    value: Pointer,
    indicator: *mut Len,
}

struct Cursor {
    columns: Vec<String>,
    rows: Vec<Vec<Value>>,
    /// `None` before the first fetch.
    position: Option<usize>,
    /// Characters of a text value already returned by `get_data`, per column.
    offsets: HashMap<u16, usize>,
    /// Columns of the current row which have been returned completely.
    consumed: HashSet<u16>,
}

impl Cursor {
    fn current(&self) -> Option<&Vec<Value>> {
        self.position.and_then(|position| self.rows.get(position))
    }
}

#[derive(Default)]
struct StatementState {
    text: Option<String>,
    bindings: BTreeMap<u16, Binding>,
    cursor: Option<Cursor>,
}

enum Object {
    Environment { version: Option<AttrOdbcVersion> },
    Connection { environment: usize, connected: bool },
    Statement { connection: usize, state: StatementState },
}

impl Object {
    fn handle_type(&self) -> HandleType {
        match self {
            Object::Environment { .. } => HandleType::Env,
            Object::Connection { .. } => HandleType::Dbc,
            Object::Statement { .. } => HandleType::Stmt,
        }
    }

    fn parent(&self) -> Option<usize> {
        match self {
            Object::Environment { .. } => None,
            Object::Connection { environment, .. } => Some(*environment),
            Object::Statement { connection, .. } => Some(*connection),
        }
    }
}

struct Entry {
    object: Object,
    diag: Option<Diag>,
}

#[derive(Default)]
struct Inner {
    catalog: Catalog,
    entries: HashMap<usize, Entry>,
    next_id: usize,
    allocations: HashMap<HandleType, usize>,
}

impl Inner {
    /// Runs `f` on the object behind `handle`, if it is of the expected type. Diagnostics of
    /// previous calls are discarded, an `Err` returned by `f` is left behind as the new one.
    fn call(
        &mut self,
        handle: Handle,
        handle_type: HandleType,
        f: impl FnOnce(&mut Object, &mut Catalog) -> Result<SqlReturn, Diag>,
    ) -> SqlReturn {
        let Some(entry) = self.entries.get_mut(&(handle as usize)) else {
            return SqlReturn::INVALID_HANDLE;
        };
        if entry.object.handle_type() != handle_type {
            return SqlReturn::INVALID_HANDLE;
        }
        entry.diag = None;
        match f(&mut entry.object, &mut self.catalog) {
            Ok(ret) => ret,
            Err(diag) => {
                let ret = diag.ret;
                entry.diag = Some(diag);
                ret
            }
        }
    }

    fn statement(
        &mut self,
        handle: Handle,
        f: impl FnOnce(&mut StatementState, &mut Catalog) -> Result<SqlReturn, Diag>,
    ) -> SqlReturn {
        self.call(handle, HandleType::Stmt, |object, catalog| match object {
            Object::Statement { state, .. } => f(state, catalog),
            _ => unreachable!(),
        })
    }

    fn connection(
        &mut self,
        handle: Handle,
        f: impl FnOnce(&mut bool, &mut Catalog) -> Result<SqlReturn, Diag>,
    ) -> SqlReturn {
        self.call(handle, HandleType::Dbc, |object, catalog| match object {
            Object::Connection { connected, .. } => f(connected, catalog),
            _ => unreachable!(),
        })
    }

    fn has_children(&self, id: usize) -> bool {
        self.entries
            .values()
            .any(|entry| entry.object.parent() == Some(id))
    }
}

/// Driver double handed to the crate under test as `Rc<dyn Driver>`.
#[derive(Default)]
pub struct FakeDriver {
    inner: RefCell<Inner>,
}

impl FakeDriver {
    pub fn new() -> Rc<Self> {
        Rc::new(Self::default())
    }

    /// Registers a data source. With `credentials` a connection must either omit user and
    /// password, or state exactly these.
    pub fn add_data_source(&self, name: &str, credentials: Option<(&str, &str)>) {
        self.inner.borrow_mut().catalog.data_sources.insert(
            name.to_owned(),
            credentials.map(|(user, password)| (user.to_owned(), password.to_owned())),
        );
    }

    /// Registers statement text along with the closure producing its result.
    pub fn on_query(
        &self,
        text: &str,
        query: impl Fn(&[Value]) -> Result<Option<ResultSet>, Diag> + 'static,
    ) {
        self.inner
            .borrow_mut()
            .catalog
            .queries
            .insert(text.to_owned(), Rc::new(query));
    }

    /// Registers statement text which always yields `result`.
    pub fn on_select(&self, text: &str, result: ResultSet) {
        self.on_query(text, move |_| Ok(Some(result.clone())));
    }

    /// Registers statement text which succeeds without producing a result set.
    pub fn on_update(&self, text: &str) {
        self.on_query(text, |_| Ok(None));
    }

    /// Report the length of truncated text as unknown (`NO_TOTAL`).
    pub fn report_no_total(&self) {
        self.inner.borrow_mut().catalog.no_total = true;
    }

    /// Let allocation of the given handle type fail from now on.
    pub fn fail_allocations(&self, handle_type: HandleType) {
        self.inner
            .borrow_mut()
            .catalog
            .failing_allocations
            .insert(handle_type);
    }

    /// While `pending` is set, disconnecting fails with `25000` and the session stays live.
    pub fn hold_transaction_open(&self, pending: bool) {
        self.inner.borrow_mut().catalog.transaction_pending = pending;
    }

    /// While `reject` is set, binding parameters fails with `HY104`. Earlier bindings are kept.
    pub fn reject_bindings(&self, reject: bool) {
        self.inner.borrow_mut().catalog.reject_bindings = reject;
    }

    /// Handles of this type which are currently allocated.
    pub fn live_handles(&self, handle_type: HandleType) -> usize {
        self.inner
            .borrow()
            .entries
            .values()
            .filter(|entry| entry.object.handle_type() == handle_type)
            .count()
    }

    /// Handles of this type which have been allocated so far, freed or not.
    pub fn allocations(&self, handle_type: HandleType) -> usize {
        self.inner
            .borrow()
            .allocations
            .get(&handle_type)
            .copied()
            .unwrap_or(0)
    }

    /// Connection handles with a live session.
    pub fn open_sessions(&self) -> usize {
        self.inner
            .borrow()
            .entries
            .values()
            .filter(|entry| {
                matches!(
                    entry.object,
                    Object::Connection {
                        connected: true,
                        ..
                    }
                )
            })
            .count()
    }

    /// Statement text and parameters of all successful executions so far.
    pub fn executions(&self) -> Vec<(String, Vec<Value>)> {
        self.inner.borrow().catalog.executions.clone()
    }

    /// ODBC version declared on the environment handle.
    pub fn declared_version(&self, environment: Handle) -> Option<AttrOdbcVersion> {
        match self.inner.borrow().entries.get(&(environment as usize)) {
            Some(Entry {
                object: Object::Environment { version },
                ..
            }) => *version,
            _ => None,
        }
    }
}

impl Driver for FakeDriver {
    unsafe fn alloc_handle(
        &self,
        handle_type: HandleType,
        input: Handle,
        output: *mut Handle,
    ) -> SqlReturn {
        let mut inner = self.inner.borrow_mut();
        let parent = input as usize;
        let object = match handle_type {
            HandleType::Env => Object::Environment { version: None },
            HandleType::Dbc => Object::Connection {
                environment: parent,
                connected: false,
            },
            HandleType::Stmt => Object::Statement {
                connection: parent,
                state: StatementState::default(),
            },
        };
        if handle_type != HandleType::Env {
            let parent_type = if handle_type == HandleType::Dbc {
                HandleType::Env
            } else {
                HandleType::Dbc
            };
            let failing = inner.catalog.failing_allocations.contains(&handle_type);
            let ret = inner.call(input, parent_type, |parent, _| {
                if failing {
                    return Err(Diag::error("HY001", "Memory allocation error"));
                }
                match parent {
                    Object::Connection {
                        connected: false, ..
                    } => Err(Diag::error("08003", "Connection not open")),
                    _ => Ok(SqlReturn::SUCCESS),
                }
            });
            if ret != SqlReturn::SUCCESS {
                return ret;
            }
        } else if inner.catalog.failing_allocations.contains(&HandleType::Env) {
            return SqlReturn::ERROR;
        }

        inner.next_id += 1;
        let id = inner.next_id;
        inner.entries.insert(id, Entry { object, diag: None });
        *inner.allocations.entry(handle_type).or_default() += 1;
        unsafe { *output = id as *mut c_void };
        SqlReturn::SUCCESS
    }

    unsafe fn free_handle(&self, handle_type: HandleType, handle: Handle) -> SqlReturn {
        let mut inner = self.inner.borrow_mut();
        let id = handle as usize;
        let has_children = inner.has_children(id);
        let ret = inner.call(handle, handle_type, |object, _| match object {
            Object::Connection {
                connected: true, ..
            } => Err(Diag::sequence_error()),
            _ if has_children => Err(Diag::sequence_error()),
            _ => Ok(SqlReturn::SUCCESS),
        });
        if ret == SqlReturn::SUCCESS {
            inner.entries.remove(&id);
        }
        ret
    }

    unsafe fn set_odbc_version(&self, environment: Handle, version: AttrOdbcVersion) -> SqlReturn {
        self.inner
            .borrow_mut()
            .call(environment, HandleType::Env, |object, _| {
                if let Object::Environment { version: declared } = object {
                    *declared = Some(version);
                }
                Ok(SqlReturn::SUCCESS)
            })
    }

    unsafe fn connect(
        &self,
        connection: Handle,
        server_name: *const SqlChar,
        server_name_length: i16,
        user: *const SqlChar,
        user_length: i16,
        authentication: *const SqlChar,
        authentication_length: i16,
    ) -> SqlReturn {
        let server_name = unsafe { read_text(server_name, server_name_length.into()) };
        let user = unsafe { read_text(user, user_length.into()) };
        let authentication = unsafe { read_text(authentication, authentication_length.into()) };
        self.inner
            .borrow_mut()
            .connection(connection, |connected, catalog| {
                open_session(
                    connected,
                    catalog,
                    server_name.as_deref().unwrap_or_default(),
                    user.as_deref(),
                    authentication.as_deref(),
                )
            })
    }

    unsafe fn driver_connect(
        &self,
        connection: Handle,
        connection_string: *const SqlChar,
        connection_string_length: i16,
    ) -> SqlReturn {
        let connection_string =
            unsafe { read_text(connection_string, connection_string_length.into()) }
                .unwrap_or_default();
        let mut attributes = HashMap::new();
        for pair in connection_string.split(';').filter(|pair| !pair.is_empty()) {
            if let Some((key, value)) = pair.split_once('=') {
                attributes.insert(key.trim().to_ascii_uppercase(), value.trim().to_owned());
            }
        }
        self.inner
            .borrow_mut()
            .connection(connection, |connected, catalog| {
                let Some(data_source) = attributes.get("DSN") else {
                    return Err(Diag::error(
                        "IM002",
                        "Data source name not found and no default driver specified",
                    ));
                };
                open_session(
                    connected,
                    catalog,
                    data_source,
                    attributes.get("UID").map(String::as_str),
                    attributes.get("PWD").map(String::as_str),
                )
            })
    }

    unsafe fn disconnect(&self, connection: Handle) -> SqlReturn {
        self.inner
            .borrow_mut()
            .connection(connection, |connected, catalog| {
                if !*connected {
                    return Err(Diag::error("08003", "Connection not open"));
                }
                if catalog.transaction_pending {
                    return Err(Diag::error("25000", "Invalid transaction state"));
                }
                *connected = false;
                Ok(SqlReturn::SUCCESS)
            })
    }

    unsafe fn prepare(&self, statement: Handle, text: *const SqlChar, length: i32) -> SqlReturn {
        let text = unsafe { read_text(text, length as Len) }.unwrap_or_default();
        self.inner
            .borrow_mut()
            .statement(statement, |state, catalog| prepare(state, catalog, text))
    }

    unsafe fn exec_direct(
        &self,
        statement: Handle,
        text: *const SqlChar,
        length: i32,
    ) -> SqlReturn {
        let text = unsafe { read_text(text, length as Len) }.unwrap_or_default();
        self.inner
            .borrow_mut()
            .statement(statement, |state, catalog| {
                prepare(state, catalog, text)?;
                unsafe { execute(state, catalog) }
            })
    }

    unsafe fn execute(&self, statement: Handle) -> SqlReturn {
        self.inner
            .borrow_mut()
            .statement(statement, |state, catalog| unsafe {
                execute(state, catalog)
            })
    }

    unsafe fn fetch(&self, statement: Handle) -> SqlReturn {
        self.inner.borrow_mut().statement(statement, |state, _| {
            let cursor = state
                .cursor
                .as_mut()
                .ok_or_else(Diag::invalid_cursor_state)?;
            let next = cursor.position.map_or(0, |position| position + 1);
            cursor.position = Some(next.min(cursor.rows.len()));
            cursor.offsets.clear();
            cursor.consumed.clear();
            if next < cursor.rows.len() {
                Ok(SqlReturn::SUCCESS)
            } else {
                Ok(SqlReturn::NO_DATA)
            }
        })
    }

    unsafe fn num_result_cols(&self, statement: Handle, column_count: *mut i16) -> SqlReturn {
        self.inner.borrow_mut().statement(statement, |state, _| {
            let count = state
                .cursor
                .as_ref()
                .map_or(0, |cursor| cursor.columns.len());
            unsafe { *column_count = count as i16 };
            Ok(SqlReturn::SUCCESS)
        })
    }

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
    ) -> SqlReturn {
        self.inner.borrow_mut().statement(statement, |state, _| {
            let cursor = state.cursor.as_ref().ok_or_else(|| {
                Diag::error("07005", "Prepared statement not a cursor-specification")
            })?;
            let index = column_index(column_number, cursor.columns.len())?;
            let values = || cursor.rows.iter().map(|row| &row[index]);
            let (sql_type, size) = match values().find(|value| **value != Value::Null) {
                Some(Value::Integer(_)) => (SqlDataType::INTEGER, 10),
                Some(Value::Real(_)) => (SqlDataType::DOUBLE, 15),
                Some(Value::Text(_)) => (SqlDataType::VARCHAR, 255),
                _ => (SqlDataType::UNKNOWN_TYPE, 0),
            };
            let has_nulls = values().any(|value| *value == Value::Null);
            let name = SqlText::new(&cursor.columns[index]);
            let truncated = unsafe {
                write_text(
                    name.as_slice(),
                    column_name,
                    buffer_length.max(0) as usize,
                )
            } < name.len();
            unsafe {
                *name_length = name.len() as i16;
                *data_type = sql_type;
                *column_size = size;
                *decimal_digits = 0;
                *nullable = if has_nulls {
                    Nullability::NULLABLE
                } else {
                    Nullability::NO_NULLS
                };
            }
            if truncated {
                Err(Diag::warning("01004", "String data, right truncated"))
            } else {
                Ok(SqlReturn::SUCCESS)
            }
        })
    }

    unsafe fn close_cursor(&self, statement: Handle) -> SqlReturn {
        self.inner.borrow_mut().statement(statement, |state, _| {
            state
                .cursor
                .take()
                .ok_or_else(Diag::invalid_cursor_state)?;
            Ok(SqlReturn::SUCCESS)
        })
    }

    unsafe fn free_stmt(&self, statement: Handle, option: FreeStmtOption) -> SqlReturn {
        self.inner.borrow_mut().statement(statement, |state, _| {
            match option {
                FreeStmtOption::Close => state.cursor = None,
                FreeStmtOption::Unbind => (),
                FreeStmtOption::ResetParams => state.bindings.clear(),
            }
            Ok(SqlReturn::SUCCESS)
        })
    }

    unsafe fn get_data(
        &self,
        statement: Handle,
        column_number: u16,
        target_type: CDataType,
        target_value: Pointer,
        buffer_length: Len,
        str_len_or_ind: *mut Len,
    ) -> SqlReturn {
        self.inner
            .borrow_mut()
            .statement(statement, |state, catalog| {
                let cursor = state
                    .cursor
                    .as_mut()
                    .ok_or_else(Diag::invalid_cursor_state)?;
                let row = cursor.current().ok_or_else(Diag::invalid_cursor_state)?;
                let index = column_index(column_number, row.len())?;
                if cursor.consumed.contains(&column_number) {
                    return Ok(SqlReturn::NO_DATA);
                }
                let value = row[index].clone();
                if value == Value::Null {
                    if str_len_or_ind.is_null() {
                        return Err(Diag::error(
                            "22002",
                            "Indicator variable required but not supplied",
                        ));
                    }
                    unsafe { *str_len_or_ind = NULL_DATA };
                    cursor.consumed.insert(column_number);
                    return Ok(SqlReturn::SUCCESS);
                }

                let written = match target_type {
                    CDataType::Char | CDataType::WChar => {
                        let text = value.to_text();
                        let chars = SqlText::new(&text);
                        let offset = cursor.offsets.get(&column_number).copied().unwrap_or(0);
                        let remaining = &chars.as_slice()[offset..];
                        let char_size = size_of::<SqlChar>();
                        if buffer_length < char_size as Len {
                            return Err(Diag::error("HY090", "Invalid string or buffer length"));
                        }
                        let written = unsafe {
                            write_text(
                                remaining,
                                target_value as *mut SqlChar,
                                buffer_length as usize / char_size,
                            )
                        };
                        let truncated = written < remaining.len();
                        let indicator = if truncated && catalog.no_total {
                            NO_TOTAL
                        } else {
                            (remaining.len() * char_size) as Len
                        };
                        if !str_len_or_ind.is_null() {
                            unsafe { *str_len_or_ind = indicator };
                        }
                        if truncated {
                            cursor.offsets.insert(column_number, offset + written);
                            return Err(Diag::warning("01004", "String data, right truncated"));
                        }
                        remaining.len() * char_size
                    }
                    CDataType::SLong => unsafe { write_integer::<i32>(&value, target_value)? },
                    CDataType::ULong => unsafe { write_integer::<u32>(&value, target_value)? },
                    CDataType::SShort => unsafe { write_integer::<i16>(&value, target_value)? },
                    CDataType::UShort => unsafe { write_integer::<u16>(&value, target_value)? },
                    CDataType::Double => {
                        let real = value.to_real()?;
                        unsafe { ptr::write_unaligned(target_value as *mut f64, real) };
                        size_of::<f64>()
                    }
                    CDataType::Float => {
                        let real = value.to_real()? as f32;
                        unsafe { ptr::write_unaligned(target_value as *mut f32, real) };
                        size_of::<f32>()
                    }
                };
                if !str_len_or_ind.is_null() {
                    unsafe { *str_len_or_ind = written as Len };
                }
                cursor.consumed.insert(column_number);
                Ok(SqlReturn::SUCCESS)
            })
    }

    unsafe fn bind_parameter(
        &self,
        statement: Handle,
        parameter_number: u16,
        input_output_type: ParamType,
        value_type: CDataType,
        _parameter_type: SqlDataType,
        _column_size: ULen,
        _decimal_digits: i16,
        parameter_value: Pointer,
        _buffer_length: Len,
        str_len_or_ind: *mut Len,
    ) -> SqlReturn {
        self.inner.borrow_mut().statement(statement, |state, catalog| {
            if parameter_number == 0 {
                return Err(Diag::invalid_descriptor_index());
            }
            if catalog.reject_bindings {
                return Err(Diag::error("HY104", "Invalid precision or scale value"));
            }
            assert_eq!(ParamType::Input, input_output_type);
            state.bindings.insert(
                parameter_number,
                Binding {
                    value_type,
                    value: parameter_value,
                    indicator: str_len_or_ind,
                },
            );
            Ok(SqlReturn::SUCCESS)
        })
    }

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
    ) -> SqlReturn {
        let inner = self.inner.borrow();
        let Some(entry) = inner.entries.get(&(handle as usize)) else {
            return SqlReturn::INVALID_HANDLE;
        };
        if entry.object.handle_type() != handle_type {
            return SqlReturn::INVALID_HANDLE;
        }
        if rec_number < 1 {
            return SqlReturn::ERROR;
        }
        let Some(diag) = entry.diag.as_ref().filter(|_| rec_number == 1) else {
            return SqlReturn::NO_DATA;
        };
        let code = SqlText::new(diag.state);
        let message = SqlText::new(&diag.message);
        let written = unsafe {
            write_text(code.as_slice(), state, code.len() + 1);
            *native_error = diag.native_error;
            *text_length = message.len() as i16;
            write_text(message.as_slice(), message_text, buffer_length.max(0) as usize)
        };
        if written < message.len() {
            SqlReturn::SUCCESS_WITH_INFO
        } else {
            SqlReturn::SUCCESS
        }
    }
}

fn open_session(
    connected: &mut bool,
    catalog: &Catalog,
    data_source: &str,
    user: Option<&str>,
    password: Option<&str>,
) -> Result<SqlReturn, Diag> {
    if *connected {
        return Err(Diag::error("08002", "Connection name in use"));
    }
    let Some(credentials) = catalog.data_sources.get(data_source) else {
        return Err(Diag::error(
            "IM002",
            format!("Data source name '{data_source}' not found and no default driver specified"),
        ));
    };
    if let Some((expected_user, expected_password)) = credentials {
        let user_matches = user.is_none_or(|user| user == expected_user.as_str());
        let password_matches =
            password.is_none_or(|password| password == expected_password.as_str());
        if !(user_matches && password_matches) {
            return Err(
                Diag::error("28000", "Invalid authorization specification").with_native_error(1045)
            );
        }
    }
    *connected = true;
    Ok(SqlReturn::SUCCESS)
}

fn prepare(
    state: &mut StatementState,
    catalog: &Catalog,
    text: String,
) -> Result<SqlReturn, Diag> {
    if state.cursor.is_some() {
        return Err(Diag::invalid_cursor_state());
    }
    if !catalog.queries.contains_key(&text) {
        return Err(Diag::error(
            "42000",
            format!("Syntax error or access violation: {text}"),
        ));
    }
    state.text = Some(text);
    Ok(SqlReturn::SUCCESS)
}

/// # Safety
///
/// All bound parameter buffers must still be valid.
unsafe fn execute(state: &mut StatementState, catalog: &mut Catalog) -> Result<SqlReturn, Diag> {
    let text = state.text.clone().ok_or_else(Diag::sequence_error)?;
    if state.cursor.is_some() {
        return Err(Diag::invalid_cursor_state());
    }
    let parameters: Vec<Value> = state
        .bindings
        .values()
        .map(|binding| unsafe { read_binding(binding) })
        .collect();
    let query = catalog.queries[&text].clone();
    let result = query(&parameters)?;
    catalog.executions.push((text, parameters));
    state.cursor = result.map(|result| Cursor {
        columns: result.columns,
        rows: result.rows,
        position: None,
        offsets: HashMap::new(),
        consumed: HashSet::new(),
    });
    Ok(SqlReturn::SUCCESS)
}

fn column_index(column_number: u16, num_columns: usize) -> Result<usize, Diag> {
    let index = usize::from(column_number)
        .checked_sub(1)
        .ok_or_else(Diag::invalid_descriptor_index)?;
    if index < num_columns {
        Ok(index)
    } else {
        Err(Diag::invalid_descriptor_index())
    }
}

/// Reads text passed to the driver. `None` for a null pointer.
unsafe fn read_text(text: *const SqlChar, length: Len) -> Option<String> {
    if text.is_null() {
        return None;
    }
    let length = if length == NTS {
        unsafe { nul_position(text) }
    } else {
        length.max(0) as usize
    };
    Some(slice_to_utf8(unsafe { slice::from_raw_parts(text, length) }))
}

unsafe fn nul_position(text: *const SqlChar) -> usize {
    let mut length = 0;
    while unsafe { *text.add(length) } != 0 {
        length += 1;
    }
    length
}

/// Copies as much of `text` as fits into a buffer of `capacity` characters, followed by a
/// terminating zero. Returns the number of characters copied.
unsafe fn write_text(text: &[SqlChar], target: *mut SqlChar, capacity: usize) -> usize {
    if target.is_null() || capacity == 0 {
        return 0;
    }
    let written = text.len().min(capacity - 1);
    unsafe {
        ptr::copy_nonoverlapping(text.as_ptr(), target, written);
        *target.add(written) = 0;
    }
    written
}

unsafe fn write_integer<T: TryFrom<i64>>(value: &Value, target: Pointer) -> Result<usize, Diag> {
    let integer = T::try_from(value.to_integer()?)
        .map_err(|_| Diag::error("22003", "Numeric value out of range"))?;
    unsafe { ptr::write_unaligned(target as *mut T, integer) };
    Ok(size_of::<T>())
}

unsafe fn read_binding(binding: &Binding) -> Value {
    let indicator = if binding.indicator.is_null() {
        0
    } else {
        unsafe { *binding.indicator }
    };
    if indicator == NULL_DATA {
        return Value::Null;
    }
    let value = binding.value;
    unsafe {
        match binding.value_type {
            CDataType::SLong => Value::Integer(ptr::read_unaligned(value as *const i32).into()),
            CDataType::ULong => Value::Integer(ptr::read_unaligned(value as *const u32).into()),
            CDataType::SShort => Value::Integer(ptr::read_unaligned(value as *const i16).into()),
            CDataType::UShort => Value::Integer(ptr::read_unaligned(value as *const u16).into()),
            CDataType::Double => Value::Real(ptr::read_unaligned(value as *const f64)),
            CDataType::Float => Value::Real(ptr::read_unaligned(value as *const f32).into()),
            CDataType::Char | CDataType::WChar => {
                let text = value as *const SqlChar;
                let length = if indicator == NTS {
                    nul_position(text)
                } else {
                    indicator.max(0) as usize / size_of::<SqlChar>()
                };
                Value::Text(slice_to_utf8(slice::from_raw_parts(text, length)))
            }
        }
    }
}
