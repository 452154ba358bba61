use super::{
    AsHandle, ExtSqlReturn, SqlResult, Statement,
    buffer::clamp_small_int,
    drop_handle,
    sql_char::SqlText,
};
use crate::sys::{Driver, Handle, HandleType};
use std::{
    ptr::{null, null_mut},
    rc::Rc,
};

/// The connection handle references storage of all information about the connection to the data
/// source, including status and error information.
pub struct Connection {
    driver: Rc<dyn Driver>,
    handle: Handle,
}

unsafe impl AsHandle for Connection {
    fn as_handle(&self) -> Handle {
        self.handle
    }

    fn handle_type(&self) -> HandleType {
        HandleType::Dbc
    }

    fn driver(&self) -> &dyn Driver {
        self.driver.as_ref()
    }
}

impl Drop for Connection {
    fn drop(&mut self) {
        unsafe {
            drop_handle(self.driver.as_ref(), self.handle, HandleType::Dbc);
        }
    }
}

impl Connection {
    /// # Safety
    ///
    /// Call this method only with a valid (successfully allocated) connection handle of `driver`.
    pub unsafe fn new(driver: Rc<dyn Driver>, handle: Handle) -> Self {
        Self { driver, handle }
    }

    /// Establishes connections to a driver and a data source.
    ///
    /// # Arguments
    ///
    /// * `data_source_name` - Data source name. The data might be located on the same computer as
    ///   the program, or on another computer somewhere on a network.
    /// * `user` - User identifier. `None` uses the identifier stored with the data source.
    /// * `pwd` - Authentication string (typically the password). `None` uses the authentication
    ///   stored with the data source.
    pub fn connect(
        &mut self,
        data_source_name: &str,
        user: Option<&str>,
        pwd: Option<&str>,
    ) -> SqlResult<()> {
        let data_source_name = SqlText::new(data_source_name);
        let user = user.map(SqlText::new);
        let pwd = pwd.map(SqlText::new);
        let (user_ptr, user_len) = user
            .as_ref()
            .map_or((null(), 0), |text| (text.ptr(), clamp_small_int(text.len())));
        let (pwd_ptr, pwd_len) = pwd
            .as_ref()
            .map_or((null(), 0), |text| (text.ptr(), clamp_small_int(text.len())));
        unsafe {
            self.driver
                .connect(
                    self.handle,
                    data_source_name.ptr(),
                    clamp_small_int(data_source_name.len()),
                    user_ptr,
                    user_len,
                    pwd_ptr,
                    pwd_len,
                )
                .into_sql_result("SQLConnect")
        }
    }

    /// An alternative to `connect`. It supports data sources that require more connection
    /// information than the three arguments in `connect`. The driver never prompts.
    pub fn connect_with_connection_string(&mut self, connection_string: &str) -> SqlResult<()> {
        let connection_string = SqlText::new(connection_string);
        unsafe {
            self.driver
                .driver_connect(
                    self.handle,
                    connection_string.ptr(),
                    clamp_small_int(connection_string.len()),
                )
                .into_sql_result("SQLDriverConnect")
        }
    }

    /// Disconnect from a data source.
    pub fn disconnect(&mut self) -> SqlResult<()> {
        unsafe { self.driver.disconnect(self.handle) }.into_sql_result("SQLDisconnect")
    }

    /// Allocate a new statement handle. The `Statement` must not outlive the `Connection`.
    pub fn allocate_statement(&self) -> SqlResult<Statement> {
        let mut out = null_mut();
        unsafe {
            self.driver
                .alloc_handle(HandleType::Stmt, self.handle, &mut out)
                .into_sql_result("SQLAllocHandle")
                .on_success(|| Statement::new(self.driver.clone(), out))
        }
    }

    /// Provides access to the raw connection handle.
    pub fn as_raw(&self) -> Handle {
        self.handle
    }
}
