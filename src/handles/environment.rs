use super::{
    AsHandle, Connection, Error, ExtSqlReturn, SqlResult, State, drop_handle,
    logging::log_diagnostics,
};
use crate::sys::{AttrOdbcVersion, Driver, Handle, HandleType, SqlReturn};
use log::debug;
use std::{ptr::null_mut, rc::Rc};

/// An `Environment` is the context connections are allocated in.
///
/// Associated with an `Environment` is any information that is global in nature, such as the
/// declared ODBC version and the environment-level diagnostics.
pub struct Environment {
    driver: Rc<dyn Driver>,
    /// Invariant: Should always point to a valid environment handle
    handle: Handle,
}

unsafe impl AsHandle for Environment {
    fn as_handle(&self) -> Handle {
        self.handle
    }

    fn handle_type(&self) -> HandleType {
        HandleType::Env
    }

    fn driver(&self) -> &dyn Driver {
        self.driver.as_ref()
    }
}

impl Drop for Environment {
    fn drop(&mut self) {
        unsafe {
            drop_handle(self.driver.as_ref(), self.handle, HandleType::Env);
        }
    }
}

impl Environment {
    /// Allocates an environment handle.
    pub fn new(driver: Rc<dyn Driver>) -> Result<Self, Error> {
        let mut handle = null_mut();
        let info = match unsafe { driver.alloc_handle(HandleType::Env, null_mut(), &mut handle) } {
            // We can't provide any diagnostics, as we don't have a handle to ask.
            SqlReturn::ERROR => {
                return Err(Error::NoDiagnostics {
                    function: "SQLAllocHandle",
                });
            }
            SqlReturn::SUCCESS => false,
            SqlReturn::SUCCESS_WITH_INFO => true,
            other => panic!("Unexpected Return value for allocating an environment: {other:?}"),
        };

        debug!("Environment created.");

        let env = Environment { driver, handle };
        if info {
            log_diagnostics(&env);
        }
        Ok(env)
    }

    /// Declares which version of the ODBC API we want to use. This is the first thing that should
    /// be done with any environment.
    pub fn declare_version(&self, version: AttrOdbcVersion) -> Result<(), Error> {
        unsafe { self.driver.set_odbc_version(self.handle, version) }
            .into_sql_result("SQLSetEnvAttr")
            .into_result(self)
            // Translate invalid attribute into a more meaningful error, provided the additional
            // context that we know we tried to set the version number.
            .map_err(|error| match error {
                Error::Diagnostics { record, .. }
                    if record.state == State::INVALID_ATTRIBUTE_VALUE =>
                {
                    Error::OdbcApiVersionUnsupported(record)
                }
                other => other,
            })
    }

    /// Allocate a new connection handle. Connections must be dropped before the environment.
    pub fn allocate_connection(&self) -> SqlResult<Connection> {
        let mut handle = null_mut();
        unsafe {
            self.driver
                .alloc_handle(HandleType::Dbc, self.handle, &mut handle)
                .into_sql_result("SQLAllocHandle")
                .on_success(|| Connection::new(self.driver.clone(), handle))
        }
    }

    /// Provides access to the raw environment handle.
    pub fn as_raw(&self) -> Handle {
        self.handle
    }
}
