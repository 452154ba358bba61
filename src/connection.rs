use crate::{
    handles::{self, Record, SqlResult},
    sys::{AttrOdbcVersion, Driver, Handle},
};
use log::{debug, warn};
use std::{mem, ptr::null_mut, rc::Rc};

/// Settings applied while a [`Connection`] allocates its handles.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConnectionOptions {
    /// ODBC version declared on the environment right after it has been allocated.
    pub odbc_version: AttrOdbcVersion,
}

impl Default for ConnectionOptions {
    fn default() -> Self {
        Self {
            odbc_version: AttrOdbcVersion::Odbc3,
        }
    }
}

/// A session with a data source.
///
/// Owns an environment handle and a connection handle. Both are allocated on construction, even
/// before any attempt to connect. `Statement`s borrow the `Connection` they are opened on, so it
/// can not be dropped or reconnected while any of them is alive.
///
/// Failures are reported as `false`. Call [`Connection::last_error`] right after the failing call
/// to learn why.
pub struct Connection {
    // Fields are dropped in declaration order. The connection handle must be freed before the
    // environment handle it has been allocated on.
    connection: Option<handles::Connection>,
    environment: Option<handles::Environment>,
    connected: bool,
    /// A connection handle has been leaked, so the environment can not be freed either.
    leaked: bool,
}

impl Connection {
    /// Allocates environment and connection handles, but does not connect.
    ///
    /// If allocation fails the object is still valid. The failure is logged and later calls to
    /// [`Connection::connect`] report `false`, unless they manage to allocate a connection handle.
    pub fn new(driver: Rc<dyn Driver>) -> Self {
        Self::with_options(driver, ConnectionOptions::default())
    }

    /// Like [`Connection::new`], but with explicit options.
    pub fn with_options(driver: Rc<dyn Driver>, options: ConnectionOptions) -> Self {
        let environment = match handles::Environment::new(driver) {
            Ok(environment) => {
                if let Err(error) = environment.declare_version(options.odbc_version) {
                    warn!("{error}");
                }
                Some(environment)
            }
            Err(error) => {
                warn!("Allocating environment failed: {error}");
                None
            }
        };
        let connection = environment.as_ref().and_then(allocate_connection);
        Self {
            connection,
            environment,
            connected: false,
            leaked: false,
        }
    }

    /// Allocates the handles and tries to connect to `data_source_name` right away.
    ///
    /// Whether the connection has been established is reported by [`Connection::connected`]. A
    /// failed attempt leaves a valid, disconnected object behind, which can be used to try again.
    pub fn with_data_source(
        driver: Rc<dyn Driver>,
        data_source_name: &str,
        user: &str,
        password: &str,
    ) -> Self {
        let mut connection = Self::new(driver);
        connection.connect(data_source_name, user, password);
        connection
    }

    /// Connects to a data source. An existing session is closed first and the connection handle
    /// is replaced with a freshly allocated one.
    ///
    /// Empty `user` or `password` select the credentials stored with the data source.
    ///
    /// # Return
    ///
    /// `true` if the session is live afterwards.
    pub fn connect(&mut self, data_source_name: &str, user: &str, password: &str) -> bool {
        let user = Some(user).filter(|user| !user.is_empty());
        let password = Some(password).filter(|password| !password.is_empty());
        self.establish(data_source_name, |connection| {
            connection.connect(data_source_name, user, password)
        })
    }

    /// Like [`Connection::connect`], but the session is described by a connection string, e.g.
    /// `DSN=books;UID=sque;PWD=secret`.
    pub fn connect_with_connection_string(&mut self, connection_string: &str) -> bool {
        self.establish("<connection string>", |connection| {
            connection.connect_with_connection_string(connection_string)
        })
    }

    fn establish(
        &mut self,
        target: &str,
        connect: impl FnOnce(&mut handles::Connection) -> SqlResult<()>,
    ) -> bool {
        self.disconnect();

        // Discard the previous connection handle before allocating a fresh one
        self.connection = None;
        self.connection = self.environment.as_ref().and_then(allocate_connection);
        let Some(connection) = self.connection.as_mut() else {
            return false;
        };

        self.connected = match connect(connection).into_result(&*connection) {
            Ok(()) => {
                debug!("Connected to '{target}'.");
                true
            }
            Err(error) => {
                debug!("Connecting to '{target}' failed: {error}");
                false
            }
        };
        self.connected
    }

    /// `true` if the session with the data source is live.
    pub fn connected(&self) -> bool {
        self.connected
    }

    /// Closes the session, if any. Errors reported by the driver are logged and otherwise ignored.
    ///
    /// If the driver refuses to disconnect (e.g. `25000` with a transaction pending), the session
    /// is still live and the driver would refuse to free its handle as well. The handle is leaked
    /// in that case and the next [`Connection::connect`] allocates a fresh one.
    pub fn disconnect(&mut self) {
        if self.connected {
            if let Some(connection) = self.connection.as_mut() {
                match connection.disconnect().into_result(&*connection) {
                    Ok(()) => debug!("Disconnected."),
                    Err(error) => {
                        warn!("Error disconnecting: {error}");
                        self.leak_connection_handle();
                    }
                }
            }
        }
        self.connected = false;
    }

    fn leak_connection_handle(&mut self) {
        if let Some(connection) = self.connection.take() {
            warn!("Leaking connection handle. Its session could not be closed.");
            mem::forget(connection);
            self.leaked = true;
        }
    }

    /// First diagnostic record of the connection handle. If no connection handle could be
    /// allocated, the environment handle is asked instead.
    pub fn last_record(&self) -> Option<Record> {
        match (&self.connection, &self.environment) {
            (Some(connection), _) => Record::first_of(connection),
            (None, Some(environment)) => Record::first_of(environment),
            (None, None) => None,
        }
    }

    /// Message of the diagnostic the driver left behind for the last call on this connection.
    /// Empty if the last call succeeded without warnings.
    pub fn last_error(&self) -> String {
        self.last_record()
            .map(|record| record.message_to_string())
            .unwrap_or_default()
    }

    /// Five character SQLSTATE of the last diagnostic on this connection, e.g. `08001`. Empty if
    /// the last call succeeded without warnings.
    pub fn last_error_status_code(&self) -> String {
        self.last_record()
            .map(|record| record.state.as_str().to_owned())
            .unwrap_or_default()
    }

    /// Raw connection handle, for use with the driver directly. Null if allocation failed.
    pub fn native_dbc_handle(&self) -> Handle {
        self.connection
            .as_ref()
            .map_or(null_mut(), handles::Connection::as_raw)
    }

    /// Raw environment handle, for use with the driver directly. Null if allocation failed.
    pub fn native_env_handle(&self) -> Handle {
        self.environment
            .as_ref()
            .map_or(null_mut(), handles::Environment::as_raw)
    }

    pub(crate) fn handle(&self) -> Option<&handles::Connection> {
        self.connection.as_ref()
    }
}

impl Drop for Connection {
    fn drop(&mut self) {
        self.disconnect();
        if self.leaked {
            // Freeing an environment fails as long as connections allocated on it exist.
            if let Some(environment) = self.environment.take() {
                warn!("Leaking environment handle of a leaked connection.");
                mem::forget(environment);
            }
        }
    }
}

fn allocate_connection(environment: &handles::Environment) -> Option<handles::Connection> {
    environment
        .allocate_connection()
        .into_result(environment)
        .map_err(|error| warn!("Allocating connection handle failed: {error}"))
        .ok()
}
