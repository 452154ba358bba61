use super::{AsHandle, Error, Record, log_diagnostics};
use crate::sys::SqlReturn;

/// Result of a driver function call. Variants hold the same meaning as the constants associated
/// with [`SqlReturn`]. This type may hold results, but it is still the responsibility of the user
/// to fetch and handle the diagnostics in case of an Error.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum SqlResult<T> {
    /// The function has been executed successfully.
    Success(T),
    /// The function has been executed successfully. There have been warnings.
    SuccessWithInfo(T),
    /// No more data is available
    NoData,
    /// The function was started asynchronously and is still executing.
    StillExecuting,
    /// The function returned an error state. Check diagnostics.
    Error {
        /// Name of the driver call which caused the error. This helps interpreting the associated
        /// diagnostics if the error is bubbled all the way up to the end users output.
        function: &'static str,
    },
    /// The driver did not recognise the handle passed to the function.
    InvalidHandle {
        /// Name of the driver call which rejected the handle.
        function: &'static str,
    },
}

impl SqlResult<()> {
    /// Append a return value a successful to Result
    pub fn on_success<F, T>(self, f: F) -> SqlResult<T>
    where
        F: FnOnce() -> T,
    {
        self.map(|()| f())
    }
}

impl<T> SqlResult<T> {
    /// `True` if variant is [`SqlResult::Error`] or [`SqlResult::InvalidHandle`].
    pub fn is_err(&self) -> bool {
        matches!(
            self,
            SqlResult::Error { .. } | SqlResult::InvalidHandle { .. }
        )
    }

    /// Applies `f` to any value wrapped in `Success` or `SuccessWithInfo`.
    pub fn map<U, F>(self, f: F) -> SqlResult<U>
    where
        F: FnOnce(T) -> U,
    {
        match self {
            SqlResult::Success(v) => SqlResult::Success(f(v)),
            SqlResult::SuccessWithInfo(v) => SqlResult::SuccessWithInfo(f(v)),
            SqlResult::Error { function } => SqlResult::Error { function },
            SqlResult::InvalidHandle { function } => SqlResult::InvalidHandle { function },
            SqlResult::StillExecuting => SqlResult::StillExecuting,
            SqlResult::NoData => SqlResult::NoData,
        }
    }

    /// Converts into a `Result`, fetching the diagnostic record from `handle` in case of an error.
    /// Warnings attached to `SuccessWithInfo` are logged.
    ///
    /// # Panics
    ///
    /// For `NoData` and `StillExecuting`. Use [`ExtSqlReturn::into_sql_result_bool`] for calls
    /// which may legitimately return no data. Asynchronous execution is never enabled.
    pub fn into_result(self, handle: &(impl AsHandle + ?Sized)) -> Result<T, Error> {
        match self {
            // The function has been executed successfully. Holds result.
            SqlResult::Success(value) => Ok(value),
            // The function has been executed successfully. There have been warnings. Holds result.
            SqlResult::SuccessWithInfo(value) => {
                log_diagnostics(handle);
                Ok(value)
            }
            SqlResult::Error { function } => {
                if let Some(record) = Record::first_of(handle) {
                    log_diagnostics(handle);
                    Err(Error::Diagnostics { record, function })
                } else {
                    Err(Error::NoDiagnostics { function })
                }
            }
            SqlResult::InvalidHandle { function } => Err(Error::InvalidHandle { function }),
            SqlResult::NoData => panic!("Unexpected SQL_NO_DATA returned by driver."),
            SqlResult::StillExecuting => {
                panic!("SQL_STILL_EXECUTING returned, yet asynchronous execution is not enabled.")
            }
        }
    }
}

pub trait ExtSqlReturn {
    fn into_sql_result(self, function_name: &'static str) -> SqlResult<()>;

    /// Use this instead of [`Self::into_sql_result`] if you expect [`SqlReturn::NO_DATA`] to be a
    /// valid value. [`SqlReturn::NO_DATA`] is mapped to `Success(false)`, all other success values
    /// are `Success(true)`.
    fn into_sql_result_bool(self, function_name: &'static str) -> SqlResult<bool>;
}

impl ExtSqlReturn for SqlReturn {
    fn into_sql_result(self, function: &'static str) -> SqlResult<()> {
        match self {
            SqlReturn::SUCCESS => SqlResult::Success(()),
            SqlReturn::SUCCESS_WITH_INFO => SqlResult::SuccessWithInfo(()),
            SqlReturn::ERROR => SqlResult::Error { function },
            SqlReturn::INVALID_HANDLE => SqlResult::InvalidHandle { function },
            SqlReturn::NO_DATA => SqlResult::NoData,
            SqlReturn::STILL_EXECUTING => SqlResult::StillExecuting,
            r => panic!("Unexpected return value '{r:?}' for driver function '{function}'"),
        }
    }

    fn into_sql_result_bool(self, function: &'static str) -> SqlResult<bool> {
        match self {
            SqlReturn::NO_DATA => SqlResult::Success(false),
            other => other.into_sql_result(function).on_success(|| true),
        }
    }
}
