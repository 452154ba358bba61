use super::{State, diagnostics::Record as DiagnosticRecord};
use thiserror::Error as ThisError;

#[derive(Debug, ThisError)]
/// Error type used to indicate a low level driver call returned with SQL_ERROR.
pub enum Error {
    /// No Diagnostics available. This is usually the case if allocation of the environment itself
    /// fails. In that case no object exist to obtain the diagnostic record from.
    #[error("Calling '{function}' failed. No diagnostics available.")]
    NoDiagnostics {
        /// Driver call which failed
        function: &'static str,
    },
    /// SQL Error had been returned by a low level driver function call. A Diagnostic record is
    /// obtained and associated with this error.
    #[error("Driver emitted an error calling '{function}':\n{record}")]
    Diagnostics {
        /// Diagnostic record returned by the driver
        record: DiagnosticRecord,
        /// Driver call which produced the diagnostic record
        function: &'static str,
    },
    /// The driver did not recognise the handle.
    #[error("The driver rejected the handle passed to '{function}'.")]
    InvalidHandle { function: &'static str },
    /// An error returned if we fail to set the ODBC version
    #[error(
        "The driver does not seem to support the requested ODBC version. Diagnostic record \
        returned by SQLSetEnvAttr:\n{0}"
    )]
    OdbcApiVersionUnsupported(DiagnosticRecord),
    /// The operation requires an open statement handle.
    #[error("The statement is not open.")]
    StatementClosed,
}

impl Error {
    /// SQLSTATE of the diagnostic record associated with this error, if any.
    pub fn state(&self) -> Option<State> {
        match self {
            Error::Diagnostics { record, .. } | Error::OdbcApiVersionUnsupported(record) => {
                Some(record.state)
            }
            _ => None,
        }
    }
}
