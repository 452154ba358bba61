use super::{
    as_handle::AsHandle,
    buffer::{clamp_small_int, mut_buf_ptr},
    sql_char::{SqlChar, slice_to_cow_utf8},
};
use crate::sys::{SQLSTATE_SIZE, SqlReturn};
use std::fmt;

/// Five character SQLSTATE code of a diagnostic record, e.g. `24000`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct State(pub [u8; SQLSTATE_SIZE]);

impl State {
    /// Invalid transaction state. Reported by disconnect while a transaction is pending.
    pub const INVALID_STATE_TRANSACTION: State = State(*b"25000");
    /// Invalid attribute value, e.g. an ODBC version the driver does not support.
    pub const INVALID_ATTRIBUTE_VALUE: State = State(*b"HY024");
    /// Function sequence error, e.g. executing a statement which has not been prepared.
    pub const FUNCTION_SEQUENCE_ERROR: State = State(*b"HY010");
    /// A cursor is open where none is expected, or none is open where one is required.
    pub const INVALID_CURSOR_STATE: State = State(*b"24000");
    /// Text returned for a column did not fit into the buffer.
    pub const STRING_DATA_RIGHT_TRUNCATION: State = State(*b"01004");
    /// NULL has been fetched without an indicator to report it.
    pub const INDICATOR_VARIABLE_REQUIRED_BUT_NOT_SUPPLIED: State = State(*b"22002");

    /// Narrows the characters of a zero terminated state to ASCII bytes.
    pub fn from_chars_with_nul(code: &[SqlChar; SQLSTATE_SIZE + 1]) -> Self {
        State(std::array::from_fn(|index| code[index] as u8))
    }

    /// The code as text. Empty if the driver reported something other than ASCII.
    pub fn as_str(&self) -> &str {
        std::str::from_utf8(&self.0).unwrap_or_default()
    }
}

/// What [`Diagnostics::diagnostic_record`] reports besides the message text.
#[derive(Debug, Clone, Copy)]
pub struct DiagnosticResult {
    pub state: State,
    /// Error code specific to the data source.
    pub native_error: i32,
    /// Length of the complete message in characters, excluding the terminating zero. May exceed
    /// the buffer which has been passed.
    pub text_length: i16,
}

/// Access to the diagnostic records a driver leaves behind on a handle.
pub trait Diagnostics {
    /// Copies record `rec_number` (starting at `1`) into `message_text`, truncating the message
    /// if the buffer is too small. Compare the buffer length with
    /// [`DiagnosticResult::text_length`] to detect truncation.
    ///
    /// `None` if there is no record with this number.
    fn diagnostic_record(
        &self,
        rec_number: i16,
        message_text: &mut [SqlChar],
    ) -> Option<DiagnosticResult>;

    /// Like [`Self::diagnostic_record`], but grows `message_text` until the complete message fits.
    /// Afterwards `message_text` holds exactly the message, without terminating zero.
    fn diagnostic_record_vec(
        &self,
        rec_number: i16,
        message_text: &mut Vec<SqlChar>,
    ) -> Option<DiagnosticResult> {
        // Start with whatever capacity the caller reserved.
        message_text.resize(message_text.capacity(), 0);
        let mut result = self.diagnostic_record(rec_number, message_text)?;
        let mut length = result.text_length.max(0) as usize;
        if length >= message_text.len() {
            message_text.resize(length + 1, 0);
            if let Some(retry) = self.diagnostic_record(rec_number, message_text) {
                result = retry;
            }
            length = length.min(message_text.len());
        }
        // Some drivers pad messages with zeroes.
        let length = message_text[..length]
            .iter()
            .rposition(|&c| c != 0)
            .map_or(0, |last| last + 1);
        message_text.truncate(length);
        Some(result)
    }
}

impl<T: AsHandle + ?Sized> Diagnostics for T {
    fn diagnostic_record(
        &self,
        rec_number: i16,
        message_text: &mut [SqlChar],
    ) -> Option<DiagnosticResult> {
        assert!(rec_number > 0, "Diagnostic records are numbered from 1.");

        let mut text_length = 0;
        let mut state = [0; SQLSTATE_SIZE + 1];
        let mut native_error = 0;
        let ret = unsafe {
            self.driver().get_diag_rec(
                self.handle_type(),
                self.as_handle(),
                rec_number,
                state.as_mut_ptr(),
                &mut native_error,
                mut_buf_ptr(message_text),
                clamp_small_int(message_text.len()),
                &mut text_length,
            )
        };

        match ret {
            SqlReturn::SUCCESS | SqlReturn::SUCCESS_WITH_INFO => Some(DiagnosticResult {
                state: State::from_chars_with_nul(&state),
                native_error,
                text_length,
            }),
            // An unknown handle carries no diagnostics either.
            SqlReturn::NO_DATA | SqlReturn::INVALID_HANDLE => None,
            unexpected => panic!("SQLGetDiagRec returned: {unexpected:?}"),
        }
    }
}

/// Diagnostic record. `Display` shows state, native error and message.
#[derive(Default, Clone)]
pub struct Record {
    pub state: State,
    pub native_error: i32,
    /// Message without terminating zero.
    pub message: Vec<SqlChar>,
}

impl Record {
    /// An empty record reserving `capacity` characters for the message, so most messages can be
    /// fetched in a single call.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            message: Vec::with_capacity(capacity),
            ..Default::default()
        }
    }

    /// Overwrites this record with record `record_number` of `handle`. `false` if there is no
    /// such record.
    pub fn fill_from(&mut self, handle: &(impl Diagnostics + ?Sized), record_number: i16) -> bool {
        match handle.diagnostic_record_vec(record_number, &mut self.message) {
            Some(result) => {
                self.state = result.state;
                self.native_error = result.native_error;
                true
            }
            None => false,
        }
    }

    /// Reads the first diagnostic record of `handle`, if any.
    pub fn first_of(handle: &(impl Diagnostics + ?Sized)) -> Option<Self> {
        let mut record = Record::with_capacity(256);
        record.fill_from(handle, 1).then_some(record)
    }

    /// Message text converted to UTF-8.
    pub fn message_to_string(&self) -> String {
        slice_to_cow_utf8(&self.message).into_owned()
    }
}

impl fmt::Display for Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let message = slice_to_cow_utf8(&self.message);

        write!(
            f,
            "State: {}, Native error: {}, Message: {}",
            self.state.as_str(),
            self.native_error,
            message,
        )
    }
}

impl fmt::Debug for Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}
