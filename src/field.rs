use crate::{
    fixed_sized::FixedSizedCType,
    handles::{self, Error, SqlChar, TEXT_C_TYPE, slice_to_cow_utf8},
    sys::{Len, NO_TOTAL, NULL_DATA, Pointer},
};
use log::debug;
use std::mem::size_of;

/// Number of characters (including the terminating zero) requested by the first call fetching a
/// text value.
const INITIAL_TEXT_BUFFER_LEN: usize = 256;

/// Decodes one cell of the current row.
///
/// Obtained from [`crate::Statement::field`]. A `Field` owns no data, every accessor asks the
/// driver to convert the value at the cursor position. It borrows the statement, so it can not be
/// kept across [`crate::Statement::fetch_next`].
///
/// The `as_*` accessors return zero (or an empty string) if the value can not be decoded, is
/// NULL, or the column does not exist. Use [`Field::get`] and [`Field::text`] to tell these cases
/// apart.
#[derive(Clone, Copy)]
pub struct Field<'s> {
    statement: Option<&'s handles::Statement>,
    column: u16,
}

impl<'s> Field<'s> {
    pub(crate) fn new(statement: Option<&'s handles::Statement>, column: u16) -> Self {
        Self { statement, column }
    }

    /// Column number, starting at `1`.
    pub fn column(&self) -> u16 {
        self.column
    }

    /// Fetches the value as `T`. `None` if the value is NULL.
    pub fn get<T: FixedSizedCType>(&self) -> Result<Option<T>, Error> {
        let statement = self.statement.ok_or(Error::StatementClosed)?;
        let mut value = T::default();
        let mut indicator: Len = 0;
        let has_data = unsafe {
            statement.get_data(
                self.column,
                T::C_DATA_TYPE,
                &mut value as *mut T as Pointer,
                size_of::<T>() as Len,
                &mut indicator,
            )
        }
        .into_result(statement)?;
        if !has_data || indicator == NULL_DATA {
            Ok(None)
        } else {
            Ok(Some(value))
        }
    }

    /// Fetches the value as text of arbitrary length. `None` if the value is NULL.
    ///
    /// The first request uses a buffer of 256 characters. If the value is longer, the driver
    /// reports how much data remains and the rest is fetched with a buffer of fitting size.
    pub fn text(&self) -> Result<Option<String>, Error> {
        let statement = self.statement.ok_or(Error::StatementClosed)?;
        let char_size = size_of::<SqlChar>();
        let mut value: Vec<SqlChar> = Vec::new();
        let mut buf: Vec<SqlChar> = vec![0; INITIAL_TEXT_BUFFER_LEN];
        loop {
            let mut indicator: Len = 0;
            let has_data = unsafe {
                statement.get_data(
                    self.column,
                    TEXT_C_TYPE,
                    buf.as_mut_ptr() as Pointer,
                    (buf.len() * char_size) as Len,
                    &mut indicator,
                )
            }
            .into_result(statement)?;
            // All parts have been fetched.
            if !has_data {
                break;
            }
            if indicator == NULL_DATA {
                return Ok(None);
            }
            // Payload characters fitting into the buffer, excluding the terminating zero.
            let capacity = buf.len() - 1;
            if indicator == NO_TOTAL {
                // Size of the remainder is unknown. Keep going with a larger buffer.
                value.extend_from_slice(&buf[..capacity]);
                buf.resize(buf.len() * 2, 0);
                continue;
            }
            let remaining = indicator.max(0) as usize / char_size;
            if remaining <= capacity {
                value.extend_from_slice(&buf[..remaining]);
                break;
            }
            value.extend_from_slice(&buf[..capacity]);
            // Fetch the rest in one go.
            buf.resize(remaining - capacity + 1, 0);
        }
        Ok(Some(slice_to_cow_utf8(&value).into_owned()))
    }

    /// Value as text. Empty on failure or NULL.
    pub fn as_string(&self) -> String {
        self.text()
            .map_err(|error| self.log_failure(&error))
            .ok()
            .flatten()
            .unwrap_or_default()
    }

    /// Value as 32 bit signed integer. Zero on failure or NULL.
    pub fn as_long(&self) -> i32 {
        self.scalar_or_zero()
    }

    /// Value as 32 bit unsigned integer. Zero on failure or NULL.
    pub fn as_unsigned_long(&self) -> u32 {
        self.scalar_or_zero()
    }

    /// Value as 16 bit signed integer. Zero on failure or NULL.
    pub fn as_short(&self) -> i16 {
        self.scalar_or_zero()
    }

    /// Value as 16 bit unsigned integer. Zero on failure or NULL.
    pub fn as_unsigned_short(&self) -> u16 {
        self.scalar_or_zero()
    }

    /// Value as double precision float. Zero on failure or NULL.
    pub fn as_double(&self) -> f64 {
        self.scalar_or_zero()
    }

    /// Value as single precision float. Zero on failure or NULL.
    pub fn as_float(&self) -> f32 {
        self.scalar_or_zero()
    }

    fn scalar_or_zero<T: FixedSizedCType>(&self) -> T {
        self.get()
            .map_err(|error| self.log_failure(&error))
            .ok()
            .flatten()
            .unwrap_or_default()
    }

    fn log_failure(&self, error: &Error) {
        debug!("Decoding column {} failed: {error}", self.column);
    }
}
