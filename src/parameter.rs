//! Storage and binding of input parameters.
//!
//! The driver keeps the addresses of bound buffers and reads them each time the statement is
//! executed. A [`Parameter`] therefore lives in a `Box` owned by its statement, which keeps its
//! buffers at a stable address until the statement is closed. [`Param`] is the short lived
//! accessor handed out by [`crate::Statement::param`] to change the value.

use crate::{
    handles::{self, SqlChar, SqlText, TEXT_C_TYPE},
    sys::{CDataType, Len, NTS, Pointer, SqlDataType},
};
use log::debug;
use std::mem::{self, size_of};

/// Size of the buffer holding fixed size values.
const SCALAR_BUFFER_SIZE: usize = 64;

#[cfg(not(feature = "wide"))]
const TEXT_SQL_TYPE: SqlDataType = SqlDataType::VARCHAR;
#[cfg(feature = "wide")]
const TEXT_SQL_TYPE: SqlDataType = SqlDataType::EXT_W_VARCHAR;

#[derive(Clone, Copy)]
#[repr(C, align(8))]
struct ScalarBuffer([u8; SCALAR_BUFFER_SIZE]);

/// Owned value storage of one bound input parameter.
pub struct Parameter {
    number: u16,
    /// Text value including terminating zero.
    text: Vec<SqlChar>,
    scalar: ScalarBuffer,
    indicator: Len,
}

impl Parameter {
    /// A new zero valued parameter. Nothing is bound yet.
    pub(crate) fn new(number: u16) -> Self {
        Self {
            number,
            text: vec![0],
            scalar: ScalarBuffer([0; SCALAR_BUFFER_SIZE]),
            indicator: 0,
        }
    }

    /// Position of the parameter marker in the statement text, starting at `1`.
    pub fn number(&self) -> u16 {
        self.number
    }
}

/// Sets the value of a parameter and binds it to the statement.
///
/// Obtained from [`crate::Statement::param`]. Every setter copies the value into the storage
/// owned by the statement and binds it again, since address, type and length of the bound buffer
/// change with the value.
pub struct Param<'s> {
    /// `None` if the statement is closed. Values can neither be bound nor stored then.
    statement: Option<&'s mut handles::Statement>,
    parameter: &'s mut Parameter,
}

impl<'s> Param<'s> {
    pub(crate) fn new(
        statement: Option<&'s mut handles::Statement>,
        parameter: &'s mut Parameter,
    ) -> Self {
        Self {
            statement,
            parameter,
        }
    }

    /// Position of the parameter marker in the statement text, starting at `1`.
    pub fn number(&self) -> u16 {
        self.parameter.number
    }

    /// Binds `value` as zero terminated text.
    ///
    /// # Return
    ///
    /// `false` if the statement is closed or the driver rejected the binding. In that case the
    /// previous value stays bound.
    pub fn set_as_string(&mut self, value: &str) -> bool {
        let mut text = SqlText::new(value).to_vec_with_nul();
        let length = text.len() - 1;
        let value_ptr = text.as_mut_ptr() as Pointer;
        let buffer_length = (text.len() * size_of::<SqlChar>()) as Len;
        if !self.bind(
            TEXT_C_TYPE,
            TEXT_SQL_TYPE,
            length.max(1),
            value_ptr,
            buffer_length,
            NTS,
        ) {
            // The previous binding, if any, still points into the old text.
            return false;
        }
        // Moving the `Vec` leaves its heap buffer where the driver expects it.
        self.parameter.text = text;
        true
    }

    /// Binds `value` as 32 bit signed integer.
    pub fn set_as_long(&mut self, value: i32) -> bool {
        self.set_scalar(value.to_ne_bytes(), CDataType::SLong, SqlDataType::INTEGER)
    }

    /// Binds `value` as 32 bit unsigned integer.
    pub fn set_as_unsigned_long(&mut self, value: u32) -> bool {
        self.set_scalar(value.to_ne_bytes(), CDataType::ULong, SqlDataType::INTEGER)
    }

    fn set_scalar<const N: usize>(
        &mut self,
        bytes: [u8; N],
        c_type: CDataType,
        sql_type: SqlDataType,
    ) -> bool {
        let previous = self.parameter.scalar;
        self.parameter.scalar.0[..N].copy_from_slice(&bytes);
        let value_ptr = self.parameter.scalar.0.as_mut_ptr() as Pointer;
        if self.bind(c_type, sql_type, 0, value_ptr, N as Len, N as Len) {
            true
        } else {
            self.parameter.scalar = previous;
            false
        }
    }

    fn bind(
        &mut self,
        c_type: CDataType,
        sql_type: SqlDataType,
        column_size: usize,
        value: Pointer,
        buffer_length: Len,
        indicator: Len,
    ) -> bool {
        let number = self.parameter.number;
        let Some(statement) = self.statement.as_deref_mut() else {
            debug!("Parameter {number} can not be bound. The statement is not open.");
            return false;
        };
        let previous_indicator = mem::replace(&mut self.parameter.indicator, indicator);
        // The parameter is boxed and owned by the statement. Value and indicator stay put until
        // the parameter is bound again or the statement is closed.
        let result = unsafe {
            statement.bind_input_parameter(
                number,
                c_type,
                sql_type,
                column_size,
                value,
                buffer_length,
                &mut self.parameter.indicator,
            )
        };
        match result.into_result(&*statement) {
            Ok(()) => true,
            Err(error) => {
                // A rejected binding leaves the previous one in place, and with it the old indicator.
                self.parameter.indicator = previous_indicator;
                debug!("Binding parameter {number} failed: {error}");
                false
            }
        }
    }
}
