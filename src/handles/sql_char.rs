//! The idea is to handle most of the conditional compilation around different SQL character types
//! in this module, so the rest of the crate doesn't have to.

use super::buffer::buf_ptr;
use crate::sys::CDataType;
use std::borrow::Cow;

#[cfg(feature = "wide")]
use widestring::{U16Str, U16String};

/// Character type used to exchange text with the driver. `u8` holding UTF-8 by default, `u16`
/// holding UTF-16 if the `wide` feature is active.
#[cfg(not(feature = "wide"))]
pub type SqlChar = u8;
/// Character type used to exchange text with the driver. `u8` holding UTF-8 by default, `u16`
/// holding UTF-16 if the `wide` feature is active.
#[cfg(feature = "wide")]
pub type SqlChar = u16;

/// C data type used to fetch and bind text, matching [`SqlChar`].
#[cfg(not(feature = "wide"))]
pub const TEXT_C_TYPE: CDataType = CDataType::Char;
/// C data type used to fetch and bind text, matching [`SqlChar`].
#[cfg(feature = "wide")]
pub const TEXT_C_TYPE: CDataType = CDataType::WChar;

/// Handles conversion from UTF-8 string slices to the SQL char encoding. Depending on the
/// conditional compiliation due to feature flags, the UTF-8 strings are either passed on without
/// conversion, or they are converted to UTF-16.
pub struct SqlText<'a> {
    /// In case we use wide text we need to convert to UTF-16. We'll take ownership of the buffer
    /// here.
    #[cfg(feature = "wide")]
    text: U16String,
    /// We include the lifetime in the declaration of the type still, so the borrow checker
    /// complains, if we would mess up the compilation for narrow text.
    #[cfg(feature = "wide")]
    _ref: std::marker::PhantomData<&'a str>,
    /// In the case of narrow compiliation we just forward the string slice unchanged
    #[cfg(not(feature = "wide"))]
    text: &'a str,
}

impl<'a> SqlText<'a> {
    /// Create an SqlText buffer from an UTF-8 string slice
    #[cfg(feature = "wide")]
    pub fn new(text: &'a str) -> Self {
        Self {
            text: U16String::from_str(text),
            _ref: std::marker::PhantomData,
        }
    }
    /// Create an SqlText buffer from an UTF-8 string slice
    #[cfg(not(feature = "wide"))]
    pub fn new(text: &'a str) -> Self {
        Self { text }
    }

    /// Characters of the text, without terminating zero.
    #[cfg(feature = "wide")]
    pub fn as_slice(&self) -> &[SqlChar] {
        self.text.as_slice()
    }
    /// Characters of the text, without terminating zero.
    #[cfg(not(feature = "wide"))]
    pub fn as_slice(&self) -> &[SqlChar] {
        self.text.as_bytes()
    }

    /// Pointer to the first character, or NULL for empty text.
    pub fn ptr(&self) -> *const SqlChar {
        buf_ptr(self.as_slice())
    }

    /// Length in characters.
    pub fn len(&self) -> usize {
        self.as_slice().len()
    }

    pub fn is_empty(&self) -> bool {
        self.as_slice().is_empty()
    }

    /// Copies the text into an owned buffer with a terminating zero.
    pub fn to_vec_with_nul(&self) -> Vec<SqlChar> {
        let mut buffer = Vec::with_capacity(self.len() + 1);
        buffer.extend_from_slice(self.as_slice());
        buffer.push(0);
        buffer
    }
}

/// Converts text received from the driver to UTF-8. Invalid sequences are replaced.
#[cfg(feature = "wide")]
pub fn slice_to_cow_utf8(text: &[SqlChar]) -> Cow<'_, str> {
    Cow::Owned(U16Str::from_slice(text).to_string_lossy())
}
/// Converts text received from the driver to UTF-8. Invalid sequences are replaced.
#[cfg(not(feature = "wide"))]
pub fn slice_to_cow_utf8(text: &[SqlChar]) -> Cow<'_, str> {
    String::from_utf8_lossy(text)
}

/// Like [`slice_to_cow_utf8`], but cuts the text at the first terminating zero.
pub fn slice_to_utf8(text: &[SqlChar]) -> String {
    let end = text.iter().position(|&c| c == 0).unwrap_or(text.len());
    slice_to_cow_utf8(&text[..end]).into_owned()
}
