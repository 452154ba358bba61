use super::sql_char::{SqlChar, slice_to_cow_utf8};
use crate::sys::{Nullability, SqlDataType, ULen};

/// Indication of whether a column is nullable or not.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Nullable {
    Unknown,
    Nullable,
    NoNulls,
}

impl From<Nullability> for Nullable {
    fn from(nullability: Nullability) -> Self {
        match nullability {
            Nullability::NO_NULLS => Nullable::NoNulls,
            Nullability::NULLABLE => Nullable::Nullable,
            _ => Nullable::Unknown,
        }
    }
}

/// Describes the type and attributes of a column.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ColumnDescription {
    /// Column name. May be empty if unavailable.
    pub name: Vec<SqlChar>,
    /// Type of the column
    pub data_type: SqlDataType,
    /// Size of column element
    pub column_size: ULen,
    pub decimal_digits: i16,
    /// Indicates whether the column is nullable or not.
    pub nullable: Nullable,
}

impl Default for ColumnDescription {
    fn default() -> Self {
        Self {
            name: Vec::new(),
            data_type: SqlDataType::UNKNOWN_TYPE,
            column_size: 0,
            decimal_digits: 0,
            nullable: Nullable::Unknown,
        }
    }
}

impl ColumnDescription {
    /// Converts the internal representation of the column name into UTF-8 and returns the
    /// result as a `String`.
    pub fn name_to_string(&self) -> String {
        slice_to_cow_utf8(&self.name).into_owned()
    }

    /// `true` if the column is `Nullable` or it is not known whether the column is nullable.
    /// `false` if and only if the column is `NoNulls`.
    pub fn could_be_nullable(&self) -> bool {
        match self.nullable {
            Nullable::Nullable | Nullable::Unknown => true,
            Nullable::NoNulls => false,
        }
    }
}
