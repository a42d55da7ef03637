use derive_more::Display;
use serde::{Deserialize, Serialize};

/// The sets of data types a row field can hold.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Display, Hash, Serialize, Deserialize)]
pub enum DataType {
    /// Null type
    #[display(fmt = "null")]
    Null,

    /// A signed 64-bit integer.
    #[display(fmt = "int64")]
    Int64,

    /// A 64-bit floating point number.
    #[display(fmt = "float64")]
    Float64,

    /// A boolean type representing the values `true` and `false`.
    #[display(fmt = "boolean")]
    Boolean,

    /// Milliseconds since the unix epoch.
    #[display(fmt = "timestamp")]
    Timestamp,

    /// A variable-length string in Unicode with UTF-8 encoding.
    #[display(fmt = "string")]
    String,

    /// A value the engine carries but never interprets.
    #[display(fmt = "opaque")]
    Opaque,
}

impl DataType {
    /// Returns `true` if this type is a numeric type (integer or float).
    #[inline]
    pub fn is_numeric(&self) -> bool {
        matches!(self, DataType::Int64 | DataType::Float64)
    }

    /// Returns `true` if this type is the opaque type.
    #[inline]
    pub fn is_opaque(&self) -> bool {
        matches!(self, DataType::Opaque)
    }

    /// Returns `true` if a value of type `other` may be stored in a field of this type.
    #[inline]
    pub fn accepts(&self, other: DataType) -> bool {
        *self == other || other == DataType::Null
    }
}
