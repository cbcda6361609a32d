//! Caller-dialect value types
//!
//! The caller dialect is loosely typed: a single logical parameter may arrive
//! as a string, a number, a boolean, a nested array, or a field map, and
//! absent values are first-class. `CallerValue` captures every shape a caller
//! may pass; `CallerReply` is the flat shape handed back: strings, integers,
//! `Nil` for absence, and arrays. Floating-point results never surface as
//! floats; they are rendered to full-precision decimal strings by the result
//! translator before reaching a reply.

use crate::error::CompatError;
use bytes::Bytes;

/// A loosely-typed caller-supplied argument value
#[derive(Debug, Clone, PartialEq)]
pub enum CallerValue {
    /// Absent value (`null`/`undefined` in the caller dialect)
    Nil,
    /// Boolean
    Bool(bool),
    /// Integer
    Int(i64),
    /// Floating-point number, including the infinity and NaN sentinels
    Float(f64),
    /// Text
    Str(String),
    /// Binary-safe payload
    Bytes(Bytes),
    /// Nested array of values
    List(Vec<CallerValue>),
    /// Field map in insertion order
    Map(Vec<(String, CallerValue)>),
}

impl CallerValue {
    /// Check if this is the absent-value sentinel
    #[must_use]
    pub const fn is_nil(&self) -> bool {
        matches!(self, Self::Nil)
    }

    /// Short name of the shape, for diagnostics
    #[must_use]
    pub const fn shape(&self) -> &'static str {
        match self {
            Self::Nil => "nil",
            Self::Bool(_) => "bool",
            Self::Int(_) => "int",
            Self::Float(_) => "float",
            Self::Str(_) => "string",
            Self::Bytes(_) => "bytes",
            Self::List(_) => "list",
            Self::Map(_) => "map",
        }
    }
}

impl From<&str> for CallerValue {
    fn from(s: &str) -> Self {
        Self::Str(s.to_string())
    }
}

impl From<String> for CallerValue {
    fn from(s: String) -> Self {
        Self::Str(s)
    }
}

impl From<i64> for CallerValue {
    fn from(i: i64) -> Self {
        Self::Int(i)
    }
}

impl From<i32> for CallerValue {
    fn from(i: i32) -> Self {
        Self::Int(i64::from(i))
    }
}

impl From<u32> for CallerValue {
    fn from(i: u32) -> Self {
        Self::Int(i64::from(i))
    }
}

impl From<f64> for CallerValue {
    fn from(f: f64) -> Self {
        Self::Float(f)
    }
}

impl From<bool> for CallerValue {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl From<Bytes> for CallerValue {
    fn from(b: Bytes) -> Self {
        Self::Bytes(b)
    }
}

impl From<Vec<u8>> for CallerValue {
    fn from(b: Vec<u8>) -> Self {
        Self::Bytes(Bytes::from(b))
    }
}

impl<T: Into<CallerValue>> From<Option<T>> for CallerValue {
    fn from(v: Option<T>) -> Self {
        v.map_or(Self::Nil, Into::into)
    }
}

impl From<Vec<CallerValue>> for CallerValue {
    fn from(vs: Vec<CallerValue>) -> Self {
        Self::List(vs)
    }
}

/// A caller-dialect command result
///
/// Flat by construction: strings, integers, `Nil` for absence, and arrays of
/// further replies. Where the driver produced record lists, the result
/// translator has already flattened them into alternating pair arrays.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallerReply {
    /// Absence sentinel
    Nil,
    /// Integer result
    Int(i64),
    /// String result, including stringified floats
    Str(String),
    /// Array result in driver order
    Array(Vec<CallerReply>),
}

impl CallerReply {
    /// Check if this is the absence sentinel
    #[must_use]
    pub const fn is_nil(&self) -> bool {
        matches!(self, Self::Nil)
    }

    /// Borrow the string content if this is a string reply
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Str(s) => Some(s),
            _ => None,
        }
    }

    /// Borrow the array content if this is an array reply
    #[must_use]
    pub fn as_array(&self) -> Option<&[CallerReply]> {
        match self {
            Self::Array(items) => Some(items),
            _ => None,
        }
    }
}

impl TryFrom<CallerReply> for String {
    type Error = CompatError;

    fn try_from(reply: CallerReply) -> Result<Self, Self::Error> {
        match reply {
            CallerReply::Str(s) => Ok(s),
            CallerReply::Int(i) => Ok(i.to_string()),
            other => Err(CompatError::Type(format!(
                "cannot convert {other:?} to string"
            ))),
        }
    }
}

impl TryFrom<CallerReply> for i64 {
    type Error = CompatError;

    fn try_from(reply: CallerReply) -> Result<Self, Self::Error> {
        match reply {
            CallerReply::Int(i) => Ok(i),
            CallerReply::Str(s) => s
                .parse::<i64>()
                .map_err(|e| CompatError::Type(format!("cannot parse integer: {e}"))),
            other => Err(CompatError::Type(format!(
                "cannot convert {other:?} to integer"
            ))),
        }
    }
}

impl TryFrom<CallerReply> for bool {
    type Error = CompatError;

    fn try_from(reply: CallerReply) -> Result<Self, Self::Error> {
        match reply {
            CallerReply::Int(0) | CallerReply::Nil => Ok(false),
            CallerReply::Int(_) => Ok(true),
            CallerReply::Str(ref s) if s == "OK" => Ok(true),
            other => Err(CompatError::Type(format!(
                "cannot convert {other:?} to bool"
            ))),
        }
    }
}

impl TryFrom<CallerReply> for Option<String> {
    type Error = CompatError;

    fn try_from(reply: CallerReply) -> Result<Self, Self::Error> {
        match reply {
            CallerReply::Nil => Ok(None),
            other => String::try_from(other).map(Some),
        }
    }
}

impl TryFrom<CallerReply> for Vec<String> {
    type Error = CompatError;

    fn try_from(reply: CallerReply) -> Result<Self, Self::Error> {
        match reply {
            CallerReply::Array(items) => items.into_iter().map(String::try_from).collect(),
            other => Err(CompatError::Type(format!(
                "cannot convert {other:?} to string array"
            ))),
        }
    }
}
