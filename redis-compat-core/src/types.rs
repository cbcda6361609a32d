//! Driver-dialect types
//!
//! The underlying native driver speaks a stricter dialect than the caller:
//! requests are typed records with binary-safe or numeric leaf arguments only,
//! and results come back as structured values: record lists for sorted-set
//! and stream reads, typed doubles, explicit absence sentinels.

use bytes::Bytes;
use serde::{Deserialize, Serialize};

/// A single strict argument in the driver dialect.
///
/// Leaf values only: a binary-safe blob, an integer, or a double. Nested
/// containers never cross the driver boundary; parameter translation has
/// flattened them already.
#[derive(Debug, Clone, PartialEq)]
pub enum DriverArg {
    /// Binary-safe string payload
    Blob(Bytes),
    /// Integer argument
    Int(i64),
    /// Floating-point argument, including the infinity and NaN sentinels
    Float(f64),
}

impl DriverArg {
    /// Build a blob argument from anything byte-like
    pub fn blob(data: impl Into<Bytes>) -> Self {
        Self::Blob(data.into())
    }

    /// The textual rendering the wire ultimately carries.
    ///
    /// Integers render in decimal; floats keep the driver's own formatting
    /// concern and are rendered with round-trip precision here only for
    /// drivers that want a text form.
    #[must_use]
    pub fn to_text(&self) -> String {
        match self {
            Self::Blob(b) => String::from_utf8_lossy(b).into_owned(),
            Self::Int(i) => i.to_string(),
            Self::Float(f) => f.to_string(),
        }
    }
}

impl From<&str> for DriverArg {
    fn from(s: &str) -> Self {
        Self::Blob(Bytes::from(s.as_bytes().to_vec()))
    }
}

impl From<String> for DriverArg {
    fn from(s: String) -> Self {
        Self::Blob(Bytes::from(s.into_bytes()))
    }
}

impl From<Bytes> for DriverArg {
    fn from(b: Bytes) -> Self {
        Self::Blob(b)
    }
}

impl From<i64> for DriverArg {
    fn from(i: i64) -> Self {
        Self::Int(i)
    }
}

impl From<f64> for DriverArg {
    fn from(f: f64) -> Self {
        Self::Float(f)
    }
}

/// A typed command request in the driver dialect
#[derive(Debug, Clone, PartialEq)]
pub struct DriverRequest {
    /// Canonical uppercase command name
    pub command: String,
    /// Strict argument list
    pub args: Vec<DriverArg>,
}

impl DriverRequest {
    /// Start a request for the given command
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            args: Vec::new(),
        }
    }

    /// Append one argument
    #[must_use]
    pub fn arg(mut self, arg: impl Into<DriverArg>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Append a sequence of arguments
    #[must_use]
    pub fn args(mut self, args: impl IntoIterator<Item = DriverArg>) -> Self {
        self.args.extend(args);
        self
    }
}

/// A sorted-set record in a driver result
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredMember {
    /// Member payload
    pub member: Bytes,
    /// Score as the driver's native double
    pub score: f64,
}

impl ScoredMember {
    /// Build a record from a member payload and score
    pub fn new(member: impl Into<Bytes>, score: f64) -> Self {
        Self {
            member: member.into(),
            score,
        }
    }
}

/// A stream record in a driver result
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamEntry {
    /// Entry id, e.g. `1234567890123-0`
    pub id: String,
    /// Field/value pairs in stored order
    pub fields: Vec<(Bytes, Bytes)>,
}

/// A structured result in the driver dialect
#[derive(Debug, Clone, PartialEq)]
pub enum DriverReply {
    /// Plain acknowledgement of success
    Ok,
    /// Explicit absence sentinel
    Nil,
    /// Boolean result
    Bool(bool),
    /// Integer result
    Int(i64),
    /// Typed floating-point result
    Double(f64),
    /// Binary-safe string result
    Blob(Bytes),
    /// List of further results
    List(Vec<DriverReply>),
    /// Sorted-set style record list
    Scored(Vec<ScoredMember>),
    /// Stream style record list
    Entries(Vec<StreamEntry>),
}

impl DriverReply {
    /// Build a blob reply from anything byte-like
    pub fn blob(data: impl Into<Bytes>) -> Self {
        Self::Blob(data.into())
    }

    /// Check if this is the absence sentinel
    #[must_use]
    pub const fn is_nil(&self) -> bool {
        matches!(self, Self::Nil)
    }
}

/// A message delivered on a subscription
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PushMessage {
    /// Channel the message was published to
    pub channel: String,
    /// Pattern that matched the channel; `None` for exact-channel delivery
    pub pattern: Option<String>,
    /// Message payload
    pub payload: Bytes,
}

/// Identifier of one shard in a clustered deployment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ShardId(pub u16);

impl ShardId {
    /// Zero-based index of the shard
    #[must_use]
    pub const fn index(self) -> u16 {
        self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_builder_collects_args() {
        let req = DriverRequest::new("SET").arg("key").arg("value").arg(5i64);
        assert_eq!(req.command, "SET");
        assert_eq!(req.args.len(), 3);
        assert_eq!(req.args[2], DriverArg::Int(5));
    }

    #[test]
    fn arg_text_rendering() {
        assert_eq!(DriverArg::from("abc").to_text(), "abc");
        assert_eq!(DriverArg::Int(-7).to_text(), "-7");
    }
}
