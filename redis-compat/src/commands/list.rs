//! Command builders for list operations

use crate::commands::Command;
use crate::translate::params;
use redis_compat_core::{CallerReply, CallerValue, CompatResult, DriverRequest};

/// LPUSH command builder
pub struct LPushCommand {
    key: String,
    values: Vec<CallerValue>,
}

impl LPushCommand {
    /// Create a new LPUSH command
    pub fn new(key: impl Into<String>, values: Vec<CallerValue>) -> Self {
        Self {
            key: key.into(),
            values,
        }
    }
}

impl Command for LPushCommand {
    type Output = i64;

    fn command_name(&self) -> &str {
        "LPUSH"
    }

    fn request(&self) -> CompatResult<DriverRequest> {
        Ok(DriverRequest::new("LPUSH")
            .arg(self.key.as_str())
            .args(params::flat_args(&self.values)))
    }

    fn parse_reply(&self, reply: CallerReply) -> CompatResult<Self::Output> {
        reply.try_into()
    }
}

/// RPUSH command builder
pub struct RPushCommand {
    key: String,
    values: Vec<CallerValue>,
}

impl RPushCommand {
    /// Create a new RPUSH command
    pub fn new(key: impl Into<String>, values: Vec<CallerValue>) -> Self {
        Self {
            key: key.into(),
            values,
        }
    }
}

impl Command for RPushCommand {
    type Output = i64;

    fn command_name(&self) -> &str {
        "RPUSH"
    }

    fn request(&self) -> CompatResult<DriverRequest> {
        Ok(DriverRequest::new("RPUSH")
            .arg(self.key.as_str())
            .args(params::flat_args(&self.values)))
    }

    fn parse_reply(&self, reply: CallerReply) -> CompatResult<Self::Output> {
        reply.try_into()
    }
}

/// LPOP command builder
pub struct LPopCommand {
    key: String,
}

impl LPopCommand {
    /// Create a new LPOP command
    pub fn new(key: impl Into<String>) -> Self {
        Self { key: key.into() }
    }
}

impl Command for LPopCommand {
    type Output = Option<String>;

    fn command_name(&self) -> &str {
        "LPOP"
    }

    fn request(&self) -> CompatResult<DriverRequest> {
        Ok(DriverRequest::new("LPOP").arg(self.key.as_str()))
    }

    fn parse_reply(&self, reply: CallerReply) -> CompatResult<Self::Output> {
        reply.try_into()
    }
}

/// RPOP command builder
pub struct RPopCommand {
    key: String,
}

impl RPopCommand {
    /// Create a new RPOP command
    pub fn new(key: impl Into<String>) -> Self {
        Self { key: key.into() }
    }
}

impl Command for RPopCommand {
    type Output = Option<String>;

    fn command_name(&self) -> &str {
        "RPOP"
    }

    fn request(&self) -> CompatResult<DriverRequest> {
        Ok(DriverRequest::new("RPOP").arg(self.key.as_str()))
    }

    fn parse_reply(&self, reply: CallerReply) -> CompatResult<Self::Output> {
        reply.try_into()
    }
}

/// LRANGE command builder
pub struct LRangeCommand {
    key: String,
    start: i64,
    stop: i64,
}

impl LRangeCommand {
    /// Create a new LRANGE command
    pub fn new(key: impl Into<String>, start: i64, stop: i64) -> Self {
        Self {
            key: key.into(),
            start,
            stop,
        }
    }
}

impl Command for LRangeCommand {
    type Output = Vec<String>;

    fn command_name(&self) -> &str {
        "LRANGE"
    }

    fn request(&self) -> CompatResult<DriverRequest> {
        Ok(DriverRequest::new("LRANGE")
            .arg(self.key.as_str())
            .arg(self.start)
            .arg(self.stop))
    }

    fn parse_reply(&self, reply: CallerReply) -> CompatResult<Self::Output> {
        reply.try_into()
    }
}

/// LLEN command builder
pub struct LLenCommand {
    key: String,
}

impl LLenCommand {
    /// Create a new LLEN command
    pub fn new(key: impl Into<String>) -> Self {
        Self { key: key.into() }
    }
}

impl Command for LLenCommand {
    type Output = i64;

    fn command_name(&self) -> &str {
        "LLEN"
    }

    fn request(&self) -> CompatResult<DriverRequest> {
        Ok(DriverRequest::new("LLEN").arg(self.key.as_str()))
    }

    fn parse_reply(&self, reply: CallerReply) -> CompatResult<Self::Output> {
        reply.try_into()
    }
}

/// BLPOP command builder, a bounded-wait pop.
///
/// A timeout that elapses without data resolves to `None`, never an error.
pub struct BLPopCommand {
    keys: Vec<String>,
    timeout_secs: f64,
}

impl BLPopCommand {
    /// Create a new BLPOP command over the given keys
    pub fn new(keys: Vec<String>, timeout_secs: f64) -> Self {
        Self { keys, timeout_secs }
    }
}

impl Command for BLPopCommand {
    type Output = Option<(String, String)>;

    fn command_name(&self) -> &str {
        "BLPOP"
    }

    fn request(&self) -> CompatResult<DriverRequest> {
        Ok(DriverRequest::new("BLPOP")
            .args(self.keys.iter().map(|k| k.as_str().into()))
            .arg(self.timeout_secs))
    }

    fn parse_reply(&self, reply: CallerReply) -> CompatResult<Self::Output> {
        match reply {
            CallerReply::Array(items) if items.len() == 2 => {
                let mut it = items.into_iter();
                let key = it.next().unwrap_or(CallerReply::Nil).try_into()?;
                let value = it.next().unwrap_or(CallerReply::Nil).try_into()?;
                Ok(Some((key, value)))
            }
            _ => Ok(None),
        }
    }
}
