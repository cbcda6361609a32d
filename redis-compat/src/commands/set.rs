//! Command builders for set operations

use crate::commands::Command;
use crate::translate::params;
use redis_compat_core::{CallerReply, CallerValue, CompatResult, DriverRequest};

/// SADD command builder
pub struct SAddCommand {
    key: String,
    members: Vec<CallerValue>,
}

impl SAddCommand {
    /// Create a new SADD command
    pub fn new(key: impl Into<String>, members: Vec<CallerValue>) -> Self {
        Self {
            key: key.into(),
            members,
        }
    }
}

impl Command for SAddCommand {
    type Output = i64;

    fn command_name(&self) -> &str {
        "SADD"
    }

    fn request(&self) -> CompatResult<DriverRequest> {
        Ok(DriverRequest::new("SADD")
            .arg(self.key.as_str())
            .args(params::flat_args(&self.members)))
    }

    fn parse_reply(&self, reply: CallerReply) -> CompatResult<Self::Output> {
        reply.try_into()
    }
}

/// SREM command builder
pub struct SRemCommand {
    key: String,
    members: Vec<CallerValue>,
}

impl SRemCommand {
    /// Create a new SREM command
    pub fn new(key: impl Into<String>, members: Vec<CallerValue>) -> Self {
        Self {
            key: key.into(),
            members,
        }
    }
}

impl Command for SRemCommand {
    type Output = i64;

    fn command_name(&self) -> &str {
        "SREM"
    }

    fn request(&self) -> CompatResult<DriverRequest> {
        Ok(DriverRequest::new("SREM")
            .arg(self.key.as_str())
            .args(params::flat_args(&self.members)))
    }

    fn parse_reply(&self, reply: CallerReply) -> CompatResult<Self::Output> {
        reply.try_into()
    }
}

/// SMEMBERS command builder
pub struct SMembersCommand {
    key: String,
}

impl SMembersCommand {
    /// Create a new SMEMBERS command
    pub fn new(key: impl Into<String>) -> Self {
        Self { key: key.into() }
    }
}

impl Command for SMembersCommand {
    type Output = Vec<String>;

    fn command_name(&self) -> &str {
        "SMEMBERS"
    }

    fn request(&self) -> CompatResult<DriverRequest> {
        Ok(DriverRequest::new("SMEMBERS").arg(self.key.as_str()))
    }

    fn parse_reply(&self, reply: CallerReply) -> CompatResult<Self::Output> {
        reply.try_into()
    }
}

/// SISMEMBER command builder
pub struct SIsMemberCommand {
    key: String,
    member: CallerValue,
}

impl SIsMemberCommand {
    /// Create a new SISMEMBER command
    pub fn new(key: impl Into<String>, member: impl Into<CallerValue>) -> Self {
        Self {
            key: key.into(),
            member: member.into(),
        }
    }
}

impl Command for SIsMemberCommand {
    type Output = bool;

    fn command_name(&self) -> &str {
        "SISMEMBER"
    }

    fn request(&self) -> CompatResult<DriverRequest> {
        Ok(DriverRequest::new("SISMEMBER")
            .arg(self.key.as_str())
            .arg(params::string_arg(&self.member)))
    }

    fn parse_reply(&self, reply: CallerReply) -> CompatResult<Self::Output> {
        reply.try_into()
    }
}

/// SCARD command builder
pub struct SCardCommand {
    key: String,
}

impl SCardCommand {
    /// Create a new SCARD command
    pub fn new(key: impl Into<String>) -> Self {
        Self { key: key.into() }
    }
}

impl Command for SCardCommand {
    type Output = i64;

    fn command_name(&self) -> &str {
        "SCARD"
    }

    fn request(&self) -> CompatResult<DriverRequest> {
        Ok(DriverRequest::new("SCARD").arg(self.key.as_str()))
    }

    fn parse_reply(&self, reply: CallerReply) -> CompatResult<Self::Output> {
        reply.try_into()
    }
}
