//! Command builders
//!
//! One builder per logical command: it applies the matching parameter
//! translator to produce the driver request, declares how the invocation
//! routes in a sharded deployment, and parses the translated caller reply
//! back into a typed result. Each builder is a thin call-through once the
//! translation core exists.

pub mod hash;
pub mod list;
pub mod set;
pub mod sorted_set;
pub mod stream;

use crate::cluster::Recombine;
use crate::translate::params;
use redis_compat_core::{CallerReply, CallerValue, CompatResult, DriverRequest};

pub use hash::{HDelCommand, HGetAllCommand, HGetCommand, HMGetCommand, HSetCommand};
pub use list::{
    BLPopCommand, LLenCommand, LPopCommand, LPushCommand, LRangeCommand, RPopCommand, RPushCommand,
};
pub use set::{SAddCommand, SCardCommand, SIsMemberCommand, SMembersCommand, SRemCommand};
pub use sorted_set::{
    BZPopMinCommand, ZAddCommand, ZCardCommand, ZRangeByScoreCommand, ZRangeCommand, ZRemCommand,
    ZScoreCommand,
};
pub use stream::{XAddCommand, XLenCommand, XRangeCommand};

/// How an invocation reaches the driver in a sharded deployment
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Routing {
    /// One driver call; the driver routes internally
    Direct,
    /// Multi-key command that may decompose into per-shard sub-invocations
    MultiKey {
        /// Arguments following each key in the request (0 for multi-get
        /// style, 1 for multi-set pairs)
        extras_per_key: usize,
        /// How shard-local results recombine
        recombine: Recombine,
    },
    /// Administrative command issued to every shard
    Broadcast,
}

/// A caller-dialect command: parameter translation in, typed result out
pub trait Command {
    /// The parsed result type
    type Output;

    /// Canonical uppercase command name
    fn command_name(&self) -> &str;

    /// Translate the caller arguments into the driver request.
    ///
    /// Translation failures surface here, synchronously, before any driver
    /// call is attempted.
    fn request(&self) -> CompatResult<DriverRequest>;

    /// Routing contract of this command
    fn routing(&self) -> Routing {
        Routing::Direct
    }

    /// Parse the translated caller reply into the typed output
    fn parse_reply(&self, reply: CallerReply) -> CompatResult<Self::Output>;
}

/// GET command builder
pub struct GetCommand {
    key: String,
}

impl GetCommand {
    /// Create a new GET command
    pub fn new(key: impl Into<String>) -> Self {
        Self { key: key.into() }
    }
}

impl Command for GetCommand {
    type Output = Option<String>;

    fn command_name(&self) -> &str {
        "GET"
    }

    fn request(&self) -> CompatResult<DriverRequest> {
        Ok(DriverRequest::new("GET").arg(self.key.as_str()))
    }

    fn parse_reply(&self, reply: CallerReply) -> CompatResult<Self::Output> {
        reply.try_into()
    }
}

/// SET command builder with its trailing option tokens
pub struct SetCommand {
    key: String,
    value: CallerValue,
    options: Vec<CallerValue>,
}

impl SetCommand {
    /// Create a new SET command
    pub fn new(key: impl Into<String>, value: impl Into<CallerValue>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
            options: Vec::new(),
        }
    }

    /// Append trailing option tokens (expiry flags, conditional-write flags)
    /// exactly as given; option order is part of the wire contract.
    #[must_use]
    pub fn with_options(mut self, options: Vec<CallerValue>) -> Self {
        self.options = options;
        self
    }

    /// Only set if the key does not already exist (NX)
    #[must_use]
    pub fn only_if_absent(mut self) -> Self {
        self.options.push(CallerValue::from("NX"));
        self
    }

    /// Only set if the key already exists (XX)
    #[must_use]
    pub fn only_if_present(mut self) -> Self {
        self.options.push(CallerValue::from("XX"));
        self
    }

    /// Expire after the given number of seconds (EX)
    #[must_use]
    pub fn expire_secs(mut self, seconds: i64) -> Self {
        self.options.push(CallerValue::from("EX"));
        self.options.push(CallerValue::from(seconds));
        self
    }
}

impl Command for SetCommand {
    type Output = bool;

    fn command_name(&self) -> &str {
        "SET"
    }

    fn request(&self) -> CompatResult<DriverRequest> {
        Ok(DriverRequest::new("SET")
            .arg(self.key.as_str())
            .arg(params::string_arg(&self.value))
            .args(params::option_args(&self.options)))
    }

    fn parse_reply(&self, reply: CallerReply) -> CompatResult<Self::Output> {
        // NX/XX conditions not met come back as the absence sentinel.
        Ok(matches!(reply, CallerReply::Str(ref s) if s == "OK"))
    }
}

/// DEL command builder
pub struct DelCommand {
    keys: Vec<String>,
}

impl DelCommand {
    /// Create a new DEL command
    pub fn new(keys: Vec<String>) -> Self {
        Self { keys }
    }
}

impl Command for DelCommand {
    type Output = i64;

    fn command_name(&self) -> &str {
        "DEL"
    }

    fn request(&self) -> CompatResult<DriverRequest> {
        Ok(DriverRequest::new("DEL")
            .args(self.keys.iter().map(|k| k.as_str().into())))
    }

    fn routing(&self) -> Routing {
        Routing::MultiKey {
            extras_per_key: 0,
            recombine: Recombine::SumCounts,
        }
    }

    fn parse_reply(&self, reply: CallerReply) -> CompatResult<Self::Output> {
        reply.try_into()
    }
}

/// EXISTS command builder
pub struct ExistsCommand {
    keys: Vec<String>,
}

impl ExistsCommand {
    /// Create a new EXISTS command
    pub fn new(keys: Vec<String>) -> Self {
        Self { keys }
    }
}

impl Command for ExistsCommand {
    type Output = i64;

    fn command_name(&self) -> &str {
        "EXISTS"
    }

    fn request(&self) -> CompatResult<DriverRequest> {
        Ok(DriverRequest::new("EXISTS")
            .args(self.keys.iter().map(|k| k.as_str().into())))
    }

    fn routing(&self) -> Routing {
        Routing::MultiKey {
            extras_per_key: 0,
            recombine: Recombine::SumCounts,
        }
    }

    fn parse_reply(&self, reply: CallerReply) -> CompatResult<Self::Output> {
        reply.try_into()
    }
}

/// MGET command builder
pub struct MGetCommand {
    keys: Vec<String>,
}

impl MGetCommand {
    /// Create a new MGET command
    pub fn new(keys: Vec<String>) -> Self {
        Self { keys }
    }
}

impl Command for MGetCommand {
    type Output = Vec<String>;

    fn command_name(&self) -> &str {
        "MGET"
    }

    fn request(&self) -> CompatResult<DriverRequest> {
        Ok(DriverRequest::new("MGET")
            .args(self.keys.iter().map(|k| k.as_str().into())))
    }

    fn routing(&self) -> Routing {
        Routing::MultiKey {
            extras_per_key: 0,
            recombine: Recombine::Positional,
        }
    }

    fn parse_reply(&self, reply: CallerReply) -> CompatResult<Self::Output> {
        // Absent keys are already empty-string placeholders; positions line
        // up with the request's key order.
        match reply {
            CallerReply::Array(items) => items
                .into_iter()
                .map(|item| match item {
                    CallerReply::Nil => Ok(String::new()),
                    other => other.try_into(),
                })
                .collect(),
            other => Err(redis_compat_core::CompatError::Type(format!(
                "MGET expects an array reply, got {other:?}"
            ))),
        }
    }
}

/// MSET command builder
pub struct MSetCommand {
    pairs: Vec<CallerValue>,
}

impl MSetCommand {
    /// Create a new MSET command from interleaved `[key, value, ...]` pairs
    /// or a single field map.
    pub fn new(pairs: Vec<CallerValue>) -> Self {
        Self { pairs }
    }
}

impl Command for MSetCommand {
    type Output = bool;

    fn command_name(&self) -> &str {
        "MSET"
    }

    fn request(&self) -> CompatResult<DriverRequest> {
        Ok(DriverRequest::new("MSET").args(params::field_map_args(&self.pairs)?))
    }

    fn routing(&self) -> Routing {
        Routing::MultiKey {
            extras_per_key: 1,
            recombine: Recombine::AllOk,
        }
    }

    fn parse_reply(&self, reply: CallerReply) -> CompatResult<Self::Output> {
        reply.try_into()
    }
}

/// EXPIRE command builder
pub struct ExpireCommand {
    key: String,
    seconds: i64,
}

impl ExpireCommand {
    /// Create a new EXPIRE command
    pub fn new(key: impl Into<String>, seconds: i64) -> Self {
        Self {
            key: key.into(),
            seconds,
        }
    }
}

impl Command for ExpireCommand {
    type Output = bool;

    fn command_name(&self) -> &str {
        "EXPIRE"
    }

    fn request(&self) -> CompatResult<DriverRequest> {
        Ok(DriverRequest::new("EXPIRE")
            .arg(self.key.as_str())
            .arg(self.seconds))
    }

    fn parse_reply(&self, reply: CallerReply) -> CompatResult<Self::Output> {
        reply.try_into()
    }
}

/// TTL command builder
pub struct TtlCommand {
    key: String,
}

impl TtlCommand {
    /// Create a new TTL command
    pub fn new(key: impl Into<String>) -> Self {
        Self { key: key.into() }
    }
}

impl Command for TtlCommand {
    type Output = i64;

    fn command_name(&self) -> &str {
        "TTL"
    }

    fn request(&self) -> CompatResult<DriverRequest> {
        Ok(DriverRequest::new("TTL").arg(self.key.as_str()))
    }

    fn parse_reply(&self, reply: CallerReply) -> CompatResult<Self::Output> {
        reply.try_into()
    }
}

/// INCR / DECR / INCRBY / DECRBY builder
pub struct CounterCommand {
    name: &'static str,
    key: String,
    delta: Option<i64>,
}

impl CounterCommand {
    /// Increment by one
    pub fn incr(key: impl Into<String>) -> Self {
        Self {
            name: "INCR",
            key: key.into(),
            delta: None,
        }
    }

    /// Decrement by one
    pub fn decr(key: impl Into<String>) -> Self {
        Self {
            name: "DECR",
            key: key.into(),
            delta: None,
        }
    }

    /// Increment by the given amount
    pub fn incr_by(key: impl Into<String>, delta: i64) -> Self {
        Self {
            name: "INCRBY",
            key: key.into(),
            delta: Some(delta),
        }
    }

    /// Decrement by the given amount
    pub fn decr_by(key: impl Into<String>, delta: i64) -> Self {
        Self {
            name: "DECRBY",
            key: key.into(),
            delta: Some(delta),
        }
    }
}

impl Command for CounterCommand {
    type Output = i64;

    fn command_name(&self) -> &str {
        self.name
    }

    fn request(&self) -> CompatResult<DriverRequest> {
        let mut request = DriverRequest::new(self.name).arg(self.key.as_str());
        if let Some(delta) = self.delta {
            request = request.arg(delta);
        }
        Ok(request)
    }

    fn parse_reply(&self, reply: CallerReply) -> CompatResult<Self::Output> {
        reply.try_into()
    }
}

/// FLUSHALL command builder: explicitly multi-shard safe, issued to every
/// shard, aggregated success only when every shard succeeds.
pub struct FlushAllCommand;

impl Command for FlushAllCommand {
    type Output = bool;

    fn command_name(&self) -> &str {
        "FLUSHALL"
    }

    fn request(&self) -> CompatResult<DriverRequest> {
        Ok(DriverRequest::new("FLUSHALL"))
    }

    fn routing(&self) -> Routing {
        Routing::Broadcast
    }

    fn parse_reply(&self, reply: CallerReply) -> CompatResult<Self::Output> {
        reply.try_into()
    }
}

/// A raw caller-dialect invocation: a command name plus untranslated
/// arguments, each coerced through the string family.
pub struct RawCommand {
    name: String,
    args: Vec<CallerValue>,
}

impl RawCommand {
    /// Create a raw invocation
    pub fn new(name: impl Into<String>, args: Vec<CallerValue>) -> Self {
        Self {
            name: name.into().to_uppercase(),
            args,
        }
    }
}

impl Command for RawCommand {
    type Output = CallerReply;

    fn command_name(&self) -> &str {
        &self.name
    }

    fn request(&self) -> CompatResult<DriverRequest> {
        Ok(DriverRequest::new(self.name.as_str()).args(params::flat_args(&self.args)))
    }

    fn parse_reply(&self, reply: CallerReply) -> CompatResult<Self::Output> {
        Ok(reply)
    }
}
