//! Command builders for sorted-set operations
//!
//! The score side of this family is where the two dialects differ most: the
//! caller passes scores as numbers, numeric strings, or infinity tokens and
//! expects them back as full-precision decimal strings, while the driver
//! works in typed doubles throughout.

use crate::commands::Command;
use crate::translate::params;
use redis_compat_core::{CallerReply, CallerValue, CompatResult, DriverRequest};

/// ZADD command builder.
///
/// Accepts interleaved `[score, member, score, member, ...]` pairs and an
/// optional leading option-token sequence (NX/XX/GT/LT/CH), forwarded in the
/// order given.
pub struct ZAddCommand {
    key: String,
    options: Vec<CallerValue>,
    pairs: Vec<CallerValue>,
}

impl ZAddCommand {
    /// Create a new ZADD command
    pub fn new(key: impl Into<String>, pairs: Vec<CallerValue>) -> Self {
        Self {
            key: key.into(),
            options: Vec::new(),
            pairs,
        }
    }

    /// Prepend option tokens between the key and the score/member pairs
    #[must_use]
    pub fn with_options(mut self, options: Vec<CallerValue>) -> Self {
        self.options = options;
        self
    }
}

impl Command for ZAddCommand {
    type Output = i64;

    fn command_name(&self) -> &str {
        "ZADD"
    }

    fn request(&self) -> CompatResult<DriverRequest> {
        Ok(DriverRequest::new("ZADD")
            .arg(self.key.as_str())
            .args(params::option_args(&self.options))
            .args(params::score_member_args(&self.pairs)?))
    }

    fn parse_reply(&self, reply: CallerReply) -> CompatResult<Self::Output> {
        reply.try_into()
    }
}

/// ZREM command builder
pub struct ZRemCommand {
    key: String,
    members: Vec<CallerValue>,
}

impl ZRemCommand {
    /// Create a new ZREM command
    pub fn new(key: impl Into<String>, members: Vec<CallerValue>) -> Self {
        Self {
            key: key.into(),
            members,
        }
    }
}

impl Command for ZRemCommand {
    type Output = i64;

    fn command_name(&self) -> &str {
        "ZREM"
    }

    fn request(&self) -> CompatResult<DriverRequest> {
        Ok(DriverRequest::new("ZREM")
            .arg(self.key.as_str())
            .args(params::flat_args(&self.members)))
    }

    fn parse_reply(&self, reply: CallerReply) -> CompatResult<Self::Output> {
        reply.try_into()
    }
}

/// ZRANGE command builder
pub struct ZRangeCommand {
    key: String,
    start: i64,
    stop: i64,
    with_scores: bool,
}

impl ZRangeCommand {
    /// Create a new ZRANGE command over an index range
    pub fn new(key: impl Into<String>, start: i64, stop: i64) -> Self {
        Self {
            key: key.into(),
            start,
            stop,
            with_scores: false,
        }
    }

    /// Also return scores, flattened to alternating member/score strings
    #[must_use]
    pub const fn with_scores(mut self) -> Self {
        self.with_scores = true;
        self
    }
}

impl Command for ZRangeCommand {
    type Output = Vec<String>;

    fn command_name(&self) -> &str {
        "ZRANGE"
    }

    fn request(&self) -> CompatResult<DriverRequest> {
        let mut request = DriverRequest::new("ZRANGE")
            .arg(self.key.as_str())
            .arg(self.start)
            .arg(self.stop);
        if self.with_scores {
            request = request.arg("WITHSCORES");
        }
        Ok(request)
    }

    fn parse_reply(&self, reply: CallerReply) -> CompatResult<Self::Output> {
        reply.try_into()
    }
}

/// ZRANGEBYSCORE command builder with open/closed bounds and an optional
/// LIMIT clause
pub struct ZRangeByScoreCommand {
    key: String,
    min: CallerValue,
    max: CallerValue,
    with_scores: bool,
    limit: Option<(i64, i64)>,
}

impl ZRangeByScoreCommand {
    /// Create a new ZRANGEBYSCORE command.
    ///
    /// Bounds may be numbers, numeric strings, the infinity tokens, or
    /// `(`-prefixed exclusive bounds.
    pub fn new(
        key: impl Into<String>,
        min: impl Into<CallerValue>,
        max: impl Into<CallerValue>,
    ) -> Self {
        Self {
            key: key.into(),
            min: min.into(),
            max: max.into(),
            with_scores: false,
            limit: None,
        }
    }

    /// Also return scores
    #[must_use]
    pub const fn with_scores(mut self) -> Self {
        self.with_scores = true;
        self
    }

    /// Append a trailing `LIMIT offset count` clause
    #[must_use]
    pub const fn limit(mut self, offset: i64, count: i64) -> Self {
        self.limit = Some((offset, count));
        self
    }
}

impl Command for ZRangeByScoreCommand {
    type Output = Vec<String>;

    fn command_name(&self) -> &str {
        "ZRANGEBYSCORE"
    }

    fn request(&self) -> CompatResult<DriverRequest> {
        let mut args = vec![
            self.key.as_str().into(),
            params::range_bound(&self.min)?,
            params::range_bound(&self.max)?,
        ];
        if self.with_scores {
            args.push("WITHSCORES".into());
        }
        if let Some((offset, count)) = self.limit {
            params::limit_clause(&mut args, offset, count);
        }
        Ok(DriverRequest::new("ZRANGEBYSCORE").args(args))
    }

    fn parse_reply(&self, reply: CallerReply) -> CompatResult<Self::Output> {
        reply.try_into()
    }
}

/// ZSCORE command builder
pub struct ZScoreCommand {
    key: String,
    member: CallerValue,
}

impl ZScoreCommand {
    /// Create a new ZSCORE command
    pub fn new(key: impl Into<String>, member: impl Into<CallerValue>) -> Self {
        Self {
            key: key.into(),
            member: member.into(),
        }
    }
}

impl Command for ZScoreCommand {
    type Output = Option<String>;

    fn command_name(&self) -> &str {
        "ZSCORE"
    }

    fn request(&self) -> CompatResult<DriverRequest> {
        Ok(DriverRequest::new("ZSCORE")
            .arg(self.key.as_str())
            .arg(params::string_arg(&self.member)))
    }

    fn parse_reply(&self, reply: CallerReply) -> CompatResult<Self::Output> {
        // The score is already a full-precision decimal string.
        reply.try_into()
    }
}

/// ZCARD command builder
pub struct ZCardCommand {
    key: String,
}

impl ZCardCommand {
    /// Create a new ZCARD command
    pub fn new(key: impl Into<String>) -> Self {
        Self { key: key.into() }
    }
}

impl Command for ZCardCommand {
    type Output = i64;

    fn command_name(&self) -> &str {
        "ZCARD"
    }

    fn request(&self) -> CompatResult<DriverRequest> {
        Ok(DriverRequest::new("ZCARD").arg(self.key.as_str()))
    }

    fn parse_reply(&self, reply: CallerReply) -> CompatResult<Self::Output> {
        reply.try_into()
    }
}

/// BZPOPMIN command builder, a bounded-wait pop returning
/// `[key, member, score]`.
pub struct BZPopMinCommand {
    keys: Vec<String>,
    timeout_secs: f64,
}

impl BZPopMinCommand {
    /// Create a new BZPOPMIN command over the given keys
    pub fn new(keys: Vec<String>, timeout_secs: f64) -> Self {
        Self { keys, timeout_secs }
    }
}

impl Command for BZPopMinCommand {
    type Output = Option<(String, String, String)>;

    fn command_name(&self) -> &str {
        "BZPOPMIN"
    }

    fn request(&self) -> CompatResult<DriverRequest> {
        Ok(DriverRequest::new("BZPOPMIN")
            .args(self.keys.iter().map(|k| k.as_str().into()))
            .arg(self.timeout_secs))
    }

    fn parse_reply(&self, reply: CallerReply) -> CompatResult<Self::Output> {
        // Anything but the 3-tuple means "no data within the bound".
        match reply {
            CallerReply::Array(items) if items.len() == 3 => {
                let mut it = items.into_iter();
                let key = it.next().unwrap_or(CallerReply::Nil).try_into()?;
                let member = it.next().unwrap_or(CallerReply::Nil).try_into()?;
                let score = it.next().unwrap_or(CallerReply::Nil).try_into()?;
                Ok(Some((key, member, score)))
            }
            _ => Ok(None),
        }
    }
}
