//! Command builders for stream operations

use crate::commands::Command;
use crate::translate::params;
use redis_compat_core::{CallerReply, CallerValue, CompatError, CompatResult, DriverRequest};

/// One caller-visible stream record: an id plus flat field/value pairs
pub type StreamRecord = (String, Vec<String>);

/// XADD command builder.
///
/// Fields arrive as a flat `[field, value, ...]` list or a single field map.
pub struct XAddCommand {
    key: String,
    id: String,
    fields: Vec<CallerValue>,
}

impl XAddCommand {
    /// Create a new XADD command; `id` is usually `*` for auto-generation
    pub fn new(key: impl Into<String>, id: impl Into<String>, fields: Vec<CallerValue>) -> Self {
        Self {
            key: key.into(),
            id: id.into(),
            fields,
        }
    }
}

impl Command for XAddCommand {
    type Output = String;

    fn command_name(&self) -> &str {
        "XADD"
    }

    fn request(&self) -> CompatResult<DriverRequest> {
        Ok(DriverRequest::new("XADD")
            .arg(self.key.as_str())
            .arg(self.id.as_str())
            .args(params::field_map_args(&self.fields)?))
    }

    fn parse_reply(&self, reply: CallerReply) -> CompatResult<Self::Output> {
        reply.try_into()
    }
}

/// XRANGE command builder
pub struct XRangeCommand {
    key: String,
    start: String,
    end: String,
    count: Option<i64>,
}

impl XRangeCommand {
    /// Create a new XRANGE command; `-` and `+` select the stream extremes
    pub fn new(key: impl Into<String>, start: impl Into<String>, end: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            start: start.into(),
            end: end.into(),
            count: None,
        }
    }

    /// Cap the number of returned records
    #[must_use]
    pub const fn count(mut self, count: i64) -> Self {
        self.count = Some(count);
        self
    }
}

impl Command for XRangeCommand {
    type Output = Vec<StreamRecord>;

    fn command_name(&self) -> &str {
        "XRANGE"
    }

    fn request(&self) -> CompatResult<DriverRequest> {
        let mut request = DriverRequest::new("XRANGE")
            .arg(self.key.as_str())
            .arg(self.start.as_str())
            .arg(self.end.as_str());
        if let Some(count) = self.count {
            request = request.arg("COUNT").arg(count);
        }
        Ok(request)
    }

    fn parse_reply(&self, reply: CallerReply) -> CompatResult<Self::Output> {
        let CallerReply::Array(entries) = reply else {
            return Err(CompatError::Type(format!(
                "XRANGE expects an array reply, got {reply:?}"
            )));
        };
        entries
            .into_iter()
            .map(|entry| match entry {
                CallerReply::Array(mut parts) if parts.len() == 2 => {
                    let fields = parts.pop().unwrap_or(CallerReply::Nil).try_into()?;
                    let id = parts.pop().unwrap_or(CallerReply::Nil).try_into()?;
                    Ok((id, fields))
                }
                other => Err(CompatError::Type(format!(
                    "malformed stream record: {other:?}"
                ))),
            })
            .collect()
    }
}

/// XLEN command builder
pub struct XLenCommand {
    key: String,
}

impl XLenCommand {
    /// Create a new XLEN command
    pub fn new(key: impl Into<String>) -> Self {
        Self { key: key.into() }
    }
}

impl Command for XLenCommand {
    type Output = i64;

    fn command_name(&self) -> &str {
        "XLEN"
    }

    fn request(&self) -> CompatResult<DriverRequest> {
        Ok(DriverRequest::new("XLEN").arg(self.key.as_str()))
    }

    fn parse_reply(&self, reply: CallerReply) -> CompatResult<Self::Output> {
        reply.try_into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn xrange_parses_nested_records() {
        let cmd = XRangeCommand::new("events", "-", "+");
        let out = cmd
            .parse_reply(CallerReply::Array(vec![CallerReply::Array(vec![
                CallerReply::Str("1-0".into()),
                CallerReply::Array(vec![
                    CallerReply::Str("user".into()),
                    CallerReply::Str("alice".into()),
                ]),
            ])]))
            .unwrap();
        assert_eq!(
            out,
            vec![(
                "1-0".to_string(),
                vec!["user".to_string(), "alice".to_string()]
            )]
        );
    }
}
