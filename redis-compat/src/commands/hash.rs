//! Command builders for hash operations

use crate::commands::Command;
use crate::translate::params;
use redis_compat_core::{CallerReply, CallerValue, CompatError, CompatResult, DriverRequest};

/// HGET command builder
pub struct HGetCommand {
    key: String,
    field: String,
}

impl HGetCommand {
    /// Create a new HGET command
    pub fn new(key: impl Into<String>, field: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            field: field.into(),
        }
    }
}

impl Command for HGetCommand {
    type Output = Option<String>;

    fn command_name(&self) -> &str {
        "HGET"
    }

    fn request(&self) -> CompatResult<DriverRequest> {
        Ok(DriverRequest::new("HGET")
            .arg(self.key.as_str())
            .arg(self.field.as_str()))
    }

    fn parse_reply(&self, reply: CallerReply) -> CompatResult<Self::Output> {
        reply.try_into()
    }
}

/// HSET command builder.
///
/// Fields arrive either as a flat `[field, value, field, value, ...]` list or
/// as a single field map; both normalize to the same request.
pub struct HSetCommand {
    key: String,
    fields: Vec<CallerValue>,
}

impl HSetCommand {
    /// Create a new HSET command
    pub fn new(key: impl Into<String>, fields: Vec<CallerValue>) -> Self {
        Self {
            key: key.into(),
            fields,
        }
    }
}

impl Command for HSetCommand {
    type Output = i64;

    fn command_name(&self) -> &str {
        "HSET"
    }

    fn request(&self) -> CompatResult<DriverRequest> {
        Ok(DriverRequest::new("HSET")
            .arg(self.key.as_str())
            .args(params::field_map_args(&self.fields)?))
    }

    fn parse_reply(&self, reply: CallerReply) -> CompatResult<Self::Output> {
        reply.try_into()
    }
}

/// HDEL command builder
pub struct HDelCommand {
    key: String,
    fields: Vec<String>,
}

impl HDelCommand {
    /// Create a new HDEL command
    pub fn new(key: impl Into<String>, fields: Vec<String>) -> Self {
        Self {
            key: key.into(),
            fields,
        }
    }
}

impl Command for HDelCommand {
    type Output = i64;

    fn command_name(&self) -> &str {
        "HDEL"
    }

    fn request(&self) -> CompatResult<DriverRequest> {
        Ok(DriverRequest::new("HDEL")
            .arg(self.key.as_str())
            .args(self.fields.iter().map(|f| f.as_str().into())))
    }

    fn parse_reply(&self, reply: CallerReply) -> CompatResult<Self::Output> {
        reply.try_into()
    }
}

/// HGETALL command builder
pub struct HGetAllCommand {
    key: String,
}

impl HGetAllCommand {
    /// Create a new HGETALL command
    pub fn new(key: impl Into<String>) -> Self {
        Self { key: key.into() }
    }
}

impl Command for HGetAllCommand {
    type Output = Vec<String>;

    fn command_name(&self) -> &str {
        "HGETALL"
    }

    fn request(&self) -> CompatResult<DriverRequest> {
        Ok(DriverRequest::new("HGETALL").arg(self.key.as_str()))
    }

    fn parse_reply(&self, reply: CallerReply) -> CompatResult<Self::Output> {
        // Flat alternating field/value pairs, the caller dialect's encoding
        // of the driver's field records.
        reply.try_into()
    }
}

/// HMGET command builder
pub struct HMGetCommand {
    key: String,
    fields: Vec<String>,
}

impl HMGetCommand {
    /// Create a new HMGET command
    pub fn new(key: impl Into<String>, fields: Vec<String>) -> Self {
        Self {
            key: key.into(),
            fields,
        }
    }
}

impl Command for HMGetCommand {
    type Output = Vec<String>;

    fn command_name(&self) -> &str {
        "HMGET"
    }

    fn request(&self) -> CompatResult<DriverRequest> {
        Ok(DriverRequest::new("HMGET")
            .arg(self.key.as_str())
            .args(self.fields.iter().map(|f| f.as_str().into())))
    }

    fn parse_reply(&self, reply: CallerReply) -> CompatResult<Self::Output> {
        match reply {
            CallerReply::Array(items) => items
                .into_iter()
                .map(|item| match item {
                    CallerReply::Nil => Ok(String::new()),
                    other => other.try_into(),
                })
                .collect(),
            other => Err(CompatError::Type(format!(
                "HMGET expects an array reply, got {other:?}"
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use redis_compat_core::DriverArg;

    #[test]
    fn hset_normalizes_map_and_flat_forms() {
        let flat = HSetCommand::new(
            "h",
            vec![
                CallerValue::from("f1"),
                CallerValue::from("v1"),
                CallerValue::from("f2"),
                CallerValue::from("v2"),
            ],
        );
        let map = HSetCommand::new(
            "h",
            vec![CallerValue::Map(vec![
                ("f1".to_string(), CallerValue::from("v1")),
                ("f2".to_string(), CallerValue::from("v2")),
            ])],
        );
        assert_eq!(flat.request().unwrap(), map.request().unwrap());
        assert_eq!(flat.request().unwrap().args[0], DriverArg::from("h"));
    }

    #[test]
    fn hmget_preserves_missing_field_positions() {
        let cmd = HMGetCommand::new("h", vec!["a".into(), "missing".into(), "b".into()]);
        let out = cmd
            .parse_reply(CallerReply::Array(vec![
                CallerReply::Str("1".into()),
                CallerReply::Str(String::new()),
                CallerReply::Str("2".into()),
            ]))
            .unwrap();
        assert_eq!(out, vec!["1".to_string(), String::new(), "2".to_string()]);
    }
}
