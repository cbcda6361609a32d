//! Pipeline support for batching commands
//!
//! A pipeline accumulates command invocations without executing them, then
//! executes the whole sequence as one batch. There is no atomicity and no
//! isolation: each queued command is attempted independently, one command's
//! failure never prevents the rest from running, and the result is one
//! `[error, result]`-style entry per queued command in queue order.
//!
//! A pipeline instance is single-owner; queuing from multiple tasks onto the
//! same instance is unsupported.
//!
//! # Examples
//!
//! ```no_run
//! use redis_compat::{Client, MemoryDriver};
//! use redis_compat_core::ClientConfig;
//! use std::sync::Arc;
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let client = Client::new(Arc::new(MemoryDriver::new()), ClientConfig::default());
//!
//! let mut pipeline = client.pipeline();
//! pipeline.set("key1", "value1").set("key2", "value2").get("key1");
//!
//! let entries = pipeline.exec().await?;
//! assert_eq!(entries.len(), 3);
//! # Ok(())
//! # }
//! ```

use crate::commands::{
    Command, CounterCommand, DelCommand, GetCommand, HGetCommand, HSetCommand, LPushCommand,
    RPushCommand, RawCommand, SAddCommand, SetCommand, ZAddCommand,
};
use crate::dispatch::Dispatcher;
use crate::translate::results;
use redis_compat_core::{CallerReply, CallerValue, CompatError, CompatResult, DriverRequest};
use std::sync::Arc;

/// One queued operation: either a translated request, or the translation
/// error that will occupy its result slot at execution time.
pub(crate) enum QueuedOp {
    Ready(DriverRequest),
    Failed(CompatError),
}

/// One entry of an executed batch: the command's translated result, or the
/// error that befell exactly that command.
pub type ExecEntry = Result<CallerReply, CompatError>;

/// A batch of commands executed together without atomicity guarantees
pub struct Pipeline {
    ops: Vec<QueuedOp>,
    dispatcher: Arc<Dispatcher>,
}

impl Pipeline {
    pub(crate) fn new(dispatcher: Arc<Dispatcher>) -> Self {
        Self {
            ops: Vec::new(),
            dispatcher,
        }
    }

    /// Queue an arbitrary command builder
    pub fn add_command<C: Command>(&mut self, command: &C) -> &mut Self {
        // A translation failure is recorded in the command's slot instead of
        // aborting the chain; exec reports it in order.
        self.ops.push(match command.request() {
            Ok(request) => QueuedOp::Ready(request),
            Err(e) => QueuedOp::Failed(e),
        });
        self
    }

    /// Queue a raw caller-dialect command by name
    pub fn command(&mut self, name: impl Into<String>, args: Vec<CallerValue>) -> &mut Self {
        self.add_command(&RawCommand::new(name, args))
    }

    /// Queue a SET command
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<CallerValue>) -> &mut Self {
        self.add_command(&SetCommand::new(key, value))
    }

    /// Queue a GET command
    pub fn get(&mut self, key: impl Into<String>) -> &mut Self {
        self.add_command(&GetCommand::new(key))
    }

    /// Queue a DEL command
    pub fn del(&mut self, keys: Vec<String>) -> &mut Self {
        self.add_command(&DelCommand::new(keys))
    }

    /// Queue an INCR command
    pub fn incr(&mut self, key: impl Into<String>) -> &mut Self {
        self.add_command(&CounterCommand::incr(key))
    }

    /// Queue a DECR command
    pub fn decr(&mut self, key: impl Into<String>) -> &mut Self {
        self.add_command(&CounterCommand::decr(key))
    }

    /// Queue an INCRBY command
    pub fn incr_by(&mut self, key: impl Into<String>, delta: i64) -> &mut Self {
        self.add_command(&CounterCommand::incr_by(key, delta))
    }

    /// Queue an HSET command
    pub fn hset(&mut self, key: impl Into<String>, fields: Vec<CallerValue>) -> &mut Self {
        self.add_command(&HSetCommand::new(key, fields))
    }

    /// Queue an HGET command
    pub fn hget(&mut self, key: impl Into<String>, field: impl Into<String>) -> &mut Self {
        self.add_command(&HGetCommand::new(key, field))
    }

    /// Queue an LPUSH command
    pub fn lpush(&mut self, key: impl Into<String>, values: Vec<CallerValue>) -> &mut Self {
        self.add_command(&LPushCommand::new(key, values))
    }

    /// Queue an RPUSH command
    pub fn rpush(&mut self, key: impl Into<String>, values: Vec<CallerValue>) -> &mut Self {
        self.add_command(&RPushCommand::new(key, values))
    }

    /// Queue an SADD command
    pub fn sadd(&mut self, key: impl Into<String>, members: Vec<CallerValue>) -> &mut Self {
        self.add_command(&SAddCommand::new(key, members))
    }

    /// Queue a ZADD command
    pub fn zadd(&mut self, key: impl Into<String>, pairs: Vec<CallerValue>) -> &mut Self {
        self.add_command(&ZAddCommand::new(key, pairs))
    }

    /// Number of queued commands
    #[must_use]
    pub fn len(&self) -> usize {
        self.ops.len()
    }

    /// Check if nothing is queued
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    /// Drop all queued commands without executing
    pub fn clear(&mut self) {
        self.ops.clear();
    }

    /// Execute every queued command as one batch.
    ///
    /// Resolves to exactly one entry per queued command, in queue order,
    /// regardless of individual failures. An empty pipeline resolves to an
    /// empty vector, not an error.
    pub async fn exec(&mut self) -> CompatResult<Vec<ExecEntry>> {
        let ops = std::mem::take(&mut self.ops);
        if ops.is_empty() {
            return Ok(Vec::new());
        }

        let requests: Vec<DriverRequest> = ops
            .iter()
            .filter_map(|op| match op {
                QueuedOp::Ready(request) => Some(request.clone()),
                QueuedOp::Failed(_) => None,
            })
            .collect();

        let mut replies = if requests.is_empty() {
            Vec::new()
        } else {
            self.dispatcher.execute_batch(requests).await?
        }
        .into_iter();

        // Reassemble in queue order: translation failures keep their slots,
        // everything else consumes the next driver reply.
        let entries = ops
            .into_iter()
            .map(|op| match op {
                QueuedOp::Failed(e) => Err(e),
                QueuedOp::Ready(_) => match replies.next() {
                    Some(Ok(reply)) => Ok(results::caller_reply(reply)),
                    Some(Err(e)) => Err(results::translate_error(e)),
                    None => Err(CompatError::Type(
                        "driver returned fewer batch entries than requests".to_string(),
                    )),
                },
            })
            .collect();

        Ok(entries)
    }
}
