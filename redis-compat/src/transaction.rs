//! Optimistic-lock transaction support
//!
//! A transaction buffers commands exactly like a pipeline, but execution is
//! conditioned on a watch set: keys registered with [`Transaction::watch`]
//! before queuing. If any watched key was modified between registration and
//! execution, `exec` resolves to `None`: the whole batch was aborted and
//! nothing ran. That is a designed outcome, distinct from a batch that ran
//! and whose every command happened to fail (a full-length array of failure
//! entries).
//!
//! The engine never pre-validates queued commands; whatever the driver
//! reports at execution is surfaced as-is. The watch set is consumed by the
//! next `exec` or `discard` regardless of outcome.
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
//! let mut tx = client.multi();
//! tx.watch(vec!["balance".to_string()]).await?;
//! tx.incr_by("balance", -50).incr_by("spent", 50);
//!
//! match tx.exec().await? {
//!     Some(entries) => println!("committed {} commands", entries.len()),
//!     None => println!("aborted: balance changed underneath us"),
//! }
//! # Ok(())
//! # }
//! ```

use crate::commands::{
    Command, CounterCommand, DelCommand, GetCommand, HSetCommand, RawCommand, SetCommand,
};
use crate::dispatch::Dispatcher;
use crate::pipeline::{ExecEntry, QueuedOp};
use crate::translate::results;
use redis_compat_core::{CallerValue, CompatError, CompatResult, DriverRequest};
use std::sync::Arc;

/// A batch of commands executed with optimistic-lock isolation
pub struct Transaction {
    ops: Vec<QueuedOp>,
    watched: Vec<String>,
    dispatcher: Arc<Dispatcher>,
}

impl Transaction {
    pub(crate) fn new(dispatcher: Arc<Dispatcher>) -> Self {
        Self {
            ops: Vec::new(),
            watched: Vec::new(),
            dispatcher,
        }
    }

    /// Register keys for change detection.
    ///
    /// Must be called before queuing commands; if any watched key is modified
    /// by any party before [`exec`](Self::exec), the transaction aborts.
    pub async fn watch(&mut self, keys: Vec<String>) -> CompatResult<()> {
        if !self.ops.is_empty() {
            return Err(CompatError::Config(
                "watch must be registered before queuing commands".to_string(),
            ));
        }

        self.dispatcher.wait_ready().await?;
        self.dispatcher
            .driver()
            .watch(keys.clone())
            .await
            .map_err(results::translate_error)?;
        self.watched.extend(keys);
        Ok(())
    }

    /// Queue an arbitrary command builder
    pub fn add_command<C: Command>(&mut self, command: &C) -> &mut Self {
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

    /// Queue an INCRBY command
    pub fn incr_by(&mut self, key: impl Into<String>, delta: i64) -> &mut Self {
        self.add_command(&CounterCommand::incr_by(key, delta))
    }

    /// Queue an HSET command
    pub fn hset(&mut self, key: impl Into<String>, fields: Vec<CallerValue>) -> &mut Self {
        self.add_command(&HSetCommand::new(key, fields))
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

    /// Execute the buffered commands under the watch set.
    ///
    /// Resolves to `None` when a watched key changed since registration:
    /// the abort signal, regardless of how many commands were queued,
    /// including zero. Otherwise resolves to one entry per queued command in
    /// queue order, with per-command failures captured in their slots.
    /// Either way the watch set is consumed.
    pub async fn exec(&mut self) -> CompatResult<Option<Vec<ExecEntry>>> {
        let ops = std::mem::take(&mut self.ops);
        self.watched.clear();

        let requests: Vec<DriverRequest> = ops
            .iter()
            .filter_map(|op| match op {
                QueuedOp::Ready(request) => Some(request.clone()),
                QueuedOp::Failed(_) => None,
            })
            .collect();

        let Some(replies) = self.dispatcher.execute_transaction(requests).await? else {
            return Ok(None);
        };
        let mut replies = replies.into_iter();

        let entries = ops
            .into_iter()
            .map(|op| match op {
                QueuedOp::Failed(e) => Err(e),
                QueuedOp::Ready(_) => match replies.next() {
                    Some(Ok(reply)) => Ok(results::caller_reply(reply)),
                    Some(Err(e)) => Err(results::translate_error(e)),
                    None => Err(CompatError::Type(
                        "driver returned fewer transaction entries than requests".to_string(),
                    )),
                },
            })
            .collect();

        Ok(Some(entries))
    }

    /// Drop the queued commands and the watch set without executing.
    pub async fn discard(&mut self) -> CompatResult<()> {
        self.ops.clear();
        if !self.watched.is_empty() {
            self.watched.clear();
            self.dispatcher
                .driver()
                .unwatch()
                .await
                .map_err(results::translate_error)?;
        }
        Ok(())
    }
}
