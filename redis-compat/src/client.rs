//! The caller-facing client handle
//!
//! `Client::new` returns synchronously while a background task settles the
//! driver's connection work; every command method awaits readiness before
//! dispatching. A handle's capability set (subscriptions, blocking
//! operations) is configuration, checked by the component that needs it;
//! there is no hierarchy of client kinds.
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
//! client.set("mykey", "myvalue").await?;
//! let value = client.get("mykey").await?;
//! assert_eq!(value.as_deref(), Some("myvalue"));
//! # Ok(())
//! # }
//! ```

use crate::cluster::ClusterRouter;
use crate::commands::{
    BLPopCommand, BZPopMinCommand, Command, CounterCommand, DelCommand, ExistsCommand,
    ExpireCommand, FlushAllCommand, GetCommand, HDelCommand, HGetAllCommand, HGetCommand,
    HMGetCommand, HSetCommand, LLenCommand, LPopCommand, LPushCommand, LRangeCommand,
    MGetCommand, MSetCommand, RPopCommand, RPushCommand, RawCommand, Routing, SAddCommand,
    SCardCommand, SIsMemberCommand, SMembersCommand, SRemCommand, SetCommand, TtlCommand,
    XAddCommand, XLenCommand, XRangeCommand, ZAddCommand, ZCardCommand, ZRangeByScoreCommand,
    ZRangeCommand, ZRemCommand, ZScoreCommand,
};
use crate::commands::stream::StreamRecord;
use crate::dispatch::Dispatcher;
use crate::driver::Driver;
use crate::pipeline::Pipeline;
use crate::pubsub::Subscriber;
use crate::script;
use crate::transaction::Transaction;
use crate::translate::results;
use redis_compat_core::{
    CallerReply, CallerValue, ClientConfig, CompatError, CompatResult, DriverRequest,
};
use std::sync::Arc;

/// A connection handle speaking the caller dialect over the wrapped driver
#[derive(Clone)]
pub struct Client {
    dispatcher: Arc<Dispatcher>,
    router: Arc<ClusterRouter>,
    config: ClientConfig,
}

impl Client {
    /// Wrap a driver, returning the handle synchronously.
    ///
    /// Connection work runs in the background; the first command awaits it.
    pub fn new(driver: Arc<dyn Driver>, config: ClientConfig) -> Self {
        let dispatcher = Arc::new(Dispatcher::new(Arc::clone(&driver), config.ready_timeout));
        let router = Arc::new(ClusterRouter::new(driver));
        Self {
            dispatcher,
            router,
            config,
        }
    }

    /// Execute one command builder through translation, routing, and reply
    /// parsing.
    pub async fn execute<C: Command>(&self, command: C) -> CompatResult<C::Output> {
        let request = command.request()?;
        let reply = match command.routing() {
            Routing::Direct => {
                let driver_reply = self.dispatcher.execute(request).await?;
                results::caller_reply(driver_reply)
            }
            Routing::MultiKey {
                extras_per_key,
                recombine,
            } => {
                self.dispatcher.wait_ready().await?;
                self.router
                    .run_multi_key(&request.command, &request.args, extras_per_key, recombine)
                    .await?
            }
            Routing::Broadcast => {
                self.dispatcher.wait_ready().await?;
                self.router.run_on_all_shards(request).await?
            }
        };
        command.parse_reply(reply)
    }

    fn require_blocking(&self, command: &str) -> CompatResult<()> {
        if self.config.capabilities.blocking_ops {
            Ok(())
        } else {
            Err(CompatError::Config(format!(
                "{command} requires a handle with blocking operations enabled"
            )))
        }
    }

    // String and key commands

    /// Get the value of a key
    pub async fn get(&self, key: impl Into<String>) -> CompatResult<Option<String>> {
        self.execute(GetCommand::new(key)).await
    }

    /// Set the value of a key; returns the truthy "set" result
    pub async fn set(
        &self,
        key: impl Into<String>,
        value: impl Into<CallerValue>,
    ) -> CompatResult<bool> {
        self.execute(SetCommand::new(key, value)).await
    }

    /// Set with trailing caller-dialect option tokens, forwarded verbatim
    pub async fn set_with_options(
        &self,
        key: impl Into<String>,
        value: impl Into<CallerValue>,
        options: Vec<CallerValue>,
    ) -> CompatResult<bool> {
        self.execute(SetCommand::new(key, value).with_options(options))
            .await
    }

    /// Set only if the key does not exist; `false` is the "not set" sentinel
    pub async fn set_nx(
        &self,
        key: impl Into<String>,
        value: impl Into<CallerValue>,
    ) -> CompatResult<bool> {
        self.execute(SetCommand::new(key, value).only_if_absent())
            .await
    }

    /// Set with an expiry in seconds
    pub async fn set_ex(
        &self,
        key: impl Into<String>,
        value: impl Into<CallerValue>,
        seconds: i64,
    ) -> CompatResult<bool> {
        self.execute(SetCommand::new(key, value).expire_secs(seconds))
            .await
    }

    /// Delete one or more keys; decomposes per shard in clustered deployments
    pub async fn del(&self, keys: Vec<String>) -> CompatResult<i64> {
        self.execute(DelCommand::new(keys)).await
    }

    /// Count how many of the given keys exist
    pub async fn exists(&self, keys: Vec<String>) -> CompatResult<i64> {
        self.execute(ExistsCommand::new(keys)).await
    }

    /// Set a key's time to live in seconds
    pub async fn expire(&self, key: impl Into<String>, seconds: i64) -> CompatResult<bool> {
        self.execute(ExpireCommand::new(key, seconds)).await
    }

    /// Get a key's remaining time to live in seconds
    pub async fn ttl(&self, key: impl Into<String>) -> CompatResult<i64> {
        self.execute(TtlCommand::new(key)).await
    }

    /// Increment the integer value of a key by one
    pub async fn incr(&self, key: impl Into<String>) -> CompatResult<i64> {
        self.execute(CounterCommand::incr(key)).await
    }

    /// Decrement the integer value of a key by one
    pub async fn decr(&self, key: impl Into<String>) -> CompatResult<i64> {
        self.execute(CounterCommand::decr(key)).await
    }

    /// Increment the integer value of a key by the given amount
    pub async fn incr_by(&self, key: impl Into<String>, delta: i64) -> CompatResult<i64> {
        self.execute(CounterCommand::incr_by(key, delta)).await
    }

    /// Decrement the integer value of a key by the given amount
    pub async fn decr_by(&self, key: impl Into<String>, delta: i64) -> CompatResult<i64> {
        self.execute(CounterCommand::decr_by(key, delta)).await
    }

    /// Get the values of several keys; absent keys come back as empty
    /// strings at their original positions
    pub async fn mget(&self, keys: Vec<String>) -> CompatResult<Vec<String>> {
        self.execute(MGetCommand::new(keys)).await
    }

    /// Set several keys from interleaved `[key, value, ...]` pairs or a
    /// single field map
    pub async fn mset(&self, pairs: Vec<CallerValue>) -> CompatResult<bool> {
        self.execute(MSetCommand::new(pairs)).await
    }

    /// Flush every shard; succeeds only when all shards succeed
    pub async fn flushall(&self) -> CompatResult<bool> {
        self.execute(FlushAllCommand).await
    }

    /// Issue a raw caller-dialect command by name
    pub async fn command(
        &self,
        name: impl Into<String>,
        args: Vec<CallerValue>,
    ) -> CompatResult<CallerReply> {
        self.execute(RawCommand::new(name, args)).await
    }

    // Hash commands

    /// Get the value of a hash field
    pub async fn hget(
        &self,
        key: impl Into<String>,
        field: impl Into<String>,
    ) -> CompatResult<Option<String>> {
        self.execute(HGetCommand::new(key, field)).await
    }

    /// Set hash fields from a flat pair list or a single field map
    pub async fn hset(
        &self,
        key: impl Into<String>,
        fields: Vec<CallerValue>,
    ) -> CompatResult<i64> {
        self.execute(HSetCommand::new(key, fields)).await
    }

    /// Delete one or more hash fields
    pub async fn hdel(&self, key: impl Into<String>, fields: Vec<String>) -> CompatResult<i64> {
        self.execute(HDelCommand::new(key, fields)).await
    }

    /// Get every field and value of a hash as flat alternating pairs
    pub async fn hgetall(&self, key: impl Into<String>) -> CompatResult<Vec<String>> {
        self.execute(HGetAllCommand::new(key)).await
    }

    /// Get the values of several hash fields, empty strings marking absent
    /// fields
    pub async fn hmget(
        &self,
        key: impl Into<String>,
        fields: Vec<String>,
    ) -> CompatResult<Vec<String>> {
        self.execute(HMGetCommand::new(key, fields)).await
    }

    // List commands

    /// Push values to the head of a list
    pub async fn lpush(
        &self,
        key: impl Into<String>,
        values: Vec<CallerValue>,
    ) -> CompatResult<i64> {
        self.execute(LPushCommand::new(key, values)).await
    }

    /// Push values to the tail of a list
    pub async fn rpush(
        &self,
        key: impl Into<String>,
        values: Vec<CallerValue>,
    ) -> CompatResult<i64> {
        self.execute(RPushCommand::new(key, values)).await
    }

    /// Pop from the head of a list
    pub async fn lpop(&self, key: impl Into<String>) -> CompatResult<Option<String>> {
        self.execute(LPopCommand::new(key)).await
    }

    /// Pop from the tail of a list
    pub async fn rpop(&self, key: impl Into<String>) -> CompatResult<Option<String>> {
        self.execute(RPopCommand::new(key)).await
    }

    /// Get a range of list elements
    pub async fn lrange(
        &self,
        key: impl Into<String>,
        start: i64,
        stop: i64,
    ) -> CompatResult<Vec<String>> {
        self.execute(LRangeCommand::new(key, start, stop)).await
    }

    /// Get the length of a list
    pub async fn llen(&self, key: impl Into<String>) -> CompatResult<i64> {
        self.execute(LLenCommand::new(key)).await
    }

    /// Bounded-wait pop from the head of the first non-empty list.
    ///
    /// Resolves to `None` when the bound elapses without data.
    pub async fn blpop(
        &self,
        keys: Vec<String>,
        timeout_secs: f64,
    ) -> CompatResult<Option<(String, String)>> {
        self.require_blocking("BLPOP")?;
        self.execute(BLPopCommand::new(keys, timeout_secs)).await
    }

    // Set commands

    /// Add members to a set
    pub async fn sadd(
        &self,
        key: impl Into<String>,
        members: Vec<CallerValue>,
    ) -> CompatResult<i64> {
        self.execute(SAddCommand::new(key, members)).await
    }

    /// Remove members from a set
    pub async fn srem(
        &self,
        key: impl Into<String>,
        members: Vec<CallerValue>,
    ) -> CompatResult<i64> {
        self.execute(SRemCommand::new(key, members)).await
    }

    /// Get every member of a set
    pub async fn smembers(&self, key: impl Into<String>) -> CompatResult<Vec<String>> {
        self.execute(SMembersCommand::new(key)).await
    }

    /// Check set membership
    pub async fn sismember(
        &self,
        key: impl Into<String>,
        member: impl Into<CallerValue>,
    ) -> CompatResult<bool> {
        self.execute(SIsMemberCommand::new(key, member)).await
    }

    /// Get the number of members in a set
    pub async fn scard(&self, key: impl Into<String>) -> CompatResult<i64> {
        self.execute(SCardCommand::new(key)).await
    }

    // Sorted-set commands

    /// Add interleaved `[score, member, ...]` pairs to a sorted set
    pub async fn zadd(
        &self,
        key: impl Into<String>,
        pairs: Vec<CallerValue>,
    ) -> CompatResult<i64> {
        self.execute(ZAddCommand::new(key, pairs)).await
    }

    /// Remove members from a sorted set
    pub async fn zrem(
        &self,
        key: impl Into<String>,
        members: Vec<CallerValue>,
    ) -> CompatResult<i64> {
        self.execute(ZRemCommand::new(key, members)).await
    }

    /// Get members of a sorted set by index range
    pub async fn zrange(
        &self,
        key: impl Into<String>,
        start: i64,
        stop: i64,
    ) -> CompatResult<Vec<String>> {
        self.execute(ZRangeCommand::new(key, start, stop)).await
    }

    /// Get members and scores by index range, flattened to alternating
    /// member/score strings
    pub async fn zrange_with_scores(
        &self,
        key: impl Into<String>,
        start: i64,
        stop: i64,
    ) -> CompatResult<Vec<String>> {
        self.execute(ZRangeCommand::new(key, start, stop).with_scores())
            .await
    }

    /// Get members by score range; bounds accept numbers, numeric strings,
    /// infinity tokens, and `(`-prefixed exclusive markers
    pub async fn zrangebyscore(
        &self,
        key: impl Into<String>,
        min: impl Into<CallerValue>,
        max: impl Into<CallerValue>,
    ) -> CompatResult<Vec<String>> {
        self.execute(ZRangeByScoreCommand::new(key, min, max)).await
    }

    /// Get a member's score as its full-precision decimal string
    pub async fn zscore(
        &self,
        key: impl Into<String>,
        member: impl Into<CallerValue>,
    ) -> CompatResult<Option<String>> {
        self.execute(ZScoreCommand::new(key, member)).await
    }

    /// Get the number of members in a sorted set
    pub async fn zcard(&self, key: impl Into<String>) -> CompatResult<i64> {
        self.execute(ZCardCommand::new(key)).await
    }

    /// Bounded-wait pop of the lowest-scored member.
    ///
    /// Resolves to `None` when the bound elapses without data, not an error
    /// and not an indefinite suspension.
    pub async fn bzpopmin(
        &self,
        keys: Vec<String>,
        timeout_secs: f64,
    ) -> CompatResult<Option<(String, String, String)>> {
        self.require_blocking("BZPOPMIN")?;
        self.execute(BZPopMinCommand::new(keys, timeout_secs)).await
    }

    // Stream commands

    /// Append an entry to a stream; `id` is usually `*`
    pub async fn xadd(
        &self,
        key: impl Into<String>,
        id: impl Into<String>,
        fields: Vec<CallerValue>,
    ) -> CompatResult<String> {
        self.execute(XAddCommand::new(key, id, fields)).await
    }

    /// Read a range of stream entries
    pub async fn xrange(
        &self,
        key: impl Into<String>,
        start: impl Into<String>,
        end: impl Into<String>,
    ) -> CompatResult<Vec<StreamRecord>> {
        self.execute(XRangeCommand::new(key, start, end)).await
    }

    /// Get the number of entries in a stream
    pub async fn xlen(&self, key: impl Into<String>) -> CompatResult<i64> {
        self.execute(XLenCommand::new(key)).await
    }

    // Batching

    /// Create a pipeline bound to this handle
    #[must_use]
    pub fn pipeline(&self) -> Pipeline {
        Pipeline::new(Arc::clone(&self.dispatcher))
    }

    /// Create an optimistic-lock transaction bound to this handle
    #[must_use]
    pub fn multi(&self) -> Transaction {
        Transaction::new(Arc::clone(&self.dispatcher))
    }

    // Publish/subscribe

    /// Publish a message; returns the number of receiving subscribers
    pub async fn publish(
        &self,
        channel: impl Into<String>,
        message: impl Into<CallerValue>,
    ) -> CompatResult<i64> {
        self.execute(RawCommand::new(
            "PUBLISH",
            vec![CallerValue::Str(channel.into()), message.into()],
        ))
        .await?
        .try_into()
    }

    /// Create a subscription bridge over this handle's driver.
    ///
    /// Requires the `subscriptions` capability.
    pub fn subscriber(&self) -> CompatResult<Subscriber> {
        if !self.config.capabilities.subscriptions {
            return Err(CompatError::Config(
                "this handle was configured without subscription support".to_string(),
            ));
        }
        Ok(Subscriber::new(
            self.dispatcher.driver(),
            self.config.subscription_poll_timeout,
        ))
    }

    // Scripts

    /// Execute a script body with the flattened keys-then-arguments
    /// convention
    pub async fn eval(
        &self,
        source: &str,
        keys: Vec<String>,
        args: Vec<CallerValue>,
    ) -> CompatResult<CallerReply> {
        let request = script::script_request("EVAL", source, keys, args);
        let reply = self.dispatcher.execute(request).await?;
        Ok(results::caller_reply(reply))
    }

    /// Execute a cached script by SHA1
    pub async fn evalsha(
        &self,
        sha: &str,
        keys: Vec<String>,
        args: Vec<CallerValue>,
    ) -> CompatResult<CallerReply> {
        let request = script::script_request("EVALSHA", sha, keys, args);
        let reply = self.dispatcher.execute(request).await?;
        Ok(results::caller_reply(reply))
    }

    /// Load a script into the driver's cache, returning its SHA1
    pub async fn script_load(&self, source: &str) -> CompatResult<String> {
        let request = DriverRequest::new("SCRIPT").arg("LOAD").arg(source);
        let reply = self.dispatcher.execute(request).await?;
        results::caller_reply(reply).try_into()
    }

    /// Check which of the given SHA1 hashes are cached
    pub async fn script_exists(&self, shas: Vec<String>) -> CompatResult<Vec<bool>> {
        let mut request = DriverRequest::new("SCRIPT").arg("EXISTS");
        for sha in shas {
            request = request.arg(sha);
        }
        let reply = self.dispatcher.execute(request).await?;
        match results::caller_reply(reply) {
            CallerReply::Array(items) => items
                .into_iter()
                .map(|item| item.try_into())
                .collect::<CompatResult<Vec<bool>>>(),
            other => Err(CompatError::Type(format!(
                "SCRIPT EXISTS expects an array reply, got {other:?}"
            ))),
        }
    }

    /// Flush the script cache on every shard
    pub async fn script_flush(&self) -> CompatResult<()> {
        self.dispatcher.wait_ready().await?;
        self.router
            .run_on_all_shards(DriverRequest::new("SCRIPT").arg("FLUSH"))
            .await?;
        Ok(())
    }
}
