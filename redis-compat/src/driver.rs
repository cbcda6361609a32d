//! The underlying native driver boundary
//!
//! Everything below this trait (transport, connection establishment, TLS,
//! authentication, wire protocol, topology discovery) belongs to the wrapped
//! native client and is out of scope for the compatibility layer. The layer
//! consumes exactly three things from the driver: a command-execution entry
//! point over typed requests, a pull-style subscription primitive, and a
//! cluster-topology query.

use async_trait::async_trait;
use redis_compat_core::{DriverError, DriverReply, DriverRequest, PushMessage, ShardId};
use std::time::Duration;

/// Result of a single driver call
pub type DriverResult<T> = Result<T, DriverError>;

/// The command surface consumed from the underlying native client.
///
/// Implementations are expected to be cheap to share (`Arc<dyn Driver>`); the
/// compatibility layer issues exactly one call per logical invocation except
/// where cluster routing fans a multi-key command out to several shard-local
/// calls.
#[async_trait]
pub trait Driver: Send + Sync {
    /// Execute one typed request and return its structured result.
    async fn run(&self, request: DriverRequest) -> DriverResult<DriverReply>;

    /// Execute a batch of requests without atomicity or isolation.
    ///
    /// One entry per request, in request order; a rejected command occupies
    /// its slot as an `Err` and never prevents later requests from running.
    /// The outer `Err` is reserved for failures of the batch round-trip
    /// itself (e.g. a lost connection).
    async fn run_batch(
        &self,
        requests: Vec<DriverRequest>,
    ) -> DriverResult<Vec<DriverResult<DriverReply>>>;

    /// Execute a batch under optimistic-lock isolation.
    ///
    /// Returns `None` when a key registered via [`watch`](Self::watch) was
    /// modified since registration; nothing ran. Returns `Some(entries)`
    /// otherwise, with the same per-request shape as
    /// [`run_batch`](Self::run_batch). Either way the watch set is consumed.
    async fn run_transaction(
        &self,
        requests: Vec<DriverRequest>,
    ) -> DriverResult<Option<Vec<DriverResult<DriverReply>>>>;

    /// Register keys for change detection ahead of
    /// [`run_transaction`](Self::run_transaction).
    async fn watch(&self, keys: Vec<String>) -> DriverResult<()>;

    /// Drop all registered watch keys without executing anything.
    async fn unwatch(&self) -> DriverResult<()>;

    /// Replace the active subscription set with the given unions.
    ///
    /// Called only when the union actually changed; redundant round-trips are
    /// the bridge's job to avoid, not the driver's.
    async fn set_subscriptions(&self, channels: &[String], patterns: &[String])
        -> DriverResult<()>;

    /// Wait up to `timeout` for the next subscription message.
    ///
    /// Resolves `Ok(None)` when no message arrived within the bound, an
    /// expected outcome rather than an error.
    async fn poll_message(&self, timeout: Duration) -> DriverResult<Option<PushMessage>>;

    /// Shard owning the given key, or `None` for non-clustered deployments.
    fn shard_for_key(&self, key: &[u8]) -> Option<ShardId>;

    /// All shards of the deployment; empty for non-clustered deployments.
    fn shard_ids(&self) -> Vec<ShardId>;

    /// Execute a request against one specific shard.
    async fn run_on_shard(
        &self,
        shard: ShardId,
        request: DriverRequest,
    ) -> DriverResult<DriverReply>;

    /// Wait until the driver's background connection work has settled.
    ///
    /// Drivers that connect eagerly can keep the default no-op.
    async fn ensure_connected(&self) -> DriverResult<()> {
        Ok(())
    }
}
