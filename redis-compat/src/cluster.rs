//! Cluster routing for multi-key commands
//!
//! A multi-key command issued against a sharded deployment may touch keys
//! owned by different shards. The routing adapter asks the driver's topology
//! query for each key's shard; if every key lands on one shard (or the
//! deployment is not sharded at all) the invocation is forwarded unchanged.
//! Otherwise it is decomposed into one sub-invocation per shard and the
//! shard-local results are recombined at the original key positions.

use crate::driver::Driver;
use crate::translate::results;
use futures_util::future::join_all;
use redis_compat_core::{
    CallerReply, CompatError, CompatResult, DriverArg, DriverReply, DriverRequest, ShardId,
};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::debug;

/// Total number of hash slots in a clustered keyspace
pub const CLUSTER_SLOTS: u16 = 16384;

/// Calculate the hash slot for a given key.
///
/// CRC16 (XMODEM) over the `{...}` hash tag when one is present, otherwise
/// over the whole key, mod 16384. Drivers without their own slotting reuse
/// this as the canonical calculation.
#[must_use]
pub fn calculate_slot(key: &[u8]) -> u16 {
    let hash_key = extract_hash_tag(key);
    crc16::State::<crc16::XMODEM>::calculate(hash_key) % CLUSTER_SLOTS
}

/// Extract the hash tag from a key.
///
/// Keys sharing a `{tag}` are guaranteed to land on the same slot, e.g.
/// `{user1000}.following` and `{user1000}.followers`.
fn extract_hash_tag(key: &[u8]) -> &[u8] {
    if let Some(start) = key.iter().position(|&b| b == b'{') {
        if let Some(end) = key[start + 1..].iter().position(|&b| b == b'}') {
            let end = start + 1 + end;
            if end > start + 1 {
                return &key[start + 1..end];
            }
        }
    }
    key
}

/// How the shard-local results of a decomposed command recombine into one
/// caller-visible aggregate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Recombine {
    /// Each key produced one value; reassemble them at the original key
    /// positions (multi-get style)
    Positional,
    /// Each shard produced a count; sum them (delete/exists style)
    SumCounts,
    /// Each shard produced an acknowledgement; succeed only if all did
    /// (multi-set style)
    AllOk,
}

/// Routes multi-key commands across shards via the driver's topology query
pub struct ClusterRouter {
    driver: Arc<dyn Driver>,
}

impl ClusterRouter {
    /// Create a router over the given driver
    pub fn new(driver: Arc<dyn Driver>) -> Self {
        Self { driver }
    }

    /// Execute a multi-key command whose argument list is `keys` optionally
    /// interleaved with per-key extras (`extras_per_key` values following
    /// each key, e.g. 1 for multi-set pairs, 0 for multi-get).
    ///
    /// Fast path: all keys on one shard, or no sharding at all, means one driver
    /// call with the arguments untouched. Slow path: one sub-invocation per
    /// shard; order among shards is unspecified, but each shard's results
    /// recombine at the original key positions.
    pub async fn run_multi_key(
        &self,
        command: &str,
        args: &[DriverArg],
        extras_per_key: usize,
        recombine: Recombine,
    ) -> CompatResult<CallerReply> {
        let stride = 1 + extras_per_key;
        if args.is_empty() || args.len() % stride != 0 {
            return Err(CompatError::Cluster(format!(
                "{command}: ragged multi-key argument list of length {}",
                args.len()
            )));
        }

        let groups = self.group_by_shard(args, stride);

        // One shard (or unsharded): forward unchanged.
        if groups.len() <= 1 {
            let request = DriverRequest::new(command).args(args.to_vec());
            let reply = match groups.into_iter().next() {
                Some((Some(shard), _)) => self.driver.run_on_shard(shard, request).await,
                _ => self.driver.run(request).await,
            };
            return reply.map(results::caller_reply).map_err(results::translate_error);
        }

        debug!(command, shards = groups.len(), "decomposing multi-key command");
        self.run_decomposed(command, args, stride, groups, recombine)
            .await
    }

    /// Issue an administrative request to every shard, succeeding only when
    /// every shard succeeds. The first failing shard's error propagates as a
    /// hard failure; there is no partial-success reporting.
    pub async fn run_on_all_shards(&self, request: DriverRequest) -> CompatResult<CallerReply> {
        let shards = self.driver.shard_ids();
        if shards.is_empty() {
            return self
                .driver
                .run(request)
                .await
                .map(results::caller_reply)
                .map_err(results::translate_error);
        }

        debug!(
            command = %request.command,
            shards = shards.len(),
            "broadcasting to all shards"
        );
        let calls = shards
            .into_iter()
            .map(|shard| self.driver.run_on_shard(shard, request.clone()));
        for outcome in join_all(calls).await {
            outcome.map_err(results::translate_error)?;
        }
        Ok(CallerReply::Str("OK".to_string()))
    }

    /// Group `(key, extras)` strides by owning shard, remembering each
    /// stride's original position.
    fn group_by_shard(
        &self,
        args: &[DriverArg],
        stride: usize,
    ) -> BTreeMap<Option<ShardId>, Vec<usize>> {
        let mut groups: BTreeMap<Option<ShardId>, Vec<usize>> = BTreeMap::new();
        for (position, chunk) in args.chunks(stride).enumerate() {
            let shard = match &chunk[0] {
                DriverArg::Blob(key) => self.driver.shard_for_key(key),
                other => self.driver.shard_for_key(other.to_text().as_bytes()),
            };
            groups.entry(shard).or_default().push(position);
        }
        groups
    }

    async fn run_decomposed(
        &self,
        command: &str,
        args: &[DriverArg],
        stride: usize,
        groups: BTreeMap<Option<ShardId>, Vec<usize>>,
        recombine: Recombine,
    ) -> CompatResult<CallerReply> {
        let strides: Vec<&[DriverArg]> = args.chunks(stride).collect();

        let mut calls = Vec::with_capacity(groups.len());
        for (shard, positions) in groups {
            let mut sub_args = Vec::with_capacity(positions.len() * stride);
            for &position in &positions {
                sub_args.extend_from_slice(strides[position]);
            }
            let request = DriverRequest::new(command).args(sub_args);
            let driver = Arc::clone(&self.driver);
            calls.push(async move {
                let reply = match shard {
                    Some(shard) => driver.run_on_shard(shard, request).await,
                    None => driver.run(request).await,
                };
                (positions, reply)
            });
        }

        let outcomes = join_all(calls).await;

        match recombine {
            Recombine::Positional => {
                let key_count = strides.len();
                let mut slots: Vec<CallerReply> = vec![CallerReply::Nil; key_count];
                for (positions, reply) in outcomes {
                    let reply = reply.map_err(results::translate_error)?;
                    let DriverReply::List(values) = reply else {
                        return Err(CompatError::Cluster(format!(
                            "{command}: shard returned a non-list result"
                        )));
                    };
                    if values.len() != positions.len() {
                        return Err(CompatError::Cluster(format!(
                            "{command}: shard returned {} values for {} keys",
                            values.len(),
                            positions.len()
                        )));
                    }
                    for (&position, value) in positions.iter().zip(values) {
                        // Re-wrap each element so array-position Nil handling
                        // matches an undecomposed reply.
                        slots[position] = match results::caller_reply(DriverReply::List(vec![value]))
                        {
                            CallerReply::Array(mut one) => one.remove(0),
                            other => other,
                        };
                    }
                }
                Ok(CallerReply::Array(slots))
            }
            Recombine::SumCounts => {
                let mut total = 0i64;
                for (_, reply) in outcomes {
                    match reply.map_err(results::translate_error)? {
                        DriverReply::Int(n) => total += n,
                        other => {
                            return Err(CompatError::Cluster(format!(
                                "{command}: shard returned a non-count result {other:?}"
                            )))
                        }
                    }
                }
                Ok(CallerReply::Int(total))
            }
            Recombine::AllOk => {
                for (_, reply) in outcomes {
                    reply.map_err(results::translate_error)?;
                }
                Ok(CallerReply::Str("OK".to_string()))
            }
        }
    }
}
