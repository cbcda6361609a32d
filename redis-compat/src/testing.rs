//! In-memory driver for tests and examples
//!
//! [`MemoryDriver`] implements the full [`Driver`](crate::driver::Driver)
//! trait over a versioned in-process keyspace: every write bumps the touched
//! key's version, so optimistic-lock watch semantics behave like the real
//! thing. Subscription traffic flows through an internal queue exposed via
//! the pull-style poll primitive, and an optional shard count emulates a
//! clustered deployment for routing tests.
//!
//! The command interpreter covers the command families the bindings use; it
//! is not a store implementation, just enough behavior to exercise the
//! translation engine end to end.

use crate::cluster::calculate_slot;
use crate::driver::{Driver, DriverResult};
use crate::script::calculate_sha1;
use async_trait::async_trait;
use bytes::Bytes;
use redis_compat_core::{
    DriverArg, DriverError, DriverReply, DriverRequest, PushMessage, ScoredMember, ShardId,
    StreamEntry,
};
use std::collections::{BTreeSet, HashMap, VecDeque};
use std::sync::Mutex;
use std::time::{Duration, Instant};
use tokio::sync::Notify;

const BLOCK_POLL_INTERVAL: Duration = Duration::from_millis(10);

#[derive(Debug, Clone)]
enum Value {
    Str(Bytes),
    Hash(Vec<(Bytes, Bytes)>),
    List(VecDeque<Bytes>),
    Set(BTreeSet<Vec<u8>>),
    Zset(Vec<(f64, Vec<u8>)>),
    Stream { entries: Vec<StreamEntry>, last_seq: u64 },
}

impl Value {
    fn kind(&self) -> &'static str {
        match self {
            Self::Str(_) => "string",
            Self::Hash(_) => "hash",
            Self::List(_) => "list",
            Self::Set(_) => "set",
            Self::Zset(_) => "zset",
            Self::Stream { .. } => "stream",
        }
    }
}

struct Entry {
    value: Value,
    expires_at: Option<Instant>,
}

/// One recorded driver call, for routing assertions in tests
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedCall {
    /// Shard the call was addressed to; `None` for undirected calls
    pub shard: Option<ShardId>,
    /// Command name
    pub command: String,
}

#[derive(Default)]
struct Store {
    entries: HashMap<String, Entry>,
    versions: HashMap<String, u64>,
    watched: HashMap<String, u64>,
    scripts: HashMap<String, String>,
    sub_channels: Vec<String>,
    sub_patterns: Vec<String>,
}

impl Store {
    fn touch(&mut self, key: &str) {
        *self.versions.entry(key.to_string()).or_insert(0) += 1;
    }

    fn version(&self, key: &str) -> u64 {
        self.versions.get(key).copied().unwrap_or(0)
    }

    fn live_entry(&mut self, key: &str) -> Option<&mut Entry> {
        let expired = self
            .entries
            .get(key)
            .and_then(|e| e.expires_at)
            .is_some_and(|at| at <= Instant::now());
        if expired {
            self.entries.remove(key);
            self.touch(key);
        }
        self.entries.get_mut(key)
    }
}

/// An in-memory implementation of the driver boundary
pub struct MemoryDriver {
    store: Mutex<Store>,
    messages: Mutex<VecDeque<PushMessage>>,
    message_ready: Notify,
    calls: Mutex<Vec<RecordedCall>>,
    shards: Option<u16>,
    failing_shard: Mutex<Option<ShardId>>,
}

impl Default for MemoryDriver {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryDriver {
    /// Create an unsharded driver
    #[must_use]
    pub fn new() -> Self {
        Self {
            store: Mutex::new(Store::default()),
            messages: Mutex::new(VecDeque::new()),
            message_ready: Notify::new(),
            calls: Mutex::new(Vec::new()),
            shards: None,
            failing_shard: Mutex::new(None),
        }
    }

    /// Create a driver emulating a deployment with `shards` shards
    #[must_use]
    pub fn sharded(shards: u16) -> Self {
        let mut driver = Self::new();
        driver.shards = Some(shards.max(1));
        driver
    }

    /// Make every call addressed to `shard` fail, for aggregation tests
    pub fn fail_shard(&self, shard: Option<ShardId>) {
        *self.failing_shard.lock().expect("lock poisoned") = shard;
    }

    /// Calls recorded so far, in issue order
    #[must_use]
    pub fn recorded_calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().expect("lock poisoned").clone()
    }

    /// Modify a key out-of-band, as "another party" would: bumps the key's
    /// version so watched transactions observe the change.
    pub fn external_write(&self, key: &str, value: &str) {
        let mut store = self.store.lock().expect("lock poisoned");
        store.entries.insert(
            key.to_string(),
            Entry {
                value: Value::Str(Bytes::from(value.as_bytes().to_vec())),
                expires_at: None,
            },
        );
        store.touch(key);
    }

    fn record(&self, shard: Option<ShardId>, command: &str) {
        self.calls.lock().expect("lock poisoned").push(RecordedCall {
            shard,
            command: command.to_string(),
        });
    }

    fn apply(&self, store: &mut Store, request: &DriverRequest) -> DriverResult<DriverReply> {
        let args = &request.args;
        match request.command.as_str() {
            "PING" => Ok(DriverReply::Ok),
            "GET" => {
                let key = text_arg(args, 0)?;
                match store.live_entry(&key) {
                    Some(Entry { value: Value::Str(b), .. }) => Ok(DriverReply::Blob(b.clone())),
                    Some(entry) => Err(wrong_type(entry.value.kind())),
                    None => Ok(DriverReply::Nil),
                }
            }
            "SET" => self.apply_set(store, args),
            "DEL" => {
                let mut removed = 0;
                for arg in args {
                    let key = blob_text(arg);
                    if store.entries.remove(&key).is_some() {
                        removed += 1;
                    }
                    store.touch(&key);
                }
                Ok(DriverReply::Int(removed))
            }
            "EXISTS" => {
                let mut found = 0;
                for arg in args {
                    let key = blob_text(arg);
                    if store.live_entry(&key).is_some() {
                        found += 1;
                    }
                }
                Ok(DriverReply::Int(found))
            }
            "EXPIRE" => {
                let key = text_arg(args, 0)?;
                let seconds = int_arg(args, 1)?;
                match store.live_entry(&key) {
                    Some(entry) => {
                        entry.expires_at =
                            Some(Instant::now() + Duration::from_secs(seconds.max(0) as u64));
                        Ok(DriverReply::Int(1))
                    }
                    None => Ok(DriverReply::Int(0)),
                }
            }
            "TTL" => {
                let key = text_arg(args, 0)?;
                match store.live_entry(&key) {
                    Some(Entry { expires_at: Some(at), .. }) => {
                        let remaining = at.saturating_duration_since(Instant::now());
                        Ok(DriverReply::Int(remaining.as_secs() as i64))
                    }
                    Some(_) => Ok(DriverReply::Int(-1)),
                    None => Ok(DriverReply::Int(-2)),
                }
            }
            "INCR" => self.apply_incr(store, args, 1),
            "DECR" => self.apply_incr(store, args, -1),
            "INCRBY" => {
                let delta = int_arg(args, 1)?;
                self.apply_incr(store, args, delta)
            }
            "DECRBY" => {
                let delta = int_arg(args, 1)?;
                self.apply_incr(store, args, -delta)
            }
            "MGET" => {
                let values = args
                    .iter()
                    .map(|arg| match store.live_entry(&blob_text(arg)) {
                        Some(Entry { value: Value::Str(b), .. }) => DriverReply::Blob(b.clone()),
                        _ => DriverReply::Nil,
                    })
                    .collect();
                Ok(DriverReply::List(values))
            }
            "MSET" => {
                for pair in args.chunks(2) {
                    let key = blob_text(&pair[0]);
                    let value = arg_bytes(&pair[1]);
                    store.entries.insert(
                        key.clone(),
                        Entry { value: Value::Str(value), expires_at: None },
                    );
                    store.touch(&key);
                }
                Ok(DriverReply::Ok)
            }
            "FLUSHALL" => {
                let keys: Vec<String> = store.entries.keys().cloned().collect();
                for key in keys {
                    store.entries.remove(&key);
                    store.touch(&key);
                }
                Ok(DriverReply::Ok)
            }
            "HGET" | "HSET" | "HDEL" | "HGETALL" | "HMGET" => self.apply_hash(store, request),
            "LPUSH" | "RPUSH" | "LPOP" | "RPOP" | "LRANGE" | "LLEN" => {
                self.apply_list(store, request)
            }
            "SADD" | "SREM" | "SMEMBERS" | "SISMEMBER" | "SCARD" => {
                self.apply_set_family(store, request)
            }
            "ZADD" | "ZREM" | "ZRANGE" | "ZRANGEBYSCORE" | "ZSCORE" | "ZCARD" => {
                self.apply_zset(store, request)
            }
            "XADD" | "XRANGE" | "XLEN" => self.apply_stream(store, request),
            "PUBLISH" => self.apply_publish(store, args),
            "EVAL" => {
                let source = text_arg(args, 0)?;
                store.scripts.insert(calculate_sha1(&source), source.clone());
                run_script(&source, args)
            }
            "EVALSHA" => {
                let sha = text_arg(args, 0)?;
                let Some(source) = store.scripts.get(&sha).cloned() else {
                    return Err(DriverError::command(
                        "NOSCRIPT",
                        "no matching script, use EVAL",
                    ));
                };
                run_script(&source, args)
            }
            "SCRIPT" => self.apply_script_admin(store, args),
            "BLPOP" | "BZPOPMIN" => {
                // Inside a batch there is no waiting; try once.
                Ok(self.try_pop(store, request))
            }
            other => Err(DriverError::command(
                "ERR",
                format!("unknown command '{other}'"),
            )),
        }
    }

    fn apply_set(&self, store: &mut Store, args: &[DriverArg]) -> DriverResult<DriverReply> {
        let key = text_arg(args, 0)?;
        let value = arg_bytes(args.get(1).ok_or_else(|| missing_arg("SET"))?);

        let mut nx = false;
        let mut xx = false;
        let mut expire: Option<Duration> = None;
        let mut i = 2;
        while i < args.len() {
            match blob_text(&args[i]).to_uppercase().as_str() {
                "NX" => nx = true,
                "XX" => xx = true,
                "EX" => {
                    let secs = int_arg(args, i + 1)?;
                    expire = Some(Duration::from_secs(secs.max(0) as u64));
                    i += 1;
                }
                "PX" => {
                    let millis = int_arg(args, i + 1)?;
                    expire = Some(Duration::from_millis(millis.max(0) as u64));
                    i += 1;
                }
                other => {
                    return Err(DriverError::command(
                        "ERR",
                        format!("syntax error near '{other}'"),
                    ))
                }
            }
            i += 1;
        }

        let exists = store.live_entry(&key).is_some();
        if (nx && exists) || (xx && !exists) {
            return Ok(DriverReply::Nil);
        }

        store.entries.insert(
            key.clone(),
            Entry {
                value: Value::Str(value),
                expires_at: expire.map(|d| Instant::now() + d),
            },
        );
        store.touch(&key);
        Ok(DriverReply::Ok)
    }

    fn apply_incr(
        &self,
        store: &mut Store,
        args: &[DriverArg],
        delta: i64,
    ) -> DriverResult<DriverReply> {
        let key = text_arg(args, 0)?;
        let current = match store.live_entry(&key) {
            Some(Entry { value: Value::Str(b), .. }) => String::from_utf8_lossy(b)
                .parse::<i64>()
                .map_err(|_| {
                    DriverError::command("ERR", "value is not an integer or out of range")
                })?,
            Some(entry) => return Err(wrong_type(entry.value.kind())),
            None => 0,
        };
        let next = current + delta;
        store.entries.insert(
            key.clone(),
            Entry {
                value: Value::Str(Bytes::from(next.to_string().into_bytes())),
                expires_at: None,
            },
        );
        store.touch(&key);
        Ok(DriverReply::Int(next))
    }

    fn apply_hash(&self, store: &mut Store, request: &DriverRequest) -> DriverResult<DriverReply> {
        let args = &request.args;
        let key = text_arg(args, 0)?;

        let mut fields = match store.live_entry(&key) {
            Some(Entry { value: Value::Hash(fields), .. }) => fields.clone(),
            Some(entry) => return Err(wrong_type(entry.value.kind())),
            None => Vec::new(),
        };

        match request.command.as_str() {
            "HGET" => {
                let field = arg_bytes(args.get(1).ok_or_else(|| missing_arg("HGET"))?);
                Ok(fields
                    .iter()
                    .find(|(f, _)| *f == field)
                    .map_or(DriverReply::Nil, |(_, v)| DriverReply::Blob(v.clone())))
            }
            "HSET" => {
                let mut added = 0;
                for pair in args[1..].chunks(2) {
                    let field = arg_bytes(&pair[0]);
                    let value = arg_bytes(pair.get(1).ok_or_else(|| missing_arg("HSET"))?);
                    if let Some(slot) = fields.iter_mut().find(|(f, _)| *f == field) {
                        slot.1 = value;
                    } else {
                        fields.push((field, value));
                        added += 1;
                    }
                }
                store.entries.insert(
                    key.clone(),
                    Entry { value: Value::Hash(fields), expires_at: None },
                );
                store.touch(&key);
                Ok(DriverReply::Int(added))
            }
            "HDEL" => {
                let before = fields.len();
                for arg in &args[1..] {
                    let field = arg_bytes(arg);
                    fields.retain(|(f, _)| *f != field);
                }
                let removed = (before - fields.len()) as i64;
                store.entries.insert(
                    key.clone(),
                    Entry { value: Value::Hash(fields), expires_at: None },
                );
                store.touch(&key);
                Ok(DriverReply::Int(removed))
            }
            "HGETALL" => {
                let mut flat = Vec::with_capacity(fields.len() * 2);
                for (field, value) in fields {
                    flat.push(DriverReply::Blob(field));
                    flat.push(DriverReply::Blob(value));
                }
                Ok(DriverReply::List(flat))
            }
            "HMGET" => {
                let values = args[1..]
                    .iter()
                    .map(|arg| {
                        let field = arg_bytes(arg);
                        fields
                            .iter()
                            .find(|(f, _)| *f == field)
                            .map_or(DriverReply::Nil, |(_, v)| DriverReply::Blob(v.clone()))
                    })
                    .collect();
                Ok(DriverReply::List(values))
            }
            _ => unreachable!("hash dispatch"),
        }
    }

    fn apply_list(&self, store: &mut Store, request: &DriverRequest) -> DriverResult<DriverReply> {
        let args = &request.args;
        let key = text_arg(args, 0)?;

        let mut list = match store.live_entry(&key) {
            Some(Entry { value: Value::List(list), .. }) => list.clone(),
            Some(entry) => return Err(wrong_type(entry.value.kind())),
            None => VecDeque::new(),
        };

        let reply = match request.command.as_str() {
            "LPUSH" => {
                for arg in &args[1..] {
                    list.push_front(arg_bytes(arg));
                }
                DriverReply::Int(list.len() as i64)
            }
            "RPUSH" => {
                for arg in &args[1..] {
                    list.push_back(arg_bytes(arg));
                }
                DriverReply::Int(list.len() as i64)
            }
            "LPOP" => list.pop_front().map_or(DriverReply::Nil, DriverReply::Blob),
            "RPOP" => list.pop_back().map_or(DriverReply::Nil, DriverReply::Blob),
            "LRANGE" => {
                let start = clamp_index(int_arg(args, 1)?, list.len());
                let stop = clamp_index(int_arg(args, 2)?, list.len());
                let items = if start > stop || list.is_empty() {
                    Vec::new()
                } else {
                    list.iter()
                        .skip(start)
                        .take(stop - start + 1)
                        .cloned()
                        .map(DriverReply::Blob)
                        .collect()
                };
                return Ok(DriverReply::List(items));
            }
            "LLEN" => return Ok(DriverReply::Int(list.len() as i64)),
            _ => unreachable!("list dispatch"),
        };

        if list.is_empty() {
            store.entries.remove(&key);
        } else {
            store.entries.insert(
                key.clone(),
                Entry { value: Value::List(list), expires_at: None },
            );
        }
        store.touch(&key);
        Ok(reply)
    }

    fn apply_set_family(
        &self,
        store: &mut Store,
        request: &DriverRequest,
    ) -> DriverResult<DriverReply> {
        let args = &request.args;
        let key = text_arg(args, 0)?;

        let mut members = match store.live_entry(&key) {
            Some(Entry { value: Value::Set(members), .. }) => members.clone(),
            Some(entry) => return Err(wrong_type(entry.value.kind())),
            None => BTreeSet::new(),
        };

        match request.command.as_str() {
            "SADD" => {
                let mut added = 0;
                for arg in &args[1..] {
                    if members.insert(arg_bytes(arg).to_vec()) {
                        added += 1;
                    }
                }
                store.entries.insert(
                    key.clone(),
                    Entry { value: Value::Set(members), expires_at: None },
                );
                store.touch(&key);
                Ok(DriverReply::Int(added))
            }
            "SREM" => {
                let mut removed = 0;
                for arg in &args[1..] {
                    if members.remove(&arg_bytes(arg).to_vec()) {
                        removed += 1;
                    }
                }
                store.entries.insert(
                    key.clone(),
                    Entry { value: Value::Set(members), expires_at: None },
                );
                store.touch(&key);
                Ok(DriverReply::Int(removed))
            }
            "SMEMBERS" => Ok(DriverReply::List(
                members
                    .iter()
                    .map(|m| DriverReply::blob(m.clone()))
                    .collect(),
            )),
            "SISMEMBER" => {
                let member = arg_bytes(args.get(1).ok_or_else(|| missing_arg("SISMEMBER"))?);
                Ok(DriverReply::Bool(members.contains(&member.to_vec())))
            }
            "SCARD" => Ok(DriverReply::Int(members.len() as i64)),
            _ => unreachable!("set dispatch"),
        }
    }

    fn apply_zset(&self, store: &mut Store, request: &DriverRequest) -> DriverResult<DriverReply> {
        let args = &request.args;
        let key = text_arg(args, 0)?;

        let mut members = match store.live_entry(&key) {
            Some(Entry { value: Value::Zset(members), .. }) => members.clone(),
            Some(entry) => return Err(wrong_type(entry.value.kind())),
            None => Vec::new(),
        };

        match request.command.as_str() {
            "ZADD" => {
                let mut i = 1;
                // Skip conditional-write flags; the interpreter applies plain
                // upsert semantics either way.
                while i < args.len() {
                    let token = blob_text(&args[i]).to_uppercase();
                    if matches!(token.as_str(), "NX" | "XX" | "GT" | "LT" | "CH") {
                        i += 1;
                    } else {
                        break;
                    }
                }
                let mut added = 0;
                while i + 1 < args.len() {
                    let score = score_arg(&args[i])?;
                    let member = arg_bytes(&args[i + 1]).to_vec();
                    if let Some(slot) = members.iter_mut().find(|(_, m)| *m == member) {
                        slot.0 = score;
                    } else {
                        members.push((score, member));
                        added += 1;
                    }
                    i += 2;
                }
                sort_zset(&mut members);
                store.entries.insert(
                    key.clone(),
                    Entry { value: Value::Zset(members), expires_at: None },
                );
                store.touch(&key);
                Ok(DriverReply::Int(added))
            }
            "ZREM" => {
                let before = members.len();
                for arg in &args[1..] {
                    let member = arg_bytes(arg).to_vec();
                    members.retain(|(_, m)| *m != member);
                }
                let removed = (before - members.len()) as i64;
                store.entries.insert(
                    key.clone(),
                    Entry { value: Value::Zset(members), expires_at: None },
                );
                store.touch(&key);
                Ok(DriverReply::Int(removed))
            }
            "ZRANGE" => {
                let start = clamp_index(int_arg(args, 1)?, members.len());
                let stop = clamp_index(int_arg(args, 2)?, members.len());
                let with_scores = args
                    .get(3)
                    .is_some_and(|a| blob_text(a).eq_ignore_ascii_case("WITHSCORES"));
                let selected: Vec<&(f64, Vec<u8>)> = if start > stop || members.is_empty() {
                    Vec::new()
                } else {
                    members.iter().skip(start).take(stop - start + 1).collect()
                };
                Ok(zset_reply(&selected, with_scores))
            }
            "ZRANGEBYSCORE" => {
                let min = parse_bound(&blob_text(args.get(1).ok_or_else(|| missing_arg("ZRANGEBYSCORE"))?))?;
                let max = parse_bound(&blob_text(args.get(2).ok_or_else(|| missing_arg("ZRANGEBYSCORE"))?))?;
                let mut with_scores = false;
                let mut limit: Option<(usize, usize)> = None;
                let mut i = 3;
                while i < args.len() {
                    match blob_text(&args[i]).to_uppercase().as_str() {
                        "WITHSCORES" => with_scores = true,
                        "LIMIT" => {
                            let offset = int_arg(args, i + 1)?.max(0) as usize;
                            let count = int_arg(args, i + 2)?.max(0) as usize;
                            limit = Some((offset, count));
                            i += 2;
                        }
                        other => {
                            return Err(DriverError::command(
                                "ERR",
                                format!("syntax error near '{other}'"),
                            ))
                        }
                    }
                    i += 1;
                }
                let mut selected: Vec<&(f64, Vec<u8>)> = members
                    .iter()
                    .filter(|(score, _)| min.admits_lower(*score) && max.admits_upper(*score))
                    .collect();
                if let Some((offset, count)) = limit {
                    selected = selected.into_iter().skip(offset).take(count).collect();
                }
                Ok(zset_reply(&selected, with_scores))
            }
            "ZSCORE" => {
                let member = arg_bytes(args.get(1).ok_or_else(|| missing_arg("ZSCORE"))?).to_vec();
                Ok(members
                    .iter()
                    .find(|(_, m)| *m == member)
                    .map_or(DriverReply::Nil, |(score, _)| DriverReply::Double(*score)))
            }
            "ZCARD" => Ok(DriverReply::Int(members.len() as i64)),
            _ => unreachable!("zset dispatch"),
        }
    }

    fn apply_stream(
        &self,
        store: &mut Store,
        request: &DriverRequest,
    ) -> DriverResult<DriverReply> {
        let args = &request.args;
        let key = text_arg(args, 0)?;

        let (mut entries, mut last_seq) = match store.live_entry(&key) {
            Some(Entry { value: Value::Stream { entries, last_seq }, .. }) => {
                (entries.clone(), *last_seq)
            }
            Some(entry) => return Err(wrong_type(entry.value.kind())),
            None => (Vec::new(), 0),
        };

        match request.command.as_str() {
            "XADD" => {
                let id_token = text_arg(args, 1)?;
                last_seq += 1;
                let id = if id_token == "*" {
                    format!("{last_seq}-0")
                } else {
                    id_token
                };
                let mut fields = Vec::new();
                for pair in args[2..].chunks(2) {
                    let field = arg_bytes(&pair[0]);
                    let value = arg_bytes(pair.get(1).ok_or_else(|| missing_arg("XADD"))?);
                    fields.push((field, value));
                }
                entries.push(StreamEntry { id: id.clone(), fields });
                store.entries.insert(
                    key.clone(),
                    Entry {
                        value: Value::Stream { entries, last_seq },
                        expires_at: None,
                    },
                );
                store.touch(&key);
                Ok(DriverReply::blob(id.into_bytes()))
            }
            "XRANGE" => {
                let start = text_arg(args, 1)?;
                let end = text_arg(args, 2)?;
                let count = args
                    .iter()
                    .position(|a| blob_text(a).eq_ignore_ascii_case("COUNT"))
                    .and_then(|i| args.get(i + 1))
                    .map(|a| a.to_text().parse::<usize>().unwrap_or(usize::MAX));
                let selected: Vec<StreamEntry> = entries
                    .into_iter()
                    .filter(|entry| {
                        (start == "-" || entry.id.as_str() >= start.as_str())
                            && (end == "+" || entry.id.as_str() <= end.as_str())
                    })
                    .take(count.unwrap_or(usize::MAX))
                    .collect();
                Ok(DriverReply::Entries(selected))
            }
            "XLEN" => Ok(DriverReply::Int(entries.len() as i64)),
            _ => unreachable!("stream dispatch"),
        }
    }

    fn apply_publish(&self, store: &mut Store, args: &[DriverArg]) -> DriverResult<DriverReply> {
        let channel = text_arg(args, 0)?;
        let payload = arg_bytes(args.get(1).ok_or_else(|| missing_arg("PUBLISH"))?);

        let mut delivered = 0;
        let mut queue = self.messages.lock().expect("lock poisoned");
        if store.sub_channels.iter().any(|c| *c == channel) {
            queue.push_back(PushMessage {
                channel: channel.clone(),
                pattern: None,
                payload: payload.clone(),
            });
            delivered += 1;
        }
        for pattern in &store.sub_patterns {
            if glob_match(pattern.as_bytes(), channel.as_bytes()) {
                queue.push_back(PushMessage {
                    channel: channel.clone(),
                    pattern: Some(pattern.clone()),
                    payload: payload.clone(),
                });
                delivered += 1;
            }
        }
        drop(queue);
        if delivered > 0 {
            self.message_ready.notify_waiters();
        }
        Ok(DriverReply::Int(delivered))
    }

    fn apply_script_admin(
        &self,
        store: &mut Store,
        args: &[DriverArg],
    ) -> DriverResult<DriverReply> {
        match text_arg(args, 0)?.to_uppercase().as_str() {
            "LOAD" => {
                let source = text_arg(args, 1)?;
                let sha = calculate_sha1(&source);
                store.scripts.insert(sha.clone(), source);
                Ok(DriverReply::blob(sha.into_bytes()))
            }
            "EXISTS" => Ok(DriverReply::List(
                args[1..]
                    .iter()
                    .map(|arg| DriverReply::Int(i64::from(store.scripts.contains_key(&blob_text(arg)))))
                    .collect(),
            )),
            "FLUSH" => {
                store.scripts.clear();
                Ok(DriverReply::Ok)
            }
            other => Err(DriverError::command(
                "ERR",
                format!("unknown SCRIPT subcommand '{other}'"),
            )),
        }
    }

    /// Non-waiting attempt at a blocking pop; `Nil` when nothing is ready.
    fn try_pop(&self, store: &mut Store, request: &DriverRequest) -> DriverReply {
        let key_count = request.args.len().saturating_sub(1);
        for arg in &request.args[..key_count] {
            let key = blob_text(arg);
            match request.command.as_str() {
                "BLPOP" => {
                    let popped = match store.live_entry(&key) {
                        Some(Entry { value: Value::List(list), .. }) => {
                            list.pop_front().map(|item| (item, list.is_empty()))
                        }
                        _ => None,
                    };
                    if let Some((item, emptied)) = popped {
                        if emptied {
                            store.entries.remove(&key);
                        }
                        store.touch(&key);
                        return DriverReply::List(vec![
                            DriverReply::blob(key.into_bytes()),
                            DriverReply::Blob(item),
                        ]);
                    }
                }
                "BZPOPMIN" => {
                    let popped = match store.live_entry(&key) {
                        Some(Entry { value: Value::Zset(members), .. }) if !members.is_empty() => {
                            let (score, member) = members.remove(0);
                            Some((score, member, members.is_empty()))
                        }
                        _ => None,
                    };
                    if let Some((score, member, emptied)) = popped {
                        if emptied {
                            store.entries.remove(&key);
                        }
                        store.touch(&key);
                        return DriverReply::List(vec![
                            DriverReply::blob(key.into_bytes()),
                            DriverReply::blob(member),
                            DriverReply::Double(score),
                        ]);
                    }
                }
                _ => {}
            }
        }
        DriverReply::Nil
    }

    async fn run_blocking(&self, request: &DriverRequest) -> DriverResult<DriverReply> {
        let timeout_secs = request
            .args
            .last()
            .map(|arg| match arg {
                DriverArg::Float(f) => *f,
                DriverArg::Int(i) => *i as f64,
                DriverArg::Blob(b) => String::from_utf8_lossy(b).parse().unwrap_or(0.0),
            })
            .unwrap_or(0.0);
        let deadline = Instant::now() + Duration::from_secs_f64(timeout_secs.max(0.0));

        loop {
            {
                let mut store = self.store.lock().expect("lock poisoned");
                let reply = self.try_pop(&mut store, request);
                if !reply.is_nil() {
                    return Ok(reply);
                }
            }
            if Instant::now() >= deadline {
                return Ok(DriverReply::Nil);
            }
            tokio::time::sleep(BLOCK_POLL_INTERVAL).await;
        }
    }
}

#[async_trait]
impl Driver for MemoryDriver {
    async fn run(&self, request: DriverRequest) -> DriverResult<DriverReply> {
        self.record(None, &request.command);
        if matches!(request.command.as_str(), "BLPOP" | "BZPOPMIN") {
            return self.run_blocking(&request).await;
        }
        let mut store = self.store.lock().expect("lock poisoned");
        self.apply(&mut store, &request)
    }

    async fn run_batch(
        &self,
        requests: Vec<DriverRequest>,
    ) -> DriverResult<Vec<DriverResult<DriverReply>>> {
        let mut store = self.store.lock().expect("lock poisoned");
        Ok(requests
            .iter()
            .map(|request| {
                self.record(None, &request.command);
                self.apply(&mut store, request)
            })
            .collect())
    }

    async fn run_transaction(
        &self,
        requests: Vec<DriverRequest>,
    ) -> DriverResult<Option<Vec<DriverResult<DriverReply>>>> {
        let mut store = self.store.lock().expect("lock poisoned");

        let dirty = store
            .watched
            .iter()
            .any(|(key, version)| store.version(key) != *version);
        store.watched.clear();
        if dirty {
            return Ok(None);
        }

        Ok(Some(
            requests
                .iter()
                .map(|request| {
                    self.record(None, &request.command);
                    self.apply(&mut store, request)
                })
                .collect(),
        ))
    }

    async fn watch(&self, keys: Vec<String>) -> DriverResult<()> {
        let mut store = self.store.lock().expect("lock poisoned");
        for key in keys {
            let version = store.version(&key);
            store.watched.insert(key, version);
        }
        Ok(())
    }

    async fn unwatch(&self) -> DriverResult<()> {
        let mut store = self.store.lock().expect("lock poisoned");
        store.watched.clear();
        Ok(())
    }

    async fn set_subscriptions(
        &self,
        channels: &[String],
        patterns: &[String],
    ) -> DriverResult<()> {
        let mut store = self.store.lock().expect("lock poisoned");
        store.sub_channels = channels.to_vec();
        store.sub_patterns = patterns.to_vec();
        Ok(())
    }

    async fn poll_message(&self, timeout: Duration) -> DriverResult<Option<PushMessage>> {
        let deadline = Instant::now() + timeout;
        loop {
            if let Some(message) = self.messages.lock().expect("lock poisoned").pop_front() {
                return Ok(Some(message));
            }
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return Ok(None);
            }
            let _ = tokio::time::timeout(remaining, self.message_ready.notified()).await;
        }
    }

    fn shard_for_key(&self, key: &[u8]) -> Option<ShardId> {
        self.shards
            .map(|count| ShardId(calculate_slot(key) % count))
    }

    fn shard_ids(&self) -> Vec<ShardId> {
        self.shards.map_or_else(Vec::new, |count| {
            (0..count).map(ShardId).collect()
        })
    }

    async fn run_on_shard(
        &self,
        shard: ShardId,
        request: DriverRequest,
    ) -> DriverResult<DriverReply> {
        self.record(Some(shard), &request.command);
        if *self.failing_shard.lock().expect("lock poisoned") == Some(shard) {
            return Err(DriverError::ConnectionLost(format!(
                "shard {} unreachable",
                shard.index()
            )));
        }

        let mut store = self.store.lock().expect("lock poisoned");
        if request.command == "FLUSHALL" {
            let keys: Vec<String> = store
                .entries
                .keys()
                .filter(|key| self.shard_for_key(key.as_bytes()) == Some(shard))
                .cloned()
                .collect();
            for key in keys {
                store.entries.remove(&key);
                store.touch(&key);
            }
            return Ok(DriverReply::Ok);
        }
        self.apply(&mut store, &request)
    }
}

/// Interpret the tiny script subset the tests use: `return <int>`,
/// `return KEYS[n]`, `return ARGV[n]`, and `return {expr, expr, ...}`.
fn run_script(source: &str, args: &[DriverArg]) -> DriverResult<DriverReply> {
    let key_count = args
        .get(1)
        .map(|a| a.to_text().parse::<usize>().unwrap_or(0))
        .unwrap_or(0);
    let tail = args.get(2..).unwrap_or(&[]);
    let (keys, argv) = tail.split_at(key_count.min(tail.len()));

    let body = source.trim();
    let Some(expr) = body.strip_prefix("return ") else {
        return Err(DriverError::command("ERR", "unsupported script"));
    };

    eval_expr(expr.trim(), keys, argv)
}

fn eval_expr(expr: &str, keys: &[DriverArg], argv: &[DriverArg]) -> DriverResult<DriverReply> {
    if let Ok(n) = expr.parse::<i64>() {
        return Ok(DriverReply::Int(n));
    }
    if let Some(inner) = expr.strip_prefix('{').and_then(|e| e.strip_suffix('}')) {
        let items = inner
            .split(',')
            .map(|part| eval_expr(part.trim(), keys, argv))
            .collect::<DriverResult<Vec<_>>>()?;
        return Ok(DriverReply::List(items));
    }
    for (prefix, source) in [("KEYS[", keys), ("ARGV[", argv)] {
        if let Some(index) = expr
            .strip_prefix(prefix)
            .and_then(|e| e.strip_suffix(']'))
            .and_then(|n| n.parse::<usize>().ok())
        {
            return Ok(source
                .get(index.saturating_sub(1))
                .map_or(DriverReply::Nil, |arg| DriverReply::blob(arg_bytes(arg))));
        }
    }
    Err(DriverError::command("ERR", "unsupported script"))
}

#[derive(Debug, Clone, Copy)]
struct Bound {
    value: f64,
    exclusive: bool,
}

impl Bound {
    fn admits_lower(self, score: f64) -> bool {
        if self.exclusive {
            score > self.value
        } else {
            score >= self.value
        }
    }

    fn admits_upper(self, score: f64) -> bool {
        if self.exclusive {
            score < self.value
        } else {
            score <= self.value
        }
    }
}

fn parse_bound(token: &str) -> DriverResult<Bound> {
    let (body, exclusive) = match token.strip_prefix('(') {
        Some(rest) => (rest, true),
        None => (token, false),
    };
    let value = match body {
        "+inf" | "inf" => f64::INFINITY,
        "-inf" => f64::NEG_INFINITY,
        other => other
            .parse::<f64>()
            .map_err(|_| DriverError::command("ERR", "min or max is not a float"))?,
    };
    Ok(Bound { value, exclusive })
}

fn sort_zset(members: &mut [(f64, Vec<u8>)]) {
    members.sort_by(|a, b| {
        a.0.partial_cmp(&b.0)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.1.cmp(&b.1))
    });
}

fn zset_reply(selected: &[&(f64, Vec<u8>)], with_scores: bool) -> DriverReply {
    if with_scores {
        DriverReply::Scored(
            selected
                .iter()
                .map(|(score, member)| ScoredMember::new(member.clone(), *score))
                .collect(),
        )
    } else {
        DriverReply::List(
            selected
                .iter()
                .map(|(_, member)| DriverReply::blob(member.clone()))
                .collect(),
        )
    }
}

fn clamp_index(index: i64, len: usize) -> usize {
    if index < 0 {
        len.saturating_sub(index.unsigned_abs() as usize)
    } else {
        (index as usize).min(len.saturating_sub(1))
    }
}

/// Glob matching for subscription patterns: `*`, `?`, and literals.
fn glob_match(pattern: &[u8], text: &[u8]) -> bool {
    match (pattern.first(), text.first()) {
        (None, None) => true,
        (Some(b'*'), _) => {
            glob_match(&pattern[1..], text)
                || (!text.is_empty() && glob_match(pattern, &text[1..]))
        }
        (Some(b'?'), Some(_)) => glob_match(&pattern[1..], &text[1..]),
        (Some(p), Some(t)) if p == t => glob_match(&pattern[1..], &text[1..]),
        _ => false,
    }
}

fn blob_text(arg: &DriverArg) -> String {
    arg.to_text()
}

fn arg_bytes(arg: &DriverArg) -> Bytes {
    match arg {
        DriverArg::Blob(b) => b.clone(),
        other => Bytes::from(other.to_text().into_bytes()),
    }
}

fn text_arg(args: &[DriverArg], index: usize) -> DriverResult<String> {
    args.get(index)
        .map(blob_text)
        .ok_or_else(|| DriverError::command("ERR", "wrong number of arguments"))
}

fn int_arg(args: &[DriverArg], index: usize) -> DriverResult<i64> {
    let arg = args
        .get(index)
        .ok_or_else(|| DriverError::command("ERR", "wrong number of arguments"))?;
    match arg {
        DriverArg::Int(i) => Ok(*i),
        DriverArg::Float(f) => Ok(*f as i64),
        DriverArg::Blob(b) => String::from_utf8_lossy(b)
            .parse::<i64>()
            .map_err(|_| DriverError::command("ERR", "value is not an integer or out of range")),
    }
}

fn score_arg(arg: &DriverArg) -> DriverResult<f64> {
    match arg {
        DriverArg::Float(f) => Ok(*f),
        DriverArg::Int(i) => Ok(*i as f64),
        DriverArg::Blob(b) => String::from_utf8_lossy(b)
            .parse::<f64>()
            .map_err(|_| DriverError::command("ERR", "value is not a valid float")),
    }
}

fn missing_arg(command: &str) -> DriverError {
    DriverError::command("ERR", format!("wrong number of arguments for '{command}'"))
}

fn wrong_type(actual: &str) -> DriverError {
    DriverError::command(
        "WRONGTYPE",
        format!("operation against a key holding {actual}"),
    )
}
