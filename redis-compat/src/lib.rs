//! Compatibility layer between two key-value client dialects
//!
//! `redis-compat` lets code written against a loosely-typed, string- and
//! array-centric command API run unmodified over a native driver whose
//! command surface is stricter: typed request objects, binary-safe strings,
//! structured result records. The crate owns the translation in both
//! directions, the pipeline/transaction batching model, the poll-to-push
//! subscription bridge, and multi-key routing for sharded deployments,
//! while the wrapped driver keeps everything below the command boundary
//! (transport, connections, TLS, the wire protocol).
//!
//! # Quick Start
//!
//! ```no_run
//! use redis_compat::{Client, MemoryDriver};
//! use redis_compat_core::ClientConfig;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = Client::new(Arc::new(MemoryDriver::new()), ClientConfig::default());
//!
//!     client.set("mykey", "myvalue").await?;
//!     let value: Option<String> = client.get("mykey").await?;
//!     println!("Value: {:?}", value);
//!
//!     Ok(())
//! }
//! ```

#![deny(warnings)]
#![warn(missing_docs)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::missing_const_for_fn)]
#![allow(clippy::uninlined_format_args)]
#![allow(clippy::doc_markdown)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_sign_loss)]
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::cast_lossless)]
#![allow(clippy::return_self_not_must_use)]
#![allow(clippy::module_name_repetitions)]

pub mod client;
pub mod cluster;
pub mod commands;
pub mod dispatch;
pub mod driver;
pub mod pipeline;
pub mod pubsub;
pub mod script;
pub mod testing;
pub mod transaction;
pub mod translate;

pub use client::Client;
pub use cluster::{calculate_slot, ClusterRouter, Recombine, CLUSTER_SLOTS};
pub use driver::{Driver, DriverResult};
pub use pipeline::{ExecEntry, Pipeline};
pub use pubsub::{ListenerId, Subscriber};
pub use script::Script;
pub use testing::MemoryDriver;
pub use transaction::Transaction;

pub use redis_compat_core::{
    CallerReply, CallerValue, Capabilities, ClientConfig, CompatError, CompatResult, DriverArg,
    DriverError, DriverReply, DriverRequest, PushMessage, ScoredMember, ShardId, StreamEntry,
};
