//! Core types for the redis-compat compatibility layer
//!
//! This crate provides the fundamental value models, error definitions, and
//! configuration types shared by the translation engine: the loosely-typed
//! caller dialect (`CallerValue`/`CallerReply`) and the strict driver dialect
//! (`DriverRequest`/`DriverReply`).

#![deny(warnings)]
#![warn(missing_docs)]

pub mod config;
pub mod error;
pub mod types;
pub mod value;

pub use config::{Capabilities, ClientConfig};
pub use error::{CompatError, CompatResult, DriverError};
pub use types::{
    DriverArg, DriverReply, DriverRequest, PushMessage, ScoredMember, ShardId, StreamEntry,
};
pub use value::{CallerReply, CallerValue};
