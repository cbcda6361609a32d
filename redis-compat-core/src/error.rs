//! Error types for the compatibility layer

use thiserror::Error;

/// Result type for compatibility-layer operations
pub type CompatResult<T> = Result<T, CompatError>;

/// An error raised by the underlying native driver.
///
/// The driver reports failures as structured records; the compatibility layer
/// forwards them without reshaping so callers keep the original kind and
/// message. A `Raw` failure carries whatever shapeless value the driver
/// produced and is replaced by a fixed generic error during translation.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DriverError {
    /// The driver rejected a command (wrong type, unknown command, script
    /// syntax error, authorization failure, ...). `kind` is the driver's
    /// error-class token, e.g. `WRONGTYPE` or `NOSCRIPT`.
    #[error("{kind}: {message}")]
    Command {
        /// Driver error-class token
        kind: String,
        /// Human-readable message from the driver
        message: String,
    },

    /// The driver lost its connection to the store
    #[error("connection lost: {0}")]
    ConnectionLost(String),

    /// A shapeless failure: the driver raised something that is not a
    /// structured error record (a bare message, or nothing at all)
    #[error("raw driver failure")]
    Raw(Option<String>),
}

impl DriverError {
    /// Build a `Command` error from kind and message tokens
    pub fn command(kind: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Command {
            kind: kind.into(),
            message: message.into(),
        }
    }

    /// Check whether this is a command rejection with the given kind token
    #[must_use]
    pub fn has_kind(&self, expected: &str) -> bool {
        matches!(self, Self::Command { kind, .. } if kind == expected)
    }
}

/// Comprehensive error type for the caller-facing surface
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CompatError {
    /// A caller argument shape has no defined mapping to the driver dialect.
    /// Surfaced synchronously, before any driver call is attempted.
    #[error("translation error: {0}")]
    Translate(String),

    /// The driver rejected the command; the structured error passes through
    /// unchanged
    #[error(transparent)]
    Driver(#[from] DriverError),

    /// The driver failed with a value that carries no usable structure
    #[error("unknown underlying driver error")]
    UnknownDriver,

    /// Type conversion error when reshaping a reply for the caller
    #[error("type conversion error: {0}")]
    Type(String),

    /// Invalid configuration, including use of a disabled capability
    #[error("configuration error: {0}")]
    Config(String),

    /// Cluster routing error
    #[error("cluster error: {0}")]
    Cluster(String),

    /// Subscription bridge error
    #[error("subscription error: {0}")]
    Subscribe(String),
}

impl CompatError {
    /// Check whether this error wraps a driver command rejection with the
    /// given kind token
    #[must_use]
    pub fn has_driver_kind(&self, expected: &str) -> bool {
        matches!(self, Self::Driver(e) if e.has_kind(expected))
    }
}
