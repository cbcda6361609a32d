//! Configuration types for compatibility-layer clients

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Capability set of a client handle.
///
/// Rather than a class hierarchy of client kinds, one connection type carries
/// a capability set checked by the component that needs it: the subscription
/// bridge refuses to start on a handle without `subscriptions`, and
/// bounded-wait commands refuse on a handle without `blocking_ops`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Capabilities {
    /// Whether this handle may register subscriptions
    pub subscriptions: bool,
    /// Whether this handle may issue bounded-wait (blocking) commands
    pub blocking_ops: bool,
}

impl Default for Capabilities {
    fn default() -> Self {
        Self {
            subscriptions: true,
            blocking_ops: true,
        }
    }
}

impl Capabilities {
    /// A handle restricted to plain command execution
    #[must_use]
    pub const fn command_only() -> Self {
        Self {
            subscriptions: false,
            blocking_ops: false,
        }
    }

    /// A handle intended only for subscription traffic
    #[must_use]
    pub const fn subscriber_only() -> Self {
        Self {
            subscriptions: true,
            blocking_ops: false,
        }
    }
}

/// Configuration for a compatibility-layer client
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Capability set of handles created with this configuration
    pub capabilities: Capabilities,

    /// Upper bound for a single subscription poll attempt; a poll that times
    /// out resolves with "no message yet" and the bridge decides whether to
    /// poll again
    pub subscription_poll_timeout: Duration,

    /// How long command dispatch waits for the background connection task to
    /// settle before giving up
    pub ready_timeout: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            capabilities: Capabilities::default(),
            subscription_poll_timeout: Duration::from_millis(100),
            ready_timeout: Duration::from_secs(10),
        }
    }
}

impl ClientConfig {
    /// Create a configuration with default settings
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the capability set
    #[must_use]
    pub const fn with_capabilities(mut self, capabilities: Capabilities) -> Self {
        self.capabilities = capabilities;
        self
    }

    /// Set the per-attempt subscription poll timeout
    #[must_use]
    pub const fn with_subscription_poll_timeout(mut self, timeout: Duration) -> Self {
        self.subscription_poll_timeout = timeout;
        self
    }

    /// Set the connection-readiness timeout
    #[must_use]
    pub const fn with_ready_timeout(mut self, timeout: Duration) -> Self {
        self.ready_timeout = timeout;
        self
    }
}
