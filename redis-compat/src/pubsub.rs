//! Publish/subscribe bridge
//!
//! The underlying driver delivers subscription traffic through a pull-style
//! primitive: "give me the next message or nothing, within a bound". The
//! caller dialect expects push-style listener registration for `message`
//! (channel, payload) and `pmessage` (pattern, channel, payload) deliveries.
//! The bridge owns the adaptation: an explicit per-kind listener registry, a
//! polling loop that runs exactly while at least one listener is registered,
//! and subscription-union bookkeeping so the driver is only told about
//! changes.
//!
//! Channel and pattern subscriptions are independent registries: dropping a
//! channel while a pattern that matches it remains registered does not stop
//! delivery via the pattern path.
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
//! let subscriber = client.subscriber()?;
//! subscriber.subscribe(vec!["news".to_string()]).await?;
//! let _id = subscriber.on_message(|channel, payload| {
//!     println!("{channel}: {payload}");
//! });
//! # Ok(())
//! # }
//! ```

use crate::driver::Driver;
use crate::translate::results;
use redis_compat_core::{CompatResult, PushMessage};
use std::collections::BTreeSet;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing::{debug, warn};

/// Handle for removing a registered listener
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

type MessageCallback = Arc<dyn Fn(&str, &str) + Send + Sync>;
type PatternCallback = Arc<dyn Fn(&str, &str, &str) + Send + Sync>;

enum Listener {
    /// Exact-channel deliveries: (channel, payload)
    Message(MessageCallback),
    /// Pattern-matched deliveries: (pattern, channel, payload)
    PMessage(PatternCallback),
}

struct Registry {
    channels: BTreeSet<String>,
    patterns: BTreeSet<String>,
    listeners: Vec<(ListenerId, Listener)>,
    next_id: u64,
    polling: bool,
}

impl Registry {
    fn new() -> Self {
        Self {
            channels: BTreeSet::new(),
            patterns: BTreeSet::new(),
            listeners: Vec::new(),
            next_id: 0,
            polling: false,
        }
    }
}

/// The push-style subscription surface over a pull-style driver
pub struct Subscriber {
    shared: Arc<Shared>,
}

struct Shared {
    driver: Arc<dyn Driver>,
    registry: Mutex<Registry>,
    poll_timeout: Duration,
}

impl Subscriber {
    pub(crate) fn new(driver: Arc<dyn Driver>, poll_timeout: Duration) -> Self {
        Self {
            shared: Arc::new(Shared {
                driver,
                registry: Mutex::new(Registry::new()),
                poll_timeout,
            }),
        }
    }

    /// Subscribe to one or more exact channels.
    ///
    /// The driver is told the new union only when it actually changed.
    pub async fn subscribe(&self, channels: Vec<String>) -> CompatResult<()> {
        let union = {
            let mut registry = self.shared.registry.lock().expect("registry poisoned");
            let before = registry.channels.len();
            registry.channels.extend(channels);
            (registry.channels.len() != before).then(|| snapshot_union(&registry))
        };
        self.push_union(union).await
    }

    /// Unsubscribe from the given channels, or from every channel when
    /// `channels` is empty.
    pub async fn unsubscribe(&self, channels: Vec<String>) -> CompatResult<()> {
        let union = {
            let mut registry = self.shared.registry.lock().expect("registry poisoned");
            let before = registry.channels.len();
            if channels.is_empty() {
                registry.channels.clear();
            } else {
                for channel in &channels {
                    registry.channels.remove(channel);
                }
            }
            (registry.channels.len() != before).then(|| snapshot_union(&registry))
        };
        self.push_union(union).await
    }

    /// Subscribe to one or more glob-style patterns.
    pub async fn psubscribe(&self, patterns: Vec<String>) -> CompatResult<()> {
        let union = {
            let mut registry = self.shared.registry.lock().expect("registry poisoned");
            let before = registry.patterns.len();
            registry.patterns.extend(patterns);
            (registry.patterns.len() != before).then(|| snapshot_union(&registry))
        };
        self.push_union(union).await
    }

    /// Unsubscribe from the given patterns, or from every pattern when
    /// `patterns` is empty.
    pub async fn punsubscribe(&self, patterns: Vec<String>) -> CompatResult<()> {
        let union = {
            let mut registry = self.shared.registry.lock().expect("registry poisoned");
            let before = registry.patterns.len();
            if patterns.is_empty() {
                registry.patterns.clear();
            } else {
                for pattern in &patterns {
                    registry.patterns.remove(pattern);
                }
            }
            (registry.patterns.len() != before).then(|| snapshot_union(&registry))
        };
        self.push_union(union).await
    }

    /// Register a listener for exact-channel deliveries.
    ///
    /// Registering the first listener starts the polling loop.
    pub fn on_message(&self, callback: impl Fn(&str, &str) + Send + Sync + 'static) -> ListenerId {
        self.register(Listener::Message(Arc::new(callback)))
    }

    /// Register a listener for pattern-matched deliveries.
    pub fn on_pmessage(
        &self,
        callback: impl Fn(&str, &str, &str) + Send + Sync + 'static,
    ) -> ListenerId {
        self.register(Listener::PMessage(Arc::new(callback)))
    }

    /// Remove a listener.
    ///
    /// Removing the last listener stops the polling loop before its next
    /// poll; a message already in flight still delivers to whatever listeners
    /// exist at delivery time.
    pub fn remove_listener(&self, id: ListenerId) {
        let mut registry = self.shared.registry.lock().expect("registry poisoned");
        registry.listeners.retain(|(lid, _)| *lid != id);
        if registry.listeners.is_empty() {
            registry.polling = false;
        }
    }

    /// Channels currently subscribed
    #[must_use]
    pub fn subscribed_channels(&self) -> Vec<String> {
        let registry = self.shared.registry.lock().expect("registry poisoned");
        registry.channels.iter().cloned().collect()
    }

    /// Patterns currently subscribed
    #[must_use]
    pub fn subscribed_patterns(&self) -> Vec<String> {
        let registry = self.shared.registry.lock().expect("registry poisoned");
        registry.patterns.iter().cloned().collect()
    }

    fn register(&self, listener: Listener) -> ListenerId {
        let (id, start_loop) = {
            let mut registry = self.shared.registry.lock().expect("registry poisoned");
            let id = ListenerId(registry.next_id);
            registry.next_id += 1;
            registry.listeners.push((id, listener));
            let start = !registry.polling;
            registry.polling = true;
            (id, start)
        };

        if start_loop {
            let shared = Arc::clone(&self.shared);
            tokio::spawn(poll_loop(shared));
        }
        id
    }

    async fn push_union(&self, union: Option<(Vec<String>, Vec<String>)>) -> CompatResult<()> {
        if let Some((channels, patterns)) = union {
            debug!(
                channels = channels.len(),
                patterns = patterns.len(),
                "subscription union changed"
            );
            self.shared
                .driver
                .set_subscriptions(&channels, &patterns)
                .await
                .map_err(results::translate_error)?;
        }
        Ok(())
    }
}

fn snapshot_union(registry: &Registry) -> (Vec<String>, Vec<String>) {
    (
        registry.channels.iter().cloned().collect(),
        registry.patterns.iter().cloned().collect(),
    )
}

/// The bridge's polling loop: runs while at least one listener is
/// registered, dispatching each message to the listener set that exists at
/// delivery time.
async fn poll_loop(shared: Arc<Shared>) {
    loop {
        {
            let registry = shared.registry.lock().expect("registry poisoned");
            if !registry.polling {
                return;
            }
        }

        match shared.driver.poll_message(shared.poll_timeout).await {
            Ok(Some(message)) => dispatch(&shared, &message),
            Ok(None) => {
                // No message within the bound; loop around and poll again.
            }
            Err(e) => {
                warn!(error = %e, "subscription poll failed; stopping loop");
                let mut registry = shared.registry.lock().expect("registry poisoned");
                registry.polling = false;
                return;
            }
        }
    }
}

/// Deliver one message, preserving driver arrival order: the loop is the
/// only dispatcher, so deliveries are strictly sequential.
fn dispatch(shared: &Arc<Shared>, message: &PushMessage) {
    let listeners: Vec<(Option<PatternCallback>, Option<MessageCallback>)> = {
        let registry = shared.registry.lock().expect("registry poisoned");
        registry
            .listeners
            .iter()
            .filter_map(|(_, listener)| match (listener, &message.pattern) {
                (Listener::Message(cb), None) => Some((None, Some(Arc::clone(cb)))),
                (Listener::PMessage(cb), Some(_)) => Some((Some(Arc::clone(cb)), None)),
                _ => None,
            })
            .collect()
    };

    let payload = String::from_utf8_lossy(&message.payload);
    for (pattern_cb, message_cb) in listeners {
        if let Some(cb) = message_cb {
            cb(&message.channel, &payload);
        }
        if let (Some(cb), Some(pattern)) = (pattern_cb, &message.pattern) {
            cb(pattern, &message.channel, &payload);
        }
    }
}
