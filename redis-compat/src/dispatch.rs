//! Command dispatch
//!
//! One logical invocation moves through: parameter translation (done by the
//! command builder), exactly one driver call, result translation or error
//! mapping. Failures complete the invocation; retries are the caller's
//! responsibility, since the dispatcher knows nothing about the idempotency
//! of arbitrary commands.
//!
//! Construction is non-blocking: the dispatcher returns synchronously while a
//! background task settles the driver's connection work, and every dispatch
//! awaits that readiness gate before its first driver call.

use crate::driver::Driver;
use crate::translate::results;
use redis_compat_core::{
    CompatError, CompatResult, DriverError, DriverReply, DriverRequest,
};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing::warn;

#[derive(Debug, Clone, PartialEq, Eq)]
enum ReadyState {
    Pending,
    Ready,
    Failed(String),
}

/// Executes translated requests against the driver behind a readiness gate
pub struct Dispatcher {
    driver: Arc<dyn Driver>,
    ready: watch::Receiver<ReadyState>,
    ready_timeout: Duration,
}

impl Dispatcher {
    /// Create a dispatcher and start the background connection task.
    ///
    /// Returns synchronously; the first dispatched command awaits the
    /// driver's `ensure_connected` outcome.
    pub fn new(driver: Arc<dyn Driver>, ready_timeout: Duration) -> Self {
        let (tx, ready) = watch::channel(ReadyState::Pending);

        let connect_driver = Arc::clone(&driver);
        tokio::spawn(async move {
            let state = match connect_driver.ensure_connected().await {
                Ok(()) => ReadyState::Ready,
                Err(e) => {
                    warn!(error = %e, "driver connection task failed");
                    ReadyState::Failed(e.to_string())
                }
            };
            let _ = tx.send(state);
        });

        Self {
            driver,
            ready,
            ready_timeout,
        }
    }

    /// The driver behind this dispatcher
    #[must_use]
    pub fn driver(&self) -> Arc<dyn Driver> {
        Arc::clone(&self.driver)
    }

    /// Suspend until the background connection task has settled.
    pub async fn wait_ready(&self) -> CompatResult<()> {
        let mut ready = self.ready.clone();
        let settled = tokio::time::timeout(self.ready_timeout, async {
            loop {
                match &*ready.borrow() {
                    ReadyState::Ready => return Ok(()),
                    ReadyState::Failed(msg) => {
                        return Err(CompatError::Driver(DriverError::ConnectionLost(msg.clone())))
                    }
                    ReadyState::Pending => {}
                }
                if ready.changed().await.is_err() {
                    return Err(CompatError::Driver(DriverError::ConnectionLost(
                        "connection task dropped".to_string(),
                    )));
                }
            }
        })
        .await;

        match settled {
            Ok(outcome) => outcome,
            Err(_) => Err(CompatError::Config(
                "timed out waiting for driver readiness".to_string(),
            )),
        }
    }

    /// Execute one translated request.
    pub async fn execute(&self, request: DriverRequest) -> CompatResult<DriverReply> {
        self.wait_ready().await?;
        self.driver
            .run(request)
            .await
            .map_err(results::translate_error)
    }

    /// Execute a whole batch in one suspension, without atomicity.
    pub async fn execute_batch(
        &self,
        requests: Vec<DriverRequest>,
    ) -> CompatResult<Vec<Result<DriverReply, DriverError>>> {
        self.wait_ready().await?;
        self.driver
            .run_batch(requests)
            .await
            .map_err(results::translate_error)
    }

    /// Execute a whole batch under optimistic-lock isolation; `None` means
    /// the watch set was dirty and nothing ran.
    pub async fn execute_transaction(
        &self,
        requests: Vec<DriverRequest>,
    ) -> CompatResult<Option<Vec<Result<DriverReply, DriverError>>>> {
        self.wait_ready().await?;
        self.driver
            .run_transaction(requests)
            .await
            .map_err(results::translate_error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use redis_compat_core::{PushMessage, ShardId};
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingDriver {
        calls: AtomicUsize,
        connect_error: Option<String>,
    }

    #[async_trait]
    impl Driver for CountingDriver {
        async fn run(&self, _request: DriverRequest) -> Result<DriverReply, DriverError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(DriverReply::Ok)
        }

        async fn run_batch(
            &self,
            requests: Vec<DriverRequest>,
        ) -> Result<Vec<Result<DriverReply, DriverError>>, DriverError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(requests.into_iter().map(|_| Ok(DriverReply::Ok)).collect())
        }

        async fn run_transaction(
            &self,
            requests: Vec<DriverRequest>,
        ) -> Result<Option<Vec<Result<DriverReply, DriverError>>>, DriverError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(Some(
                requests.into_iter().map(|_| Ok(DriverReply::Ok)).collect(),
            ))
        }

        async fn watch(&self, _keys: Vec<String>) -> Result<(), DriverError> {
            Ok(())
        }

        async fn unwatch(&self) -> Result<(), DriverError> {
            Ok(())
        }

        async fn set_subscriptions(
            &self,
            _channels: &[String],
            _patterns: &[String],
        ) -> Result<(), DriverError> {
            Ok(())
        }

        async fn poll_message(
            &self,
            _timeout: Duration,
        ) -> Result<Option<PushMessage>, DriverError> {
            Ok(None)
        }

        fn shard_for_key(&self, _key: &[u8]) -> Option<ShardId> {
            None
        }

        fn shard_ids(&self) -> Vec<ShardId> {
            Vec::new()
        }

        async fn run_on_shard(
            &self,
            _shard: ShardId,
            _request: DriverRequest,
        ) -> Result<DriverReply, DriverError> {
            Ok(DriverReply::Ok)
        }

        async fn ensure_connected(&self) -> Result<(), DriverError> {
            match &self.connect_error {
                Some(msg) => Err(DriverError::ConnectionLost(msg.clone())),
                None => Ok(()),
            }
        }
    }

    #[tokio::test]
    async fn one_driver_call_per_invocation() {
        let driver = Arc::new(CountingDriver {
            calls: AtomicUsize::new(0),
            connect_error: None,
        });
        let dispatcher = Dispatcher::new(Arc::clone(&driver) as Arc<dyn Driver>, Duration::from_secs(1));

        dispatcher.execute(DriverRequest::new("PING")).await.unwrap();
        assert_eq!(driver.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn batch_suspends_once() {
        let driver = Arc::new(CountingDriver {
            calls: AtomicUsize::new(0),
            connect_error: None,
        });
        let dispatcher = Dispatcher::new(Arc::clone(&driver) as Arc<dyn Driver>, Duration::from_secs(1));

        let requests = vec![DriverRequest::new("PING"), DriverRequest::new("PING")];
        let entries = dispatcher.execute_batch(requests).await.unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(driver.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn failed_connection_surfaces_on_dispatch() {
        let driver = Arc::new(CountingDriver {
            calls: AtomicUsize::new(0),
            connect_error: Some("refused".to_string()),
        });
        let dispatcher = Dispatcher::new(Arc::clone(&driver) as Arc<dyn Driver>, Duration::from_secs(1));

        let err = dispatcher
            .execute(DriverRequest::new("PING"))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            CompatError::Driver(DriverError::ConnectionLost(_))
        ));
        assert_eq!(driver.calls.load(Ordering::SeqCst), 0);
    }
}
