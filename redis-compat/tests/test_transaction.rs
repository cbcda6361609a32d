//! Integration tests for optimistic-lock transaction semantics

use redis_compat::{CallerReply, Client, CompatError, MemoryDriver};
use redis_compat_core::ClientConfig;
use std::sync::Arc;

fn test_client() -> (Client, Arc<MemoryDriver>) {
    let driver = Arc::new(MemoryDriver::new());
    let client = Client::new(Arc::clone(&driver) as Arc<dyn redis_compat::Driver>, ClientConfig::default());
    (client, driver)
}

#[tokio::test]
async fn clean_watch_set_commits_in_order() {
    let (client, _driver) = test_client();

    let mut tx = client.multi();
    tx.watch(vec!["balance".to_string()]).await.unwrap();
    tx.set("balance", 100).incr_by("balance", -30).get("balance");

    let entries = tx.exec().await.unwrap().expect("clean watch must commit");
    assert_eq!(entries.len(), 3);
    assert_eq!(entries[1], Ok(CallerReply::Int(70)));
    assert_eq!(entries[2], Ok(CallerReply::Str("70".into())));

    assert_eq!(client.get("balance").await.unwrap().as_deref(), Some("70"));
}

#[tokio::test]
async fn dirty_watch_set_aborts_with_none() {
    let (client, driver) = test_client();
    client.set("balance", 100).await.unwrap();

    let mut tx = client.multi();
    tx.watch(vec!["balance".to_string()]).await.unwrap();
    tx.incr_by("balance", -30);

    // Another party touches the watched key before exec.
    driver.external_write("balance", "999");

    assert_eq!(tx.exec().await.unwrap(), None);
    // Nothing ran: the external value survived.
    assert_eq!(client.get("balance").await.unwrap().as_deref(), Some("999"));
}

#[tokio::test]
async fn abort_applies_even_with_zero_queued_commands() {
    let (client, driver) = test_client();

    let mut tx = client.multi();
    tx.watch(vec!["k".to_string()]).await.unwrap();
    driver.external_write("k", "changed");

    assert_eq!(tx.exec().await.unwrap(), None);
}

#[tokio::test]
async fn empty_transaction_without_watch_commits_empty() {
    let (client, _driver) = test_client();

    let mut tx = client.multi();
    let entries = tx.exec().await.unwrap().expect("no watch, no abort");
    assert!(entries.is_empty());
}

#[tokio::test]
async fn watch_set_is_consumed_by_exec() {
    let (client, driver) = test_client();

    let mut tx = client.multi();
    tx.watch(vec!["k".to_string()]).await.unwrap();
    driver.external_write("k", "v1");
    assert_eq!(tx.exec().await.unwrap(), None);

    // The same instance can run again; the old watch is gone, so a further
    // external write no longer aborts anything.
    driver.external_write("k", "v2");
    let mut tx2 = client.multi();
    tx2.set("other", 1);
    assert!(tx2.exec().await.unwrap().is_some());
}

#[tokio::test]
async fn discard_clears_queue_and_watch() {
    let (client, driver) = test_client();

    let mut tx = client.multi();
    tx.watch(vec!["k".to_string()]).await.unwrap();
    tx.set("a", 1).set("b", 2);
    tx.discard().await.unwrap();
    assert!(tx.is_empty());

    // Watch was released on discard: a dirty key no longer aborts.
    driver.external_write("k", "changed");
    tx.set("c", 3);
    let entries = tx.exec().await.unwrap().expect("discarded watch is gone");
    assert_eq!(entries.len(), 1);
    assert_eq!(client.get("a").await.unwrap(), None);
    assert_eq!(client.get("c").await.unwrap().as_deref(), Some("3"));
}

#[tokio::test]
async fn watch_after_queuing_is_rejected() {
    let (client, _driver) = test_client();

    let mut tx = client.multi();
    tx.set("a", 1);
    let err = tx.watch(vec!["a".to_string()]).await.unwrap_err();
    assert!(matches!(err, CompatError::Config(_)));
}

#[tokio::test]
async fn command_failures_surface_per_entry_not_as_abort() {
    let (client, _driver) = test_client();
    client.set("text", "abc").await.unwrap();

    let mut tx = client.multi();
    tx.set("a", 1).incr("text").get("a");

    let entries = tx
        .exec()
        .await
        .unwrap()
        .expect("execution reports per-command outcomes, not an abort");
    assert_eq!(entries.len(), 3);
    assert!(entries[0].is_ok());
    assert!(entries[1].is_err());
    assert_eq!(entries[2], Ok(CallerReply::Str("1".into())));
}
