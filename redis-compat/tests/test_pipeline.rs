//! Integration tests for pipeline batching semantics

use redis_compat::{CallerReply, Client, MemoryDriver};
use redis_compat_core::ClientConfig;
use std::sync::Arc;

fn test_client() -> (Client, Arc<MemoryDriver>) {
    let driver = Arc::new(MemoryDriver::new());
    let client = Client::new(Arc::clone(&driver) as Arc<dyn redis_compat::Driver>, ClientConfig::default());
    (client, driver)
}

#[tokio::test]
async fn empty_pipeline_resolves_to_empty_vec() {
    let (client, _driver) = test_client();

    let mut pipeline = client.pipeline();
    let entries = pipeline.exec().await.expect("empty exec must not fail");
    assert!(entries.is_empty());

    // And again: exec on a drained pipeline stays empty, stays Ok.
    let entries = pipeline.exec().await.unwrap();
    assert!(entries.is_empty());
}

#[tokio::test]
async fn results_come_back_in_queue_order() {
    let (client, _driver) = test_client();

    let mut pipeline = client.pipeline();
    pipeline
        .set("k1", "first")
        .set("k2", "second")
        .get("k1")
        .get("k2");

    let entries = pipeline.exec().await.unwrap();
    assert_eq!(entries.len(), 4);
    assert_eq!(entries[0], Ok(CallerReply::Str("OK".into())));
    assert_eq!(entries[1], Ok(CallerReply::Str("OK".into())));
    assert_eq!(entries[2], Ok(CallerReply::Str("first".into())));
    assert_eq!(entries[3], Ok(CallerReply::Str("second".into())));
}

#[tokio::test]
async fn one_failing_command_does_not_abort_the_batch() {
    let (client, _driver) = test_client();

    // A key holding text so the INCR in the middle is rejected.
    client.set("text", "abc").await.unwrap();

    let mut pipeline = client.pipeline();
    pipeline
        .set("a", 1)
        .set("b", 2)
        .incr("text")
        .get("b");

    let entries = pipeline.exec().await.unwrap();
    assert_eq!(entries.len(), 4);
    assert!(entries[0].is_ok());
    assert!(entries[1].is_ok());
    assert!(entries[2].is_err());
    assert_eq!(entries[3], Ok(CallerReply::Str("2".into())));
}

#[tokio::test]
async fn translation_failure_occupies_its_slot() {
    let (client, _driver) = test_client();

    let mut pipeline = client.pipeline();
    pipeline
        .set("before", "x")
        // Odd score/member list: no defined pairing, rejected at queue time.
        .zadd("zs", vec![redis_compat::CallerValue::from(1.5)])
        .get("before");

    let entries = pipeline.exec().await.unwrap();
    assert_eq!(entries.len(), 3);
    assert!(entries[0].is_ok());
    assert!(matches!(
        entries[1],
        Err(redis_compat::CompatError::Translate(_))
    ));
    assert_eq!(entries[2], Ok(CallerReply::Str("x".into())));
}

#[tokio::test]
async fn counters_accumulate_through_one_batch() {
    let (client, _driver) = test_client();

    let mut pipeline = client.pipeline();
    pipeline
        .set("counter", 10)
        .incr("counter")
        .incr_by("counter", 5)
        .decr("counter")
        .get("counter");

    let entries = pipeline.exec().await.unwrap();
    assert_eq!(entries[1], Ok(CallerReply::Int(11)));
    assert_eq!(entries[2], Ok(CallerReply::Int(16)));
    assert_eq!(entries[3], Ok(CallerReply::Int(15)));
    assert_eq!(entries[4], Ok(CallerReply::Str("15".into())));
}

#[tokio::test]
async fn queued_commands_are_consumed_by_exec() {
    let (client, _driver) = test_client();

    let mut pipeline = client.pipeline();
    pipeline.set("k", "v").get("k");
    assert_eq!(pipeline.len(), 2);

    pipeline.exec().await.unwrap();
    assert!(pipeline.is_empty());
}

#[tokio::test]
async fn clear_drops_queued_commands() {
    let (client, _driver) = test_client();

    let mut pipeline = client.pipeline();
    pipeline.set("k", "v").get("k");
    pipeline.clear();
    assert!(pipeline.is_empty());

    let entries = pipeline.exec().await.unwrap();
    assert!(entries.is_empty());
}
