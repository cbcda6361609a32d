//! Integration tests for the caller-dialect command surface

use redis_compat::{CallerValue, Client, CompatError, MemoryDriver};
use redis_compat_core::{Capabilities, ClientConfig};
use std::sync::Arc;
use std::time::{Duration, Instant};

fn test_client() -> (Client, Arc<MemoryDriver>) {
    let driver = Arc::new(MemoryDriver::new());
    let client = Client::new(Arc::clone(&driver) as Arc<dyn redis_compat::Driver>, ClientConfig::default());
    (client, driver)
}

#[tokio::test]
async fn conditional_set_implements_the_lock_pattern() {
    let (client, _driver) = test_client();

    // First claim succeeds.
    assert!(client.set_nx("lock:x", "v1").await.unwrap());
    // Second claim returns the "not set" sentinel.
    assert!(!client.set_nx("lock:x", "v2").await.unwrap());
    // And nothing was overwritten.
    assert_eq!(client.get("lock:x").await.unwrap().as_deref(), Some("v1"));
}

#[tokio::test]
async fn blocking_pop_times_out_to_none() {
    let (client, _driver) = test_client();

    let started = Instant::now();
    let outcome = client.blpop(vec!["empty-queue".to_string()], 0.2).await.unwrap();
    let elapsed = started.elapsed();

    assert_eq!(outcome, None);
    assert!(elapsed >= Duration::from_millis(150), "returned too early");
    assert!(elapsed < Duration::from_secs(2), "hung past the bound");
}

#[tokio::test]
async fn blocking_zpop_returns_the_score_as_string() {
    let (client, _driver) = test_client();

    client
        .zadd("tasks", vec![CallerValue::from(1.5), CallerValue::from("job-a")])
        .await
        .unwrap();

    let hit = client.bzpopmin(vec!["tasks".to_string()], 0.5).await.unwrap();
    assert_eq!(
        hit,
        Some(("tasks".to_string(), "job-a".to_string(), "1.5".to_string()))
    );
}

#[tokio::test]
async fn scores_round_trip_with_full_precision() {
    let (client, _driver) = test_client();

    client
        .zadd(
            "zs",
            vec![
                CallerValue::from("1.5"),
                CallerValue::from("a"),
                CallerValue::from(2i64),
                CallerValue::from("b"),
                CallerValue::from("+inf"),
                CallerValue::from("top"),
            ],
        )
        .await
        .unwrap();

    assert_eq!(client.zscore("zs", "a").await.unwrap().as_deref(), Some("1.5"));
    assert_eq!(client.zscore("zs", "b").await.unwrap().as_deref(), Some("2"));
    assert_eq!(
        client.zscore("zs", "top").await.unwrap().as_deref(),
        Some("Infinity")
    );
    assert_eq!(client.zscore("zs", "absent").await.unwrap(), None);

    let flat = client.zrange_with_scores("zs", 0, -1).await.unwrap();
    assert_eq!(flat, vec!["a", "1.5", "b", "2", "top", "Infinity"]);
}

#[tokio::test]
async fn score_range_respects_exclusive_bounds_and_limit() {
    let (client, _driver) = test_client();

    client
        .zadd(
            "zs",
            vec![
                CallerValue::from(1i64),
                CallerValue::from("one"),
                CallerValue::from(2i64),
                CallerValue::from("two"),
                CallerValue::from(3i64),
                CallerValue::from("three"),
            ],
        )
        .await
        .unwrap();

    // Exclusive lower bound drops "one".
    let members = client.zrangebyscore("zs", "(1", "+inf").await.unwrap();
    assert_eq!(members, vec!["two", "three"]);

    // A trailing LIMIT clause narrows the window further.
    let cmd = redis_compat::commands::ZRangeByScoreCommand::new("zs", "-inf", "+inf").limit(1, 1);
    assert_eq!(client.execute(cmd).await.unwrap(), vec!["two"]);
}

#[tokio::test]
async fn mget_marks_absent_keys_positionally() {
    let (client, _driver) = test_client();

    client.set("a", "1").await.unwrap();
    client.set("c", "3").await.unwrap();

    let values = client
        .mget(vec!["a".to_string(), "b".to_string(), "c".to_string()])
        .await
        .unwrap();
    assert_eq!(values, vec!["1", "", "3"]);
}

#[tokio::test]
async fn hashes_accept_map_form_and_flatten_on_read() {
    let (client, _driver) = test_client();

    client
        .hset(
            "user:1",
            vec![CallerValue::Map(vec![
                ("name".to_string(), CallerValue::from("alice")),
                ("age".to_string(), CallerValue::from(30i64)),
            ])],
        )
        .await
        .unwrap();

    let flat = client.hgetall("user:1").await.unwrap();
    assert_eq!(flat, vec!["name", "alice", "age", "30"]);

    let partial = client
        .hmget("user:1", vec!["age".to_string(), "missing".to_string()])
        .await
        .unwrap();
    assert_eq!(partial, vec!["30", ""]);
}

#[tokio::test]
async fn lists_preserve_push_order() {
    let (client, _driver) = test_client();

    client
        .rpush(
            "list",
            vec![
                CallerValue::from("a"),
                CallerValue::from("b"),
                CallerValue::from("c"),
            ],
        )
        .await
        .unwrap();
    client.lpush("list", vec![CallerValue::from("front")]).await.unwrap();

    assert_eq!(client.llen("list").await.unwrap(), 4);
    assert_eq!(
        client.lrange("list", 0, -1).await.unwrap(),
        vec!["front", "a", "b", "c"]
    );
    assert_eq!(client.lpop("list").await.unwrap().as_deref(), Some("front"));
    assert_eq!(client.rpop("list").await.unwrap().as_deref(), Some("c"));
}

#[tokio::test]
async fn wrong_type_errors_keep_their_driver_kind() {
    let (client, _driver) = test_client();

    client.rpush("list", vec![CallerValue::from("x")]).await.unwrap();
    let err = client.get("list").await.unwrap_err();
    assert!(err.has_driver_kind("WRONGTYPE"));
}

#[tokio::test]
async fn blocking_ops_respect_the_capability_flag() {
    let driver = Arc::new(MemoryDriver::new());
    let config = ClientConfig::default().with_capabilities(Capabilities::subscriber_only());
    let client = Client::new(driver, config);

    let err = client.blpop(vec!["q".to_string()], 0.1).await.unwrap_err();
    assert!(matches!(err, CompatError::Config(_)));
}

#[tokio::test]
async fn streams_flatten_field_records() {
    let (client, _driver) = test_client();

    let id = client
        .xadd(
            "events",
            "*",
            vec![CallerValue::Map(vec![
                ("user".to_string(), CallerValue::from("alice")),
                ("action".to_string(), CallerValue::from("login")),
            ])],
        )
        .await
        .unwrap();
    assert!(!id.is_empty());

    assert_eq!(client.xlen("events").await.unwrap(), 1);
    let records = client.xrange("events", "-", "+").await.unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].0, id);
    assert_eq!(records[0].1, vec!["user", "alice", "action", "login"]);
}

#[tokio::test]
async fn sets_count_and_test_membership() {
    let (client, _driver) = test_client();

    let added = client
        .sadd(
            "s",
            vec![
                CallerValue::from("a"),
                CallerValue::from("b"),
                CallerValue::from("a"),
            ],
        )
        .await
        .unwrap();
    assert_eq!(added, 2);
    assert!(client.sismember("s", "a").await.unwrap());
    assert!(!client.sismember("s", "z").await.unwrap());
    assert_eq!(client.scard("s").await.unwrap(), 2);

    assert_eq!(client.srem("s", vec![CallerValue::from("a")]).await.unwrap(), 1);
    assert_eq!(client.smembers("s").await.unwrap(), vec!["b"]);
}

#[tokio::test]
async fn expiry_is_reported_through_ttl() {
    let (client, _driver) = test_client();

    client.set("k", "v").await.unwrap();
    assert_eq!(client.ttl("k").await.unwrap(), -1);
    assert!(client.expire("k", 100).await.unwrap());
    let ttl = client.ttl("k").await.unwrap();
    assert!((1..=100).contains(&ttl));
    assert_eq!(client.ttl("absent").await.unwrap(), -2);
}

#[tokio::test]
async fn raw_commands_surface_the_caller_reply() {
    let (client, _driver) = test_client();

    client.set("k", "v").await.unwrap();
    let reply = client
        .command("GET", vec![CallerValue::from("k")])
        .await
        .unwrap();
    assert_eq!(reply.as_str(), Some("v"));
}
