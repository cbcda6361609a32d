//! Integration tests for multi-key routing across shards

use redis_compat::{Client, Driver, MemoryDriver, ShardId};
use redis_compat_core::ClientConfig;
use std::sync::Arc;

fn sharded_client(shards: u16) -> (Client, Arc<MemoryDriver>) {
    let driver = Arc::new(MemoryDriver::sharded(shards));
    let client = Client::new(Arc::clone(&driver) as Arc<dyn redis_compat::Driver>, ClientConfig::default());
    (client, driver)
}

/// Pick one key per shard so the batch is guaranteed to span the deployment.
fn spread_keys(driver: &MemoryDriver, want: usize) -> Vec<String> {
    let mut seen = std::collections::BTreeSet::new();
    let mut keys = Vec::new();
    for i in 0..512 {
        let key = format!("key-{i}");
        let shard = driver.shard_for_key(key.as_bytes());
        if seen.insert(shard) {
            keys.push(key);
            if keys.len() == want {
                break;
            }
        }
    }
    assert_eq!(keys.len(), want, "not enough distinct shards reachable");
    keys
}

#[tokio::test]
async fn cross_shard_mget_recombines_at_original_positions() {
    let (client, driver) = sharded_client(4);

    let keys = spread_keys(&driver, 4);
    for (i, key) in keys.iter().enumerate() {
        client.set(key.clone(), format!("v{i}")).await.unwrap();
    }

    let values = client.mget(keys.clone()).await.unwrap();
    assert_eq!(values, vec!["v0", "v1", "v2", "v3"]);

    // The driver really was asked per shard, not once.
    let mget_calls: Vec<_> = driver
        .recorded_calls()
        .into_iter()
        .filter(|call| call.command == "MGET")
        .collect();
    assert!(mget_calls.len() > 1, "expected a decomposed MGET");
    assert!(mget_calls.iter().all(|call| call.shard.is_some()));
}

#[tokio::test]
async fn mget_preserves_absent_key_positions_across_shards() {
    let (client, _driver) = sharded_client(4);

    client.set("alpha", "present").await.unwrap();
    let values = client
        .mget(vec!["alpha".to_string(), "missing-one".to_string(), "missing-two".to_string()])
        .await
        .unwrap();
    assert_eq!(values, vec!["present", "", ""]);
}

#[tokio::test]
async fn hash_tagged_keys_take_the_fast_path() {
    let (client, driver) = sharded_client(4);

    let keys = vec!["{user1}.following".to_string(), "{user1}.followers".to_string()];
    for key in &keys {
        client.set(key.clone(), "x").await.unwrap();
    }
    client.mget(keys).await.unwrap();

    let mget_calls: Vec<_> = driver
        .recorded_calls()
        .into_iter()
        .filter(|call| call.command == "MGET")
        .collect();
    assert_eq!(mget_calls.len(), 1, "same-slot keys must not decompose");
}

#[tokio::test]
async fn cross_shard_del_sums_counts() {
    let (client, driver) = sharded_client(4);

    let keys = spread_keys(&driver, 4);
    for key in &keys {
        client.set(key.clone(), "x").await.unwrap();
    }

    let removed = client.del(keys.clone()).await.unwrap();
    assert_eq!(removed, 4);
    assert_eq!(client.exists(keys).await.unwrap(), 0);
}

#[tokio::test]
async fn cross_shard_mset_requires_every_shard_to_ack() {
    let (client, driver) = sharded_client(4);

    let keys = spread_keys(&driver, 2);
    let pairs = vec![
        redis_compat::CallerValue::from(keys[0].clone()),
        redis_compat::CallerValue::from("1"),
        redis_compat::CallerValue::from(keys[1].clone()),
        redis_compat::CallerValue::from("2"),
    ];
    assert!(client.mset(pairs).await.unwrap());
    assert_eq!(client.get(keys[0].clone()).await.unwrap().as_deref(), Some("1"));
    assert_eq!(client.get(keys[1].clone()).await.unwrap().as_deref(), Some("2"));
}

#[tokio::test]
async fn flushall_reaches_every_shard() {
    let (client, driver) = sharded_client(4);

    let keys = spread_keys(&driver, 4);
    for key in keys.clone() {
        client.set(key, "x").await.unwrap();
    }
    assert!(client.flushall().await.unwrap());
    assert_eq!(client.exists(keys).await.unwrap(), 0);

    let flush_calls: Vec<_> = driver
        .recorded_calls()
        .into_iter()
        .filter(|call| call.command == "FLUSHALL")
        .collect();
    assert_eq!(flush_calls.len(), 4);
}

#[tokio::test]
async fn flushall_is_a_hard_failure_when_one_shard_fails() {
    let (client, driver) = sharded_client(4);
    driver.fail_shard(Some(ShardId(2)));

    assert!(client.flushall().await.is_err());
}

#[tokio::test]
async fn unsharded_deployments_skip_decomposition() {
    let driver = Arc::new(MemoryDriver::new());
    let client = Client::new(Arc::clone(&driver) as Arc<dyn redis_compat::Driver>, ClientConfig::default());

    client.set("a", "1").await.unwrap();
    client.set("b", "2").await.unwrap();
    let values = client.mget(vec!["a".to_string(), "b".to_string()]).await.unwrap();
    assert_eq!(values, vec!["1", "2"]);

    let mget_calls: Vec<_> = driver
        .recorded_calls()
        .into_iter()
        .filter(|call| call.command == "MGET")
        .collect();
    assert_eq!(mget_calls.len(), 1);
    assert!(mget_calls[0].shard.is_none());
}
