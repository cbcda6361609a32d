//! Integration tests for script execution

use redis_compat::{CallerReply, CallerValue, Client, MemoryDriver, Script};
use redis_compat_core::ClientConfig;
use std::sync::Arc;

fn test_client() -> (Client, Arc<MemoryDriver>) {
    let driver = Arc::new(MemoryDriver::new());
    let client = Client::new(Arc::clone(&driver) as Arc<dyn redis_compat::Driver>, ClientConfig::default());
    (client, driver)
}

#[tokio::test]
async fn eval_flattens_keys_then_arguments() {
    let (client, _driver) = test_client();

    let reply = client
        .eval(
            "return {KEYS[1], KEYS[2], ARGV[1]}",
            vec!["k1".to_string(), "k2".to_string()],
            vec![CallerValue::from("a1")],
        )
        .await
        .unwrap();
    assert_eq!(
        reply,
        CallerReply::Array(vec![
            CallerReply::Str("k1".into()),
            CallerReply::Str("k2".into()),
            CallerReply::Str("a1".into()),
        ])
    );
}

#[tokio::test]
async fn eval_returns_scalars_unchanged() {
    let (client, _driver) = test_client();

    let reply = client.eval("return 42", vec![], vec![]).await.unwrap();
    assert_eq!(reply, CallerReply::Int(42));
}

#[tokio::test]
async fn evalsha_of_unknown_script_reports_noscript() {
    let (client, _driver) = test_client();

    let err = client
        .evalsha("0000000000000000000000000000000000000000", vec![], vec![])
        .await
        .unwrap_err();
    assert!(err.has_driver_kind("NOSCRIPT"));
}

#[tokio::test]
async fn script_helper_falls_back_once_then_uses_the_cache() {
    let (client, driver) = test_client();

    let script = Script::new("return 7");
    // First run: cache miss, falls back to the full source.
    assert_eq!(
        script.execute(&client, vec![], vec![]).await.unwrap(),
        CallerReply::Int(7)
    );
    // Second run: the hash is known now.
    assert_eq!(
        script.execute(&client, vec![], vec![]).await.unwrap(),
        CallerReply::Int(7)
    );

    let script_calls: Vec<String> = driver
        .recorded_calls()
        .into_iter()
        .map(|call| call.command)
        .filter(|command| command == "EVAL" || command == "EVALSHA")
        .collect();
    assert_eq!(script_calls, vec!["EVALSHA", "EVAL", "EVALSHA"]);
}

#[tokio::test]
async fn script_cache_admin_round_trip() {
    let (client, _driver) = test_client();

    let sha = client.script_load("return 1").await.unwrap();
    assert_eq!(sha.len(), 40);

    let known = client
        .script_exists(vec![sha.clone(), "feedfacefeedfacefeedfacefeedfacefeedface".to_string()])
        .await
        .unwrap();
    assert_eq!(known, vec![true, false]);

    client.script_flush().await.unwrap();
    let known = client.script_exists(vec![sha]).await.unwrap();
    assert_eq!(known, vec![false]);
}

#[tokio::test]
async fn loaded_scripts_run_by_hash() {
    let (client, _driver) = test_client();

    let sha = client.script_load("return KEYS[1]").await.unwrap();
    let reply = client
        .evalsha(&sha, vec!["mykey".to_string()], vec![])
        .await
        .unwrap();
    assert_eq!(reply, CallerReply::Str("mykey".into()));
}
