//! Pipeline and transaction batching.

use redis_compat::{Client, MemoryDriver};
use redis_compat_core::ClientConfig;
use std::sync::Arc;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let driver = Arc::new(MemoryDriver::new());
    let client = Client::new(Arc::clone(&driver) as Arc<dyn redis_compat::Driver>, ClientConfig::default());

    // Pipeline: one round-trip, one entry per command, failures isolated.
    client.set("text", "not-a-number").await?;
    let mut pipeline = client.pipeline();
    pipeline.set("a", 1).incr("text").get("a");
    for (i, entry) in pipeline.exec().await?.iter().enumerate() {
        match entry {
            Ok(reply) => println!("[{i}] ok: {reply:?}"),
            Err(e) => println!("[{i}] failed: {e}"),
        }
    }

    // Transaction: watch a key, exec resolves to None if it changed.
    let mut tx = client.multi();
    tx.watch(vec!["balance".to_string()]).await?;
    tx.set("balance", 100).incr_by("balance", -25);

    // Simulate another party racing us.
    driver.external_write("balance", "contested");

    match tx.exec().await? {
        Some(entries) => println!("committed {} commands", entries.len()),
        None => println!("aborted: watched key changed"),
    }

    Ok(())
}
