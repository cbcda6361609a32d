//! Basic command usage over the in-memory driver.
//!
//! Swap `MemoryDriver` for a real driver implementation to talk to an actual
//! deployment; the caller-facing surface is identical.

use redis_compat::{CallerValue, Client, MemoryDriver};
use redis_compat_core::ClientConfig;
use std::sync::Arc;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let client = Client::new(Arc::new(MemoryDriver::new()), ClientConfig::default());

    client.set("greeting", "hello").await?;
    println!("greeting = {:?}", client.get("greeting").await?);

    // The lock pattern: set-if-absent, falsy on the second claim.
    println!("first claim:  {}", client.set_nx("lock:job", "worker-1").await?);
    println!("second claim: {}", client.set_nx("lock:job", "worker-2").await?);

    // Scores go in as numbers, strings, or infinity tokens and come back as
    // full-precision decimal strings.
    client
        .zadd(
            "board",
            vec![
                CallerValue::from(1.5),
                CallerValue::from("alice"),
                CallerValue::from("2"),
                CallerValue::from("bob"),
            ],
        )
        .await?;
    println!("alice's score = {:?}", client.zscore("board", "alice").await?);
    println!("board = {:?}", client.zrange_with_scores("board", 0, -1).await?);

    Ok(())
}
