//! Script execution support
//!
//! Script invocations follow the caller dialect's flattened convention: a
//! script body (or its SHA1), a key count, then keys and arguments in one
//! flat sequence. Results reflect whatever structure the script returns
//! (scalar, nested array, or error), translated through the result layer.
//!
//! # Examples
//!
//! ```no_run
//! use redis_compat::{Client, MemoryDriver, Script};
//! use redis_compat_core::ClientConfig;
//! use std::sync::Arc;
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let client = Client::new(Arc::new(MemoryDriver::new()), ClientConfig::default());
//!
//! let script = Script::new("return KEYS[1]");
//! let reply = script.execute(&client, vec!["mykey".to_string()], vec![]).await?;
//! println!("{reply:?}");
//! # Ok(())
//! # }
//! ```

use crate::client::Client;
use crate::translate::params;
use redis_compat_core::{CallerReply, CallerValue, CompatResult, DriverRequest};
use sha1::{Digest, Sha1};

/// A script with its precomputed SHA1, reusable across executions
#[derive(Debug, Clone)]
pub struct Script {
    source: String,
    sha: String,
}

impl Script {
    /// Create a script from source, hashing it for cached execution
    pub fn new(source: impl Into<String>) -> Self {
        let source = source.into();
        let sha = calculate_sha1(&source);
        Self { source, sha }
    }

    /// The script source
    #[must_use]
    pub fn source(&self) -> &str {
        &self.source
    }

    /// The script's SHA1 hash, lowercase hex
    #[must_use]
    pub fn sha(&self) -> &str {
        &self.sha
    }

    /// Execute via the cached hash, falling back to sending the full source
    /// when the driver does not know the script yet.
    pub async fn execute(
        &self,
        client: &Client,
        keys: Vec<String>,
        args: Vec<CallerValue>,
    ) -> CompatResult<CallerReply> {
        match client.evalsha(&self.sha, keys.clone(), args.clone()).await {
            Err(e) if e.has_driver_kind("NOSCRIPT") => {
                client.eval(&self.source, keys, args).await
            }
            other => other,
        }
    }
}

/// Build the flattened script request: body-or-sha, key count, keys, then
/// arguments, mirroring the command-option convention.
pub(crate) fn script_request(
    command: &str,
    body: &str,
    keys: Vec<String>,
    args: Vec<CallerValue>,
) -> DriverRequest {
    let mut request = DriverRequest::new(command)
        .arg(body)
        .arg(keys.len() as i64);
    for key in keys {
        request = request.arg(key);
    }
    request.args(params::flat_args(&args))
}

/// SHA1 of a script body, lowercase hex
#[must_use]
pub fn calculate_sha1(script: &str) -> String {
    let mut hasher = Sha1::new();
    hasher.update(script.as_bytes());
    let digest = hasher.finalize();
    digest.iter().map(|b| format!("{b:02x}")).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sha1_matches_known_vector() {
        // SHA1("") is the classic empty-input digest.
        assert_eq!(
            calculate_sha1(""),
            "da39a3ee5e6b4b0d3255bfef95601890afd80709"
        );
        assert_eq!(calculate_sha1("return 1").len(), 40);
    }

    #[test]
    fn script_request_flattens_keys_then_args() {
        let request = script_request(
            "EVAL",
            "return 1",
            vec!["k1".to_string(), "k2".to_string()],
            vec![CallerValue::from("a"), CallerValue::from(2i64)],
        );
        let texts: Vec<String> = request.args.iter().map(|a| a.to_text()).collect();
        assert_eq!(texts, vec!["return 1", "2", "k1", "k2", "a", "2"]);
    }
}
