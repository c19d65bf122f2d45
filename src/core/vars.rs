//! Purpose: Adapt one raw JSON payload into a memoized, prefix-scoped lookup source.
//! Exports: `BodyVars`, `VAR_PREFIX`.
//! Role: One instance per request body; decodes once, caches per-path results.
//! Invariants: Decoding happens at most once; failure aborts construction.
//! Invariants: A path, once resolved (found or not), returns the cached result for the adapter's life.
//! Invariants: The cache is adapter-owned and dies with it; nothing is shared across requests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, PoisonError};

use serde_json::Value;

use crate::core::error::{Error, ErrorKind};
use crate::core::path;
use crate::core::replacer::VarSource;
use crate::json::parse;

/// Namespace this adapter answers for; any other key is another source's business.
pub const VAR_PREFIX: &str = "json.";

#[derive(Debug)]
pub struct BodyVars {
    root: Value,
    // Mutex only to satisfy the host's Send + Sync extension bounds; one
    // adapter still serves exactly one request.
    cache: Mutex<HashMap<String, Value>>,
    resolutions: AtomicU64,
}

impl BodyVars {
    /// Decode `payload` exactly once. A malformed document is a hard
    /// construction error; the caller decides strict or lenient handling.
    pub fn from_slice(payload: &[u8]) -> Result<Self, Error> {
        let root: Value = parse::from_slice(payload).map_err(|err| {
            let hint = parse::hint_for_error(&err, "body vars payload");
            Error::new(ErrorKind::Decode)
                .with_message("payload is not valid JSON")
                .with_hint(hint)
                .with_source(err)
        })?;
        Ok(Self {
            root,
            cache: Mutex::new(HashMap::new()),
            resolutions: AtomicU64::new(0),
        })
    }

    pub fn root(&self) -> &Value {
        &self.root
    }

    /// Number of resolver walks performed so far. Cache hits do not count.
    pub fn resolutions(&self) -> u64 {
        self.resolutions.load(Ordering::Relaxed)
    }
}

impl VarSource for BodyVars {
    fn lookup(&self, key: &str) -> Option<Value> {
        let path = key.strip_prefix(VAR_PREFIX)?;

        let mut cache = self.cache.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(hit) = cache.get(path) {
            return Some(hit.clone());
        }

        self.resolutions.fetch_add(1, Ordering::Relaxed);
        // Absent collapses to null at this surface; misses are memoized
        // like hits so a cold path is walked at most once.
        let value = path::resolve(&self.root, path).into_owned();
        cache.insert(path.to_string(), value.clone());
        Some(value)
    }
}
