//! API key rotation.
//!
//! External generation APIs enforce per-key quotas. A [`KeyRotator`] holds every
//! credential discovered at startup and cycles through them when a call reports
//! that the current key is exhausted. One rotator is shared (via `Arc`) by every
//! adapter talking to the same provider, so rotation state stays consistent.

use crate::error::{Result, SofyError};
use std::sync::atomic::{AtomicUsize, Ordering};
use tracing::{info, warn};

/// Number of indexed alternate slots probed after the primary variable.
pub const MAX_KEY_SLOTS: usize = 10;

/// A cyclic pool of API credentials.
#[derive(Debug)]
pub struct KeyRotator {
    keys: Vec<String>,
    current: AtomicUsize,
}

impl KeyRotator {
    /// Create a rotator over the given keys. Fails if the pool is empty.
    pub fn new(keys: Vec<String>) -> Result<Self> {
        let keys: Vec<String> = keys
            .into_iter()
            .map(|k| k.trim().to_string())
            .filter(|k| !k.is_empty())
            .collect();

        if keys.is_empty() {
            return Err(SofyError::Config("No API keys configured".to_string()));
        }

        Ok(Self {
            keys,
            current: AtomicUsize::new(0),
        })
    }

    /// Discover keys from the process environment.
    ///
    /// Probes `PREFIX` followed by `PREFIX_1` through `PREFIX_10`.
    pub fn from_env(prefix: &str) -> Result<Self> {
        Self::discover(prefix, |name| std::env::var(name).ok())
    }

    /// Discover keys using an arbitrary variable lookup.
    pub fn discover<F>(prefix: &str, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut keys = Vec::new();

        if let Some(primary) = lookup(prefix) {
            keys.push(primary);
        }
        for i in 1..=MAX_KEY_SLOTS {
            if let Some(key) = lookup(&format!("{}_{}", prefix, i)) {
                keys.push(key);
            }
        }

        let rotator = Self::new(keys).map_err(|_| {
            SofyError::Config(format!(
                "No API keys found. Set {} or {}_1..{}_{}",
                prefix, prefix, prefix, MAX_KEY_SLOTS
            ))
        })?;

        info!("Loaded {} API key(s) for {}", rotator.len(), prefix);
        Ok(rotator)
    }

    /// Number of keys in the pool.
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    /// Always false; construction rejects empty pools.
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Index of the key currently in use.
    pub fn current_index(&self) -> usize {
        self.current.load(Ordering::Acquire)
    }

    /// The key currently in use.
    pub fn current_key(&self) -> &str {
        &self.keys[self.current_index()]
    }

    /// Snapshot of the current index together with its key.
    pub fn current(&self) -> (usize, &str) {
        let index = self.current_index();
        (index, &self.keys[index])
    }

    /// Advance to the next key unconditionally and return it.
    pub fn rotate(&self) -> &str {
        let len = self.keys.len();
        let previous = self
            .current
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |i| Some((i + 1) % len))
            .unwrap_or_else(|i| i);
        let next = (previous + 1) % len;
        warn!("Rotated API key to slot {}/{}", next + 1, len);
        &self.keys[next]
    }

    /// Advance past `observed` only if it is still the current index.
    ///
    /// When several callers hit a quota on the same key at once, only the first
    /// advances the pool; the others pick up whatever key is current now.
    pub fn rotate_from(&self, observed: usize) -> (usize, &str) {
        let len = self.keys.len();
        let next = (observed + 1) % len;
        match self
            .current
            .compare_exchange(observed, next, Ordering::AcqRel, Ordering::Acquire)
        {
            Ok(_) => {
                warn!("Rotated API key to slot {}/{}", next + 1, len);
                (next, &self.keys[next])
            }
            Err(actual) => (actual, &self.keys[actual]),
        }
    }
}
