//! Cache storage trait and in-memory implementation.

use chrono::{DateTime, Duration, Utc};
use regex::Regex;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Mutex;

use crate::error::{poisoned, Result};

/// A single cached value.
///
/// Entries are immutable once stored; overwriting a key replaces the entry.
#[derive(Debug, Clone)]
pub struct CacheEntry {
  /// Serialized payload
  pub value: Value,
  /// When the entry was stored
  pub stored_at: DateTime<Utc>,
  /// How long the entry stays fresh
  pub ttl: Duration,
  /// Ticket of the fetch that produced this entry
  pub generation: u64,
}

impl CacheEntry {
  pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
    now - self.stored_at > self.ttl
  }
}

/// Selects cache keys for invalidation.
#[derive(Debug, Clone)]
pub enum KeyPattern {
  /// Every key
  All,
  /// Keys containing the substring
  Contains(String),
  /// Keys the expression matches
  Regex(Regex),
}

impl KeyPattern {
  pub fn matches(&self, key: &str) -> bool {
    match self {
      KeyPattern::All => true,
      KeyPattern::Contains(needle) => key.contains(needle.as_str()),
      KeyPattern::Regex(re) => re.is_match(key),
    }
  }
}

impl From<&str> for KeyPattern {
  fn from(needle: &str) -> Self {
    KeyPattern::Contains(needle.to_string())
  }
}

impl From<String> for KeyPattern {
  fn from(needle: String) -> Self {
    KeyPattern::Contains(needle)
  }
}

impl From<Regex> for KeyPattern {
  fn from(re: Regex) -> Self {
    KeyPattern::Regex(re)
  }
}

/// Trait for cache storage backends.
pub trait CacheStorage: Send + Sync {
  /// Look up an entry by exact key, expired or not.
  fn get(&self, key: &str) -> Result<Option<CacheEntry>>;

  /// Store an entry unless the key already holds one from a newer fetch.
  /// Returns whether the entry was stored.
  fn put(&self, key: &str, entry: CacheEntry) -> Result<bool>;

  /// Remove a single key.
  fn remove(&self, key: &str) -> Result<bool>;

  /// Remove every key the pattern matches, returning how many went.
  fn remove_matching(&self, pattern: &KeyPattern) -> Result<usize>;

  /// Drop entries that have expired by `now`.
  fn prune_expired(&self, now: DateTime<Utc>) -> Result<usize>;

  fn len(&self) -> Result<usize>;
}

/// Storage implementation that doesn't cache anything.
/// Used when caching is disabled - all operations are no-ops.
pub struct NoopStorage;

impl CacheStorage for NoopStorage {
  fn get(&self, _key: &str) -> Result<Option<CacheEntry>> {
    Ok(None) // Always miss
  }

  fn put(&self, _key: &str, _entry: CacheEntry) -> Result<bool> {
    Ok(false) // Discard
  }

  fn remove(&self, _key: &str) -> Result<bool> {
    Ok(false)
  }

  fn remove_matching(&self, _pattern: &KeyPattern) -> Result<usize> {
    Ok(0)
  }

  fn prune_expired(&self, _now: DateTime<Utc>) -> Result<usize> {
    Ok(0)
  }

  fn len(&self) -> Result<usize> {
    Ok(0)
  }
}

/// Process-memory cache storage.
#[derive(Default)]
pub struct MemoryStorage {
  entries: Mutex<HashMap<String, CacheEntry>>,
}

impl MemoryStorage {
  pub fn new() -> Self {
    Self::default()
  }
}

impl CacheStorage for MemoryStorage {
  fn get(&self, key: &str) -> Result<Option<CacheEntry>> {
    let entries = self.entries.lock().map_err(poisoned)?;
    Ok(entries.get(key).cloned())
  }

  fn put(&self, key: &str, entry: CacheEntry) -> Result<bool> {
    let mut entries = self.entries.lock().map_err(poisoned)?;
    if let Some(existing) = entries.get(key) {
      if existing.generation > entry.generation {
        return Ok(false);
      }
    }
    entries.insert(key.to_string(), entry);
    Ok(true)
  }

  fn remove(&self, key: &str) -> Result<bool> {
    let mut entries = self.entries.lock().map_err(poisoned)?;
    Ok(entries.remove(key).is_some())
  }

  fn remove_matching(&self, pattern: &KeyPattern) -> Result<usize> {
    let mut entries = self.entries.lock().map_err(poisoned)?;
    let before = entries.len();
    entries.retain(|key, _| !pattern.matches(key));
    Ok(before - entries.len())
  }

  fn prune_expired(&self, now: DateTime<Utc>) -> Result<usize> {
    let mut entries = self.entries.lock().map_err(poisoned)?;
    let before = entries.len();
    entries.retain(|_, entry| !entry.is_expired(now));
    Ok(before - entries.len())
  }

  fn len(&self) -> Result<usize> {
    let entries = self.entries.lock().map_err(poisoned)?;
    Ok(entries.len())
  }
}
