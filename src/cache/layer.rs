//! Cache layer that orchestrates caching logic with remote fetching.

use chrono::Duration;
use serde::{de::DeserializeOwned, Serialize};
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::debug;

use super::storage::{CacheEntry, CacheStorage, KeyPattern};
use super::traits::{CacheResult, Clock, SystemClock};
use crate::error::{Error, Result};

/// Cache layer that manages TTL expiry, invalidation and remote fetching.
///
/// This layer sits between the data service and the remote, providing
/// transparent caching. Errors are never cached and stale entries are never
/// served.
pub struct CacheLayer {
  storage: Arc<dyn CacheStorage>,
  clock: Arc<dyn Clock>,
  /// How long a read waits for the remote
  timeout: std::time::Duration,
  /// Issued to every remote fetch, in call order
  tickets: Arc<AtomicU64>,
  /// Highest ticket issued when the last invalidation ran
  invalidated_through: Arc<AtomicU64>,
}

impl CacheLayer {
  /// Create a new cache layer with the given storage backend.
  pub fn new(storage: Arc<dyn CacheStorage>) -> Self {
    Self {
      storage,
      clock: Arc::new(SystemClock),
      timeout: std::time::Duration::from_secs(10),
      tickets: Arc::new(AtomicU64::new(0)),
      invalidated_through: Arc::new(AtomicU64::new(0)),
    }
  }

  pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
    self.clock = clock;
    self
  }

  /// Set how long a read waits for the remote before giving up.
  pub fn with_timeout(mut self, timeout: std::time::Duration) -> Self {
    self.timeout = timeout;
    self
  }

  /// Serve `key` from cache, or run `fetcher` and cache its result for `ttl`.
  ///
  /// 1. Unexpired entry: return it, the fetcher is not called
  /// 2. Missing or expired: call the fetcher under the read timeout
  /// 3. Store the result unless a newer fetch or an invalidation got there first
  ///
  /// A failed fetch leaves whatever entry the key already had untouched.
  pub async fn fetch_cached<T, F, Fut>(
    &self,
    key: &str,
    ttl: Duration,
    fetcher: F,
  ) -> Result<CacheResult<T>>
  where
    T: Serialize + DeserializeOwned,
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<T>>,
  {
    if let Some(cached) = self.storage.get(key)? {
      if !cached.is_expired(self.clock.now()) {
        debug!(key, "cache hit");
        let data = serde_json::from_value(cached.value)?;
        return Ok(CacheResult::from_cache(data, cached.stored_at));
      }
      debug!(key, "cache entry expired");
    } else {
      debug!(key, "cache miss");
    }

    let ticket = self.tickets.fetch_add(1, Ordering::SeqCst) + 1;
    let data = match tokio::time::timeout(self.timeout, fetcher()).await {
      Ok(result) => result?,
      Err(_) => return Err(Error::Timeout(self.timeout)),
    };

    if ticket > self.invalidated_through.load(Ordering::SeqCst) {
      let entry = CacheEntry {
        value: serde_json::to_value(&data)?,
        stored_at: self.clock.now(),
        ttl,
        generation: ticket,
      };
      if !self.storage.put(key, entry)? {
        debug!(key, ticket, "newer fetch already cached, keeping it");
      }
    } else {
      debug!(key, ticket, "fetch started before invalidation, not caching");
    }

    Ok(CacheResult::from_network(data))
  }

  /// Remove every entry matching `pattern`; `None` clears the whole cache.
  pub fn invalidate(&self, pattern: Option<KeyPattern>) -> Result<usize> {
    let pattern = pattern.unwrap_or(KeyPattern::All);
    self
      .invalidated_through
      .store(self.tickets.load(Ordering::SeqCst), Ordering::SeqCst);
    let removed = self.storage.remove_matching(&pattern)?;
    debug!(?pattern, removed, "invalidated cache entries");
    Ok(removed)
  }

  /// Remove a single key.
  pub fn invalidate_key(&self, key: &str) -> Result<bool> {
    self
      .invalidated_through
      .store(self.tickets.load(Ordering::SeqCst), Ordering::SeqCst);
    self.storage.remove(key)
  }

  /// Drop expired entries. Reads never need this; it only reclaims memory.
  pub fn prune_expired(&self) -> Result<usize> {
    self.storage.prune_expired(self.clock.now())
  }

  pub fn len(&self) -> Result<usize> {
    self.storage.len()
  }
}

impl Clone for CacheLayer {
  fn clone(&self) -> Self {
    Self {
      storage: Arc::clone(&self.storage),
      clock: Arc::clone(&self.clock),
      timeout: self.timeout,
      tickets: Arc::clone(&self.tickets),
      invalidated_through: Arc::clone(&self.invalidated_through),
    }
  }
}
