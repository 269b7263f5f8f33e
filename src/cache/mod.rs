//! In-memory, time-expiring cache.
//!
//! This module provides a transport-agnostic caching mechanism that:
//! - Stores serialized values under string keys with a per-entry TTL
//! - Checks expiry lazily on read, never serving stale entries
//! - Invalidates single keys, substring/regex patterns or everything
//! - Orders racing fetches for one key by call order

mod layer;
mod storage;
mod traits;

pub use layer::CacheLayer;
pub use storage::{CacheStorage, KeyPattern, MemoryStorage, NoopStorage};
#[cfg(test)]
pub use traits::ManualClock;
pub use traits::{CacheResult, CacheSource, Clock, SystemClock};
