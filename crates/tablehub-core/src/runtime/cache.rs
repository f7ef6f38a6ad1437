// crates/tablehub-core/src/runtime/cache.rs
// ============================================================================
// Module: Tablehub Result Cache
// Description: In-process TTL cache for serialized query responses.
// Purpose: Avoid recomputing identical chart queries within the TTL window.
// Dependencies: dashmap, crate::core::fingerprint, crate::interfaces
// ============================================================================

//! ## Overview
//! [`InMemoryResultCache`] maps fingerprints to immutable response bodies.
//! Entries live in a sharded concurrent map so unrelated fingerprints never
//! contend on one lock, and no query work runs while a shard is held. An
//! entry expires after its TTL and is replaced wholesale by the next `put`;
//! there is no proactive invalidation.
//!
//! Time comes from an injectable [`Clock`]. Tests use [`ManualClock`] to move
//! time forward without sleeping.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;
use std::sync::atomic::AtomicU64;
use std::sync::atomic::Ordering;
use std::time::Duration;
use std::time::Instant;

use dashmap::DashMap;

use crate::core::fingerprint::Fingerprint;
use crate::interfaces::CacheError;
use crate::interfaces::ResultCache;

// ============================================================================
// SECTION: Clocks
// ============================================================================

/// Monotonic time source.
pub trait Clock: Send + Sync {
    /// Returns the current instant.
    fn now(&self) -> Instant;
}

/// Clock backed by [`Instant::now`].
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// Clock that only moves when advanced explicitly.
#[derive(Debug)]
pub struct ManualClock {
    /// Instant captured at construction.
    base: Instant,
    /// Milliseconds advanced since construction.
    offset_ms: AtomicU64,
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl ManualClock {
    /// Creates a clock frozen at the current instant.
    #[must_use]
    pub fn new() -> Self {
        Self {
            base: Instant::now(),
            offset_ms: AtomicU64::new(0),
        }
    }

    /// Moves the clock forward.
    pub fn advance(&self, by: Duration) {
        let millis = u64::try_from(by.as_millis()).unwrap_or(u64::MAX);
        self.offset_ms.fetch_add(millis, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        self.base + Duration::from_millis(self.offset_ms.load(Ordering::SeqCst))
    }
}

// ============================================================================
// SECTION: In-Memory Cache
// ============================================================================

/// Default maximum number of cached entries.
pub const DEFAULT_MAX_CACHE_ENTRIES: usize = 10_000;

/// Cached response body with its expiry.
#[derive(Debug)]
struct CacheEntry {
    /// Serialized response body.
    body: Arc<[u8]>,
    /// Instant after which the entry is stale.
    expires_at: Instant,
}

/// Concurrent in-memory result cache with per-entry TTL.
pub struct InMemoryResultCache {
    /// Entries keyed by fingerprint.
    entries: DashMap<Fingerprint, CacheEntry>,
    /// Time source for expiry.
    clock: Arc<dyn Clock>,
    /// Maximum number of live entries.
    max_entries: usize,
}

impl Default for InMemoryResultCache {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryResultCache {
    /// Creates a cache on the system clock with default limits.
    #[must_use]
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock), DEFAULT_MAX_CACHE_ENTRIES)
    }

    /// Creates a cache with an explicit clock and entry limit.
    #[must_use]
    pub fn with_clock(clock: Arc<dyn Clock>, max_entries: usize) -> Self {
        Self {
            entries: DashMap::new(),
            clock,
            max_entries,
        }
    }

    /// Returns the number of stored entries, including stale ones.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true when no entries are stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl ResultCache for InMemoryResultCache {
    fn get(&self, fingerprint: &Fingerprint) -> Result<Option<Arc<[u8]>>, CacheError> {
        let now = self.clock.now();
        if let Some(entry) = self.entries.get(fingerprint)
            && entry.expires_at > now
        {
            return Ok(Some(Arc::clone(&entry.body)));
        }
        self.entries.remove_if(fingerprint, |_, entry| entry.expires_at <= now);
        Ok(None)
    }

    fn put(
        &self,
        fingerprint: Fingerprint,
        body: Vec<u8>,
        ttl: Duration,
    ) -> Result<(), CacheError> {
        if ttl.is_zero() {
            return Ok(());
        }
        let now = self.clock.now();
        if self.entries.len() >= self.max_entries && !self.entries.contains_key(&fingerprint) {
            self.entries.retain(|_, entry| entry.expires_at > now);
            if self.entries.len() >= self.max_entries {
                return Err(CacheError::Unavailable("result cache is full".to_string()));
            }
        }
        self.entries.insert(
            fingerprint,
            CacheEntry {
                body: Arc::from(body),
                expires_at: now + ttl,
            },
        );
        Ok(())
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================
