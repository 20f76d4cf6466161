//! Calibration Cache
//!
//! String-keyed, TTL-capable byte storage that calibration sets live in.
//! The manager only depends on the `CalibrationCache` trait, so a shared
//! cache service can stand in for the in-process `MemoryCache`.

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use crate::error::{ConformalError, ConformalResult};

/// Key-value storage with per-entry expiry.
///
/// A TTL of `Duration::ZERO` means the entry never expires. Single-key
/// `get`/`set` are expected to be atomic; nothing else is assumed.
pub trait CalibrationCache: Send + Sync {
    /// Returns `Ok(None)` when the key is absent or expired.
    fn get(&self, key: &str) -> ConformalResult<Option<Vec<u8>>>;

    /// Writes the value, replacing any existing entry.
    fn set(&self, key: &str, value: &[u8], ttl: Duration) -> ConformalResult<()>;

    /// Returns `Ok(true)` if a live entry was removed.
    fn delete(&self, key: &str) -> ConformalResult<bool>;

    fn stats(&self) -> CacheStats;
}

/// Hit/miss counters for a cache
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    /// Entries currently held, expired ones included until swept
    pub size: u64,
    pub hit_rate: f64,
}

impl CacheStats {
    pub fn new(hits: u64, misses: u64, size: u64) -> Self {
        let hit_rate = if hits + misses > 0 {
            hits as f64 / (hits + misses) as f64
        } else {
            0.0
        };

        Self {
            hits,
            misses,
            size,
            hit_rate,
        }
    }
}

#[derive(Debug, Clone)]
struct CacheEntry {
    value: Vec<u8>,
    expires_at: Option<DateTime<Utc>>,
}

impl CacheEntry {
    fn is_expired(&self) -> bool {
        match self.expires_at {
            Some(expires) => Utc::now() >= expires,
            None => false,
        }
    }
}

/// In-process cache backed by a concurrent hash map
#[derive(Debug, Default)]
pub struct MemoryCache {
    entries: DashMap<String, CacheEntry>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drop every expired entry. Returns how many were removed.
    pub fn purge_expired(&self) -> usize {
        let before = self.entries.len();
        self.entries.retain(|_, entry| !entry.is_expired());
        before.saturating_sub(self.entries.len())
    }

    pub fn clear(&self) {
        self.entries.clear();
    }

    fn expiry_for(ttl: Duration) -> ConformalResult<Option<DateTime<Utc>>> {
        if ttl.is_zero() {
            return Ok(None);
        }
        let ttl = chrono::Duration::from_std(ttl)
            .map_err(|e| ConformalError::Cache(format!("TTL out of range: {}", e)))?;
        Utc::now()
            .checked_add_signed(ttl)
            .map(Some)
            .ok_or_else(|| ConformalError::Cache(format!("TTL {:?} overflows expiry time", ttl)))
    }
}

impl CalibrationCache for MemoryCache {
    fn get(&self, key: &str) -> ConformalResult<Option<Vec<u8>>> {
        let value = match self.entries.get(key) {
            Some(entry) if !entry.is_expired() => Some(entry.value.clone()),
            _ => None,
        };

        match value {
            Some(value) => {
                self.hits.fetch_add(1, Ordering::Relaxed);
                Ok(Some(value))
            }
            None => {
                // Guard from `get` is released above; safe to take the shard lock.
                self.entries.remove_if(key, |_, entry| entry.is_expired());
                self.misses.fetch_add(1, Ordering::Relaxed);
                Ok(None)
            }
        }
    }

    fn set(&self, key: &str, value: &[u8], ttl: Duration) -> ConformalResult<()> {
        let expires_at = Self::expiry_for(ttl)?;
        self.entries.insert(
            key.to_string(),
            CacheEntry {
                value: value.to_vec(),
                expires_at,
            },
        );
        Ok(())
    }

    fn delete(&self, key: &str) -> ConformalResult<bool> {
        Ok(self
            .entries
            .remove(key)
            .map(|(_, entry)| !entry.is_expired())
            .unwrap_or(false))
    }

    fn stats(&self) -> CacheStats {
        CacheStats::new(
            self.hits.load(Ordering::Relaxed),
            self.misses.load(Ordering::Relaxed),
            self.entries.len() as u64,
        )
    }
}
