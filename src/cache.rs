//! Edit cache — capacity-bounded LRU with lazy TTL expiry.
//!
//! Entries live in a slab; the LRU ordering is a doubly-linked list of slab
//! indices (head = most recently used, tail = eviction candidate), so touch
//! and evict are O(1) and teardown is just `Drop`. Expiry is discovered on
//! access; there is no background sweep beyond the explicit
//! [`EditCache::evict_expired`] maintenance call.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use log::debug;

#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// Capacity bound; the least-recently-used entry is evicted at the cap.
    pub max_entries: usize,
    /// Maximum age in milliseconds before an entry is treated as expired.
    /// Zero disables expiry.
    pub entry_ttl_ms: u64,
    /// Maintain `last_accessed`/`access_count` on hits.
    pub track_access: bool,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_entries: 64,
            entry_ttl_ms: 0,
            track_access: true,
        }
    }
}

/// One cached (original, reconstructed) pair.
#[derive(Debug, Clone)]
pub struct CachedReconstruction {
    pub history_index: usize,
    pub entry_id: u64,
    pub original: String,
    pub reconstructed: String,
    pub cached_at: Instant,
    pub last_accessed: Instant,
    pub access_count: u64,
}

/// Counter snapshot returned by [`EditCache::stats`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,
    pub expirations: u64,
    pub current_entries: usize,
    pub max_entries: usize,
}

#[derive(Debug)]
struct Slot {
    entry: CachedReconstruction,
    prev: Option<usize>,
    next: Option<usize>,
}

#[derive(Debug)]
pub struct EditCache {
    config: CacheConfig,
    slots: Vec<Option<Slot>>,
    free: Vec<usize>,
    head: Option<usize>,
    tail: Option<usize>,
    /// history_index -> slab index; at most one entry per history index.
    map: HashMap<usize, usize>,
    hits: u64,
    misses: u64,
    evictions: u64,
    expirations: u64,
}

impl EditCache {
    /// # Panics
    ///
    /// Panics if `max_entries` is 0. The orchestrator validates its config
    /// bounds before building a cache.
    pub fn new(config: CacheConfig) -> Self {
        assert!(config.max_entries > 0, "cache capacity must be greater than 0");
        Self {
            slots: Vec::with_capacity(config.max_entries),
            free: Vec::new(),
            head: None,
            tail: None,
            map: HashMap::with_capacity(config.max_entries),
            hits: 0,
            misses: 0,
            evictions: 0,
            expirations: 0,
            config,
        }
    }

    /// Look up the entry for a history index, refreshing its recency.
    ///
    /// An expired entry is removed and counted as both an expiration and a
    /// miss.
    pub fn lookup(&mut self, history_index: usize) -> Option<&CachedReconstruction> {
        let Some(&idx) = self.map.get(&history_index) else {
            self.misses += 1;
            return None;
        };
        if self.config.entry_ttl_ms > 0 {
            let ttl = Duration::from_millis(self.config.entry_ttl_ms);
            if self.slot(idx).entry.cached_at.elapsed() >= ttl {
                self.remove_slot(idx);
                self.expirations += 1;
                self.misses += 1;
                debug!("cache entry for history index {history_index} expired");
                return None;
            }
        }
        self.hits += 1;
        self.unlink(idx);
        self.push_front(idx);
        let track = self.config.track_access;
        let slot = self.slots[idx].as_mut().expect("linked slot is occupied");
        if track {
            slot.entry.last_accessed = Instant::now();
            slot.entry.access_count += 1;
        }
        Some(&slot.entry)
    }

    /// Insert a reconstruction pair, replacing any entry for the same index
    /// and evicting the least-recently-used entry at capacity.
    pub fn insert(
        &mut self,
        history_index: usize,
        entry_id: u64,
        original: &str,
        reconstructed: &str,
    ) {
        let existing = self.map.get(&history_index).copied();
        if let Some(existing) = existing {
            // replacement, never an in-place update
            self.remove_slot(existing);
        }
        if self.map.len() >= self.config.max_entries {
            if let Some(tail) = self.tail {
                let evicted = self.remove_slot(tail);
                self.evictions += 1;
                debug!(
                    "evicted LRU cache entry for history index {}",
                    evicted.history_index
                );
            }
        }
        let now = Instant::now();
        let entry = CachedReconstruction {
            history_index,
            entry_id,
            original: original.to_string(),
            reconstructed: reconstructed.to_string(),
            cached_at: now,
            last_accessed: now,
            access_count: 0,
        };
        let idx = match self.free.pop() {
            Some(idx) => {
                self.slots[idx] = Some(Slot {
                    entry,
                    prev: None,
                    next: None,
                });
                idx
            }
            None => {
                self.slots.push(Some(Slot {
                    entry,
                    prev: None,
                    next: None,
                }));
                self.slots.len() - 1
            }
        };
        self.map.insert(history_index, idx);
        self.push_front(idx);
    }

    /// Unconditional removal. Does not touch hit/miss counters.
    pub fn invalidate(&mut self, history_index: usize) -> bool {
        match self.map.get(&history_index).copied() {
            Some(idx) => {
                self.remove_slot(idx);
                true
            }
            None => false,
        }
    }

    /// Drop every entry. Counters survive.
    pub fn clear(&mut self) {
        while let Some(head) = self.head {
            self.remove_slot(head);
        }
    }

    /// Eager full-list sweep of expired entries; returns how many were
    /// removed. Removals count as expirations only.
    pub fn evict_expired(&mut self) -> usize {
        if self.config.entry_ttl_ms == 0 {
            return 0;
        }
        let ttl = Duration::from_millis(self.config.entry_ttl_ms);
        let expired: Vec<usize> = self
            .map
            .values()
            .copied()
            .filter(|&idx| self.slot(idx).entry.cached_at.elapsed() >= ttl)
            .collect();
        let count = expired.len();
        for idx in expired {
            self.remove_slot(idx);
        }
        self.expirations += count as u64;
        if count > 0 {
            debug!("expired {count} cache entries");
        }
        count
    }

    /// Swap in a new config, evicting down to the new capacity if needed.
    pub fn set_config(&mut self, config: CacheConfig) {
        assert!(config.max_entries > 0, "cache capacity must be greater than 0");
        self.config = config;
        while self.map.len() > self.config.max_entries {
            let Some(tail) = self.tail else { break };
            self.remove_slot(tail);
            self.evictions += 1;
        }
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits,
            misses: self.misses,
            evictions: self.evictions,
            expirations: self.expirations,
            current_entries: self.map.len(),
            max_entries: self.config.max_entries,
        }
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    fn slot(&self, idx: usize) -> &Slot {
        self.slots[idx].as_ref().expect("linked slot is occupied")
    }

    fn slot_mut(&mut self, idx: usize) -> &mut Slot {
        self.slots[idx].as_mut().expect("linked slot is occupied")
    }

    fn unlink(&mut self, idx: usize) {
        let (prev, next) = {
            let slot = self.slot(idx);
            (slot.prev, slot.next)
        };
        match prev {
            Some(p) => self.slot_mut(p).next = next,
            None => self.head = next,
        }
        match next {
            Some(n) => self.slot_mut(n).prev = prev,
            None => self.tail = prev,
        }
        let slot = self.slot_mut(idx);
        slot.prev = None;
        slot.next = None;
    }

    fn push_front(&mut self, idx: usize) {
        let old_head = self.head;
        {
            let slot = self.slot_mut(idx);
            slot.prev = None;
            slot.next = old_head;
        }
        if let Some(h) = old_head {
            self.slot_mut(h).prev = Some(idx);
        }
        self.head = Some(idx);
        if self.tail.is_none() {
            self.tail = Some(idx);
        }
    }

    fn remove_slot(&mut self, idx: usize) -> CachedReconstruction {
        self.unlink(idx);
        let slot = self.slots[idx].take().expect("linked slot is occupied");
        self.map.remove(&slot.entry.history_index);
        self.free.push(idx);
        slot.entry
    }
}
