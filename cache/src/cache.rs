use std::collections::HashMap;
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use crate::Result;
use crate::block::{BlockKey, ContextBlock};
use crate::error::CacheError;
use crate::tier::PriorityTier;

const DEFAULT_SHARD_COUNT: usize = 16;

/// Configuration for [`ContextCache`]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Hard byte budget for all cached content combined
    pub max_bytes: usize,

    /// Number of lock shards
    #[serde(default = "default_shard_count")]
    pub shard_count: usize,
}

fn default_shard_count() -> usize {
    DEFAULT_SHARD_COUNT
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_bytes: 4 * 1024 * 1024,
            shard_count: DEFAULT_SHARD_COUNT,
        }
    }
}

impl CacheConfig {
    pub fn new(max_bytes: usize) -> Self {
        Self {
            max_bytes,
            ..Self::default()
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.max_bytes == 0 {
            return Err(CacheError::InvalidConfig(
                "max_bytes must be greater than zero".to_string(),
            ));
        }
        if self.shard_count == 0 {
            return Err(CacheError::InvalidConfig(
                "shard_count must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

/// Point-in-time counters for observability
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheStats {
    pub entries: usize,
    pub total_bytes: usize,
    pub max_bytes: usize,
    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,
}

#[derive(Debug)]
struct Entry {
    block: ContextBlock,
    tier: PriorityTier,
    access_count: u64,
    last_used: u64,
    inserted: u64,
}

/// Byte-budgeted store of [`ContextBlock`]s with tiered eviction.
///
/// Keys are sharded across independent mutexes so reads and priority updates
/// on different shards never contend. `put` additionally serializes on a
/// dedicated admission lock: only one insertion plans and executes evictions
/// at a time, which keeps the byte budget a hard invariant.
///
/// Timestamps (`last_used`, `inserted`) are ticks of a per-cache logical
/// clock rather than wall time.
#[derive(Debug)]
pub struct ContextCache {
    config: CacheConfig,
    shards: Vec<Mutex<HashMap<BlockKey, Entry>>>,
    /// Serializes insertions and the eviction plans they run.
    admission: Mutex<()>,
    total_bytes: AtomicUsize,
    clock: AtomicU64,
    hits: AtomicU64,
    misses: AtomicU64,
    evictions: AtomicU64,
}

impl ContextCache {
    pub fn new(config: CacheConfig) -> Result<Self> {
        config.validate()?;
        let shards = (0..config.shard_count)
            .map(|_| Mutex::new(HashMap::new()))
            .collect();
        Ok(Self {
            config,
            shards,
            admission: Mutex::new(()),
            total_bytes: AtomicUsize::new(0),
            clock: AtomicU64::new(0),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            evictions: AtomicU64::new(0),
        })
    }

    fn shard_for(&self, key: &BlockKey) -> &Mutex<HashMap<BlockKey, Entry>> {
        let mut hasher = DefaultHasher::new();
        key.hash(&mut hasher);
        let idx = (hasher.finish() as usize) % self.shards.len();
        &self.shards[idx]
    }

    fn tick(&self) -> u64 {
        self.clock.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// Insert a block at the given tier, evicting lower-value entries if the
    /// budget requires it.
    ///
    /// Re-inserting an existing key replaces the old block and resets its
    /// access statistics. Fails with [`CacheError::CapacityExceeded`] when the
    /// needed space cannot be freed without touching `Critical` entries; the
    /// cache is left unchanged in that case.
    pub async fn put(&self, block: ContextBlock, tier: PriorityTier) -> Result<()> {
        let size = block.byte_size();
        if size > self.config.max_bytes {
            return Err(CacheError::CapacityExceeded {
                needed: size,
                budget: self.config.max_bytes,
                evictable: 0,
            });
        }

        let _admit = self.admission.lock().await;

        // Bytes the old block under this key would give back on replace.
        let replaced = {
            let shard = self.shard_for(&block.key).lock().await;
            shard
                .get(&block.key)
                .map(|e| e.block.byte_size())
                .unwrap_or(0)
        };

        let occupied = self.total_bytes.load(Ordering::SeqCst) - replaced;
        let to_free = (occupied + size).saturating_sub(self.config.max_bytes);
        self.evict_at_least(to_free, &block.key).await?;

        let now = self.tick();
        let key = block.key.clone();
        let mut shard = self.shard_for(&key).lock().await;
        if let Some(old) = shard.remove(&key) {
            self.total_bytes
                .fetch_sub(old.block.byte_size(), Ordering::SeqCst);
        }
        self.total_bytes.fetch_add(size, Ordering::SeqCst);
        shard.insert(
            key,
            Entry {
                block,
                tier,
                access_count: 0,
                last_used: now,
                inserted: now,
            },
        );
        Ok(())
    }

    /// Free at least `to_free` bytes by evicting in ascending
    /// `(tier, last_used, inserted)` order, never touching `Critical` entries
    /// or `skip`. Fails before evicting anything when the candidates cannot
    /// cover the request.
    async fn evict_at_least(&self, mut to_free: usize, skip: &BlockKey) -> Result<()> {
        while to_free > 0 {
            let mut candidates: Vec<(PriorityTier, u64, u64, usize, BlockKey)> = Vec::new();
            for shard in &self.shards {
                let shard = shard.lock().await;
                for (key, entry) in shard.iter() {
                    if entry.tier == PriorityTier::Critical || key == skip {
                        continue;
                    }
                    candidates.push((
                        entry.tier,
                        entry.last_used,
                        entry.inserted,
                        entry.block.byte_size(),
                        key.clone(),
                    ));
                }
            }

            let evictable: usize = candidates.iter().map(|c| c.3).sum();
            if evictable < to_free {
                return Err(CacheError::CapacityExceeded {
                    needed: to_free,
                    budget: self.config.max_bytes,
                    evictable,
                });
            }

            candidates.sort_by(|a, b| {
                (a.0, a.1, a.2, &a.4).cmp(&(b.0, b.1, b.2, &b.4))
            });

            let mut plan = Vec::new();
            let mut planned = 0usize;
            for (_, _, _, bytes, key) in candidates {
                if planned >= to_free {
                    break;
                }
                planned += bytes;
                plan.push(key);
            }

            for key in plan {
                let freed = {
                    let mut shard = self.shard_for(&key).lock().await;
                    match shard.get(&key) {
                        // Promoted to Critical since planning, leave it.
                        Some(e) if e.tier == PriorityTier::Critical => None,
                        Some(_) => shard.remove(&key).map(|e| e.block.byte_size()),
                        None => None,
                    }
                };
                if let Some(freed) = freed {
                    self.total_bytes.fetch_sub(freed, Ordering::SeqCst);
                    self.evictions.fetch_add(1, Ordering::SeqCst);
                    to_free = to_free.saturating_sub(freed);
                    log::debug!("Evicted context block {key} ({freed} bytes)");
                }
            }
        }
        Ok(())
    }

    /// Fetch a block. A pure lookup: recency and access statistics move
    /// only through [`Self::record_use`], so an abandoned retrieval that
    /// already read blocks leaves no trace on the entries.
    pub async fn get(&self, key: &BlockKey) -> Option<ContextBlock> {
        let shard = self.shard_for(key).lock().await;
        match shard.get(key) {
            Some(entry) => {
                self.hits.fetch_add(1, Ordering::SeqCst);
                Some(entry.block.clone())
            }
            None => {
                self.misses.fetch_add(1, Ordering::SeqCst);
                None
            }
        }
    }

    /// Membership test without touching access statistics.
    pub async fn contains(&self, key: &BlockKey) -> bool {
        self.shard_for(key).lock().await.contains_key(key)
    }

    /// Positive usage signal from a consumer: bumps recency and promotes one
    /// tier, stopping at `High`. `Critical` stays a deliberate, external
    /// decision (`pin` / `adjust_priority`).
    pub async fn record_use(&self, key: &BlockKey) -> Result<()> {
        let mut shard = self.shard_for(key).lock().await;
        let entry = shard
            .get_mut(key)
            .ok_or_else(|| CacheError::UnknownKey(key.to_string()))?;
        entry.last_used = self.tick();
        entry.access_count += 1;
        if entry.tier < PriorityTier::High {
            entry.tier = entry.tier.promote(1);
        }
        Ok(())
    }

    /// Apply a signed tier adjustment, returning the new tier.
    pub async fn adjust_priority(&self, key: &BlockKey, delta: i32) -> Result<PriorityTier> {
        let mut shard = self.shard_for(key).lock().await;
        let entry = shard
            .get_mut(key)
            .ok_or_else(|| CacheError::UnknownKey(key.to_string()))?;
        entry.tier = entry.tier.adjust(delta);
        Ok(entry.tier)
    }

    /// Mark a block `Critical` so it is never auto-evicted.
    pub async fn pin(&self, key: &BlockKey) -> Result<()> {
        let mut shard = self.shard_for(key).lock().await;
        let entry = shard
            .get_mut(key)
            .ok_or_else(|| CacheError::UnknownKey(key.to_string()))?;
        entry.tier = PriorityTier::Critical;
        entry.last_used = self.tick();
        Ok(())
    }

    /// Drop every block extracted from `path`, regardless of tier.
    /// Returns the number of blocks removed.
    pub async fn invalidate_path(&self, path: &str) -> usize {
        let mut removed = 0;
        for shard in &self.shards {
            let mut shard = shard.lock().await;
            let stale: Vec<BlockKey> = shard
                .keys()
                .filter(|k| k.path == path)
                .cloned()
                .collect();
            for key in stale {
                if let Some(entry) = shard.remove(&key) {
                    self.total_bytes
                        .fetch_sub(entry.block.byte_size(), Ordering::SeqCst);
                    removed += 1;
                }
            }
        }
        if removed > 0 {
            log::debug!("Invalidated {removed} cached blocks for {path}");
        }
        removed
    }

    pub async fn tier(&self, key: &BlockKey) -> Option<PriorityTier> {
        self.shard_for(key).lock().await.get(key).map(|e| e.tier)
    }

    /// Logical tick of the last access, if the key is cached.
    pub async fn last_used(&self, key: &BlockKey) -> Option<u64> {
        self.shard_for(key)
            .lock()
            .await
            .get(key)
            .map(|e| e.last_used)
    }

    pub async fn access_count(&self, key: &BlockKey) -> Option<u64> {
        self.shard_for(key)
            .lock()
            .await
            .get(key)
            .map(|e| e.access_count)
    }

    pub fn total_bytes(&self) -> usize {
        self.total_bytes.load(Ordering::SeqCst)
    }

    pub fn max_bytes(&self) -> usize {
        self.config.max_bytes
    }

    pub async fn len(&self) -> usize {
        let mut count = 0;
        for shard in &self.shards {
            count += shard.lock().await.len();
        }
        count
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    pub async fn stats(&self) -> CacheStats {
        CacheStats {
            entries: self.len().await,
            total_bytes: self.total_bytes(),
            max_bytes: self.config.max_bytes,
            hits: self.hits.load(Ordering::SeqCst),
            misses: self.misses.load(Ordering::SeqCst),
            evictions: self.evictions.load(Ordering::SeqCst),
        }
    }
}
