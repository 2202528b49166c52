use bytes::Bytes;
use std::collections::hash_map::RandomState;
use std::collections::HashMap;
use std::hash::BuildHasher;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

pub const DEFAULT_SHARDS: usize = 16;

type Shard = HashMap<Bytes, Bytes>;

/// The Store maps binary keys to binary values. It is shared by every connection and is cheap to
/// clone, all clones pointing to the same data.
///
/// Keys are spread over a fixed number of independently locked shards, so operations on keys
/// living in different shards do not contend. Each operation holds exactly one shard lock for the
/// duration of a single map call, which makes every operation atomic with respect to any other
/// operation on the same key.
#[derive(Clone)]
pub struct Store {
    inner: Arc<InnerStore>,
}

struct InnerStore {
    shards: Box<[Mutex<Shard>]>,
    hasher: RandomState,
}

impl Store {
    pub fn new() -> Store {
        Self::with_shards(DEFAULT_SHARDS)
    }

    /// Creates a store with `shards` lock stripes. A value of zero is treated as one.
    pub fn with_shards(shards: usize) -> Store {
        let shards = (0..shards.max(1))
            .map(|_| Mutex::new(HashMap::new()))
            .collect();

        Self {
            inner: Arc::new(InnerStore {
                shards,
                hasher: RandomState::new(),
            }),
        }
    }

    /// Inserts `key`, replacing any previous value.
    pub fn set(&self, key: Bytes, value: Bytes) {
        self.shard(&key).insert(key, value);
    }

    pub fn get(&self, key: &[u8]) -> Option<Bytes> {
        self.shard(key).get(key).cloned()
    }

    /// Removes `key`, returning whether it was present.
    pub fn delete(&self, key: &[u8]) -> bool {
        self.shard(key).remove(key).is_some()
    }

    pub fn exists(&self, key: &[u8]) -> bool {
        self.shard(key).contains_key(key)
    }

    /// Number of keys across all shards. Shards are counted one at a time, so the result is only
    /// exact while no writes are in flight.
    pub fn len(&self) -> usize {
        self.inner
            .shards
            .iter()
            .map(|shard| lock(shard).len())
            .sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn shard_count(&self) -> usize {
        self.inner.shards.len()
    }

    fn shard(&self, key: &[u8]) -> MutexGuard<'_, Shard> {
        let index = self.inner.hasher.hash_one(key) as usize % self.inner.shards.len();
        lock(&self.inner.shards[index])
    }
}

impl Default for Store {
    fn default() -> Self {
        Self::new()
    }
}

// Every mutation is a single map call, so a panic while the lock is held can not leave a shard
// half-updated.
fn lock(shard: &Mutex<Shard>) -> MutexGuard<'_, Shard> {
    shard.lock().unwrap_or_else(PoisonError::into_inner)
}
