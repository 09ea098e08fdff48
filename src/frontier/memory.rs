//! In-memory frontier store
//!
//! Implements the same primitives as the Redis store against process-local
//! maps. Used by the test suite and by embedders that want a single-process
//! crawl without an external store.

use crate::frontier::store::KeyValueStore;
use crate::Result;
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

#[derive(Default)]
struct Inner {
    sets: HashMap<String, HashSet<String>>,
    zsets: HashMap<String, Vec<(String, f64)>>,
}

/// Process-local [`KeyValueStore`]
#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[async_trait]
impl KeyValueStore for MemoryStore {
    async fn set_add(&self, key: &str, member: &str) -> Result<bool> {
        let mut inner = self.lock();
        Ok(inner
            .sets
            .entry(key.to_string())
            .or_default()
            .insert(member.to_string()))
    }

    async fn set_remove(&self, key: &str, member: &str) -> Result<bool> {
        let mut inner = self.lock();
        Ok(inner
            .sets
            .get_mut(key)
            .map(|set| set.remove(member))
            .unwrap_or(false))
    }

    async fn set_contains(&self, key: &str, member: &str) -> Result<bool> {
        let inner = self.lock();
        Ok(inner
            .sets
            .get(key)
            .map(|set| set.contains(member))
            .unwrap_or(false))
    }

    async fn set_len(&self, key: &str) -> Result<u64> {
        let inner = self.lock();
        Ok(inner.sets.get(key).map(|set| set.len() as u64).unwrap_or(0))
    }

    async fn zset_add(&self, key: &str, member: &str, score: f64) -> Result<()> {
        let mut inner = self.lock();
        let zset = inner.zsets.entry(key.to_string()).or_default();
        // Re-adding a member updates its score, matching sorted-set semantics
        zset.retain(|(m, _)| m != member);
        zset.push((member.to_string(), score));
        Ok(())
    }

    async fn zset_pop_min(&self, key: &str) -> Result<Option<(String, f64)>> {
        let mut inner = self.lock();
        let Some(zset) = inner.zsets.get_mut(key) else {
            return Ok(None);
        };
        if zset.is_empty() {
            return Ok(None);
        }

        let mut min_index = 0;
        for index in 1..zset.len() {
            let (member, score) = &zset[index];
            let (best_member, best_score) = &zset[min_index];
            if score < best_score || (score == best_score && member < best_member) {
                min_index = index;
            }
        }
        Ok(Some(zset.remove(min_index)))
    }

    async fn zset_len(&self, key: &str) -> Result<u64> {
        let inner = self.lock();
        Ok(inner
            .zsets
            .get(key)
            .map(|zset| zset.len() as u64)
            .unwrap_or(0))
    }

    async fn delete(&self, keys: &[&str]) -> Result<u64> {
        let mut inner = self.lock();
        let mut deleted = 0;
        for key in keys {
            if inner.sets.remove(*key).is_some() {
                deleted += 1;
            }
            if inner.zsets.remove(*key).is_some() {
                deleted += 1;
            }
        }
        Ok(deleted)
    }

    async fn ping(&self) -> Result<()> {
        Ok(())
    }
}
