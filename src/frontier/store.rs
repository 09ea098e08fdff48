//! Key-value store abstraction for the frontier
//!
//! The frontier needs a handful of single-key primitives: sets with
//! atomic add, and an ordered set with score-ordered pop. The production
//! implementation talks to Redis; an in-memory implementation backs tests
//! and single-process embedding.

use crate::Result;
use async_trait::async_trait;

/// Ordered set of queued URL records, scored for priority
pub const QUEUE_KEY: &str = "crawler:url_queue_prio";

/// Every canonical URL ever admitted to the queue
pub const SEEN_KEY: &str = "crawler:seen_urls_global";

/// Canonical URLs currently held by a worker
pub const PROCESSING_KEY: &str = "crawler:processing_urls_global";

/// Canonical URLs with a terminal outcome
pub const COMPLETED_KEY: &str = "crawler:completed_urls_global";

/// Single-key primitives the frontier is built on
///
/// Implementations must make each operation atomic on its own: `set_add` is
/// the election point for racing processes, so it must return true for
/// exactly one of two concurrent adds of the same member.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Adds a member to a set; true if it was not already present
    async fn set_add(&self, key: &str, member: &str) -> Result<bool>;

    /// Removes a member from a set; true if it was present
    async fn set_remove(&self, key: &str, member: &str) -> Result<bool>;

    /// Membership test
    async fn set_contains(&self, key: &str, member: &str) -> Result<bool>;

    /// Set cardinality; 0 for a missing key
    async fn set_len(&self, key: &str) -> Result<u64>;

    /// Adds a member with a score to an ordered set
    async fn zset_add(&self, key: &str, member: &str, score: f64) -> Result<()>;

    /// Removes and returns the lowest-scored member
    async fn zset_pop_min(&self, key: &str) -> Result<Option<(String, f64)>>;

    /// Ordered-set cardinality; 0 for a missing key
    async fn zset_len(&self, key: &str) -> Result<u64>;

    /// Deletes keys outright, returning how many existed
    async fn delete(&self, keys: &[&str]) -> Result<u64>;

    /// Liveness check against the backing store
    async fn ping(&self) -> Result<()>;
}
