//! In-process URL dedupe filter
//!
//! A Bloom filter sized from an expected capacity and a target
//! false-positive rate. It is a fast negative check in front of the frontier
//! store, never the authority: a hit may be a false positive, a miss is
//! always real.

use bloom::{BloomFilter, ASMS};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

/// Thread-safe Bloom filter over URL strings
pub struct UrlBloom {
    filter: Mutex<BloomFilter>,
    count: AtomicU64,
}

impl UrlBloom {
    /// Creates a filter sized for `capacity` items at `error_rate`
    pub fn new(capacity: u32, error_rate: f64) -> Self {
        Self {
            filter: Mutex::new(BloomFilter::with_rate(error_rate as f32, capacity)),
            count: AtomicU64::new(0),
        }
    }

    /// Adds an item, returning true if it was not already present
    ///
    /// "Already present" is subject to the filter's false-positive rate.
    pub fn add(&self, item: &str) -> bool {
        let mut filter = self.filter.lock().expect("bloom filter lock poisoned");
        if filter.contains(&item) {
            return false;
        }
        filter.insert(&item);
        self.count.fetch_add(1, Ordering::Relaxed);
        true
    }

    /// Checks membership; false positives possible, false negatives never
    pub fn contains(&self, item: &str) -> bool {
        let filter = self.filter.lock().expect("bloom filter lock poisoned");
        filter.contains(&item)
    }

    /// Clears all bits and resets the count
    pub fn clear(&self) {
        let mut filter = self.filter.lock().expect("bloom filter lock poisoned");
        filter.clear();
        self.count.store(0, Ordering::Relaxed);
        tracing::info!("Bloom filter cleared");
    }

    /// Approximate number of distinct items added
    pub fn count(&self) -> u64 {
        self.count.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_then_contains() {
        let bloom = UrlBloom::new(1000, 0.01);
        assert!(!bloom.contains("https://example.com/"));
        assert!(bloom.add("https://example.com/"));
        assert!(bloom.contains("https://example.com/"));
    }

    #[test]
    fn test_no_false_negatives() {
        let bloom = UrlBloom::new(10_000, 0.001);
        let urls: Vec<String> = (0..5000)
            .map(|i| format!("https://example.com/page/{}", i))
            .collect();
        for url in &urls {
            bloom.add(url);
        }
        for url in &urls {
            assert!(bloom.contains(url), "false negative for {}", url);
        }
    }

    #[test]
    fn test_false_positive_rate_bounded() {
        let bloom = UrlBloom::new(10_000, 0.01);
        for i in 0..10_000 {
            bloom.add(&format!("https://example.com/in/{}", i));
        }
        let false_positives = (0..10_000)
            .filter(|i| bloom.contains(&format!("https://example.com/out/{}", i)))
            .count();
        // Allow generous slack over the configured 1% rate
        assert!(
            false_positives < 500,
            "false positive rate too high: {}/10000",
            false_positives
        );
    }

    #[test]
    fn test_duplicate_add_returns_false() {
        let bloom = UrlBloom::new(1000, 0.01);
        assert!(bloom.add("https://example.com/a"));
        assert!(!bloom.add("https://example.com/a"));
        assert_eq!(bloom.count(), 1);
    }

    #[test]
    fn test_clear() {
        let bloom = UrlBloom::new(1000, 0.01);
        bloom.add("https://example.com/a");
        bloom.add("https://example.com/b");
        assert_eq!(bloom.count(), 2);

        bloom.clear();
        assert_eq!(bloom.count(), 0);
        assert!(!bloom.contains("https://example.com/a"));
    }

    #[test]
    fn test_concurrent_adds() {
        use std::sync::Arc;
        let bloom = Arc::new(UrlBloom::new(100_000, 0.001));
        let mut handles = Vec::new();
        for t in 0..4 {
            let bloom = Arc::clone(&bloom);
            handles.push(std::thread::spawn(move || {
                for i in 0..1000 {
                    bloom.add(&format!("https://example.com/{}/{}", t, i));
                }
            }));
        }
        for handle in handles {
            handle.join().unwrap();
        }
        for t in 0..4 {
            for i in 0..1000 {
                assert!(bloom.contains(&format!("https://example.com/{}/{}", t, i)));
            }
        }
    }
}
