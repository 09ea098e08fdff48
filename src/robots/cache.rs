//! Cached per-origin robots.txt state

use crate::robots::parser::RobotRules;
use std::time::{Duration, Instant};

/// Outcome of the most recent robots.txt fetch for an origin
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchStatus {
    /// Fetched and parsed; rules apply
    Success,
    /// No usable robots.txt (401/403/404/410 or empty body); everything allowed
    Absent,
    /// Body could not be interpreted; everything denied until expiry
    ParseError,
    /// Network failure or unusable response; everything denied until expiry
    FetchError,
}

/// Cached robots.txt entry for one origin
#[derive(Debug, Clone)]
pub struct RobotsEntry {
    /// Parsed rules; None when the fetch did not yield usable rules
    pub rules: Option<RobotRules>,

    /// When the entry was created
    pub fetched_at: Instant,

    /// How the fetch concluded
    pub status: FetchStatus,
}

impl RobotsEntry {
    pub fn new(rules: Option<RobotRules>, status: FetchStatus) -> Self {
        Self {
            rules,
            fetched_at: Instant::now(),
            status,
        }
    }

    /// Whether the entry has outlived the cache TTL
    pub fn is_expired(&self, ttl: Duration) -> bool {
        self.fetched_at.elapsed() >= ttl
    }

    /// Evaluates the entry for one URL
    ///
    /// Fetch and parse failures deny everything until the entry expires; a
    /// missing robots.txt allows everything.
    pub fn allows(&self, agent: &str, url: &str) -> bool {
        match self.status {
            FetchStatus::Success => self
                .rules
                .as_ref()
                .map(|r| r.is_allowed(agent, url))
                .unwrap_or(false),
            FetchStatus::Absent => true,
            FetchStatus::ParseError | FetchStatus::FetchError => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fresh_entry_not_expired() {
        let entry = RobotsEntry::new(Some(RobotRules::allow_all()), FetchStatus::Success);
        assert!(!entry.is_expired(Duration::from_secs(3600)));
    }

    #[test]
    fn test_zero_ttl_always_expired() {
        let entry = RobotsEntry::new(None, FetchStatus::Absent);
        assert!(entry.is_expired(Duration::ZERO));
    }

    #[test]
    fn test_absent_allows_everything() {
        let entry = RobotsEntry::new(None, FetchStatus::Absent);
        assert!(entry.allows("TestBot", "https://example.com/private"));
    }

    #[test]
    fn test_fetch_error_denies_everything() {
        let entry = RobotsEntry::new(None, FetchStatus::FetchError);
        assert!(!entry.allows("TestBot", "https://example.com/"));
    }

    #[test]
    fn test_parse_error_denies_everything() {
        let entry = RobotsEntry::new(None, FetchStatus::ParseError);
        assert!(!entry.allows("TestBot", "https://example.com/"));
    }

    #[test]
    fn test_success_evaluates_rules() {
        let rules = RobotRules::from_content("User-agent: *\nDisallow: /private").unwrap();
        let entry = RobotsEntry::new(Some(rules), FetchStatus::Success);
        assert!(entry.allows("TestBot", "https://example.com/public"));
        assert!(!entry.allows("TestBot", "https://example.com/private/x"));
    }
}
