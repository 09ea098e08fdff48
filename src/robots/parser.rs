//! Robots.txt rule evaluation
//!
//! Allow/Disallow matching is delegated to the robotstxt crate, which
//! implements the standard longest-match semantics with fallback to the `*`
//! group. Crawl-delay is not exposed by that crate and is extracted here
//! manually.

use robotstxt::DefaultMatcher;

/// A robots.txt file that could not be interpreted
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RobotsParseError;

/// Parsed robots.txt rules for one origin
#[derive(Debug, Clone)]
pub struct RobotRules {
    /// Raw robots.txt content; empty means allow everything
    content: String,
}

impl RobotRules {
    /// Creates rules from raw robots.txt content
    ///
    /// Rejects bodies containing NUL bytes; a binary file served at
    /// /robots.txt is not a rules file.
    pub fn from_content(content: &str) -> Result<Self, RobotsParseError> {
        if content.contains('\0') {
            return Err(RobotsParseError);
        }
        Ok(Self {
            content: content.to_string(),
        })
    }

    /// Creates permissive rules that allow every URL
    pub fn allow_all() -> Self {
        Self {
            content: String::new(),
        }
    }

    /// Checks whether `url` is allowed for `agent`
    pub fn is_allowed(&self, agent: &str, url: &str) -> bool {
        if self.content.is_empty() {
            return true;
        }
        let mut matcher = DefaultMatcher::default();
        matcher.one_agent_allowed_by_robots(&self.content, agent, url)
    }

    /// Extracts the Crawl-delay for `agent`, in seconds
    ///
    /// A group naming the agent specifically wins over the `*` group. The
    /// agent match is case-insensitive substring containment, so a group for
    /// `mybot` applies to `MyBot/1.2`.
    pub fn crawl_delay(&self, agent: &str) -> Option<f64> {
        let agent_lower = agent.to_lowercase();
        let mut group_has_agent = false;
        let mut group_has_star = false;
        let mut in_directives = false;
        let mut agent_delay: Option<f64> = None;
        let mut star_delay: Option<f64> = None;

        for line in self.content.lines() {
            let line = line.split('#').next().unwrap_or("").trim();
            if line.is_empty() {
                continue;
            }

            let Some((key, value)) = line.split_once(':') else {
                continue;
            };
            let key = key.trim().to_lowercase();
            let value = value.trim();

            match key.as_str() {
                "user-agent" => {
                    // A user-agent line after directives starts a new group
                    if in_directives {
                        group_has_agent = false;
                        group_has_star = false;
                        in_directives = false;
                    }
                    if value == "*" {
                        group_has_star = true;
                    } else if agent_lower.contains(&value.to_lowercase()) {
                        group_has_agent = true;
                    }
                }
                "crawl-delay" => {
                    in_directives = true;
                    if let Ok(delay) = value.parse::<f64>() {
                        if delay >= 0.0 && delay.is_finite() {
                            if group_has_agent && agent_delay.is_none() {
                                agent_delay = Some(delay);
                            }
                            if group_has_star && star_delay.is_none() {
                                star_delay = Some(delay);
                            }
                        }
                    }
                }
                _ => {
                    in_directives = true;
                }
            }
        }

        agent_delay.or(star_delay)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_allow_all() {
        let rules = RobotRules::allow_all();
        assert!(rules.is_allowed("TestBot", "https://example.com/any"));
        assert!(rules.is_allowed("TestBot", "https://example.com/admin"));
    }

    #[test]
    fn test_disallow_all() {
        let rules = RobotRules::from_content("User-agent: *\nDisallow: /").unwrap();
        assert!(!rules.is_allowed("TestBot", "https://example.com/"));
        assert!(!rules.is_allowed("TestBot", "https://example.com/page"));
    }

    #[test]
    fn test_disallow_specific_path() {
        let rules = RobotRules::from_content("User-agent: *\nDisallow: /admin").unwrap();
        assert!(rules.is_allowed("TestBot", "https://example.com/"));
        assert!(rules.is_allowed("TestBot", "https://example.com/page"));
        assert!(!rules.is_allowed("TestBot", "https://example.com/admin"));
        assert!(!rules.is_allowed("TestBot", "https://example.com/admin/users"));
    }

    #[test]
    fn test_allow_overrides_disallow() {
        let rules =
            RobotRules::from_content("User-agent: *\nDisallow: /private\nAllow: /private/public")
                .unwrap();
        assert!(!rules.is_allowed("TestBot", "https://example.com/private"));
        assert!(rules.is_allowed("TestBot", "https://example.com/private/public"));
    }

    #[test]
    fn test_specific_agent_group() {
        let rules = RobotRules::from_content(
            "User-agent: BadBot\nDisallow: /\n\nUser-agent: *\nAllow: /",
        )
        .unwrap();
        assert!(rules.is_allowed("GoodBot", "https://example.com/page"));
        assert!(!rules.is_allowed("BadBot", "https://example.com/page"));
    }

    #[test]
    fn test_binary_content_rejected() {
        assert!(RobotRules::from_content("User-agent: *\0\nDisallow: /").is_err());
    }

    #[test]
    fn test_crawl_delay_star_group() {
        let rules =
            RobotRules::from_content("User-agent: *\nCrawl-delay: 5\nDisallow: /admin").unwrap();
        assert_eq!(rules.crawl_delay("TestBot"), Some(5.0));
    }

    #[test]
    fn test_crawl_delay_fractional() {
        let rules = RobotRules::from_content("User-agent: *\nCrawl-delay: 0.5").unwrap();
        assert_eq!(rules.crawl_delay("TestBot"), Some(0.5));
    }

    #[test]
    fn test_crawl_delay_specific_agent_wins() {
        let rules = RobotRules::from_content(
            "User-agent: TestBot\nCrawl-delay: 10\n\nUser-agent: *\nCrawl-delay: 2",
        )
        .unwrap();
        assert_eq!(rules.crawl_delay("TestBot"), Some(10.0));
        assert_eq!(rules.crawl_delay("OtherBot"), Some(2.0));
    }

    #[test]
    fn test_crawl_delay_agent_substring_match() {
        let rules =
            RobotRules::from_content("User-agent: mybot\nCrawl-delay: 4").unwrap();
        assert_eq!(rules.crawl_delay("MyBot/1.2 (+https://example.com)"), Some(4.0));
    }

    #[test]
    fn test_crawl_delay_absent() {
        let rules = RobotRules::from_content("User-agent: *\nDisallow: /admin").unwrap();
        assert_eq!(rules.crawl_delay("TestBot"), None);
    }

    #[test]
    fn test_crawl_delay_negative_ignored() {
        let rules = RobotRules::from_content("User-agent: *\nCrawl-delay: -3").unwrap();
        assert_eq!(rules.crawl_delay("TestBot"), None);
    }

    #[test]
    fn test_comments_stripped() {
        let rules = RobotRules::from_content(
            "# politeness\nUser-agent: * # everyone\nCrawl-delay: 3 # seconds",
        )
        .unwrap();
        assert_eq!(rules.crawl_delay("TestBot"), Some(3.0));
    }
}
