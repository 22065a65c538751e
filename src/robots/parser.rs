//! Robots.txt policy evaluation
//!
//! Rule matching is delegated to the robotstxt crate; crawl-delay is parsed
//! here because the matcher does not expose it.

use robotstxt::DefaultMatcher;
use std::panic::{self, AssertUnwindSafe};

/// Parsed robots.txt rules for one host
#[derive(Debug, Clone)]
pub struct RobotsPolicy {
    /// Raw robots.txt content (empty string means allow all)
    content: String,
    /// Whether to allow all (true = allow all, false = evaluate content)
    allow_all: bool,
}

impl RobotsPolicy {
    /// Creates a policy from raw robots.txt content
    pub fn from_content(content: &str) -> Self {
        Self {
            content: content.to_string(),
            allow_all: false,
        }
    }

    /// Creates a permissive policy that allows everything
    ///
    /// Used when robots.txt cannot be fetched or the server answers with an
    /// error status.
    pub fn allow_all() -> Self {
        Self {
            content: String::new(),
            allow_all: true,
        }
    }

    /// Returns true if this policy allows everything
    pub fn is_allow_all(&self) -> bool {
        self.allow_all || self.content.trim().is_empty()
    }

    /// Checks if a URL is allowed for the given user-agent product token
    ///
    /// The matcher is isolated with `catch_unwind`; a panic while evaluating
    /// the rules is treated as a denial.
    pub fn is_allowed(&self, url: &str, agent: &str) -> bool {
        if self.is_allow_all() {
            return true;
        }

        let content = self.content.as_str();
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
            let mut matcher = DefaultMatcher::default();
            matcher.one_agent_allowed_by_robots(content, agent, url)
        }));

        outcome.unwrap_or(false)
    }

    /// Gets the crawl delay for a user-agent product token
    ///
    /// A group naming the agent wins over the `*` group.
    pub fn crawl_delay(&self, agent: &str) -> Option<f64> {
        if self.is_allow_all() {
            return None;
        }

        let normalized_agent = agent.to_lowercase();
        let mut current_user_agents: Vec<String> = Vec::new();
        let mut in_group_header = false;
        let mut crawl_delay_for_wildcard: Option<f64> = None;
        let mut crawl_delay_for_agent: Option<f64> = None;

        for line in self.content.lines() {
            // Strip trailing comments
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
                    // Consecutive User-agent lines share one group
                    if !in_group_header {
                        current_user_agents.clear();
                    }
                    current_user_agents.push(value.to_lowercase());
                    in_group_header = true;
                }
                "crawl-delay" => {
                    in_group_header = false;
                    let Ok(delay) = value.parse::<f64>() else {
                        continue;
                    };
                    if !delay.is_finite() || delay < 0.0 {
                        continue;
                    }

                    let names_agent = current_user_agents
                        .iter()
                        .any(|ua| ua != "*" && !ua.is_empty() && normalized_agent.contains(ua));
                    if names_agent {
                        crawl_delay_for_agent.get_or_insert(delay);
                    } else if current_user_agents.iter().any(|ua| ua == "*") {
                        crawl_delay_for_wildcard.get_or_insert(delay);
                    }
                }
                _ => {
                    in_group_header = false;
                }
            }
        }

        crawl_delay_for_agent.or(crawl_delay_for_wildcard)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const AGENT: &str = "TestBot";

    #[test]
    fn test_allow_all() {
        let robots = RobotsPolicy::allow_all();
        assert!(robots.is_allowed("https://example.com/any/path", AGENT));
        assert!(robots.is_allowed("https://example.com/admin", AGENT));
    }

    #[test]
    fn test_disallow_private() {
        let robots = RobotsPolicy::from_content("User-agent: *\nDisallow: /private");
        assert!(!robots.is_allowed("https://example.com/private/x", AGENT));
        assert!(robots.is_allowed("https://example.com/public", AGENT));
    }

    #[test]
    fn test_allow_and_disallow() {
        let content = "User-agent: *\nDisallow: /private\nAllow: /private/public";
        let robots = RobotsPolicy::from_content(content);
        assert!(robots.is_allowed("https://example.com/", AGENT));
        assert!(!robots.is_allowed("https://example.com/private", AGENT));
        assert!(robots.is_allowed("https://example.com/private/public", AGENT));
    }

    #[test]
    fn test_specific_user_agent() {
        let content = "User-agent: BadBot\nDisallow: /\n\nUser-agent: *\nAllow: /";
        let robots = RobotsPolicy::from_content(content);
        assert!(robots.is_allowed("https://example.com/page", "GoodBot"));
        assert!(!robots.is_allowed("https://example.com/page", "BadBot"));
    }

    #[test]
    fn test_garbage_robots_txt_allows() {
        let robots = RobotsPolicy::from_content("This is not valid robots.txt {{{");
        assert!(robots.is_allowed("https://example.com/any/path", AGENT));
    }

    #[test]
    fn test_empty_robots_txt() {
        let robots = RobotsPolicy::from_content("");
        assert!(robots.is_allow_all());
        assert!(robots.is_allowed("https://example.com/any/path", AGENT));
    }

    #[test]
    fn test_crawl_delay_wildcard() {
        let content = "User-agent: *\nCrawl-delay: 10\nDisallow: /admin";
        let robots = RobotsPolicy::from_content(content);
        assert_eq!(robots.crawl_delay(AGENT), Some(10.0));
        assert_eq!(robots.crawl_delay("AnyBot"), Some(10.0));
    }

    #[test]
    fn test_crawl_delay_specific_agent_wins() {
        let content = "User-agent: *\nCrawl-delay: 10\n\nUser-agent: TestBot\nCrawl-delay: 5";
        let robots = RobotsPolicy::from_content(content);
        assert_eq!(robots.crawl_delay(AGENT), Some(5.0));
        assert_eq!(robots.crawl_delay("OtherBot"), Some(10.0));
    }

    #[test]
    fn test_crawl_delay_after_rules() {
        let content = "User-agent: *\nDisallow: /tmp\nCrawl-delay: 5";
        let robots = RobotsPolicy::from_content(content);
        assert_eq!(robots.crawl_delay(AGENT), Some(5.0));
    }

    #[test]
    fn test_crawl_delay_groups_do_not_leak() {
        let content = "User-agent: OtherBot\nDisallow: /x\n\nUser-agent: *\nCrawl-delay: 4";
        let robots = RobotsPolicy::from_content(content);
        assert_eq!(robots.crawl_delay("OtherBot"), Some(4.0));
        assert_eq!(robots.crawl_delay(AGENT), Some(4.0));
    }

    #[test]
    fn test_crawl_delay_none() {
        let robots = RobotsPolicy::from_content("User-agent: *\nDisallow: /admin");
        assert_eq!(robots.crawl_delay(AGENT), None);
        assert_eq!(RobotsPolicy::allow_all().crawl_delay(AGENT), None);
    }

    #[test]
    fn test_crawl_delay_decimal_and_case() {
        let content = "user-agent: testbot\ncrawl-delay: 2.5 # slow down";
        let robots = RobotsPolicy::from_content(content);
        assert_eq!(robots.crawl_delay("TestBot"), Some(2.5));
    }

    #[test]
    fn test_crawl_delay_multiple_user_agents() {
        let content = "User-agent: BotA\nUser-agent: BotB\nCrawl-delay: 3";
        let robots = RobotsPolicy::from_content(content);
        assert_eq!(robots.crawl_delay("BotA"), Some(3.0));
        assert_eq!(robots.crawl_delay("BotB"), Some(3.0));
        assert_eq!(robots.crawl_delay("BotC"), None);
    }
}
