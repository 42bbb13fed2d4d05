//! Robots.txt parser implementation
//!
//! Line-oriented parsing of the small directive subset the crawler honours.

/// Parsed robots.txt policy for one host
///
/// Immutable once constructed. An empty disallow list allows everything.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RobotsRules {
    disallow_prefixes: Vec<String>,
    sitemap_urls: Vec<String>,
}

impl RobotsRules {
    /// Creates rules from explicit disallow prefixes and sitemap URLs
    pub fn new(disallow_prefixes: Vec<String>, sitemap_urls: Vec<String>) -> Self {
        Self {
            disallow_prefixes,
            sitemap_urls,
        }
    }

    /// Creates a permissive policy that allows everything
    ///
    /// This is used whenever robots.txt cannot be fetched or the URL has no host.
    pub fn allow_all() -> Self {
        Self::default()
    }

    /// Parses raw robots.txt content
    ///
    /// # Parsing Rules
    ///
    /// - Blank lines and lines starting with `#` are ignored
    /// - Directive names are case-insensitive
    /// - `User-agent:` opens a block; the block applies only when its token is exactly `*`
    /// - Inside a `*` block, each non-empty `Disallow:` value is recorded
    ///   (an empty value disallows nothing)
    /// - `Sitemap:` lines are recorded regardless of the current block
    /// - Every other directive is ignored
    ///
    /// # Example
    ///
    /// ```
    /// use potator_crawler::robots::RobotsRules;
    ///
    /// let rules = RobotsRules::parse("User-agent: *\nDisallow: /private\n");
    /// assert!(!rules.is_allowed("/private/x"));
    /// assert!(rules.is_allowed("/public"));
    /// ```
    pub fn parse(content: &str) -> Self {
        let mut rules = Self::default();
        let mut in_wildcard_block = false;

        for line in content.lines() {
            let trimmed = line.trim();

            if trimmed.is_empty() || trimmed.starts_with('#') {
                continue;
            }

            let Some((key, value)) = trimmed.split_once(':') else {
                continue;
            };
            let value = value.trim();

            match key.trim().to_lowercase().as_str() {
                "user-agent" => {
                    in_wildcard_block = value == "*";
                }
                "disallow" => {
                    if in_wildcard_block && !value.is_empty() {
                        rules.disallow_prefixes.push(value.to_string());
                    }
                }
                "sitemap" => {
                    if !value.is_empty() {
                        rules.sitemap_urls.push(value.to_string());
                    }
                }
                _ => {}
            }
        }

        rules
    }

    /// Returns false iff some disallow prefix is a prefix of `path`
    pub fn is_allowed(&self, path: &str) -> bool {
        !self
            .disallow_prefixes
            .iter()
            .any(|prefix| path.starts_with(prefix.as_str()))
    }

    pub fn disallow_prefixes(&self) -> &[String] {
        &self.disallow_prefixes
    }

    pub fn sitemap_urls(&self) -> &[String] {
        &self.sitemap_urls
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_allow_all() {
        let robots = RobotsRules::allow_all();
        assert!(robots.is_allowed("/any/path"));
        assert!(robots.is_allowed("/admin"));
    }

    #[test]
    fn test_parse_disallow_all() {
        let robots = RobotsRules::parse("User-agent: *\nDisallow: /");
        assert!(!robots.is_allowed("/"));
        assert!(!robots.is_allowed("/page"));
    }

    #[test]
    fn test_parse_disallow_specific() {
        let robots = RobotsRules::parse("User-agent: *\nDisallow: /admin");
        assert!(robots.is_allowed("/"));
        assert!(robots.is_allowed("/page"));
        assert!(!robots.is_allowed("/admin"));
        assert!(!robots.is_allowed("/admin/users"));
    }

    #[test]
    fn test_empty_disallow_means_nothing() {
        let robots = RobotsRules::parse("User-agent: *\nDisallow:\n");
        assert!(robots.disallow_prefixes().is_empty());
        assert!(robots.is_allowed("/anything"));
    }

    #[test]
    fn test_other_agents_ignored() {
        let content = "User-agent: BadBot\nDisallow: /\n\nUser-agent: *\nDisallow: /tmp";
        let robots = RobotsRules::parse(content);
        assert_eq!(robots.disallow_prefixes(), ["/tmp".to_string()]);
        assert!(robots.is_allowed("/page"));
    }

    #[test]
    fn test_agent_token_is_exact() {
        // Only a literal "*" opens the wildcard block
        let robots = RobotsRules::parse("User-agent: *bot\nDisallow: /x");
        assert!(robots.is_allowed("/x"));
    }

    #[test]
    fn test_directive_names_case_insensitive() {
        let robots = RobotsRules::parse("USER-AGENT: *\ndisallow: /secret\nSITEMAP: https://example.com/s.xml");
        assert!(!robots.is_allowed("/secret"));
        assert_eq!(robots.sitemap_urls(), ["https://example.com/s.xml".to_string()]);
    }

    #[test]
    fn test_sitemaps_from_any_block() {
        let content = "Sitemap: https://example.com/a.xml\nUser-agent: Googlebot\nSitemap: https://example.com/b.xml\nDisallow: /g";
        let robots = RobotsRules::parse(content);
        assert_eq!(robots.sitemap_urls().len(), 2);
        assert!(robots.is_allowed("/g"));
    }

    #[test]
    fn test_comments_and_unknown_directives_skipped() {
        let content = "# comment\nUser-agent: *\nCrawl-delay: 10\nAllow: /private/ok\nDisallow: /private\nnonsense line";
        let robots = RobotsRules::parse(content);
        assert_eq!(robots.disallow_prefixes(), ["/private".to_string()]);
        // Allow is not interpreted
        assert!(!robots.is_allowed("/private/ok"));
    }

    #[test]
    fn test_empty_robots_txt() {
        let robots = RobotsRules::parse("");
        assert_eq!(robots, RobotsRules::allow_all());
    }
}
