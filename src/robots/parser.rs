use robotstxt::DefaultMatcher;

/// A robots.txt file for one host
#[derive(Debug, Clone, Default)]
pub struct ParsedRobots {
    /// Raw file content; empty means everything is allowed
    content: String,
}

impl ParsedRobots {
    pub fn from_content(content: &str) -> Self {
        Self {
            content: content.to_string(),
        }
    }

    /// Used when the host has no robots.txt or it could not be fetched
    pub fn allow_all() -> Self {
        Self::default()
    }

    /// Checks whether `url` may be fetched by `user_agent`
    ///
    /// `url` is the absolute request URL; only its path and query are matched.
    pub fn is_allowed(&self, url: &str, user_agent: &str) -> bool {
        if self.content.trim().is_empty() {
            return true;
        }

        let mut matcher = DefaultMatcher::default();
        matcher.one_agent_allowed_by_robots(&self.content, user_agent, url)
    }
}
