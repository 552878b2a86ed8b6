use crate::error::{RerunError, Result};
use regex::Regex;

/// Matches page URLs against userscript-style wildcard patterns
#[derive(Debug, Clone)]
pub struct UrlMatcher {
    patterns: Vec<Regex>,
}

impl UrlMatcher {
    /// Compile patterns where `*` matches any run of characters
    pub fn new(patterns: &[String]) -> Result<Self> {
        let patterns = patterns
            .iter()
            .map(|pattern| {
                let body = pattern.split('*').map(regex::escape).collect::<Vec<_>>().join(".*");
                Regex::new(&format!("^{}$", body))
                    .map_err(|e| RerunError::Config(format!("invalid URL pattern '{}': {}", pattern, e)))
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { patterns })
    }

    pub fn matches(&self, url: &str) -> bool {
        self.patterns.iter().any(|p| p.is_match(url))
    }
}
