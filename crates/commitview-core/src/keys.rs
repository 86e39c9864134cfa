//! Issue key extraction from commit messages

use regex::Regex;
use std::collections::HashSet;

/// Finds issue keys in free text
pub trait KeyExtractor: Send + Sync {
    /// Every distinct issue key in `text`, uppercased, in order of first appearance
    fn extract_keys(&self, text: &str) -> Vec<String>;

    fn has_key(&self, text: &str) -> bool {
        !self.extract_keys(text).is_empty()
    }
}

/// Project part of an issue key: everything before the last hyphen
pub fn project_key(issue_key: &str) -> &str {
    issue_key
        .rsplit_once('-')
        .map(|(project, _)| project)
        .unwrap_or(issue_key)
}

/// Regex-based extractor for keys shaped like `ABC-123`
///
/// Matching is case-insensitive: the text is uppercased before scanning.
pub struct PatternKeyExtractor {
    pattern: Regex,
}

/// Default issue key shape: a letter, one or more letters/digits/underscores, a hyphen, digits
pub const DEFAULT_KEY_PATTERN: &str = r"\b([A-Z][A-Z_0-9]+-[0-9]+)\b";

impl PatternKeyExtractor {
    pub fn new() -> Result<Self, regex::Error> {
        Self::with_pattern(DEFAULT_KEY_PATTERN)
    }

    /// Builds an extractor from a custom pattern; capture group 1 must hold the key
    pub fn with_pattern(pattern: &str) -> Result<Self, regex::Error> {
        Ok(Self {
            pattern: Regex::new(pattern)?,
        })
    }
}

impl KeyExtractor for PatternKeyExtractor {
    fn extract_keys(&self, text: &str) -> Vec<String> {
        let upper = text.to_uppercase();
        let mut seen = HashSet::new();
        self.pattern
            .captures_iter(&upper)
            .filter_map(|caps| caps.get(1))
            .map(|m| m.as_str().to_string())
            .filter(|key| seen.insert(key.clone()))
            .collect()
    }

    fn has_key(&self, text: &str) -> bool {
        self.pattern.is_match(&text.to_uppercase())
    }
}
