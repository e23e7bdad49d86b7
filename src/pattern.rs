//! Wildcard search patterns.
//!
//! Users type plain text where `*` stands for "any run of characters".
//! Every other character, regex metacharacters included, matches itself.
//! Matching is case-insensitive and unanchored.

use crate::error::QueryError;
use regex::{Regex, RegexBuilder};

/// A compiled wildcard pattern.
#[derive(Debug, Clone)]
pub enum WildcardPattern {
    /// The empty pattern; matches everything and never compiles a regex.
    Any,
    Regex(Regex),
}

impl WildcardPattern {
    pub fn compile(pattern: &str) -> Result<Self, QueryError> {
        if pattern.is_empty() {
            return Ok(WildcardPattern::Any);
        }
        RegexBuilder::new(&translate(pattern))
            .case_insensitive(true)
            .build()
            .map(WildcardPattern::Regex)
            .map_err(|e| QueryError::InvalidPattern {
                pattern: pattern.to_string(),
                reason: e.to_string(),
            })
    }

    pub fn is_match(&self, text: &str) -> bool {
        match self {
            WildcardPattern::Any => true,
            WildcardPattern::Regex(re) => re.is_match(text),
        }
    }

    pub fn regex(&self) -> Option<&Regex> {
        match self {
            WildcardPattern::Any => None,
            WildcardPattern::Regex(re) => Some(re),
        }
    }
}

/// Translate a wildcard pattern to regex source: escape every
/// metacharacter, then let each `*` match any run of characters.
pub fn translate(pattern: &str) -> String {
    pattern
        .split('*')
        .map(regex::escape)
        .collect::<Vec<_>>()
        .join(".*")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_star_matches_any_run() {
        let p = WildcardPattern::compile("J*n").unwrap();
        assert!(p.is_match("John"));
        assert!(p.is_match("Jon"));
        assert!(p.is_match("Jackson"));
        assert!(!p.is_match("Jack"));
    }

    #[test]
    fn test_case_insensitive_and_unanchored() {
        let p = WildcardPattern::compile("smith").unwrap();
        assert!(p.is_match("Agent SMITH"));
    }

    #[test]
    fn test_dot_is_literal() {
        let p = WildcardPattern::compile("a.c").unwrap();
        assert!(p.is_match("a.c"));
        assert!(!p.is_match("abc"));
    }

    #[test]
    fn test_metacharacters_are_literal() {
        for literal in ["1+1", "(x)", "[a]", "a|b", "^$", "{2}", "q?", r"back\slash"] {
            let p = WildcardPattern::compile(literal).unwrap();
            assert!(p.is_match(literal), "{} should match itself", literal);
        }
        assert!(!WildcardPattern::compile("a|b").unwrap().is_match("a"));
        assert!(!WildcardPattern::compile("[a]").unwrap().is_match("a"));
    }

    #[test]
    fn test_translate() {
        assert_eq!(translate("J*n"), "J.*n");
        assert_eq!(translate("a.b*"), r"a\.b.*");
        assert_eq!(translate("**"), ".*.*");
    }

    #[test]
    fn test_oversized_pattern_is_invalid() {
        let pattern = "é*".repeat(200_000);
        match WildcardPattern::compile(&pattern) {
            Err(QueryError::InvalidPattern { pattern: rejected, reason }) => {
                assert_eq!(rejected, pattern);
                assert!(!reason.is_empty());
            }
            other => panic!("expected InvalidPattern, got {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn test_empty_pattern_matches_all_without_regex() {
        let p = WildcardPattern::compile("").unwrap();
        assert!(p.regex().is_none());
        assert!(p.is_match(""));
        assert!(p.is_match("anything"));
    }
}
