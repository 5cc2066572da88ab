//! Ordered, tagged regex rules with first-match-wins evaluation.

use regex::Regex;

/// A named pattern and the capture group holding its value (0 = whole match).
#[derive(Debug)]
pub struct MatcherRule {
    pub name: &'static str,
    pattern: Regex,
    group: usize,
}

/// The value a rule produced, tagged with the rule that produced it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleMatch {
    pub rule: &'static str,
    pub value: String,
}

impl MatcherRule {
    /// Builds a rule from a pattern known at compile time.
    pub fn new(name: &'static str, pattern: &str, group: usize) -> Self {
        let pattern = Regex::new(pattern)
            .unwrap_or_else(|e| panic!("matcher rule '{}' has an invalid pattern: {}", name, e));
        Self {
            name,
            pattern,
            group,
        }
    }

    pub fn find<'t>(&self, text: &'t str) -> Option<&'t str> {
        self.pattern
            .captures(text)
            .and_then(|caps| caps.get(self.group))
            .map(|m| m.as_str())
    }

    pub fn find_all<'t>(&'t self, text: &'t str) -> impl Iterator<Item = &'t str> + 't {
        self.pattern
            .captures_iter(text)
            .filter_map(move |caps| caps.get(self.group))
            .map(|m| m.as_str())
    }
}

/// Runs `rules` in order and returns the first value accepted by `accept`.
pub fn first_match<F>(rules: &[MatcherRule], text: &str, mut accept: F) -> Option<RuleMatch>
where
    F: FnMut(&str) -> Option<String>,
{
    rules.iter().find_map(|rule| {
        rule.find(text).and_then(&mut accept).map(|value| RuleMatch {
            rule: rule.name,
            value,
        })
    })
}
