//! Secret-code heuristics for scraped pages.

use once_cell::sync::Lazy;

use crate::services::matchers::{first_match, MatcherRule, RuleMatch};

/// Minimum length of a token picked up by the word scan.
pub const MIN_WORD_CODE_LEN: usize = 6;

/// Characters an LLM tends to wrap a bare code in.
const WRAPPING_CHARS: &[char] = &['`', '"', '\'', '{', '}', '(', ')', '<', '>'];

static SECRET_CODE_RULES: Lazy<Vec<MatcherRule>> = Lazy::new(|| {
    vec![
        MatcherRule::new("secret_code_is", r"(?i)secret\s*code\s+is\s+(\d+)", 1),
        MatcherRule::new("secret_code_label", r"(?i)secret\s*code[:\s]+(\d+)", 1),
        MatcherRule::new("code_is", r"(?i)code[:\s]+is[:\s]+(\d+)", 1),
        MatcherRule::new("answer_is", r"(?i)answer[:\s]+is[:\s]+(\d+)", 1),
        MatcherRule::new("bold_tag", r"(?i)<strong>(\w+)</strong>", 1),
        MatcherRule::new("long_number", r"\b(\d{5,})\b", 1),
        MatcherRule::new("uppercase_token", r"\b([A-Z0-9]{6,})\b", 1),
    ]
});

/// First code found by the ordered pattern list.
pub fn match_code_patterns(text: &str) -> Option<RuleMatch> {
    first_match(&SECRET_CODE_RULES, text, |value| Some(value.to_string()))
}

/// First whitespace-delimited, fully alphanumeric token of at least six characters.
pub fn scan_words_for_code(text: &str) -> Option<String> {
    text.split_whitespace()
        .find(|word| {
            word.chars().count() >= MIN_WORD_CODE_LEN && word.chars().all(char::is_alphanumeric)
        })
        .map(str::to_string)
}

/// Trims an LLM reply down to the bare code.
pub fn strip_wrapping(raw: &str) -> String {
    raw.trim().trim_matches(WRAPPING_CHARS).to_string()
}

/// Pattern match, then word scan. `None` means only the LLM is left.
pub fn extract_code_heuristically(text: &str) -> Option<String> {
    if let Some(found) = match_code_patterns(text) {
        log::info!("Found secret code via rule '{}': {}", found.rule, found.value);
        return Some(found.value);
    }

    let scanned = scan_words_for_code(text);
    if let Some(code) = &scanned {
        log::info!("Found likely secret code by word scan: {}", code);
    }
    scanned
}
