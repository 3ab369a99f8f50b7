/// Answer normalisation helpers shared by the text and structured strategies
use crate::bank::question::value_text;
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};

static INTEGER: Lazy<Regex> = Lazy::new(|| Regex::new(r"\d+").expect("valid integer pattern"));

/// Trim and collapse every whitespace run to one space
pub fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Trimmed, case-insensitive equality
pub fn eq_ignore_case_trimmed(a: &str, b: &str) -> bool {
    a.trim().to_lowercase() == b.trim().to_lowercase()
}

/// Every non-negative integer literal in `text`; out-of-range runs are ignored
pub fn extract_integers(text: &str) -> BTreeSet<u64> {
    INTEGER
        .find_iter(text)
        .filter_map(|m| m.as_str().parse().ok())
        .collect()
}

/// Parse a flat JSON object of answers.
/// Anything that is not an object degrades to an empty map; non-string values are rendered as text.
pub fn parse_answer_map(answer: &str) -> BTreeMap<String, String> {
    match serde_json::from_str::<Value>(answer) {
        Ok(Value::Object(entries)) => entries
            .into_iter()
            .map(|(key, value)| (key, value_text(&value)))
            .collect(),
        Ok(_) => {
            log::debug!("Structured answer is not a JSON object; treating as empty");
            BTreeMap::new()
        }
        Err(e) => {
            log::debug!("Structured answer is not valid JSON ({}); treating as empty", e);
            BTreeMap::new()
        }
    }
}
