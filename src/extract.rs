//! Recovering structured data from free-text model replies
//!
//! Models are asked for a single fenced JSON block but do not always comply.
//! Every function here is total over arbitrary input: formatting variance is
//! tolerated, parse failures return `None`, nothing panics.

use regex::Regex;
use serde_json::Value;
use std::sync::OnceLock;

fn fenced_json_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?s)```json\s*(.*?)```").expect("valid regex"))
}

fn bare_object_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?s)(\{.*\})").expect("valid regex"))
}

fn strict_integer_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^\s*(\d+)\s*$").expect("valid regex"))
}

fn any_integer_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\d+").expect("valid regex"))
}

/// Recover an embedded JSON value from a model reply.
///
/// Prefers a fenced ```json block; falls back to the widest `{...}` span.
/// Returns `None` if no candidate is found or the candidate fails to parse.
pub fn extract_json(raw: &str) -> Option<Value> {
    let candidate = fenced_json_re()
        .captures(raw)
        .and_then(|c| c.get(1))
        .or_else(|| bare_object_re().captures(raw).and_then(|c| c.get(1)))?
        .as_str();

    match serde_json::from_str(candidate) {
        Ok(value) => Some(value),
        Err(err) => {
            tracing::warn!(error = %err, "reply contained JSON-looking content that failed to parse");
            None
        }
    }
}

/// Parse a bare-integer reply to the step-count prompt.
///
/// A strict full-match is preferred; if the model wrapped the number in
/// prose, the first integer-looking substring is taken instead.
pub fn parse_step_count(raw: &str) -> Option<u32> {
    if let Some(captures) = strict_integer_re().captures(raw) {
        return captures.get(1)?.as_str().parse().ok();
    }
    any_integer_re()
        .find(raw)
        .and_then(|m| m.as_str().parse().ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_fenced_json_block() {
        let raw = "Sure! Here is the recipe:\n```json\n{\"name\": \"Pasta\"}\n```\nEnjoy!";
        let value = extract_json(raw).unwrap();
        assert_eq!(value["name"], "Pasta");
    }

    #[test]
    fn extracts_bare_braces_spanning_newlines() {
        let raw = "The result is {\n  \"servings\": 4\n} as requested.";
        let value = extract_json(raw).unwrap();
        assert_eq!(value["servings"], 4);
    }

    #[test]
    fn prefers_fenced_block_over_surrounding_prose() {
        let raw = "{not json} ```json {\"ok\": true} ``` trailing";
        let value = extract_json(raw).unwrap();
        assert_eq!(value["ok"], true);
    }

    #[test]
    fn returns_none_without_json_content() {
        assert!(extract_json("no structured data here").is_none());
        assert!(extract_json("").is_none());
    }

    #[test]
    fn returns_none_on_malformed_json() {
        assert!(extract_json("```json\n{\"name\": }\n```").is_none());
        assert!(extract_json("{broken: yes,}").is_none());
    }

    #[test]
    fn step_count_strict_match() {
        assert_eq!(parse_step_count("  7  "), Some(7));
        assert_eq!(parse_step_count("3"), Some(3));
    }

    #[test]
    fn step_count_falls_back_to_first_integer() {
        assert_eq!(parse_step_count("The recipe has 5 steps in total."), Some(5));
    }

    #[test]
    fn step_count_none_without_digits() {
        assert_eq!(parse_step_count("I cannot tell."), None);
    }
}
