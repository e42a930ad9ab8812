//! Final-answer extraction.
//!
//! The model is asked for a JSON chart definition but often wraps it in
//! prose or a fenced block. [`extract_result`] tries, in order:
//!
//! 1. the whole trimmed text as JSON,
//! 2. the body of a ```` ```json ```` fenced block,
//! 3. balanced `{...}` spans, in order of appearance,
//!
//! and only accepts an object or array. Anything else is wrapped as
//! `{"type": "text", "content": <raw>}`. The function never fails.

use std::sync::LazyLock;

use regex::Regex;
use serde_json::{Value, json};

static JSON_FENCE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)```[ \t]*(?i:json)\b[^\n]*\n(.*?)```").expect("valid fence pattern")
});

/// Extract the structured answer from the model's final text.
pub fn extract_result(text: &str) -> Value {
    parse_direct(text)
        .or_else(|| parse_fenced(text))
        .or_else(|| parse_braced(text))
        .unwrap_or_else(|| wrap_text(text))
}

/// Whether the text is, on its own, the structured final answer.
///
/// Only the unambiguous forms count; a brace span inside prose does not.
pub fn is_structured_answer(text: &str) -> bool {
    parse_direct(text).is_some() || parse_fenced(text).is_some()
}

fn structured(candidate: &str) -> Option<Value> {
    serde_json::from_str::<Value>(candidate.trim())
        .ok()
        .filter(|value| value.is_object() || value.is_array())
}

fn parse_direct(text: &str) -> Option<Value> {
    structured(text)
}

fn parse_fenced(text: &str) -> Option<Value> {
    JSON_FENCE
        .captures_iter(text)
        .filter_map(|caps| caps.get(1))
        .find_map(|body| structured(body.as_str()))
}

fn parse_braced(text: &str) -> Option<Value> {
    text.char_indices()
        .filter(|&(_, ch)| ch == '{')
        .filter_map(|(start, _)| balanced_end(text, start).map(|end| &text[start..end]))
        .find_map(structured)
}

/// End (exclusive) of the brace span opening at `start`, skipping braces
/// inside JSON strings.
fn balanced_end(text: &str, start: usize) -> Option<usize> {
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (offset, ch) in text[start..].char_indices() {
        if in_string {
            if escaped {
                escaped = false;
            } else if ch == '\\' {
                escaped = true;
            } else if ch == '"' {
                in_string = false;
            }
            continue;
        }
        match ch {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(start + offset + 1);
                }
            }
            _ => {}
        }
    }
    None
}

fn wrap_text(text: &str) -> Value {
    json!({"type": "text", "content": text})
}
