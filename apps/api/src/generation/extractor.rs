//! Response Extractor — pulls the JSON payload out of a free-text model reply.
//!
//! Replies arrive wrapped in ``` fences, surrounded by prose, or as a single
//! object instead of an array. The extractor isolates the payload, parses it,
//! and always hands back a list of raw objects for the normalizer.

use serde_json::Value;
use thiserror::Error;

const FENCE: &str = "```";

#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("model reply is not valid JSON: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("model reply JSON is neither an array nor an object")]
    UnexpectedShape,
}

/// Extracts the list of raw problem objects from a model reply.
///
/// 1. With at least two fences, keep only the first fenced block and drop its language tag.
/// 2. Slice from the first `[`/`{` to the last `]`/`}`.
/// 3. Parse; on failure strip every fence from the whole reply, re-slice and parse once more.
/// 4. A bare object becomes a one-element list.
pub fn extract_records(reply: &str) -> Result<Vec<Value>, ExtractError> {
    let candidate = bracket_span(unfence(reply));

    let parsed = match serde_json::from_str::<Value>(candidate) {
        Ok(value) => value,
        Err(first_error) => {
            let cleaned = reply.replace(FENCE, "");
            serde_json::from_str::<Value>(bracket_span(&cleaned))
                .map_err(|_| ExtractError::Parse(first_error))?
        }
    };

    into_records(parsed)
}

/// Returns the body of the first fenced block, or the whole text when it is not fenced.
fn unfence(text: &str) -> &str {
    if text.matches(FENCE).count() < 2 {
        return text;
    }
    let Some(open) = text.find(FENCE) else {
        return text;
    };
    let body_start = open + FENCE.len();
    let body = match text[body_start..].find(FENCE) {
        Some(close) => &text[body_start..body_start + close],
        None => &text[body_start..],
    };
    strip_language_tag(body)
}

/// Drops a leading info string such as `json` or `JSON5` that sits right after the opening fence.
fn strip_language_tag(body: &str) -> &str {
    let tag_len = body
        .find(|c: char| !c.is_ascii_alphanumeric())
        .unwrap_or(body.len());
    if tag_len == 0 {
        return body;
    }
    let rest = &body[tag_len..];
    if rest.starts_with(char::is_whitespace) {
        rest
    } else {
        body
    }
}

/// Slices from the first opening bracket to the last closing bracket.
fn bracket_span(text: &str) -> &str {
    let start = text.find(|c: char| c == '[' || c == '{');
    let end = text.rfind(|c: char| c == ']' || c == '}');
    match (start, end) {
        (Some(start), Some(end)) if end > start => &text[start..=end],
        _ => text.trim(),
    }
}

fn into_records(parsed: Value) -> Result<Vec<Value>, ExtractError> {
    match parsed {
        Value::Array(items) => Ok(items),
        Value::Object(mut map) => match map.remove("problems") {
            Some(Value::Array(items)) => Ok(items),
            Some(other) => {
                map.insert("problems".to_string(), other);
                Ok(vec![Value::Object(map)])
            }
            None => Ok(vec![Value::Object(map)]),
        },
        _ => Err(ExtractError::UnexpectedShape),
    }
}
