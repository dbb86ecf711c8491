//! Serialized form of the problem collection stored in the remote file.

use serde_json::Value;
use tracing::warn;

use crate::generation::normalizer::{normalize_problem, RecordContext};
use crate::models::problem::{find_duplicate_id, ProblemRecord};

/// Reads the stored collection, repairing each entry through the normalizer.
///
/// Content that is not a JSON array (or an object with a `problems` array)
/// degrades to an empty collection instead of failing the read.
pub fn parse_collection(content: &str) -> Vec<ProblemRecord> {
    if content.trim().is_empty() {
        return Vec::new();
    }

    let items = match serde_json::from_str::<Value>(content) {
        Ok(Value::Array(items)) => items,
        Ok(Value::Object(mut map)) => match map.remove("problems") {
            Some(Value::Array(items)) => items,
            _ => {
                warn!("Stored collection is an object without a problems array; reading as empty");
                return Vec::new();
            }
        },
        Ok(_) => {
            warn!("Stored collection is not a JSON array; reading as empty");
            return Vec::new();
        }
        Err(e) => {
            warn!("Stored collection is not valid JSON ({e}); reading as empty");
            return Vec::new();
        }
    };

    let ctx = RecordContext::default();
    items
        .iter()
        .map(|item| normalize_problem(item, &ctx))
        .collect()
}

/// Pretty JSON with a trailing newline, so diffs in the repository stay readable.
pub fn serialize_collection(problems: &[ProblemRecord]) -> Result<String, serde_json::Error> {
    let mut out = serde_json::to_string_pretty(problems)?;
    out.push('\n');
    Ok(out)
}

/// Checks every record's invariants and that ids are unique across the collection.
pub fn validate_collection(problems: &[ProblemRecord]) -> Result<(), String> {
    for problem in problems {
        problem.check_invariants()?;
    }
    if let Some(id) = find_duplicate_id(problems) {
        return Err(format!("duplicate problem id '{id}'"));
    }
    Ok(())
}
