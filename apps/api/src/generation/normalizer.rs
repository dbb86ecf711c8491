//! Record Normalizer — maps a loosely shaped model object onto `ProblemRecord`.
//!
//! Normalization is total: any JSON value yields a record that satisfies every
//! record invariant. Missing or invalid fields fall back to the request context
//! or to per-type defaults; nothing is rejected.

use std::collections::BTreeMap;

use chrono::Utc;
use serde_json::{Map, Value};

use crate::models::problem::{
    new_problem_id, Operation, ProblemBody, ProblemRecord, ProblemType, Quantity, SimpleKind,
    Slots, Step, MAX_GRADE, MAX_STEPS, MIN_GRADE,
};

/// Fallbacks taken from the generation request.
#[derive(Debug, Clone, Copy)]
pub struct RecordContext {
    pub grade: u8,
    pub problem_type: ProblemType,
}

impl Default for RecordContext {
    fn default() -> Self {
        RecordContext {
            grade: MIN_GRADE,
            problem_type: ProblemType::default(),
        }
    }
}

/// Normalizes one raw object into a canonical record.
pub fn normalize_problem(raw: &Value, ctx: &RecordContext) -> ProblemRecord {
    let empty = Map::new();
    let obj = raw.as_object().unwrap_or(&empty);

    let problem_type = field(obj, &["type"])
        .and_then(Value::as_str)
        .and_then(ProblemType::parse)
        .unwrap_or(ctx.problem_type);

    let body = match problem_type {
        ProblemType::Simple(kind) => ProblemBody::simple(kind, normalize_slots(kind, obj)),
        ProblemType::DosOperaciones => ProblemBody::DosOperaciones {
            steps: normalize_steps(field(obj, &["steps"])),
        },
    };

    ProblemRecord {
        id: text(obj, &["id"])
            .filter(|id| !id.trim().is_empty())
            .unwrap_or_else(new_problem_id),
        grade: grade(field(obj, &["grade"])).unwrap_or(ctx.grade),
        body,
        question: text(obj, &["question"]).unwrap_or_default(),
        answer: quantity(field(obj, &["answer"])),
        full_answer: text(obj, &["fullAnswer", "full_answer"]).unwrap_or_default(),
        hint: text(obj, &["hint"]).unwrap_or_default(),
        logic_check: text(obj, &["logicCheck", "logic_check"]).unwrap_or_default(),
        created_at: field(obj, &["createdAt", "created_at"])
            .and_then(Value::as_i64)
            .unwrap_or_else(|| Utc::now().timestamp_millis()),
    }
}

fn normalize_steps(raw: Option<&Value>) -> Vec<Step> {
    let Some(items) = raw.and_then(Value::as_array) else {
        return Vec::new();
    };
    items
        .iter()
        .take(MAX_STEPS)
        .map(|item| {
            let empty = Map::new();
            let obj = item.as_object().unwrap_or(&empty);
            let kind = field(obj, &["type"])
                .and_then(Value::as_str)
                .and_then(SimpleKind::parse)
                .unwrap_or(SimpleKind::Ppt);
            Step {
                kind,
                slots: normalize_slots(kind, obj),
                answer: quantity(field(obj, &["answer"])),
                hint: text(obj, &["hint"]).unwrap_or_default(),
            }
        })
        .collect()
}

/// Reshapes `data`, `labels` and `operation` into exactly the key set of `kind`.
fn normalize_slots(kind: SimpleKind, obj: &Map<String, Value>) -> Slots {
    let data = field(obj, &["data"]).and_then(Value::as_object);
    let labels = field(obj, &["labels"]).and_then(Value::as_object);

    let data: BTreeMap<String, Quantity> = kind
        .keys()
        .iter()
        .map(|key| (key.to_string(), quantity(data.and_then(|d| d.get(*key)))))
        .collect();

    let labels: BTreeMap<String, String> = kind
        .keys()
        .iter()
        .map(|key| {
            let label = labels
                .and_then(|l| l.get(*key))
                .and_then(value_text)
                .filter(|l| !l.trim().is_empty())
                .unwrap_or_else(|| kind.default_label(key).to_string());
            (key.to_string(), label)
        })
        .collect();

    let operation = field(obj, &["operation"])
        .and_then(Value::as_str)
        .and_then(Operation::parse)
        .unwrap_or_default();

    Slots {
        data,
        labels,
        operation,
    }
}

/// First present, non-null value among `keys`.
fn field<'a>(obj: &'a Map<String, Value>, keys: &[&str]) -> Option<&'a Value> {
    keys.iter()
        .filter_map(|k| obj.get(*k))
        .find(|v| !v.is_null())
}

fn text(obj: &Map<String, Value>, keys: &[&str]) -> Option<String> {
    field(obj, keys).and_then(value_text)
}

/// Strings pass through; numbers and booleans are stringified.
fn value_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn quantity(value: Option<&Value>) -> Quantity {
    match value {
        Some(Value::String(s)) => Quantity::coerce(s),
        Some(Value::Number(n)) => Quantity::from_number(n),
        _ => Quantity::Unknown,
    }
}

fn grade(value: Option<&Value>) -> Option<u8> {
    let n = match value? {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => s.trim().parse::<f64>().ok()?,
        _ => return None,
    };
    if !n.is_finite() {
        return None;
    }
    Some(n.round().clamp(f64::from(MIN_GRADE), f64::from(MAX_GRADE)) as u8)
}
