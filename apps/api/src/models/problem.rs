//! Canonical arithmetic word-problem records.
//!
//! A record is a tagged union over the five problem types. The four simple
//! types share the same body shape (`data`, `labels`, `operation`) with a fixed
//! key set per type; `DOS_OPERACIONES` carries up to two chained steps instead.

use std::collections::{BTreeMap, HashSet};
use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Marks the quantity the student has to find.
pub const UNKNOWN_TOKEN: &str = "?";
/// Marks a step input that takes the previous step's result.
pub const PREVIOUS_RESULT_TOKEN: &str = "RESULTADO_ANTERIOR";

pub const MIN_GRADE: u8 = 1;
pub const MAX_GRADE: u8 = 6;
pub const MAX_STEPS: usize = 2;

const ID_LEN: usize = 9;

// ────────────────────────────────────────────────────────────────────────────
// Quantities
// ────────────────────────────────────────────────────────────────────────────

/// A numeric slot value: a decimal string or one of the two sentinels.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "RawQuantity", into = "String")]
pub enum Quantity {
    Number(String),
    #[default]
    Unknown,
    PreviousResult,
}

impl Quantity {
    /// Coerces free text into a quantity.
    ///
    /// Decimal commas become points and every character other than digits,
    /// `.`, `-` and `?` is dropped. Text that ends up empty, holding a `?`,
    /// or not reading as a decimal number is the unknown sentinel.
    pub fn coerce(raw: &str) -> Self {
        let trimmed = raw.trim();
        if trimmed.eq_ignore_ascii_case(PREVIOUS_RESULT_TOKEN) {
            return Quantity::PreviousResult;
        }

        let cleaned: String = trimmed
            .replace(',', ".")
            .chars()
            .filter(|c| c.is_ascii_digit() || matches!(c, '.' | '-' | '?'))
            .collect();

        if cleaned.contains('?') || cleaned.parse::<f64>().is_err() {
            Quantity::Unknown
        } else {
            Quantity::Number(cleaned)
        }
    }

    /// Converts a JSON number without going through exponent notation.
    pub fn from_number(n: &serde_json::Number) -> Self {
        let text = match (n.as_i64(), n.as_u64(), n.as_f64()) {
            (Some(i), _, _) => i.to_string(),
            (None, Some(u), _) => u.to_string(),
            // f64's Display always prints positional digits
            (None, None, Some(f)) if f.is_finite() => f.to_string(),
            _ => return Quantity::Unknown,
        };
        Quantity::coerce(&text)
    }

    pub fn as_str(&self) -> &str {
        match self {
            Quantity::Number(n) => n,
            Quantity::Unknown => UNKNOWN_TOKEN,
            Quantity::PreviousResult => PREVIOUS_RESULT_TOKEN,
        }
    }

    pub fn is_unknown(&self) -> bool {
        matches!(self, Quantity::Unknown)
    }
}

impl fmt::Display for Quantity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<Quantity> for String {
    fn from(q: Quantity) -> Self {
        match q {
            Quantity::Number(n) => n,
            other => other.as_str().to_string(),
        }
    }
}

/// Wire form accepted for a quantity: models and editors send both strings and bare numbers.
#[derive(Deserialize)]
#[serde(untagged)]
enum RawQuantity {
    Text(String),
    Number(serde_json::Number),
}

impl From<RawQuantity> for Quantity {
    fn from(raw: RawQuantity) -> Self {
        match raw {
            RawQuantity::Text(s) => Quantity::coerce(&s),
            RawQuantity::Number(n) => Quantity::from_number(&n),
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Operations and types
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Operation {
    #[default]
    #[serde(rename = "+")]
    Add,
    #[serde(rename = "-")]
    Subtract,
    #[serde(rename = "*")]
    Multiply,
    #[serde(rename = "/")]
    Divide,
}

impl Operation {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim() {
            "+" => Some(Operation::Add),
            "-" => Some(Operation::Subtract),
            "*" => Some(Operation::Multiply),
            "/" => Some(Operation::Divide),
            _ => None,
        }
    }
}

/// The single-operation problem types. Each one owns a fixed slot key set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SimpleKind {
    #[serde(rename = "PPT")]
    Ppt,
    #[serde(rename = "UVT")]
    Uvt,
    #[serde(rename = "COMPARACION")]
    Comparacion,
    #[serde(rename = "CAMBIO")]
    Cambio,
}

impl SimpleKind {
    pub const ALL: [SimpleKind; 4] = [
        SimpleKind::Ppt,
        SimpleKind::Uvt,
        SimpleKind::Comparacion,
        SimpleKind::Cambio,
    ];

    pub fn parse(raw: &str) -> Option<Self> {
        match ProblemType::parse(raw)? {
            ProblemType::Simple(kind) => Some(kind),
            ProblemType::DosOperaciones => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            SimpleKind::Ppt => "PPT",
            SimpleKind::Uvt => "UVT",
            SimpleKind::Comparacion => "COMPARACION",
            SimpleKind::Cambio => "CAMBIO",
        }
    }

    /// Slot keys for `data` and `labels`, in display order. The last key is the result.
    pub fn keys(self) -> &'static [&'static str; 3] {
        match self {
            SimpleKind::Ppt => &["p1", "p2", "t"],
            SimpleKind::Uvt => &["u", "v", "t"],
            SimpleKind::Comparacion => &["cm", "cmen", "d"],
            SimpleKind::Cambio => &["ci", "c", "cf"],
        }
    }

    pub fn result_key(self) -> &'static str {
        self.keys()[2]
    }

    pub fn default_label(self, key: &str) -> &'static str {
        match (self, key) {
            (SimpleKind::Ppt, "p1") => "Parte 1",
            (SimpleKind::Ppt, "p2") => "Parte 2",
            (SimpleKind::Ppt, "t") => "Total",
            (SimpleKind::Uvt, "u") => "Valor por unidad",
            (SimpleKind::Uvt, "v") => "Número de veces",
            (SimpleKind::Uvt, "t") => "Total",
            (SimpleKind::Comparacion, "cm") => "Cantidad mayor",
            (SimpleKind::Comparacion, "cmen") => "Cantidad menor",
            (SimpleKind::Comparacion, "d") => "Diferencia",
            (SimpleKind::Cambio, "ci") => "Cantidad inicial",
            (SimpleKind::Cambio, "c") => "Cambio",
            (SimpleKind::Cambio, "cf") => "Cantidad final",
            _ => "",
        }
    }
}

/// Any of the five record tags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProblemType {
    Simple(SimpleKind),
    DosOperaciones,
}

impl ProblemType {
    pub const DOS_OPERACIONES: &'static str = "DOS_OPERACIONES";

    /// Case-insensitive tag lookup.
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_uppercase().as_str() {
            "PPT" => Some(ProblemType::Simple(SimpleKind::Ppt)),
            "UVT" => Some(ProblemType::Simple(SimpleKind::Uvt)),
            "COMPARACION" => Some(ProblemType::Simple(SimpleKind::Comparacion)),
            "CAMBIO" => Some(ProblemType::Simple(SimpleKind::Cambio)),
            Self::DOS_OPERACIONES => Some(ProblemType::DosOperaciones),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ProblemType::Simple(kind) => kind.as_str(),
            ProblemType::DosOperaciones => Self::DOS_OPERACIONES,
        }
    }
}

impl Default for ProblemType {
    fn default() -> Self {
        ProblemType::Simple(SimpleKind::Ppt)
    }
}

impl fmt::Display for ProblemType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for ProblemType {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        ProblemType::parse(&raw)
            .ok_or_else(|| serde::de::Error::custom(format!("unknown problem type '{raw}'")))
    }
}

impl Serialize for ProblemType {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Record bodies
// ────────────────────────────────────────────────────────────────────────────

/// Quantities, captions and operation of one simple problem or step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Slots {
    pub data: BTreeMap<String, Quantity>,
    pub labels: BTreeMap<String, String>,
    #[serde(default)]
    pub operation: Operation,
}

/// One stage of a two-operation problem.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Step {
    #[serde(rename = "type")]
    pub kind: SimpleKind,
    #[serde(flatten)]
    pub slots: Slots,
    #[serde(default)]
    pub answer: Quantity,
    #[serde(default)]
    pub hint: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ProblemBody {
    #[serde(rename = "PPT")]
    Ppt(Slots),
    #[serde(rename = "UVT")]
    Uvt(Slots),
    #[serde(rename = "COMPARACION")]
    Comparacion(Slots),
    #[serde(rename = "CAMBIO")]
    Cambio(Slots),
    #[serde(rename = "DOS_OPERACIONES")]
    DosOperaciones { steps: Vec<Step> },
}

impl ProblemBody {
    pub fn simple(kind: SimpleKind, slots: Slots) -> Self {
        match kind {
            SimpleKind::Ppt => ProblemBody::Ppt(slots),
            SimpleKind::Uvt => ProblemBody::Uvt(slots),
            SimpleKind::Comparacion => ProblemBody::Comparacion(slots),
            SimpleKind::Cambio => ProblemBody::Cambio(slots),
        }
    }

    pub fn problem_type(&self) -> ProblemType {
        match self {
            ProblemBody::Ppt(_) => ProblemType::Simple(SimpleKind::Ppt),
            ProblemBody::Uvt(_) => ProblemType::Simple(SimpleKind::Uvt),
            ProblemBody::Comparacion(_) => ProblemType::Simple(SimpleKind::Comparacion),
            ProblemBody::Cambio(_) => ProblemType::Simple(SimpleKind::Cambio),
            ProblemBody::DosOperaciones { .. } => ProblemType::DosOperaciones,
        }
    }

    /// The simple kind and slots, or `None` for a two-operation body.
    pub fn as_simple(&self) -> Option<(SimpleKind, &Slots)> {
        match self {
            ProblemBody::Ppt(s) => Some((SimpleKind::Ppt, s)),
            ProblemBody::Uvt(s) => Some((SimpleKind::Uvt, s)),
            ProblemBody::Comparacion(s) => Some((SimpleKind::Comparacion, s)),
            ProblemBody::Cambio(s) => Some((SimpleKind::Cambio, s)),
            ProblemBody::DosOperaciones { .. } => None,
        }
    }

    pub fn steps(&self) -> &[Step] {
        match self {
            ProblemBody::DosOperaciones { steps } => steps,
            _ => &[],
        }
    }
}

/// A single arithmetic word problem as stored and served.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProblemRecord {
    pub id: String,
    pub grade: u8,
    #[serde(flatten)]
    pub body: ProblemBody,
    #[serde(default)]
    pub question: String,
    #[serde(default)]
    pub answer: Quantity,
    #[serde(default)]
    pub full_answer: String,
    #[serde(default)]
    pub hint: String,
    #[serde(default)]
    pub logic_check: String,
    pub created_at: i64,
}

impl ProblemRecord {
    pub fn problem_type(&self) -> ProblemType {
        self.body.problem_type()
    }

    /// Checks the per-record invariants. Returns a human-readable reason on failure.
    pub fn check_invariants(&self) -> Result<(), String> {
        if self.id.trim().is_empty() {
            return Err("problem id must not be empty".to_string());
        }
        if !(MIN_GRADE..=MAX_GRADE).contains(&self.grade) {
            return Err(format!(
                "problem {}: grade {} is outside {MIN_GRADE}..={MAX_GRADE}",
                self.id, self.grade
            ));
        }

        if let Some((kind, slots)) = self.body.as_simple() {
            return check_slot_keys(kind, slots).map_err(|e| format!("problem {}: {e}", self.id));
        }

        let steps = self.body.steps();
        if steps.len() > MAX_STEPS {
            return Err(format!(
                "problem {}: {} steps given, at most {MAX_STEPS} allowed",
                self.id,
                steps.len()
            ));
        }
        for (i, step) in steps.iter().enumerate() {
            check_slot_keys(step.kind, &step.slots)
                .map_err(|e| format!("problem {} step {}: {e}", self.id, i + 1))?;
        }
        Ok(())
    }
}

fn check_slot_keys(kind: SimpleKind, slots: &Slots) -> Result<(), String> {
    let expected: HashSet<&str> = kind.keys().iter().copied().collect();
    let data: HashSet<&str> = slots.data.keys().map(String::as_str).collect();
    let labels: HashSet<&str> = slots.labels.keys().map(String::as_str).collect();

    if data != expected {
        return Err(format!(
            "data keys for {} must be {:?}",
            kind.as_str(),
            kind.keys()
        ));
    }
    if labels != expected {
        return Err(format!(
            "labels keys for {} must be {:?}",
            kind.as_str(),
            kind.keys()
        ));
    }
    Ok(())
}

/// Returns the id of the first record whose id repeats an earlier one.
pub fn find_duplicate_id(records: &[ProblemRecord]) -> Option<&str> {
    let mut seen = HashSet::new();
    records
        .iter()
        .map(|r| r.id.as_str())
        .find(|id| !seen.insert(*id))
}

/// Fresh short opaque identifier.
pub fn new_problem_id() -> String {
    Uuid::new_v4().simple().to_string()[..ID_LEN].to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn ppt_record() -> ProblemRecord {
        let kind = SimpleKind::Ppt;
        ProblemRecord {
            id: "abc123def".to_string(),
            grade: 3,
            body: ProblemBody::simple(
                kind,
                Slots {
                    data: [
                        ("p1".to_string(), Quantity::Number("12".into())),
                        ("p2".to_string(), Quantity::Number("30".into())),
                        ("t".to_string(), Quantity::Unknown),
                    ]
                    .into(),
                    labels: kind
                        .keys()
                        .iter()
                        .map(|k| (k.to_string(), kind.default_label(k).to_string()))
                        .collect(),
                    operation: Operation::Add,
                },
            ),
            question: "¿Cuántas láminas tiene en total?".to_string(),
            answer: Quantity::Number("42".into()),
            full_answer: "Tiene 42 láminas.".to_string(),
            hint: "Suma las partes.".to_string(),
            logic_check: "42 es mayor que 12 y que 30.".to_string(),
            created_at: 1_700_000_000_000,
        }
    }

    #[test]
    fn test_coerce_decimal_comma() {
        assert_eq!(Quantity::coerce("12,5"), Quantity::Number("12.5".into()));
    }

    #[test]
    fn test_coerce_strips_currency() {
        assert_eq!(Quantity::coerce("$12"), Quantity::Number("12".into()));
        assert_eq!(Quantity::coerce(" 1500 pesos "), Quantity::Number("1500".into()));
    }

    #[test]
    fn test_coerce_sentinels_pass_through() {
        assert_eq!(Quantity::coerce("?"), Quantity::Unknown);
        assert_eq!(
            Quantity::coerce("RESULTADO_ANTERIOR"),
            Quantity::PreviousResult
        );
        assert_eq!(Quantity::coerce("RESULTADO_ANTERIOR").as_str(), "RESULTADO_ANTERIOR");
    }

    #[test]
    fn test_coerce_empty_is_unknown() {
        assert_eq!(Quantity::coerce(""), Quantity::Unknown);
        assert_eq!(Quantity::coerce("muchos"), Quantity::Unknown);
    }

    #[test]
    fn test_coerce_rejects_leftovers_that_are_not_numbers() {
        for raw in ["-", ".", "10-20", "1.2.3", "entre 3 y 4.5.", "--5"] {
            assert_eq!(Quantity::coerce(raw), Quantity::Unknown, "input {raw:?}");
        }
        assert_eq!(Quantity::coerce("0.5"), Quantity::Number("0.5".into()));
        assert_eq!(Quantity::coerce("-.5"), Quantity::Number("-.5".into()));
    }

    #[test]
    fn test_large_json_numbers_keep_positional_digits() {
        let q: Quantity = serde_json::from_value(json!(1e21)).unwrap();
        assert_eq!(q, Quantity::Number("1000000000000000000000".into()));
        let q: Quantity = serde_json::from_value(json!(2.5e-7)).unwrap();
        assert_eq!(q, Quantity::Number("0.00000025".into()));
        let q: Quantity = serde_json::from_value(json!(u64::MAX)).unwrap();
        assert_eq!(q.as_str(), u64::MAX.to_string());
    }

    #[test]
    fn test_coerce_keeps_negative_sign() {
        assert_eq!(Quantity::coerce("-7"), Quantity::Number("-7".into()));
    }

    #[test]
    fn test_quantity_deserializes_from_number() {
        let q: Quantity = serde_json::from_value(json!(25)).unwrap();
        assert_eq!(q, Quantity::Number("25".into()));
        let q: Quantity = serde_json::from_value(json!("?")).unwrap();
        assert!(q.is_unknown());
    }

    #[test]
    fn test_problem_type_parse_is_case_insensitive() {
        assert_eq!(
            ProblemType::parse("comparacion"),
            Some(ProblemType::Simple(SimpleKind::Comparacion))
        );
        assert_eq!(
            ProblemType::parse(" dos_operaciones "),
            Some(ProblemType::DosOperaciones)
        );
        assert_eq!(ProblemType::parse("MULTIPLICACION"), None);
    }

    #[test]
    fn test_operation_parse_rejects_unknown_symbols() {
        assert_eq!(Operation::parse("*"), Some(Operation::Multiply));
        assert_eq!(Operation::parse("x"), None);
    }

    #[test]
    fn test_record_serializes_flat_camel_case() {
        let value = serde_json::to_value(ppt_record()).unwrap();
        assert_eq!(value["type"], "PPT");
        assert_eq!(value["data"]["t"], "?");
        assert_eq!(value["operation"], "+");
        assert_eq!(value["fullAnswer"], "Tiene 42 láminas.");
        assert_eq!(value["createdAt"], 1_700_000_000_000i64);
        assert!(value.get("steps").is_none());
    }

    #[test]
    fn test_record_deserializes_back() {
        let original = ppt_record();
        let value = serde_json::to_value(&original).unwrap();
        let back: ProblemRecord = serde_json::from_value(value).unwrap();
        assert_eq!(back, original);
    }

    #[test]
    fn test_two_step_record_has_no_top_level_data() {
        let step = Step {
            kind: SimpleKind::Cambio,
            slots: Slots {
                data: [
                    ("ci".to_string(), Quantity::PreviousResult),
                    ("c".to_string(), Quantity::Number("5".into())),
                    ("cf".to_string(), Quantity::Unknown),
                ]
                .into(),
                labels: BTreeMap::new(),
                operation: Operation::Subtract,
            },
            answer: Quantity::Unknown,
            hint: String::new(),
        };
        let record = ProblemRecord {
            body: ProblemBody::DosOperaciones { steps: vec![step] },
            ..ppt_record()
        };
        let value = serde_json::to_value(&record).unwrap();
        assert_eq!(value["type"], "DOS_OPERACIONES");
        assert!(value.get("data").is_none());
        assert_eq!(value["steps"][0]["type"], "CAMBIO");
        assert_eq!(value["steps"][0]["data"]["ci"], "RESULTADO_ANTERIOR");
    }

    #[test]
    fn test_check_invariants_accepts_well_formed_record() {
        assert!(ppt_record().check_invariants().is_ok());
    }

    #[test]
    fn test_check_invariants_rejects_wrong_keys() {
        let mut record = ppt_record();
        if let ProblemBody::Ppt(slots) = &mut record.body {
            slots.data.remove("p2");
            slots.data.insert("x".to_string(), Quantity::Unknown);
        }
        let err = record.check_invariants().unwrap_err();
        assert!(err.contains("data keys"));
    }

    #[test]
    fn test_check_invariants_checks_steps() {
        let step = |labelled: bool| Step {
            kind: SimpleKind::Ppt,
            slots: Slots {
                data: SimpleKind::Ppt
                    .keys()
                    .iter()
                    .map(|k| (k.to_string(), Quantity::Unknown))
                    .collect(),
                labels: SimpleKind::Ppt
                    .keys()
                    .iter()
                    .filter(|_| labelled)
                    .map(|k| (k.to_string(), "etiqueta".to_string()))
                    .collect(),
                operation: Operation::Add,
            },
            answer: Quantity::Unknown,
            hint: String::new(),
        };
        let with_steps = |steps: Vec<Step>| ProblemRecord {
            body: ProblemBody::DosOperaciones { steps },
            ..ppt_record()
        };

        assert!(with_steps(vec![step(true), step(true)]).check_invariants().is_ok());

        let err = with_steps(vec![step(true), step(true), step(true)])
            .check_invariants()
            .unwrap_err();
        assert!(err.contains("3 steps"));

        let err = with_steps(vec![step(true), step(false)])
            .check_invariants()
            .unwrap_err();
        assert!(err.contains("step 2"));
        assert!(err.contains("labels keys"));
    }

    #[test]
    fn test_check_invariants_rejects_grade_out_of_range() {
        let record = ProblemRecord {
            grade: 9,
            ..ppt_record()
        };
        assert!(record.check_invariants().is_err());
    }

    #[test]
    fn test_find_duplicate_id() {
        let a = ppt_record();
        let b = ProblemRecord {
            id: "other".to_string(),
            ..ppt_record()
        };
        assert_eq!(find_duplicate_id(&[a.clone(), b.clone()]), None);
        assert_eq!(find_duplicate_id(&[a.clone(), b, a]), Some("abc123def"));
    }

    #[test]
    fn test_new_problem_id_is_short_and_distinct() {
        let a = new_problem_id();
        let b = new_problem_id();
        assert_eq!(a.len(), 9);
        assert_ne!(a, b);
    }
}
