//! Problem Generation — orchestrates the generation pipeline.
//!
//! Flow: clamp request → build prompt → model call → extract JSON →
//!       normalize each record → make ids unique within the batch.

use std::collections::HashSet;

use serde::Deserialize;
use tracing::{info, warn};

use crate::errors::AppError;
use crate::generation::extractor::extract_records;
use crate::generation::normalizer::{normalize_problem, RecordContext};
use crate::generation::prompts::{build_generation_prompt, GENERATION_SYSTEM};
use crate::llm_client::TextGenerator;
use crate::models::problem::{new_problem_id, ProblemRecord, ProblemType, MAX_GRADE, MIN_GRADE};

pub const MIN_COUNT: u8 = 1;
pub const MAX_COUNT: u8 = 10;
const DEFAULT_COUNT: i64 = 1;

/// Body of `POST /api/generate`.
#[derive(Debug, Deserialize)]
pub struct GenerateRequest {
    pub grade: i64,
    #[serde(rename = "type")]
    pub problem_type: ProblemType,
    #[serde(default)]
    pub theme: Option<String>,
    #[serde(default)]
    pub count: Option<i64>,
}

/// Clamped generation inputs.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationParams {
    pub grade: u8,
    pub problem_type: ProblemType,
    pub theme: Option<String>,
    pub count: u8,
}

impl GenerationParams {
    /// Clamps grade into 1..=6 and count into 1..=10; blank themes are dropped.
    pub fn new(
        grade: i64,
        problem_type: ProblemType,
        theme: Option<String>,
        count: Option<i64>,
    ) -> Self {
        let grade = grade.clamp(i64::from(MIN_GRADE), i64::from(MAX_GRADE)) as u8;
        let count = count
            .unwrap_or(DEFAULT_COUNT)
            .clamp(i64::from(MIN_COUNT), i64::from(MAX_COUNT)) as u8;
        let theme = theme
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty());
        Self {
            grade,
            problem_type,
            theme,
            count,
        }
    }

    pub fn context(&self) -> RecordContext {
        RecordContext {
            grade: self.grade,
            problem_type: self.problem_type,
        }
    }
}

impl From<GenerateRequest> for GenerationParams {
    fn from(req: GenerateRequest) -> Self {
        GenerationParams::new(req.grade, req.problem_type, req.theme, req.count)
    }
}

/// Runs the full generation pipeline against `llm`.
pub async fn generate_problems(
    llm: &dyn TextGenerator,
    params: &GenerationParams,
) -> Result<Vec<ProblemRecord>, AppError> {
    let prompt = build_generation_prompt(params);
    let reply = llm.generate(&prompt, GENERATION_SYSTEM).await?;

    let raw_records = extract_records(&reply)
        .map_err(|e| AppError::Llm(format!("Could not read problems from model reply: {e}")))?;

    let ctx = params.context();
    let mut problems: Vec<ProblemRecord> = raw_records
        .iter()
        .map(|raw| normalize_problem(raw, &ctx))
        .collect();
    ensure_unique_ids(&mut problems);

    if problems.len() != usize::from(params.count) {
        warn!(
            "Model returned {} problems, {} requested",
            problems.len(),
            params.count
        );
    }
    let off_type = problems
        .iter()
        .filter(|p| p.problem_type() != params.problem_type)
        .count();
    if off_type > 0 {
        warn!(
            "{off_type} generated problems are not of the requested type {}",
            params.problem_type
        );
    }
    info!(
        "Generated {} {} problems for grade {}",
        problems.len(),
        params.problem_type,
        params.grade
    );

    Ok(problems)
}

/// Gives a fresh id to every record whose id already appeared earlier in the batch.
fn ensure_unique_ids(problems: &mut [ProblemRecord]) {
    let mut seen = HashSet::new();
    for problem in problems.iter_mut() {
        while !seen.insert(problem.id.clone()) {
            problem.id = new_problem_id();
        }
    }
}
