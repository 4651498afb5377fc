//! Module decomposition: split Design output into per-module records.
//!
//! One structured-extraction call returns a JSON array; the reply is parsed
//! strictly. Any shape problem fails the whole decomposition.

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{info, instrument};

use courseforge_shared::{CourseForgeError, Result, content_digest};

use crate::executor::Executor;
use crate::prompts;

/// Design slice for one module.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModuleRecord {
    pub title: String,
    /// Content outline.
    pub script: String,
    /// Slide plan rows for this module.
    pub slides: String,
    /// Assessment plan rows for this module.
    pub assessment: String,
}

impl ModuleRecord {
    /// The module's full design text, as fed to Develop prompts.
    pub fn design_text(&self) -> String {
        format!(
            "Content outline:\n{}\n\nSlides plan:\n{}\n\nAssessment plan:\n{}",
            self.script, self.slides, self.assessment
        )
    }

    /// SHA-256 of [`Self::design_text`], part of the module cache key.
    pub fn design_digest(&self) -> String {
        content_digest(&self.design_text())
    }
}

/// Splits Design output into [`ModuleRecord`]s.
#[derive(Clone)]
pub struct Decomposer {
    exec: Executor,
}

impl Decomposer {
    pub fn new(exec: Executor) -> Self {
        Self { exec }
    }

    #[instrument(skip_all)]
    pub async fn decompose(
        &self,
        syllabus: &str,
        slides_plan: &str,
        assessment_plan: &str,
    ) -> Result<Vec<ModuleRecord>> {
        let reply = self
            .exec
            .ask(
                prompts::decomposition_prompt(syllabus, slides_plan, assessment_plan),
                prompts::DECOMPOSITION,
            )
            .await?;

        let modules = parse_modules(&reply)?;
        info!(modules = modules.len(), "design decomposed");
        Ok(modules)
    }
}

/// Parse an extraction reply into module records.
pub fn parse_modules(reply: &str) -> Result<Vec<ModuleRecord>> {
    let body = strip_code_fence(reply);

    let value: Value = serde_json::from_str(body)
        .map_err(|e| CourseForgeError::Decomposition(format!("reply is not JSON: {e}")))?;

    let Value::Array(items) = value else {
        return Err(CourseForgeError::Decomposition(
            "reply is not a JSON array".into(),
        ));
    };
    if items.is_empty() {
        return Err(CourseForgeError::Decomposition(
            "reply contains no modules".into(),
        ));
    }

    items
        .into_iter()
        .enumerate()
        .map(|(i, item)| {
            if !item.is_object() {
                return Err(CourseForgeError::Decomposition(format!(
                    "module {i} is not an object"
                )));
            }
            let record: ModuleRecord = serde_json::from_value(item)
                .map_err(|e| CourseForgeError::Decomposition(format!("module {i}: {e}")))?;
            if record.title.trim().is_empty() {
                return Err(CourseForgeError::Decomposition(format!(
                    "module {i} has a blank title"
                )));
            }
            Ok(record)
        })
        .collect()
}

/// Remove a surrounding markdown code fence, if any.
fn strip_code_fence(text: &str) -> &str {
    static FENCE_RE: LazyLock<Regex> = LazyLock::new(|| {
        Regex::new(r"(?s)^\s*```[A-Za-z]*[ \t]*\n(.*?)\n?```\s*$").expect("valid regex")
    });

    match FENCE_RE.captures(text).and_then(|c| c.get(1)) {
        Some(inner) => inner.as_str(),
        None => text.trim(),
    }
}
