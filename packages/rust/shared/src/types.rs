//! Core domain types: course requests, cache keys, and artifact sets.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Current schema version baked into every cache key.
///
/// Bump when the on-disk artifact layout or key payload shape changes.
pub const CURRENT_SCHEMA_VERSION: u32 = 1;

/// Number of hex characters kept from the SHA-256 digest.
pub const CACHE_KEY_LEN: usize = 16;

// ---------------------------------------------------------------------------
// CourseRequest
// ---------------------------------------------------------------------------

/// Inputs describing one course. Identity for caching purposes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CourseRequest {
    pub course_name: String,
    pub course_description: String,
    pub learning_objectives: String,
    /// Whether stage executors should ground prompts in researched context.
    pub do_research: bool,
}

impl CourseRequest {
    pub fn new(
        course_name: impl Into<String>,
        course_description: impl Into<String>,
        learning_objectives: impl Into<String>,
        do_research: bool,
    ) -> Self {
        Self {
            course_name: course_name.into(),
            course_description: course_description.into(),
            learning_objectives: learning_objectives.into(),
            do_research,
        }
    }
}

// ---------------------------------------------------------------------------
// StageKind
// ---------------------------------------------------------------------------

/// Pipeline stages, used for error context and logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StageKind {
    Analyze,
    Design,
    Decompose,
    Develop,
}

impl StageKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Analyze => "analyze",
            Self::Design => "design",
            Self::Decompose => "decompose",
            Self::Develop => "develop",
        }
    }
}

impl std::fmt::Display for StageKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// CacheKey
// ---------------------------------------------------------------------------

/// Module-level inputs folded into a module-scoped key.
#[derive(Debug, Clone, Serialize)]
pub struct ModuleIdentity<'a> {
    pub title: &'a str,
    pub index: usize,
    /// SHA-256 of the module's design text.
    pub design_digest: &'a str,
}

/// Canonical key payload. Fields are declared in sorted order so the JSON
/// serialization is stable.
#[derive(Serialize)]
struct KeyPayload<'a> {
    course_description: &'a str,
    course_name: &'a str,
    do_research: bool,
    learning_objectives: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    module: Option<&'a ModuleIdentity<'a>>,
    schema_version: u32,
    stage: &'a str,
    template_version: &'a str,
}

/// Deterministic digest identifying one set of semantic stage inputs.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CacheKey(String);

impl CacheKey {
    /// Key for a course-level stage (e.g. `"parts"` for Analyze+Design).
    pub fn for_stage(request: &CourseRequest, stage: &str, template_version: &str) -> Self {
        Self::derive(request, stage, template_version, None)
    }

    /// Key for one module's Develop artifacts.
    pub fn for_module(
        request: &CourseRequest,
        template_version: &str,
        module: &ModuleIdentity<'_>,
    ) -> Self {
        Self::derive(request, "module", template_version, Some(module))
    }

    fn derive(
        request: &CourseRequest,
        stage: &str,
        template_version: &str,
        module: Option<&ModuleIdentity<'_>>,
    ) -> Self {
        let payload = KeyPayload {
            course_description: &request.course_description,
            course_name: &request.course_name,
            do_research: request.do_research,
            learning_objectives: &request.learning_objectives,
            module,
            schema_version: CURRENT_SCHEMA_VERSION,
            stage,
            template_version,
        };
        // Serializing borrowed strings and primitives cannot fail.
        let blob = serde_json::to_vec(&payload).unwrap_or_default();
        let mut digest = content_digest_bytes(&blob);
        digest.truncate(CACHE_KEY_LEN);
        Self(digest)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for CacheKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Full SHA-256 hex digest of a text.
pub fn content_digest(text: &str) -> String {
    content_digest_bytes(text.as_bytes())
}

fn content_digest_bytes(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    format!("{:x}", hasher.finalize())
}

// ---------------------------------------------------------------------------
// ArtifactSet
// ---------------------------------------------------------------------------

/// Named text outputs of one stage invocation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ArtifactSet(BTreeMap<String, String>);

impl ArtifactSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, content: impl Into<String>) {
        self.0.insert(name.into(), content.into());
    }

    /// Content for `name`, or `""` when absent.
    pub fn get(&self, name: &str) -> &str {
        self.0.get(name).map(String::as_str).unwrap_or("")
    }

    /// Remove and return `name`, or an empty string when absent.
    pub fn take(&mut self, name: &str) -> String {
        self.0.remove(name).unwrap_or_default()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.0.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for ArtifactSet {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn agile() -> CourseRequest {
        CourseRequest::new(
            "Agile and Scrum",
            "Introduce approaches to project management.",
            "Understand Agile principles, Implement Scrum",
            false,
        )
    }

    #[test]
    fn key_is_deterministic() {
        let a = CacheKey::for_stage(&agile(), "parts", "t1");
        let b = CacheKey::for_stage(&agile(), "parts", "t1");
        assert_eq!(a, b);
        assert_eq!(a.as_str().len(), CACHE_KEY_LEN);
        assert!(a.as_str().chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn key_changes_with_every_field() {
        let base = agile();
        let base_key = CacheKey::for_stage(&base, "parts", "t1");

        let mutations: Vec<CourseRequest> = vec![
            CourseRequest {
                course_name: "Agile and Kanban".into(),
                ..base.clone()
            },
            CourseRequest {
                course_description: "Something else.".into(),
                ..base.clone()
            },
            CourseRequest {
                learning_objectives: "Different objectives".into(),
                ..base.clone()
            },
            CourseRequest {
                do_research: true,
                ..base.clone()
            },
        ];

        for mutated in &mutations {
            assert_ne!(
                CacheKey::for_stage(mutated, "parts", "t1"),
                base_key,
                "mutation did not change key: {mutated:?}"
            );
        }

        assert_ne!(CacheKey::for_stage(&base, "design", "t1"), base_key);
        assert_ne!(CacheKey::for_stage(&base, "parts", "t2"), base_key);
    }

    #[test]
    fn module_key_differs_from_stage_key_and_by_module() {
        let req = agile();
        let digest = content_digest("outline");
        let m1 = ModuleIdentity {
            title: "Intro",
            index: 0,
            design_digest: &digest,
        };
        let m2 = ModuleIdentity {
            title: "Intro",
            index: 1,
            design_digest: &digest,
        };

        let k1 = CacheKey::for_module(&req, "t1", &m1);
        assert_eq!(k1, CacheKey::for_module(&req, "t1", &m1));
        assert_ne!(k1, CacheKey::for_module(&req, "t1", &m2));
        assert_ne!(k1, CacheKey::for_stage(&req, "module", "t1"));
    }

    #[test]
    fn content_digest_is_full_sha256() {
        assert_eq!(content_digest("hello").len(), 64);
        assert_ne!(content_digest("hello"), content_digest("hello "));
    }

    #[test]
    fn artifact_set_missing_is_empty() {
        let mut set: ArtifactSet = [("script", "Intro")].into_iter().collect();
        assert_eq!(set.get("script"), "Intro");
        assert_eq!(set.get("slides"), "");
        assert_eq!(set.take("script"), "Intro");
        assert!(set.is_empty());
    }
}
