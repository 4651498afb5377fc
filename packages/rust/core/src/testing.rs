//! Scripted capability fakes that record every call.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use courseforge_providers::{Capabilities, ContextResearcher, GenerationRequest, TextGenerator};
use courseforge_shared::{CourseForgeError, Result};

use crate::executor::Executor;

pub const SYSTEM: &str = "You are an expert instructional designer.";

/// Decomposition reply with three modules.
pub const THREE_MODULES: &str = r#"```json
[
  {"title": "Agile Foundations", "script": "values and principles", "slides": "s1", "assessment": "a1"},
  {"title": "Scrum Roles", "script": "PO, SM, team", "slides": "s2", "assessment": "a2"},
  {"title": "Sprint Planning", "script": "backlog and goals", "slides": "s3", "assessment": "a3"}
]
```"#;

/// Generator that numbers its replies and answers decomposition prompts
/// with a fixed JSON document.
pub struct FakeGenerator {
    pub requests: Mutex<Vec<GenerationRequest>>,
    counter: AtomicUsize,
    decomposition: String,
    fail_on: Option<String>,
}

impl FakeGenerator {
    pub fn new() -> Self {
        Self::with_decomposition(THREE_MODULES)
    }

    pub fn with_decomposition(reply: &str) -> Self {
        Self {
            requests: Mutex::new(Vec::new()),
            counter: AtomicUsize::new(0),
            decomposition: reply.to_string(),
            fail_on: None,
        }
    }

    /// Fail any prompt containing `needle` with a transport error.
    pub fn failing_on(mut self, needle: &str) -> Self {
        self.fail_on = Some(needle.to_string());
        self
    }

    pub fn calls(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    pub fn prompts(&self) -> Vec<String> {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .map(|r| r.prompt.clone())
            .collect()
    }
}

#[async_trait]
impl TextGenerator for FakeGenerator {
    async fn generate(&self, request: GenerationRequest) -> Result<String> {
        let n = self.counter.fetch_add(1, Ordering::SeqCst);
        let prompt = request.prompt.clone();
        self.requests.lock().unwrap().push(request);

        if let Some(needle) = &self.fail_on {
            if prompt.contains(needle.as_str()) {
                return Err(CourseForgeError::transport("fake", "HTTP 500: boom"));
            }
        }
        if prompt.starts_with("Split the course design") {
            return Ok(self.decomposition.clone());
        }
        let first_line = prompt.lines().next().unwrap_or_default();
        Ok(format!("generated #{n}: {first_line}"))
    }

    fn name(&self) -> &str {
        "fake"
    }
}

/// Researcher returning `CTX#n` and recording each query.
#[derive(Default)]
pub struct FakeResearcher {
    pub queries: Mutex<Vec<String>>,
}

impl FakeResearcher {
    pub fn calls(&self) -> usize {
        self.queries.lock().unwrap().len()
    }
}

#[async_trait]
impl ContextResearcher for FakeResearcher {
    async fn research(&self, query: &str) -> Result<String> {
        let mut queries = self.queries.lock().unwrap();
        queries.push(query.to_string());
        Ok(format!("CTX#{}", queries.len()))
    }
}

pub struct Fakes {
    pub generator: Arc<FakeGenerator>,
    pub researcher: Arc<FakeResearcher>,
}

impl Fakes {
    pub fn new() -> Self {
        Self::with_generator(FakeGenerator::new())
    }

    pub fn with_generator(generator: FakeGenerator) -> Self {
        Self {
            generator: Arc::new(generator),
            researcher: Arc::new(FakeResearcher::default()),
        }
    }

    pub fn capabilities(&self) -> Capabilities {
        Capabilities::new(self.generator.clone(), self.researcher.clone())
    }

    pub fn executor(&self) -> Executor {
        Executor::new(self.capabilities(), SYSTEM)
    }
}

/// Fresh scratch directory under the system temp dir.
pub fn scratch_dir(label: &str) -> std::path::PathBuf {
    std::env::temp_dir().join(format!("cf-{label}-{}", uuid::Uuid::now_v7()))
}
