//! Capability providers: text generation and context research.
//!
//! The pipeline only ever sees the two narrow traits defined here. Concrete
//! HTTP adapters live in [`openai`] and [`research`]; handles are injected
//! through [`Capabilities`], which also applies the per-call timeout.

pub mod openai;
pub mod research;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use courseforge_shared::{CourseForgeError, Result};
use tracing::debug;

pub use openai::{OpenAiConfig, OpenAiGenerator};
pub use research::{HttpResearcher, HttpResearcherConfig};

/// Longest provider error body kept in an error message.
pub(crate) const MAX_ERROR_BODY_CHARS: usize = 200;

// ---------------------------------------------------------------------------
// Requests
// ---------------------------------------------------------------------------

/// One text generation request.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationRequest {
    /// System role text.
    pub system: String,
    /// User prompt text.
    pub prompt: String,
    /// Upper bound on generated tokens.
    pub max_tokens: u32,
    /// Sampling temperature.
    pub temperature: f32,
}

// ---------------------------------------------------------------------------
// Capability traits
// ---------------------------------------------------------------------------

/// Turns a prompt into generated text.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn generate(&self, request: GenerationRequest) -> Result<String>;

    /// Short label used in logs and errors.
    fn name(&self) -> &str {
        "generator"
    }
}

/// Turns a query into supporting context text.
#[async_trait]
pub trait ContextResearcher: Send + Sync {
    async fn research(&self, query: &str) -> Result<String>;

    /// Short label used in logs and errors.
    fn name(&self) -> &str {
        "research"
    }
}

/// Researcher used when no research backend is configured.
///
/// Any call fails, so a request with research enabled surfaces the
/// misconfiguration instead of silently proceeding without context.
pub struct NoResearch;

#[async_trait]
impl ContextResearcher for NoResearch {
    async fn research(&self, _query: &str) -> Result<String> {
        Err(CourseForgeError::config(
            "research was requested but no research backend is configured",
        ))
    }

    fn name(&self) -> &str {
        "no-research"
    }
}

// ---------------------------------------------------------------------------
// Capabilities
// ---------------------------------------------------------------------------

/// Default per-call timeout.
pub const DEFAULT_CALL_TIMEOUT: Duration = Duration::from_secs(120);

/// Injected capability handles plus the per-call time budget.
#[derive(Clone)]
pub struct Capabilities {
    generator: Arc<dyn TextGenerator>,
    researcher: Arc<dyn ContextResearcher>,
    call_timeout: Duration,
}

impl Capabilities {
    pub fn new(generator: Arc<dyn TextGenerator>, researcher: Arc<dyn ContextResearcher>) -> Self {
        Self {
            generator,
            researcher,
            call_timeout: DEFAULT_CALL_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, call_timeout: Duration) -> Self {
        self.call_timeout = call_timeout;
        self
    }

    pub fn call_timeout(&self) -> Duration {
        self.call_timeout
    }

    /// Generate text, failing with `Timeout` if the call outlives the budget.
    pub async fn generate(&self, request: GenerationRequest) -> Result<String> {
        let provider = self.generator.name().to_string();
        debug!(
            %provider,
            max_tokens = request.max_tokens,
            temperature = request.temperature,
            prompt_chars = request.prompt.len(),
            "generation call"
        );
        match tokio::time::timeout(self.call_timeout, self.generator.generate(request)).await {
            Ok(result) => result,
            Err(_) => Err(CourseForgeError::Timeout {
                provider,
                secs: self.call_timeout.as_secs(),
            }),
        }
    }

    /// Research a query, failing with `Timeout` if the call outlives the budget.
    pub async fn research(&self, query: &str) -> Result<String> {
        let provider = self.researcher.name().to_string();
        debug!(%provider, query_chars = query.len(), "research call");
        match tokio::time::timeout(self.call_timeout, self.researcher.research(query)).await {
            Ok(result) => result,
            Err(_) => Err(CourseForgeError::Timeout {
                provider,
                secs: self.call_timeout.as_secs(),
            }),
        }
    }
}

/// Truncate a provider response body for inclusion in an error.
pub(crate) fn truncate_body(body: &str) -> String {
    body.chars().take(MAX_ERROR_BODY_CHARS).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    struct SlowGenerator;

    #[async_trait]
    impl TextGenerator for SlowGenerator {
        async fn generate(&self, _request: GenerationRequest) -> Result<String> {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok("too late".into())
        }

        fn name(&self) -> &str {
            "slow"
        }
    }

    struct EchoGenerator;

    #[async_trait]
    impl TextGenerator for EchoGenerator {
        async fn generate(&self, request: GenerationRequest) -> Result<String> {
            Ok(request.prompt)
        }
    }

    fn request() -> GenerationRequest {
        GenerationRequest {
            system: "sys".into(),
            prompt: "hello".into(),
            max_tokens: 10,
            temperature: 0.5,
        }
    }

    #[tokio::test]
    async fn generate_passes_through() {
        let caps = Capabilities::new(Arc::new(EchoGenerator), Arc::new(NoResearch));
        assert_eq!(caps.generate(request()).await.unwrap(), "hello");
    }

    #[tokio::test]
    async fn slow_call_times_out_as_transient() {
        let caps = Capabilities::new(Arc::new(SlowGenerator), Arc::new(NoResearch));
        assert_eq!(caps.call_timeout(), DEFAULT_CALL_TIMEOUT);
        let caps = caps.with_timeout(Duration::from_millis(20));
        assert_eq!(caps.call_timeout(), Duration::from_millis(20));

        let err = caps.generate(request()).await.unwrap_err();
        assert!(matches!(err, CourseForgeError::Timeout { ref provider, .. } if provider == "slow"));
        assert!(err.is_transient());
    }

    #[tokio::test]
    async fn no_research_fails_loudly() {
        let caps = Capabilities::new(Arc::new(EchoGenerator), Arc::new(NoResearch));
        let err = caps.research("anything").await.unwrap_err();
        assert!(err.to_string().contains("no research backend"));
    }

    #[test]
    fn truncate_body_respects_char_boundaries() {
        let body = "é".repeat(500);
        assert_eq!(truncate_body(&body).chars().count(), MAX_ERROR_BODY_CHARS);
    }
}
