//! Plumbing shared by the stage executors.

use courseforge_providers::{Capabilities, GenerationRequest};
use courseforge_shared::{CourseRequest, Result};

use crate::prompts::Sampling;

/// Capability handles plus the system role text every prompt is sent with.
#[derive(Clone)]
pub struct Executor {
    caps: Capabilities,
    system_prompt: String,
}

impl Executor {
    pub fn new(caps: Capabilities, system_prompt: impl Into<String>) -> Self {
        Self {
            caps,
            system_prompt: system_prompt.into(),
        }
    }

    pub fn capabilities(&self) -> &Capabilities {
        &self.caps
    }

    /// Send one prompt and return the generated text verbatim.
    pub async fn ask(&self, prompt: String, sampling: Sampling) -> Result<String> {
        self.caps
            .generate(GenerationRequest {
                system: self.system_prompt.clone(),
                prompt,
                max_tokens: sampling.max_tokens,
                temperature: sampling.temperature,
            })
            .await
    }

    /// Context for one call: the shared context when given, else a research
    /// call with `query` when the request asks for research, else empty.
    pub async fn context(
        &self,
        request: &CourseRequest,
        shared_context: Option<&str>,
        query: impl FnOnce() -> String,
    ) -> Result<String> {
        match shared_context {
            Some(shared) => Ok(shared.to_string()),
            None if request.do_research => self.caps.research(&query()).await,
            None => Ok(String::new()),
        }
    }
}
