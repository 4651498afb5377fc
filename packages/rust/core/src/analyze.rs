//! Analyze stage: learning objectives, audience analysis, resource assessment.

use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use courseforge_shared::{CourseRequest, Result};

use crate::executor::Executor;
use crate::prompts;

/// Output of the aligned Analyze stage.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalysisOutput {
    pub objectives: String,
    pub audience: String,
    pub resources: String,
    /// The three parts joined, as fed to Design.
    pub combined: String,
}

#[derive(Clone)]
pub struct Analyze {
    exec: Executor,
}

impl Analyze {
    pub fn new(exec: Executor) -> Self {
        Self { exec }
    }

    /// Learning objectives table.
    ///
    /// With `shared_context` absent and research requested, an
    /// objectives-specific research call supplies the context.
    #[instrument(skip_all, fields(course = %request.course_name))]
    pub async fn objectives(
        &self,
        request: &CourseRequest,
        shared_context: Option<&str>,
    ) -> Result<String> {
        let context = self
            .exec
            .context(request, shared_context, || prompts::objectives_query(request))
            .await?;
        self.exec
            .ask(prompts::objectives_prompt(request, &context), prompts::OBJECTIVES)
            .await
    }

    #[instrument(skip_all, fields(course = %request.course_name))]
    pub async fn audience(
        &self,
        request: &CourseRequest,
        shared_context: Option<&str>,
    ) -> Result<String> {
        let context = self
            .exec
            .context(request, shared_context, || prompts::audience_query(request))
            .await?;
        self.exec
            .ask(prompts::audience_prompt(request, &context), prompts::AUDIENCE)
            .await
    }

    #[instrument(skip_all, fields(course = %request.course_name))]
    pub async fn resources(
        &self,
        request: &CourseRequest,
        shared_context: Option<&str>,
    ) -> Result<String> {
        let context = self
            .exec
            .context(request, shared_context, || prompts::resources_query(request))
            .await?;
        self.exec
            .ask(prompts::resources_prompt(request, &context), prompts::RESOURCES)
            .await
    }

    /// One research call covering all three analysis parts.
    pub async fn build_shared_context(&self, request: &CourseRequest) -> Result<String> {
        self.exec
            .capabilities()
            .research(&prompts::shared_research_query(request))
            .await
    }

    /// Run objectives, audience, and resources against one shared context.
    ///
    /// Research, when requested, happens exactly once; the three generation
    /// calls then see identical context text.
    #[instrument(skip_all, fields(course = %request.course_name, research = request.do_research))]
    pub async fn analyze_all_aligned(&self, request: &CourseRequest) -> Result<AnalysisOutput> {
        let shared = if request.do_research {
            self.build_shared_context(request).await?
        } else {
            String::new()
        };
        debug!(context_chars = shared.len(), "shared analysis context ready");

        let objectives = self.objectives(request, Some(&shared)).await?;
        let audience = self.audience(request, Some(&shared)).await?;
        let resources = self.resources(request, Some(&shared)).await?;
        let combined = prompts::combined_analysis(&objectives, &audience, &resources);

        Ok(AnalysisOutput {
            objectives,
            audience,
            resources,
            combined,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::Fakes;

    fn request(do_research: bool) -> CourseRequest {
        CourseRequest::new(
            "Agile and Scrum",
            "Introduce approaches to project management.",
            "Understand Agile principles",
            do_research,
        )
    }

    #[tokio::test]
    async fn aligned_analysis_researches_once() {
        let fakes = Fakes::new();
        let analyze = Analyze::new(fakes.executor());

        let out = analyze.analyze_all_aligned(&request(true)).await.unwrap();

        assert_eq!(fakes.researcher.calls(), 1);
        assert_eq!(fakes.generator.calls(), 3);
        for prompt in fakes.generator.prompts() {
            assert!(prompt.contains("Additional Context: CTX#1\n"), "{prompt}");
        }
        assert!(out.combined.starts_with("Objectives:\n"));
        assert!(out.combined.contains(&out.audience));
    }

    #[tokio::test]
    async fn aligned_analysis_without_research_uses_empty_context() {
        let fakes = Fakes::new();
        let analyze = Analyze::new(fakes.executor());

        analyze.analyze_all_aligned(&request(false)).await.unwrap();

        assert_eq!(fakes.researcher.calls(), 0);
        for prompt in fakes.generator.prompts() {
            assert!(prompt.contains("Additional Context: \n"));
        }
    }

    #[tokio::test]
    async fn standalone_calls_use_their_own_queries() {
        let fakes = Fakes::new();
        let analyze = Analyze::new(fakes.executor());
        let req = request(true);

        analyze.objectives(&req, None).await.unwrap();
        analyze.audience(&req, None).await.unwrap();
        analyze.resources(&req, Some("given")).await.unwrap();

        let queries = fakes.researcher.queries.lock().unwrap().clone();
        assert_eq!(queries.len(), 2);
        assert!(queries[0].starts_with("Define clear learning objectives"));
        assert!(queries[1].starts_with("Analyze target learners"));
        assert!(fakes.generator.prompts()[2].contains("Additional Context: given"));
    }

    #[tokio::test]
    async fn sampling_parameters_follow_artifact_type() {
        let fakes = Fakes::new();
        Analyze::new(fakes.executor())
            .objectives(&request(false), None)
            .await
            .unwrap();

        let req = fakes.generator.requests.lock().unwrap()[0].clone();
        assert_eq!(req.max_tokens, 5000);
        assert_eq!(req.temperature, 0.5);
        assert_eq!(req.system, crate::testing::SYSTEM);
    }
}
