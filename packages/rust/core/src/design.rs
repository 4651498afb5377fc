//! Design stage: syllabus, slide plan, assessment plan.

use serde::{Deserialize, Serialize};
use tracing::instrument;

use courseforge_shared::Result;

use crate::executor::Executor;
use crate::prompts;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DesignOutput {
    pub syllabus: String,
    pub slides_plan: String,
    pub assessment_plan: String,
}

#[derive(Clone)]
pub struct Design {
    exec: Executor,
}

impl Design {
    pub fn new(exec: Executor) -> Self {
        Self { exec }
    }

    pub async fn syllabus(&self, analysis: &str) -> Result<String> {
        self.exec
            .ask(prompts::syllabus_prompt(analysis), prompts::SYLLABUS)
            .await
    }

    pub async fn slides_plan(&self, analysis: &str) -> Result<String> {
        self.exec
            .ask(prompts::slides_plan_prompt(analysis), prompts::SLIDES_PLAN)
            .await
    }

    pub async fn assessment_plan(&self, analysis: &str) -> Result<String> {
        self.exec
            .ask(prompts::assessment_plan_prompt(analysis), prompts::ASSESSMENT_PLAN)
            .await
    }

    /// All three design artifacts, generated in order.
    #[instrument(skip_all, fields(analysis_chars = analysis.len()))]
    pub async fn design_all(&self, analysis: &str) -> Result<DesignOutput> {
        Ok(DesignOutput {
            syllabus: self.syllabus(analysis).await?,
            slides_plan: self.slides_plan(analysis).await?,
            assessment_plan: self.assessment_plan(analysis).await?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::Fakes;

    #[tokio::test]
    async fn design_all_runs_three_calls_in_order() {
        let fakes = Fakes::new();
        let design = Design::new(fakes.executor());

        let out = design.design_all("ANALYSIS-TEXT").await.unwrap();

        let requests = fakes.generator.requests.lock().unwrap().clone();
        assert_eq!(requests.len(), 3);
        assert!(requests[0].prompt.contains("Syllabus design"));
        assert!(requests[1].prompt.contains("Slide planning"));
        assert!(requests[2].prompt.contains("Assessment planning"));
        assert!(requests.iter().all(|r| r.prompt.contains("Analysis: ANALYSIS-TEXT")));
        assert_eq!(requests[1].temperature, 0.6);
        assert!(out.syllabus.starts_with("generated #0"));
        assert!(out.assessment_plan.starts_with("generated #2"));
    }

    #[tokio::test]
    async fn design_never_researches() {
        let fakes = Fakes::new();
        Design::new(fakes.executor()).design_all("a").await.unwrap();
        assert_eq!(fakes.researcher.calls(), 0);
    }
}
