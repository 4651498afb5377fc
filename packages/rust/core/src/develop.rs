//! Develop stage: per-module script, slides, and assessment.

use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use courseforge_shared::{ArtifactSet, CourseRequest, Result};

use crate::decompose::ModuleRecord;
use crate::executor::Executor;
use crate::pipeline::CacheStatus;
use crate::prompts;

/// Artifact names written into each module scope.
pub const MODULE_ARTIFACTS: [&str; 5] =
    ["script", "slides", "assessment", "combined", "shared_context"];

/// Finished materials for one module.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModuleMaterials {
    pub title: String,
    pub script: String,
    pub slides: String,
    pub assessment: String,
    pub combined: String,
    /// Research text the three calls shared; empty without research.
    pub shared_context: String,
    /// How this module's checkpoint was used.
    #[serde(skip)]
    pub cache: CacheStatus,
}

impl ModuleMaterials {
    pub fn to_artifacts(&self) -> ArtifactSet {
        [
            ("script", self.script.as_str()),
            ("slides", self.slides.as_str()),
            ("assessment", self.assessment.as_str()),
            ("combined", self.combined.as_str()),
            ("shared_context", self.shared_context.as_str()),
        ]
        .into_iter()
        .collect()
    }

    pub fn from_artifacts(title: impl Into<String>, mut artifacts: ArtifactSet) -> Self {
        Self {
            title: title.into(),
            script: artifacts.take("script"),
            slides: artifacts.take("slides"),
            assessment: artifacts.take("assessment"),
            combined: artifacts.take("combined"),
            shared_context: artifacts.take("shared_context"),
            cache: CacheStatus::Hit,
        }
    }
}

#[derive(Clone)]
pub struct Develop {
    exec: Executor,
}

impl Develop {
    pub fn new(exec: Executor) -> Self {
        Self { exec }
    }

    pub async fn script(
        &self,
        request: &CourseRequest,
        module: &ModuleRecord,
        shared_context: Option<&str>,
    ) -> Result<String> {
        let context = self
            .exec
            .context(request, shared_context, || prompts::module_research_query(request, module))
            .await?;
        self.exec
            .ask(prompts::module_script_prompt(module, &context), prompts::MODULE_SCRIPT)
            .await
    }

    pub async fn slides(
        &self,
        request: &CourseRequest,
        module: &ModuleRecord,
        script: &str,
        shared_context: Option<&str>,
    ) -> Result<String> {
        let context = self
            .exec
            .context(request, shared_context, || prompts::module_research_query(request, module))
            .await?;
        self.exec
            .ask(
                prompts::module_slides_prompt(module, script, &context),
                prompts::MODULE_SLIDES,
            )
            .await
    }

    pub async fn assessment(
        &self,
        request: &CourseRequest,
        module: &ModuleRecord,
        script: &str,
        slides: &str,
        shared_context: Option<&str>,
    ) -> Result<String> {
        let context = self
            .exec
            .context(request, shared_context, || prompts::module_research_query(request, module))
            .await?;
        self.exec
            .ask(
                prompts::module_assessment_prompt(module, script, slides, &context),
                prompts::MODULE_ASSESSMENT,
            )
            .await
    }

    /// Script, then slides (seeing the script), then assessment (seeing both).
    ///
    /// With research on, one research call feeds all three.
    #[instrument(skip_all, fields(module = %module.title, research = request.do_research))]
    pub async fn develop_module(
        &self,
        request: &CourseRequest,
        module: &ModuleRecord,
    ) -> Result<ModuleMaterials> {
        let shared_context = if request.do_research {
            self.exec
                .capabilities()
                .research(&prompts::module_research_query(request, module))
                .await?
        } else {
            String::new()
        };

        let script = self.script(request, module, Some(&shared_context)).await?;
        let slides = self
            .slides(request, module, &script, Some(&shared_context))
            .await?;
        let assessment = self
            .assessment(request, module, &script, &slides, Some(&shared_context))
            .await?;
        let combined = prompts::combined_module(&script, &slides, &assessment);
        debug!(chars = combined.len(), "module materials ready");

        Ok(ModuleMaterials {
            title: module.title.clone(),
            script,
            slides,
            assessment,
            combined,
            shared_context,
            cache: CacheStatus::Bypassed,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::Fakes;

    fn module() -> ModuleRecord {
        ModuleRecord {
            title: "Sprint Planning".into(),
            script: "backlog refinement".into(),
            slides: "s".into(),
            assessment: "a".into(),
        }
    }

    #[tokio::test]
    async fn chain_feeds_earlier_outputs_forward() {
        let fakes = Fakes::new();
        let develop = Develop::new(fakes.executor());
        let req = CourseRequest::new("Agile", "d", "o", false);

        let out = develop.develop_module(&req, &module()).await.unwrap();

        let sent = fakes.generator.prompts();
        assert_eq!(sent.len(), 3);
        assert!(sent[1].contains(&format!("Script: {}", out.script)));
        assert!(sent[2].contains(&format!("Script: {}", out.script)));
        assert!(sent[2].contains(&format!("Slides: {}", out.slides)));
        assert_eq!(
            out.combined,
            prompts::combined_module(&out.script, &out.slides, &out.assessment)
        );
        assert_eq!(out.shared_context, "");
        assert_eq!(fakes.researcher.calls(), 0);
    }

    #[tokio::test]
    async fn one_research_call_per_module() {
        let fakes = Fakes::new();
        let develop = Develop::new(fakes.executor());
        let req = CourseRequest::new("Agile", "d", "o", true);

        let out = develop.develop_module(&req, &module()).await.unwrap();

        assert_eq!(fakes.researcher.calls(), 1);
        assert_eq!(out.shared_context, "CTX#1");
        assert!(fakes.generator.prompts().iter().all(|p| p.contains("Additional Context: CTX#1")));
    }

    #[test]
    fn artifacts_round_trip_through_names() {
        let materials = ModuleMaterials {
            title: "T".into(),
            script: "s".into(),
            slides: "l".into(),
            assessment: "a".into(),
            combined: "c".into(),
            shared_context: String::new(),
            cache: CacheStatus::Hit,
        };
        let set = materials.to_artifacts();
        assert_eq!(set.len(), MODULE_ARTIFACTS.len());
        assert!(MODULE_ARTIFACTS.iter().all(|name| set.contains(name)));
        assert_eq!(ModuleMaterials::from_artifacts("T", set), materials);
    }
}
