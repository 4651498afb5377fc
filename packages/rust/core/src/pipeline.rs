//! ADDIE pipeline orchestrator: Analyze → Design → Decompose → Develop.
//!
//! The artifact store acts as a cache at every stage boundary. Course-level
//! analysis and design share one scope keyed on the `"parts"` stage; each
//! module gets its own scope nested inside the course scope.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use serde::{Deserialize, Serialize};
use tokio::sync::Semaphore;
use tracing::{info, instrument, warn};

use courseforge_providers::Capabilities;
use courseforge_shared::{
    ArtifactSet, CacheKey, CourseForgeError, CourseRequest, ModuleIdentity, PipelineConfig,
    Result, StageKind,
};
use courseforge_store::{ArtifactStore, Scope};

use crate::analyze::{Analyze, AnalysisOutput};
use crate::decompose::{Decomposer, ModuleRecord};
use crate::design::{Design, DesignOutput};
use crate::develop::{Develop, MODULE_ARTIFACTS, ModuleMaterials};
use crate::executor::Executor;
use crate::prompts;

/// Stage label for the course-level key.
const PARTS_STAGE: &str = "parts";

/// Artifact names written into each course scope.
pub const COURSE_ARTIFACTS: [&str; 7] = [
    "objectives",
    "audience",
    "resources",
    "analysis_combined",
    "syllabus",
    "slides_plan",
    "assessment_plan",
];

// ---------------------------------------------------------------------------
// Results
// ---------------------------------------------------------------------------

/// How a stage's checkpoint was used.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "status", content = "reason")]
pub enum CacheStatus {
    /// Served entirely from the store.
    Hit,
    /// Generated and persisted.
    Written,
    /// Generated, but persisting failed; the output is still valid.
    WriteFailed(String),
    /// Checkpointing was disabled for this call.
    #[default]
    Bypassed,
}

impl std::fmt::Display for CacheStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Hit => f.write_str("cache hit"),
            Self::Written => f.write_str("generated and cached"),
            Self::WriteFailed(reason) => write!(f, "generated, cache write failed: {reason}"),
            Self::Bypassed => f.write_str("generated, cache bypassed"),
        }
    }
}

/// Course-level analysis and design.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CourseOutput {
    pub analysis: AnalysisOutput,
    pub design: DesignOutput,
    pub cache: CacheStatus,
    /// Course scope directory, when checkpointing was on.
    pub dir: Option<PathBuf>,
}

impl CourseOutput {
    fn to_artifacts(&self) -> ArtifactSet {
        [
            ("objectives", self.analysis.objectives.as_str()),
            ("audience", self.analysis.audience.as_str()),
            ("resources", self.analysis.resources.as_str()),
            ("analysis_combined", self.analysis.combined.as_str()),
            ("syllabus", self.design.syllabus.as_str()),
            ("slides_plan", self.design.slides_plan.as_str()),
            ("assessment_plan", self.design.assessment_plan.as_str()),
        ]
        .into_iter()
        .collect()
    }

    fn from_artifacts(mut set: ArtifactSet, dir: PathBuf) -> Self {
        Self {
            analysis: AnalysisOutput {
                objectives: set.take("objectives"),
                audience: set.take("audience"),
                resources: set.take("resources"),
                combined: set.take("analysis_combined"),
            },
            design: DesignOutput {
                syllabus: set.take("syllabus"),
                slides_plan: set.take("slides_plan"),
                assessment_plan: set.take("assessment_plan"),
            },
            cache: CacheStatus::Hit,
            dir: Some(dir),
        }
    }
}

// ---------------------------------------------------------------------------
// Progress
// ---------------------------------------------------------------------------

/// Progress callback for reporting pipeline status.
pub trait ProgressReporter: Send + Sync {
    /// Called when entering a new phase.
    fn phase(&self, name: &str);
    /// Called as each module's materials are collected, in module order.
    fn module_done(&self, title: &str, current: usize, total: usize);
}

/// No-op progress reporter for headless/test usage.
pub struct SilentProgress;

impl ProgressReporter for SilentProgress {
    fn phase(&self, _name: &str) {}
    fn module_done(&self, _title: &str, _current: usize, _total: usize) {}
}

// ---------------------------------------------------------------------------
// Addie
// ---------------------------------------------------------------------------

/// The ADDIE pipeline with its store and capability handles.
pub struct Addie {
    analyze: Analyze,
    design: Design,
    decomposer: Decomposer,
    develop: Develop,
    store: ArtifactStore,
    module_concurrency: usize,
    progress: Arc<dyn ProgressReporter>,
}

impl Addie {
    /// Build a pipeline. The config's call timeout replaces the one on `caps`.
    pub fn new(caps: Capabilities, system_prompt: &str, config: &PipelineConfig) -> Self {
        let exec = Executor::new(caps.with_timeout(config.call_timeout), system_prompt);
        Self {
            analyze: Analyze::new(exec.clone()),
            design: Design::new(exec.clone()),
            decomposer: Decomposer::new(exec.clone()),
            develop: Develop::new(exec),
            store: ArtifactStore::new(&config.checkpoint_dir),
            module_concurrency: config.module_concurrency.max(1),
            progress: Arc::new(SilentProgress),
        }
    }

    pub fn with_progress(mut self, progress: Arc<dyn ProgressReporter>) -> Self {
        self.progress = progress;
        self
    }

    pub fn store(&self) -> &ArtifactStore {
        &self.store
    }

    /// Analysis and design for one course, served from the store when possible.
    pub async fn generate_course(
        &self,
        request: &CourseRequest,
        use_checkpoint: bool,
    ) -> Result<CourseOutput> {
        self.course_with_scope(request, use_checkpoint)
            .await
            .map(|(output, _)| output)
    }

    /// Load or regenerate the design, split it into modules, and develop
    /// every module. Results come back in module order.
    #[instrument(skip_all, fields(course = %request.course_name, use_checkpoint = use_checkpoint))]
    pub async fn develop_modules_materials(
        &self,
        request: &CourseRequest,
        use_checkpoint: bool,
    ) -> Result<Vec<ModuleMaterials>> {
        let start = Instant::now();
        let (course, course_scope) = self.course_with_scope(request, use_checkpoint).await?;

        self.progress.phase("Decomposing design into modules");
        let modules = self
            .decomposer
            .decompose(
                &course.design.syllabus,
                &course.design.slides_plan,
                &course.design.assessment_plan,
            )
            .await
            .map_err(|e| e.in_stage(StageKind::Decompose, &request.course_name))?;

        let total = modules.len();
        self.progress.phase(&format!("Developing {total} modules"));

        let module_cache = match (use_checkpoint, course_scope) {
            (false, _) => ModuleCache::Off,
            (true, Some(scope)) => ModuleCache::On(self.store.clone(), scope),
            (true, None) => ModuleCache::Unavailable,
        };
        let semaphore = Arc::new(Semaphore::new(self.module_concurrency));
        let request = Arc::new(request.clone());

        let mut handles = Vec::with_capacity(total);
        for (index, module) in modules.into_iter().enumerate() {
            let develop = self.develop.clone();
            let cache = module_cache.clone();
            let request = Arc::clone(&request);
            let sem = Arc::clone(&semaphore);

            handles.push(tokio::spawn(async move {
                let _permit = sem
                    .acquire_owned()
                    .await
                    .map_err(|e| CourseForgeError::Task(e.to_string()))?;
                develop_one(&develop, &cache, &request, index, &module)
                    .await
                    .map_err(|e| e.in_stage(StageKind::Develop, &module.title))
            }));
        }

        let mut materials = Vec::with_capacity(total);
        let mut pending = handles.into_iter();
        while let Some(handle) = pending.next() {
            let outcome = match handle.await {
                Ok(result) => result,
                Err(e) => Err(CourseForgeError::Task(format!("module task failed: {e}"))),
            };
            match outcome {
                Ok(done) => {
                    self.progress.module_done(&done.title, materials.len() + 1, total);
                    materials.push(done);
                }
                Err(err) => {
                    for rest in pending {
                        rest.abort();
                    }
                    return Err(err);
                }
            }
        }

        info!(
            modules = materials.len(),
            hits = materials.iter().filter(|m| m.cache == CacheStatus::Hit).count(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "modules developed"
        );
        Ok(materials)
    }

    #[instrument(skip_all, fields(course = %request.course_name, use_checkpoint = use_checkpoint))]
    async fn course_with_scope(
        &self,
        request: &CourseRequest,
        use_checkpoint: bool,
    ) -> Result<(CourseOutput, Option<Scope>)> {
        let start = Instant::now();
        let key = CacheKey::for_stage(request, PARTS_STAGE, prompts::template_version());

        let mut scope_error = None;
        let scope = if use_checkpoint {
            match self
                .store
                .scope_path(None, &request.course_name, "course", &key)
            {
                Ok(scope) => Some(scope),
                Err(e) => {
                    warn!(%key, error = %e, "course scope unavailable, continuing uncached");
                    scope_error = Some(e.to_string());
                    None
                }
            }
        } else {
            None
        };

        if let Some(scope) = &scope {
            if self.store.exists(scope, &COURSE_ARTIFACTS) {
                match self.store.read_complete(scope, &COURSE_ARTIFACTS) {
                    Ok(set) => {
                        info!(%key, dir = %scope.dir().display(), "course cache hit");
                        let output = CourseOutput::from_artifacts(set, scope.dir().to_path_buf());
                        return Ok((output, Some(scope.clone())));
                    }
                    Err(e) => warn!(%key, error = %e, "cached course unreadable, regenerating"),
                }
            }
        }

        self.progress.phase("Analyzing course");
        let analysis = self
            .analyze
            .analyze_all_aligned(request)
            .await
            .map_err(|e| e.in_stage(StageKind::Analyze, &request.course_name))?;

        self.progress.phase("Designing course");
        let design = self
            .design
            .design_all(&analysis.combined)
            .await
            .map_err(|e| e.in_stage(StageKind::Design, &request.course_name))?;

        let mut output = CourseOutput {
            analysis,
            design,
            cache: CacheStatus::Bypassed,
            dir: scope.as_ref().map(|s| s.dir().to_path_buf()),
        };
        output.cache = match (&scope, scope_error) {
            (Some(scope), _) => persist(&self.store, scope, &output.to_artifacts()),
            (None, Some(reason)) => CacheStatus::WriteFailed(reason),
            (None, None) => CacheStatus::Bypassed,
        };

        info!(
            %key,
            cache = %output.cache,
            elapsed_ms = start.elapsed().as_millis() as u64,
            "course generated"
        );
        Ok((output, scope))
    }
}

/// Where module artifacts are checkpointed.
#[derive(Clone)]
enum ModuleCache {
    Off,
    /// Checkpointing was requested but the course scope could not be created.
    Unavailable,
    On(ArtifactStore, Scope),
}

async fn develop_one(
    develop: &Develop,
    cache: &ModuleCache,
    request: &CourseRequest,
    index: usize,
    module: &ModuleRecord,
) -> Result<ModuleMaterials> {
    let digest = module.design_digest();
    let key = CacheKey::for_module(
        request,
        prompts::template_version(),
        &ModuleIdentity {
            title: &module.title,
            index,
            design_digest: &digest,
        },
    );

    let target = match cache {
        ModuleCache::On(store, course_scope) => {
            match store.scope_path(Some(course_scope), &module.title, "module", &key) {
                Ok(scope) => Some((store, scope)),
                Err(e) => {
                    warn!(module = %module.title, error = %e, "module scope unavailable");
                    None
                }
            }
        }
        _ => None,
    };

    if let Some((store, scope)) = &target {
        if store.exists(scope, &MODULE_ARTIFACTS) {
            match store.read_complete(scope, &MODULE_ARTIFACTS) {
                Ok(set) => {
                    info!(module = %module.title, %key, "module cache hit");
                    return Ok(ModuleMaterials::from_artifacts(&module.title, set));
                }
                Err(e) => {
                    warn!(module = %module.title, error = %e, "cached module unreadable, regenerating")
                }
            }
        }
    }

    let mut materials = develop.develop_module(request, module).await?;
    materials.cache = match (&target, cache) {
        (Some((store, scope)), _) => persist(store, scope, &materials.to_artifacts()),
        (None, ModuleCache::Off) => CacheStatus::Bypassed,
        (None, _) => CacheStatus::WriteFailed("module scope unavailable".into()),
    };
    info!(module = %module.title, index, cache = %materials.cache, "module developed");
    Ok(materials)
}

/// Write a scope, downgrading failure to a status.
fn persist(store: &ArtifactStore, scope: &Scope, artifacts: &ArtifactSet) -> CacheStatus {
    match store.write_all(scope, artifacts) {
        Ok(()) => CacheStatus::Written,
        Err(e) => {
            warn!(dir = %scope.dir().display(), error = %e, "checkpoint write failed, output kept");
            CacheStatus::WriteFailed(e.to_string())
        }
    }
}

// ---------------------------------------------------------------------------
// Blocking facade
// ---------------------------------------------------------------------------

/// Runs [`Addie`] on an owned current-thread runtime for synchronous callers.
///
/// Must not be used from inside another tokio runtime.
pub struct BlockingAddie {
    inner: Addie,
    runtime: tokio::runtime::Runtime,
}

impl BlockingAddie {
    pub fn new(inner: Addie) -> Result<Self> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|e| CourseForgeError::Task(format!("failed to start runtime: {e}")))?;
        Ok(Self { inner, runtime })
    }

    pub fn generate_course(
        &self,
        request: &CourseRequest,
        use_checkpoint: bool,
    ) -> Result<CourseOutput> {
        self.runtime
            .block_on(self.inner.generate_course(request, use_checkpoint))
    }

    pub fn develop_modules_materials(
        &self,
        request: &CourseRequest,
        use_checkpoint: bool,
    ) -> Result<Vec<ModuleMaterials>> {
        self.runtime
            .block_on(self.inner.develop_modules_materials(request, use_checkpoint))
    }
}
