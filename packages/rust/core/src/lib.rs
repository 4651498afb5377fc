//! Core pipeline orchestration and domain logic for CourseForge.
//!
//! Stage executors ([`analyze`], [`design`], [`develop`]) turn prompts into
//! artifacts, [`decompose`] splits a course design into modules, and
//! [`pipeline`] ties them together with the checkpoint store into the ADDIE
//! workflow (`generate_course`, `develop_modules_materials`).

pub mod analyze;
pub mod decompose;
pub mod design;
pub mod develop;
pub mod executor;
pub mod pipeline;
pub mod prompts;

#[cfg(test)]
mod testing;

pub use analyze::{Analyze, AnalysisOutput};
pub use decompose::{Decomposer, ModuleRecord, parse_modules};
pub use design::{Design, DesignOutput};
pub use develop::{Develop, ModuleMaterials};
pub use executor::Executor;
pub use pipeline::{
    Addie, BlockingAddie, COURSE_ARTIFACTS, CacheStatus, CourseOutput, ProgressReporter,
    SilentProgress,
};
