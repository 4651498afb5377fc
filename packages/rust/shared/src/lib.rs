//! Shared types, error model, and configuration for CourseForge.
//!
//! This crate is the foundation depended on by all other CourseForge crates.
//! It provides:
//! - [`CourseForgeError`]: the unified error type
//! - Domain types ([`CourseRequest`], [`CacheKey`], [`ArtifactSet`], [`StageKind`])
//! - Configuration ([`AppConfig`], [`PipelineConfig`], config loading)

pub mod config;
pub mod error;
pub mod types;

// Re-export public API at crate root for ergonomic imports.
pub use config::{
    AppConfig, GeneratorConfig, PipelineConfig, PipelineSection, ResearchConfig, config_dir,
    config_file_path, init_config, load_config, load_config_from, validate_api_key,
    validate_endpoints,
};
pub use error::{CourseForgeError, Result};
pub use types::{
    ArtifactSet, CACHE_KEY_LEN, CURRENT_SCHEMA_VERSION, CacheKey, CourseRequest, ModuleIdentity,
    StageKind, content_digest,
};
