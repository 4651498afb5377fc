//! Application configuration for CourseForge.
//!
//! User config lives at `~/.courseforge/courseforge.toml`.
//! CLI flags override config file values, which override defaults.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{CourseForgeError, Result};

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "courseforge.toml";

/// Default config directory name under the user's home.
const CONFIG_DIR_NAME: &str = ".courseforge";

// ---------------------------------------------------------------------------
// Config structs (matching courseforge.toml schema)
// ---------------------------------------------------------------------------

/// Top-level application config, deserialized from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Text generation backend.
    #[serde(default)]
    pub generator: GeneratorConfig,

    /// Research backend.
    #[serde(default)]
    pub research: ResearchConfig,

    /// Pipeline behaviour.
    #[serde(default)]
    pub pipeline: PipelineSection,
}

/// `[generator]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneratorConfig {
    /// Base URL of an OpenAI-compatible API (without `/chat/completions`).
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Name of the env var holding the API key (never store the key itself).
    #[serde(default = "default_generator_key_env")]
    pub api_key_env: String,

    /// Model identifier sent with every request.
    #[serde(default = "default_model")]
    pub model: String,

    /// System role text for every generation call.
    #[serde(default = "default_system_prompt")]
    pub system_prompt: String,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            api_key_env: default_generator_key_env(),
            model: default_model(),
            system_prompt: default_system_prompt(),
        }
    }
}

fn default_base_url() -> String {
    "https://openrouter.ai/api/v1".into()
}
fn default_generator_key_env() -> String {
    "OPENAI_API_KEY".into()
}
fn default_model() -> String {
    "openai/gpt-oss-20b".into()
}
fn default_system_prompt() -> String {
    "You are an expert instructional designer.".into()
}

/// `[research]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResearchConfig {
    /// Research endpoint accepting `{"query": ...}`.
    #[serde(default = "default_research_endpoint")]
    pub endpoint: String,

    /// Name of the env var holding the research API key.
    #[serde(default = "default_research_key_env")]
    pub api_key_env: String,
}

impl Default for ResearchConfig {
    fn default() -> Self {
        Self {
            endpoint: default_research_endpoint(),
            api_key_env: default_research_key_env(),
        }
    }
}

fn default_research_endpoint() -> String {
    "http://localhost:8000/fast_search".into()
}
fn default_research_key_env() -> String {
    "RESEARCHER_API_KEY".into()
}

/// `[pipeline]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineSection {
    /// Root of the content-addressed checkpoint tree.
    #[serde(default = "default_checkpoint_dir")]
    pub checkpoint_dir: String,

    /// Read and write checkpoints by default.
    #[serde(default = "default_true")]
    pub use_checkpoint: bool,

    /// Maximum modules developed concurrently.
    #[serde(default = "default_module_concurrency")]
    pub module_concurrency: u32,

    /// Per-call timeout for capability providers.
    #[serde(default = "default_call_timeout")]
    pub call_timeout_secs: u64,
}

impl Default for PipelineSection {
    fn default() -> Self {
        Self {
            checkpoint_dir: default_checkpoint_dir(),
            use_checkpoint: true,
            module_concurrency: default_module_concurrency(),
            call_timeout_secs: default_call_timeout(),
        }
    }
}

fn default_checkpoint_dir() -> String {
    ".addie_checkpoints".into()
}
fn default_true() -> bool {
    true
}
fn default_module_concurrency() -> u32 {
    1
}
fn default_call_timeout() -> u64 {
    120
}

// ---------------------------------------------------------------------------
// Pipeline config (runtime, merged from config + CLI flags)
// ---------------------------------------------------------------------------

/// Runtime pipeline configuration, merged from config file + CLI flags.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Root checkpoint directory.
    pub checkpoint_dir: PathBuf,
    /// Maximum concurrent module pipelines (at least 1).
    pub module_concurrency: usize,
    /// Per-call timeout for both capability providers.
    pub call_timeout: Duration,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self::from(&AppConfig::default())
    }
}

impl From<&AppConfig> for PipelineConfig {
    fn from(config: &AppConfig) -> Self {
        Self {
            checkpoint_dir: PathBuf::from(&config.pipeline.checkpoint_dir),
            module_concurrency: config.pipeline.module_concurrency.max(1) as usize,
            call_timeout: Duration::from_secs(config.pipeline.call_timeout_secs.max(1)),
        }
    }
}

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Get the path to the config directory (`~/.courseforge/`).
pub fn config_dir() -> Result<PathBuf> {
    let home = dirs::home_dir()
        .ok_or_else(|| CourseForgeError::config("could not determine home directory"))?;
    Ok(home.join(CONFIG_DIR_NAME))
}

/// Get the path to the config file (`~/.courseforge/courseforge.toml`).
pub fn config_file_path() -> Result<PathBuf> {
    Ok(config_dir()?.join(CONFIG_FILE_NAME))
}

/// Load the application config from disk. Returns defaults if the file does not exist.
pub fn load_config() -> Result<AppConfig> {
    let path = config_file_path()?;

    if !path.exists() {
        tracing::debug!(?path, "config file not found, using defaults");
        return Ok(AppConfig::default());
    }

    load_config_from(&path)
}

/// Load the application config from a specific file path.
pub fn load_config_from(path: &Path) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| CourseForgeError::io(path, e))?;

    let config: AppConfig = toml::from_str(&content).map_err(|e| {
        CourseForgeError::config(format!("failed to parse {}: {e}", path.display()))
    })?;
    validate_endpoints(&config)?;
    Ok(config)
}

/// Create the config directory and write a default config file.
/// Returns the path to the created file.
pub fn init_config() -> Result<PathBuf> {
    let dir = config_dir()?;
    std::fs::create_dir_all(&dir).map_err(|e| CourseForgeError::io(&dir, e))?;

    let path = dir.join(CONFIG_FILE_NAME);
    let config = AppConfig::default();
    let content =
        toml::to_string_pretty(&config).map_err(|e| CourseForgeError::config(e.to_string()))?;

    std::fs::write(&path, content).map_err(|e| CourseForgeError::io(&path, e))?;
    tracing::info!(?path, "created default config file");

    Ok(path)
}

/// Check that both configured endpoints are absolute http(s) URLs.
pub fn validate_endpoints(config: &AppConfig) -> Result<()> {
    for (section, raw) in [
        ("generator.base_url", &config.generator.base_url),
        ("research.endpoint", &config.research.endpoint),
    ] {
        let url = Url::parse(raw)
            .map_err(|e| CourseForgeError::config(format!("{section} '{raw}' is invalid: {e}")))?;
        if url.scheme() != "http" && url.scheme() != "https" {
            return Err(CourseForgeError::config(format!(
                "{section} must use http or https, got '{}'",
                url.scheme()
            )));
        }
    }
    Ok(())
}

/// Read the API key named by `var_name`, failing if unset or empty.
pub fn validate_api_key(var_name: &str) -> Result<String> {
    match std::env::var(var_name) {
        Ok(val) if !val.is_empty() => Ok(val),
        _ => Err(CourseForgeError::config(format!(
            "API key not found. Set the {var_name} environment variable."
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_serializes() {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config).expect("serialize default config");
        assert!(toml_str.contains("checkpoint_dir"));
        assert!(toml_str.contains("OPENAI_API_KEY"));
        assert!(toml_str.contains("RESEARCHER_API_KEY"));
    }

    #[test]
    fn config_roundtrip() {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config).expect("serialize");
        let parsed: AppConfig = toml::from_str(&toml_str).expect("deserialize");
        assert_eq!(parsed.pipeline.module_concurrency, 1);
        assert_eq!(parsed.generator.model, "openai/gpt-oss-20b");
        assert!(parsed.pipeline.use_checkpoint);
    }

    #[test]
    fn partial_config_fills_defaults() {
        let toml_str = r#"
[pipeline]
checkpoint_dir = "/tmp/courses"
module_concurrency = 4
"#;
        let config: AppConfig = toml::from_str(toml_str).expect("parse");
        assert_eq!(config.pipeline.checkpoint_dir, "/tmp/courses");
        assert_eq!(config.pipeline.call_timeout_secs, 120);
        assert_eq!(config.research.api_key_env, "RESEARCHER_API_KEY");
    }

    #[test]
    fn pipeline_config_from_app_config() {
        let mut app = AppConfig::default();
        app.pipeline.module_concurrency = 0;
        let pipeline = PipelineConfig::from(&app);
        assert_eq!(pipeline.module_concurrency, 1);
        assert_eq!(pipeline.call_timeout, Duration::from_secs(120));
        assert_eq!(pipeline.checkpoint_dir, PathBuf::from(".addie_checkpoints"));
    }

    #[test]
    fn endpoint_validation_rejects_non_http() {
        let mut config = AppConfig::default();
        assert!(validate_endpoints(&config).is_ok());

        config.research.endpoint = "ftp://example.com/search".into();
        let err = validate_endpoints(&config).unwrap_err();
        assert!(err.to_string().contains("research.endpoint"));

        config.research.endpoint = "not a url".into();
        assert!(validate_endpoints(&config).is_err());
    }

    #[test]
    fn api_key_validation() {
        // Use a unique env var name to avoid interfering with other tests
        let result = validate_api_key("CF_TEST_NONEXISTENT_KEY_12345");
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("API key not found"));
    }
}
