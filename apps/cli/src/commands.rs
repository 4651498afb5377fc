//! CLI command definitions, routing, and tracing setup.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use clap::{Args, Parser, Subcommand};
use color_eyre::eyre::Result;
use courseforge_core::{Addie, CacheStatus, ProgressReporter};
use courseforge_providers::{
    Capabilities, ContextResearcher, HttpResearcher, HttpResearcherConfig, NoResearch,
    OpenAiConfig, OpenAiGenerator,
};
use courseforge_shared::{
    AppConfig, CourseRequest, PipelineConfig, init_config, load_config, load_config_from,
    validate_api_key, validate_endpoints,
};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::info;

// ---------------------------------------------------------------------------
// CLI structure
// ---------------------------------------------------------------------------

/// CourseForge: generate ADDIE course material with resumable checkpoints.
#[derive(Parser)]
#[command(
    name = "courseforge",
    version,
    about = "Generate course analysis, design, and module materials with content-addressed checkpoints.",
    long_about = None,
)]
pub(crate) struct Cli {
    /// Log format: text (default) or json.
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Verbosity level (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Config file to use instead of ~/.courseforge/courseforge.toml.
    #[arg(long = "config", global = true)]
    pub config_file: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

/// Log output format.
#[derive(Clone, Debug, clap::ValueEnum)]
pub(crate) enum LogFormat {
    Text,
    Json,
}

/// Top-level CLI subcommands.
#[derive(Subcommand)]
pub(crate) enum Command {
    /// Generate (or load) course analysis and design.
    Generate {
        #[command(flatten)]
        course: CourseArgs,
    },

    /// Generate (or load) per-module scripts, slides, and assessments.
    Develop {
        #[command(flatten)]
        course: CourseArgs,

        /// Maximum modules developed at once (overrides config).
        #[arg(long)]
        concurrency: Option<usize>,
    },

    /// Configuration management.
    Config {
        /// Config subcommand.
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Inputs identifying one course.
#[derive(Args, Debug)]
pub(crate) struct CourseArgs {
    /// Course name.
    pub name: String,

    /// Course description.
    #[arg(short, long)]
    pub description: String,

    /// Initial learning objectives.
    #[arg(short, long)]
    pub objectives: String,

    /// Ground prompts in researched context.
    #[arg(long)]
    pub research: bool,

    /// Ignore existing checkpoints and write none.
    #[arg(long)]
    pub no_checkpoint: bool,

    /// Checkpoint root (overrides config).
    #[arg(long)]
    pub checkpoint_dir: Option<PathBuf>,
}

impl CourseArgs {
    fn request(&self) -> CourseRequest {
        CourseRequest::new(
            &self.name,
            &self.description,
            &self.objectives,
            self.research,
        )
    }
}

/// Config subcommands.
#[derive(Subcommand)]
pub(crate) enum ConfigAction {
    /// Initialize config file with defaults.
    Init,
    /// Show resolved configuration.
    Show,
}

// ---------------------------------------------------------------------------
// Tracing setup
// ---------------------------------------------------------------------------

/// Initialize tracing based on CLI flags.
pub(crate) fn init_tracing(cli: &Cli) {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = match cli.verbose {
        0 => "courseforge=info",
        1 => "courseforge=debug",
        _ => "courseforge=trace",
    };

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    match cli.log_format {
        LogFormat::Text => {
            fmt()
                .with_env_filter(env_filter)
                .with_target(false)
                .with_writer(std::io::stderr)
                .init();
        }
        LogFormat::Json => {
            fmt()
                .json()
                .with_env_filter(env_filter)
                .with_writer(std::io::stderr)
                .init();
        }
    }
}

// ---------------------------------------------------------------------------
// Command dispatch
// ---------------------------------------------------------------------------

/// Run the CLI command.
pub(crate) async fn run(cli: Cli) -> Result<()> {
    let config_path = cli.config_file.as_deref();
    match cli.command {
        Command::Generate { course } => cmd_generate(config_path, &course).await,
        Command::Develop {
            course,
            concurrency,
        } => cmd_develop(config_path, &course, concurrency).await,
        Command::Config { action } => match action {
            ConfigAction::Init => cmd_config_init(),
            ConfigAction::Show => cmd_config_show(config_path),
        },
    }
}

fn resolve_config(path: Option<&Path>) -> Result<AppConfig> {
    let config = match path {
        Some(path) => load_config_from(path)?,
        None => load_config()?,
    };
    validate_endpoints(&config)?;
    Ok(config)
}

/// Wire the HTTP providers and pipeline from config and flags.
fn build_pipeline(
    config: &AppConfig,
    course: &CourseArgs,
    concurrency: Option<usize>,
    progress: Arc<CliProgress>,
) -> Result<Addie> {
    let mut pipeline_config = PipelineConfig::from(config);
    if let Some(dir) = &course.checkpoint_dir {
        pipeline_config.checkpoint_dir = dir.clone();
    }
    if let Some(n) = concurrency {
        pipeline_config.module_concurrency = n.max(1);
    }

    let api_key = validate_api_key(&config.generator.api_key_env)?;
    let generator = OpenAiGenerator::new(OpenAiConfig::from_config(
        &config.generator,
        api_key,
        pipeline_config.call_timeout,
    ))?;

    let researcher: Arc<dyn ContextResearcher> = if course.research {
        let key = std::env::var(&config.research.api_key_env)
            .ok()
            .filter(|k| !k.is_empty());
        if key.is_none() {
            tracing::warn!(
                env = %config.research.api_key_env,
                "research enabled without an API key"
            );
        }
        Arc::new(HttpResearcher::new(HttpResearcherConfig::from_config(
            &config.research,
            key,
            pipeline_config.call_timeout,
        ))?)
    } else {
        Arc::new(NoResearch)
    };

    let caps = Capabilities::new(Arc::new(generator), researcher);
    Ok(
        Addie::new(caps, &config.generator.system_prompt, &pipeline_config)
            .with_progress(progress),
    )
}

fn use_checkpoint(config: &AppConfig, course: &CourseArgs) -> bool {
    config.pipeline.use_checkpoint && !course.no_checkpoint
}

// ---------------------------------------------------------------------------
// Command handlers
// ---------------------------------------------------------------------------

async fn cmd_generate(config_path: Option<&Path>, course: &CourseArgs) -> Result<()> {
    let config = resolve_config(config_path)?;
    let request = course.request();
    let reporter = Arc::new(CliProgress::new());
    let addie = build_pipeline(&config, course, None, reporter.clone())?;

    info!(
        course = %request.course_name,
        research = request.do_research,
        "generating course"
    );
    let start = Instant::now();
    let result = addie
        .generate_course(&request, use_checkpoint(&config, course))
        .await;
    reporter.finish();
    let output = result?;

    println!();
    println!("  Course: {}", request.course_name);
    println!("  Cache:  {}", output.cache);
    if let Some(dir) = &output.dir {
        println!("  Path:   {}", dir.display());
    }
    println!("  Time:   {:.1}s", start.elapsed().as_secs_f64());
    println!();

    Ok(())
}

async fn cmd_develop(
    config_path: Option<&Path>,
    course: &CourseArgs,
    concurrency: Option<usize>,
) -> Result<()> {
    let config = resolve_config(config_path)?;
    let request = course.request();
    let reporter = Arc::new(CliProgress::new());
    let addie = build_pipeline(&config, course, concurrency, reporter.clone())?;

    info!(course = %request.course_name, "developing modules");
    let start = Instant::now();
    let result = addie
        .develop_modules_materials(&request, use_checkpoint(&config, course))
        .await;
    reporter.finish();
    let modules = result?;

    println!();
    for (i, module) in modules.iter().enumerate() {
        let marker = match module.cache {
            CacheStatus::Hit => "cached",
            CacheStatus::Written => "new",
            CacheStatus::WriteFailed(_) => "new, not cached",
            CacheStatus::Bypassed => "new, uncached",
        };
        println!(
            "  {:>2}. {} ({marker}, {} chars)",
            i + 1,
            module.title,
            module.combined.len()
        );
    }
    println!();
    println!(
        "  {} modules in {:.1}s",
        modules.len(),
        start.elapsed().as_secs_f64()
    );
    println!();

    Ok(())
}

fn cmd_config_init() -> Result<()> {
    let path = init_config()?;
    println!("Config initialized at: {}", path.display());
    Ok(())
}

fn cmd_config_show(config_path: Option<&Path>) -> Result<()> {
    let config = resolve_config(config_path)?;
    let toml_str = toml::to_string_pretty(&config)?;
    println!("{toml_str}");
    Ok(())
}

// ---------------------------------------------------------------------------
// CLI progress reporter
// ---------------------------------------------------------------------------

/// CLI progress reporter using an indicatif spinner.
struct CliProgress {
    spinner: ProgressBar,
}

impl CliProgress {
    fn new() -> Self {
        let spinner = ProgressBar::new_spinner();
        let style = ProgressStyle::with_template("{spinner:.cyan} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]);
        spinner.set_style(style);
        spinner.enable_steady_tick(std::time::Duration::from_millis(80));
        Self { spinner }
    }

    fn finish(&self) {
        self.spinner.finish_and_clear();
    }
}

impl ProgressReporter for CliProgress {
    fn phase(&self, name: &str) {
        self.spinner.set_message(name.to_string());
    }

    fn module_done(&self, title: &str, current: usize, total: usize) {
        self.spinner
            .set_message(format!("[{current}/{total}] {title}"));
    }
}
