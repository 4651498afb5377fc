//! CourseForge CLI: staged, checkpointed ADDIE course generation.
//!
//! Generates course analysis and design, then per-module materials, caching
//! every stage under a content-addressed checkpoint directory.

mod commands;

use clap::Parser;
use color_eyre::eyre::Result;

use commands::Cli;

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    // A missing .env is fine; keys may come from the real environment.
    let _ = dotenvy::dotenv();
    let cli = Cli::parse();
    commands::init_tracing(&cli);
    commands::run(cli).await
}
