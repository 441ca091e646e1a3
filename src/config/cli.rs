use crate::config::toml_config::WorkflowConfig;
use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "news-pages")]
#[command(about = "Build the AI news page and publish it to a pages branch", version)]
pub struct Cli {
    /// Workflow configuration file (defaults to ./news-pages.toml when present)
    #[arg(short, long, global = true, env = "NEWS_PAGES_CONFIG")]
    pub config: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Log output format
    #[arg(long, global = true, value_enum, default_value_t = LogFormat::Text)]
    pub log_format: LogFormat,

    /// Log process CPU and memory after each build phase
    #[arg(long, global = true)]
    pub monitor: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    Text,
    Json,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Fetch, filter and render the site without running the workflow
    Build(BuildArgs),
    /// Manually dispatch the full workflow once
    Run,
    /// Run the workflow on its cron schedule until interrupted
    Schedule(ScheduleArgs),
    /// Validate the configuration and show upcoming scheduled runs
    Validate,
}

#[derive(Debug, Default, Args)]
pub struct BuildArgs {
    /// Directory the site is written to (wiped first)
    #[arg(long)]
    pub output_path: Option<String>,

    /// NewsAPI search query
    #[arg(long)]
    pub query: Option<String>,

    /// NewsAPI endpoint
    #[arg(long)]
    pub endpoint: Option<String>,

    /// Number of articles to request
    #[arg(long)]
    pub page_size: Option<u32>,
}

impl BuildArgs {
    pub fn apply(&self, config: &mut WorkflowConfig) {
        if let Some(output_path) = &self.output_path {
            config.site.output_path = output_path.clone();
        }
        if let Some(query) = &self.query {
            config.source.query = query.clone();
        }
        if let Some(endpoint) = &self.endpoint {
            config.source.endpoint = endpoint.clone();
        }
        if let Some(page_size) = self.page_size {
            config.source.page_size = page_size;
        }
    }
}

#[derive(Debug, Default, Args)]
pub struct ScheduleArgs {
    /// Run once immediately before waiting for the first tick
    #[arg(long)]
    pub run_on_start: bool,

    /// Stop after this many runs
    #[arg(long)]
    pub max_runs: Option<usize>,
}
