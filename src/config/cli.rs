use super::toml_config::QuizConfig;
use crate::utils::logger::LogFormat;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "mdx-quiz")]
#[command(about = "Lint MDX pages, generate MCQ banks from them and publish the banks")]
#[command(version)]
pub struct Cli {
    /// Path to TOML configuration file (default: ./quiz.toml when present)
    #[arg(short, long, global = true, env = "MDX_QUIZ_CONFIG")]
    pub config: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Log CPU and memory usage per phase
    #[arg(long, global = true)]
    pub monitor: bool,

    #[arg(long, global = true, value_enum, default_value_t = LogFormat::Compact)]
    pub log_format: LogFormat,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// List every document with its bank key, title, link count and token estimate
    Scan(ContentArgs),
    /// Check front-matter, layouts and internal links
    Lint(LintArgs),
    /// Print every link of every document with its classification
    Links(ContentArgs),
    /// Generate one question bank per document
    Generate(GenerateArgs),
    /// Generate a full-length bank for one topic
    Topic(TopicArgs),
    /// Upsert question banks into the configured store
    Publish(PublishArgs),
    /// Write all banks of a directory into one CSV file
    Export(ExportArgs),
}

#[derive(Debug, Clone, Args)]
pub struct ContentArgs {
    /// Content root (overrides content.root)
    #[arg(long)]
    pub root: Option<PathBuf>,
}

#[derive(Debug, Clone, Args)]
pub struct LintArgs {
    #[command(flatten)]
    pub content: ContentArgs,

    /// Directory of static assets for absolute links (overrides lint.public_dir)
    #[arg(long)]
    pub public_dir: Option<PathBuf>,
}

#[derive(Debug, Clone, Args)]
pub struct GenerateArgs {
    #[command(flatten)]
    pub content: ContentArgs,

    /// Output directory (overrides load.output_path)
    #[arg(long)]
    pub output: Option<PathBuf>,

    /// Regenerate banks that already exist
    #[arg(long)]
    pub force: bool,

    /// Show what would be processed without calling the model
    #[arg(long)]
    pub dry_run: bool,
}

#[derive(Debug, Clone, Args)]
pub struct TopicArgs {
    #[command(flatten)]
    pub generate: GenerateArgs,

    /// Topic name matched against bank keys (overrides topic.name)
    #[arg(long)]
    pub topic: Option<String>,
}

#[derive(Debug, Clone, Args)]
pub struct PublishArgs {
    /// Directory of bank files (overrides publish.source_path)
    #[arg(long)]
    pub source: Option<PathBuf>,

    /// Report what would change without writing to the store
    #[arg(long)]
    pub dry_run: bool,
}

#[derive(Debug, Clone, Args)]
pub struct ExportArgs {
    /// Directory of bank files (overrides load.output_path)
    #[arg(long)]
    pub source: Option<PathBuf>,

    /// CSV file to write
    #[arg(long, default_value = "questions.csv")]
    pub output: PathBuf,
}

fn path_string(path: &std::path::Path) -> String {
    path.to_string_lossy().into_owned()
}

impl ContentArgs {
    pub fn apply(&self, config: &mut QuizConfig) {
        if let Some(root) = &self.root {
            config.content.root = path_string(root);
            tracing::info!("🔧 Content root overridden to: {}", config.content.root);
        }
    }
}

impl LintArgs {
    pub fn apply(&self, config: &mut QuizConfig) {
        self.content.apply(config);
        if let Some(public_dir) = &self.public_dir {
            config.lint.public_dir = Some(path_string(public_dir));
        }
    }
}

impl GenerateArgs {
    pub fn apply(&self, config: &mut QuizConfig) {
        self.content.apply(config);
        if let Some(output) = &self.output {
            config.load.output_path = path_string(output);
            tracing::info!("🔧 Output path overridden to: {}", config.load.output_path);
        }
        if self.force {
            config.generator.skip_existing = false;
        }
    }
}

impl TopicArgs {
    pub fn apply(&self, config: &mut QuizConfig) {
        self.generate.apply(config);
        if let Some(topic) = &self.topic {
            config.topic.name = Some(topic.clone());
        }
    }
}

impl PublishArgs {
    pub fn apply(&self, config: &mut QuizConfig) {
        if let Some(source) = &self.source {
            config.publish.source_path = path_string(source);
        }
    }
}
