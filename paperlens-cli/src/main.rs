//! Paperlens CLI. Search arXiv and analyze papers from the terminal.

mod commands;
mod render;

use clap::Parser;
use paperlens_core::ProviderKind;
use std::path::PathBuf;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

/// Paperlens: search arXiv and analyze papers with an LLM
#[derive(Parser, Debug)]
#[command(name = "paperlens", version, about, long_about = None)]
struct Cli {
    /// Generation provider: anthropic, gemini, mock
    #[arg(long, global = true)]
    provider: Option<String>,

    /// Model to use (defaults to the provider's model)
    #[arg(short, long, global = true)]
    model: Option<String>,

    /// Workspace directory
    #[arg(short, long, default_value = ".", global = true)]
    workspace: PathBuf,

    /// Increase verbosity (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Subcommand, Debug)]
enum Commands {
    /// Search arXiv and list matching papers
    Search {
        /// Search query
        query: String,
        /// Maximum number of results
        #[arg(short = 'n', long)]
        max_results: Option<usize>,
        /// Sort order: relevance, last_updated, submitted
        #[arg(long)]
        sort: Option<String>,
    },
    /// Analyze a single paper by arXiv id
    Analyze {
        /// arXiv id, e.g. 1706.03762
        id: String,
        /// Analysis kind: summary, key_findings, methodology, critique, custom
        #[arg(short, long, default_value = "summary")]
        kind: String,
        /// Custom instruction; overrides the kind's template
        #[arg(short, long)]
        instruction: Option<String>,
    },
    /// Compare two or more papers by arXiv id
    Compare {
        /// arXiv ids
        #[arg(required = true)]
        ids: Vec<String>,
    },
    /// Extract the key concepts across search results
    Concepts {
        query: String,
        #[arg(short = 'n', long)]
        max_results: Option<usize>,
        /// Number of concepts to extract
        #[arg(long, default_value_t = 10)]
        max_concepts: usize,
    },
    /// Generate research questions from search results
    Questions {
        query: String,
        #[arg(short = 'n', long)]
        max_results: Option<usize>,
        /// Number of questions to generate
        #[arg(long, default_value_t = 5)]
        count: usize,
    },
    /// Full review: search, analyze, compare, extract concepts and questions, save
    Review {
        query: String,
        #[arg(short = 'n', long)]
        max_results: Option<usize>,
        /// Output JSON file (defaults to output.results_path)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Download a paper's PDF
    Download {
        id: String,
        /// Target directory (defaults to output.download_dir)
        #[arg(short, long)]
        dir: Option<PathBuf>,
    },
    /// Print a saved results file
    Show {
        /// Results file (defaults to output.results_path)
        path: Option<PathBuf>,
    },
    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(clap::Subcommand, Debug)]
enum ConfigAction {
    /// Create a default configuration file
    Init,
    /// Show the effective configuration
    Show,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file if present
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();

    // Set up tracing: human-readable stderr + JSON file logging
    let filter = match cli.verbose {
        0 if cli.quiet => "error",
        0 => "info",
        1 => "debug",
        _ => "trace",
    };

    let stderr_layer = tracing_subscriber::fmt::layer()
        .with_target(false)
        .with_writer(std::io::stderr)
        .with_filter(EnvFilter::new(filter));

    let log_dir = directories::ProjectDirs::from("dev", "paperlens", "paperlens")
        .map(|d| d.data_dir().join("logs"))
        .unwrap_or_else(|| PathBuf::from("."));
    let _ = std::fs::create_dir_all(&log_dir);
    let file_appender = tracing_appender::rolling::daily(&log_dir, "paperlens.log");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);
    let json_layer = tracing_subscriber::fmt::layer()
        .json()
        .with_writer(non_blocking)
        .with_filter(EnvFilter::new("debug"));

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(json_layer)
        .init();

    let workspace = cli
        .workspace
        .canonicalize()
        .unwrap_or_else(|_| std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")));

    let provider = cli
        .provider
        .as_deref()
        .map(str::parse::<ProviderKind>)
        .transpose()?;
    let overrides = commands::Overrides {
        provider,
        model: cli.model,
    };

    commands::handle_command(cli.command, &workspace, &overrides).await
}
