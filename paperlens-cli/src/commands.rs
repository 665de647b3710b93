//! CLI subcommand handlers.

use crate::render::{banner, paper_listing, section, wrapped};
use crate::{Commands, ConfigAction};
use paperlens_core::config::{self, AppConfig};
use paperlens_core::{
    AnalysisKind, AnalysisOrchestrator, ArxivClient, GenerationProvider, PaperRecord,
    ProviderKind, ResultStore, SearchQuery, SortCriterion, create_provider,
};
use std::path::{Path, PathBuf};

/// Settings given on the command line that win over every config layer.
#[derive(Debug, Default)]
pub struct Overrides {
    pub provider: Option<ProviderKind>,
    pub model: Option<String>,
}

impl Overrides {
    /// Apply to a loaded config. Switching provider drops the model and
    /// credential variable configured for the previous one.
    pub fn apply(&self, config: &mut AppConfig) {
        if let Some(provider) = self.provider {
            if provider != config.llm.provider {
                config.llm.provider = provider;
                config.llm.model = None;
                config.llm.api_key_env = None;
                config.llm.api_key = None;
            }
        }
        if let Some(model) = &self.model {
            config.llm.model = Some(model.clone());
        }
    }
}

/// Load the layered config and apply command-line overrides.
fn effective_config(workspace: &Path, overrides: &Overrides) -> anyhow::Result<AppConfig> {
    let mut config = config::load_config(Some(workspace))
        .map_err(|e| anyhow::anyhow!("Configuration error: {}", e))?;
    overrides.apply(&mut config);
    Ok(config)
}

/// Handle a CLI subcommand.
pub async fn handle_command(
    command: Commands,
    workspace: &Path,
    overrides: &Overrides,
) -> anyhow::Result<()> {
    let config = match &command {
        Commands::Config { .. } => AppConfig::default(),
        _ => effective_config(workspace, overrides)?,
    };

    match command {
        Commands::Config { action } => handle_config(action, workspace, overrides),
        Commands::Search {
            query,
            max_results,
            sort,
        } => {
            let papers = search(&config, &query, max_results, sort.as_deref()).await?;
            print_listing(&papers);
            Ok(())
        }
        Commands::Analyze {
            id,
            kind,
            instruction,
        } => {
            let kind = AnalysisKind::parse_lenient(&kind);
            let orchestrator = orchestrator(&config)?;
            let paper = fetch(&id).await?;
            let analysis = orchestrator
                .analyze(&paper, kind, instruction.as_deref())
                .await?;
            println!("{}", banner(&paper.title));
            println!("{}", section("Analysis", &analysis));
            Ok(())
        }
        Commands::Compare { ids } => {
            let orchestrator = orchestrator(&config)?;
            let client = ArxivClient::new()?;
            let mut papers = Vec::with_capacity(ids.len());
            for id in &ids {
                papers.push(PaperRecord::from(client.fetch(id).await?));
            }
            let comparison = orchestrator.compare(&papers, None).await?;
            println!("{}", section("Comparative Analysis", &comparison));
            Ok(())
        }
        Commands::Concepts {
            query,
            max_results,
            max_concepts,
        } => {
            let orchestrator = orchestrator(&config)?;
            let papers = search(&config, &query, max_results, None).await?;
            let concepts = orchestrator.extract_concepts(&papers, max_concepts).await?;
            println!("{}", section("Key Concepts", &concepts));
            Ok(())
        }
        Commands::Questions {
            query,
            max_results,
            count,
        } => {
            let orchestrator = orchestrator(&config)?;
            let papers = search(&config, &query, max_results, None).await?;
            let questions = orchestrator
                .generate_research_questions(&papers, count)
                .await?;
            println!("{}", section("Research Questions", &questions));
            Ok(())
        }
        Commands::Review {
            query,
            max_results,
            output,
        } => {
            let output = resolve(
                workspace,
                output.unwrap_or_else(|| config.output.results_path.clone()),
            );
            let orchestrator = orchestrator(&config)?;
            run_review(&orchestrator, &config, &query, max_results, &output).await
        }
        Commands::Download { id, dir } => {
            let dir = resolve(
                workspace,
                dir.unwrap_or_else(|| config.output.download_dir.clone()),
            );
            let path = ArxivClient::new()?.download_pdf(&id, &dir).await?;
            println!("Downloaded paper to: {}", path.display());
            Ok(())
        }
        Commands::Show { path } => {
            let path = resolve(
                workspace,
                path.unwrap_or_else(|| config.output.results_path.clone()),
            );
            let papers = ResultStore::load(&path)?;
            for (i, paper) in papers.iter().enumerate() {
                println!("{}", paper_listing(i + 1, paper));
                if let Some(analysis) = paper.analysis() {
                    println!("{}", wrapped(analysis));
                    println!();
                }
            }
            Ok(())
        }
    }
}

fn handle_config(
    action: ConfigAction,
    workspace: &Path,
    overrides: &Overrides,
) -> anyhow::Result<()> {
    match action {
        ConfigAction::Init => {
            match config::write_default_config(workspace)? {
                Some(path) => println!("Created default configuration at: {}", path.display()),
                None => println!(
                    "Configuration file already exists at: {}",
                    config::workspace_config_path(workspace).display()
                ),
            }
            Ok(())
        }
        ConfigAction::Show => {
            let mut config = effective_config(workspace, overrides)?;
            config.llm = config.llm.redacted();
            let toml_str = toml::to_string_pretty(&config)?;
            println!("{}", toml_str);
            Ok(())
        }
    }
}

fn resolve(workspace: &Path, path: PathBuf) -> PathBuf {
    if path.is_absolute() {
        path
    } else {
        workspace.join(path)
    }
}

fn orchestrator(config: &AppConfig) -> anyhow::Result<AnalysisOrchestrator> {
    let provider = create_provider(&config.llm)?;
    tracing::info!(
        provider = provider.name(),
        model = provider.model_name(),
        "Provider ready"
    );
    Ok(AnalysisOrchestrator::new(provider))
}

async fn search(
    config: &AppConfig,
    query: &str,
    max_results: Option<usize>,
    sort: Option<&str>,
) -> anyhow::Result<Vec<PaperRecord>> {
    let query = SearchQuery::new(query)
        .with_max_results(max_results.unwrap_or(config.search.max_results))
        .with_sort(sort.map_or(config.search.sort, SortCriterion::from_str_loose));
    let client = ArxivClient::new()?;
    let papers = client.search(&query).await?;
    Ok(papers.into_iter().map(PaperRecord::from).collect())
}

async fn fetch(id: &str) -> anyhow::Result<PaperRecord> {
    Ok(PaperRecord::from(ArxivClient::new()?.fetch(id).await?))
}

fn print_listing(papers: &[PaperRecord]) {
    println!("\nFound {} papers:\n", papers.len());
    for (i, paper) in papers.iter().enumerate() {
        println!("{}", paper_listing(i + 1, paper));
    }
}

/// Search, then run the review steps over the results.
async fn run_review(
    orchestrator: &AnalysisOrchestrator,
    config: &AppConfig,
    query: &str,
    max_results: Option<usize>,
    output: &Path,
) -> anyhow::Result<()> {
    println!("{}", banner(&format!("Searching for papers on '{}'...", query)));
    let papers = search(config, query, max_results, None).await?;
    print_listing(&papers);
    review_papers(orchestrator, &papers, output).await
}

/// Analyze the top hit, batch-analyze and save, then compare, extract
/// concepts and questions.
///
/// The batch results are on disk before any later step can fail.
async fn review_papers(
    orchestrator: &AnalysisOrchestrator,
    papers: &[PaperRecord],
    output: &Path,
) -> anyhow::Result<()> {
    let Some(first) = papers.first() else {
        println!("No papers found; nothing to analyze.");
        return Ok(());
    };

    println!("{}", banner("Analyzing first paper..."));
    let analysis = orchestrator.analyze(first, AnalysisKind::Summary, None).await?;
    println!("{}", section("Analysis", &analysis));

    println!("{}", banner("Performing batch analysis..."));
    let analyzed = orchestrator
        .batch_analyze(papers, AnalysisKind::KeyFindings, None)
        .await;
    let failed = analyzed.iter().filter(|p| p.has_failed_analysis()).count();
    if failed > 0 {
        tracing::warn!(failed, total = analyzed.len(), "Some analyses failed");
    }
    ResultStore::save(&analyzed, output)?;
    println!("Results saved to {}", output.display());

    if papers.len() >= 2 {
        println!("{}", banner("Comparing papers..."));
        let comparison = orchestrator.compare(&papers[..2], None).await?;
        println!("{}", section("Comparative Analysis", &comparison));
    }

    println!("{}", banner("Extracting key concepts..."));
    let concepts = orchestrator.extract_concepts(papers, 10).await?;
    println!("{}", section("Key Concepts", &concepts));

    println!("{}", banner("Generating research questions..."));
    let questions = orchestrator
        .generate_research_questions(papers, 5)
        .await?;
    println!("{}", section("Research Questions", &questions));
    Ok(())
}
