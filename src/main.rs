mod aggregate;
mod config;
mod error;
mod fetch;
mod parser;
mod pipeline;
mod render;
mod search;
mod tree;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use anyhow::{bail, Context};
use clap::{Parser, Subcommand, ValueEnum};

use crate::config::Settings;
use crate::fetch::{Document, HttpFetcher};
use crate::parser::enrich::{FrequencyEnricher, NoEnricher, TextEnricher};
use crate::parser::lexicon::{LexiconTagger, LinguisticFilter, NoLinguistics};
use crate::parser::Extractor;
use crate::pipeline::{Pipeline, RunReport, RunRequest};
use crate::search::{compose_query, DuckDuckGoSearch, SearchBackend, StaticUrls};

#[derive(Parser)]
#[command(name = "product_mindmap", about = "Entity → products → features mind maps from web pages")]
struct Cli {
    /// Settings file (default: ./mindmap.toml when present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Search, fetch and extract, then print or write the mind map
    Run {
        #[arg(short, long)]
        entity: String,
        #[arg(short, long)]
        year: String,
        /// Max documents to process (default: max_results setting)
        #[arg(short = 'n', long)]
        limit: Option<usize>,
        /// Add summary keywords as feature candidates
        #[arg(long)]
        advanced: bool,
        /// Process these URLs instead of searching
        #[arg(long = "url")]
        urls: Vec<String>,
        /// Disable the web search backend
        #[arg(long)]
        no_search: bool,
        #[arg(short, long, value_enum, default_value_t = Format::Outline)]
        format: Format,
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Print the URLs a run would process
    Search {
        #[arg(short, long)]
        entity: String,
        #[arg(short, long)]
        year: String,
        #[arg(short = 'n', long)]
        limit: Option<usize>,
    },
    /// Extract from local HTML files, merged in argument order
    Extract {
        #[arg(short, long)]
        entity: String,
        #[arg(long = "file", required = true)]
        files: Vec<PathBuf>,
        #[arg(long)]
        advanced: bool,
        #[arg(short, long, value_enum, default_value_t = Format::Outline)]
        format: Format,
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Format {
    Json,
    Outline,
    Html,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let t0 = Instant::now();
    let cli = Cli::parse();
    let settings = Settings::load(cli.config.as_deref())?;

    let result = match cli.command {
        Commands::Run {
            entity,
            year,
            limit,
            advanced,
            urls,
            no_search,
            format,
            output,
        } => {
            let search: Option<Box<dyn SearchBackend>> = if !urls.is_empty() {
                Some(Box::new(StaticUrls(urls)))
            } else if no_search {
                None
            } else {
                Some(Box::new(DuckDuckGoSearch::new(&settings)?))
            };
            let fetcher = HttpFetcher::new(&settings)?;
            let pipeline = Pipeline::new(
                settings.clone(),
                search,
                Box::new(fetcher),
                extractor(&settings, advanced),
            );
            let request = RunRequest {
                entity,
                year,
                max_documents: limit.unwrap_or(settings.max_results),
                advanced,
            };

            let report = pipeline.run(&request).await?;
            println!(
                "Processed {} documents ({} ok, {} failed).",
                report.documents.total, report.documents.ok, report.documents.failed
            );
            emit(&report, format, output)
        }
        Commands::Search { entity, year, limit } => {
            if entity.trim().is_empty() || year.trim().is_empty() {
                bail!("entity and year are both required");
            }
            let backend = DuckDuckGoSearch::new(&settings)?;
            let query = compose_query(&entity, &year, settings.query_language);
            let urls = backend
                .search(&query, limit.unwrap_or(settings.max_results))
                .await?;
            if urls.is_empty() {
                println!("No results for \"{}\".", query);
            }
            for (i, url) in urls.iter().enumerate() {
                println!("{:>3}. {}", i + 1, url);
            }
            Ok(())
        }
        Commands::Extract {
            entity,
            files,
            advanced,
            format,
            output,
        } => {
            if entity.trim().is_empty() {
                bail!("entity is required");
            }
            let docs = files
                .iter()
                .map(|path| {
                    std::fs::read_to_string(path)
                        .map(|html| Document::local(path.display().to_string(), html))
                        .with_context(|| format!("reading {}", path.display()))
                })
                .collect::<anyhow::Result<Vec<_>>>()?;

            println!("Extracting from {} files...", docs.len());
            let (map, stats) =
                pipeline::aggregate_documents(&extractor(&settings, advanced), &docs, entity.trim(), advanced);
            let report = RunReport::new(
                entity.trim(),
                None,
                None,
                stats,
                &map,
                settings.label_max_chars,
            );
            emit(&report, format, output)
        }
    };

    let elapsed = t0.elapsed();
    if elapsed.as_secs() >= 1 {
        println!("\nDone in {}", format_duration(elapsed));
    }

    result
}

/// Capabilities are picked here, once, and handed to the extractor.
fn extractor(settings: &Settings, advanced: bool) -> Extractor {
    let linguistics: Arc<dyn LinguisticFilter> = if settings.linguistic_filter {
        Arc::new(LexiconTagger::new())
    } else {
        Arc::new(NoLinguistics)
    };
    let enricher: Arc<dyn TextEnricher> = if advanced {
        Arc::new(FrequencyEnricher)
    } else {
        Arc::new(NoEnricher)
    };
    Extractor::new(settings.clone(), linguistics, enricher)
}

fn emit(report: &RunReport, format: Format, output: Option<PathBuf>) -> anyhow::Result<()> {
    if report.is_empty() && format != Format::Json {
        println!("Nothing found for {}.", report.entity);
        return Ok(());
    }
    println!("{} products, {} features.", report.products, report.features);

    let (text, default_path) = match format {
        Format::Outline => (render::to_outline(&report.tree), None),
        Format::Json => (render::to_json(report)?, None),
        Format::Html => {
            let year = report.year.as_deref().unwrap_or("local");
            (
                render::to_html(report)?,
                Some(PathBuf::from(render::output_file_name(&report.entity, year))),
            )
        }
    };

    match output.or(default_path) {
        Some(path) => {
            std::fs::write(&path, text).with_context(|| format!("writing {}", path.display()))?;
            println!("Written to {}", path.display());
        }
        None => print!("{}", text),
    }
    Ok(())
}

fn format_duration(d: std::time::Duration) -> String {
    let secs = d.as_secs();
    if secs < 60 {
        format!("{:.1}s", d.as_secs_f64())
    } else if secs < 3600 {
        format!("{}m {}s", secs / 60, secs % 60)
    } else {
        format!("{}h {}m {}s", secs / 3600, (secs % 3600) / 60, secs % 60)
    }
}
