//! Knowledge Crawler main entry point
//!
//! This is the command-line interface for the knowledge crawler.

use anyhow::Context;
use clap::{Parser, Subcommand};
use knowledge_crawler::config::{load_runtime_config, Config};
use knowledge_crawler::events::{CrawlEvent, EventBus};
use knowledge_crawler::output::{load_statistics, print_statistics};
use knowledge_crawler::storage::{open_storage, ArticleSummary, SqliteStorage, Storage};
use knowledge_crawler::Orchestrator;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

/// Knowledge Crawler: a polite topic crawler
///
/// Crawls a fixed list of technical sites, follows the links of each seed
/// page while respecting robots.txt and politeness delays, and stores the
/// English articles it finds classified by topic.
#[derive(Parser, Debug)]
#[command(name = "knowledge-crawler")]
#[command(version = "1.0.0")]
#[command(about = "A polite topic crawler", long_about = None)]
struct Cli {
    /// Path to TOML configuration file (built-in defaults when omitted)
    #[arg(short, long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    quiet: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Crawl every seed site once (Ctrl-C stops the task)
    Crawl,

    /// Crawl a single site outside of any task
    CrawlSite {
        /// Seed URL of the site
        url: String,
    },

    /// Show the latest crawl task
    Status,

    /// Show statistics from the database
    Stats,

    /// List topics with their article counts
    Topics,

    /// List the newest articles of a topic
    Articles {
        topic: String,
    },

    /// Search article titles and content
    Search {
        query: String,
    },

    /// Validate the configuration and show what would be crawled
    DryRun,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // A missing .env file is not an error
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();
    setup_logging(cli.verbose, cli.quiet);

    match &cli.config {
        Some(path) => tracing::info!("Loading configuration from: {}", path.display()),
        None => tracing::info!("Using built-in configuration"),
    }
    let (config, config_hash) = match load_runtime_config(cli.config.as_deref()) {
        Ok(loaded) => loaded,
        Err(e) => {
            tracing::error!("Failed to load configuration: {}", e);
            return Err(e.into());
        }
    };
    if let Some(hash) = &config_hash {
        tracing::info!("Configuration loaded successfully (hash: {})", hash);
    }

    match cli.command {
        Command::DryRun => handle_dry_run(&config),
        Command::Crawl => handle_crawl(config).await,
        Command::CrawlSite { url } => handle_crawl_site(config, &url).await,
        Command::Status => handle_status(&open(&config)?),
        Command::Stats => handle_stats(&config),
        Command::Topics => handle_topics(&open(&config)?),
        Command::Articles { topic } => {
            print_articles(&open(&config)?.articles_by_topic(&topic)?);
            Ok(())
        }
        Command::Search { query } => {
            print_articles(&open(&config)?.search_articles(&query)?);
            Ok(())
        }
    }
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("knowledge_crawler=info,warn"),
            1 => EnvFilter::new("knowledge_crawler=debug,info"),
            2 => EnvFilter::new("knowledge_crawler=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

fn open(config: &Config) -> anyhow::Result<SqliteStorage> {
    let path = Path::new(&config.output.database_path);
    open_storage(path).with_context(|| format!("failed to open database {}", path.display()))
}

fn build_orchestrator(config: Config, bus: Arc<EventBus>) -> anyhow::Result<Orchestrator> {
    let storage = Arc::new(open(&config)?);
    Ok(Orchestrator::new(config, storage, bus))
}

fn print_event(event: &CrawlEvent) {
    println!("{}", event.to_json());
}

/// Runs one full crawl task, printing its events as JSON lines
async fn handle_crawl(config: Config) -> anyhow::Result<()> {
    tracing::info!(
        "Seed sites: {}, topics: {}, robots.txt: {}",
        config.targets.len(),
        config.topics.len(),
        if config.crawler.respect_robots { "respected" } else { "ignored" }
    );

    let bus = Arc::new(EventBus::new());
    let orchestrator = Arc::new(build_orchestrator(config, bus.clone())?);
    let mut events = bus.subscribe();

    let (task_id, mut handle) = orchestrator.spawn_crawl()?;
    tracing::info!("Crawl task {} started", task_id);

    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);
    let mut stopping = false;

    let status = loop {
        tokio::select! {
            Some(event) = events.recv() => print_event(&event),
            result = &mut handle => break result??,
            _ = &mut ctrl_c, if !stopping => {
                tracing::warn!("Interrupt received, stopping crawl task {}", task_id);
                stopping = true;
                orchestrator.stop_crawl();
            }
        }
    };

    while let Ok(event) = events.try_recv() {
        print_event(&event);
    }

    tracing::info!("Crawl task {} finished: {}", task_id, status);
    Ok(())
}

async fn handle_crawl_site(config: Config, url: &str) -> anyhow::Result<()> {
    let bus = Arc::new(EventBus::new());
    let orchestrator = build_orchestrator(config, bus.clone())?;

    let report = orchestrator.crawl_single_site(url).await?;
    for event in bus.recent(usize::MAX) {
        print_event(&event);
    }

    println!("\nSite: {}", report.url);
    println!("  Outcome: {:?}", report.outcome);
    println!("  Links found: {}", report.links_found);
    println!("  Pages saved: {}", report.pages_saved);
    println!("  Pages skipped: {}", report.pages_skipped);
    println!("  Pages failed: {}", report.pages_failed);
    Ok(())
}

fn handle_status(storage: &dyn Storage) -> anyhow::Result<()> {
    match storage.get_latest_task()? {
        Some(task) => {
            println!("Latest task: {}", task.id);
            println!("  Status: {}", task.status);
            println!("  Progress: {:.1}%", task.progress);
            println!("  Created: {}", task.created_at);
            println!("  Updated: {}", task.updated_at);
        }
        None => println!("No crawl tasks recorded"),
    }

    println!("\nSites crawled: {}", storage.count_sites_crawled()?);
    println!("Pages found: {}", storage.count_articles()?);
    Ok(())
}

fn handle_stats(config: &Config) -> anyhow::Result<()> {
    println!("Database: {}\n", config.output.database_path);

    let storage = open(config)?;
    let stats = load_statistics(&storage)?;
    print_statistics(&stats);

    Ok(())
}

fn handle_topics(storage: &dyn Storage) -> anyhow::Result<()> {
    let topics = storage.topic_stats()?;
    if topics.is_empty() {
        println!("No articles saved yet");
        return Ok(());
    }

    for topic in topics {
        println!(
            "{:<24} {:>6}  {}",
            topic.name,
            topic.count,
            topic.last_update.as_deref().unwrap_or("-")
        );
    }
    Ok(())
}

fn print_articles(articles: &[ArticleSummary]) {
    if articles.is_empty() {
        println!("No articles found");
        return;
    }

    for article in articles {
        println!("{}  [{}] {}", article.created_at, article.topic, article.display_title());
        println!("    {}", article.url);
    }
}

/// Validates the configuration and shows what would be crawled
fn handle_dry_run(config: &Config) -> anyhow::Result<()> {
    println!("=== Knowledge Crawler Dry Run ===\n");

    println!("Crawler Configuration:");
    println!("  User agent: {}", config.crawler.user_agent);
    println!("  Minimum delay: {}s", config.crawler.min_delay_secs);
    println!("  Timeout: {}s", config.crawler.timeout_secs);
    println!("  Respect robots.txt: {}", config.crawler.respect_robots);
    println!("  Max links per site: {}", config.crawler.max_links_per_site);
    println!(
        "  Max concurrent links: {}",
        config.crawler.max_concurrent_links
    );
    println!("  Pause between sites: {}ms", config.crawler.site_pause_ms);

    println!("\nOutput:");
    println!("  Database: {}", config.output.database_path);
    println!("  Storage: {}", config.output.storage_path);
    println!("  Markdown export: {}", config.output.export_markdown);

    println!("\nSeed Sites ({}):", config.targets.len());
    for target in &config.targets {
        println!("  - {}", target);
    }

    println!("\nTopics ({}):", config.topics.len());
    for topic in &config.topics {
        println!("  - {}: {}", topic.name, topic.keywords.join(", "));
    }

    println!("\n✓ Configuration is valid");
    println!(
        "✓ Would crawl {} seed sites, up to {} links each",
        config.targets.len(),
        config.crawler.max_links_per_site
    );

    Ok(())
}
