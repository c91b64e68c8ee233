//! # Shelf CLI Application
//!
//! This module implements the command-line interface for the shelf crawler.
//!
//! ## Key Components
//!
//! - CLI argument parsing with clap
//! - Subcommands:
//!   - `crawl`: Crawl keywords from the frontier (or the given ones)
//!   - `keywords add`: Queue manual keywords
//!   - `keywords generate`: Queue generated keywords
//!   - `keywords list`: Show the keyword queue
//!   - `stats`: Show store totals
//!
//! Settings come from an optional JSON file (`--config`); flags override
//! individual values. Ctrl-C cancels a crawl after in-flight fetches finish.

mod telemetry;

use clap::{Args, CommandFactory, Parser, Subcommand};
use shelf::cache::DedupCache;
use shelf::crawl::{CrawlContext, Crawler};
use shelf::export::JsonLinesExporter;
use shelf::fetch::HttpFetcher;
use shelf::frontier::{KeywordFrontier, PlaceholderGenerator};
use shelf::settings::Settings;
use shelf::store::{LibsqlStore, MemoryStore, Store, StoreStats, UpsertMode};
use std::path::PathBuf;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{instrument, warn};

#[derive(Parser)]
#[command(author, version, about = "Keyword-driven retail catalog crawler", long_about = None)]
struct Cli {
    /// Settings file (JSON)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Directory for daily log files
    #[arg(long, global = true)]
    log_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Crawl queued keywords, or the given ones
    Crawl(CrawlArgs),

    /// Manage the keyword queue
    #[command(subcommand)]
    Keywords(KeywordCommands),

    /// Show product and keyword totals
    Stats(StatsArgs),
}

#[derive(Subcommand, Debug)]
enum KeywordCommands {
    /// Queue keywords at the manual priority
    Add(AddArgs),

    /// Queue keywords from the placeholder generator
    Generate(GenerateArgs),

    /// List queued keywords, highest priority first
    List(ListArgs),
}

#[derive(Args, Debug)]
struct StoreArgs {
    /// Database path
    #[arg(long)]
    database: Option<PathBuf>,

    /// Marketplace code (us, uk, de, ...)
    #[arg(short, long)]
    domain: Option<String>,
}

#[derive(Args, Debug)]
struct CrawlArgs {
    /// Keywords to crawl; queued as manual keywords
    keywords: Vec<String>,

    #[command(flatten)]
    store: StoreArgs,

    /// Results pages per keyword
    #[arg(short = 'p', long)]
    max_pages: Option<u32>,

    /// Keywords per run
    #[arg(short = 'k', long)]
    max_keywords: Option<usize>,

    /// Fetches in flight at once
    #[arg(short = 'n', long)]
    concurrency: Option<usize>,

    /// Keep stored products untouched instead of replacing them
    #[arg(long)]
    insert_only: bool,

    /// Use an in-memory store
    #[arg(long)]
    memory: bool,

    /// Also write crawled products to a JSON-lines file
    #[arg(short, long)]
    export: Option<PathBuf>,

    /// Skip keyword generation
    #[arg(long)]
    no_generate: bool,

    /// Print the plan without fetching anything
    #[arg(long)]
    dry_run: bool,
}

#[derive(Args, Debug)]
struct AddArgs {
    /// Keywords to queue
    #[arg(required = true)]
    keywords: Vec<String>,

    /// Category for the keywords
    #[arg(long)]
    category: Option<String>,

    #[command(flatten)]
    store: StoreArgs,
}

#[derive(Args, Debug)]
struct GenerateArgs {
    /// Categories to generate for (comma-separated)
    #[arg(long, value_delimiter = ',')]
    categories: Vec<String>,

    /// Keywords per category
    #[arg(short = 'n', long)]
    count: Option<usize>,

    #[command(flatten)]
    store: StoreArgs,
}

#[derive(Args, Debug)]
struct ListArgs {
    /// Limit results
    #[arg(short, long, default_value = "50")]
    limit: usize,

    /// Output format (text|json)
    #[arg(short, long, default_value = "text", value_parser = ["text", "json"])]
    format: String,

    #[command(flatten)]
    store: StoreArgs,
}

#[derive(Args, Debug)]
struct StatsArgs {
    /// Output format (text|json)
    #[arg(short, long, default_value = "text", value_parser = ["text", "json"])]
    format: String,

    #[command(flatten)]
    store: StoreArgs,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let Some(command) = cli.command else {
        Cli::command().print_help()?;
        return Ok(());
    };

    let mut settings = Settings::load(cli.config.as_deref())?;
    if cli.log_dir.is_some() {
        settings.log_dir = cli.log_dir;
    }
    let _log_guard = telemetry::init_tracing_subscriber(settings.log_dir.as_deref())?;

    match command {
        Commands::Crawl(args) => crawl_command(settings, args).await?,
        Commands::Keywords(KeywordCommands::Add(args)) => add_command(settings, args).await?,
        Commands::Keywords(KeywordCommands::Generate(args)) => generate_command(settings, args).await?,
        Commands::Keywords(KeywordCommands::List(args)) => list_command(settings, args).await?,
        Commands::Stats(args) => stats_command(settings, args).await?,
    }

    Ok(())
}

fn apply_store_args(settings: &mut Settings, args: &StoreArgs) -> anyhow::Result<()> {
    if let Some(database) = &args.database {
        settings.database = database.clone();
    }
    if let Some(domain) = &args.domain {
        settings.crawl.domain = domain.clone();
    }
    settings.validate()?;
    Ok(())
}

async fn open_store(settings: &Settings, memory: bool) -> anyhow::Result<Arc<dyn Store>> {
    if memory {
        return Ok(Arc::new(MemoryStore::new()));
    }
    Ok(Arc::new(LibsqlStore::open(&settings.database).await?))
}

async fn open_frontier(settings: &Settings) -> anyhow::Result<KeywordFrontier> {
    let store = open_store(settings, false).await?;
    let cache = DedupCache::preload(store.as_ref(), &settings.cache).await?;
    Ok(KeywordFrontier::new(store, Arc::new(cache), settings.keywords.clone()))
}

#[instrument(skip(settings))]
async fn crawl_command(mut settings: Settings, args: CrawlArgs) -> anyhow::Result<()> {
    if let Some(max_pages) = args.max_pages {
        settings.crawl.max_pages_per_keyword = max_pages;
    }
    if let Some(max_keywords) = args.max_keywords {
        settings.crawl.max_keywords_per_run = max_keywords;
    }
    if let Some(concurrency) = args.concurrency {
        settings.crawl.concurrency = concurrency;
    }
    if args.insert_only {
        settings.gateway.mode = UpsertMode::InsertOnly;
    }
    if args.no_generate {
        settings.keywords.generation_enabled = false;
    }
    apply_store_args(&mut settings, &args.store)?;

    let store = open_store(&settings, args.memory).await?;
    let fetcher = Arc::new(HttpFetcher::new(settings.fetcher.clone())?);
    let mut ctx = CrawlContext::open(&settings, store.clone(), fetcher).await?;
    if settings.keywords.generation_enabled {
        ctx = ctx.with_generator(Arc::new(PlaceholderGenerator::new(
            settings.keywords.keywords_per_category,
        )));
    }
    if let Some(path) = &args.export {
        ctx = ctx.with_exporter(Arc::new(JsonLinesExporter::create(path).await?));
    }
    let crawler = Crawler::new(ctx);

    if args.dry_run {
        let plan = crawler.plan(&args.keywords).await?;
        println!("Dry run on {} ({} keywords):", plan.domain, plan.keywords.len());
        for keyword in &plan.keywords {
            println!(
                "  [{}] {} ({}, {})",
                keyword.priority, keyword.text, keyword.category, keyword.source
            );
        }
        println!(
            "Up to {} results pages ({} per keyword), about {} products",
            plan.max_results_pages, plan.max_pages_per_keyword, plan.estimated_products
        );
        return Ok(());
    }

    let cancel = CancellationToken::new();
    let interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("interrupted, finishing in-flight fetches");
            interrupt.cancel();
        }
    });

    let report = crawler.run(&args.keywords, cancel).await?;
    crawler.context().close().await;

    println!("{}", report);
    let totals = StoreStats::collect(store.as_ref()).await?;
    println!(
        "Store: {} products ({} today), {} keywords ({} scraped, {} pending)",
        totals.total_products,
        totals.products_today,
        totals.total_keywords,
        totals.scraped_keywords,
        totals.pending_keywords
    );
    if let Some(path) = args.export {
        println!("Exported products to {}", path.display());
    }

    Ok(())
}

#[instrument(skip(settings))]
async fn add_command(mut settings: Settings, args: AddArgs) -> anyhow::Result<()> {
    apply_store_args(&mut settings, &args.store)?;
    let frontier = open_frontier(&settings).await?;

    let inserted = frontier
        .add_manual(&args.keywords, &settings.crawl.domain, args.category.as_deref())
        .await?;
    println!(
        "Queued {} of {} keywords for {}",
        inserted,
        args.keywords.len(),
        settings.crawl.domain
    );
    Ok(())
}

#[instrument(skip(settings))]
async fn generate_command(mut settings: Settings, args: GenerateArgs) -> anyhow::Result<()> {
    if !args.categories.is_empty() {
        settings.keywords.categories = args.categories.clone();
    }
    if let Some(count) = args.count {
        settings.keywords.keywords_per_category = count;
    }
    apply_store_args(&mut settings, &args.store)?;
    let frontier = open_frontier(&settings).await?;

    let generator = PlaceholderGenerator::new(settings.keywords.keywords_per_category);
    let inserted = frontier
        .seed_from_generator(&generator, &settings.crawl.domain)
        .await?;
    println!(
        "Queued {} generated keywords across {} categories",
        inserted,
        settings.keywords.categories.len()
    );
    Ok(())
}

#[instrument(skip(settings))]
async fn list_command(mut settings: Settings, args: ListArgs) -> anyhow::Result<()> {
    let domain = args.store.domain.clone();
    apply_store_args(&mut settings, &args.store)?;
    let frontier = open_frontier(&settings).await?;

    let keywords = frontier.list(domain.as_deref(), args.limit).await?;
    if args.format == "json" {
        println!("{}", serde_json::to_string_pretty(&keywords)?);
        return Ok(());
    }

    if keywords.is_empty() {
        println!("No keywords queued");
        return Ok(());
    }
    println!(
        "{:<4} {:<32} {:<24} {:<6} {:<8} {:<8} {:<8}",
        "PRI", "KEYWORD", "CATEGORY", "DOMAIN", "SCRAPED", "TRIES", "FOUND"
    );
    for keyword in keywords {
        println!(
            "{:<4} {:<32} {:<24} {:<6} {:<8} {:<8} {:<8}",
            keyword.priority,
            keyword.text,
            keyword.category,
            keyword.domain,
            if keyword.is_scraped { "yes" } else { "no" },
            keyword.scraping_attempts,
            keyword.products_found
        );
    }
    Ok(())
}

#[instrument(skip(settings))]
async fn stats_command(mut settings: Settings, args: StatsArgs) -> anyhow::Result<()> {
    apply_store_args(&mut settings, &args.store)?;
    let store = open_store(&settings, false).await?;
    let stats = StoreStats::collect(store.as_ref()).await?;

    if args.format == "json" {
        println!("{}", serde_json::to_string_pretty(&stats)?);
        return Ok(());
    }

    println!("Database: {}", settings.database.display());
    println!("Total products:   {}", stats.total_products);
    println!("Products today:   {}", stats.products_today);
    println!("Total keywords:   {}", stats.total_keywords);
    println!("Scraped keywords: {}", stats.scraped_keywords);
    println!("Pending keywords: {}", stats.pending_keywords);
    Ok(())
}
