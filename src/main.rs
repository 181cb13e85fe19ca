use std::fs;
use std::path::Path;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use harvest::cli::{Cli, Commands};
use harvest::config::Config;
use harvest::domain::SourceDescriptor;
use harvest::extract::fields::{element_text, link_of};
use harvest::extract::{infer_selector, Document};
use harvest::fetch::{FetchGateway, FetchOptions, HtmlCache};
use harvest::pagination::{Direction, PageRequest};
use harvest::services::{CrawlService, ListingService};
use harvest::sources::{SourceDispatcher, MAX_LIST_ITEMS};
use harvest::storage::sqlite::{SqliteHtmlCache, SqliteItemRepository, SqliteStorage};

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    if let Err(e) = run(cli) {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

fn init_tracing(verbose: u8) {
    let default = match verbose {
        0 => "harvest=info",
        1 => "harvest=debug",
        _ => "harvest=trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn run(cli: Cli) -> Result<()> {
    let config = Config::from_env().context("loading configuration")?;
    let storage = SqliteStorage::new(&config.db_path)
        .with_context(|| format!("opening database {}", config.db_path))?;
    let cache = Arc::new(SqliteHtmlCache::new(storage.clone(), config.fetch.cache_ttl));

    match cli.command {
        Commands::Crawl {
            descriptor,
            dry_run,
        } => {
            let gateway = FetchGateway::from_config(&config, cache)?;
            cmd_crawl(&descriptor, dry_run, gateway, storage)
        }
        Commands::Preview {
            url,
            item,
            exclude,
            render,
            backend,
        } => {
            let gateway = FetchGateway::from_config(&config, cache)?;
            cmd_preview(&gateway, &url, &item, &exclude, render, backend)
        }
        Commands::List {
            feed_id,
            limit,
            cursor,
            direction,
            order_by,
        } => {
            let request = PageRequest {
                order_by,
                limit,
                cursor,
                direction: direction.parse()?,
            };
            cmd_list(feed_id, &request, storage)
        }
        Commands::ClearCache => {
            cache.clear()?;
            println!("HTML cache cleared.");
            Ok(())
        }
    }
}

fn cmd_crawl(
    path: &Path,
    dry_run: bool,
    gateway: FetchGateway,
    storage: SqliteStorage,
) -> Result<()> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("reading descriptor file {}", path.display()))?;
    let descriptor: SourceDescriptor = raw
        .parse()
        .with_context(|| format!("parsing descriptor file {}", path.display()))?;

    let dispatcher = SourceDispatcher::new(Arc::new(gateway));
    let service = CrawlService::new(SqliteItemRepository::new(storage), dispatcher);

    println!("Crawling {} [{}]...\n", descriptor.url, descriptor.kind());

    if dry_run {
        let outcome = service.candidates(&descriptor)?;
        for item in &outcome.items {
            println!("  [DRY RUN] {}", item.title);
            if let Some(link) = &item.link {
                println!("    {}", link);
            }
            println!("    published {}", item.published.to_rfc3339());
        }
        println!(
            "\nDry run complete. {} observed, {} new.",
            outcome.observed,
            outcome.items.len()
        );
        return Ok(());
    }

    let report = service.crawl(&descriptor)?;
    println!(
        "Crawl complete: {} observed, {} new, {} stored.",
        report.observed, report.found, report.created
    );
    Ok(())
}

fn cmd_preview(
    gateway: &FetchGateway,
    url: &str,
    item: &str,
    exclude: &[String],
    render: bool,
    backend: Option<String>,
) -> Result<()> {
    let options = if render {
        FetchOptions::render(backend.as_deref())
    } else {
        FetchOptions {
            backend,
            ..FetchOptions::direct()
        }
    };

    let result = gateway.fetch(url, &options)?;
    let html = match (result.success, &result.html) {
        (true, Some(html)) => html,
        _ => bail!("fetching {} failed: {}", url, result.error_text()),
    };

    let document = Document::parse(html, &result.final_url, exclude);
    let matches = document.items(item, MAX_LIST_ITEMS);

    println!(
        "{} matched '{}' ({} excluded elements removed{})\n",
        matches.len(),
        item,
        document.pruned(),
        if result.from_cache { ", from cache" } else { "" }
    );

    for (i, element) in matches.into_iter().enumerate() {
        let text: String = element_text(element).chars().take(80).collect();
        println!("  {}. {}", i + 1, infer_selector(element));
        println!("     {}", text);
        if let Some(link) = link_of(element, document.base_url()) {
            println!("     {}", link);
        }
    }

    Ok(())
}

fn cmd_list(feed_id: i64, request: &PageRequest, storage: SqliteStorage) -> Result<()> {
    let service = ListingService::new(SqliteItemRepository::new(storage));
    let page = service.page(feed_id, request)?.into_newest_first();

    if page.items.is_empty() {
        println!("No items.");
        return Ok(());
    }

    for stored in &page.items {
        println!(
            "  {:>6}  {}  {}",
            stored.id,
            stored.item.published.format("%Y-%m-%d %H:%M"),
            stored.item.title
        );
        if let Some(link) = &stored.item.link {
            println!("          {}", link);
        }
    }
    println!();

    // `next` continues in the requested direction, `prev` goes back.
    let (older, newer) = match page.direction {
        Direction::Before => (&page.next_cursor, &page.prev_cursor),
        Direction::After => (&page.prev_cursor, &page.next_cursor),
    };
    if let Some(cursor) = older {
        println!("Older: --direction before --cursor {}", cursor);
    }
    if let Some(cursor) = newer {
        println!("Newer: --direction after --cursor {}", cursor);
    }

    Ok(())
}
