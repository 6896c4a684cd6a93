use std::path::Path;
use std::sync::Arc;

use clap::Parser;
use color_eyre::eyre::{Result, eyre};
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use comicstrip::application::{
    ResolutionCoordinator, ResolutionEvent, ResolutionOptions, ResolutionOutcome,
};
use comicstrip::domain::{
    AvailabilityModel, ComicImage, Direction, FormatSniffer, ImageSource, Title, TitleCatalog,
    TitleId,
};
use comicstrip::infrastructure::config::load_catalog;
use comicstrip::infrastructure::{
    AppConfig, CliArgs, DateArg, DiskComicCache, GoComicsFetcher, StorageManager,
};

fn init_logging(config: &AppConfig) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.log_level.to_string()));

    if let Some(log_path) = config.effective_log_path() {
        if let Some(parent) = log_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&log_path)?;

        let file_layer = fmt::layer()
            .with_writer(file)
            .with_ansi(false)
            .with_target(true)
            .with_thread_ids(false);

        tracing_subscriber::registry()
            .with(filter)
            .with(file_layer)
            .init();

        info!(path = %log_path.display(), "Logging initialized");
    } else {
        tracing_subscriber::registry().with(filter).init();
    }

    Ok(())
}

fn print_catalog(catalog: &TitleCatalog) {
    let today = AvailabilityModel::today();
    for title in catalog.iter() {
        println!(
            "{:<24} {:<28} since {}  {}",
            title.id(),
            title.display_name(),
            title.earliest(),
            title.author()
        );
        for gap in AvailabilityModel::unavailable_ranges(title, title.earliest(), today) {
            println!("{:<24} missing {gap}", "");
        }
    }
}

async fn print_stats(cache: &DiskComicCache) -> Result<()> {
    let stats = cache.stats_all().await?;
    if stats.is_empty() {
        println!("cache at {} is empty", cache.root().display());
        return Ok(());
    }

    let mut total_bytes = 0;
    for (title, title_stats) in &stats {
        total_bytes += title_stats.total_bytes;
        println!("{title:<24} {title_stats}");
    }
    println!(
        "{} titles, {total_bytes} bytes, capacity {} per title, at {}",
        stats.len(),
        cache.capacity(),
        cache.root().display()
    );
    Ok(())
}

fn resolve_date(title: &Title, date: DateArg) -> chrono::NaiveDate {
    match date {
        DateArg::Today => AvailabilityModel::today(),
        DateArg::Random => AvailabilityModel::random_available(title),
        DateArg::On(date) => date,
    }
}

fn report_image(
    title: &Title,
    image: &ComicImage,
    source: ImageSource,
    cache: &DiskComicCache,
    output: Option<&Path>,
) -> Result<()> {
    let dimensions = FormatSniffer::probe_dimensions(&image.bytes)
        .map(|(w, h)| format!(", {w}x{h}"))
        .unwrap_or_default();
    println!(
        "{} {} ({}, {} bytes{dimensions}, from {source})",
        title.display_name(),
        image.date,
        image.kind.mime_type(),
        image.len()
    );

    let cached_path = cache.root().join(title.id().as_str()).join(image.file_name());
    match output {
        Some(path) => {
            std::fs::write(path, &image.bytes)?;
            println!("{}", path.display());
        }
        None if cached_path.exists() => println!("{}", cached_path.display()),
        None => warn!(path = %cached_path.display(), "Strip was not cached"),
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;

    let args = CliArgs::parse();
    let storage = StorageManager::new()?;
    let mut config = storage.load_config(args.config.as_deref())?;
    config.merge_with_args(&args);

    init_logging(&config)?;
    info!(version = comicstrip::VERSION, "Starting comicstrip");

    let catalog = Arc::new(load_catalog(config.catalog.as_deref())?);
    if args.list {
        print_catalog(&catalog);
        return Ok(());
    }

    let cache = Arc::new(
        DiskComicCache::new(config.effective_cache_dir(), config.cache.capacity_per_title).await?,
    );
    if args.stats {
        return print_stats(&cache).await;
    }

    let title_id = args
        .title
        .as_deref()
        .map_or_else(|| config.default_title.clone(), TitleId::new);
    let title = catalog
        .get(&title_id)
        .cloned()
        .ok_or_else(|| eyre!("unknown title '{title_id}', see --list"))?;
    let date = resolve_date(&title, args.date);

    let fetcher = Arc::new(GoComicsFetcher::new(&config.network)?);
    let (coordinator, mut events) = ResolutionCoordinator::new(
        catalog,
        cache.clone(),
        fetcher,
        ResolutionOptions::from(&config.resolution),
    );
    let ticket = coordinator.select(title_id, date);

    while let Some(event) = events.recv().await {
        match event {
            ResolutionEvent::CacheWriteFailed { ref error, .. } => {
                eprintln!("warning: {} not cached: {error}", event.selection());
            }
            ResolutionEvent::Resolution {
                ticket: delivered,
                outcome,
                ..
            } if delivered == ticket => {
                let result = match outcome {
                    ResolutionOutcome::Resolved { image, source } => {
                        report_image(&title, &image, source, &cache, args.output.as_deref())
                    }
                    ResolutionOutcome::Failed(error) => {
                        if error.suggests_other_date() {
                            let nearest =
                                AvailabilityModel::next_available(&title, date, Direction::Backward);
                            eprintln!("no strip for {date}; nearest earlier date is {nearest}");
                        } else if error.is_retryable() {
                            eprintln!("temporary failure, try again later");
                        }
                        Err(eyre!(error))
                    }
                };
                cache.flush().await;
                return result;
            }
            ResolutionEvent::Resolution { .. } => {}
        }
    }

    Err(eyre!("resolution ended without a result"))
}
