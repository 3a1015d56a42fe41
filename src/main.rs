//! starindex CLI
//!
//! Local entry point for building and querying the month index.

use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::Ordering;

use clap::{Parser, Subcommand};
use starindex::{
    config::Config,
    error::Result,
    feed::{FeedbinClient, FetchPolicy, RateLimitedFetcher, StarredFeed},
    pipeline::{BuildMode, IndexBuilder, MonthQuery},
    store::{IndexStore, LocalStore},
};

/// starindex - starred-feed month index
#[derive(Parser, Debug)]
#[command(name = "starindex", version, about = "Month index over a starred-article feed")]
struct Cli {
    /// Path to storage directory containing config and index files
    #[arg(short, long, default_value = "storage")]
    storage_dir: PathBuf,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Scan the whole feed from page 1
    Build,

    /// Continue a scan from the persisted checkpoint
    Resume,

    /// Resolve a month/year filter to the page it starts on
    Resolve {
        #[arg(long)]
        year: i32,

        #[arg(long)]
        month: u32,

        /// Fallback page when the index has no entry
        #[arg(long, default_value_t = 1)]
        page: u32,

        /// Also fetch the resolved page and feed it back into the index
        #[arg(long)]
        fetch: bool,
    },

    /// List all indexed months
    Months,

    /// Show index and checkpoint status
    Status,

    /// Validate the configuration file
    Validate,
}

/// Initialize logging based on verbosity flag.
fn init_logging(verbose: bool) {
    let level = if verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp_secs()
        .init();
}

/// Main entry point for the CLI application.
#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let config_path = cli.storage_dir.join("config.toml");
    let config = Config::load_or_default(&config_path);
    let store = Arc::new(LocalStore::new(&cli.storage_dir));

    match cli.command {
        Command::Build => run_build(&config, store, BuildMode::Full).await?,
        Command::Resume => run_build(&config, store, BuildMode::Resume).await?,

        Command::Resolve {
            year,
            month,
            page,
            fetch,
        } => {
            let query = MonthQuery::new(store);
            let resolved = query.resolve_page(Some(year), Some(month), page).await;
            println!("{year}-{month:02} -> page {resolved}");

            if fetch {
                let client = FeedbinClient::new(&config.feed)?;
                let articles = client.fetch_page(resolved).await?;
                println!("Fetched {} article(s) from page {resolved}", articles.len());

                let written = query.record_observation(resolved, &articles).await?;
                if written > 0 {
                    log::info!("Observation tightened {written} index record(s)");
                }
            }
        }

        Command::Months => {
            let query = MonthQuery::new(store);
            let months = query.list_available_months().await?;
            if months.is_empty() {
                println!("No months indexed yet. Run 'build' first.");
            } else {
                for month in months {
                    println!("{month}");
                }
            }
        }

        Command::Status => {
            let index = store.load().await?;
            println!("Storage directory: {}", cli.storage_dir.display());
            println!("Indexed months:    {}", index.len());
            println!("Total articles:    {}", index.total_articles);
            println!("Last updated:      {}", index.updated_at);

            match store.load_checkpoint().await? {
                Some(checkpoint) => println!(
                    "Checkpoint:        page {} (saved {}, {} month(s) remaining)",
                    checkpoint.last_page_processed,
                    checkpoint.saved_at,
                    checkpoint.remaining_months.len()
                ),
                None => println!("Checkpoint:        none"),
            }
        }

        Command::Validate => {
            log::info!("Validating configuration...");
            config.validate()?;
            log::info!("✓ Config OK");
        }
    }

    Ok(())
}

/// Run a build or resume with ctrl-c wired to the cancel flag.
async fn run_build(config: &Config, store: Arc<dyn IndexStore>, mode: BuildMode) -> Result<()> {
    config.validate()?;

    let client = FeedbinClient::new(&config.feed)?;
    let fetcher = RateLimitedFetcher::new(client, FetchPolicy::from(&config.fetch));
    let mut builder = IndexBuilder::new(fetcher, store, config.build.clone(), config.feed.page_size);

    let cancel = builder.cancel_flag();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            log::warn!("Interrupt received; finishing the current page...");
            cancel.store(true, Ordering::SeqCst);
        }
    });

    let report = builder.run(mode).await?;

    log::info!(
        "{}: {} month(s) over {} page(s)",
        if report.completed {
            "Build complete"
        } else {
            "Build interrupted (resumable)"
        },
        report.entries_found,
        report.pages_scanned
    );

    Ok(())
}
