//! Newsletter CLI - release digests from product feeds

use chrono::{Local, NaiveDate};
use clap::{Parser, Subcommand};
use newsletter_lib::cache::SummaryCache;
use newsletter_lib::feeds::{
    FeedQuery, consolidate_prereleases, fetch_feed, fetch_markdown_release_notes,
};
use newsletter_lib::summarize::PassthroughSummarizer;
use newsletter_lib::{DigestWindow, NewsletterConfig, build_digest, render_markdown};
use reqwest::Client as HttpClient;
use std::path::PathBuf;
use tracing_subscriber::{filter::EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Window length used when neither `--since` nor `--days` is given
const DEFAULT_DAYS: u32 = 7;

#[derive(Parser)]
#[command(name = "newsletter")]
#[command(about = "Release digests from product feeds", long_about = None)]
struct Cli {
    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short = 'v', action = clap::ArgAction::Count, global = true)]
    log_verbosity: u8,

    /// Output logs as JSON
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Date window shared by every subcommand
#[derive(clap::Args)]
struct WindowArgs {
    /// First day of the window (YYYY-MM-DD)
    #[arg(long, value_name = "DATE")]
    since: Option<NaiveDate>,

    /// Last day of the window (YYYY-MM-DD) [default: today]
    #[arg(long, value_name = "DATE")]
    until: Option<NaiveDate>,

    /// Number of days ending at --until, ignored when --since is set
    #[arg(long, value_name = "N", default_value_t = DEFAULT_DAYS)]
    days: u32,
}

impl WindowArgs {
    fn resolve(&self) -> DigestWindow {
        let end = self.until.unwrap_or_else(|| Local::now().date_naive());
        match self.since {
            Some(start) => DigestWindow::new(start, end),
            None => DigestWindow::last_days(end, self.days),
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Build and render a digest from a config file
    Generate {
        /// YAML config listing the sources
        #[arg(short, long, value_name = "FILE")]
        config: PathBuf,

        #[command(flatten)]
        window: WindowArgs,

        /// Write the digest to FILE instead of stdout
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,

        /// Neither read nor write the summary cache
        #[arg(long)]
        no_cache: bool,
    },

    /// Fetch a single feed and print its entries as JSON
    Fetch {
        /// Feed URL (Atom, RSS, or with --markdown a raw CHANGELOG.md)
        #[arg(value_name = "URL")]
        url: String,

        #[command(flatten)]
        window: WindowArgs,

        /// Keep only items with a category containing K (repeatable)
        #[arg(short = 'c', long = "category", value_name = "K")]
        categories: Vec<String>,

        /// Use the item summary instead of the full content
        #[arg(long)]
        short: bool,

        /// Truncate each entry to N characters (0 = no limit)
        #[arg(long, value_name = "N", default_value_t = 0)]
        max_chars: usize,

        /// Fold language-prefixed and pre-release entries into base releases
        #[arg(long)]
        consolidate: bool,

        /// Treat URL as a Markdown changelog instead of a feed
        #[arg(long)]
        markdown: bool,
    },
}

/// Initialize tracing subscriber based on verbosity and output format
fn init_tracing(verbose: u8, json: bool) {
    let base_filter = match std::env::var("RUST_LOG") {
        Ok(filter) => filter,
        Err(_) => match verbose {
            0 => "warn".to_string(),
            1 => "warn,newsletter_lib=info".to_string(),
            2 => "info,newsletter_lib=debug".to_string(),
            _ => "debug,newsletter_lib=trace".to_string(),
        },
    };

    let filter = EnvFilter::try_new(&base_filter).unwrap_or_else(|_| EnvFilter::new("warn"));

    if json {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(
                fmt::layer()
                    .with_target(true)
                    .with_level(true)
                    .with_file(verbose >= 3)
                    .with_line_number(verbose >= 3)
                    .with_writer(std::io::stderr)
                    .compact(),
            )
            .init();
    }
}

async fn generate(
    config: PathBuf,
    window: DigestWindow,
    output: Option<PathBuf>,
    no_cache: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let config = NewsletterConfig::load(&config)?;

    let cache = if no_cache {
        SummaryCache::disabled()
    } else {
        config
            .resolve_cache_dir()
            .map(SummaryCache::new)
            .unwrap_or_else(SummaryCache::disabled)
    };
    tracing::debug!(cache_dir = ?cache.dir(), "Summary cache");

    let client = HttpClient::new();
    let digest = build_digest(&client, &config, window, &PassthroughSummarizer, &cache).await?;
    let markdown = render_markdown(&digest);

    match output {
        Some(path) => {
            std::fs::write(&path, markdown)?;
            eprintln!("Digest written to {}", path.display());
        }
        None => print!("{markdown}"),
    }

    Ok(())
}

async fn fetch(
    url: &str,
    query: FeedQuery,
    consolidate: bool,
    markdown: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let client = HttpClient::new();
    let entries = if markdown {
        fetch_markdown_release_notes(&client, url, &query).await?
    } else {
        fetch_feed(&client, url, &query).await?
    };

    let entries = if consolidate {
        consolidate_prereleases(&entries)
    } else {
        entries
    };

    println!("{}", serde_json::to_string_pretty(&entries)?);
    Ok(())
}

#[tokio::main]
async fn main() {
    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    init_tracing(cli.log_verbosity, cli.json);

    match cli.command {
        Commands::Generate {
            config,
            window,
            output,
            no_cache,
        } => {
            if let Err(e) = generate(config, window.resolve(), output, no_cache).await {
                eprintln!("Generate failed: {}", e);
                std::process::exit(1);
            }
        }

        Commands::Fetch {
            url,
            window,
            categories,
            short,
            max_chars,
            consolidate,
            markdown,
        } => {
            let window = window.resolve();
            let query = FeedQuery::new(window.start, window.end)
                .with_categories(categories)
                .with_short_summary(short)
                .with_max_content_chars(max_chars);

            if let Err(e) = fetch(&url, query, consolidate, markdown).await {
                eprintln!("Fetch failed: {}", e);
                std::process::exit(1);
            }
        }
    }
}
