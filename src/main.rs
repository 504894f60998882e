use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use soundalike::config::AppConfig;
use soundalike::features::ATTRIBUTES;
use soundalike::recommend::{self, RecommendError, Recommender};
use std::path::PathBuf;

/// Candidates shown when a title can't be resolved.
const HINT_COUNT: usize = 3;

#[derive(Parser)]
#[command(name = "soundalike", version, about = "Find songs that sound alike")]
struct Cli {
    /// Catalog CSV files, concatenated in the given order
    #[arg(long = "data", global = true)]
    data: Vec<PathBuf>,

    /// Path to a config file (defaults to the XDG config dir)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Recommend songs whose audio features are closest to a given song
    Recommend {
        /// Song title (fuzzy matched)
        song: String,

        /// Number of results (defaults to config default_count)
        #[arg(short = 'n', long, allow_negative_numbers = true)]
        count: Option<i64>,

        /// Emit JSON instead of one title per line
        #[arg(long)]
        json: bool,
    },

    /// Show catalog titles that best match a query
    Search {
        /// Title to look up
        query: String,

        /// Number of results
        #[arg(short = 'n', long, default_value = "10")]
        limit: usize,
    },

    /// Show catalog statistics
    Stats,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Set up logging based on verbosity
    let log_level = match cli.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_level))
        .format_timestamp(None)
        .init();

    // Load config file (optional, defaults if missing)
    let config = match cli.config {
        Some(ref path) => AppConfig::load_from(path),
        None => AppConfig::load(),
    };

    rayon::ThreadPoolBuilder::new()
        .num_threads(config.resolve_workers())
        .build_global()
        .context("Failed to configure worker pool")?;

    // Resolve catalog sources: CLI > config sources > config/XDG data dir
    let sources = resolve_sources(cli.data, &config)?;
    log::info!("Loading catalog from {} source(s)", sources.len());

    let service = Recommender::from_sources(&sources)
        .context("Failed to build recommendation service")?
        .with_min_score(config.min_score);
    let service = recommend::init(service).context("Failed to publish recommendation service")?;

    match cli.command {
        Commands::Recommend { song, count, json } => {
            let count = config.requested_count(count);
            match service.recommend(&song, count) {
                Ok(list) => {
                    if json {
                        println!("{}", serde_json::to_string_pretty(&list)?);
                    } else {
                        for title in list.titles() {
                            println!("{}", title);
                        }
                    }
                }
                Err(RecommendError::NotFound { query, .. }) => {
                    println!("Song '{}' not found.", query);
                    let hints = service.suggest(&query, HINT_COUNT);
                    if !hints.is_empty() {
                        println!();
                        println!("Closest titles:");
                        for (candidate, s) in hints {
                            println!("  {:>5.1}  {}", candidate.score, s.title);
                        }
                    }
                }
                Err(e @ (RecommendError::InvalidCount(_) | RecommendError::Index(_))) => {
                    anyhow::bail!(e);
                }
            }
        }

        Commands::Search { query, limit } => {
            let hits = service.suggest(&query, limit);
            if hits.is_empty() {
                println!("No titles in catalog.");
                return Ok(());
            }

            println!("{:>6} {:>6}  {:<40} {}", "Id", "Score", "Title", "Artists");
            println!("{}", "-".repeat(80));
            for (candidate, s) in hits {
                let title: String = if s.title.chars().count() > 40 {
                    format!("{}...", s.title.chars().take(37).collect::<String>())
                } else {
                    s.title.clone()
                };
                println!(
                    "{:>6} {:>6.1}  {:<40} {}",
                    s.id,
                    candidate.score,
                    title,
                    s.artists.as_deref().unwrap_or("")
                );
            }
            println!();
            println!("Matches need a score of at least {:.0}", service.min_score());
        }

        Commands::Stats => {
            let catalog = service.catalog();
            println!("Catalog Statistics");
            println!("==================");
            println!("Songs:  {}", catalog.len());
            println!();
            println!("{:<18} {:>12} {:>12}", "Attribute", "Min", "Max");
            println!("{}", "-".repeat(44));
            for (name, range) in ATTRIBUTES.iter().zip(catalog.ranges()) {
                let note = if range.is_degenerate() { "  (constant)" } else { "" };
                println!("{:<18} {:>12.4} {:>12.4}{}", name, range.min, range.max, note);
            }
        }
    }

    Ok(())
}

fn resolve_sources(cli_sources: Vec<PathBuf>, config: &AppConfig) -> Result<Vec<PathBuf>> {
    if !cli_sources.is_empty() {
        return Ok(cli_sources);
    }
    if !config.sources.is_empty() {
        return Ok(config.sources.clone());
    }

    let dir = config
        .data_dir
        .clone()
        .or_else(soundalike::config::default_data_dir)
        .context("Could not determine a data directory")?;
    let sources = soundalike::catalog::discover_sources(&dir)
        .with_context(|| format!("Failed to scan {}", dir.display()))?;
    if sources.is_empty() {
        anyhow::bail!(
            "No catalog data. Pass --data <csv>, set sources in config, or put CSV files in {}",
            dir.display()
        );
    }
    Ok(sources)
}
