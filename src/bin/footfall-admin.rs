use anyhow::Result;
use clap::{Parser, Subcommand};
use footfall::analytics::StatsEngine;
use footfall::clock::SystemClock;
use footfall::config::{Config, DatabaseBackend};
use footfall::models::{PageStats, VisitFilter};
use footfall::storage::{PostgresStorage, SqliteStorage, Storage};
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "footfall-admin")]
#[command(about = "Footfall statistics CLI", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Site-wide page views, unique visitors and active days
    Summary,
    /// Top pages by views
    Pages {
        /// Maximum number of pages to show
        #[arg(long, default_value_t = 50)]
        limit: usize,
    },
    /// Views and unique visitors for one path
    Page {
        /// Path, e.g. /blog/hello-world
        path: String,
    },
    /// Rows of the daily rollup
    Daily {
        #[arg(long, default_value_t = 30)]
        days: i64,
    },
    /// Most recent visits
    Recent {
        #[arg(long, default_value_t = 30)]
        days: i64,
    },
    /// Count stored visits without loading them
    Count {
        /// Only count visits to this path
        #[arg(long)]
        path: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();
    let config = Config::from_env()?;

    let storage: Arc<dyn Storage> = match config.database.backend {
        DatabaseBackend::Sqlite => Arc::new(
            SqliteStorage::new(&config.database.url, config.database.max_connections).await?,
        ),
        DatabaseBackend::Postgres => Arc::new(
            PostgresStorage::new(&config.database.url, config.database.max_connections).await?,
        ),
    };

    // Ensure database is initialized
    storage.init().await?;

    let mut stats = config.stats.clone();
    if let Commands::Pages { limit } = &cli.command {
        stats.top_pages_limit = *limit;
    }
    let engine = StatsEngine::new(Arc::clone(&storage), Arc::new(SystemClock), &stats);

    match cli.command {
        Commands::Summary => {
            let summary = engine.get_summary().await?;
            println!("Page views:      {}", summary.total_pv);
            println!("Unique visitors: {}", summary.total_uv);
            println!("Active days:     {}", summary.active_days);
        }
        Commands::Pages { .. } => {
            if let PageStats::All(pages) = engine.get_page_stats(None).await? {
                if pages.is_empty() {
                    println!("No visits recorded");
                } else {
                    println!("{:<60} {:>10} {:>10}", "PATH", "PV", "UV");
                    println!("{}", "-".repeat(82));
                    for page in pages {
                        println!(
                            "{:<60} {:>10} {:>10}",
                            page.path, page.page_views, page.unique_visitors
                        );
                    }
                }
            }
        }
        Commands::Page { path } => {
            if let PageStats::Single(page) = engine.get_page_stats(Some(&path)).await? {
                println!(
                    "{}: {} views, {} unique visitors",
                    page.path, page.page_views, page.unique_visitors
                );
            }
        }
        Commands::Daily { days } => {
            let rows = engine.get_daily_stats(days).await?;
            if rows.is_empty() {
                println!("daily_stats is empty");
            }
            for row in rows {
                println!("{}  pv={:<8} uv={}", row.date, row.pv, row.uv);
            }
        }
        Commands::Recent { days } => {
            for visit in engine.get_recent_visits(days).await? {
                println!("{}  {:<8} {}", visit.created_at, visit.country, visit.path);
            }
        }
        Commands::Count { path } => {
            let filter = path.map(VisitFilter::for_path).unwrap_or_default();
            let count = storage.count(&filter).await?;
            println!("{count}");
        }
    }

    Ok(())
}
