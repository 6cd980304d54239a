use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info, level_filters::LevelFilter};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};
use video_catalog::config::{AppConfig, CliConfig, FileConfig};
use video_catalog::{
    CacheScope, CollectionOutcome, CollectionReport, IntegrityPolicy, SqliteVideoStore,
    VideoLibrary, VideoResolver,
};

fn parse_path(s: &str) -> Result<PathBuf> {
    let path_buf = PathBuf::from(s);
    if path_buf.is_absolute() {
        return Ok(path_buf);
    }
    let cwd = std::env::current_dir()?;
    Ok(cwd.join(path_buf))
}

#[derive(Parser, Debug)]
struct CliArgs {
    /// Path to the SQLite video database file.
    #[clap(long, value_parser = parse_path)]
    pub db_path: Option<PathBuf>,

    /// Path to a TOML config file. Its values override command line flags.
    #[clap(long, value_parser = parse_path)]
    pub config: Option<PathBuf>,

    /// Number of read connections.
    #[clap(long, default_value_t = 4)]
    pub read_pool_size: usize,

    /// Lifetime of the identity cache.
    #[clap(long, value_enum, default_value = "application")]
    pub cache_scope: CacheScope,

    /// Behavior when a video has rows in several extension tables.
    #[clap(long, value_enum, default_value = "strict")]
    pub integrity_policy: IntegrityPolicy,

    /// Exclude videos of disabled catalogs from random selection.
    #[clap(long)]
    pub only_enabled_catalogs: bool,

    /// Hours between orphan collection runs in watch mode. 0 disables it.
    #[clap(long, default_value_t = 24)]
    pub collect_interval_hours: u64,

    #[clap(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Resolve a video id and print it as JSON.
    Resolve { id: i64 },
    /// Warm the cache for the given ids, then resolve each of them.
    Batch { ids: Vec<i64> },
    /// Remove orphaned extension rows once.
    Collect,
    /// Print random enabled video ids.
    Random {
        #[clap(default_value_t = 1)]
        count: usize,
    },
    /// Run orphan collection periodically until interrupted.
    Watch,
}

fn print_report(report: &CollectionReport) {
    for outcome in &report.outcomes {
        match outcome {
            CollectionOutcome::Collected { kind, removed } => {
                println!("{:<16} removed {}", kind, removed)
            }
            CollectionOutcome::Failed(failure) => {
                println!("{:<16} FAILED: {}", failure.kind, failure.error)
            }
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli_args = CliArgs::parse();

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            EnvFilter::builder()
                .with_default_directive(LevelFilter::INFO.into())
                .with_env_var("LOG_LEVEL")
                .from_env_lossy(),
        )
        .try_init()
        .context("Failed to initialize logging")?;

    let file_config = cli_args
        .config
        .as_deref()
        .map(FileConfig::load)
        .transpose()?;
    let cli_config = CliConfig {
        db_path: cli_args.db_path.clone(),
        read_pool_size: cli_args.read_pool_size,
        cache_scope: cli_args.cache_scope,
        integrity_policy: cli_args.integrity_policy,
        only_enabled_catalogs: cli_args.only_enabled_catalogs,
        collect_interval_hours: cli_args.collect_interval_hours,
    };
    let config = AppConfig::resolve(&cli_config, file_config)?;

    info!("Opening video database at {:?}...", config.db_path);
    let store = Arc::new(SqliteVideoStore::new(
        &config.db_path,
        config.read_pool_size,
    )?);
    let resolver = VideoResolver::new(store)
        .with_integrity_policy(config.integrity_policy)
        .with_cache_scope(config.cache_scope);
    let library =
        VideoLibrary::new(resolver.clone()).with_only_enabled_catalogs(config.only_enabled_catalogs);

    match cli_args.command {
        Command::Resolve { id } => {
            let resolved = resolver.scoped().resolve(id)?;
            println!("{}", serde_json::to_string_pretty(&resolved.to_json())?);
        }
        Command::Batch { ids } => {
            let scoped = resolver.scoped();
            let cached = scoped.build_cache(&ids)?;
            info!("Cached {} of {} requested videos", cached, ids.len());
            for id in ids {
                match scoped.resolve(id) {
                    Ok(resolved) => println!("{}", resolved.to_json()),
                    Err(e) => error!("Failed to resolve video {}: {}", id, e),
                }
            }
        }
        Command::Collect => {
            let report = resolver.collect();
            print_report(&report);
            if !report.is_success() {
                anyhow::bail!(
                    "{} subtype collection pass(es) failed",
                    report.failures().count()
                );
            }
        }
        Command::Random { count } => {
            for id in library.random_ids(count)? {
                println!("{}", id);
            }
        }
        Command::Watch => {
            let Some(interval) = config.collect_interval() else {
                anyhow::bail!("collect_interval_hours is 0, nothing to watch");
            };
            info!(
                "Collecting orphans every {} hours",
                config.collect_interval_hours
            );
            let mut ticker = tokio::time::interval(interval);
            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        let resolver = resolver.clone();
                        match tokio::task::spawn_blocking(move || resolver.collect()).await {
                            Ok(report) if !report.is_success() => {
                                error!("{} subtype collection pass(es) failed", report.failures().count());
                            }
                            Ok(_) => {}
                            Err(e) => error!("Collection task panicked: {}", e),
                        }
                    }
                    _ = tokio::signal::ctrl_c() => {
                        info!("Shutting down");
                        break;
                    }
                }
            }
        }
    }
    Ok(())
}
