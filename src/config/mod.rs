mod file_config;

pub use file_config::{CacheConfig, FileConfig, ResolverConfig};

use crate::identity_cache::CacheScope;
use crate::resolver::IntegrityPolicy;
use anyhow::{anyhow, bail, Result};
use clap::ValueEnum;
use std::path::PathBuf;
use std::time::Duration;

/// CLI arguments that can be overridden by the TOML config.
#[derive(Debug, Clone, Default)]
pub struct CliConfig {
    pub db_path: Option<PathBuf>,
    pub read_pool_size: usize,
    pub cache_scope: CacheScope,
    pub integrity_policy: IntegrityPolicy,
    pub only_enabled_catalogs: bool,
    pub collect_interval_hours: u64,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub db_path: PathBuf,
    pub read_pool_size: usize,
    pub cache_scope: CacheScope,
    pub integrity_policy: IntegrityPolicy,
    pub only_enabled_catalogs: bool,
    /// Zero disables periodic collection.
    pub collect_interval_hours: u64,
}

/// Longest accepted collection interval, so the interval in seconds fits a `u64`.
pub const MAX_COLLECT_INTERVAL_HOURS: u64 = u64::MAX / 3600;

fn parse_cache_scope(s: &str) -> Option<CacheScope> {
    CacheScope::from_str(s, true).ok()
}

fn parse_integrity_policy(s: &str) -> Option<IntegrityPolicy> {
    IntegrityPolicy::from_str(s, true).ok()
}

impl AppConfig {
    /// Resolve configuration from CLI arguments and optional TOML file config.
    /// TOML values override CLI values where present.
    pub fn resolve(cli: &CliConfig, file_config: Option<FileConfig>) -> Result<Self> {
        let file = file_config.unwrap_or_default();

        let db_path = file
            .db_path
            .map(PathBuf::from)
            .or_else(|| cli.db_path.clone())
            .ok_or_else(|| anyhow!("db_path must be specified on the command line or in config file"))?;
        if let Some(parent) = db_path.parent() {
            if !parent.as_os_str().is_empty() && !parent.is_dir() {
                bail!("Database directory does not exist: {:?}", parent);
            }
        }

        let read_pool_size = file.read_pool_size.unwrap_or(cli.read_pool_size);
        if read_pool_size == 0 {
            bail!("read_pool_size must be at least 1");
        }

        let cache_scope = match file.cache.and_then(|c| c.scope) {
            Some(scope) => parse_cache_scope(&scope)
                .ok_or_else(|| anyhow!("Unknown cache scope: {}", scope))?,
            None => cli.cache_scope,
        };

        let integrity_policy = match file.resolver.and_then(|r| r.integrity_policy) {
            Some(policy) => parse_integrity_policy(&policy)
                .ok_or_else(|| anyhow!("Unknown integrity policy: {}", policy))?,
            None => cli.integrity_policy,
        };

        let collect_interval_hours = file
            .collect_interval_hours
            .unwrap_or(cli.collect_interval_hours);
        if collect_interval_hours > MAX_COLLECT_INTERVAL_HOURS {
            bail!(
                "collect_interval_hours must be at most {}",
                MAX_COLLECT_INTERVAL_HOURS
            );
        }

        Ok(Self {
            db_path,
            read_pool_size,
            cache_scope,
            integrity_policy,
            only_enabled_catalogs: file
                .only_enabled_catalogs
                .unwrap_or(cli.only_enabled_catalogs),
            collect_interval_hours,
        })
    }

    /// Time between collection runs in watch mode, `None` when disabled.
    pub fn collect_interval(&self) -> Option<Duration> {
        match self.collect_interval_hours {
            0 => None,
            hours => Some(Duration::from_secs(hours.saturating_mul(60 * 60))),
        }
    }
}
