use anyhow::Context;
use ipnet::IpNet;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::analytics::aggregator::DEFAULT_TOP_PAGES;
use crate::analytics::cache::{DEFAULT_CACHE_MAX_ENTRIES, DEFAULT_CACHE_TTL_SECS};
use crate::analytics::dedup::DEFAULT_DEDUP_WINDOW_SECS;
use crate::analytics::engine::DEFAULT_RECENT_LIMIT;
use crate::analytics::pager::DEFAULT_PAGE_SIZE;

const DEFAULT_HASH_SALT: &str = "default-salt";

/// Upper bound for the cache TTL and the dedup window: one year
pub const MAX_DURATION_SECS: u64 = 86_400 * 365;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub database: DatabaseConfig,
    pub server: ServerConfig,
    pub stats: StatsConfig,
    pub visitor: VisitorConfig,
    pub cors: CorsConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub backend: DatabaseBackend,
    pub url: String,
    pub max_connections: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DatabaseBackend {
    Sqlite,
    Postgres,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

/// Limits of the aggregation engine
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatsConfig {
    pub cache_ttl_secs: u64,
    pub cache_max_entries: usize,
    pub page_size: i64,
    pub dedup_window_secs: u64,
    pub top_pages_limit: usize,
    pub recent_visits_limit: i64,
}

impl StatsConfig {
    /// Reject limits the engine cannot honour
    pub fn validate(&self) -> anyhow::Result<()> {
        check_duration("STATS_CACHE_TTL_SECS", self.cache_ttl_secs)?;
        check_duration("DEDUP_WINDOW_SECS", self.dedup_window_secs)?;

        if self.page_size <= 0 {
            anyhow::bail!("STATS_PAGE_SIZE must be greater than zero");
        }
        if self.top_pages_limit == 0 {
            anyhow::bail!("TOP_PAGES_LIMIT must be greater than zero");
        }
        if self.recent_visits_limit <= 0 {
            anyhow::bail!("RECENT_VISITS_LIMIT must be greater than zero");
        }
        Ok(())
    }
}

fn check_duration(key: &str, secs: u64) -> anyhow::Result<()> {
    if !(1..=MAX_DURATION_SECS).contains(&secs) {
        anyhow::bail!("{key} must be between 1 and {MAX_DURATION_SECS} seconds, got {secs}");
    }
    Ok(())
}

impl Default for StatsConfig {
    fn default() -> Self {
        Self {
            cache_ttl_secs: DEFAULT_CACHE_TTL_SECS,
            cache_max_entries: DEFAULT_CACHE_MAX_ENTRIES,
            page_size: DEFAULT_PAGE_SIZE,
            dedup_window_secs: DEFAULT_DEDUP_WINDOW_SECS,
            top_pages_limit: DEFAULT_TOP_PAGES,
            recent_visits_limit: DEFAULT_RECENT_LIMIT,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrustedProxyMode {
    /// Use the socket address only
    None,
    /// X-Forwarded-For / X-Real-IP, validated against `trusted_proxies`
    Standard,
    /// CF-Connecting-IP
    Cloudflare,
    /// Vercel edge: X-Forwarded-For is set by the platform
    Vercel,
}

/// How a visitor is identified without storing the raw address
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VisitorConfig {
    /// Salt mixed into the visitor hash
    pub hash_salt: String,
    pub trusted_proxy_mode: TrustedProxyMode,
    /// Proxy networks skipped when walking X-Forwarded-For from the right
    pub trusted_proxies: Vec<IpNet>,
}

impl Default for VisitorConfig {
    fn default() -> Self {
        Self {
            hash_salt: DEFAULT_HASH_SALT.to_string(),
            trusted_proxy_mode: TrustedProxyMode::Standard,
            trusted_proxies: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CorsConfig {
    /// `*` allows any origin
    pub allowed_origins: Vec<String>,
}

impl CorsConfig {
    pub fn allows_any(&self) -> bool {
        self.allowed_origins.is_empty() || self.allowed_origins.iter().any(|o| o == "*")
    }
}

fn env_or<T>(key: &str, default: T) -> anyhow::Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match std::env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .with_context(|| format!("{key} has an invalid value: {raw}")),
        Err(_) => Ok(default),
    }
}

fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let backend_str =
            std::env::var("DATABASE_BACKEND").unwrap_or_else(|_| "sqlite".to_string());

        let backend = match backend_str.to_lowercase().as_str() {
            "postgres" | "postgresql" => DatabaseBackend::Postgres,
            _ => DatabaseBackend::Sqlite,
        };

        let database_url =
            std::env::var("DATABASE_URL").unwrap_or_else(|_| "sqlite://./footfall.db".to_string());
        let max_connections = env_or("DATABASE_MAX_CONNECTIONS", 5u32)?;

        let host = std::env::var("HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = env_or("PORT", 8080u16)?;

        let stats = StatsConfig {
            cache_ttl_secs: env_or("STATS_CACHE_TTL_SECS", DEFAULT_CACHE_TTL_SECS)?,
            cache_max_entries: env_or("STATS_CACHE_MAX_ENTRIES", DEFAULT_CACHE_MAX_ENTRIES)?,
            page_size: env_or("STATS_PAGE_SIZE", DEFAULT_PAGE_SIZE)?,
            dedup_window_secs: env_or("DEDUP_WINDOW_SECS", DEFAULT_DEDUP_WINDOW_SECS)?,
            top_pages_limit: env_or("TOP_PAGES_LIMIT", DEFAULT_TOP_PAGES)?,
            recent_visits_limit: env_or("RECENT_VISITS_LIMIT", DEFAULT_RECENT_LIMIT)?,
        };

        stats.validate().context("invalid stats configuration")?;

        let hash_salt = match std::env::var("API_SECRET") {
            Ok(secret) if !secret.is_empty() => secret,
            _ => {
                tracing::warn!(
                    "API_SECRET is not set, visitor hashes use the built-in default salt"
                );
                DEFAULT_HASH_SALT.to_string()
            }
        };

        let trusted_proxy_mode = match std::env::var("TRUSTED_PROXY_MODE")
            .unwrap_or_else(|_| "standard".to_string())
            .to_lowercase()
            .as_str()
        {
            "none" => TrustedProxyMode::None,
            "standard" => TrustedProxyMode::Standard,
            "cloudflare" => TrustedProxyMode::Cloudflare,
            "vercel" => TrustedProxyMode::Vercel,
            other => {
                tracing::warn!(
                    "Unknown TRUSTED_PROXY_MODE '{other}', falling back to 'standard'. Supported values: none, standard, cloudflare, vercel"
                );
                TrustedProxyMode::Standard
            }
        };

        let trusted_proxies = split_list(&std::env::var("TRUSTED_PROXIES").unwrap_or_default())
            .iter()
            .map(|cidr| {
                cidr.parse::<IpNet>()
                    .with_context(|| format!("TRUSTED_PROXIES contains an invalid CIDR: {cidr}"))
            })
            .collect::<anyhow::Result<Vec<_>>>()?;

        let allowed_origins =
            split_list(&std::env::var("ALLOWED_ORIGINS").unwrap_or_else(|_| "*".to_string()));

        Ok(Config {
            database: DatabaseConfig {
                backend,
                url: database_url,
                max_connections,
            },
            server: ServerConfig { host, port },
            stats,
            visitor: VisitorConfig {
                hash_salt,
                trusted_proxy_mode,
                trusted_proxies,
            },
            cors: CorsConfig { allowed_origins },
        })
    }
}
