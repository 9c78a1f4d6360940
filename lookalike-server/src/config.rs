//! Server configuration module
//!
//! Handles loading configuration from environment variables with sensible defaults.

use std::net::SocketAddr;
use std::path::PathBuf;

use lookalike_core::fingerprint::patch::{DEFAULT_PATCH_SIZE, DEFAULT_PATCH_STEP};
use lookalike_core::{MatchConfig, DEFAULT_CONCURRENCY_LIMIT, DEFAULT_SIMILAR_THRESHOLD};

/// URL prefix under which reference images are served and indexed
pub const REFERENCE_PREFIX: &str = "/ourImages";

/// URL prefix under which uploaded images are served and indexed
pub const UPLOAD_PREFIX: &str = "/clientImages";

/// Server configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct Config {
    /// Server port (default: 3000)
    pub port: u16,
    /// Server host (default: 127.0.0.1)
    pub host: [u8; 4],
    /// Allowed CORS origins, comma-separated (default: allow all in dev)
    pub allowed_origins: Option<Vec<String>>,
    /// Request body limit in MB (default: 50)
    pub body_limit_mb: usize,
    /// Maximum file size per upload in MB (default: 25)
    pub max_file_size_mb: usize,
    /// Request timeout in seconds (default: 30)
    pub timeout_secs: u64,
    /// Enable rate limiting (default: false for tests, true when loaded from env)
    pub rate_limit_enabled: bool,
    /// Rate limit: requests per second (default: 10)
    pub rate_limit_per_sec: u64,
    /// Rate limit: burst size (default: 20)
    pub rate_limit_burst: u32,
    /// PostgreSQL URL; the catalog is kept in memory when unset
    pub database_url: Option<String>,
    /// Database connection pool maximum connections (default: 20)
    pub database_max_connections: u32,
    /// Database connection pool minimum connections (default: 2)
    pub database_min_connections: u32,
    /// Directory of reference images synced at startup (default: ourImages)
    pub reference_dir: PathBuf,
    /// Directory accepted uploads are written to (default: clientImages)
    pub upload_dir: PathBuf,
    /// Minimum similarity percentage for a match (default: 70)
    pub similar_threshold: f64,
    /// Concurrent comparison tasks per request (default: 5)
    pub match_concurrency: usize,
    /// Crop side length for the partial fallback (default: 64)
    pub patch_size: u32,
    /// Crop stride for the partial fallback (default: 16)
    pub patch_step: u32,
    /// Index the reference directory before serving (default: true)
    pub sync_on_startup: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: 3000,
            host: [127, 0, 0, 1],
            allowed_origins: None, // None = allow all (dev mode)
            body_limit_mb: 50,
            max_file_size_mb: 25,
            timeout_secs: 30,
            rate_limit_enabled: false, // Disabled by default (for tests)
            rate_limit_per_sec: 10,
            rate_limit_burst: 20,
            database_url: None,
            database_max_connections: 20,
            database_min_connections: 2,
            reference_dir: PathBuf::from("ourImages"),
            upload_dir: PathBuf::from("clientImages"),
            similar_threshold: DEFAULT_SIMILAR_THRESHOLD,
            match_concurrency: DEFAULT_CONCURRENCY_LIMIT,
            patch_size: DEFAULT_PATCH_SIZE,
            patch_step: DEFAULT_PATCH_STEP,
            sync_on_startup: true,
        }
    }
}

fn env_parse<T: std::str::FromStr>(name: &str) -> Option<T> {
    std::env::var(name).ok().and_then(|v| v.parse().ok())
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let port = env_parse("PORT").unwrap_or(defaults.port);

        let host = std::env::var("HOST")
            .ok()
            .map(|h| {
                if h == "0.0.0.0" {
                    [0, 0, 0, 0]
                } else {
                    [127, 0, 0, 1]
                }
            })
            .unwrap_or(defaults.host);

        let allowed_origins = std::env::var("ALLOWED_ORIGINS").ok().map(|origins| {
            origins
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect()
        });

        // Rate limiting enabled by default in production, can be disabled with RATE_LIMIT_ENABLED=false
        let rate_limit_enabled = std::env::var("RATE_LIMIT_ENABLED")
            .map(|v| v.to_lowercase() != "false")
            .unwrap_or(true);

        let database_url = std::env::var("DATABASE_URL")
            .ok()
            .filter(|url| !url.trim().is_empty());

        let sync_on_startup = std::env::var("SYNC_ON_STARTUP")
            .map(|v| v.to_lowercase() != "false")
            .unwrap_or(defaults.sync_on_startup);

        Self {
            port,
            host,
            allowed_origins,
            body_limit_mb: env_parse("BODY_LIMIT_MB").unwrap_or(defaults.body_limit_mb),
            max_file_size_mb: env_parse("MAX_FILE_SIZE_MB").unwrap_or(defaults.max_file_size_mb),
            timeout_secs: env_parse("REQUEST_TIMEOUT_SECS").unwrap_or(defaults.timeout_secs),
            rate_limit_enabled,
            rate_limit_per_sec: env_parse("RATE_LIMIT_PER_SEC")
                .unwrap_or(defaults.rate_limit_per_sec),
            rate_limit_burst: env_parse("RATE_LIMIT_BURST").unwrap_or(defaults.rate_limit_burst),
            database_url,
            database_max_connections: env_parse("DATABASE_MAX_CONNECTIONS")
                .unwrap_or(defaults.database_max_connections),
            database_min_connections: env_parse("DATABASE_MIN_CONNECTIONS")
                .unwrap_or(defaults.database_min_connections),
            reference_dir: std::env::var("REFERENCE_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.reference_dir),
            upload_dir: std::env::var("UPLOAD_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.upload_dir),
            similar_threshold: env_parse("SIMILAR_THRESHOLD")
                .unwrap_or(defaults.similar_threshold),
            match_concurrency: env_parse("MATCH_CONCURRENCY")
                .unwrap_or(defaults.match_concurrency),
            patch_size: env_parse("PATCH_SIZE").unwrap_or(defaults.patch_size),
            patch_step: env_parse("PATCH_STEP").unwrap_or(defaults.patch_step),
            sync_on_startup,
        }
    }

    /// Get socket address from config
    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::from((self.host, self.port))
    }

    /// Maximum accepted image size in bytes
    pub fn max_file_size(&self) -> usize {
        self.max_file_size_mb * 1024 * 1024
    }

    /// Matching engine settings, validated
    pub fn match_config(&self) -> lookalike_core::Result<MatchConfig> {
        MatchConfig::new(
            self.similar_threshold,
            self.match_concurrency,
            self.patch_size,
            self.patch_step,
        )
    }
}
