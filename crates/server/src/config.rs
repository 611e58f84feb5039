// crates/server/src/config.rs
//! Command-line and environment configuration.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, ValueEnum};

/// Default port for the server.
pub const DEFAULT_PORT: u16 = 3001;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    Pretty,
    Json,
}

/// GlassBox billing demo server.
#[derive(Debug, Clone, Parser)]
#[command(name = "glassbox", version, about)]
pub struct Config {
    /// Address to bind.
    #[arg(long, env = "GLASSBOX_HOST", default_value = "127.0.0.1")]
    pub host: IpAddr,

    /// Port to bind.
    #[arg(long, env = "GLASSBOX_PORT", default_value_t = DEFAULT_PORT)]
    pub port: u16,

    /// Externally visible base URL for upload and document links.
    /// Defaults to http://localhost:{port}.
    #[arg(long, env = "GLASSBOX_PUBLIC_URL")]
    pub public_url: Option<String>,

    /// Frontend bundle served for non-API paths. Defaults to ./dist if it exists.
    #[arg(long, env = "STATIC_DIR")]
    pub static_dir: Option<PathBuf>,

    /// Gap between scripted processing stages, in milliseconds.
    #[arg(long, env = "GLASSBOX_STAGE_INTERVAL_MS", default_value_t = 4000)]
    pub stage_interval_ms: u64,

    /// Most uploaded documents kept in memory.
    #[arg(long, env = "GLASSBOX_MAX_DOCUMENTS", default_value_t = 64)]
    pub max_documents: usize,

    /// Memory budget for uploaded documents, in MiB.
    #[arg(long, env = "GLASSBOX_DOCUMENT_BUDGET_MB", default_value_t = 256)]
    pub document_budget_mb: usize,

    /// Enable the mock identity provider and the anonymous dev session.
    #[arg(long, env = "GLASSBOX_DEV_AUTH")]
    pub dev_auth: bool,

    /// Origins allowed to make credentialed cross-origin requests.
    #[arg(
        long = "allowed-origin",
        env = "GLASSBOX_ALLOWED_ORIGINS",
        value_delimiter = ',',
        default_value = "http://localhost:5173,http://localhost:3001"
    )]
    pub allowed_origins: Vec<String>,

    #[arg(long, env = "GLASSBOX_LOG_FORMAT", value_enum, default_value_t = LogFormat::Pretty)]
    pub log_format: LogFormat,
}

impl Config {
    pub fn bind_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }

    /// Base URL without a trailing slash.
    pub fn public_url(&self) -> String {
        match &self.public_url {
            Some(url) => url.trim_end_matches('/').to_string(),
            None => format!("http://localhost:{}", self.port),
        }
    }

    pub fn document_budget_bytes(&self) -> usize {
        self.document_budget_mb.saturating_mul(1024 * 1024)
    }

    pub fn stage_interval(&self) -> Duration {
        Duration::from_millis(self.stage_interval_ms)
    }

    /// Get the static directory for serving frontend files.
    ///
    /// Priority:
    /// 1. `--static-dir` / `STATIC_DIR` (explicit override)
    /// 2. ./dist directory (if it exists)
    /// 3. None (API-only mode)
    pub fn resolved_static_dir(&self) -> Option<PathBuf> {
        self.static_dir.clone().or_else(|| {
            let dist = PathBuf::from("dist");
            dist.exists().then_some(dist)
        })
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: IpAddr::V4(Ipv4Addr::LOCALHOST),
            port: DEFAULT_PORT,
            public_url: None,
            static_dir: None,
            stage_interval_ms: 4000,
            max_documents: 64,
            document_budget_mb: 256,
            dev_auth: false,
            allowed_origins: vec![
                "http://localhost:5173".to_string(),
                "http://localhost:3001".to_string(),
            ],
            log_format: LogFormat::Pretty,
        }
    }
}
