//! Query layer configuration
//!
//! Configuration comes from the environment (`from_env`) or a TOML file
//! (`from_toml_file`). Missing TOML sections fall back to defaults.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;
use tracing::warn;

use crate::cache::{FileTraceCache, MemoryTraceCache, SqliteTraceCache, TraceCache};
use crate::error::{Result, TraceQueryError};

/// Default backend host
pub const DEFAULT_HOST: &str = "https://cloud.langfuse.com";

/// Default request timeout in seconds
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Complete configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct QueryConfig {
    #[serde(default)]
    pub backend: BackendConfig,
    #[serde(default)]
    pub cache: CacheConfig,
}

impl QueryConfig {
    pub fn from_env() -> Self {
        Self {
            backend: BackendConfig::from_env(),
            cache: CacheConfig::from_env(),
        }
    }

    pub fn from_toml_str(raw: &str) -> Result<Self> {
        toml::from_str(raw).map_err(|e| TraceQueryError::Config(e.to_string()))
    }

    pub fn from_toml_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .map_err(|e| TraceQueryError::Config(format!("failed to read {:?}: {}", path, e)))?;
        Self::from_toml_str(&raw)
    }
}

/// Remote backend connection settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackendConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default)]
    pub public_key: Option<String>,
    #[serde(default)]
    pub secret_key: Option<String>,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_host() -> String {
    DEFAULT_HOST.to_string()
}

fn default_timeout_secs() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            public_key: None,
            secret_key: None,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }
}

impl BackendConfig {
    pub fn from_env() -> Self {
        Self {
            host: std::env::var("LANGFUSE_HOST").unwrap_or_else(|_| default_host()),
            public_key: std::env::var("LANGFUSE_PUBLIC_KEY").ok(),
            secret_key: std::env::var("LANGFUSE_SECRET_KEY").ok(),
            timeout_secs: std::env::var("LANGFUSE_TIMEOUT_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(DEFAULT_TIMEOUT_SECS),
        }
    }
}

/// Cache medium
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CacheKind {
    #[default]
    Sqlite,
    File,
    Memory,
}

impl FromStr for CacheKind {
    type Err = TraceQueryError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "sqlite" => Ok(CacheKind::Sqlite),
            "file" => Ok(CacheKind::File),
            "memory" => Ok(CacheKind::Memory),
            other => Err(TraceQueryError::Config(format!(
                "unknown cache kind '{}' (expected sqlite, file or memory)",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CacheConfig {
    #[serde(default)]
    pub kind: CacheKind,
    /// Database file (sqlite) or directory (file). Defaults under the user
    /// cache directory.
    #[serde(default)]
    pub path: Option<PathBuf>,
}

impl CacheConfig {
    pub fn from_env() -> Self {
        let kind = match std::env::var("TRACE_CACHE_KIND") {
            Ok(raw) => raw.parse().unwrap_or_else(|e| {
                warn!("{}, using sqlite", e);
                CacheKind::Sqlite
            }),
            Err(_) => CacheKind::default(),
        };
        Self {
            kind,
            path: std::env::var("TRACE_CACHE_PATH").ok().map(PathBuf::from),
        }
    }

    pub fn resolved_path(&self) -> PathBuf {
        if let Some(path) = &self.path {
            return path.clone();
        }
        let base = dirs::cache_dir()
            .unwrap_or_else(std::env::temp_dir)
            .join("trace-query");
        match self.kind {
            CacheKind::Sqlite => base.join("traces.db"),
            CacheKind::File | CacheKind::Memory => base.join("traces"),
        }
    }

    /// Open the configured cache medium
    pub fn open(&self) -> Result<Arc<dyn TraceCache>> {
        let cache: Arc<dyn TraceCache> = match self.kind {
            CacheKind::Sqlite => Arc::new(SqliteTraceCache::open(&self.resolved_path())?),
            CacheKind::File => Arc::new(FileTraceCache::open(self.resolved_path())?),
            CacheKind::Memory => Arc::new(MemoryTraceCache::new()),
        };
        Ok(cache)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    fn clear_env() {
        for key in [
            "LANGFUSE_HOST",
            "LANGFUSE_PUBLIC_KEY",
            "LANGFUSE_SECRET_KEY",
            "LANGFUSE_TIMEOUT_SECS",
            "TRACE_CACHE_KIND",
            "TRACE_CACHE_PATH",
        ] {
            std::env::remove_var(key);
        }
    }

    #[test]
    #[serial]
    fn test_defaults_from_empty_env() {
        clear_env();
        let config = QueryConfig::from_env();
        assert_eq!(config.backend.host, DEFAULT_HOST);
        assert!(config.backend.public_key.is_none());
        assert_eq!(config.backend.timeout_secs, DEFAULT_TIMEOUT_SECS);
        assert_eq!(config.cache.kind, CacheKind::Sqlite);
        assert!(config.cache.resolved_path().ends_with("trace-query/traces.db"));
    }

    #[test]
    #[serial]
    fn test_from_env() {
        clear_env();
        std::env::set_var("LANGFUSE_HOST", "http://localhost:3000");
        std::env::set_var("LANGFUSE_PUBLIC_KEY", "pk");
        std::env::set_var("LANGFUSE_SECRET_KEY", "sk");
        std::env::set_var("LANGFUSE_TIMEOUT_SECS", "not-a-number");
        std::env::set_var("TRACE_CACHE_KIND", "FILE");
        std::env::set_var("TRACE_CACHE_PATH", "/tmp/tq");

        let config = QueryConfig::from_env();
        assert_eq!(config.backend.host, "http://localhost:3000");
        assert_eq!(config.backend.public_key.as_deref(), Some("pk"));
        assert_eq!(config.backend.secret_key.as_deref(), Some("sk"));
        assert_eq!(config.backend.timeout_secs, DEFAULT_TIMEOUT_SECS);
        assert_eq!(config.cache.kind, CacheKind::File);
        assert_eq!(config.cache.resolved_path(), PathBuf::from("/tmp/tq"));
        clear_env();
    }

    #[test]
    #[serial]
    fn test_unknown_cache_kind_falls_back() {
        clear_env();
        std::env::set_var("TRACE_CACHE_KIND", "redis");
        assert_eq!(CacheConfig::from_env().kind, CacheKind::Sqlite);
        clear_env();
    }

    #[test]
    fn test_toml_partial() {
        let config = QueryConfig::from_toml_str(
            r#"
            [backend]
            host = "http://langfuse.internal"
            public_key = "pk-lf-1"

            [cache]
            kind = "memory"
            "#,
        )
        .unwrap();
        assert_eq!(config.backend.host, "http://langfuse.internal");
        assert!(config.backend.secret_key.is_none());
        assert_eq!(config.backend.timeout_secs, DEFAULT_TIMEOUT_SECS);
        assert_eq!(config.cache.kind, CacheKind::Memory);

        let empty = QueryConfig::from_toml_str("").unwrap();
        assert_eq!(empty.backend.host, DEFAULT_HOST);
    }

    #[test]
    fn test_toml_invalid() {
        let err = QueryConfig::from_toml_str("[cache]\nkind = \"redis\"").unwrap_err();
        assert!(matches!(err, TraceQueryError::Config(_)));
    }

    #[test]
    fn test_open_each_kind() {
        let dir = tempfile::tempdir().unwrap();
        for (kind, path) in [
            (CacheKind::Sqlite, dir.path().join("traces.db")),
            (CacheKind::File, dir.path().join("files")),
            (CacheKind::Memory, dir.path().join("unused")),
        ] {
            let config = CacheConfig {
                kind,
                path: Some(path),
            };
            let cache = config.open().unwrap();
            assert!(cache.read("missing").unwrap().is_none());
        }
    }
}
