//! Startup checks.
//!
//! `blogd` refuses to start on a config it cannot serve safely: without a
//! JWT secret every token would verify against an empty key.

use std::path::PathBuf;
use std::sync::Arc;

use tracing::info;

use blog_core::ServiceConfig;
use blog_sql::{SQLStore, SqliteStore};

use crate::config::ServerConfig;

/// Verify server configuration is ready for use.
pub fn verify_config(config: &ServerConfig) -> anyhow::Result<()> {
    if config.jwt.secret.trim().is_empty() {
        anyhow::bail!("JWT secret is empty in configuration.");
    }
    if config.storage.data_dir.trim().is_empty() {
        anyhow::bail!("Storage data_dir is empty in configuration.");
    }
    Ok(())
}

/// Create the data directory and open the SQLite store.
pub fn open_store(config: &ServiceConfig) -> anyhow::Result<Arc<dyn SQLStore>> {
    if let Some(dir) = &config.data_dir {
        std::fs::create_dir_all(dir)?;
    }
    let path: PathBuf = config.resolve_sqlite_path();
    let store = SqliteStore::open(&path)
        .map_err(|e| anyhow::anyhow!("failed to open SQL store {}: {}", path.display(), e))?;
    info!("SQL store opened at {}", path.display());
    Ok(Arc::new(store))
}
