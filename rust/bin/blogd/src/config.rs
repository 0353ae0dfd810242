//! Server-side configuration file.
//!
//! ```toml
//! listen = "127.0.0.1:8080"   # optional
//!
//! [storage]
//! data_dir = "/var/lib/blogd"
//! sqlite_path = "/var/lib/blogd/blog.sqlite"   # optional
//!
//! [jwt]
//! secret = "..."
//! ```

use std::path::{Path, PathBuf};

use anyhow::Context;
use serde::{Deserialize, Serialize};

use blog_core::ServiceConfig;

/// Directory holding named contexts.
const CONTEXT_DIR: &str = "/etc/blogd";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Listen address; the `--listen` flag overrides it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub listen: Option<String>,

    pub storage: StorageConfig,

    pub jwt: JwtConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    pub data_dir: String,

    /// Defaults to `{data_dir}/data.sqlite`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sqlite_path: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JwtConfig {
    /// HS256 secret shared with the token issuer.
    pub secret: String,
}

impl ServerConfig {
    /// A bare name like `prod` means `/etc/blogd/prod.toml`; anything with
    /// a `/` or `.` is taken as a path.
    pub fn resolve_path(name: &str) -> PathBuf {
        if name.contains('/') || name.contains('.') {
            PathBuf::from(name)
        } else {
            Path::new(CONTEXT_DIR).join(format!("{name}.toml"))
        }
    }

    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        let config: ServerConfig = toml::from_str(&content)
            .with_context(|| format!("failed to parse {}", path.display()))?;
        Ok(config)
    }

    /// Storage/listen settings, with `listen` taking precedence over the file.
    pub fn service_config(&self, listen: Option<&str>) -> ServiceConfig {
        let defaults = ServiceConfig::default();
        ServiceConfig {
            data_dir: Some(PathBuf::from(&self.storage.data_dir)),
            sqlite_path: self.storage.sqlite_path.as_ref().map(PathBuf::from),
            listen: listen
                .map(str::to_string)
                .or_else(|| self.listen.clone())
                .unwrap_or(defaults.listen),
        }
    }
}
