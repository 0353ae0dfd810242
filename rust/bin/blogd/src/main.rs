//! `blogd`: the blog server binary.
//!
//! Usage:
//!   blogd -c <context-name-or-path> [--listen <addr>]
//!
//! The context name resolves to `/etc/blogd/<name>.toml`.
//! If a path with `/` or `.` is given, it's used directly.

mod auth_middleware;
mod bootstrap;
mod config;
mod routes;

use std::sync::Arc;

use clap::Parser;
use tracing::info;

use blog_core::Module;

use auth_middleware::JwtState;
use config::ServerConfig;

/// Blog server.
#[derive(Parser, Debug)]
#[command(name = "blogd", about = "Blog server")]
struct Cli {
    /// Context name or path to config file.
    #[arg(short = 'c', long = "config", required = true)]
    config: String,

    /// Listen address (overrides the config file, default 0.0.0.0:8080).
    #[arg(long = "listen")]
    listen: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let cli = Cli::parse();

    // Load server configuration.
    let config_path = ServerConfig::resolve_path(&cli.config);
    info!("Loading configuration from {}", config_path.display());
    let server_config = ServerConfig::load(&config_path)?;

    // Verify configuration is valid.
    bootstrap::verify_config(&server_config)?;

    let core_config = server_config.service_config(cli.listen.as_deref());
    let sql = bootstrap::open_store(&core_config)?;

    let blog_module = blog::BlogModule::new(Arc::clone(&sql))?;
    info!("Blog module initialized");

    let module_routes = vec![(blog_module.name(), blog_module.routes())];

    let jwt_state = Arc::new(JwtState::from_secret(&server_config.jwt.secret));
    let app = routes::build_router(jwt_state, module_routes);

    // Start server.
    let listener = tokio::net::TcpListener::bind(&core_config.listen).await?;
    info!("Blog server listening on {}", core_config.listen);
    axum::serve(listener, app).await?;

    Ok(())
}
