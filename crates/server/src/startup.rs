use std::{future::Future, net::SocketAddr, path::Path};

use axum::http::{header, HeaderValue, Method};
use axum::Router;
use configs::AppConfig;
use migration::{Migrator, MigratorTrait};
use sea_orm::DatabaseConnection;
use tower_http::cors::CorsLayer;
use tracing::{info, warn};

use crate::errors::StartupError;
use crate::routes::{self, auth::ServerState};

/// Credentialed CORS for the configured origins only. With no origins the
/// layer adds no CORS headers, so browsers stay same-origin.
pub fn build_cors(origins: &[String]) -> Result<CorsLayer, StartupError> {
    if origins.is_empty() {
        return Ok(CorsLayer::new());
    }
    let allowed = origins
        .iter()
        .map(|o| HeaderValue::from_str(o).map_err(|e| StartupError::InvalidConfig(format!("cors origin {o:?}: {e}"))))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(CorsLayer::new()
        .allow_origin(allowed)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
        .allow_credentials(true))
}

/// `config.toml` when present, otherwise environment variables only.
/// A config file that exists but fails validation is an error.
pub fn load_config() -> Result<AppConfig, StartupError> {
    let path = configs::config_path();
    let loaded = if Path::new(&path).exists() {
        AppConfig::load_and_validate()
    } else {
        warn!(%path, "config file not found, using environment");
        AppConfig::from_env()
    };
    loaded.map_err(|e| StartupError::InvalidConfig(e.to_string()))
}

/// Connect the pool and apply migrations when `database.auto_migrate` is set.
pub async fn connect_database(cfg: &AppConfig) -> Result<DatabaseConnection, StartupError> {
    let db = models::db::connect_with_config(&cfg.database).await?;
    if cfg.database.auto_migrate {
        Migrator::up(&db, None).await?;
        info!("database migrations applied");
    }
    Ok(db)
}

/// Router over an already connected database.
pub fn build_app(cfg: &AppConfig, db: DatabaseConnection) -> Result<Router, StartupError> {
    let state = ServerState::new(db, &cfg.auth)?;
    Ok(routes::build_router(state, build_cors(&cfg.server.cors_allowed_origins)?))
}

/// Serve until `shutdown` resolves, then drain in-flight requests.
pub async fn run_until<F>(shutdown: F) -> anyhow::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let cfg = load_config()?;
    let db = connect_database(&cfg).await?;
    let app = build_app(&cfg, db)?;

    let addr: SocketAddr = format!("{}:{}", cfg.server.host, cfg.server.port).parse()?;
    info!(%addr, "starting game auth server");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    // peer addresses key the register/login throttle
    axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>())
        .with_graceful_shutdown(shutdown)
        .await?;
    info!("server drained");
    Ok(())
}
