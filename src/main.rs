mod clock;
mod config;
mod db;
mod error;
mod extract;
mod models;
mod routes;
mod services;
mod store;

#[cfg(test)]
mod test_utils;

use std::sync::Arc;

use crate::{
    clock::SystemClock,
    config::Config,
    models::AppState,
    store::{memory::MemoryStore, postgres::PgStore},
};

use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::set_header::SetResponseHeaderLayer;
use tower_http::trace::TraceLayer;

use axum::http::{header, HeaderValue, Method};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("info".parse()?))
        .init();

    let cfg = Config::from_env()?;
    let clock = Arc::new(SystemClock);

    let state = match &cfg.database_url {
        Some(url) => {
            let pool = db::connect_pg(url, cfg.db_max_connections).await?;
            if cfg.run_migrations {
                db::run_migrations(&pool).await?;
                tracing::info!("migrations applied");
            }
            AppState::new(Arc::new(PgStore::new(pool)), clock)
        }
        None => {
            tracing::warn!("DATABASE_URL not set; using in-memory store, data will not persist");
            AppState::new(Arc::new(MemoryStore::default()), clock)
        }
    };

    let allow_origin = if cfg.cors_allowed_origins.is_empty() {
        AllowOrigin::from(Any)
    } else {
        let origins = cfg
            .cors_allowed_origins
            .iter()
            .map(|o| HeaderValue::from_str(o))
            .collect::<Result<Vec<_>, _>>()?;
        AllowOrigin::list(origins)
    };

    let cors = CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::CONTENT_TYPE, header::ACCEPT]);

    let app = routes::router(state)
        .layer(cors)
        .layer(SetResponseHeaderLayer::overriding(
            header::X_FRAME_OPTIONS,
            HeaderValue::from_static("SAMEORIGIN"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            header::REFERRER_POLICY,
            HeaderValue::from_static("strict-origin-when-cross-origin"),
        ))
        .layer(TraceLayer::new_for_http());

    tracing::info!("Listening on http://{}", cfg.bind_addr);
    let listener = tokio::net::TcpListener::bind(&cfg.bind_addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}
