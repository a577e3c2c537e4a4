#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Actix-Web read API over the incident store.
//!
//! Serves the latest ingested incidents, including any impact analysis the
//! downstream analyst has written back, to the web map and to operators.

mod handlers;

use std::sync::Arc;

use actix_cors::Cors;
use actix_web::{App, HttpServer, middleware, web};
use sentinel_ops_database::{ConnectionPool, db, ensure_schema};

/// Shared application state.
pub struct AppState {
    /// Incident store connections.
    pub pool: Arc<ConnectionPool>,
}

/// Registers the `/api` routes.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api")
            .route("/health", web::get().to(handlers::health))
            .route("/incidents", web::get().to(handlers::incidents))
            .route("/incidents/{id}", web::get().to(handlers::incident)),
    );
}

/// Starts the read API server.
///
/// Connects to the store named by `DB_URL` (pool size `DB_POOL_SIZE`),
/// makes sure the incident table exists, and serves on
/// `BIND_ADDR:PORT`. The caller provides the async runtime (e.g. via
/// `#[actix_web::main]`).
///
/// # Errors
///
/// Returns an `std::io::Result` error if the store is unreachable, the
/// server fails to bind, or it encounters a runtime error.
#[allow(clippy::future_not_send)]
pub async fn run_server() -> std::io::Result<()> {
    pretty_env_logger::init_custom_env("RUST_LOG");

    let url = std::env::var("DB_URL").unwrap_or_else(|_| db::DEFAULT_DATABASE_URL.to_string());
    let pool_size: usize = std::env::var("DB_POOL_SIZE")
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(4);

    log::info!("Connecting to incident store...");
    let pool = db::connect(&url, pool_size)
        .await
        .map_err(|e| std::io::Error::other(e.to_string()))?;
    ensure_schema(&pool)
        .await
        .map_err(|e| std::io::Error::other(e.to_string()))?;

    let state = web::Data::new(AppState {
        pool: Arc::new(pool),
    });

    let bind_addr = std::env::var("BIND_ADDR").unwrap_or_else(|_| "127.0.0.1".to_string());
    let port: u16 = std::env::var("PORT")
        .ok()
        .and_then(|p| p.parse().ok())
        .unwrap_or(8080);

    log::info!("Starting server on {bind_addr}:{port}");

    HttpServer::new(move || {
        App::new()
            .wrap(Cors::permissive())
            .wrap(middleware::Logger::default())
            .app_data(state.clone())
            .configure(configure)
    })
    .bind((bind_addr, port))?
    .run()
    .await
}
