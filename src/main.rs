mod boxoffice;
mod catalog;
mod config;
mod db;
mod entities;
mod error;
mod models;
mod routes;

use std::{sync::Arc, time::Duration};

use axum::{
    Router,
    routing::{get, post},
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use crate::{boxoffice::BoxOfficeClient, catalog::Catalog, config::Config};

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub catalog: Catalog,
    pub boxoffice: Option<Arc<BoxOfficeClient>>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            std::env::var("RUST_LOG")
                .unwrap_or_else(|_| "info,marquee=debug,sqlx=warn".to_string()),
        )
        .init();

    let config = Arc::new(Config::from_env()?);

    let db = db::connect_and_migrate(&config.database_url).await?;
    let catalog = Catalog::new(db);

    let boxoffice = if config.boxoffice_url.trim().is_empty() {
        tracing::warn!("box office enrichment disabled - no BOXOFFICE_URL provided");
        None
    } else {
        let http = reqwest::Client::builder()
            .user_agent("marquee/0.1")
            .timeout(Duration::from_millis(config.boxoffice_timeout_ms))
            .build()?;
        Some(Arc::new(BoxOfficeClient::new(
            http,
            config.boxoffice_url.clone(),
            config.boxoffice_api_key.clone(),
            config.boxoffice_rps,
        )))
    };

    let state = Arc::new(AppState { config: config.clone(), catalog, boxoffice });

    let app = Router::new()
        .route("/movies", get(routes::list_movies).post(routes::create_movie))
        .route("/movies/{title}/rating", get(routes::rating_aggregate))
        .route("/movies/{title}/ratings", post(routes::submit_rating))
        .route("/healthz", get(routes::healthz))
        .with_state(state)
        .layer(CorsLayer::new().allow_origin(Any).allow_headers(Any))
        .layer(TraceLayer::new_for_http());

    let listener = tokio::net::TcpListener::bind(config.addr).await?;
    tracing::info!(addr = %config.addr, "listening");
    axum::serve(listener, app).await?;

    Ok(())
}
