use std::net::SocketAddr;

use anyhow::Context;

#[derive(Clone, Debug)]
pub struct Config {
    pub addr: SocketAddr,
    pub database_url: String,
    pub auth_token: String,
    pub boxoffice_url: String,
    pub boxoffice_api_key: String,
    pub boxoffice_rps: u32,
    pub boxoffice_timeout_ms: u64,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let host = std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string());
        let port: u16 =
            std::env::var("PORT").unwrap_or_else(|_| "3000".to_string()).parse().context("PORT")?;

        let database_url = std::env::var("DATABASE_URL")
            .unwrap_or_else(|_| "sqlite://marquee.db?mode=rwc".to_string());

        // Empty token disables the bearer guard on movie creation.
        let auth_token = std::env::var("AUTH_TOKEN").unwrap_or_else(|_| "".to_string());

        // Empty URL disables box office enrichment entirely.
        let boxoffice_url = std::env::var("BOXOFFICE_URL").unwrap_or_else(|_| "".to_string());
        let boxoffice_api_key =
            std::env::var("BOXOFFICE_API_KEY").unwrap_or_else(|_| "".to_string());

        let boxoffice_rps: u32 =
            std::env::var("BOXOFFICE_RPS").ok().and_then(|s| s.parse().ok()).unwrap_or(4);

        let boxoffice_timeout_ms: u64 =
            std::env::var("BOXOFFICE_TIMEOUT_MS").ok().and_then(|s| s.parse().ok()).unwrap_or(5000);

        Ok(Self {
            addr: format!("{host}:{port}").parse().context("HOST/PORT")?,
            database_url,
            auth_token,
            boxoffice_url,
            boxoffice_api_key,
            boxoffice_rps,
            boxoffice_timeout_ms,
        })
    }
}
