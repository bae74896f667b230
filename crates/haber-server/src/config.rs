use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::{Context, Result};

/// Server configuration, read from the environment (and `.env` if present).
#[derive(Debug, Clone)]
pub struct Config {
    pub db_path: PathBuf,
    pub host: String,
    pub port: u16,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let _ = dotenvy::dotenv();

        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let db_path = lookup("HABER_DB_PATH").unwrap_or_else(|| "haber.db".into());
        let host = lookup("HABER_HOST").unwrap_or_else(|| "0.0.0.0".into());
        let port = lookup("HABER_PORT")
            .unwrap_or_else(|| "5000".into())
            .parse::<u16>()
            .context("HABER_PORT must be a valid port number")?;

        Ok(Config {
            db_path: db_path.into(),
            host,
            port,
        })
    }

    pub fn addr(&self) -> Result<SocketAddr> {
        format!("{}:{}", self.host, self.port)
            .parse()
            .with_context(|| format!("invalid listen address {}:{}", self.host, self.port))
    }
}
