//! Server configuration from environment variables.
//!
//!   PDC_DATABASE_URL      : Postgres connection string (unset: in-memory store)
//!   PDC_JWT_SECRET        : JWT HMAC secret (required)
//!   PDC_BIND_ADDR         : listen address (default: 0.0.0.0:8000)
//!   PDC_PAGE_SIZE         : default page size (default: 20)
//!   PDC_MAX_PAGE_SIZE     : page size cap (default: 100)
//!   PDC_PUBLIC_URL        : base for absolute pagination links
//!   PDC_DB_MAX_CONNECTIONS: pool size (default: 10)

use anyhow::{anyhow, Context};
use url::Url;

use crate::pagination::PageConfig;

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub database_url: Option<String>,
    pub jwt_secret: String,
    pub bind_addr: String,
    pub pages: PageConfig,
    pub db_max_connections: u32,
}

fn var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

fn parsed<T: std::str::FromStr>(name: &str, default: T) -> anyhow::Result<T>
where
    T::Err: std::fmt::Display,
{
    match var(name) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|e| anyhow!("{name}={raw:?} is invalid: {e}")),
        None => Ok(default),
    }
}

impl ServerConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let jwt_secret = var("PDC_JWT_SECRET").context("PDC_JWT_SECRET must be set")?;
        let public_url = var("PDC_PUBLIC_URL")
            .map(|raw| Url::parse(&raw).with_context(|| format!("PDC_PUBLIC_URL={raw:?} is invalid")))
            .transpose()?;

        let page_size: usize = parsed("PDC_PAGE_SIZE", 20)?;
        let max_page_size: usize = parsed("PDC_MAX_PAGE_SIZE", 100)?;
        if page_size == 0 || max_page_size < page_size {
            return Err(anyhow!(
                "PDC_PAGE_SIZE must be positive and not above PDC_MAX_PAGE_SIZE"
            ));
        }

        Ok(Self {
            database_url: var("PDC_DATABASE_URL"),
            jwt_secret,
            bind_addr: var("PDC_BIND_ADDR").unwrap_or_else(|| "0.0.0.0:8000".into()),
            pages: PageConfig {
                page_size,
                max_page_size,
                public_url,
            },
            db_max_connections: parsed("PDC_DB_MAX_CONNECTIONS", 10)?,
        })
    }
}
