//! pdc_server: REST server for the Product Definition Center catalog.

pub mod config;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod pagination;
pub mod router;
