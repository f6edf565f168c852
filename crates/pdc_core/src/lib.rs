//! pdc_core: Product Definition Center catalog domain.
//!
//! Pure domain types, lookups, request validation, change auditing and the
//! storage port traits. Backends live in `pdc_postgres` (production) and
//! [`memory::MemoryStore`] (tests, database-less runs).

pub mod changes;
pub mod error;
pub mod filter;
pub mod lookups;
pub mod memory;
pub mod page;
pub mod ports;
pub mod principal;
mod releases;
pub mod repo_clone;
mod repos;
pub mod seeds;
pub mod service;
pub mod types;
pub mod validate;
pub mod variants;

pub use error::{FieldErrors, PdcError};
pub use service::{CatalogService, CatalogServiceImpl, WriteContext};
