//! Catalog persistence.
//!
//! - PostgreSQL-backed [`Catalog`](lookalike_core::Catalog) for production
//! - Embedded migrations creating the `catalog_entries` table
//!
//! Without a `DATABASE_URL` the server falls back to
//! [`MemoryCatalog`](lookalike_core::MemoryCatalog).

pub mod error;
pub mod postgres;

pub use error::CatalogStoreError;
pub use postgres::PostgresCatalog;
