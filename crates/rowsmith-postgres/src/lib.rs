//! PostgreSQL adapter: catalog introspection and batched row inserts.

pub mod options;
pub mod postgres;

pub use options::PoolSettings;
pub use postgres::{PostgresAdapter, connect, connect_options, quote_ident};
