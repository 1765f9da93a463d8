//! Indexing and query middleware for a document search engine cluster.
//!
//! The broker owns index lifecycle (timestamped concrete indices behind
//! group aliases, locked migrations, bulk population), a typed field
//! schema, cached reference registries, and the full read pipeline from
//! raw query parameters to a presented response body.

pub mod client;
pub mod config;
pub mod error;
pub mod index;
pub mod registry;
pub mod schema;
pub mod search;

pub use error::{AppError, Result};
