//! External service clients

pub mod catalog;

pub use catalog::{CatalogError, CatalogLookup, HttpCatalog, ProductQuote};
