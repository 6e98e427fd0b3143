//! Itemlist - a small CRUD HTTP API for an item catalog
//!
//! Items (name, category, maker, date, condition, image, keywords,
//! description, location) live in a document store and are exposed over a
//! JSON API rooted at `/items`:
//! - `types`: the item schema and its wire projection
//! - `storage`: keyed blob backends (local filesystem, in-memory)
//! - `catalog`: the item store built on top of a storage backend
//! - `api`: axum routes mapping store outcomes to HTTP responses

pub mod api;
pub mod catalog;
pub mod config;
pub mod error;
pub mod storage;
pub mod types;

pub use error::{Error, Result};
