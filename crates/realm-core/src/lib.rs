//! # Realm Core
//!
//! Shared, WASM-safe logic for Realm: entity models, record adapters,
//! paginated feed caches, the markdown summarizer, tag and color helpers,
//! content-addressed blob caching, and the authoring service.
//!
//! This crate contains no tokio, sqlx, HTTP, or filesystem I/O. Remote
//! access goes through the [`query::QueryClient`], [`events::EventClient`]
//! and [`blob::BlobStore`] traits; the `realm` crate provides the native
//! implementations.

pub mod blob;
pub mod color;
pub mod error;
pub mod events;
pub mod feed;
pub mod lookup;
pub mod mapping;
pub mod models;
pub mod query;
pub mod service;
pub mod summary;
pub mod tags;

pub use error::{RealmError, Result};
