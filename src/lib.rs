//! # Realm
//!
//! Native client for Realm: markdown notes stored in a content-addressed
//! blob store, tagged, commented on, and listed through paginated feeds
//! queried from a remote graph database.
//!
//! The WASM-safe logic (feeds, summarizer, record adapters, authoring
//! service) lives in [`realm_core`]. This crate adds what needs a native
//! runtime.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────┐   ┌──────────────────┐   ┌──────────────┐
//! │  realm CLI   │──▶│    realm-core    │──▶│ HttpQuery /  │──▶ protocol server
//! │   (clap)     │   │ feeds + service  │   │ HttpEvent    │
//! └──────────────┘   └────────┬─────────┘   └──────────────┘
//!                             │
//!                             ▼
//!                    ┌──────────────────┐   ┌──────────────┐
//!                    │ SqliteBlobCache  │──▶│ HttpBlobStore│──▶ IPFS API
//!                    └──────────────────┘   └──────────────┘
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`logging`] | `tracing` subscriber setup |
//! | [`db`] | SQLite connection |
//! | [`migrate`] | Cache schema |
//! | [`blob_cache`] | Persistent LRU blob cache |
//! | [`remote`] | Query and event HTTP clients |
//! | [`ipfs`] | Blob store HTTP client |
//! | [`inspect`] | `summarize`, `tag`, `color` commands |
//! | [`feed`] | `feed` command |
//! | [`notes`] | `cat` and `publish` commands |

pub mod blob_cache;
pub mod config;
pub mod db;
pub mod feed;
pub mod inspect;
pub mod ipfs;
pub mod logging;
pub mod migrate;
pub mod notes;
pub mod remote;
