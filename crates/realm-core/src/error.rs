//! Error taxonomy shared by every Realm component.
//!
//! Three kinds matter to callers:
//!
//! - [`RealmError::RemoteQuery`]: a page fetch or event failed remotely.
//!   Feed loads swallow it (logged) and leave the cache unchanged.
//! - [`RealmError::ContentFetch`]: the blob store could not produce content.
//!   Readers convert it into placeholder text.
//! - [`RealmError::Validation`]: the caller asked for something impossible.
//!   Raised before any network call is attempted.

use std::fmt;

use thiserror::Error;

/// Why a content-addressed fetch failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchErrorKind {
    NotFound,
    Timeout,
    Unavailable,
}

impl fmt::Display for FetchErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FetchErrorKind::NotFound => write!(f, "not found"),
            FetchErrorKind::Timeout => write!(f, "timed out"),
            FetchErrorKind::Unavailable => write!(f, "unavailable"),
        }
    }
}

#[derive(Debug, Clone, Error, PartialEq)]
pub enum RealmError {
    #[error("remote query failed: {0}")]
    RemoteQuery(String),

    #[error("content {hash} {kind}")]
    ContentFetch { hash: String, kind: FetchErrorKind },

    #[error("{0}")]
    Validation(String),

    #[error("unexpected record shape: {0}")]
    Decode(String),

    #[error("blob cache: {0}")]
    Cache(String),
}

impl RealmError {
    pub fn remote(msg: impl Into<String>) -> Self {
        RealmError::RemoteQuery(msg.into())
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        RealmError::Validation(msg.into())
    }

    pub fn decode(msg: impl Into<String>) -> Self {
        RealmError::Decode(msg.into())
    }

    pub fn cache(msg: impl Into<String>) -> Self {
        RealmError::Cache(msg.into())
    }

    pub fn content(hash: impl Into<String>, kind: FetchErrorKind) -> Self {
        RealmError::ContentFetch {
            hash: hash.into(),
            kind,
        }
    }

    /// True for errors raised before anything left the process.
    pub fn is_validation(&self) -> bool {
        matches!(self, RealmError::Validation(_))
    }
}

pub type Result<T> = std::result::Result<T, RealmError>;
