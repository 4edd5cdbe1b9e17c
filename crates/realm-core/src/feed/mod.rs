//! Paginated, deduplicated feed caches.
//!
//! [`PageCache`] is the synchronous state machine behind every feed:
//!
//! ```text
//!            begin_load / request_more            complete(ok | err)
//!   Idle ──────────────────────────────▶ Loading ───────────────────▶ Idle
//!     ▲                                     │
//!     └──────────── reset(filter) ──────────┘  (bumps generation; the
//!                                              in-flight ticket is stale)
//! ```
//!
//! Every load is described by a [`PageTicket`] carrying the cache
//! generation it was issued under. A response is merged only if its ticket
//! still matches the current generation, so a page fetched for an old
//! filter can never leak into the list for a new one.
//!
//! [`FeedSynchronizer`] drives a `PageCache` against a remote
//! [`QueryClient`](crate::query::QueryClient) using a [`FeedSource`] that
//! knows how to build the request and map the rows.

pub mod sources;
pub mod sync;

use std::collections::HashSet;

use tracing::{debug, warn};

use crate::error::RealmError;
use crate::models::FeedItem;

pub use sources::{CommentFeed, FeedSource, NoteFeed, ProfileFeed, ProposalFeed, UserNoteFeed};
pub use sync::{FeedSynchronizer, LoadOutcome};

/// Page size used by the feeds when none is configured.
pub const DEFAULT_PAGE_SIZE: usize = 20;

/// Identifies one issued page load.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageTicket {
    pub generation: u64,
    pub page: usize,
    pub filter: Option<String>,
    pub skip: usize,
    pub limit: usize,
}

/// What came back for a ticket.
#[derive(Debug, Clone)]
pub struct PageBatch<T> {
    /// Rows the remote returned, before any were dropped as undecodable.
    pub returned: usize,
    pub items: Vec<T>,
}

impl<T> PageBatch<T> {
    pub fn new(items: Vec<T>) -> Self {
        Self {
            returned: items.len(),
            items,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum MergeOutcome {
    Merged { added: usize, has_more: bool },
    Failed(RealmError),
    /// The ticket was issued before the last reset; nothing changed.
    Discarded,
}

#[derive(Debug, Clone)]
pub struct PageCache<T> {
    items: Vec<T>,
    page: usize,
    page_size: usize,
    has_more: bool,
    is_loading: bool,
    filter: Option<String>,
    generation: u64,
    /// Page that still has to be fetched: `Some(0)` on a fresh cache, the
    /// failed page after an error, `None` once the current page merged.
    pending: Option<usize>,
}

impl<T: FeedItem> PageCache<T> {
    /// A `page_size` of 0 is treated as 1.
    pub fn new(page_size: usize) -> Self {
        Self {
            items: Vec::new(),
            page: 0,
            page_size: page_size.max(1),
            has_more: true,
            is_loading: false,
            filter: None,
            generation: 0,
            pending: Some(0),
        }
    }

    pub fn with_filter(page_size: usize, filter: Option<String>) -> Self {
        let mut cache = Self::new(page_size);
        cache.filter = filter;
        cache
    }

    pub fn items(&self) -> &[T] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn page(&self) -> usize {
        self.page
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    pub fn has_more(&self) -> bool {
        self.has_more
    }

    pub fn is_loading(&self) -> bool {
        self.is_loading
    }

    pub fn filter(&self) -> Option<&str> {
        self.filter.as_deref()
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// True until the first page (or a failed page) has been merged.
    pub fn needs_load(&self) -> bool {
        self.pending.is_some() && !self.is_loading
    }

    /// Drop everything and start over under `filter`.
    ///
    /// Any ticket issued before this call becomes stale.
    pub fn reset(&mut self, filter: Option<String>) {
        self.items.clear();
        self.page = 0;
        self.has_more = true;
        self.is_loading = false;
        self.filter = filter;
        self.generation += 1;
        self.pending = Some(0);
    }

    /// Reset only if `filter` differs from the current one.
    pub fn sync_filter(&mut self, filter: Option<&str>) -> bool {
        if self.filter.as_deref() == filter {
            return false;
        }
        self.reset(filter.map(str::to_string));
        true
    }

    /// Issue a load for the current page. `None` while a load is in flight.
    pub fn begin_load(&mut self) -> Option<PageTicket> {
        if self.is_loading {
            return None;
        }
        self.is_loading = true;
        let ticket = PageTicket {
            generation: self.generation,
            page: self.page,
            filter: self.filter.clone(),
            skip: self.page * self.page_size,
            limit: self.page_size,
        };
        debug!(page = ticket.page, skip = ticket.skip, limit = ticket.limit, "issuing page load");
        Some(ticket)
    }

    /// Advance to the next page and issue its load.
    ///
    /// No-op while loading or once the feed is exhausted. A page whose
    /// previous load failed is retried instead of skipped.
    pub fn request_more(&mut self) -> Option<PageTicket> {
        if !self.has_more || self.is_loading {
            return None;
        }
        self.page = match self.pending {
            Some(page) => page,
            None => self.page + 1,
        };
        self.begin_load()
    }

    /// Merge the result of `ticket`'s load.
    pub fn complete(
        &mut self,
        ticket: &PageTicket,
        result: Result<PageBatch<T>, RealmError>,
    ) -> MergeOutcome {
        if ticket.generation != self.generation {
            debug!(
                page = ticket.page,
                filter = ?ticket.filter,
                "discarding superseded page"
            );
            return MergeOutcome::Discarded;
        }
        self.is_loading = false;

        match result {
            Ok(batch) => {
                self.has_more = batch.returned == ticket.limit;
                self.pending = None;
                let added = self.merge(batch.items);
                debug!(page = ticket.page, added, has_more = self.has_more, "merged page");
                MergeOutcome::Merged {
                    added,
                    has_more: self.has_more,
                }
            }
            Err(err) => {
                warn!(page = ticket.page, error = %err, "page load failed");
                self.pending = Some(ticket.page);
                MergeOutcome::Failed(err)
            }
        }
    }

    /// Append items whose id is not yet present. First seen wins.
    fn merge(&mut self, batch: Vec<T>) -> usize {
        let mut seen: HashSet<String> = self
            .items
            .iter()
            .map(|i| i.item_id().to_string())
            .collect();
        let before = self.items.len();
        for item in batch {
            if seen.insert(item.item_id().to_string()) {
                self.items.push(item);
            }
        }
        self.items.len() - before
    }

    fn position(&self, id: &str) -> Option<usize> {
        self.items.iter().position(|i| i.item_id() == id)
    }

    /// Put a freshly created item first. Returns false if its id is present.
    pub fn prepend(&mut self, item: T) -> bool {
        if self.position(item.item_id()).is_some() {
            return false;
        }
        self.items.insert(0, item);
        true
    }

    /// Put a freshly created item last. Returns false if its id is present.
    pub fn append(&mut self, item: T) -> bool {
        if self.position(item.item_id()).is_some() {
            return false;
        }
        self.items.push(item);
        true
    }

    /// Swap in an updated item at its current position.
    pub fn replace(&mut self, item: T) -> bool {
        match self.position(item.item_id()) {
            Some(idx) => {
                self.items[idx] = item;
                true
            }
            None => false,
        }
    }

    pub fn remove(&mut self, id: &str) -> Option<T> {
        self.position(id).map(|idx| self.items.remove(idx))
    }

    pub fn get(&self, id: &str) -> Option<&T> {
        self.items.iter().find(|i| i.item_id() == id)
    }
}
