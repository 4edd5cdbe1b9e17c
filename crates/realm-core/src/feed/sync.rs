//! Async driver tying a [`PageCache`] to a remote [`QueryClient`].
//!
//! The cache sits behind a `std::sync::Mutex` that is only held between
//! suspension points, never across a fetch. Two overlapping calls to
//! [`FeedSynchronizer::load_more`] therefore race for the same `is_loading`
//! flag and exactly one of them issues a request.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tracing::warn;

use super::{FeedSource, MergeOutcome, PageBatch, PageCache, PageTicket};
use crate::error::RealmError;
use crate::query::{QueryClient, Record};

#[derive(Debug, Clone, PartialEq)]
pub enum LoadOutcome {
    /// Nothing issued: a load was already in flight or the feed is exhausted.
    Skipped,
    Merged { added: usize, has_more: bool },
    /// The filter changed while the request was in flight.
    Discarded,
    /// The remote failed; the cache is unchanged and the page can be retried.
    Failed(RealmError),
}

impl From<MergeOutcome> for LoadOutcome {
    fn from(outcome: MergeOutcome) -> Self {
        match outcome {
            MergeOutcome::Merged { added, has_more } => LoadOutcome::Merged { added, has_more },
            MergeOutcome::Failed(err) => LoadOutcome::Failed(err),
            MergeOutcome::Discarded => LoadOutcome::Discarded,
        }
    }
}

pub struct FeedSynchronizer<F: FeedSource> {
    source: F,
    client: Arc<dyn QueryClient>,
    cache: Mutex<PageCache<F::Item>>,
}

impl<F: FeedSource> FeedSynchronizer<F> {
    pub fn new(source: F, client: Arc<dyn QueryClient>, page_size: usize) -> Self {
        Self {
            source,
            client,
            cache: Mutex::new(PageCache::new(page_size)),
        }
    }

    pub fn source(&self) -> &F {
        &self.source
    }

    fn lock(&self) -> MutexGuard<'_, PageCache<F::Item>> {
        self.cache.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Clear the feed and key it by `filter`.
    pub fn reset(&self, filter: Option<String>) {
        self.lock().reset(filter);
    }

    /// Reset if `filter` differs from the current one. Returns whether it did.
    pub fn set_filter(&self, filter: Option<&str>) -> bool {
        self.lock().sync_filter(filter)
    }

    /// Called when the owning view becomes active: adopt `filter` and fetch
    /// the first page if nothing has been loaded under it yet.
    pub async fn activate(&self, filter: Option<&str>) -> LoadOutcome {
        let ticket = {
            let mut cache = self.lock();
            cache.sync_filter(filter);
            if cache.needs_load() {
                cache.begin_load()
            } else {
                None
            }
        };
        match ticket {
            Some(ticket) => self.run(ticket).await,
            None => LoadOutcome::Skipped,
        }
    }

    /// Fetch the current page.
    pub async fn load_page(&self) -> LoadOutcome {
        let ticket = self.lock().begin_load();
        match ticket {
            Some(ticket) => self.run(ticket).await,
            None => LoadOutcome::Skipped,
        }
    }

    /// Advance one page and fetch it. No-op while loading or exhausted.
    pub async fn load_more(&self) -> LoadOutcome {
        let ticket = self.lock().request_more();
        match ticket {
            Some(ticket) => self.run(ticket).await,
            None => LoadOutcome::Skipped,
        }
    }

    async fn run(&self, ticket: PageTicket) -> LoadOutcome {
        let request =
            self.source
                .build_request(ticket.filter.as_deref(), ticket.skip, ticket.limit);
        let result = self
            .client
            .query(&request)
            .await
            .map(|records| self.decode(&records));
        let outcome = self.lock().complete(&ticket, result);
        outcome.into()
    }

    /// Rows that do not decode are dropped but still count toward the page
    /// fill, so `has_more` reflects what the remote returned.
    fn decode(&self, records: &[Record]) -> PageBatch<F::Item> {
        let items = records
            .iter()
            .filter_map(|record| match self.source.map_record(record) {
                Ok(item) => Some(item),
                Err(err) => {
                    warn!(feed = self.source.name(), error = %err, "skipping undecodable row");
                    None
                }
            })
            .collect();
        PageBatch {
            returned: records.len(),
            items,
        }
    }

    pub fn items(&self) -> Vec<F::Item> {
        self.lock().items().to_vec()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    pub fn has_more(&self) -> bool {
        self.lock().has_more()
    }

    pub fn is_loading(&self) -> bool {
        self.lock().is_loading()
    }

    pub fn page(&self) -> usize {
        self.lock().page()
    }

    pub fn filter(&self) -> Option<String> {
        self.lock().filter().map(str::to_string)
    }

    /// Run `f` against the cache, e.g. to splice in a mutation result.
    pub fn with_cache<R>(&self, f: impl FnOnce(&mut PageCache<F::Item>) -> R) -> R {
        f(&mut self.lock())
    }
}
