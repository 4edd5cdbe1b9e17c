//! `realm feed`: page through a remote feed and print items as JSON lines.
//! `realm tags` and `realm proposal` run the one-shot lookups the same way.

use std::sync::Arc;

use anyhow::{bail, Result};
use clap::ValueEnum;
use serde::Serialize;
use tracing::info;

use realm_core::feed::{
    FeedSource, FeedSynchronizer, LoadOutcome, NoteFeed, ProfileFeed, ProposalFeed, UserNoteFeed,
};
use realm_core::lookup::{fetch_proposal, fetch_tags, fetch_votes};
use realm_core::query::QueryClient;

use crate::config::Config;
use crate::remote::HttpQueryClient;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum FeedKind {
    Profiles,
    Notes,
    UserNotes,
    Proposals,
}

pub async fn run_feed(
    config: &Config,
    kind: FeedKind,
    tag: Option<String>,
    owner: Option<String>,
    pages: usize,
) -> Result<()> {
    let client: Arc<dyn QueryClient> = Arc::new(HttpQueryClient::new(&config.server)?);
    let page_size = config.feeds.page_size;
    let tag = tag.as_deref();

    match kind {
        FeedKind::Profiles => {
            drain(FeedSynchronizer::new(ProfileFeed, client, page_size), None, pages).await
        }
        FeedKind::Notes => {
            drain(FeedSynchronizer::new(NoteFeed, client, page_size), tag, pages).await
        }
        FeedKind::UserNotes => {
            let Some(owner) = owner else {
                bail!("user-notes needs --owner <address>");
            };
            let feed = FeedSynchronizer::new(UserNoteFeed::new(owner), client, page_size);
            drain(feed, tag, pages).await
        }
        FeedKind::Proposals => {
            drain(FeedSynchronizer::new(ProposalFeed, client, page_size), None, pages).await
        }
    }
}

/// Load up to `pages` pages, stopping early when the feed is exhausted.
async fn drain<F>(feed: FeedSynchronizer<F>, filter: Option<&str>, pages: usize) -> Result<()>
where
    F: FeedSource,
    F::Item: Serialize,
{
    let mut outcome = feed.activate(filter).await;
    for _ in 1..pages {
        if !feed.has_more() {
            break;
        }
        if let LoadOutcome::Failed(_) = outcome {
            break;
        }
        outcome = feed.load_more().await;
    }
    if let LoadOutcome::Failed(err) = outcome {
        bail!("{} feed: {}", feed.source().name(), err);
    }

    let items = feed.items();
    info!(feed = feed.source().name(), items = items.len(), pages = feed.page() + 1, "loaded feed");
    for item in &items {
        println!("{}", serde_json::to_string(item)?);
    }
    Ok(())
}

pub async fn run_tags(config: &Config, owner: Option<String>) -> Result<()> {
    let client = HttpQueryClient::new(&config.server)?;
    for tag in fetch_tags(&client, owner.as_deref()).await? {
        println!("{}", serde_json::to_string(&tag)?);
    }
    Ok(())
}

/// Print the proposal, then the ballots of `voter` if one is given.
pub async fn run_proposal(config: &Config, id: &str, voter: Option<String>) -> Result<()> {
    let client = HttpQueryClient::new(&config.server)?;
    let Some(proposal) = fetch_proposal(&client, id).await? else {
        bail!("Proposal {id} not found");
    };
    println!("{}", serde_json::to_string(&proposal)?);
    if let Some(voter) = voter {
        for vote in fetch_votes(&client, id, &voter).await? {
            println!("{}", serde_json::to_string(&vote)?);
        }
    }
    Ok(())
}
