//! One-shot reads that are not paginated feeds: the tags in use, a single
//! proposal with its choices, and a voter's ballots on a proposal.

use crate::error::Result;
use crate::feed::sources::TAGGED_WITH;
use crate::mapping::{proposal_from_record, tag_from_record, vote_from_record};
use crate::models::{Proposal, Tag, Vote};
use crate::query::{NodePattern, Pattern, QueryClient, QueryRequest};

/// Tags attached to any note, or only to notes of `owner`.
pub fn tags_request(owner: Option<&str>) -> QueryRequest {
    let mut note = NodePattern::new("note").label("Note");
    if let Some(owner) = owner {
        note = note.prop("_owner", owner.to_string());
    }
    QueryRequest::new()
        .matching(note)
        .matching(Pattern::relation(
            "tagged",
            TAGGED_WITH,
            NodePattern::new("note"),
            NodePattern::new("tag").label("Tag"),
        ))
        .returning("tag")
}

pub fn proposal_request(proposal_id: &str) -> QueryRequest {
    QueryRequest::new()
        .matching(
            NodePattern::new("proposal")
                .label("Proposal")
                .prop("_id", proposal_id.to_string()),
        )
        .matching(NodePattern::new("author").label("MNS"))
        .matching(Pattern::relation(
            "r",
            "HAS_CHOICE",
            NodePattern::new("proposal"),
            NodePattern::new("choice").label("Choice"),
        ))
        .same_as("author._owner", "proposal._owner")
        .returning("proposal")
        .collecting_as("choice", "choices")
        .returning_author("author")
}

pub fn votes_request(proposal_id: &str, voter: &str) -> QueryRequest {
    QueryRequest::new()
        .matching(
            NodePattern::new("vote")
                .label("Vote")
                .prop("proposalId", proposal_id.to_string())
                .prop("_owner", voter.to_string()),
        )
        .returning("vote")
}

/// Distinct tags by sanitized key, first spelling wins. Rows that do not
/// decode are skipped.
pub async fn fetch_tags(client: &dyn QueryClient, owner: Option<&str>) -> Result<Vec<Tag>> {
    let records = client.query(&tags_request(owner)).await?;
    let mut tags: Vec<Tag> = Vec::new();
    for tag in records.iter().filter_map(|r| tag_from_record(r).ok()) {
        if !tag.sanitized.is_empty() && !tags.iter().any(|t| t.sanitized == tag.sanitized) {
            tags.push(tag);
        }
    }
    Ok(tags)
}

/// `None` when no proposal has that id.
pub async fn fetch_proposal(
    client: &dyn QueryClient,
    proposal_id: &str,
) -> Result<Option<Proposal>> {
    let records = client.query(&proposal_request(proposal_id)).await?;
    records.first().map(proposal_from_record).transpose()
}

pub async fn fetch_votes(
    client: &dyn QueryClient,
    proposal_id: &str,
    voter: &str,
) -> Result<Vec<Vote>> {
    let records = client.query(&votes_request(proposal_id, voter)).await?;
    records.iter().map(vote_from_record).collect()
}
