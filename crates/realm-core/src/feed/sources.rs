//! Concrete feeds: which query to issue and how to read its rows.

use crate::error::Result;
use crate::mapping::{comment_from_record, note_from_record, profile_from_record, proposal_from_record};
use crate::models::{Comment, CommentTarget, FeedItem, Note, Profile, Proposal};
use crate::query::{NodePattern, Order, Pattern, QueryRequest, Record};
use crate::tags::sanitize_tag;

/// Relation between a note and one of its tags.
pub const TAGGED_WITH: &str = "TAGGED_WITH";

/// Builds page requests for one feed and maps the returned rows.
///
/// `filter` is whatever the feed is keyed by (a tag name for note feeds);
/// feeds without a filter ignore it.
pub trait FeedSource: Send + Sync {
    type Item: FeedItem + Clone + Send + Sync;

    /// Short name used in logs.
    fn name(&self) -> &str;

    fn build_request(&self, filter: Option<&str>, skip: usize, limit: usize) -> QueryRequest;

    fn map_record(&self, record: &Record) -> Result<Self::Item>;
}

/// All name-service profiles, newest first.
#[derive(Debug, Clone, Default)]
pub struct ProfileFeed;

impl FeedSource for ProfileFeed {
    type Item = Profile;

    fn name(&self) -> &str {
        "profiles"
    }

    fn build_request(&self, _filter: Option<&str>, skip: usize, limit: usize) -> QueryRequest {
        QueryRequest::new()
            .matching(NodePattern::new("profile").label("MNS"))
            .order("profile._createdAt", Order::Desc)
            .page(skip, limit)
            .returning("profile")
    }

    fn map_record(&self, record: &Record) -> Result<Profile> {
        profile_from_record(record)
    }
}

/// Base note query shared by [`NoteFeed`] and [`UserNoteFeed`].
fn note_request(
    note: NodePattern,
    tag: Option<&str>,
    skip: usize,
    limit: usize,
) -> QueryRequest {
    let mut req = QueryRequest::new()
        .matching(note)
        .matching(NodePattern::new("author").label("MNS"));
    if let Some(tag) = tag.map(sanitize_tag).filter(|t| !t.is_empty()) {
        req = req.matching(Pattern::relation(
            "tagged",
            TAGGED_WITH,
            NodePattern::new("note"),
            NodePattern::new("tag").label("Tag").prop("sanitized", tag),
        ));
    }
    req.matching(note_tags_pattern())
        .same_as("author._owner", "note._owner")
        .order("note._createdAt", Order::Desc)
        .page(skip, limit)
        .returning("note")
        .returning_author("author")
        .collecting_as("noteTag", "tags")
}

/// Every tag of the matched note, collected under `tags`. Optional so
/// untagged notes are not dropped.
fn note_tags_pattern() -> Pattern {
    Pattern::optional_relation(
        "noteTags",
        TAGGED_WITH,
        NodePattern::new("note"),
        NodePattern::new("noteTag").label("Tag"),
    )
}

/// Every note, optionally restricted to a tag.
#[derive(Debug, Clone, Default)]
pub struct NoteFeed;

impl FeedSource for NoteFeed {
    type Item = Note;

    fn name(&self) -> &str {
        "notes"
    }

    fn build_request(&self, filter: Option<&str>, skip: usize, limit: usize) -> QueryRequest {
        note_request(NodePattern::new("note").label("Note"), filter, skip, limit)
    }

    fn map_record(&self, record: &Record) -> Result<Note> {
        note_from_record(record)
    }
}

/// Notes owned by one address, optionally restricted to a tag.
#[derive(Debug, Clone)]
pub struct UserNoteFeed {
    pub owner: String,
}

impl UserNoteFeed {
    pub fn new(owner: impl Into<String>) -> Self {
        Self {
            owner: owner.into(),
        }
    }
}

impl FeedSource for UserNoteFeed {
    type Item = Note;

    fn name(&self) -> &str {
        "user-notes"
    }

    fn build_request(&self, filter: Option<&str>, skip: usize, limit: usize) -> QueryRequest {
        let note = NodePattern::new("note")
            .label("Note")
            .prop("_owner", self.owner.clone());
        note_request(note, filter, skip, limit)
    }

    fn map_record(&self, record: &Record) -> Result<Note> {
        note_from_record(record)
    }
}

/// Governance proposals with their choices, newest first.
#[derive(Debug, Clone, Default)]
pub struct ProposalFeed;

impl FeedSource for ProposalFeed {
    type Item = Proposal;

    fn name(&self) -> &str {
        "proposals"
    }

    fn build_request(&self, _filter: Option<&str>, skip: usize, limit: usize) -> QueryRequest {
        QueryRequest::new()
            .matching(Pattern::relation(
                "r",
                "PROPOSED",
                NodePattern::new("author").label("MNS"),
                NodePattern::new("proposal").label("Proposal"),
            ))
            .matching(Pattern::relation(
                "r2",
                "HAS_CHOICE",
                NodePattern::new("proposal"),
                NodePattern::new("choice").label("Choice"),
            ))
            .same_as("author._owner", "proposal._owner")
            .order("proposal._createdAt", Order::Desc)
            .page(skip, limit)
            .returning("proposal")
            .collecting_as("choice", "choices")
            .returning_author("author")
    }

    fn map_record(&self, record: &Record) -> Result<Proposal> {
        proposal_from_record(record)
    }
}

/// Comments on one note or proposal, oldest first.
#[derive(Debug, Clone)]
pub struct CommentFeed {
    pub target: CommentTarget,
}

impl CommentFeed {
    pub fn new(target: CommentTarget) -> Self {
        Self { target }
    }
}

impl FeedSource for CommentFeed {
    type Item = Comment;

    fn name(&self) -> &str {
        "comments"
    }

    fn build_request(&self, _filter: Option<&str>, skip: usize, limit: usize) -> QueryRequest {
        QueryRequest::new()
            .matching(Pattern::relation(
                "r1",
                "POSTED",
                NodePattern::new("author"),
                NodePattern::new("comment"),
            ))
            .matching(Pattern::relation(
                "r2",
                "COMMENTED_ON",
                NodePattern::new("comment"),
                NodePattern::new("target")
                    .label(self.target.label())
                    .prop("_id", self.target.id().to_string()),
            ))
            .order("comment._createdAt", Order::Asc)
            .page(skip, limit)
            .returning("comment")
            .returning_author("author")
    }

    fn map_record(&self, record: &Record) -> Result<Comment> {
        comment_from_record(record)
    }
}
