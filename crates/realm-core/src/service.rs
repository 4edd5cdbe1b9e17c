//! Authoring flows on top of the feeds.
//!
//! [`RealmService`] is the explicit replacement for ambient UI state: it
//! owns the feed caches, the signer [`Session`], and handles to the event
//! and blob collaborators. Validation failures are returned before any
//! request is made. Results of successful writes are spliced into the
//! matching caches instead of triggering a refetch.

use std::sync::{Arc, Mutex, PoisonError};

use tracing::{info, warn};

use crate::blob::CachedBlobs;
use crate::error::{RealmError, Result};
use crate::events::{DbEvent, EventClient};
use crate::feed::{
    CommentFeed, FeedSynchronizer, NoteFeed, PageCache, ProfileFeed, ProposalFeed, UserNoteFeed,
};
use crate::lookup;
use crate::mapping::{
    comment_from_record, note_from_record, proposal_from_record, tag_from_record, vote_from_record,
};
use crate::models::{Comment, CommentTarget, Note, Proposal, ProposalDraft, Tag, Vote};
use crate::query::{QueryClient, Record};
use crate::summary::summarize;
use crate::tags::{parse_tag_input, sanitize_tag};

/// The connected signer, if any. Wallet handling happens elsewhere; only
/// the resulting address and token balance matter here.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Session {
    pub signer_address: Option<String>,
    pub signer_balance: Option<f64>,
}

impl Session {
    pub fn signed_in(address: impl Into<String>) -> Self {
        Self {
            signer_address: Some(address.into()),
            signer_balance: None,
        }
    }

    pub fn with_balance(mut self, balance: f64) -> Self {
        self.signer_balance = Some(balance);
        self
    }
}

/// Independent feed caches, one per view.
pub struct Feeds {
    client: Arc<dyn QueryClient>,
    page_size: usize,
    pub profiles: FeedSynchronizer<ProfileFeed>,
    pub notes: FeedSynchronizer<NoteFeed>,
    pub proposals: FeedSynchronizer<ProposalFeed>,
    user_notes: Mutex<Option<Arc<FeedSynchronizer<UserNoteFeed>>>>,
    comments: Mutex<Option<Arc<FeedSynchronizer<CommentFeed>>>>,
}

impl Feeds {
    pub fn new(client: Arc<dyn QueryClient>, page_size: usize) -> Self {
        Self {
            profiles: FeedSynchronizer::new(ProfileFeed, client.clone(), page_size),
            notes: FeedSynchronizer::new(NoteFeed, client.clone(), page_size),
            proposals: FeedSynchronizer::new(ProposalFeed, client.clone(), page_size),
            user_notes: Mutex::new(None),
            comments: Mutex::new(None),
            client,
            page_size,
        }
    }

    /// The note feed of `owner`; a different owner gets a fresh feed.
    pub fn user_notes(&self, owner: &str) -> Arc<FeedSynchronizer<UserNoteFeed>> {
        let mut slot = self.user_notes.lock().unwrap_or_else(PoisonError::into_inner);
        match slot.as_ref() {
            Some(feed) if feed.source().owner == owner => feed.clone(),
            _ => {
                let feed = Arc::new(FeedSynchronizer::new(
                    UserNoteFeed::new(owner),
                    self.client.clone(),
                    self.page_size,
                ));
                *slot = Some(feed.clone());
                feed
            }
        }
    }

    pub fn current_user_notes(&self) -> Option<Arc<FeedSynchronizer<UserNoteFeed>>> {
        self.user_notes
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// The comment feed of `target`; a different target gets a fresh feed.
    pub fn comments(&self, target: &CommentTarget) -> Arc<FeedSynchronizer<CommentFeed>> {
        let mut slot = self.comments.lock().unwrap_or_else(PoisonError::into_inner);
        match slot.as_ref() {
            Some(feed) if &feed.source().target == target => feed.clone(),
            _ => {
                let feed = Arc::new(FeedSynchronizer::new(
                    CommentFeed::new(target.clone()),
                    self.client.clone(),
                    self.page_size,
                ));
                *slot = Some(feed.clone());
                feed
            }
        }
    }

    pub fn current_comments(&self) -> Option<Arc<FeedSynchronizer<CommentFeed>>> {
        self.comments
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Apply `f` to every note cache that could show a note of `owner`.
    fn each_note_cache(&self, owner: Option<&str>, mut f: impl FnMut(&mut PageCache<Note>)) {
        self.notes.with_cache(&mut f);
        if let Some(feed) = self.current_user_notes() {
            if owner.map_or(true, |o| feed.source().owner == o) {
                feed.with_cache(&mut f);
            }
        }
    }
}

/// Per-tag results of [`RealmService::add_tags`].
#[derive(Debug, Default)]
pub struct TagReport {
    pub added: Vec<Tag>,
    pub failed: Vec<(Tag, RealmError)>,
}

pub struct RealmService {
    session: Session,
    events: Arc<dyn EventClient>,
    blobs: CachedBlobs,
    feeds: Feeds,
}

fn first_record<'a>(records: &'a [Record], what: &str) -> Result<&'a Record> {
    records
        .first()
        .ok_or_else(|| RealmError::decode(format!("{what}: remote returned no rows")))
}

fn require_id(id: &str, what: &str) -> Result<()> {
    if id.trim().is_empty() {
        return Err(RealmError::validation(format!("{what} not found")));
    }
    Ok(())
}

impl RealmService {
    pub fn new(
        session: Session,
        queries: Arc<dyn QueryClient>,
        events: Arc<dyn EventClient>,
        blobs: CachedBlobs,
        page_size: usize,
    ) -> Self {
        Self {
            session,
            events,
            blobs,
            feeds: Feeds::new(queries, page_size),
        }
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn set_session(&mut self, session: Session) {
        self.session = session;
    }

    pub fn feeds(&self) -> &Feeds {
        &self.feeds
    }

    pub fn blobs(&self) -> &CachedBlobs {
        &self.blobs
    }

    fn signer(&self) -> Result<&str> {
        self.session
            .signer_address
            .as_deref()
            .ok_or_else(|| RealmError::validation("You need to connect a wallet first."))
    }

    /// Summarize, upload, publish, and put the note at the top of the
    /// unfiltered note feeds.
    pub async fn publish_note(&self, markdown: &str) -> Result<Note> {
        if markdown.trim().is_empty() {
            return Err(RealmError::validation("Note is empty"));
        }
        let signer = self.signer()?.to_string();

        let summary = summarize(markdown);
        let hash = self.blobs.store(markdown.as_bytes()).await?;
        let records = self
            .events
            .apply_event(&DbEvent::create_note(&summary.summary, &summary.images, &hash))
            .await?;
        let note = note_from_record(first_record(&records, "createNote")?)?;
        info!(note = %note.node.id, hash = %hash, "published note");

        self.feeds.each_note_cache(Some(&signer), |cache| {
            if cache.filter().is_none() {
                cache.prepend(note.clone());
            }
        });
        Ok(note)
    }

    pub async fn update_note(&self, note_id: &str, markdown: &str) -> Result<Note> {
        require_id(note_id, "Note")?;
        if markdown.trim().is_empty() {
            return Err(RealmError::validation("Note is empty"));
        }
        self.signer()?;

        let summary = summarize(markdown);
        let hash = self.blobs.store(markdown.as_bytes()).await?;
        let records = self
            .events
            .apply_event(&DbEvent::update_note(
                note_id,
                &summary.summary,
                &summary.images,
                &hash,
            ))
            .await?;
        let note = note_from_record(first_record(&records, "updateNote")?)?;
        info!(note = %note_id, hash = %hash, "updated note");

        self.feeds.each_note_cache(None, |cache| {
            if let Some(existing) = cache.get(note_id) {
                let mut updated = note.clone();
                if updated.tags.is_empty() {
                    updated.tags = existing.tags.clone();
                }
                cache.replace(updated);
            }
        });
        Ok(note)
    }

    pub async fn delete_note(&self, note_id: &str) -> Result<()> {
        require_id(note_id, "Note")?;
        self.signer()?;
        self.events.apply_event(&DbEvent::delete_note(note_id)).await?;
        info!(note = %note_id, "deleted note");
        self.feeds.each_note_cache(None, |cache| {
            cache.remove(note_id);
        });
        Ok(())
    }

    /// Add every tag in comma-separated `input`. A failing tag does not stop
    /// the others.
    pub async fn add_tags(&self, note_id: &str, input: &str) -> Result<TagReport> {
        require_id(note_id, "Note")?;
        let tags = parse_tag_input(input);
        if tags.is_empty() {
            return Err(RealmError::validation("No tags given"));
        }
        self.signer()?;

        let mut report = TagReport::default();
        for tag in tags {
            match self.events.apply_event(&DbEvent::add_tag(note_id, &tag)).await {
                Ok(records) => {
                    let added = records
                        .first()
                        .and_then(|r| tag_from_record(r).ok())
                        .unwrap_or_else(|| tag.clone());
                    report.added.push(added);
                }
                Err(err) => {
                    warn!(note = %note_id, tag = %tag.name, error = %err, "failed to add tag");
                    report.failed.push((tag, err));
                }
            }
        }

        let added = report.added.clone();
        self.feeds.each_note_cache(None, |cache| {
            if let Some(note) = cache.get(note_id) {
                let mut note = note.clone();
                for tag in &added {
                    if !note.tags.iter().any(|t| t.sanitized == tag.sanitized) {
                        note.tags.push(tag.clone());
                    }
                }
                cache.replace(note);
            }
        });
        Ok(report)
    }

    pub async fn remove_tag(&self, note_id: &str, tag_name: &str) -> Result<()> {
        require_id(note_id, "Note")?;
        let key = sanitize_tag(tag_name);
        if key.is_empty() {
            return Err(RealmError::validation("Tag is empty"));
        }
        self.signer()?;
        self.events
            .apply_event(&DbEvent::remove_tag(note_id, tag_name))
            .await?;

        self.feeds.each_note_cache(None, |cache| {
            if let Some(note) = cache.get(note_id) {
                let mut note = note.clone();
                note.tags.retain(|t| t.sanitized != key);
                cache.replace(note);
            }
        });
        Ok(())
    }

    pub async fn post_comment(&self, target: &CommentTarget, markdown: &str) -> Result<Comment> {
        require_id(target.id(), target.label())?;
        if markdown.trim().is_empty() {
            return Err(RealmError::validation("Comment is empty"));
        }
        self.signer()?;

        let records = self
            .events
            .apply_event(&DbEvent::comment(target, markdown))
            .await?;
        let comment = comment_from_record(first_record(&records, "comment")?)?;
        info!(comment = %comment.node.id, target = %target.id(), "posted comment");

        if let Some(feed) = self.feeds.current_comments() {
            if &feed.source().target == target {
                feed.with_cache(|cache| cache.append(comment.clone()));
            }
        }
        Ok(comment)
    }

    /// Publish a proposal if the signer's balance meets the label's write gate.
    pub async fn publish_proposal(&self, draft: &ProposalDraft) -> Result<Proposal> {
        self.signer()?;
        let balance = self
            .session
            .signer_balance
            .ok_or_else(|| RealmError::validation("You need to connect a wallet first."))?;
        if draft.title.trim().is_empty() {
            return Err(RealmError::validation("Proposal title is empty"));
        }
        if draft.choices.iter().all(|c| c.trim().is_empty()) {
            return Err(RealmError::validation("Proposal has no choices"));
        }

        let acl = self.events.label_acl("Proposal").await?;
        if let Some(min) = acl.write_min_balance {
            if balance < min {
                return Err(RealmError::validation(format!(
                    "You need at least {min} MYOBU to publish a proposal"
                )));
            }
        }

        let records = self
            .events
            .apply_event(&DbEvent::create_proposal(draft))
            .await?;
        let proposal = proposal_from_record(first_record(&records, "createProposal")?)?;
        info!(proposal = %proposal.node.id, "published proposal");
        self.feeds
            .proposals
            .with_cache(|cache| cache.prepend(proposal.clone()));
        Ok(proposal)
    }

    /// Tags in use on the notes of `owner`, or on any note.
    pub async fn tags(&self, owner: Option<&str>) -> Result<Vec<Tag>> {
        lookup::fetch_tags(self.feeds.client.as_ref(), owner).await
    }

    /// A single proposal with its choices, `None` if the id is unknown.
    pub async fn proposal(&self, proposal_id: &str) -> Result<Option<Proposal>> {
        require_id(proposal_id, "Proposal")?;
        lookup::fetch_proposal(self.feeds.client.as_ref(), proposal_id).await
    }

    /// The signer's ballots on `proposal_id`.
    pub async fn my_votes(&self, proposal_id: &str) -> Result<Vec<Vote>> {
        require_id(proposal_id, "Proposal")?;
        let signer = self.signer()?;
        lookup::fetch_votes(self.feeds.client.as_ref(), proposal_id, signer).await
    }

    pub async fn vote(&self, proposal_id: &str, choice_ids: &[String]) -> Result<Vec<Vote>> {
        require_id(proposal_id, "Proposal")?;
        if choice_ids.is_empty() {
            return Err(RealmError::validation("Pick at least one choice"));
        }
        self.signer()?;

        let records = self
            .events
            .apply_event(&DbEvent::vote(proposal_id, choice_ids))
            .await?;
        records.iter().map(vote_from_record).collect()
    }

    /// Markdown body of a note: inline if present, otherwise the blob, or a
    /// placeholder when the blob cannot be fetched.
    pub async fn load_note_markdown(&self, note: &Note) -> String {
        if let Some(markdown) = &note.markdown {
            return markdown.clone();
        }
        if note.ipfs_hash.is_empty() {
            return String::new();
        }
        self.blobs.fetch_text_or_placeholder(&note.ipfs_hash).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blob::{MemoryBlobCache, MemoryBlobStore};
    use crate::models::{LabelAcl, NodeMeta};
    use async_trait::async_trait;
    use serde_json::{json, Value};

    struct NoRows;

    #[async_trait]
    impl QueryClient for NoRows {
        async fn query(&self, _request: &crate::query::QueryRequest) -> Result<Vec<Record>> {
            Ok(Vec::new())
        }
    }

    /// Echoes events back as the rows the remote would return.
    #[derive(Default)]
    struct EchoEvents {
        applied: Mutex<Vec<DbEvent>>,
        min_balance: Option<f64>,
    }

    impl EchoEvents {
        fn names(&self) -> Vec<String> {
            self.applied
                .lock()
                .unwrap()
                .iter()
                .map(|e| e.name.clone())
                .collect()
        }
    }

    fn row(key: &str, node: Value) -> Record {
        let mut record = Record::new();
        record.insert(key.to_string(), node);
        record
    }

    #[async_trait]
    impl EventClient for EchoEvents {
        async fn apply_event(&self, event: &DbEvent) -> Result<Vec<Record>> {
            self.applied.lock().unwrap().push(event.clone());
            let args = &event.args;
            let rows = match event.name.as_str() {
                "createNote" => vec![row(
                    "note",
                    json!({ "_id": "n-new", "summary": args["summary"], "ipfsHash": args["ipfsHash"] }),
                )],
                "updateNote" => vec![row(
                    "note",
                    json!({ "_id": args["noteId"], "summary": args["summary"], "ipfsHash": args["ipfsHash"] }),
                )],
                "addTagToNote" if args["tagName"] == "bad" => {
                    return Err(RealmError::remote("tag rejected"));
                }
                "addTagToNote" => vec![row(
                    "tag",
                    json!({ "name": args["tagName"], "sanitized": args["sanitizedTagName"] }),
                )],
                "makeNoteComment" | "makeProposalComment" => vec![row(
                    "comment",
                    json!({ "_id": "c-new", "markdown": args["markdown"] }),
                )],
                "createProposal" => vec![row(
                    "proposal",
                    json!({ "_id": "p-new", "title": args["title"] }),
                )],
                "vote" => vec![row(
                    "vote",
                    json!({ "_id": "v1", "proposalId": args["proposalId"], "choiceIds": args["choiceIds"] }),
                )],
                _ => Vec::new(),
            };
            Ok(rows)
        }

        async fn label_acl(&self, _label: &str) -> Result<LabelAcl> {
            Ok(LabelAcl {
                write_min_balance: self.min_balance,
            })
        }
    }

    fn service(session: Session, events: Arc<EchoEvents>) -> RealmService {
        let blobs = CachedBlobs::new(
            Arc::new(MemoryBlobStore::new()),
            Arc::new(MemoryBlobCache::unbounded()),
        );
        RealmService::new(session, Arc::new(NoRows), events, blobs, 20)
    }

    fn note(id: &str) -> Note {
        Note {
            node: NodeMeta {
                id: id.to_string(),
                ..Default::default()
            },
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_publish_note_rejects_empty_before_any_request() {
        let events = Arc::new(EchoEvents::default());
        let svc = service(Session::signed_in("0xme"), events.clone());

        let err = svc.publish_note("   \n").await.unwrap_err();
        assert_eq!(err, RealmError::validation("Note is empty"));
        assert!(events.names().is_empty());
    }

    #[tokio::test]
    async fn test_publish_note_requires_signer() {
        let events = Arc::new(EchoEvents::default());
        let svc = service(Session::default(), events.clone());

        let err = svc.publish_note("# Hi").await.unwrap_err();
        assert!(err.is_validation());
        assert!(events.names().is_empty());
    }

    #[tokio::test]
    async fn test_publish_note_prepends_to_unfiltered_feeds() {
        let events = Arc::new(EchoEvents::default());
        let svc = service(Session::signed_in("0xme"), events.clone());
        svc.feeds().notes.with_cache(|c| c.append(note("old")));
        let mine = svc.feeds().user_notes("0xme");

        let published = svc.publish_note("# Hello\nbody").await.unwrap();
        assert_eq!(published.summary, "Hello");
        assert_eq!(events.names(), vec!["createNote"]);

        let ids: Vec<_> = svc
            .feeds()
            .notes
            .items()
            .iter()
            .map(|n| n.node.id.clone())
            .collect();
        assert_eq!(ids, vec!["n-new", "old"]);
        assert_eq!(mine.len(), 1);

        let body = svc.blobs().fetch_text(&published.ipfs_hash).await.unwrap();
        assert_eq!(body, "# Hello\nbody");
    }

    #[tokio::test]
    async fn test_publish_note_skips_tag_filtered_feed() {
        let events = Arc::new(EchoEvents::default());
        let svc = service(Session::signed_in("0xme"), events);
        svc.feeds().notes.set_filter(Some("rust"));

        svc.publish_note("untagged").await.unwrap();
        assert!(svc.feeds().notes.is_empty());
    }

    #[tokio::test]
    async fn test_add_tags_reports_partial_failure() {
        let events = Arc::new(EchoEvents::default());
        let svc = service(Session::signed_in("0xme"), events.clone());
        svc.feeds().notes.with_cache(|c| c.append(note("n1")));

        let report = svc.add_tags("n1", "Rust, bad, rust").await.unwrap();
        assert_eq!(report.added.len(), 1);
        assert_eq!(report.failed.len(), 1);
        assert_eq!(report.failed[0].0.name, "bad");
        assert_eq!(events.names(), vec!["addTagToNote", "addTagToNote"]);

        let tags = svc
            .feeds()
            .notes
            .with_cache(|c| c.get("n1").map(|n| n.tags.clone()))
            .unwrap();
        assert_eq!(tags.len(), 1);
        assert_eq!(tags[0].sanitized, "rust");

        svc.remove_tag("n1", "Rust").await.unwrap();
        let tags = svc
            .feeds()
            .notes
            .with_cache(|c| c.get("n1").map(|n| n.tags.clone()))
            .unwrap();
        assert!(tags.is_empty());
    }

    #[tokio::test]
    async fn test_add_tags_rejects_blank_input() {
        let events = Arc::new(EchoEvents::default());
        let svc = service(Session::signed_in("0xme"), events.clone());
        assert!(svc.add_tags("n1", " , ,").await.unwrap_err().is_validation());
        assert!(events.names().is_empty());
    }

    #[tokio::test]
    async fn test_note_edits_require_signer() {
        let events = Arc::new(EchoEvents::default());
        let svc = service(Session::default(), events.clone());
        svc.feeds().notes.with_cache(|c| c.append(note("n1")));
        let no_wallet = RealmError::validation("You need to connect a wallet first.");

        assert_eq!(svc.update_note("n1", "# Edit").await.unwrap_err(), no_wallet);
        assert_eq!(svc.delete_note("n1").await.unwrap_err(), no_wallet);
        assert_eq!(svc.add_tags("n1", "rust").await.unwrap_err(), no_wallet);
        assert_eq!(svc.remove_tag("n1", "rust").await.unwrap_err(), no_wallet);

        assert!(events.names().is_empty());
        assert_eq!(svc.feeds().notes.len(), 1);
    }

    #[tokio::test]
    async fn test_lookups_through_query_client() {
        let events = Arc::new(EchoEvents::default());
        let anon = service(Session::default(), events.clone());
        assert!(anon.tags(None).await.unwrap().is_empty());
        assert!(anon.proposal("p1").await.unwrap().is_none());
        assert!(anon.proposal(" ").await.unwrap_err().is_validation());
        assert!(anon.my_votes("p1").await.unwrap_err().is_validation());

        let signed = service(Session::signed_in("0xme"), events.clone());
        assert!(signed.my_votes("p1").await.unwrap().is_empty());
        assert!(events.names().is_empty());
    }

    #[tokio::test]
    async fn test_delete_note_removes_from_caches() {
        let events = Arc::new(EchoEvents::default());
        let svc = service(Session::signed_in("0xme"), events);
        svc.feeds().notes.with_cache(|c| c.append(note("n1")));
        svc.feeds()
            .user_notes("0xme")
            .with_cache(|c| c.append(note("n1")));

        svc.delete_note("n1").await.unwrap();
        assert!(svc.feeds().notes.is_empty());
        assert!(svc.feeds().user_notes("0xme").is_empty());
    }

    #[tokio::test]
    async fn test_comment_appends_to_open_thread() {
        let events = Arc::new(EchoEvents::default());
        let svc = service(Session::signed_in("0xme"), events.clone());
        let target = CommentTarget::Note("n1".into());
        let thread = svc.feeds().comments(&target);

        let err = svc.post_comment(&target, "").await.unwrap_err();
        assert_eq!(err, RealmError::validation("Comment is empty"));

        let comment = svc.post_comment(&target, "nice").await.unwrap();
        assert_eq!(comment.markdown, "nice");
        assert_eq!(thread.len(), 1);
        assert_eq!(events.names(), vec!["makeNoteComment"]);
    }

    #[tokio::test]
    async fn test_proposal_balance_gate() {
        let events = Arc::new(EchoEvents {
            min_balance: Some(100.0),
            ..Default::default()
        });
        let draft = ProposalDraft {
            title: "Burn".into(),
            description: String::new(),
            choices: vec!["Yes".into(), "No".into()],
            start_date: 0,
            end_date: 1,
        };

        let poor = service(Session::signed_in("0xme").with_balance(5.0), events.clone());
        let err = poor.publish_proposal(&draft).await.unwrap_err();
        assert_eq!(
            err,
            RealmError::validation("You need at least 100 MYOBU to publish a proposal")
        );
        assert!(events.names().is_empty());

        let rich = service(Session::signed_in("0xme").with_balance(500.0), events.clone());
        let proposal = rich.publish_proposal(&draft).await.unwrap();
        assert_eq!(proposal.title, "Burn");
        assert_eq!(rich.feeds().proposals.len(), 1);
    }

    #[tokio::test]
    async fn test_vote_needs_choices() {
        let events = Arc::new(EchoEvents::default());
        let svc = service(Session::signed_in("0xme"), events.clone());
        assert!(svc.vote("p1", &[]).await.unwrap_err().is_validation());

        let votes = svc.vote("p1", &["c1".to_string()]).await.unwrap();
        assert_eq!(votes[0].choice_ids, vec!["c1"]);
    }

    #[tokio::test]
    async fn test_note_markdown_placeholder_for_missing_blob() {
        let svc = service(Session::default(), Arc::new(EchoEvents::default()));
        let mut n = note("n1");
        n.ipfs_hash = "QmMissing".into();
        assert_eq!(
            svc.load_note_markdown(&n).await,
            "Error loading note from IPFS [QmMissing](https://ipfs.io/ipfs/QmMissing)"
        );

        n.markdown = Some("inline".into());
        assert_eq!(svc.load_note_markdown(&n).await, "inline");
    }
}
