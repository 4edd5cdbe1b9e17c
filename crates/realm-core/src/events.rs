//! Mutation events sent to the remote.
//!
//! Every write is a named event in the `Realm` namespace with a JSON
//! argument object. The remote signs and applies it and answers with the
//! affected rows, author fields included, in the same alias-keyed shape
//! queries return.

use async_trait::async_trait;
use serde::Serialize;
use serde_json::{json, Value};

use crate::error::Result;
use crate::models::{CommentTarget, LabelAcl, ProposalDraft, Tag};
use crate::query::Record;

pub const NAMESPACE: &str = "Realm";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DbEvent {
    pub namespace: String,
    pub name: String,
    pub args: Value,
}

impl DbEvent {
    pub fn new(name: &str, args: Value) -> Self {
        Self {
            namespace: NAMESPACE.to_string(),
            name: name.to_string(),
            args,
        }
    }

    pub fn create_note(summary: &str, images: &[String], ipfs_hash: &str) -> Self {
        Self::new(
            "createNote",
            json!({
                "summary": summary,
                "images": images,
                "ipfsHash": ipfs_hash,
                "arweaveId": "",
            }),
        )
    }

    pub fn update_note(note_id: &str, summary: &str, images: &[String], ipfs_hash: &str) -> Self {
        Self::new(
            "updateNote",
            json!({
                "noteId": note_id,
                "summary": summary,
                "images": images,
                "ipfsHash": ipfs_hash,
            }),
        )
    }

    pub fn delete_note(note_id: &str) -> Self {
        Self::new("deleteNote", json!({ "noteId": note_id }))
    }

    pub fn add_tag(note_id: &str, tag: &Tag) -> Self {
        Self::new(
            "addTagToNote",
            json!({
                "noteId": note_id,
                "tagName": tag.name,
                "sanitizedTagName": tag.sanitized,
            }),
        )
    }

    pub fn remove_tag(note_id: &str, tag_name: &str) -> Self {
        Self::new(
            "deleteTagFromNote",
            json!({ "noteId": note_id, "tagName": tag_name }),
        )
    }

    pub fn comment(target: &CommentTarget, markdown: &str) -> Self {
        match target {
            CommentTarget::Note(id) => Self::new(
                "makeNoteComment",
                json!({ "noteId": id, "markdown": markdown }),
            ),
            CommentTarget::Proposal(id) => Self::new(
                "makeProposalComment",
                json!({ "proposalId": id, "markdown": markdown }),
            ),
        }
    }

    pub fn create_proposal(draft: &ProposalDraft) -> Self {
        Self::new(
            "createProposal",
            serde_json::to_value(draft).unwrap_or(Value::Null),
        )
    }

    pub fn vote(proposal_id: &str, choice_ids: &[String]) -> Self {
        Self::new(
            "vote",
            json!({ "proposalId": proposal_id, "choiceIds": choice_ids }),
        )
    }
}

/// Remote write capability.
#[async_trait]
pub trait EventClient: Send + Sync {
    async fn apply_event(&self, event: &DbEvent) -> Result<Vec<Record>>;

    /// Access rules for a node label (`"Proposal"`, `"Note"`, ...).
    async fn label_acl(&self, label: &str) -> Result<LabelAcl>;
}
