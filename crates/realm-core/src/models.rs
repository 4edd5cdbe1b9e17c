//! Entity types shared by feeds, adapters, and the authoring service.
//!
//! Field names follow the remote node properties (`displayName`,
//! `ipfsHash`, `_createdAt`, ...) so node payloads deserialize directly.
//! Denormalized author fields are not part of the node payload; the
//! record adapters in [`crate::mapping`] attach them afterwards.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Bookkeeping fields every remote node carries.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NodeMeta {
    #[serde(rename = "_id", default)]
    pub id: String,
    #[serde(rename = "_owner", default, skip_serializing_if = "Option::is_none")]
    pub owner: Option<String>,
    #[serde(rename = "_createdAt", default)]
    pub created_at: i64,
    #[serde(rename = "_updatedAt", default)]
    pub updated_at: i64,
}

impl NodeMeta {
    pub fn created(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp_millis(self.created_at)
    }
}

/// Anything that can live in a [`PageCache`](crate::feed::PageCache).
///
/// The identifier is the only deduplication key; content is never compared.
pub trait FeedItem {
    fn item_id(&self) -> &str;
}

/// Author display fields copied onto a record by the remote query.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Author {
    pub name: String,
    pub display_name: String,
    #[serde(default)]
    pub avatar: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Profile {
    #[serde(flatten)]
    pub node: NodeMeta,
    pub name: String,
    #[serde(default)]
    pub display_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wallpaper: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub twitter: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub discord: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub github: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub telegram: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub eth: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub btc: Option<String>,
}

impl FeedItem for Profile {
    fn item_id(&self) -> &str {
        &self.node.id
    }
}

/// A tag attached to a note. `name` is for display, `sanitized` is the join key.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tag {
    pub name: String,
    #[serde(default)]
    pub sanitized: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Note {
    #[serde(flatten)]
    pub node: NodeMeta,
    #[serde(default)]
    pub summary: String,
    #[serde(default)]
    pub images: Vec<String>,
    #[serde(default)]
    pub ipfs_hash: String,
    #[serde(default)]
    pub arweave_id: String,
    /// Present when the remote stores the body inline instead of as a blob.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub markdown: Option<String>,
    #[serde(default)]
    pub tags: Vec<Tag>,
    #[serde(default)]
    pub author: Author,
}

impl FeedItem for Note {
    fn item_id(&self) -> &str {
        &self.node.id
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Comment {
    #[serde(flatten)]
    pub node: NodeMeta,
    #[serde(default)]
    pub markdown: String,
    #[serde(default)]
    pub author: Author,
}

impl FeedItem for Comment {
    fn item_id(&self) -> &str {
        &self.node.id
    }
}

/// What a comment is attached to.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum CommentTarget {
    Note(String),
    Proposal(String),
}

impl CommentTarget {
    pub fn id(&self) -> &str {
        match self {
            CommentTarget::Note(id) | CommentTarget::Proposal(id) => id,
        }
    }

    /// Node label of the target.
    pub fn label(&self) -> &'static str {
        match self {
            CommentTarget::Note(_) => "Note",
            CommentTarget::Proposal(_) => "Proposal",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Choice {
    #[serde(rename = "_id", default)]
    pub id: String,
    #[serde(default)]
    pub description: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Proposal {
    #[serde(flatten)]
    pub node: NodeMeta,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub choices: Vec<Choice>,
    #[serde(default)]
    pub start_date: i64,
    #[serde(default)]
    pub end_date: i64,
    #[serde(default)]
    pub author: Author,
}

impl FeedItem for Proposal {
    fn item_id(&self) -> &str {
        &self.node.id
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Vote {
    #[serde(flatten)]
    pub node: NodeMeta,
    pub proposal_id: String,
    #[serde(default)]
    pub choice_ids: Vec<String>,
}

/// Write permissions for a node label. Only the balance gate is used here.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LabelAcl {
    #[serde(default)]
    pub write_min_balance: Option<f64>,
}

/// What a new proposal carries before the remote assigns ids.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProposalDraft {
    pub title: String,
    pub description: String,
    pub choices: Vec<String>,
    pub start_date: i64,
    pub end_date: i64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_note_reads_remote_props() {
        let note: Note = serde_json::from_value(json!({
            "_id": "n1",
            "_owner": "0xabc",
            "_createdAt": 1_650_000_000_000i64,
            "summary": "Hello",
            "images": ["a.png"],
            "ipfsHash": "QmX",
        }))
        .unwrap();
        assert_eq!(note.item_id(), "n1");
        assert_eq!(note.node.owner.as_deref(), Some("0xabc"));
        assert_eq!(note.ipfs_hash, "QmX");
        assert!(note.arweave_id.is_empty());
        assert!(note.node.created().is_some());
    }

    #[test]
    fn test_profile_optional_fields_default() {
        let profile: Profile = serde_json::from_value(json!({
            "_id": "p1",
            "name": "alice",
            "displayName": "Alice",
        }))
        .unwrap();
        assert_eq!(profile.display_name, "Alice");
        assert!(profile.avatar.is_none());
    }
}
