//! Record adapters: alias-keyed remote rows → typed entities.
//!
//! The remote returns flat rows such as
//! `{ "note": { "props": {...} }, "authorName": "...", "authorAvatar": null }`.
//! Each adapter here is a pure function for one entity kind, so the
//! shape translation lives in exactly one place.

use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::{RealmError, Result};
use crate::models::{Author, Choice, Comment, Note, Profile, Proposal, Tag, Vote};
use crate::query::Record;

/// Extract the property payload of the node returned under `key`.
///
/// Accepts `{props: {...}}`, `{properties: {...}}`, or an already-flat object.
fn node_props<'a>(record: &'a Record, key: &str) -> Result<&'a Value> {
    let node = record
        .get(key)
        .filter(|v| !v.is_null())
        .ok_or_else(|| RealmError::decode(format!("record has no `{key}` node")))?;
    Ok(node
        .get("props")
        .or_else(|| node.get("properties"))
        .unwrap_or(node))
}

fn decode_node<T: DeserializeOwned>(record: &Record, key: &str) -> Result<T> {
    let props = node_props(record, key)?;
    serde_json::from_value(props.clone())
        .map_err(|e| RealmError::decode(format!("`{key}` node: {e}")))
}

fn alias_str(record: &Record, alias: &str) -> String {
    record
        .get(alias)
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string()
}

/// Denormalized author fields. A missing avatar becomes `""`.
pub fn author_from_record(record: &Record) -> Author {
    Author {
        name: alias_str(record, "authorName"),
        display_name: alias_str(record, "authorDisplayName"),
        avatar: alias_str(record, "authorAvatar"),
    }
}

pub fn profile_from_record(record: &Record) -> Result<Profile> {
    decode_node(record, "profile")
}

pub fn note_from_record(record: &Record) -> Result<Note> {
    let mut note: Note = decode_node(record, "note")?;
    note.author = author_from_record(record);
    if let Some(tags) = record.get("tags").and_then(Value::as_array) {
        note.tags = tags
            .iter()
            .filter_map(|t| {
                let props = t.get("props").or_else(|| t.get("properties")).unwrap_or(t);
                serde_json::from_value::<Tag>(props.clone()).ok()
            })
            .collect();
    }
    Ok(note)
}

pub fn comment_from_record(record: &Record) -> Result<Comment> {
    let mut comment: Comment = decode_node(record, "comment")?;
    comment.author = author_from_record(record);
    Ok(comment)
}

/// Choices arrive collected in reverse creation order; flip them back.
pub fn proposal_from_record(record: &Record) -> Result<Proposal> {
    let mut proposal: Proposal = decode_node(record, "proposal")?;
    proposal.author = author_from_record(record);
    if let Some(choices) = record.get("choices").and_then(Value::as_array) {
        let mut parsed = choices
            .iter()
            .map(|c| {
                let props = c
                    .get("properties")
                    .or_else(|| c.get("props"))
                    .unwrap_or(c);
                serde_json::from_value::<Choice>(props.clone())
                    .map_err(|e| RealmError::decode(format!("`choices` entry: {e}")))
            })
            .collect::<Result<Vec<_>>>()?;
        parsed.reverse();
        proposal.choices = parsed;
    }
    Ok(proposal)
}

pub fn vote_from_record(record: &Record) -> Result<Vote> {
    decode_node(record, "vote")
}

pub fn tag_from_record(record: &Record) -> Result<Tag> {
    decode_node(record, "tag")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(value: Value) -> Record {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_note_with_author_aliases() {
        let rec = record(json!({
            "note": { "props": { "_id": "n1", "summary": "Hi", "ipfsHash": "Qm1" } },
            "authorName": "alice",
            "authorDisplayName": "Alice",
            "authorAvatar": null,
        }));
        let note = note_from_record(&rec).unwrap();
        assert_eq!(note.node.id, "n1");
        assert_eq!(note.author.name, "alice");
        assert_eq!(note.author.display_name, "Alice");
        assert_eq!(note.author.avatar, "");
    }

    #[test]
    fn test_note_tags_collected() {
        let rec = record(json!({
            "note": { "props": { "_id": "n1" } },
            "tags": [
                { "props": { "name": "Rust Lang", "sanitized": "rustlang" } },
                { "props": { "name": "Web", "sanitized": "web" } },
            ],
        }));
        let note = note_from_record(&rec).unwrap();
        assert_eq!(note.tags.len(), 2);
        assert_eq!(note.tags[0].sanitized, "rustlang");
    }

    #[test]
    fn test_missing_node_is_decode_error() {
        let rec = record(json!({ "authorName": "alice" }));
        let err = note_from_record(&rec).unwrap_err();
        assert!(matches!(err, RealmError::Decode(_)));
    }

    #[test]
    fn test_proposal_choices_reversed() {
        let rec = record(json!({
            "proposal": { "props": { "_id": "p1", "title": "Burn?" } },
            "choices": [
                { "properties": { "_id": "c2", "description": "No" } },
                { "properties": { "_id": "c1", "description": "Yes" } },
            ],
            "authorName": "bob",
            "authorDisplayName": "Bob",
            "authorAvatar": "ipfs://avatar",
        }));
        let proposal = proposal_from_record(&rec).unwrap();
        let ids: Vec<&str> = proposal.choices.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids, vec!["c1", "c2"]);
        assert_eq!(proposal.author.avatar, "ipfs://avatar");
    }

    #[test]
    fn test_flat_profile_node() {
        let rec = record(json!({ "profile": { "_id": "p1", "name": "carol" } }));
        let profile = profile_from_record(&rec).unwrap();
        assert_eq!(profile.name, "carol");
    }
}
