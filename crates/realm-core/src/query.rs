//! Declarative graph query requests and the remote query capability.
//!
//! A [`QueryRequest`] serializes to the protocol's JSON shape:
//!
//! ```json
//! {
//!   "match": [{ "key": "note", "labels": ["Note"] }],
//!   "where": { "author._owner": { "$eq": { "$key": "note._owner" } } },
//!   "orderBy": { "note._createdAt": "DESC" },
//!   "skip": 40,
//!   "limit": 20,
//!   "return": ["note", { "key": "author.name", "as": "authorName" }]
//! }
//! ```
//!
//! Nothing here interprets the query language. The only assumptions the
//! feed layer makes are that `skip`/`limit` paginate, `orderBy` is honored,
//! and a full page (`len == limit`) means more rows may follow.

use std::collections::BTreeMap;

use async_trait::async_trait;
use serde::Serialize;
use serde_json::{Map, Value};

use crate::error::Result;

/// One result row: requested alias → value.
pub type Record = Map<String, Value>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Order {
    #[serde(rename = "ASC")]
    Asc,
    #[serde(rename = "DESC")]
    Desc,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct NodePattern {
    pub key: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub labels: Vec<String>,
    #[serde(skip_serializing_if = "Map::is_empty")]
    pub props: Map<String, Value>,
}

impl NodePattern {
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            ..Default::default()
        }
    }

    pub fn label(mut self, label: impl Into<String>) -> Self {
        self.labels.push(label.into());
        self
    }

    pub fn prop(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.props.insert(name.into(), value.into());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RelationPattern {
    pub key: String,
    #[serde(rename = "type")]
    pub rel_type: String,
    pub from: NodePattern,
    pub to: NodePattern,
    /// Keep rows where the relation is absent, like an outer join.
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub optional: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Pattern {
    Node(NodePattern),
    Relation(RelationPattern),
}

impl Pattern {
    pub fn relation(
        key: impl Into<String>,
        rel_type: impl Into<String>,
        from: NodePattern,
        to: NodePattern,
    ) -> Self {
        Pattern::Relation(RelationPattern {
            key: key.into(),
            rel_type: rel_type.into(),
            from,
            to,
            optional: false,
        })
    }

    /// A relation that may be missing; rows without it are still returned.
    pub fn optional_relation(
        key: impl Into<String>,
        rel_type: impl Into<String>,
        from: NodePattern,
        to: NodePattern,
    ) -> Self {
        Pattern::Relation(RelationPattern {
            key: key.into(),
            rel_type: rel_type.into(),
            from,
            to,
            optional: true,
        })
    }
}

impl From<NodePattern> for Pattern {
    fn from(node: NodePattern) -> Self {
        Pattern::Node(node)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ReturnField {
    Key(String),
    Alias {
        key: String,
        #[serde(rename = "as")]
        alias: String,
        #[serde(skip_serializing_if = "std::ops::Not::not")]
        collect: bool,
    },
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct QueryRequest {
    #[serde(rename = "match")]
    pub patterns: Vec<Pattern>,
    #[serde(rename = "where", skip_serializing_if = "Map::is_empty")]
    pub conditions: Map<String, Value>,
    #[serde(rename = "orderBy", skip_serializing_if = "BTreeMap::is_empty")]
    pub order_by: BTreeMap<String, Order>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub skip: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<usize>,
    #[serde(rename = "return")]
    pub returns: Vec<ReturnField>,
}

impl QueryRequest {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn matching(mut self, pattern: impl Into<Pattern>) -> Self {
        self.patterns.push(pattern.into());
        self
    }

    pub fn condition(mut self, field: impl Into<String>, condition: Value) -> Self {
        self.conditions.insert(field.into(), condition);
        self
    }

    /// `field` must equal the value of another matched `key`.
    pub fn same_as(self, field: impl Into<String>, other_key: &str) -> Self {
        self.condition(
            field,
            serde_json::json!({ "$eq": { "$key": other_key } }),
        )
    }

    pub fn order(mut self, field: impl Into<String>, order: Order) -> Self {
        self.order_by.insert(field.into(), order);
        self
    }

    pub fn page(mut self, skip: usize, limit: usize) -> Self {
        self.skip = Some(skip);
        self.limit = Some(limit);
        self
    }

    pub fn returning(mut self, key: impl Into<String>) -> Self {
        self.returns.push(ReturnField::Key(key.into()));
        self
    }

    pub fn returning_as(mut self, key: impl Into<String>, alias: impl Into<String>) -> Self {
        self.returns.push(ReturnField::Alias {
            key: key.into(),
            alias: alias.into(),
            collect: false,
        });
        self
    }

    pub fn collecting_as(mut self, key: impl Into<String>, alias: impl Into<String>) -> Self {
        self.returns.push(ReturnField::Alias {
            key: key.into(),
            alias: alias.into(),
            collect: true,
        });
        self
    }

    /// Return the author display fields under the aliases the record
    /// adapters expect.
    pub fn returning_author(self, author_key: &str) -> Self {
        self.returning_as(format!("{author_key}.displayName"), "authorDisplayName")
            .returning_as(format!("{author_key}.name"), "authorName")
            .returning_as(format!("{author_key}.avatar"), "authorAvatar")
    }
}

/// Remote paginated query capability.
///
/// Implementations must be `Send + Sync`; the feed layer holds them behind
/// an `Arc` and may share one client across several feeds.
#[async_trait]
pub trait QueryClient: Send + Sync {
    async fn query(&self, request: &QueryRequest) -> Result<Vec<Record>>;
}
