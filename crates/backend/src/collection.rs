use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use trackhub_core::ItemId;

use crate::error::SubscriptionError;

/// Logical address of a collection (slash-separated segments).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CollectionPath(Vec<String>);

impl CollectionPath {
    pub fn new<I, S>(segments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(segments.into_iter().map(Into::into).collect())
    }

    /// Parse `a/b/c`, ignoring empty segments.
    pub fn parse(path: &str) -> Self {
        Self::new(path.split('/').filter(|s| !s.is_empty()))
    }

    pub fn segments(&self) -> &[String] {
        &self.0
    }
}

impl core::fmt::Display for CollectionPath {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0.join("/"))
    }
}

#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderDirection {
    Ascending,
    #[default]
    Descending,
}

/// A live query: one collection ordered by one field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollectionQuery {
    pub path: CollectionPath,
    pub order_by: String,
    pub direction: OrderDirection,
}

impl CollectionQuery {
    /// Newest first by creation timestamp.
    pub fn newest_first(path: CollectionPath) -> Self {
        Self {
            path,
            order_by: "createdAt".to_string(),
            direction: OrderDirection::Descending,
        }
    }
}

/// A persisted document: server-assigned metadata plus the caller's body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredDocument {
    pub id: ItemId,
    pub created_at: DateTime<Utc>,
    pub fields: JsonValue,
}

impl StoredDocument {
    /// Deserialize the body into a typed value.
    pub fn decode<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        T::deserialize(&self.fields)
    }
}

/// One delivery on a live query.
#[derive(Debug, Clone, PartialEq)]
pub enum SnapshotEvent {
    /// The complete, ordered contents of the collection at one point in time.
    Snapshot(Vec<StoredDocument>),
    /// The query failed; no further snapshots follow.
    Error(SubscriptionError),
}
