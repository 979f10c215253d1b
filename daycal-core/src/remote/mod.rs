//! Remote document store: the system of record for events.
//!
//! The store is reached through the [`RemoteStore`] trait. It offers live
//! queries that push a full snapshot of the matching documents on every
//! change, plus create/update/delete keyed by collection and document id.

mod document_store;

pub use document_store::DocumentStore;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::mpsc;

use crate::error::DaycalResult;
use crate::record::Record;

/// Snapshots buffered per live query before the producer waits.
const FEED_BUFFER: usize = 16;

/// A stored document: id plus record body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub id: String,
    pub record: Record,
}

/// Equality filter on one record field.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldFilter {
    pub field: String,
    pub value: Value,
}

impl FieldFilter {
    pub fn eq(field: impl Into<String>, value: impl Into<Value>) -> Self {
        FieldFilter {
            field: field.into(),
            value: value.into(),
        }
    }

    pub fn matches(&self, record: &Record) -> bool {
        record.get(&self.field) == Some(&self.value)
    }
}

/// One delivery from a live query: every matching document, or the failure
/// that ended the query.
pub type Snapshot = DaycalResult<Vec<Document>>;

/// A live query. Dropping it releases the underlying listener.
pub struct Feed {
    rx: mpsc::Receiver<Snapshot>,
}

impl Feed {
    /// Create a feed and the sender a store implementation pushes snapshots into.
    /// The sender observes the feed being dropped through `closed()`.
    pub fn channel() -> (mpsc::Sender<Snapshot>, Feed) {
        let (tx, rx) = mpsc::channel(FEED_BUFFER);
        (tx, Feed { rx })
    }

    /// Wait for the next snapshot; `None` once the store has closed the query.
    pub async fn next(&mut self) -> Option<Snapshot> {
        self.rx.recv().await
    }
}

/// Operations the remote document store provides.
#[async_trait]
pub trait RemoteStore: Send + Sync {
    /// Start a live query over `collection` restricted by `filter`.
    async fn listen(&self, collection: &str, filter: FieldFilter) -> DaycalResult<Feed>;

    /// Store a new document and return the id the store assigned to it.
    async fn create(&self, collection: &str, record: Record) -> DaycalResult<String>;

    /// Replace an existing document's record.
    async fn update(&self, collection: &str, id: &str, record: Record) -> DaycalResult<()>;

    async fn delete(&self, collection: &str, id: &str) -> DaycalResult<()>;
}
