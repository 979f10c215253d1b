//! In-process document store with optional JSON file persistence.
//!
//! Documents live in named collections. Every mutation is broadcast to live
//! queries, which answer with a fresh full snapshot of their matching
//! documents. When opened on a file, the collections are rewritten to it
//! after each mutation (write to a temp file, then rename). A mutation only
//! takes effect in memory once that write has succeeded.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::broadcast::error::RecvError;
use tokio::sync::{Mutex, broadcast};

use crate::error::{DaycalError, DaycalResult};
use crate::record::Record;
use crate::remote::{Document, Feed, FieldFilter, RemoteStore};

type Collections = BTreeMap<String, Vec<Document>>;

/// Change notifications buffered per listener.
const CHANGE_BUFFER: usize = 64;

pub struct DocumentStore {
    collections: Arc<Mutex<Collections>>,
    changes: broadcast::Sender<String>,
    path: Option<PathBuf>,
}

impl DocumentStore {
    pub fn in_memory() -> Self {
        let (changes, _) = broadcast::channel(CHANGE_BUFFER);
        DocumentStore {
            collections: Arc::new(Mutex::new(Collections::new())),
            changes,
            path: None,
        }
    }

    /// Open a store persisted at `path`, loading any documents already there.
    pub async fn open(path: impl Into<PathBuf>) -> DaycalResult<Self> {
        let path = path.into();

        let collections = match tokio::fs::read_to_string(&path).await {
            Ok(content) => serde_json::from_str(&content).map_err(|e| {
                DaycalError::Serialization(format!("{}: {}", path.display(), e))
            })?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Collections::new(),
            Err(e) => return Err(e.into()),
        };

        let (changes, _) = broadcast::channel(CHANGE_BUFFER);
        Ok(DocumentStore {
            collections: Arc::new(Mutex::new(collections)),
            changes,
            path: Some(path),
        })
    }

    async fn matching(
        collections: &Mutex<Collections>,
        collection: &str,
        filter: &FieldFilter,
    ) -> Vec<Document> {
        collections
            .lock()
            .await
            .get(collection)
            .map(|docs| {
                docs.iter()
                    .filter(|doc| filter.matches(&doc.record))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Write `next` to the backing file, then make it the live state.
    async fn commit(&self, current: &mut Collections, next: Collections) -> DaycalResult<()> {
        if let Some(path) = &self.path {
            write_file(path, &next).await.map_err(|e| {
                DaycalError::RemoteOperation(format!("could not save {}: {}", path.display(), e))
            })?;
        }
        *current = next;
        Ok(())
    }

    fn notify(&self, collection: &str) {
        // No receivers just means nobody is listening
        let _ = self.changes.send(collection.to_string());
    }
}

async fn write_file(path: &Path, collections: &Collections) -> DaycalResult<()> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }

    let content = serde_json::to_string_pretty(collections)
        .map_err(|e| DaycalError::Serialization(e.to_string()))?;
    let temp = path.with_extension("json.tmp");

    tokio::fs::write(&temp, content).await?;
    tokio::fs::rename(&temp, path).await?;
    Ok(())
}

fn reject_unset_fields(record: &Record) -> DaycalResult<()> {
    match record.iter().find(|(_, v)| v.is_null()) {
        Some((field, _)) => Err(DaycalError::RemoteOperation(format!(
            "field '{}' has no value",
            field
        ))),
        None => Ok(()),
    }
}

fn not_found(collection: &str, id: &str) -> DaycalError {
    DaycalError::RemoteOperation(format!("document '{}/{}' not found", collection, id))
}

#[async_trait]
impl RemoteStore for DocumentStore {
    async fn listen(&self, collection: &str, filter: FieldFilter) -> DaycalResult<Feed> {
        let (tx, feed) = Feed::channel();
        // Subscribe before the first snapshot so no change can fall in between
        let mut changes = self.changes.subscribe();
        let collections = self.collections.clone();
        let collection = collection.to_string();

        tokio::spawn(async move {
            let initial = Self::matching(&collections, &collection, &filter).await;
            if tx.send(Ok(initial)).await.is_err() {
                return;
            }

            loop {
                tokio::select! {
                    _ = tx.closed() => break,
                    changed = changes.recv() => match changed {
                        Ok(name) if name != collection => continue,
                        // Snapshots are complete, so a lagged listener only needs the latest one
                        Ok(_) | Err(RecvError::Lagged(_)) => {
                            let docs = Self::matching(&collections, &collection, &filter).await;
                            if tx.send(Ok(docs)).await.is_err() {
                                break;
                            }
                        }
                        Err(RecvError::Closed) => break,
                    },
                }
            }

            tracing::debug!(collection = %collection, "Live query released");
        });

        Ok(feed)
    }

    async fn create(&self, collection: &str, record: Record) -> DaycalResult<String> {
        reject_unset_fields(&record)?;

        let id = uuid::Uuid::new_v4().simple().to_string();
        let mut collections = self.collections.lock().await;
        let mut next = collections.clone();
        next.entry(collection.to_string())
            .or_default()
            .push(Document {
                id: id.clone(),
                record,
            });
        self.commit(&mut collections, next).await?;
        drop(collections);

        tracing::debug!(collection, id = %id, "Document created");
        self.notify(collection);
        Ok(id)
    }

    async fn update(&self, collection: &str, id: &str, record: Record) -> DaycalResult<()> {
        reject_unset_fields(&record)?;

        let mut collections = self.collections.lock().await;
        let mut next = collections.clone();
        let doc = next
            .get_mut(collection)
            .and_then(|docs| docs.iter_mut().find(|d| d.id == id))
            .ok_or_else(|| not_found(collection, id))?;
        doc.record = record;
        self.commit(&mut collections, next).await?;
        drop(collections);

        tracing::debug!(collection, id, "Document updated");
        self.notify(collection);
        Ok(())
    }

    async fn delete(&self, collection: &str, id: &str) -> DaycalResult<()> {
        let mut collections = self.collections.lock().await;
        let mut next = collections.clone();
        let docs = next
            .get_mut(collection)
            .ok_or_else(|| not_found(collection, id))?;
        let before = docs.len();
        docs.retain(|d| d.id != id);
        if docs.len() == before {
            return Err(not_found(collection, id));
        }
        self.commit(&mut collections, next).await?;
        drop(collections);

        tracing::debug!(collection, id, "Document deleted");
        self.notify(collection);
        Ok(())
    }
}
