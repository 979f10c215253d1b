//! The event store: owner-scoped event list kept in sync with the remote store.
//!
//! The list only changes when the live feed delivers a snapshot; mutations
//! go to the remote store and come back through the feed. The last snapshot
//! is mirrored to the local cache and served when nobody is signed in.

use std::sync::{Arc, Weak};

use tokio::sync::{Mutex, watch};
use tokio::task::JoinHandle;

use crate::cache::LocalCache;
use crate::config::DaycalConfig;
use crate::error::{DaycalError, DaycalResult, ValidationError};
use crate::event::{Event, EventDraft, EventId, MAX_SPAN_DAYS, OwnerId};
use crate::identity::IdentityService;
use crate::record::EventRecord;
use crate::remote::{Document, FieldFilter, RemoteStore};

/// Cache key of the offline mirror.
pub const MIRROR_KEY: &str = "events";

/// Record field the live feed filters on.
const OWNER_FIELD: &str = "ownerId";

#[derive(Debug, Clone)]
pub struct StoreOptions {
    pub collection: String,
    pub max_span_days: i64,
}

impl Default for StoreOptions {
    fn default() -> Self {
        StoreOptions {
            collection: "events".to_string(),
            max_span_days: MAX_SPAN_DAYS,
        }
    }
}

impl From<&DaycalConfig> for StoreOptions {
    fn from(config: &DaycalConfig) -> Self {
        StoreOptions {
            collection: config.collection.clone(),
            max_span_days: config.effective_max_span_days(),
        }
    }
}

/// Handle to the shared event store. Clones share the same list and feed.
#[derive(Clone)]
pub struct EventStore {
    inner: Arc<Inner>,
}

struct Inner {
    remote: Arc<dyn RemoteStore>,
    cache: Arc<dyn LocalCache>,
    identity: Arc<dyn IdentityService>,
    options: StoreOptions,
    events: watch::Sender<Vec<Event>>,
    feed: Mutex<FeedState>,
}

/// The running live feed. A snapshot is only published while the generation
/// it was started with is still current.
#[derive(Default)]
struct FeedState {
    generation: u64,
    task: Option<JoinHandle<()>>,
}

impl EventStore {
    pub fn new(
        remote: Arc<dyn RemoteStore>,
        cache: Arc<dyn LocalCache>,
        identity: Arc<dyn IdentityService>,
        options: StoreOptions,
    ) -> Self {
        EventStore {
            inner: Arc::new(Inner {
                remote,
                cache,
                identity,
                options,
                events: watch::Sender::new(Vec::new()),
                feed: Mutex::new(FeedState::default()),
            }),
        }
    }

    /// Current event list.
    pub fn events(&self) -> Vec<Event> {
        self.inner.events.borrow().clone()
    }

    /// Receiver notified every time the event list is replaced.
    pub fn watch(&self) -> watch::Receiver<Vec<Event>> {
        self.inner.events.subscribe()
    }

    pub fn current_owner(&self) -> Option<OwnerId> {
        self.inner.identity.current()
    }

    /// Replace any running feed with one for `owner`.
    ///
    /// With no owner, the offline mirror is served and no feed runs. With an
    /// owner, the list is cleared right away so nothing from a previous
    /// identity stays visible, then filled from the owner's live feed.
    pub async fn subscribe(&self, owner: Option<OwnerId>) {
        let mut feed = self.inner.feed.lock().await;
        feed.generation += 1;
        let generation = feed.generation;
        if let Some(task) = feed.task.take() {
            task.abort();
        }

        let Some(owner) = owner else {
            let cached = self.inner.load_mirror().await;
            tracing::debug!(count = cached.len(), "Signed out, serving offline mirror");
            self.inner.events.send_replace(cached);
            return;
        };

        tracing::debug!(owner = %owner, generation, "Starting live feed");
        self.inner.events.send_if_modified(|list| {
            let had_events = !list.is_empty();
            list.clear();
            had_events
        });
        feed.task = Some(tokio::spawn(run_feed(
            Arc::downgrade(&self.inner),
            self.inner.remote.clone(),
            self.inner.options.collection.clone(),
            owner,
            generation,
        )));
    }

    /// Stop snapshot delivery and release the live feed. The list keeps its last value.
    pub async fn unsubscribe(&self) {
        let mut feed = self.inner.feed.lock().await;
        feed.generation += 1;
        if let Some(task) = feed.task.take() {
            task.abort();
            tracing::debug!("Live feed stopped");
        }
    }

    /// Keep the feed pointed at whoever the identity service says is signed in.
    pub fn follow_identity(&self) -> Following {
        let store = self.clone();
        let mut changes = self.inner.identity.changes();

        let task = tokio::spawn(async move {
            loop {
                let owner = changes.borrow_and_update().clone();
                store.subscribe(owner).await;
                if changes.changed().await.is_err() {
                    break;
                }
            }
        });

        Following { task }
    }

    /// Save a new event. Its id arrives later through the live feed.
    pub async fn create(&self, draft: &EventDraft) -> DaycalResult<()> {
        draft.validate(self.inner.options.max_span_days)?;
        let owner = self.require_identity()?;

        let record = EventRecord::from_draft(draft, &owner).to_record()?;
        let id = self
            .inner
            .remote
            .create(&self.inner.options.collection, record)
            .await?;

        tracing::info!(owner = %owner, id = %id, "Event created");
        Ok(())
    }

    /// Overwrite every field of an existing event.
    pub async fn update(&self, event: &Event) -> DaycalResult<()> {
        if event.id.is_empty() {
            return Err(ValidationError::EmptyId.into());
        }
        event.details.validate(self.inner.options.max_span_days)?;
        let owner = self.require_identity()?;

        let record = EventRecord::from_draft(&event.details, &owner).to_record()?;
        self.inner
            .remote
            .update(&self.inner.options.collection, event.id.as_str(), record)
            .await?;

        tracing::info!(owner = %owner, id = %event.id, "Event updated");
        Ok(())
    }

    pub async fn delete(&self, id: &EventId) -> DaycalResult<()> {
        if id.is_empty() {
            return Err(ValidationError::EmptyId.into());
        }
        let owner = self.require_identity()?;

        self.inner
            .remote
            .delete(&self.inner.options.collection, id.as_str())
            .await?;

        tracing::info!(owner = %owner, id = %id, "Event deleted");
        Ok(())
    }

    fn require_identity(&self) -> DaycalResult<OwnerId> {
        self.inner
            .identity
            .current()
            .ok_or(DaycalError::NotAuthenticated)
    }
}

impl Inner {
    /// Publish `events` if `generation` is still the running feed, mirroring
    /// them first when they came from a successful snapshot.
    async fn commit(&self, generation: u64, events: Vec<Event>, mirror: bool) -> bool {
        let feed = self.feed.lock().await;
        if feed.generation != generation {
            return false;
        }

        if mirror {
            self.write_mirror(&events).await;
        }
        self.events.send_replace(events);
        true
    }

    async fn write_mirror(&self, events: &[Event]) {
        let result = mirror_documents(events).and_then(|docs| {
            serde_json::to_string(&docs).map_err(|e| DaycalError::Serialization(e.to_string()))
        });

        let written = match result {
            Ok(content) => self.cache.set(MIRROR_KEY, &content).await,
            Err(e) => Err(e),
        };

        if let Err(e) = written {
            tracing::warn!(error = %e, "Failed to write offline mirror");
        }
    }

    async fn load_mirror(&self) -> Vec<Event> {
        let content = match self.cache.get(MIRROR_KEY).await {
            Ok(Some(content)) => content,
            Ok(None) => return Vec::new(),
            Err(e) => {
                tracing::warn!(error = %e, "Failed to read offline mirror");
                return Vec::new();
            }
        };

        match serde_json::from_str::<Vec<Document>>(&content) {
            Ok(docs) => docs.into_iter().filter_map(decode).collect(),
            Err(e) => {
                tracing::warn!(error = %e, "Offline mirror is corrupt, ignoring it");
                Vec::new()
            }
        }
    }
}

impl Drop for Inner {
    fn drop(&mut self) {
        if let Some(task) = self.feed.get_mut().task.take() {
            task.abort();
        }
    }
}

/// Keeps the store following identity changes until dropped.
pub struct Following {
    task: JoinHandle<()>,
}

impl Drop for Following {
    fn drop(&mut self) {
        self.task.abort();
    }
}

async fn run_feed(
    store: Weak<Inner>,
    remote: Arc<dyn RemoteStore>,
    collection: String,
    owner: OwnerId,
    generation: u64,
) {
    let filter = FieldFilter::eq(OWNER_FIELD, owner.as_str());

    let mut feed = match remote.listen(&collection, filter).await {
        Ok(feed) => feed,
        Err(e) => {
            tracing::warn!(owner = %owner, error = %e, "Live feed unavailable, showing no events");
            commit(&store, generation, Vec::new(), false).await;
            return;
        }
    };

    while let Some(snapshot) = feed.next().await {
        let (events, mirror) = match snapshot {
            Ok(docs) => (owned_events(&owner, docs), true),
            Err(e) => {
                tracing::warn!(owner = %owner, error = %e, "Live feed failed, showing no events");
                (Vec::new(), false)
            }
        };

        let count = events.len();
        if !commit(&store, generation, events, mirror).await {
            break;
        }
        tracing::debug!(owner = %owner, count, "Snapshot applied");
    }

    tracing::debug!(owner = %owner, "Live feed ended");
}

async fn commit(store: &Weak<Inner>, generation: u64, events: Vec<Event>, mirror: bool) -> bool {
    match store.upgrade() {
        Some(inner) => inner.commit(generation, events, mirror).await,
        None => false,
    }
}

/// Decode a snapshot, keeping only documents that belong to `owner`.
fn owned_events(owner: &OwnerId, docs: Vec<Document>) -> Vec<Event> {
    docs.into_iter()
        .filter_map(decode)
        .filter(|event| {
            let owned = &event.owner == owner;
            if !owned {
                tracing::warn!(id = %event.id, "Dropping event owned by another identity");
            }
            owned
        })
        .collect()
}

fn decode(doc: Document) -> Option<Event> {
    match EventRecord::from_record(&doc.record) {
        Ok(record) => Some(record.into_event(EventId::new(doc.id))),
        Err(e) => {
            tracing::warn!(id = %doc.id, error = %e, "Skipping undecodable document");
            None
        }
    }
}

fn mirror_documents(events: &[Event]) -> DaycalResult<Vec<Document>> {
    events
        .iter()
        .map(|event| {
            Ok(Document {
                id: event.id.to_string(),
                record: EventRecord::from_event(event).to_record()?,
            })
        })
        .collect()
}
