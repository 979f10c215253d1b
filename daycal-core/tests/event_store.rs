//! Integration tests for the event store: validation before I/O, owner
//! scoping, identity switches, feed failures and the offline mirror.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{NaiveDate, NaiveTime};
use serde_json::{Value, json};
use tokio::sync::{mpsc, watch};

use daycal_core::cache::{LocalCache, MemoryCache};
use daycal_core::identity::Session;
use daycal_core::record::Record;
use daycal_core::remote::{Document, DocumentStore, Feed, FieldFilter, RemoteStore, Snapshot};
use daycal_core::store::MIRROR_KEY;
use daycal_core::{
    DaycalError, DaycalResult, Event, EventDraft, EventId, EventStore, OwnerId, StoreOptions,
    ValidationError,
};

const WAIT: Duration = Duration::from_secs(2);

fn date(s: &str) -> NaiveDate {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
}

fn time(s: &str) -> NaiveTime {
    NaiveTime::parse_from_str(s, "%H:%M").unwrap()
}

fn record(value: Value) -> Record {
    match value {
        Value::Object(map) => map,
        _ => panic!("not an object"),
    }
}

fn doc(id: &str, title: &str, owner: &str) -> Document {
    Document {
        id: id.to_string(),
        record: record(json!({
            "title": title,
            "startDate": "2024-03-01",
            "allDay": true,
            "ownerId": owner,
        })),
    }
}

fn titles(events: &[Event]) -> Vec<String> {
    let mut titles: Vec<_> = events.iter().map(|e| e.title().to_string()).collect();
    titles.sort();
    titles
}

/// Wait until the store's list satisfies `pred`, returning that list.
async fn wait_for(
    rx: &mut watch::Receiver<Vec<Event>>,
    pred: impl FnMut(&Vec<Event>) -> bool,
) -> Vec<Event> {
    tokio::time::timeout(WAIT, rx.wait_for(pred))
        .await
        .expect("timed out waiting for event list")
        .expect("store dropped")
        .clone()
}

/// Remote double that records every call and lets the test drive live feeds.
struct ScriptedRemote {
    calls: Mutex<Vec<String>>,
    listeners: mpsc::UnboundedSender<(FieldFilter, mpsc::Sender<Snapshot>)>,
    fail_listen: bool,
    fail_writes: bool,
}

impl ScriptedRemote {
    fn new() -> (Arc<Self>, mpsc::UnboundedReceiver<(FieldFilter, mpsc::Sender<Snapshot>)>) {
        Self::with_failures(false, false)
    }

    fn with_failures(
        fail_listen: bool,
        fail_writes: bool,
    ) -> (Arc<Self>, mpsc::UnboundedReceiver<(FieldFilter, mpsc::Sender<Snapshot>)>) {
        let (listeners, rx) = mpsc::unbounded_channel();
        let remote = ScriptedRemote {
            calls: Mutex::new(Vec::new()),
            listeners,
            fail_listen,
            fail_writes,
        };
        (Arc::new(remote), rx)
    }

    fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    fn record_call(&self, call: String) -> DaycalResult<()> {
        self.calls.lock().unwrap().push(call);
        if self.fail_writes {
            return Err(DaycalError::RemoteOperation("permission denied".into()));
        }
        Ok(())
    }
}

#[async_trait]
impl RemoteStore for ScriptedRemote {
    async fn listen(&self, collection: &str, filter: FieldFilter) -> DaycalResult<Feed> {
        self.calls.lock().unwrap().push(format!("listen {}", collection));
        if self.fail_listen {
            return Err(DaycalError::Feed("unavailable".into()));
        }
        let (tx, feed) = Feed::channel();
        let _ = self.listeners.send((filter, tx));
        Ok(feed)
    }

    async fn create(&self, collection: &str, record: Record) -> DaycalResult<String> {
        self.record_call(format!("create {} {}", collection, Value::Object(record)))?;
        Ok("new-id".to_string())
    }

    async fn update(&self, collection: &str, id: &str, record: Record) -> DaycalResult<()> {
        self.record_call(format!("update {} {} {}", collection, id, Value::Object(record)))
    }

    async fn delete(&self, collection: &str, id: &str) -> DaycalResult<()> {
        self.record_call(format!("delete {} {}", collection, id))
    }
}

async fn next_listener(
    listeners: &mut mpsc::UnboundedReceiver<(FieldFilter, mpsc::Sender<Snapshot>)>,
) -> (FieldFilter, mpsc::Sender<Snapshot>) {
    tokio::time::timeout(WAIT, listeners.recv())
        .await
        .expect("timed out waiting for listen")
        .expect("remote dropped")
}

fn store_with(
    remote: Arc<dyn RemoteStore>,
    cache: Arc<dyn LocalCache>,
    session: Arc<Session>,
) -> EventStore {
    EventStore::new(remote, cache, session, StoreOptions::default())
}

#[tokio::test]
async fn empty_title_is_rejected_before_any_remote_call() {
    let (remote, _listeners) = ScriptedRemote::new();
    let session = Arc::new(Session::signed_in(OwnerId::new("alice")));
    let store = store_with(remote.clone(), Arc::new(MemoryCache::new()), session);

    let err = store
        .create(&EventDraft::all_day("", date("2024-03-01")))
        .await
        .unwrap_err();

    assert!(matches!(err, DaycalError::Validation(ValidationError::EmptyTitle)));
    assert!(remote.calls().is_empty());
}

#[tokio::test]
async fn end_time_before_start_time_is_rejected() {
    let (remote, _listeners) = ScriptedRemote::new();
    let session = Arc::new(Session::signed_in(OwnerId::new("alice")));
    let store = store_with(remote.clone(), Arc::new(MemoryCache::new()), session);

    let draft = EventDraft::timed("Standup", date("2024-03-01"), time("10:00"), time("09:00"));
    let err = store.create(&draft).await.unwrap_err();

    assert!(matches!(
        err,
        DaycalError::Validation(ValidationError::EndTimeNotAfterStart { .. })
    ));
    assert!(remote.calls().is_empty());
}

#[tokio::test]
async fn mutations_require_an_identity() {
    let (remote, _listeners) = ScriptedRemote::new();
    let store = store_with(
        remote.clone(),
        Arc::new(MemoryCache::new()),
        Arc::new(Session::signed_out()),
    );

    let err = store.delete(&EventId::new("abc")).await.unwrap_err();
    assert!(matches!(err, DaycalError::NotAuthenticated));

    let err = store
        .create(&EventDraft::all_day("Lunch", date("2024-03-01")))
        .await
        .unwrap_err();
    assert!(matches!(err, DaycalError::NotAuthenticated));

    let event = Event::new(
        EventId::new("abc"),
        OwnerId::new("alice"),
        EventDraft::all_day("Lunch", date("2024-03-01")),
    );
    let err = store.update(&event).await.unwrap_err();
    assert!(matches!(err, DaycalError::NotAuthenticated));

    assert!(remote.calls().is_empty());
}

#[tokio::test]
async fn update_and_delete_need_an_id() {
    let (remote, _listeners) = ScriptedRemote::new();
    let session = Arc::new(Session::signed_in(OwnerId::new("alice")));
    let store = store_with(remote.clone(), Arc::new(MemoryCache::new()), session);

    let err = store.delete(&EventId::new(" ")).await.unwrap_err();
    assert!(matches!(err, DaycalError::Validation(ValidationError::EmptyId)));

    let event = Event::new(
        EventId::new(""),
        OwnerId::new("alice"),
        EventDraft::all_day("Lunch", date("2024-03-01")),
    );
    let err = store.update(&event).await.unwrap_err();
    assert!(matches!(err, DaycalError::Validation(ValidationError::EmptyId)));

    assert!(remote.calls().is_empty());
}

#[tokio::test]
async fn saved_records_omit_unset_fields_and_carry_the_owner() {
    let (remote, _listeners) = ScriptedRemote::new();
    let session = Arc::new(Session::signed_in(OwnerId::new("alice")));
    let store = store_with(remote.clone(), Arc::new(MemoryCache::new()), session);

    store
        .create(&EventDraft::all_day("  Lunch  ", date("2024-03-01")).with_tag(""))
        .await
        .unwrap();

    let event = Event::new(
        EventId::new("e1"),
        OwnerId::new("mallory"),
        EventDraft::timed("Standup", date("2024-03-02"), time("09:00"), time("09:15")),
    );
    store.update(&event).await.unwrap();

    let expected_create = json!({
        "title": "Lunch",
        "startDate": "2024-03-01",
        "allDay": true,
        "ownerId": "alice",
    });
    let expected_update = json!({
        "title": "Standup",
        "startDate": "2024-03-02",
        "allDay": false,
        "startTime": "09:00",
        "endTime": "09:15",
        "ownerId": "alice",
    });
    assert_eq!(
        remote.calls(),
        vec![
            format!("create events {}", expected_create),
            format!("update events e1 {}", expected_update),
        ]
    );
}

#[tokio::test]
async fn remote_failures_propagate_unchanged() {
    let (remote, _listeners) = ScriptedRemote::with_failures(false, true);
    let session = Arc::new(Session::signed_in(OwnerId::new("alice")));
    let store = store_with(remote.clone(), Arc::new(MemoryCache::new()), session);

    let err = store.delete(&EventId::new("abc")).await.unwrap_err();
    assert!(matches!(err, DaycalError::RemoteOperation(msg) if msg == "permission denied"));
}

#[tokio::test]
async fn feed_error_clears_the_list_without_surfacing() {
    let (remote, mut listeners) = ScriptedRemote::new();
    let session = Arc::new(Session::signed_in(OwnerId::new("alice")));
    let store = store_with(remote, Arc::new(MemoryCache::new()), session);
    let mut rx = store.watch();

    store.subscribe(Some(OwnerId::new("alice"))).await;
    let (filter, feed) = next_listener(&mut listeners).await;
    assert_eq!(filter, FieldFilter::eq("ownerId", "alice"));

    feed.send(Ok(vec![doc("a", "Lunch", "alice")])).await.unwrap();
    wait_for(&mut rx, |list| list.len() == 1).await;

    feed.send(Err(DaycalError::Feed("connection reset".into())))
        .await
        .unwrap();
    wait_for(&mut rx, |list| list.is_empty()).await;

    feed.send(Ok(vec![])).await.unwrap();
    feed.send(Ok(vec![doc("b", "Dinner", "alice")])).await.unwrap();
    let list = wait_for(&mut rx, |list| list.len() == 1).await;
    assert_eq!(titles(&list), vec!["Dinner"]);
}

#[tokio::test]
async fn unavailable_feed_shows_no_events() {
    let (remote, _listeners) = ScriptedRemote::with_failures(true, false);
    let cache = Arc::new(MemoryCache::new());
    cache
        .set(MIRROR_KEY, &serde_json::to_string(&vec![doc("a", "Old", "alice")]).unwrap())
        .await
        .unwrap();
    let session = Arc::new(Session::signed_in(OwnerId::new("alice")));
    let store = store_with(remote.clone(), cache, session);

    store.subscribe(Some(OwnerId::new("alice"))).await;
    tokio::time::sleep(Duration::from_millis(50)).await;

    assert!(store.events().is_empty());
    assert_eq!(remote.calls(), vec!["listen events"]);
}

#[tokio::test]
async fn foreign_and_undecodable_documents_are_dropped() {
    let (remote, mut listeners) = ScriptedRemote::new();
    let session = Arc::new(Session::signed_in(OwnerId::new("alice")));
    let store = store_with(remote, Arc::new(MemoryCache::new()), session);
    let mut rx = store.watch();

    store.subscribe(Some(OwnerId::new("alice"))).await;
    let (_, feed) = next_listener(&mut listeners).await;

    let broken = Document {
        id: "broken".to_string(),
        record: record(json!({ "title": "No date", "ownerId": "alice" })),
    };
    feed.send(Ok(vec![
        doc("a", "Lunch", "alice"),
        doc("b", "Secret", "bob"),
        broken,
    ]))
    .await
    .unwrap();

    let list = wait_for(&mut rx, |list| !list.is_empty()).await;
    assert_eq!(titles(&list), vec!["Lunch"]);
}

#[tokio::test]
async fn switching_identity_never_shows_previous_events() {
    let (remote, mut listeners) = ScriptedRemote::new();
    let session = Arc::new(Session::signed_in(OwnerId::new("alice")));
    let store = store_with(remote, Arc::new(MemoryCache::new()), session.clone());
    let mut rx = store.watch();
    let _following = store.follow_identity();

    let (_, alice_feed) = next_listener(&mut listeners).await;
    alice_feed
        .send(Ok(vec![doc("a", "Alice lunch", "alice")]))
        .await
        .unwrap();
    wait_for(&mut rx, |list| titles(list) == vec!["Alice lunch"]).await;

    session.sign_in(OwnerId::new("bob"));
    let (filter, bob_feed) = next_listener(&mut listeners).await;
    assert_eq!(filter, FieldFilter::eq("ownerId", "bob"));
    assert!(store.events().iter().all(|e| e.owner == OwnerId::new("bob")));

    // A late snapshot on the old feed must not reach the list
    let _ = alice_feed
        .send(Ok(vec![doc("a", "Alice lunch", "alice")]))
        .await;
    bob_feed
        .send(Ok(vec![doc("b", "Bob lunch", "bob")]))
        .await
        .unwrap();

    let list = wait_for(&mut rx, |list| !list.is_empty()).await;
    assert_eq!(titles(&list), vec!["Bob lunch"]);
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(titles(&store.events()), vec!["Bob lunch"]);
}

#[tokio::test]
async fn signed_out_subscribe_serves_the_mirror() {
    let cache = Arc::new(MemoryCache::new());

    {
        let (remote, mut listeners) = ScriptedRemote::new();
        let session = Arc::new(Session::signed_in(OwnerId::new("alice")));
        let store = store_with(remote, cache.clone(), session);
        let mut rx = store.watch();

        store.subscribe(Some(OwnerId::new("alice"))).await;
        let (_, feed) = next_listener(&mut listeners).await;
        feed.send(Ok(vec![doc("a", "Lunch", "alice"), doc("b", "Gym", "alice")]))
            .await
            .unwrap();
        wait_for(&mut rx, |list| list.len() == 2).await;
    }

    let (remote, _listeners) = ScriptedRemote::new();
    let offline = store_with(remote.clone(), cache, Arc::new(Session::signed_out()));
    offline.subscribe(None).await;

    assert_eq!(titles(&offline.events()), vec!["Gym", "Lunch"]);
    assert!(remote.calls().is_empty());
}

#[tokio::test]
async fn each_snapshot_overwrites_the_mirror() {
    let (remote, mut listeners) = ScriptedRemote::new();
    let cache = Arc::new(MemoryCache::new());
    let session = Arc::new(Session::signed_in(OwnerId::new("alice")));
    let store = store_with(remote, cache.clone(), session);
    let mut rx = store.watch();

    store.subscribe(Some(OwnerId::new("alice"))).await;
    let (_, feed) = next_listener(&mut listeners).await;

    feed.send(Ok(vec![doc("a", "Lunch", "alice"), doc("b", "Gym", "alice")]))
        .await
        .unwrap();
    wait_for(&mut rx, |list| list.len() == 2).await;

    feed.send(Ok(vec![doc("b", "Gym", "alice")])).await.unwrap();
    wait_for(&mut rx, |list| list.len() == 1).await;

    let mirrored: Vec<Document> =
        serde_json::from_str(&cache.get(MIRROR_KEY).await.unwrap().unwrap()).unwrap();
    assert_eq!(mirrored, vec![doc("b", "Gym", "alice")]);
}

#[tokio::test]
async fn unsubscribe_stops_delivery() {
    let (remote, mut listeners) = ScriptedRemote::new();
    let session = Arc::new(Session::signed_in(OwnerId::new("alice")));
    let store = store_with(remote, Arc::new(MemoryCache::new()), session);
    let mut rx = store.watch();

    store.subscribe(Some(OwnerId::new("alice"))).await;
    let (_, feed) = next_listener(&mut listeners).await;
    feed.send(Ok(vec![doc("a", "Lunch", "alice")])).await.unwrap();
    wait_for(&mut rx, |list| list.len() == 1).await;

    store.unsubscribe().await;
    let _ = feed.send(Ok(vec![])).await;
    tokio::time::sleep(Duration::from_millis(50)).await;

    assert_eq!(titles(&store.events()), vec!["Lunch"]);
}

#[tokio::test]
async fn document_store_round_trip_through_the_feed() {
    let remote = Arc::new(DocumentStore::in_memory());
    remote
        .create(
            "events",
            record(json!({ "title": "Bob's", "startDate": "2024-03-01", "allDay": true, "ownerId": "bob" })),
        )
        .await
        .unwrap();

    let session = Arc::new(Session::signed_in(OwnerId::new("alice")));
    let store = store_with(remote, Arc::new(MemoryCache::new()), session);
    let mut rx = store.watch();
    let _following = store.follow_identity();

    store
        .create(
            &EventDraft::all_day("Trip", date("2024-03-01"))
                .with_end_date(date("2024-03-03"))
                .with_color("#34C759"),
        )
        .await
        .unwrap();

    let list = wait_for(&mut rx, |list| list.len() == 1).await;
    let mut trip = list[0].clone();
    assert_eq!(trip.title(), "Trip");
    assert_eq!(trip.owner, OwnerId::new("alice"));
    assert_eq!(trip.last_date(), date("2024-03-03"));

    trip.details.title = "Road trip".to_string();
    store.update(&trip).await.unwrap();
    wait_for(&mut rx, |list| titles(list) == vec!["Road trip"]).await;

    store.delete(&trip.id).await.unwrap();
    wait_for(&mut rx, |list| list.is_empty()).await;
}
