//! End-to-end behavior of the devtools pipeline over the in-memory
//! collaborators.

#![allow(missing_docs, unused_results)]

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use assert_matches::assert_matches;
use feedscope_core::{Block, BlockPayload, Credential, MutationRecord, ObjectId, PublicKey, Timeframe};
use feedscope_devtools::{
    BlockTarget, BlockWindowOptions, DevtoolsService, FeedSummary, GraphData, NodeId, Sink,
    ValidationError,
};
use feedscope_feeds::memory::{
    MemoryFeed, MemoryFeedStore, MemoryIdentityDirectory, MemorySpaceManager,
};
use feedscope_feeds::{FeedAssertion, FeedStore, IdentityDirectory, SpaceManager};
use futures::StreamExt;
use parking_lot::Mutex;
use serde_json::json;

fn key(b: u8) -> PublicKey {
    PublicKey::from_bytes(vec![b; 4])
}

struct Harness {
    store: Arc<MemoryFeedStore>,
    spaces: Arc<MemorySpaceManager>,
    identity: Arc<MemoryIdentityDirectory>,
    service: DevtoolsService,
}

impl Harness {
    fn new() -> Self {
        Self::with_delay(Duration::ZERO)
    }

    fn with_delay(settle_delay: Duration) -> Self {
        let store = Arc::new(MemoryFeedStore::new());
        let spaces = Arc::new(MemorySpaceManager::new());
        let identity = Arc::new(MemoryIdentityDirectory::new(Some(key(90)), Some(key(91))));
        let service = DevtoolsService::with_options(
            Arc::clone(&store) as Arc<dyn FeedStore>,
            Arc::clone(&spaces) as Arc<dyn SpaceManager>,
            Arc::clone(&identity) as Arc<dyn IdentityDirectory>,
            BlockWindowOptions {
                default_max_blocks: 10,
                settle_delay,
            },
        );
        Self {
            store,
            spaces,
            identity,
            service,
        }
    }

    fn feed_with_blocks(&self, k: u8, n: usize) -> Arc<MemoryFeed> {
        let feed = self.store.open_feed(key(k));
        for _ in 0..n {
            let _ = feed
                .append_payload(BlockPayload::default(), Timeframe::new())
                .unwrap();
        }
        feed
    }
}

fn recorder<T: Send + 'static>() -> (Arc<Mutex<Vec<T>>>, Sink<T>) {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let s = Arc::clone(&seen);
    (seen, Arc::new(move |item: T| s.lock().push(item)))
}

async fn settle() {
    tokio::time::sleep(Duration::from_millis(5)).await;
}

fn feed_keys(rows: &[FeedSummary]) -> Vec<PublicKey> {
    rows.iter().map(|r| r.feed_key.clone()).collect()
}

fn block_ids(blocks: &[Block]) -> Vec<(PublicKey, u64)> {
    blocks.iter().map(|b| (b.feed_key.clone(), b.seq)).collect()
}

// ─────────────────────────────────────────────────────────────────────────────
// Feed index
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn newly_opened_feed_triggers_emission() {
    let h = Harness::new();
    let _ = h.feed_with_blocks(1, 1);
    let (seen, sink) = recorder();
    let _sub = h.service.list_feeds(&[], sink);

    let _ = h.store.open_feed(key(2));

    let seen = seen.lock();
    assert_eq!(seen.len(), 2);
    assert_eq!(feed_keys(&seen[1]), vec![key(1), key(2)]);
}

#[test]
fn closed_feed_keeps_its_row() {
    let h = Harness::new();
    let feed = h.feed_with_blocks(1, 3);
    let (seen, sink) = recorder();
    let _sub = h.service.list_feeds(&[], sink);

    feed.close();

    let seen = seen.lock();
    assert_eq!(seen.len(), 2);
    assert_eq!(feed_keys(&seen[1]), vec![key(1)]);
    assert_eq!(seen[1][0].length, 3);
}

#[test]
fn resolved_owner_stays_cached() {
    let h = Harness::new();
    h.spaces.create_space(key(100));
    let _ = h.spaces.admit_feed(
        &key(100),
        FeedAssertion {
            feed_key: key(1),
            identity_key: key(2),
            device_key: key(3),
        },
    );
    let _ = h.feed_with_blocks(1, 1);
    let (seen, sink) = recorder();
    let _sub = h.service.list_feeds(&[], sink);

    h.spaces.revoke_feed(&key(1));
    let _ = h.store.open_feed(key(4));

    let seen = seen.lock();
    let latest = seen.last().unwrap();
    assert_eq!(latest[0].owner.as_ref().unwrap().identity_key, key(2));
    assert!(latest[1].owner.is_none());
}

#[test]
fn unresolved_owner_is_retried() {
    let h = Harness::new();
    h.spaces.create_space(key(100));
    let _ = h.feed_with_blocks(1, 1);
    let (seen, sink) = recorder();
    let _sub = h.service.list_feeds(&[], sink);
    assert!(seen.lock()[0][0].owner.is_none());

    let _ = h.spaces.admit_feed(
        &key(100),
        FeedAssertion {
            feed_key: key(1),
            identity_key: key(2),
            device_key: key(3),
        },
    );
    let _ = h.store.open_feed(key(4));
    assert!(seen.lock()[1][0].owner.is_some());
}

#[test]
fn filtered_index_ignores_other_feeds() {
    let h = Harness::new();
    let _ = h.feed_with_blocks(1, 1);
    let (seen, sink) = recorder();
    let _sub = h.service.list_feeds(&[key(1)], sink);

    let _ = h.store.open_feed(key(2));

    let seen = seen.lock();
    assert!(seen.iter().all(|rows| feed_keys(rows) == vec![key(1)]));
}

#[tokio::test]
async fn feed_list_stream_yields_snapshots() {
    let h = Harness::new();
    let _ = h.feed_with_blocks(1, 1);
    let mut stream = h.service.list_feeds_stream(&[]);
    let _ = h.store.open_feed(key(2));

    assert_eq!(feed_keys(&stream.next().await.unwrap()), vec![key(1)]);
    assert_eq!(
        feed_keys(&stream.next().await.unwrap()),
        vec![key(1), key(2)]
    );

    drop(stream);
    assert_eq!(h.store.listener_count(), 0);
}

// ─────────────────────────────────────────────────────────────────────────────
// Block window
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::test(start_paused = true)]
async fn first_window_is_deferred() {
    let h = Harness::new();
    let _ = h.feed_with_blocks(1, 3);
    let (seen, sink) = recorder();
    let _sub = h
        .service
        .stream_recent_blocks(&BlockTarget::Feed(key(1)), None, sink);

    assert!(seen.lock().is_empty());
    settle().await;
    let seen = seen.lock();
    assert_eq!(seen.len(), 1);
    assert_eq!(
        block_ids(&seen[0]),
        vec![(key(1), 0), (key(1), 1), (key(1), 2)]
    );
}

#[tokio::test(start_paused = true)]
async fn cancel_before_kickoff_emits_nothing() {
    let h = Harness::with_delay(Duration::from_millis(50));
    let feed = h.feed_with_blocks(1, 3);
    let (seen, sink) = recorder();
    let sub = h
        .service
        .stream_recent_blocks(&BlockTarget::Feed(key(1)), None, sink);

    sub.cancel();
    tokio::time::sleep(Duration::from_millis(200)).await;
    let _ = feed
        .append_payload(BlockPayload::default(), Timeframe::new())
        .unwrap();

    assert!(seen.lock().is_empty());
    assert_eq!(feed.listener_count(), 0);
    assert_eq!(feed.cursor_stats().opened(), 0);
}

#[tokio::test(start_paused = true)]
async fn unresolvable_target_never_emits() {
    let h = Harness::new();
    h.spaces.create_space(key(100));
    let (seen, sink) = recorder();
    let sub = h
        .service
        .stream_recent_blocks(&BlockTarget::Space(key(100)), None, sink);

    settle().await;
    assert!(seen.lock().is_empty());
    sub.cancel();
    sub.cancel();
    assert!(sub.is_cancelled());
}

#[tokio::test(start_paused = true)]
async fn unresolvable_stream_stays_open_until_cancelled() {
    let h = Harness::new();
    let target = BlockTarget::Space(key(100));
    assert!(h.service.resolve_targets(&target).is_empty());
    let mut stream = h.service.recent_blocks_stream(&target, None);

    let pending = tokio::time::timeout(Duration::from_secs(1), stream.next()).await;
    assert!(pending.is_err());
    stream.cancel();
    assert!(stream.next().await.is_none());
}

#[tokio::test(start_paused = true)]
async fn append_reemits_window() {
    let h = Harness::new();
    let feed = h.feed_with_blocks(1, 2);
    let (seen, sink) = recorder();
    let _sub = h
        .service
        .stream_recent_blocks(&BlockTarget::Feed(key(1)), Some(2), sink);
    settle().await;

    let _ = feed
        .append_payload(BlockPayload::default(), Timeframe::new())
        .unwrap();
    feed.truncate(1);

    let seen = seen.lock();
    assert_eq!(seen.len(), 3);
    assert_eq!(block_ids(&seen[1]), vec![(key(1), 1), (key(1), 2)]);
    assert_eq!(block_ids(&seen[2]), vec![(key(1), 0)]);
}

#[tokio::test(start_paused = true)]
async fn space_window_concatenates_control_feeds() {
    let h = Harness::new();
    let _ = h.feed_with_blocks(1, 3);
    let _ = h.feed_with_blocks(2, 3);
    h.spaces.create_space(key(100));
    let _ = h.spaces.add_control_feed(&key(100), key(1));
    let _ = h.spaces.add_control_feed(&key(100), key(2));
    let _ = h.spaces.add_control_feed(&key(100), key(3));

    let (seen, sink) = recorder();
    let _sub = h
        .service
        .stream_recent_blocks(&BlockTarget::Space(key(100)), Some(4), sink);
    settle().await;

    assert_eq!(
        block_ids(&seen.lock()[0]),
        vec![(key(1), 2), (key(2), 0), (key(2), 1), (key(2), 2)]
    );
}

#[tokio::test(start_paused = true)]
async fn every_cursor_is_released() {
    let h = Harness::new();
    let a = h.feed_with_blocks(1, 5);
    let b = h.feed_with_blocks(2, 0);
    h.spaces.create_space(key(100));
    let _ = h.spaces.add_control_feed(&key(100), key(1));
    let _ = h.spaces.add_control_feed(&key(100), key(2));

    let (_seen, sink) = recorder::<Vec<Block>>();
    let _sub = h
        .service
        .stream_recent_blocks(&BlockTarget::Space(key(100)), Some(2), sink);
    settle().await;
    let _ = a
        .append_payload(BlockPayload::default(), Timeframe::new())
        .unwrap();

    assert_eq!(a.cursor_stats().opened(), 2);
    assert_eq!(a.cursor_stats().outstanding(), 0);
    assert_eq!(b.cursor_stats().opened(), 0);
}

#[tokio::test(start_paused = true)]
async fn failed_cursor_still_emits() {
    let h = Harness::new();
    let feed = h.feed_with_blocks(1, 2);
    feed.set_fail_cursor_open(true);
    let (seen, sink) = recorder();
    let _sub = h
        .service
        .stream_recent_blocks(&BlockTarget::Feed(key(1)), None, sink);
    settle().await;

    let seen = seen.lock();
    assert_eq!(seen.len(), 1);
    assert!(seen[0].is_empty());
}

#[tokio::test(start_paused = true)]
async fn no_emissions_after_cancel() {
    let h = Harness::new();
    let feed = h.feed_with_blocks(1, 1);
    let (seen, sink) = recorder::<Vec<Block>>();
    let sub = h
        .service
        .stream_recent_blocks(&BlockTarget::Feed(key(1)), None, sink);
    settle().await;
    assert_eq!(seen.lock().len(), 1);

    sub.cancel();
    let _ = feed
        .append_payload(BlockPayload::default(), Timeframe::new())
        .unwrap();
    assert_eq!(seen.lock().len(), 1);
    assert_eq!(feed.listener_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn block_stream_cancels_on_drop() {
    let h = Harness::new();
    let feed = h.feed_with_blocks(1, 1);
    let mut stream = h
        .service
        .recent_blocks_stream(&BlockTarget::Feed(key(1)), None);

    assert_eq!(stream.next().await.unwrap().len(), 1);
    assert_eq!(feed.listener_count(), 1);
    drop(stream);
    assert_eq!(feed.listener_count(), 0);
}

/// Sink recording window sizes that stalls on its first delivery, plus a
/// flag raised once that delivery has started.
fn stalling_recorder(stall: Duration) -> (Arc<AtomicBool>, Arc<Mutex<Vec<usize>>>, Sink<Vec<Block>>) {
    let entered = Arc::new(AtomicBool::new(false));
    let lengths = Arc::new(Mutex::new(Vec::new()));
    let (e, l) = (Arc::clone(&entered), Arc::clone(&lengths));
    let sink: Sink<Vec<Block>> = Arc::new(move |blocks: Vec<Block>| {
        if !e.swap(true, Ordering::SeqCst) {
            std::thread::sleep(stall);
        }
        l.lock().push(blocks.len());
    });
    (entered, lengths, sink)
}

async fn wait_for(flag: &AtomicBool) {
    while !flag.load(Ordering::SeqCst) {
        tokio::time::sleep(Duration::from_millis(1)).await;
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn append_during_first_delivery_lands_after_it() {
    let h = Harness::new();
    let feed = h.feed_with_blocks(1, 3);
    let (entered, lengths, sink) = stalling_recorder(Duration::from_millis(300));
    let _sub = h
        .service
        .stream_recent_blocks(&BlockTarget::Feed(key(1)), None, sink);

    wait_for(&entered).await;
    let appender = Arc::clone(&feed);
    tokio::task::spawn_blocking(move || {
        appender
            .append_payload(BlockPayload::default(), Timeframe::new())
            .unwrap();
    })
    .await
    .unwrap();

    assert_eq!(*lengths.lock(), vec![3, 4]);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn cancel_during_delivery_stops_later_windows() {
    let h = Harness::new();
    let feed = h.feed_with_blocks(1, 3);
    let (entered, lengths, sink) = stalling_recorder(Duration::from_millis(200));
    let sub = h
        .service
        .stream_recent_blocks(&BlockTarget::Feed(key(1)), None, sink);

    wait_for(&entered).await;
    let canceller = sub.clone();
    tokio::task::spawn_blocking(move || canceller.cancel())
        .await
        .unwrap();
    assert_eq!(*lengths.lock(), vec![3]);

    feed.append_payload(BlockPayload::default(), Timeframe::new())
        .unwrap();
    assert_eq!(*lengths.lock(), vec![3]);
    assert_eq!(feed.listener_count(), 0);
}

// ─────────────────────────────────────────────────────────────────────────────
// Graphs
// ─────────────────────────────────────────────────────────────────────────────

fn credential_feed(h: &Harness) -> Arc<MemoryFeed> {
    let feed = h.store.open_feed(key(1));
    let credential = Credential::new(key(100), key(2), "dxos.halo.credentials.SpaceMember")
        .signed_by(key(91));
    let _ = feed
        .append(Block::new(key(1), 0).with_credential(credential))
        .unwrap();
    let _ = feed
        .append(
            Block::new(key(1), 1).with_timeframe(Timeframe::from_frames([(key(5), 3)])),
        )
        .unwrap();
    feed
}

#[tokio::test(start_paused = true)]
async fn graph_stream_labels_credentials() {
    let h = Harness::new();
    h.spaces.create_space(key(100));
    let _ = h.spaces.set_properties(&key(100), Some("Team".into()), true);
    h.identity.add_contact(key(2), Some("Alice".into()));
    let _ = credential_feed(&h);

    let mut stream = h
        .service
        .block_graph_stream(&BlockTarget::Feed(key(1)), None);
    let graph: GraphData = stream.next().await.unwrap();

    assert_eq!(graph.nodes.len(), 3);
    assert_eq!(graph.edges.len(), 2);
    let content = graph
        .node(&NodeId::new(key(1), 0))
        .and_then(|n| n.content.clone())
        .unwrap();
    assert_eq!(content.credential_type, "dxos.halo.credentials.SpaceMember");
    assert_eq!(content.issuer, "Team");
    assert_eq!(content.subject, "Alice (02020202)");
}

#[tokio::test(start_paused = true)]
async fn graph_model_tracks_latest_window() {
    let h = Harness::new();
    let feed = credential_feed(&h);
    let mut model = h
        .service
        .block_graph_model(&BlockTarget::Feed(key(1)), None);

    assert!(model.changed().await);
    assert_eq!(model.graph().nodes.len(), 3);

    let _ = feed
        .append_payload(BlockPayload::default(), Timeframe::new())
        .unwrap();
    assert!(model.changed().await);
    assert_eq!(model.graph().nodes.len(), 4);

    drop(model);
    assert_eq!(feed.listener_count(), 0);
}

// ─────────────────────────────────────────────────────────────────────────────
// Reducer
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn reduce_keeps_last_record_per_id() {
    let h = Harness::new();
    let a = ObjectId::new().to_string();
    let b = ObjectId::new().to_string();
    let records = vec![
        MutationRecord::new(&a, "example.Task", json!({ "title": "one" })),
        MutationRecord::new(&b, "example.Task", json!({ "title": "two" })),
        MutationRecord::new(&a, "example.Task", json!({ "title": "three" })),
    ];

    let map = h.service.reduce_mutations(&records).unwrap();
    assert_eq!(map.len(), 2);
    assert_eq!(map[&a].payload["title"], "three");
    assert_eq!(map[&b].payload["title"], "two");
}

#[test]
fn reduce_rejects_whole_batch() {
    let h = Harness::new();
    let records = vec![
        MutationRecord::new(ObjectId::new().to_string(), "example.Task", json!({})),
        MutationRecord::new("bad id", "example.Task", json!({})),
    ];
    assert_matches!(
        h.service.reduce_mutations(&records),
        Err(ValidationError::InvalidObjectId { index: 1, .. })
    );
}
