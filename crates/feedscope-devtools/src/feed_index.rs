//! Live table of known feeds.
//!
//! A [`FeedIndex`] subscription emits the full list of [`FeedSummary`] rows
//! on subscribe, whenever the store opens a feed and whenever a tracked feed
//! closes. Rows are created on first sighting and never removed.

use std::collections::HashSet;
use std::sync::Arc;

use feedscope_core::PublicKey;
use feedscope_feeds::{Feed, FeedEvent, FeedStore, SpaceManager};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::owner::{FeedOwner, OwnerCell, find_feed_owner};
use crate::subscription::{CancelRegistry, Emitter, Sink, Subscription};

/// Snapshot of a single feed.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedSummary {
    /// Feed key.
    pub feed_key: PublicKey,
    /// Declared number of blocks.
    pub length: u64,
    /// Stored size in bytes.
    pub byte_size: u64,
    /// Downloaded-block bitmap, LSB first.
    pub downloaded: Vec<u8>,
    /// Owning identity and device, once resolved.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner: Option<FeedOwner>,
}

/// Subscribes callers to feed summary snapshots.
#[derive(Clone)]
pub struct FeedIndex {
    store: Arc<dyn FeedStore>,
    spaces: Arc<dyn SpaceManager>,
}

impl FeedIndex {
    /// Index over `store`, resolving owners through `spaces`.
    pub fn new(store: Arc<dyn FeedStore>, spaces: Arc<dyn SpaceManager>) -> Self {
        Self { store, spaces }
    }

    /// Start a subscription. An empty `filter` tracks every feed.
    ///
    /// The first snapshot is delivered before this returns.
    pub fn subscribe(&self, filter: &[PublicKey], sink: Sink<Vec<FeedSummary>>) -> Subscription {
        let registry = Arc::new(CancelRegistry::new());
        let emitter = Emitter::new(CancellationToken::new(), sink);
        let subscription = emitter.subscription(Arc::clone(&registry));
        let shared = Arc::new(IndexShared {
            store: Arc::clone(&self.store),
            spaces: Arc::clone(&self.spaces),
            filter: filter.iter().cloned().collect(),
            registry: Arc::clone(&registry),
            emitter,
            table: Mutex::new(SummaryTable::default()),
        });

        let on_opened = Arc::clone(&shared);
        registry.add(self.store.on_feed_opened(Arc::new(move |key: &PublicKey| {
            debug!(feed = %key.truncate(), "feed opened, refreshing index");
            on_opened.recompute();
        })));

        shared.recompute();
        subscription
    }
}

struct Row {
    feed: Arc<dyn Feed>,
    owner: OwnerCell,
}

#[derive(Default)]
struct SummaryTable {
    rows: Vec<Row>,
    seen: HashSet<PublicKey>,
}

struct IndexShared {
    store: Arc<dyn FeedStore>,
    spaces: Arc<dyn SpaceManager>,
    filter: HashSet<PublicKey>,
    registry: Arc<CancelRegistry>,
    emitter: Emitter<Vec<FeedSummary>>,
    table: Mutex<SummaryTable>,
}

impl IndexShared {
    fn matches(&self, key: &PublicKey) -> bool {
        self.filter.is_empty() || self.filter.contains(key)
    }

    fn recompute(self: &Arc<Self>) {
        let _ = self.emitter.emit_with(|| self.summarize());
    }

    /// Track newly sighted feeds and build the current summaries.
    fn summarize(self: &Arc<Self>) -> Vec<FeedSummary> {
        let (summaries, sighted) = {
            let mut table = self.table.lock();
            let mut sighted = Vec::new();
            for feed in self.store.feeds() {
                if !self.matches(feed.key()) || table.seen.contains(feed.key()) {
                    continue;
                }
                let _ = table.seen.insert(feed.key().clone());
                table.rows.push(Row {
                    feed: Arc::clone(&feed),
                    owner: OwnerCell::new(),
                });
                sighted.push(feed);
            }

            let spaces = self.spaces.as_ref();
            let summaries: Vec<FeedSummary> = table
                .rows
                .iter_mut()
                .map(|row| {
                    let key = row.feed.key().clone();
                    let owner = row
                        .owner
                        .get_or_resolve(|| find_feed_owner(spaces, &key))
                        .cloned();
                    FeedSummary {
                        length: row.feed.length(),
                        byte_size: row.feed.byte_length(),
                        downloaded: row.feed.downloaded(),
                        feed_key: key,
                        owner,
                    }
                })
                .collect();
            (summaries, sighted)
        };

        for feed in sighted {
            let on_close = Arc::clone(self);
            let key = feed.key().truncate();
            self.registry.add(feed.on_event(Arc::new(move |event: &FeedEvent| {
                if *event == FeedEvent::Close {
                    debug!(feed = %key, "tracked feed closed, refreshing index");
                    on_close.recompute();
                }
            })));
        }

        debug!(rows = summaries.len(), "feed index recomputed");
        summaries
    }
}
