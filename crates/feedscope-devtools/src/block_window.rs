//! Bounded window of recent blocks across one or more feeds.
//!
//! Target feeds are resolved once, when the subscription starts. The first
//! window is emitted from a one-shot task spawned on the Tokio runtime after
//! the settle delay; later windows are recomputed synchronously from the
//! append and truncate events of the resolved feeds. Each recompute reads
//! and delivers under the subscription's delivery gate, so a window never
//! reaches the sink after a newer one.

use std::sync::Arc;
use std::time::Duration;

use feedscope_core::{Block, PublicKey};
use feedscope_feeds::{Feed, FeedCursor, FeedEvent, FeedStore, SpaceManager};
use feedscope_settings::DevtoolsSettings;
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::subscription::{CancelRegistry, Emitter, Sink, Subscription};

/// Default number of blocks kept in a window.
pub const DEFAULT_MAX_BLOCKS: usize = 10;

/// What a block window reads from.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", tag = "kind", content = "key")]
pub enum BlockTarget {
    /// A single feed.
    Feed(PublicKey),
    /// The control-pipeline feeds of a space.
    Space(PublicKey),
}

/// Window tuning.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BlockWindowOptions {
    /// Blocks kept when the caller does not choose.
    pub default_max_blocks: usize,
    /// Wait before the first window is read.
    pub settle_delay: Duration,
}

impl Default for BlockWindowOptions {
    fn default() -> Self {
        Self {
            default_max_blocks: DEFAULT_MAX_BLOCKS,
            settle_delay: Duration::ZERO,
        }
    }
}

impl From<&DevtoolsSettings> for BlockWindowOptions {
    fn from(settings: &DevtoolsSettings) -> Self {
        Self {
            default_max_blocks: settings.default_max_blocks,
            settle_delay: Duration::from_millis(settings.initial_emit_delay_ms),
        }
    }
}

/// Subscribes callers to recent-block windows.
#[derive(Clone)]
pub struct BlockWindow {
    store: Arc<dyn FeedStore>,
    spaces: Arc<dyn SpaceManager>,
    options: BlockWindowOptions,
}

impl BlockWindow {
    /// Window reader over `store`, resolving space targets through `spaces`.
    pub fn new(store: Arc<dyn FeedStore>, spaces: Arc<dyn SpaceManager>) -> Self {
        Self::with_options(store, spaces, BlockWindowOptions::default())
    }

    /// Window reader with explicit options.
    pub fn with_options(
        store: Arc<dyn FeedStore>,
        spaces: Arc<dyn SpaceManager>,
        options: BlockWindowOptions,
    ) -> Self {
        Self {
            store,
            spaces,
            options,
        }
    }

    /// Feed keys a target reads from.
    ///
    /// A space target resolves to its control-pipeline feeds; an unknown
    /// space resolves to nothing.
    pub fn resolve_targets(&self, target: &BlockTarget) -> Vec<PublicKey> {
        match target {
            BlockTarget::Feed(key) => vec![key.clone()],
            BlockTarget::Space(key) => self
                .spaces
                .space(key)
                .map(|space| space.control_feeds)
                .unwrap_or_default(),
        }
    }

    /// Start a subscription keeping the last `max_blocks` blocks, or the
    /// configured default when `None`.
    ///
    /// Must be called from within a Tokio runtime unless the target
    /// resolves to no feeds.
    pub fn subscribe(
        &self,
        target: &BlockTarget,
        max_blocks: Option<usize>,
        sink: Sink<Vec<Block>>,
    ) -> Subscription {
        let keys = self.resolve_targets(target);
        if keys.is_empty() {
            debug!(?target, "no feeds resolved, block window is inert");
            return Subscription::inert(sink);
        }

        let token = CancellationToken::new();
        let registry = Arc::new(CancelRegistry::new());
        let emitter = Emitter::new(token.clone(), sink);
        let subscription = emitter.subscription(Arc::clone(&registry));
        let shared = Arc::new(WindowShared {
            store: Arc::clone(&self.store),
            keys,
            max_blocks: max_blocks.unwrap_or(self.options.default_max_blocks),
            registry: Arc::clone(&registry),
            emitter,
        });

        let delay = self.options.settle_delay;
        let cancel = token;
        let handle = tokio::spawn(async move {
            tokio::select! {
                biased;
                () = cancel.cancelled() => {
                    debug!("block window cancelled before kick-off");
                }
                () = tokio::time::sleep(delay) => shared.start(),
            }
        });
        registry.add(Box::new(move || handle.abort()));

        subscription
    }
}

struct WindowShared {
    store: Arc<dyn FeedStore>,
    keys: Vec<PublicKey>,
    max_blocks: usize,
    registry: Arc<CancelRegistry>,
    emitter: Emitter<Vec<Block>>,
}

impl WindowShared {
    fn start(self: &Arc<Self>) {
        if self.emitter.is_cancelled() {
            return;
        }

        let feeds: Vec<Arc<dyn Feed>> = self
            .keys
            .iter()
            .filter_map(|key| {
                let feed = self.store.get_feed(key);
                if feed.is_none() {
                    debug!(feed = %key.truncate(), "resolved feed not in store, skipping");
                }
                feed
            })
            .collect();
        let feeds = Arc::new(feeds);

        for feed in feeds.iter() {
            let shared = Arc::clone(self);
            let feeds = Arc::clone(&feeds);
            self.registry.add(feed.on_event(Arc::new(move |event: &FeedEvent| {
                if event.is_mutation() {
                    shared.recompute(&feeds);
                }
            })));
        }

        self.recompute(&feeds);
    }

    fn recompute(&self, feeds: &[Arc<dyn Feed>]) {
        let _ = self.emitter.emit_with(|| {
            let window = read_window(feeds, self.max_blocks);
            debug!(
                feeds = feeds.len(),
                blocks = window.len(),
                "block window recomputed"
            );
            window
        });
    }
}

/// Read every feed in order and keep the last `max_blocks` blocks of the
/// concatenation.
pub fn read_window(feeds: &[Arc<dyn Feed>], max_blocks: usize) -> Vec<Block> {
    let mut blocks: Vec<Block> = feeds.iter().flat_map(|feed| read_feed(feed.as_ref())).collect();
    let excess = blocks.len().saturating_sub(max_blocks);
    let _ = blocks.drain(..excess);
    blocks
}

/// Read a feed from the start up to its declared length.
///
/// A cursor that fails to open contributes no blocks.
pub fn read_feed(feed: &dyn Feed) -> Vec<Block> {
    let length = feed.length();
    if length == 0 {
        return Vec::new();
    }

    let mut cursor = match ScopedCursor::open(feed.cursor()) {
        Ok(cursor) => cursor,
        Err(error) => {
            warn!(feed = %feed.key().truncate(), %error, "failed to open feed cursor");
            return Vec::new();
        }
    };

    let mut blocks = Vec::new();
    while (blocks.len() as u64) < length {
        match cursor.next_block() {
            Ok(Some(block)) => blocks.push(block),
            Ok(None) => break,
            Err(error) => {
                warn!(feed = %feed.key().truncate(), %error, "feed read stopped early");
                break;
            }
        }
    }
    blocks
}

/// Cursor closed when dropped.
struct ScopedCursor {
    cursor: Box<dyn FeedCursor>,
}

impl ScopedCursor {
    fn open(cursor: Box<dyn FeedCursor>) -> feedscope_feeds::Result<Self> {
        let mut scoped = Self { cursor };
        scoped.cursor.open()?;
        Ok(scoped)
    }

    fn next_block(&mut self) -> feedscope_feeds::Result<Option<Block>> {
        self.cursor.next_block()
    }
}

impl Drop for ScopedCursor {
    fn drop(&mut self) {
        self.cursor.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use feedscope_core::{BlockPayload, Timeframe};
    use feedscope_feeds::memory::{MemoryFeed, MemoryFeedStore, MemorySpaceManager};

    fn key(b: u8) -> PublicKey {
        PublicKey::from_bytes(vec![b; 4])
    }

    fn filled(k: u8, n: usize) -> Arc<MemoryFeed> {
        let feed = Arc::new(MemoryFeed::new(key(k)));
        for _ in 0..n {
            let _ = feed
                .append_payload(BlockPayload::default(), Timeframe::new())
                .unwrap();
        }
        feed
    }

    fn seqs(blocks: &[Block]) -> Vec<(PublicKey, u64)> {
        blocks.iter().map(|b| (b.feed_key.clone(), b.seq)).collect()
    }

    #[test]
    fn window_keeps_tail_of_concatenation() {
        let a = filled(1, 3);
        let b = filled(2, 2);
        let feeds: Vec<Arc<dyn Feed>> = vec![a, b];
        let window = read_window(&feeds, 3);
        assert_eq!(
            seqs(&window),
            vec![(key(1), 2), (key(2), 0), (key(2), 1)]
        );
    }

    #[test]
    fn zero_max_blocks_is_empty() {
        let feeds: Vec<Arc<dyn Feed>> = vec![filled(1, 3)];
        assert!(read_window(&feeds, 0).is_empty());
    }

    #[test]
    fn empty_feed_opens_no_cursor() {
        let feed = filled(1, 0);
        assert!(read_feed(feed.as_ref()).is_empty());
        assert_eq!(feed.cursor_stats().opened(), 0);
    }

    #[test]
    fn cursor_closed_after_read() {
        let feed = filled(1, 4);
        assert_eq!(read_feed(feed.as_ref()).len(), 4);
        assert_eq!(feed.cursor_stats().opened(), 1);
        assert_eq!(feed.cursor_stats().outstanding(), 0);
    }

    #[test]
    fn failed_cursor_contributes_nothing() {
        let feed = filled(1, 2);
        feed.set_fail_cursor_open(true);
        let (logs, _guard) = feedscope_core::logging::capture_logs();
        assert!(read_feed(feed.as_ref()).is_empty());
        assert!(logs.has_event(tracing::Level::WARN, "failed to open feed cursor"));
    }

    #[test]
    fn space_target_resolves_control_feeds() {
        let spaces = Arc::new(MemorySpaceManager::new());
        spaces.create_space(key(10));
        let _ = spaces.add_control_feed(&key(10), key(1));
        let _ = spaces.add_control_feed(&key(10), key(2));
        let window = BlockWindow::new(Arc::new(MemoryFeedStore::new()), spaces);

        assert_eq!(
            window.resolve_targets(&BlockTarget::Space(key(10))),
            vec![key(1), key(2)]
        );
        assert!(window.resolve_targets(&BlockTarget::Space(key(11))).is_empty());
        assert_eq!(
            window.resolve_targets(&BlockTarget::Feed(key(3))),
            vec![key(3)]
        );
    }

    #[test]
    fn options_from_settings() {
        let settings = DevtoolsSettings {
            default_max_blocks: 25,
            initial_emit_delay_ms: 40,
        };
        let options = BlockWindowOptions::from(&settings);
        assert_eq!(options.default_max_blocks, 25);
        assert_eq!(options.settle_delay, Duration::from_millis(40));
    }
}
