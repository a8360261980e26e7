//! In-memory feed store.

use std::sync::Arc;

use feedscope_core::PublicKey;
use parking_lot::RwLock;
use tracing::debug;

use crate::listeners::{Listener, ListenerSet, Unsubscribe};
use crate::memory::feed::MemoryFeed;
use crate::traits::{Feed, FeedStore};

/// Feed store keeping [`MemoryFeed`]s in open order.
#[derive(Default)]
pub struct MemoryFeedStore {
    feeds: RwLock<Vec<Arc<MemoryFeed>>>,
    opened: ListenerSet<PublicKey>,
}

impl MemoryFeedStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Open (or return the already opened) feed for `key`.
    ///
    /// `feedOpened` listeners fire only when the feed is new.
    pub fn open_feed(&self, key: PublicKey) -> Arc<MemoryFeed> {
        let feed = {
            let mut feeds = self.feeds.write();
            if let Some(existing) = feeds.iter().find(|f| f.key() == &key) {
                return Arc::clone(existing);
            }
            let feed = Arc::new(MemoryFeed::new(key.clone()));
            feeds.push(Arc::clone(&feed));
            feed
        };
        debug!(feed = %key.truncate(), "feed opened");
        self.opened.emit(&key);
        feed
    }

    /// Concrete handle for `key`.
    pub fn memory_feed(&self, key: &PublicKey) -> Option<Arc<MemoryFeed>> {
        self.feeds.read().iter().find(|f| f.key() == key).cloned()
    }

    /// Number of `feedOpened` listeners.
    pub fn listener_count(&self) -> usize {
        self.opened.len()
    }
}

impl FeedStore for MemoryFeedStore {
    fn feeds(&self) -> Vec<Arc<dyn Feed>> {
        self.feeds
            .read()
            .iter()
            .map(|f| Arc::clone(f) as Arc<dyn Feed>)
            .collect()
    }

    fn get_feed(&self, key: &PublicKey) -> Option<Arc<dyn Feed>> {
        self.memory_feed(key).map(|f| f as Arc<dyn Feed>)
    }

    fn on_feed_opened(&self, listener: Listener<PublicKey>) -> Unsubscribe {
        self.opened.add(listener)
    }
}
