//! In-memory feed and cursor.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use feedscope_core::{Block, BlockPayload, PublicKey, Timeframe};
use parking_lot::RwLock;
use tracing::debug;

use crate::errors::{FeedError, Result};
use crate::listeners::{Listener, ListenerSet, Unsubscribe};
use crate::traits::{Feed, FeedCursor, FeedEvent};

/// Counters of cursor acquisitions on a [`MemoryFeed`].
#[derive(Debug, Default)]
pub struct CursorStats {
    opened: AtomicUsize,
    closed: AtomicUsize,
}

impl CursorStats {
    /// Cursors successfully opened.
    pub fn opened(&self) -> usize {
        self.opened.load(Ordering::SeqCst)
    }

    /// Cursors closed after being opened.
    pub fn closed(&self) -> usize {
        self.closed.load(Ordering::SeqCst)
    }

    /// Cursors currently open.
    pub fn outstanding(&self) -> usize {
        self.opened().saturating_sub(self.closed())
    }
}

#[derive(Default)]
struct FeedState {
    blocks: Vec<Block>,
    block_sizes: Vec<u64>,
}

/// Feed held entirely in memory.
pub struct MemoryFeed {
    key: PublicKey,
    state: Arc<RwLock<FeedState>>,
    open: AtomicBool,
    fail_cursor_open: Arc<AtomicBool>,
    stats: Arc<CursorStats>,
    events: ListenerSet<FeedEvent>,
}

impl MemoryFeed {
    /// Create an empty, open feed.
    pub fn new(key: PublicKey) -> Self {
        Self {
            key,
            state: Arc::new(RwLock::new(FeedState::default())),
            open: AtomicBool::new(true),
            fail_cursor_open: Arc::new(AtomicBool::new(false)),
            stats: Arc::new(CursorStats::default()),
            events: ListenerSet::new(),
        }
    }

    /// Append a block. Its feed key and sequence must match this feed.
    pub fn append(&self, block: Block) -> Result<u64> {
        if !self.is_open() {
            return Err(FeedError::FeedClosed(self.key.truncate()));
        }
        if block.feed_key != self.key {
            return Err(FeedError::not_found(&block.feed_key));
        }
        let length = {
            let mut state = self.state.write();
            let expected = state.blocks.len() as u64;
            if block.seq != expected {
                return Err(FeedError::InvalidSequence {
                    feed: self.key.truncate(),
                    expected,
                    actual: block.seq,
                });
            }
            let size = serde_json::to_vec(&block.payload).map_or(0, |b| b.len() as u64);
            state.block_sizes.push(size);
            state.blocks.push(block);
            state.blocks.len() as u64
        };
        debug!(feed = %self.key.truncate(), length, "block appended");
        self.events.emit(&FeedEvent::Append { length });
        Ok(length - 1)
    }

    /// Append a payload at the next sequence number.
    pub fn append_payload(&self, payload: BlockPayload, timeframe: Timeframe) -> Result<u64> {
        let seq = self.length();
        let mut block = Block::new(self.key.clone(), seq).with_timeframe(timeframe);
        block.payload = payload;
        self.append(block)
    }

    /// Drop every block at or after `length`.
    pub fn truncate(&self, length: u64) {
        {
            let mut state = self.state.write();
            let keep = usize::try_from(length).unwrap_or(usize::MAX);
            state.blocks.truncate(keep);
            state.block_sizes.truncate(keep);
        }
        let length = self.length();
        debug!(feed = %self.key.truncate(), length, "feed truncated");
        self.events.emit(&FeedEvent::Truncate { length });
    }

    /// Close the handle. Closing twice only notifies once.
    pub fn close(&self) {
        if self.open.swap(false, Ordering::SeqCst) {
            debug!(feed = %self.key.truncate(), "feed closed");
            self.events.emit(&FeedEvent::Close);
        }
    }

    /// Make subsequent cursor opens fail.
    pub fn set_fail_cursor_open(&self, fail: bool) {
        self.fail_cursor_open.store(fail, Ordering::SeqCst);
    }

    /// Cursor acquisition counters.
    pub fn cursor_stats(&self) -> Arc<CursorStats> {
        Arc::clone(&self.stats)
    }

    /// Number of registered lifecycle listeners.
    pub fn listener_count(&self) -> usize {
        self.events.len()
    }
}

impl Feed for MemoryFeed {
    fn key(&self) -> &PublicKey {
        &self.key
    }

    fn length(&self) -> u64 {
        self.state.read().blocks.len() as u64
    }

    fn byte_length(&self) -> u64 {
        self.state.read().block_sizes.iter().sum()
    }

    fn downloaded(&self) -> Vec<u8> {
        let length = self.state.read().blocks.len();
        let mut bitmap = vec![0u8; length.div_ceil(8)];
        for i in 0..length {
            bitmap[i / 8] |= 1 << (i % 8);
        }
        bitmap
    }

    fn is_open(&self) -> bool {
        self.open.load(Ordering::SeqCst)
    }

    fn cursor(&self) -> Box<dyn FeedCursor> {
        Box::new(MemoryCursor {
            feed: self.key.truncate(),
            state: Arc::clone(&self.state),
            fail_open: Arc::clone(&self.fail_cursor_open),
            stats: Arc::clone(&self.stats),
            position: 0,
            open: false,
        })
    }

    fn on_event(&self, listener: Listener<FeedEvent>) -> Unsubscribe {
        self.events.add(listener)
    }
}

/// Cursor over a [`MemoryFeed`]. Reads the live block list, so blocks
/// appended after the cursor was opened are visible.
struct MemoryCursor {
    feed: String,
    state: Arc<RwLock<FeedState>>,
    fail_open: Arc<AtomicBool>,
    stats: Arc<CursorStats>,
    position: usize,
    open: bool,
}

impl FeedCursor for MemoryCursor {
    fn open(&mut self) -> Result<()> {
        if self.fail_open.load(Ordering::SeqCst) {
            return Err(FeedError::CursorOpen {
                feed: self.feed.clone(),
                reason: "storage unavailable".into(),
            });
        }
        if !self.open {
            self.open = true;
            let _ = self.stats.opened.fetch_add(1, Ordering::SeqCst);
        }
        Ok(())
    }

    fn next_block(&mut self) -> Result<Option<Block>> {
        if !self.open {
            return Err(FeedError::CursorClosed);
        }
        let block = self.state.read().blocks.get(self.position).cloned();
        if block.is_some() {
            self.position += 1;
        }
        Ok(block)
    }

    fn close(&mut self) {
        if self.open {
            self.open = false;
            let _ = self.stats.closed.fetch_add(1, Ordering::SeqCst);
        }
    }
}
