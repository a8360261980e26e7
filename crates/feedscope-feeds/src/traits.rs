//! Collaborator contracts consumed by the pipeline.
//!
//! The pipeline never owns feeds or spaces; it reads them through these
//! traits. [`crate::memory`] provides in-memory implementations.

use std::sync::Arc;

use feedscope_core::{Block, PublicKey};
use serde::{Deserialize, Serialize};

use crate::errors::Result;
use crate::listeners::{Listener, Unsubscribe};

// ─────────────────────────────────────────────────────────────────────────────
// Feeds
// ─────────────────────────────────────────────────────────────────────────────

/// Lifecycle event of a single feed.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FeedEvent {
    /// A block was appended; `length` is the new feed length.
    Append {
        /// Feed length after the append.
        length: u64,
    },
    /// The feed was truncated to `length` blocks.
    Truncate {
        /// Feed length after the truncation.
        length: u64,
    },
    /// The feed handle was closed.
    Close,
}

impl FeedEvent {
    /// Whether the event changes the feed's contents.
    pub fn is_mutation(&self) -> bool {
        matches!(self, Self::Append { .. } | Self::Truncate { .. })
    }
}

/// Sequential reader over a feed's blocks.
///
/// A cursor must be opened before reading and closed afterwards.
pub trait FeedCursor: Send {
    /// Acquire the underlying read handle.
    fn open(&mut self) -> Result<()>;

    /// Next block in sequence order, or `None` at the current end of the feed.
    fn next_block(&mut self) -> Result<Option<Block>>;

    /// Release the read handle. Closing twice is a no-op.
    fn close(&mut self);
}

/// An append-only replicated log.
pub trait Feed: Send + Sync {
    /// Feed key.
    fn key(&self) -> &PublicKey;

    /// Declared number of blocks.
    fn length(&self) -> u64;

    /// Stored size in bytes.
    fn byte_length(&self) -> u64;

    /// Bitmap of downloaded blocks, one bit per block, LSB first.
    fn downloaded(&self) -> Vec<u8>;

    /// Whether the handle is still open.
    fn is_open(&self) -> bool;

    /// Create an unopened cursor positioned at seq 0.
    fn cursor(&self) -> Box<dyn FeedCursor>;

    /// Register a lifecycle listener.
    fn on_event(&self, listener: Listener<FeedEvent>) -> Unsubscribe;
}

/// Store of opened feeds.
pub trait FeedStore: Send + Sync {
    /// Currently known feeds, in open order.
    fn feeds(&self) -> Vec<Arc<dyn Feed>>;

    /// Look up a feed by key.
    fn get_feed(&self, key: &PublicKey) -> Option<Arc<dyn Feed>>;

    /// Register a listener fired with the key of every newly opened feed.
    fn on_feed_opened(&self, listener: Listener<PublicKey>) -> Unsubscribe;
}

// ─────────────────────────────────────────────────────────────────────────────
// Spaces
// ─────────────────────────────────────────────────────────────────────────────

/// Admission assertion binding a feed to the identity and device that write it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedAssertion {
    /// Admitted feed.
    pub feed_key: PublicKey,
    /// Owning identity.
    pub identity_key: PublicKey,
    /// Writing device.
    pub device_key: PublicKey,
}

/// Snapshot of a space's state.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Space {
    /// Space key.
    pub key: PublicKey,
    /// Whether the space is currently open locally.
    #[serde(default)]
    pub is_open: bool,
    /// Display name from the space properties.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Feed admission table.
    #[serde(default)]
    pub feeds: Vec<FeedAssertion>,
    /// Feeds listed in the control pipeline state.
    #[serde(default)]
    pub control_feeds: Vec<PublicKey>,
}

impl Space {
    /// Assertion for `feed_key`, if admitted to this space.
    pub fn assertion_for(&self, feed_key: &PublicKey) -> Option<&FeedAssertion> {
        self.feeds.iter().find(|a| &a.feed_key == feed_key)
    }
}

/// Source of space state.
pub trait SpaceManager: Send + Sync {
    /// Snapshots of all known spaces.
    fn spaces(&self) -> Vec<Space>;

    /// Snapshot of a single space.
    fn space(&self, key: &PublicKey) -> Option<Space> {
        self.spaces().into_iter().find(|s| &s.key == key)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Identity
// ─────────────────────────────────────────────────────────────────────────────

/// A known remote identity.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Contact {
    /// Contact identity key.
    pub identity_key: PublicKey,
    /// Profile display name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
}

/// Local identity and contacts.
pub trait IdentityDirectory: Send + Sync {
    /// Local identity key, once an identity exists.
    fn identity_key(&self) -> Option<PublicKey>;

    /// Local device key.
    fn device_key(&self) -> Option<PublicKey>;

    /// Known contacts.
    fn contacts(&self) -> Vec<Contact>;
}
