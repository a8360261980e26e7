//! Feed ownership resolution.

use feedscope_core::PublicKey;
use feedscope_feeds::SpaceManager;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Identity and device that write a feed.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedOwner {
    /// Owning identity.
    pub identity_key: PublicKey,
    /// Writing device.
    pub device_key: PublicKey,
}

/// Scan every known space's admission table for `feed_key`.
///
/// The first matching assertion wins.
pub fn find_feed_owner(spaces: &dyn SpaceManager, feed_key: &PublicKey) -> Option<FeedOwner> {
    let spaces = spaces.spaces();
    let owner = spaces
        .iter()
        .find_map(|space| space.assertion_for(feed_key))
        .map(|assertion| FeedOwner {
            identity_key: assertion.identity_key.clone(),
            device_key: assertion.device_key.clone(),
        });
    debug!(
        feed = %feed_key.truncate(),
        spaces = spaces.len(),
        found = owner.is_some(),
        "owner lookup"
    );
    owner
}

/// Lazily resolved owner that is cached once found.
///
/// An empty resolution is not cached, so later lookups retry. A cached
/// owner is never invalidated.
#[derive(Debug, Default)]
pub struct OwnerCell {
    resolved: Option<FeedOwner>,
}

impl OwnerCell {
    /// Create an unresolved cell.
    pub fn new() -> Self {
        Self::default()
    }

    /// Cached owner, resolving with `resolve` if none is cached yet.
    pub fn get_or_resolve(
        &mut self,
        resolve: impl FnOnce() -> Option<FeedOwner>,
    ) -> Option<&FeedOwner> {
        if self.resolved.is_none() {
            self.resolved = resolve();
        }
        self.resolved.as_ref()
    }
}
