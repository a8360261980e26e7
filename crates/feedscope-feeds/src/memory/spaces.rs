//! In-memory space manager and identity directory.

use feedscope_core::PublicKey;
use parking_lot::RwLock;

use crate::traits::{Contact, FeedAssertion, IdentityDirectory, Space, SpaceManager};

/// Space manager backed by a list of [`Space`] snapshots.
#[derive(Default)]
pub struct MemorySpaceManager {
    spaces: RwLock<Vec<Space>>,
}

impl MemorySpaceManager {
    /// Create an empty manager.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add (or replace) a space.
    pub fn upsert_space(&self, space: Space) {
        let mut spaces = self.spaces.write();
        if let Some(existing) = spaces.iter_mut().find(|s| s.key == space.key) {
            *existing = space;
        } else {
            spaces.push(space);
        }
    }

    /// Add an open, unnamed, empty space.
    pub fn create_space(&self, key: PublicKey) {
        self.upsert_space(Space {
            key,
            is_open: true,
            name: None,
            feeds: Vec::new(),
            control_feeds: Vec::new(),
        });
    }

    /// Admit `assertion.feed_key` to `space_key`. Returns `false` if the
    /// space is unknown.
    pub fn admit_feed(&self, space_key: &PublicKey, assertion: FeedAssertion) -> bool {
        self.with_space(space_key, |space| {
            space.feeds.retain(|a| a.feed_key != assertion.feed_key);
            space.feeds.push(assertion);
        })
    }

    /// Remove every admission for `feed_key` from every space.
    pub fn revoke_feed(&self, feed_key: &PublicKey) {
        for space in self.spaces.write().iter_mut() {
            space.feeds.retain(|a| &a.feed_key != feed_key);
        }
    }

    /// Add `feed_key` to the space's control pipeline.
    pub fn add_control_feed(&self, space_key: &PublicKey, feed_key: PublicKey) -> bool {
        self.with_space(space_key, |space| {
            if !space.control_feeds.contains(&feed_key) {
                space.control_feeds.push(feed_key);
            }
        })
    }

    /// Set the space's display name and open state.
    pub fn set_properties(&self, space_key: &PublicKey, name: Option<String>, is_open: bool) -> bool {
        self.with_space(space_key, |space| {
            space.name = name;
            space.is_open = is_open;
        })
    }

    fn with_space(&self, key: &PublicKey, f: impl FnOnce(&mut Space)) -> bool {
        let mut spaces = self.spaces.write();
        match spaces.iter_mut().find(|s| &s.key == key) {
            Some(space) => {
                f(space);
                true
            }
            None => false,
        }
    }
}

impl SpaceManager for MemorySpaceManager {
    fn spaces(&self) -> Vec<Space> {
        self.spaces.read().clone()
    }

    fn space(&self, key: &PublicKey) -> Option<Space> {
        self.spaces.read().iter().find(|s| &s.key == key).cloned()
    }
}

/// Identity directory with a fixed local identity and a contact list.
#[derive(Default)]
pub struct MemoryIdentityDirectory {
    identity_key: Option<PublicKey>,
    device_key: Option<PublicKey>,
    contacts: RwLock<Vec<Contact>>,
}

impl MemoryIdentityDirectory {
    /// Directory for the given local identity and device.
    pub fn new(identity_key: Option<PublicKey>, device_key: Option<PublicKey>) -> Self {
        Self {
            identity_key,
            device_key,
            contacts: RwLock::new(Vec::new()),
        }
    }

    /// Add a contact.
    pub fn add_contact(&self, identity_key: PublicKey, display_name: Option<String>) {
        self.contacts.write().push(Contact {
            identity_key,
            display_name,
        });
    }
}

impl IdentityDirectory for MemoryIdentityDirectory {
    fn identity_key(&self) -> Option<PublicKey> {
        self.identity_key.clone()
    }

    fn device_key(&self) -> Option<PublicKey> {
        self.device_key.clone()
    }

    fn contacts(&self) -> Vec<Contact> {
        self.contacts.read().clone()
    }
}
