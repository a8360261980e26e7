//! Ledger fixtures: a JSON dump of feeds, spaces and identity loaded into the
//! in-memory collaborators.

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use feedscope_core::{BlockPayload, PublicKey, Timeframe};
use feedscope_feeds::memory::{MemoryFeedStore, MemoryIdentityDirectory, MemorySpaceManager};
use feedscope_feeds::{Contact, Feed, Space};
use serde::Deserialize;
use tracing::debug;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct LedgerFile {
    identity: Option<LocalIdentity>,
    contacts: Vec<Contact>,
    spaces: Vec<Space>,
    feeds: Vec<FeedDump>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LocalIdentity {
    identity_key: PublicKey,
    device_key: Option<PublicKey>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FeedDump {
    key: PublicKey,
    #[serde(default)]
    closed: bool,
    #[serde(default)]
    blocks: Vec<BlockDump>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct BlockDump {
    #[serde(default)]
    payload: BlockPayload,
    #[serde(default)]
    timeframe: Timeframe,
}

/// Collaborators populated from a fixture.
pub struct Ledger {
    pub store: Arc<MemoryFeedStore>,
    pub spaces: Arc<MemorySpaceManager>,
    pub identity: Arc<MemoryIdentityDirectory>,
}

/// Read and load the fixture at `path`.
pub fn load_ledger(path: &Path) -> Result<Ledger> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read fixture: {}", path.display()))?;
    parse_ledger(&content).with_context(|| format!("Invalid fixture: {}", path.display()))
}

/// Load a fixture from its JSON text.
pub fn parse_ledger(json: &str) -> Result<Ledger> {
    let file: LedgerFile = serde_json::from_str(json)?;

    let identity = match file.identity {
        Some(local) => MemoryIdentityDirectory::new(Some(local.identity_key), local.device_key),
        None => MemoryIdentityDirectory::default(),
    };
    for contact in file.contacts {
        identity.add_contact(contact.identity_key, contact.display_name);
    }

    let spaces = MemorySpaceManager::new();
    for space in file.spaces {
        spaces.upsert_space(space);
    }

    let store = MemoryFeedStore::new();
    for dump in file.feeds {
        let feed = store.open_feed(dump.key.clone());
        for block in dump.blocks {
            let _ = feed
                .append_payload(block.payload, block.timeframe)
                .with_context(|| format!("Failed to append to feed {}", dump.key))?;
        }
        if dump.closed {
            feed.close();
        }
        debug!(feed = %dump.key.truncate(), length = feed.length(), "fixture feed loaded");
    }

    Ok(Ledger {
        store: Arc::new(store),
        spaces: Arc::new(spaces),
        identity: Arc::new(identity),
    })
}
