//! Feed blocks.

use serde::{Deserialize, Serialize};

use crate::credential::Credential;
use crate::keys::PublicKey;
use crate::mutation::MutationRecord;
use crate::timeframe::Timeframe;

/// One entry of a feed at a sequence number.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Block {
    /// Feed the block belongs to.
    pub feed_key: PublicKey,
    /// Position in the feed, starting at 0.
    pub seq: u64,
    /// Message carried by the block.
    #[serde(default)]
    pub payload: BlockPayload,
    /// Vector clock observed by the writer.
    #[serde(default)]
    pub timeframe: Timeframe,
}

/// Message carried by a [`Block`]. Control feeds carry credentials, data
/// feeds carry mutations.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlockPayload {
    /// Credential, for control-feed messages.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub credential: Option<Credential>,
    /// Object mutation, for data-feed messages.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mutation: Option<MutationRecord>,
}

impl Block {
    /// Block with an empty payload and timeframe.
    #[must_use]
    pub fn new(feed_key: PublicKey, seq: u64) -> Self {
        Self {
            feed_key,
            seq,
            payload: BlockPayload::default(),
            timeframe: Timeframe::default(),
        }
    }

    /// Attach a credential payload.
    #[must_use]
    pub fn with_credential(mut self, credential: Credential) -> Self {
        self.payload.credential = Some(credential);
        self
    }

    /// Attach a timeframe.
    #[must_use]
    pub fn with_timeframe(mut self, timeframe: Timeframe) -> Self {
        self.timeframe = timeframe;
        self
    }

    /// Credential carried by this block, if any.
    pub fn credential(&self) -> Option<&Credential> {
        self.payload.credential.as_ref()
    }
}
