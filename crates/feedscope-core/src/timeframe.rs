//! Vector clocks attached to feed blocks.

use serde::{Deserialize, Serialize};

use crate::keys::PublicKey;

/// One entry of a [`Timeframe`]: the highest sequence number of `feed_key`
/// that the writer had observed.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Frame {
    /// Observed feed.
    pub feed_key: PublicKey,
    /// Highest observed sequence number.
    pub seq: u64,
}

/// Vector clock mapping feed keys to the highest causally observed sequence.
///
/// Frames keep their insertion order; [`Timeframe::set`] on an existing key
/// replaces the sequence in place.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Timeframe {
    frames: Vec<Frame>,
}

impl Timeframe {
    /// Empty timeframe.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from `(key, seq)` pairs. Later duplicates overwrite earlier ones.
    pub fn from_frames(frames: impl IntoIterator<Item = (PublicKey, u64)>) -> Self {
        let mut timeframe = Self::new();
        for (key, seq) in frames {
            timeframe.set(key, seq);
        }
        timeframe
    }

    /// Record `seq` for `feed_key`.
    pub fn set(&mut self, feed_key: PublicKey, seq: u64) {
        if let Some(frame) = self.frames.iter_mut().find(|f| f.feed_key == feed_key) {
            frame.seq = seq;
        } else {
            self.frames.push(Frame { feed_key, seq });
        }
    }

    /// Iterate `(key, seq)` pairs in insertion order.
    pub fn frames(&self) -> impl Iterator<Item = (&PublicKey, u64)> {
        self.frames.iter().map(|f| (&f.feed_key, f.seq))
    }

    /// Number of frames.
    pub fn len(&self) -> usize {
        self.frames.len()
    }

    /// Whether the timeframe has no frames.
    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }
}
