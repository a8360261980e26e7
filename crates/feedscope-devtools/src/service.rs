//! Devtools façade over the pipeline.
//!
//! Each stream method comes in two forms: a callback form returning a
//! [`Subscription`] and a [`SnapshotStream`] form that cancels on drop.

use std::sync::Arc;

use feedscope_core::{Block, MutationRecord, PublicKey};
use feedscope_feeds::{FeedStore, IdentityDirectory, SpaceManager};
use feedscope_settings::DevtoolsSettings;
use tracing::debug;

use crate::block_window::{BlockTarget, BlockWindow, BlockWindowOptions};
use crate::errors::Result;
use crate::feed_index::{FeedIndex, FeedSummary};
use crate::graph::GraphData;
use crate::graph_model::{BlockGraphModel, graph_sink};
use crate::reducer::{MaterializedMap, reduce_mutations};
use crate::subscription::{Sink, SnapshotStream, Subscription};

/// Entry point for feed observability queries.
#[derive(Clone)]
pub struct DevtoolsService {
    spaces: Arc<dyn SpaceManager>,
    identity: Arc<dyn IdentityDirectory>,
    index: FeedIndex,
    window: BlockWindow,
}

impl DevtoolsService {
    /// Service with default window options.
    pub fn new(
        store: Arc<dyn FeedStore>,
        spaces: Arc<dyn SpaceManager>,
        identity: Arc<dyn IdentityDirectory>,
    ) -> Self {
        Self::with_options(store, spaces, identity, BlockWindowOptions::default())
    }

    /// Service configured from settings.
    pub fn from_settings(
        store: Arc<dyn FeedStore>,
        spaces: Arc<dyn SpaceManager>,
        identity: Arc<dyn IdentityDirectory>,
        settings: &DevtoolsSettings,
    ) -> Self {
        Self::with_options(store, spaces, identity, BlockWindowOptions::from(settings))
    }

    /// Service with explicit window options.
    pub fn with_options(
        store: Arc<dyn FeedStore>,
        spaces: Arc<dyn SpaceManager>,
        identity: Arc<dyn IdentityDirectory>,
        options: BlockWindowOptions,
    ) -> Self {
        Self {
            index: FeedIndex::new(Arc::clone(&store), Arc::clone(&spaces)),
            window: BlockWindow::with_options(store, Arc::clone(&spaces), options),
            spaces,
            identity,
        }
    }

    /// Feed summaries, optionally restricted to `filter`.
    pub fn list_feeds(&self, filter: &[PublicKey], sink: Sink<Vec<FeedSummary>>) -> Subscription {
        debug!(filter = filter.len(), "list_feeds");
        self.index.subscribe(filter, sink)
    }

    /// Stream form of [`list_feeds`](Self::list_feeds).
    pub fn list_feeds_stream(&self, filter: &[PublicKey]) -> SnapshotStream<Vec<FeedSummary>> {
        SnapshotStream::attach(|sink| self.list_feeds(filter, sink))
    }

    /// Feed keys `target` reads from. Empty when the subscription would be
    /// inert.
    pub fn resolve_targets(&self, target: &BlockTarget) -> Vec<PublicKey> {
        self.window.resolve_targets(target)
    }

    /// Recent-block windows of `target`.
    pub fn stream_recent_blocks(
        &self,
        target: &BlockTarget,
        max_blocks: Option<usize>,
        sink: Sink<Vec<Block>>,
    ) -> Subscription {
        debug!(?target, ?max_blocks, "stream_recent_blocks");
        self.window.subscribe(target, max_blocks, sink)
    }

    /// Stream form of [`stream_recent_blocks`](Self::stream_recent_blocks).
    pub fn recent_blocks_stream(
        &self,
        target: &BlockTarget,
        max_blocks: Option<usize>,
    ) -> SnapshotStream<Vec<Block>> {
        SnapshotStream::attach(|sink| self.stream_recent_blocks(target, max_blocks, sink))
    }

    /// Causal graphs of the recent-block windows of `target`.
    pub fn stream_block_graph(
        &self,
        target: &BlockTarget,
        max_blocks: Option<usize>,
        sink: Sink<GraphData>,
    ) -> Subscription {
        debug!(?target, ?max_blocks, "stream_block_graph");
        let sink = graph_sink(Arc::clone(&self.spaces), Arc::clone(&self.identity), sink);
        self.window.subscribe(target, max_blocks, sink)
    }

    /// Stream form of [`stream_block_graph`](Self::stream_block_graph).
    pub fn block_graph_stream(
        &self,
        target: &BlockTarget,
        max_blocks: Option<usize>,
    ) -> SnapshotStream<GraphData> {
        SnapshotStream::attach(|sink| self.stream_block_graph(target, max_blocks, sink))
    }

    /// Graph model holding the latest graph of `target`.
    pub fn block_graph_model(
        &self,
        target: &BlockTarget,
        max_blocks: Option<usize>,
    ) -> BlockGraphModel {
        BlockGraphModel::subscribe(
            &self.window,
            target,
            max_blocks,
            Arc::clone(&self.spaces),
            Arc::clone(&self.identity),
        )
    }

    /// Latest record per object id.
    pub fn reduce_mutations(&self, records: &[MutationRecord]) -> Result<MaterializedMap> {
        reduce_mutations(records)
    }
}
