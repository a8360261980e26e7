//! Live causal graph over a block window.

use std::sync::Arc;

use feedscope_core::Block;
use feedscope_feeds::{IdentityDirectory, SpaceManager};
use tokio::sync::watch;
use tracing::debug;

use crate::annotator::CredentialAnnotator;
use crate::block_window::{BlockTarget, BlockWindow};
use crate::graph::{GraphData, build_graph};
use crate::subscription::{Sink, Subscription};

/// Sink rebuilding the graph of every window it receives.
///
/// Labels are resolved against the state of `spaces` and `identity` at
/// rebuild time.
pub fn graph_sink(
    spaces: Arc<dyn SpaceManager>,
    identity: Arc<dyn IdentityDirectory>,
    sink: Sink<GraphData>,
) -> Sink<Vec<Block>> {
    Arc::new(move |blocks: Vec<Block>| {
        let annotator = CredentialAnnotator::snapshot(spaces.as_ref(), identity.as_ref());
        let graph = build_graph(&blocks, &annotator);
        debug!(
            blocks = blocks.len(),
            nodes = graph.nodes.len(),
            edges = graph.edges.len(),
            "block graph rebuilt"
        );
        sink(graph);
    })
}

/// Latest graph of a block window, published through a watch channel.
///
/// Dropping the model cancels its block subscription.
pub struct BlockGraphModel {
    receiver: watch::Receiver<GraphData>,
    subscription: Subscription,
}

impl BlockGraphModel {
    /// Subscribe to `target` and rebuild the graph on every window.
    pub fn subscribe(
        window: &BlockWindow,
        target: &BlockTarget,
        max_blocks: Option<usize>,
        spaces: Arc<dyn SpaceManager>,
        identity: Arc<dyn IdentityDirectory>,
    ) -> Self {
        let (tx, receiver) = watch::channel(GraphData::default());
        let publish: Sink<GraphData> = Arc::new(move |graph: GraphData| {
            let _ = tx.send_replace(graph);
        });
        let subscription = window.subscribe(target, max_blocks, graph_sink(spaces, identity, publish));
        Self {
            receiver,
            subscription,
        }
    }

    /// Current graph.
    pub fn graph(&self) -> GraphData {
        self.receiver.borrow().clone()
    }

    /// Wait for the next graph. Returns `false` once no more graphs can arrive.
    pub async fn changed(&mut self) -> bool {
        self.receiver.changed().await.is_ok()
    }

    /// A new receiver observing the same graphs.
    pub fn watch(&self) -> watch::Receiver<GraphData> {
        self.receiver.clone()
    }

    /// Stop updating the graph.
    pub fn cancel(&self) {
        self.subscription.cancel();
    }
}

impl Drop for BlockGraphModel {
    fn drop(&mut self) {
        self.subscription.cancel();
    }
}
