//! Causal graph of a block window.
//!
//! Every block becomes a node keyed by `(feed key, seq)`. Each node points
//! at its predecessor on the same feed and at every frame of its timeframe.
//! Edges are not deduplicated.

use std::collections::HashMap;
use std::fmt;

use feedscope_core::{Block, PublicKey};
use serde::{Deserialize, Serialize, Serializer};

use crate::annotator::CredentialAnnotator;

/// Node identity: a position in a feed.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId {
    /// Feed holding the block.
    pub feed_key: PublicKey,
    /// Block sequence number.
    pub seq: u64,
}

impl NodeId {
    /// Node id for `seq` on `feed_key`.
    pub fn new(feed_key: PublicKey, seq: u64) -> Self {
        Self { feed_key, seq }
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.feed_key.truncate(), self.seq)
    }
}

impl Serialize for NodeId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Credential summary attached to a node.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeContent {
    /// Credential type, or [`crate::annotator::UNKNOWN_TYPE`].
    #[serde(rename = "type")]
    pub credential_type: String,
    /// Issuer label.
    pub issuer: String,
    /// Subject label.
    pub subject: String,
}

/// A graph node.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphNode {
    /// Node id.
    pub id: NodeId,
    /// Feed holding the block.
    pub feed_key: PublicKey,
    /// Credential content, if a block carrying a credential was seen.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<NodeContent>,
}

/// A directed edge from a block to one of its causal dependencies.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct GraphEdge {
    /// `<source>-<target>`.
    pub id: String,
    /// Dependent node.
    pub source: NodeId,
    /// Dependency.
    pub target: NodeId,
}

impl GraphEdge {
    fn new(source: NodeId, target: NodeId) -> Self {
        Self {
            id: format!("{source}-{target}"),
            source,
            target,
        }
    }
}

/// Nodes in creation order and edges in creation order.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct GraphData {
    /// Nodes.
    pub nodes: Vec<GraphNode>,
    /// Edges, possibly repeated.
    pub edges: Vec<GraphEdge>,
}

impl GraphData {
    /// Look up a node.
    pub fn node(&self, id: &NodeId) -> Option<&GraphNode> {
        self.nodes.iter().find(|n| &n.id == id)
    }

    /// Edges leaving `id`.
    pub fn edges_from<'a>(&'a self, id: &'a NodeId) -> impl Iterator<Item = &'a GraphEdge> + 'a {
        self.edges.iter().filter(move |e| &e.source == id)
    }
}

#[derive(Default)]
struct GraphBuilder {
    nodes: Vec<GraphNode>,
    index: HashMap<NodeId, usize>,
    edges: Vec<GraphEdge>,
}

impl GraphBuilder {
    fn ensure_node(&mut self, id: &NodeId) -> usize {
        if let Some(&position) = self.index.get(id) {
            return position;
        }
        let position = self.nodes.len();
        self.nodes.push(GraphNode {
            id: id.clone(),
            feed_key: id.feed_key.clone(),
            content: None,
        });
        let _ = self.index.insert(id.clone(), position);
        position
    }

    fn link(&mut self, source: &NodeId, target: NodeId) {
        let _ = self.ensure_node(&target);
        self.edges.push(GraphEdge::new(source.clone(), target));
    }

    fn finish(self) -> GraphData {
        GraphData {
            nodes: self.nodes,
            edges: self.edges,
        }
    }
}

/// Build the causal graph of `blocks`, in input order.
///
/// The first credential seen for a node sets its content; later blocks for
/// the same node leave it untouched.
pub fn build_graph(blocks: &[Block], annotator: &CredentialAnnotator) -> GraphData {
    let mut builder = GraphBuilder::default();

    for block in blocks {
        let id = NodeId::new(block.feed_key.clone(), block.seq);
        let position = builder.ensure_node(&id);

        if let Some(credential) = block.credential() {
            let node = &mut builder.nodes[position];
            if node.content.is_none() {
                node.content = Some(annotator.content(credential));
            }
        }

        if block.seq > 0 {
            builder.link(&id, NodeId::new(block.feed_key.clone(), block.seq - 1));
        }

        for (feed_key, seq) in block.timeframe.frames() {
            builder.link(&id, NodeId::new(feed_key.clone(), seq));
        }
    }

    builder.finish()
}
