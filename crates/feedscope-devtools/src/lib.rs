//! # feedscope-devtools
//!
//! Observability pipeline over replicated feeds:
//!
//! - **Feed index** ([`feed_index`]): live feed summaries with owners resolved
//!   through [`owner`]
//! - **Block windows** ([`block_window`]): the last N blocks of a feed or of a
//!   space's control feeds, recomputed on append and truncate
//! - **Causal graphs** ([`graph`], [`annotator`], [`graph_model`]): nodes per
//!   block, edges to predecessors and timeframe dependencies, labelled
//!   credentials
//! - **Reducer** ([`reducer`]): latest mutation record per object id
//! - **Service** ([`service`]): the [`DevtoolsService`] façade
//!
//! Subscriptions are cancelled through [`Subscription`] or by dropping a
//! [`SnapshotStream`].

#![deny(unsafe_code)]

pub mod annotator;
pub mod block_window;
pub mod errors;
pub mod feed_index;
pub mod graph;
pub mod graph_model;
pub mod owner;
pub mod reducer;
pub mod service;
pub mod subscription;

pub use annotator::{CredentialAnnotator, UNKNOWN_TYPE};
pub use block_window::{BlockTarget, BlockWindow, BlockWindowOptions};
pub use errors::{Result, ValidationError};
pub use feed_index::{FeedIndex, FeedSummary};
pub use graph::{GraphData, GraphEdge, GraphNode, NodeContent, NodeId, build_graph};
pub use graph_model::BlockGraphModel;
pub use owner::{FeedOwner, find_feed_owner};
pub use reducer::{MaterializedMap, reduce_mutations};
pub use service::DevtoolsService;
pub use subscription::{CancelRegistry, Sink, SnapshotStream, Subscription};
