//! In-memory collaborator implementations.
//!
//! Used by tests and by the CLI when replaying a ledger fixture. They follow
//! the collaborator contracts closely (sequence checks, lifecycle events,
//! scoped cursors) but do no replication or persistence.

pub mod feed;
pub mod spaces;
pub mod store;

pub use feed::{CursorStats, MemoryFeed};
pub use spaces::{MemoryIdentityDirectory, MemorySpaceManager};
pub use store::MemoryFeedStore;
