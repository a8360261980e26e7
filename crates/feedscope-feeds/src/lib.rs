//! # feedscope-feeds
//!
//! Collaborator contracts for the feedscope pipeline:
//!
//! - **Feeds**: [`traits::FeedStore`], [`traits::Feed`], [`traits::FeedCursor`] and
//!   the [`traits::FeedEvent`] lifecycle (`append`, `truncate`, `close`)
//! - **Spaces**: [`traits::SpaceManager`] serving [`traits::Space`] snapshots with
//!   feed admission tables and control-pipeline feeds
//! - **Identity**: [`traits::IdentityDirectory`] for the local identity and contacts
//! - **Listeners**: [`listeners::ListenerSet`] returning [`listeners::Unsubscribe`] callbacks
//! - **In-memory implementations** in [`memory`]

#![deny(unsafe_code)]

pub mod errors;
pub mod listeners;
pub mod memory;
pub mod traits;

pub use errors::{FeedError, Result};
pub use listeners::{Listener, ListenerSet, Unsubscribe};
pub use traits::{
    Contact, Feed, FeedAssertion, FeedCursor, FeedEvent, FeedStore, IdentityDirectory, Space,
    SpaceManager,
};
