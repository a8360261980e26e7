//! # feedscope-core
//!
//! Foundation types, keys, errors, and logging for the feedscope pipeline.
//!
//! This crate provides the shared vocabulary that the other feedscope crates
//! depend on:
//!
//! - **Keys**: [`keys::PublicKey`] identifying feeds, spaces, identities and devices
//! - **Vector clocks**: [`timeframe::Timeframe`] mapping feed keys to observed sequence numbers
//! - **Feed entries**: [`block::Block`] with its [`block::BlockPayload`]
//! - **Credentials**: [`credential::Credential`] issuer/subject/proof assertions
//! - **Mutations**: [`mutation::MutationRecord`] and the ULID-shaped [`ids::ObjectId`]
//! - **Display names**: [`display_name::generate_name`] for unnamed contacts
//! - **Errors**: [`errors::CoreError`]
//! - **Logging**: [`logging::init_subscriber`] and in-memory log capture for tests
//!
//! ## Crate Position
//!
//! Foundation crate. Depended on by all other feedscope crates.

#![deny(unsafe_code)]

pub mod block;
pub mod credential;
pub mod display_name;
pub mod errors;
pub mod ids;
pub mod keys;
pub mod logging;
pub mod mutation;
pub mod timeframe;

pub use block::{Block, BlockPayload};
pub use credential::{Credential, CredentialSubject, Proof};
pub use errors::{CoreError, Result};
pub use ids::ObjectId;
pub use keys::PublicKey;
pub use mutation::MutationRecord;
pub use timeframe::{Frame, Timeframe};
