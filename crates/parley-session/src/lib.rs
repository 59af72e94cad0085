//! Conversation session storage for parley.
//!
//! A [`Session`] is an ordered, append-only list of [`parley_core::Turn`]s
//! keyed by a caller-supplied identifier. Sessions are created lazily on first
//! reference and live for the lifetime of the process.
//!
//! [`InMemorySessionStore`] shards sessions across independently locked
//! partitions so that requests for different sessions never contend on a
//! single lock.

/// Session type with its exchange gate.
pub mod session;
/// Session store trait and the sharded in-memory store.
pub mod store;

pub use session::Session;
pub use store::{InMemorySessionStore, SessionStore, DEFAULT_SHARDS};
