//! Core types and error definitions for parley.
//!
//! This crate provides the foundational types shared across all parley crates:
//! the error taxonomy, the conversation turn model, and the tool descriptors
//! a model backend can be bound to.
//!
//! # Main types
//!
//! - [`ParleyError`]: Unified error enum for the chat pipeline.
//! - [`ParleyResult`]: Convenience alias for `Result<T, ParleyError>`.
//! - [`Role`]: Speaker of a turn (user or assistant).
//! - [`Turn`]: One message appended to a session's history.
//! - [`ToolDescriptor`]: A callable tool advertised to a model.
//! - [`ToolCall`]: A tool invocation requested by a model.

/// Error taxonomy.
pub mod error;
/// Tool descriptors and tool call requests.
pub mod tool;
/// Conversation turns.
pub mod turn;

pub use error::{validate_non_empty, ParleyError, ParleyResult};
pub use tool::{ToolCall, ToolDescriptor};
pub use turn::{Role, Turn};
