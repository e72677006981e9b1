//! Anthropic Messages API provider for turnwise.
//!
//! [`Anthropic`] implements [`turnwise_types::Provider`]: it maps a
//! [`turnwise_types::ProviderRequest`] to the Messages API body (prompt
//! caching on the system prompt, extended thinking, local and server tools),
//! opens a streamed call, and frames the SSE body into
//! [`turnwise_types::ProtocolEvent`]s.

pub mod client;
pub(crate) mod error;
pub mod mapping;
pub(crate) mod sse;

pub use client::Anthropic;

pub use turnwise_types::{ProtocolEvent, ProtocolStream, ProviderError};
