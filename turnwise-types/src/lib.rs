#![deny(missing_docs)]
//! Shared data model for the turnwise turn orchestration engine.
//!
//! Everything that crosses a crate boundary lives here: conversation
//! content, the backend's incremental protocol events, the live channel
//! events forwarded to clients, per-turn configuration, usage figures,
//! error enums, and the traits implemented by external collaborators
//! (model provider, conversation store, CRM, documents, memory).

pub mod agent;
pub mod channel;
pub mod collab;
pub mod content;
pub mod error;
pub mod protocol;
pub mod provider;
pub mod store;
pub mod turn;

pub use agent::{AgentProfile, ComplexityTier, RunConfiguration};
pub use channel::ChannelEvent;
pub use collab::{
    CollaboratorError, CompanyRecord, CrmClient, DocumentFormat, DocumentRef, DocumentRequest,
    DocumentSection, DocumentService, KeyValueMemory,
};
pub use content::{ContentBlock, Message, Role};
pub use error::{DecodeError, ProviderError, StoreError, ToolError};
pub use protocol::{
    BlockDelta, BlockStart, MessageDeltaBody, MessageStart, ProtocolEvent, WireError, WireUsage,
};
pub use provider::{ProtocolStream, Provider, ProviderRequest, ToolSchema};
pub use store::{Conversation, ConversationStore, NewConversation};
pub use turn::{
    StopReason, ToolInvocation, ToolInvocationRecord, TurnResult, UsageReport, UsageStats,
};
