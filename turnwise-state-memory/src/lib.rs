#![deny(missing_docs)]
//! In-memory implementations of the turnwise persistence and collaborator
//! traits.
//!
//! Every type keeps its data in a map behind a `tokio::sync::RwLock`.
//! Nothing survives a restart; these back the CLI and the test suites.

mod conversation;
mod crm;
mod documents;
mod kv;

pub use conversation::MemoryConversationStore;
pub use crm::InMemoryCrm;
pub use documents::InMemoryDocuments;
pub use kv::MemoryKeyValue;
