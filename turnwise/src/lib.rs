#![deny(missing_docs)]
//! turnwise: turn orchestration for tool-using chat agents.
//!
//! This crate ties the engine together for the `turnwise` binary: it loads
//! `turnwise.json`, installs logging, and wires the Anthropic provider,
//! in-memory collaborators and the orchestrator. The engine itself lives in
//! `turnwise-loop`; shared types in `turnwise-types`.

pub mod app;
pub mod config;
pub mod logging;

pub use app::{classify, in_memory_orchestrator, run_chat};
pub use config::{DEFAULT_CONFIG_FILE, ProviderConfig, TurnwiseConfig, TurnwiseError, default_agents};
pub use logging::init_tracing;
