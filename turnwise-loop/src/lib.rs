#![deny(missing_docs)]
//! Turn orchestration for turnwise.
//!
//! A logical turn starts with [`ConfigSelector::select`] choosing a
//! [`RunConfiguration`](turnwise_types::RunConfiguration) for the utterance.
//! The [`TurnOrchestrator`] then opens streamed calls through a
//! [`Provider`](turnwise_types::Provider), decodes each one with a
//! [`StreamDecoder`], dispatches requested tools through the
//! [`ToolRegistry`](turnwise_tool::ToolRegistry) and resubmits, until the
//! model stops or the iteration cap is reached. Usage is folded by the
//! [`UsageAccountant`] and reported at the end of the turn.

pub mod channel;
pub mod config;
pub mod decoder;
pub mod orchestrator;
pub mod retry;
pub mod selector;
pub mod usage;

pub use channel::{LiveChannel, channel};
pub use config::{ConfigError, LoopConfig, TierSettings, TierTable};
pub use decoder::{DecoderStep, LiveDelta, MessagePhase, StreamDecoder, decode_stream};
pub use orchestrator::{Completion, TurnError, TurnOrchestrator, TurnOutcome, TurnRequest};
pub use retry::{RetryPolicy, open_with_retry};
pub use selector::{ConfigSelector, TierRule, classify};
pub use usage::{ModelPricing, PricingTable, UsageAccountant, cache_efficiency};
