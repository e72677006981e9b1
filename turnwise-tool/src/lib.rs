//! Typed tool registry and dispatcher for turnwise.
//!
//! Tools implement [`Tool`] with typed arguments. The [`ToolRegistry`] maps
//! names to routes (local handler or backend-executed) and dispatches
//! invocations concurrently, turning every failure into a structured
//! `{"success": false, "error": ...}` result for the model.

pub mod builtin;
pub mod registry;
pub mod tool;

pub use builtin::{WEB_SEARCH, standard_registry, web_search_spec};
pub use registry::{Route, ToolRegistry};
pub use tool::{Tool, ToolContext, ToolDyn, input_schema_for};
