//! Wiring: in-memory collaborators, the orchestrator, and the stdout sink.

use std::io::Write;
use std::sync::Arc;

use turnwise_loop::{TurnOrchestrator, TurnOutcome, TurnRequest, channel};
use turnwise_state_memory::{
    InMemoryCrm, InMemoryDocuments, MemoryConversationStore, MemoryKeyValue,
};
use turnwise_tool::standard_registry;
use turnwise_types::{Provider, RunConfiguration};

use crate::config::{TurnwiseConfig, TurnwiseError};

/// Build an orchestrator backed by in-memory store and collaborators.
#[must_use]
pub fn in_memory_orchestrator<P: Provider>(
    provider: P,
    config: &TurnwiseConfig,
) -> TurnOrchestrator<P> {
    let tools = standard_registry(
        Arc::new(InMemoryCrm::new(Vec::new())),
        Arc::new(InMemoryDocuments::new()),
        Arc::new(MemoryKeyValue::new()),
    );
    TurnOrchestrator::new(
        provider,
        Arc::new(MemoryConversationStore::new()),
        Arc::new(tools),
        config.engine.clone(),
    )
}

/// Resolve the run configuration `prompt` would get with `agent_type`.
pub fn classify(
    config: &TurnwiseConfig,
    agent_type: &str,
    prompt: &str,
) -> Result<RunConfiguration, TurnwiseError> {
    let agent = config.agent(agent_type)?;
    let selector = turnwise_loop::ConfigSelector::new(config.engine.tiers.clone());
    Ok(selector.select(prompt, agent))
}

/// Run one turn and write every channel event to `out` as an SSE frame.
///
/// If `out` fails the channel is closed, which cancels the turn after the
/// in-flight round-trip.
pub async fn run_chat<P, W>(
    orchestrator: &TurnOrchestrator<P>,
    request: TurnRequest,
    out: &mut W,
) -> Result<TurnOutcome, TurnwiseError>
where
    P: Provider,
    W: Write,
{
    let (live, mut rx) = channel();
    let turn = async move {
        let result = orchestrator.run_turn(request, &live).await;
        drop(live);
        result
    };
    let print = async move {
        while let Some(event) = rx.recv().await {
            out.write_all(event.encode().as_bytes())?;
            out.flush()?;
        }
        Ok::<(), std::io::Error>(())
    };
    let (result, printed) = tokio::join!(turn, print);
    let outcome = result?;
    printed.map_err(|e| TurnwiseError::Output(e.to_string()))?;
    Ok(outcome)
}
