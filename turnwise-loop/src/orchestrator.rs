//! The turn orchestrator: one logical turn from utterance to `done`.

use std::sync::Arc;

use turnwise_tool::{ToolContext, ToolRegistry};
use turnwise_types::{
    AgentProfile, ChannelEvent, ContentBlock, ConversationStore, DecodeError, Message,
    NewConversation, Provider, ProviderError, ProviderRequest, Role, RunConfiguration, StopReason,
    StoreError, ToolInvocation, UsageReport,
};

use crate::channel::LiveChannel;
use crate::config::LoopConfig;
use crate::decoder::{LiveDelta, StreamDecoder};
use crate::retry::{RetryPolicy, open_with_retry};
use crate::selector::ConfigSelector;
use crate::usage::{PricingTable, UsageAccountant};

const TITLE_CHARS: usize = 60;

/// Errors that end a turn in the failed state.
#[derive(Debug, thiserror::Error)]
pub enum TurnError {
    /// Opening a call failed after retries, or failed with a terminal error.
    #[error("provider error: {0}")]
    Provider(#[from] ProviderError),
    /// A streamed call failed mid-way.
    #[error("decode error: {0}")]
    Decode(#[from] DecodeError),
    /// Loading or persisting the conversation failed.
    #[error("store error: {0}")]
    Store(#[from] StoreError),
}

/// One logical turn.
#[derive(Debug, Clone)]
pub struct TurnRequest {
    /// Existing conversation to continue. `None` starts a new one.
    pub conversation_id: Option<String>,
    /// User the turn runs for.
    pub user_id: String,
    /// Agent handling the turn.
    pub agent: AgentProfile,
    /// The user's utterance.
    pub utterance: String,
}

/// How a turn that did not fail ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Completion {
    /// The model stopped on its own.
    Finished(StopReason),
    /// The iteration cap was reached with tool work still pending.
    Truncated,
    /// The client closed the live channel.
    Cancelled,
}

/// Result of a turn that did not fail.
#[derive(Debug, Clone)]
pub struct TurnOutcome {
    /// Conversation the turn was appended to.
    pub conversation_id: String,
    /// Configuration chosen for the turn.
    pub config: RunConfiguration,
    /// How the turn ended.
    pub completion: Completion,
    /// Streamed calls made.
    pub round_trips: u32,
    /// Visible assistant text produced during the turn.
    pub reply: String,
    /// Aggregated usage.
    pub usage: UsageReport,
}

/// History for the turn plus how much of it the store already has.
struct Transcript {
    conversation_id: String,
    messages: Vec<Message>,
    persisted: usize,
    turn_start: usize,
}

impl Transcript {
    fn reply(&self) -> String {
        self.messages[self.turn_start..]
            .iter()
            .filter(|m| m.role == Role::Assistant)
            .map(Message::text)
            .filter(|t| !t.is_empty())
            .collect::<Vec<_>>()
            .join("\n\n")
    }

    /// Append the assistant's blocks and, for every local invocation that
    /// will not be dispatched, an error result so the history stays
    /// resubmittable.
    fn push_unanswered(&mut self, blocks: Vec<ContentBlock>, why: &str) {
        let pending: Vec<ToolInvocation> = blocks
            .iter()
            .filter_map(ContentBlock::as_tool_invocation)
            .collect();
        if !blocks.is_empty() {
            self.messages.push(Message::assistant(blocks));
        }
        if pending.is_empty() {
            return;
        }
        self.messages.push(Message {
            role: Role::User,
            content: pending
                .into_iter()
                .map(|invocation| ContentBlock::ToolResult {
                    tool_use_id: invocation.id,
                    content: serde_json::json!({
                        "success": false,
                        "error": format!("not executed: {why}"),
                    }),
                    is_error: true,
                })
                .collect(),
        });
    }
}

/// Drives selector, provider, decoder and dispatcher for each turn.
///
/// Holds no per-turn state, so one orchestrator serves any number of
/// concurrent turns on different conversations.
pub struct TurnOrchestrator<P: Provider> {
    provider: P,
    store: Arc<dyn ConversationStore>,
    tools: Arc<ToolRegistry>,
    selector: ConfigSelector,
    retry: RetryPolicy,
    pricing: PricingTable,
}

impl<P: Provider> TurnOrchestrator<P> {
    /// Build an orchestrator. `config` should already be validated.
    #[must_use]
    pub fn new(
        provider: P,
        store: Arc<dyn ConversationStore>,
        tools: Arc<ToolRegistry>,
        config: LoopConfig,
    ) -> Self {
        Self {
            provider,
            store,
            tools,
            selector: ConfigSelector::new(config.tiers),
            retry: config.retry,
            pricing: config.pricing,
        }
    }

    /// The selector used to classify utterances.
    #[must_use]
    pub fn selector(&self) -> &ConfigSelector {
        &self.selector
    }

    /// Run one logical turn, streaming events to `live`.
    ///
    /// On success the channel receives `usage` then `done`. On failure it
    /// receives exactly one `error`, and whatever history was produced is
    /// still persisted.
    ///
    /// # Errors
    ///
    /// [`TurnError`] when a call cannot be opened, a stream fails, or the
    /// store fails.
    pub async fn run_turn(
        &self,
        request: TurnRequest,
        live: &LiveChannel,
    ) -> Result<TurnOutcome, TurnError> {
        let config = self.selector.select(&request.utterance, &request.agent);

        let mut transcript = match self.open_transcript(&request).await {
            Ok(transcript) => transcript,
            Err(err) => {
                tracing::error!(error = %err, "turnwise.turn.failed");
                live.send(ChannelEvent::Error {
                    error: err.to_string(),
                });
                return Err(err);
            }
        };
        live.send(ChannelEvent::Connected {
            conversation_id: transcript.conversation_id.clone(),
        });
        tracing::info!(
            conversation_id = %transcript.conversation_id,
            agent = %request.agent.agent_type,
            tier = %config.complexity_tier,
            model = %config.model_id,
            "turnwise.turn.start"
        );

        transcript.messages.push(Message::user(request.utterance.clone()));
        let mut accountant = UsageAccountant::new(config.model_id.clone());

        let driven = self
            .drive(&request, &config, &mut transcript, &mut accountant, live)
            .await;
        let persisted = self.persist(&mut transcript).await;

        let completion = match (driven, persisted) {
            (Ok(completion), Ok(())) => completion,
            (Err(err), persisted) => {
                if let Err(store_err) = persisted {
                    tracing::warn!(
                        conversation_id = %transcript.conversation_id,
                        error = %store_err,
                        "turnwise.turn.persist_failed"
                    );
                }
                return Err(self.fail(&transcript, live, err));
            }
            (Ok(_), Err(store_err)) => {
                return Err(self.fail(&transcript, live, store_err.into()));
            }
        };

        let usage = accountant.report(&self.pricing);
        live.send(ChannelEvent::Usage {
            usage: usage.clone(),
        });
        live.send(ChannelEvent::Done {
            truncated: completion == Completion::Truncated,
        });

        let round_trips = usage.round_trips;
        tracing::info!(
            conversation_id = %transcript.conversation_id,
            round_trips,
            completion = ?completion,
            "turnwise.turn.complete"
        );
        Ok(TurnOutcome {
            conversation_id: transcript.conversation_id.clone(),
            reply: transcript.reply(),
            config,
            completion,
            round_trips,
            usage,
        })
    }

    /// Load or create the conversation.
    async fn open_transcript(&self, request: &TurnRequest) -> Result<Transcript, TurnError> {
        let conversation = match &request.conversation_id {
            Some(id) => self
                .store
                .get_conversation(id)
                .await?
                .ok_or_else(|| StoreError::NotFound(id.clone()))?,
            None => {
                self.store
                    .create_conversation(NewConversation {
                        user_id: request.user_id.clone(),
                        agent_type: request.agent.agent_type.clone(),
                        title: title_for(&request.utterance),
                    })
                    .await?
            }
        };
        let stored = conversation.messages.len();
        Ok(Transcript {
            conversation_id: conversation.id,
            messages: conversation.messages,
            persisted: stored,
            turn_start: stored,
        })
    }

    /// The call/decode/dispatch loop.
    async fn drive(
        &self,
        request: &TurnRequest,
        config: &RunConfiguration,
        transcript: &mut Transcript,
        accountant: &mut UsageAccountant,
        live: &LiveChannel,
    ) -> Result<Completion, TurnError> {
        let agent = &request.agent;
        let ctx = ToolContext {
            conversation_id: transcript.conversation_id.clone(),
            user_id: request.user_id.clone(),
            agent_type: agent.agent_type.clone(),
            allowed_tools: agent.allowed_tools.clone(),
        };
        let tools = self.tools.schemas(agent.allowed_tools.as_deref());
        let system = (!agent.system_prompt.is_empty()).then(|| agent.system_prompt.clone());

        let mut round_trips = 0_u32;
        loop {
            if live.is_closed() {
                tracing::info!(
                    conversation_id = %ctx.conversation_id,
                    round_trips,
                    "turnwise.turn.cancelled"
                );
                return Ok(Completion::Cancelled);
            }
            if round_trips >= config.max_iterations {
                tracing::warn!(
                    conversation_id = %ctx.conversation_id,
                    max_iterations = config.max_iterations,
                    "turnwise.turn.truncated"
                );
                return Ok(Completion::Truncated);
            }
            round_trips += 1;

            let provider_request = ProviderRequest {
                model: config.model_id.clone(),
                system: system.clone(),
                messages: transcript.messages.clone(),
                tools: tools.clone(),
                max_tokens: config.max_output_tokens,
                temperature: Some(config.temperature),
                reasoning_budget_tokens: config.reasoning_budget_tokens,
            };
            tracing::debug!(
                conversation_id = %ctx.conversation_id,
                iteration = round_trips,
                messages = provider_request.messages.len(),
                "turnwise.llm.round_trip"
            );

            let mut stream =
                open_with_retry(&self.provider, &provider_request, &self.retry).await?;
            let mut decoder = StreamDecoder::new();
            let decoded = decoder
                .drive(&mut stream, |delta| {
                    live.send(to_channel_event(delta));
                })
                .await;
            let result = match decoded {
                Ok(result) => result,
                Err(err) => {
                    // Output already streamed to the client stays in history.
                    transcript.push_unanswered(decoder.into_partial(), "the response stream failed");
                    return Err(err.into());
                }
            };

            accountant.record(&result.usage);
            let stop_reason = result.stop_reason;
            let invocations = result.tool_invocations();

            if stop_reason != StopReason::ToolUse || invocations.is_empty() {
                if !invocations.is_empty() {
                    tracing::warn!(
                        conversation_id = %ctx.conversation_id,
                        stop_reason = ?stop_reason,
                        skipped = invocations.len(),
                        "turnwise.tool.skipped"
                    );
                }
                transcript.push_unanswered(result.blocks, skipped_because(stop_reason));
                return Ok(Completion::Finished(stop_reason));
            }
            if !result.blocks.is_empty() {
                transcript.messages.push(Message::assistant(result.blocks));
            }

            let records = self.tools.dispatch_all(&invocations, &ctx).await;
            transcript.messages.push(Message {
                role: Role::User,
                content: records
                    .iter()
                    .map(|record| record.to_content_block())
                    .collect::<Vec<ContentBlock>>(),
            });
        }
    }

    /// Append everything the store does not have yet, in order.
    async fn persist(&self, transcript: &mut Transcript) -> Result<(), StoreError> {
        while transcript.persisted < transcript.messages.len() {
            let message = &transcript.messages[transcript.persisted];
            self.store
                .append_message(
                    &transcript.conversation_id,
                    message.role,
                    message.content.clone(),
                )
                .await?;
            transcript.persisted += 1;
        }
        Ok(())
    }

    fn fail(&self, transcript: &Transcript, live: &LiveChannel, err: TurnError) -> TurnError {
        tracing::error!(
            conversation_id = %transcript.conversation_id,
            error = %err,
            "turnwise.turn.failed"
        );
        live.send(ChannelEvent::Error {
            error: err.to_string(),
        });
        err
    }
}

fn to_channel_event(delta: LiveDelta) -> ChannelEvent {
    match delta {
        LiveDelta::Text(text) => ChannelEvent::TextDelta { text },
        LiveDelta::Reasoning(text) => ChannelEvent::ThinkingDelta { text },
        LiveDelta::ToolInvocation { name, input } => ChannelEvent::ToolUse {
            tool_name: name,
            input,
        },
    }
}

fn skipped_because(stop_reason: StopReason) -> &'static str {
    match stop_reason {
        StopReason::MaxTokens => "the output limit was reached",
        _ => "the reply ended before tools could run",
    }
}

fn title_for(utterance: &str) -> String {
    let title: String = utterance.trim().chars().take(TITLE_CHARS).collect();
    if title.is_empty() {
        "New conversation".to_string()
    } else {
        title
    }
}
