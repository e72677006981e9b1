//! Push-driven decoder for one streamed call.
//!
//! [`StreamDecoder`] consumes [`ProtocolEvent`]s in order and yields live
//! deltas as they arrive plus a [`TurnResult`] at `message_stop`. It has no
//! I/O of its own; [`decode_stream`] drives it from a [`ProtocolStream`].

use futures::StreamExt;
use turnwise_types::{
    BlockDelta, BlockStart, ContentBlock, DecodeError, ProtocolEvent, ProtocolStream, StopReason,
    TurnResult, UsageStats,
};

/// An increment to forward to the live channel.
#[derive(Debug, Clone, PartialEq)]
pub enum LiveDelta {
    /// Visible text.
    Text(String),
    /// Reasoning text.
    Reasoning(String),
    /// A tool invocation closed. Emitted for local and remote tools.
    ToolInvocation {
        /// Tool name.
        name: String,
        /// Parsed input.
        input: serde_json::Value,
    },
}

/// What feeding one event produced.
#[derive(Debug, Clone, PartialEq)]
pub enum DecoderStep {
    /// Nothing to forward yet.
    Pending,
    /// A live increment.
    Delta(LiveDelta),
    /// The message is complete.
    Complete(TurnResult),
}

/// Message-level state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessagePhase {
    /// Waiting for `message_start`.
    Idle,
    /// Blocks may open and close.
    Started,
    /// `message_delta` seen; waiting for `message_stop`.
    Finalizing,
    /// `message_stop` seen.
    Done,
}

#[derive(Debug)]
enum OpenBlock {
    Text(String),
    Reasoning {
        text: String,
        signature: Option<String>,
    },
    Redacted(String),
    Tool {
        id: String,
        name: String,
        json: String,
    },
    Remote {
        id: String,
        name: String,
        input: serde_json::Value,
        json: String,
    },
    RemoteResult {
        tool_use_id: String,
        content: serde_json::Value,
    },
    Ignored,
}

impl OpenBlock {
    fn kind(&self) -> &'static str {
        match self {
            OpenBlock::Text(_) => "text",
            OpenBlock::Reasoning { .. } => "thinking",
            OpenBlock::Redacted(_) => "redacted_thinking",
            OpenBlock::Tool { .. } => "tool_use",
            OpenBlock::Remote { .. } => "server_tool_use",
            OpenBlock::RemoteResult { .. } => "web_search_tool_result",
            OpenBlock::Ignored => "unknown",
        }
    }
}

/// State machine for one streamed call.
#[derive(Debug)]
pub struct StreamDecoder {
    phase: MessagePhase,
    open: Option<(usize, OpenBlock)>,
    blocks: Vec<ContentBlock>,
    stop_reason: Option<String>,
    usage: UsageStats,
}

impl Default for StreamDecoder {
    fn default() -> Self {
        Self::new()
    }
}

impl StreamDecoder {
    /// A decoder waiting for `message_start`.
    #[must_use]
    pub fn new() -> Self {
        Self {
            phase: MessagePhase::Idle,
            open: None,
            blocks: Vec::new(),
            stop_reason: None,
            usage: UsageStats::default(),
        }
    }

    /// Current message phase.
    #[must_use]
    pub fn phase(&self) -> MessagePhase {
        self.phase
    }

    /// Whether a content block is open.
    #[must_use]
    pub fn block_open(&self) -> bool {
        self.open.is_some()
    }

    /// Feed one event.
    ///
    /// # Errors
    ///
    /// [`DecodeError::Remote`] for a backend `error` event and
    /// [`DecodeError::Protocol`] for events out of order. Either is fatal
    /// for the call; the decoder should be dropped.
    pub fn feed(&mut self, event: ProtocolEvent) -> Result<DecoderStep, DecodeError> {
        match event {
            ProtocolEvent::Ping | ProtocolEvent::Unknown => Ok(DecoderStep::Pending),
            ProtocolEvent::Error { error } => Err(DecodeError::Remote {
                kind: error.kind,
                message: error.message,
            }),
            ProtocolEvent::MessageStart { message } => {
                if self.phase != MessagePhase::Idle {
                    return Err(violation("message_start after the message started"));
                }
                message.usage.merge_into(&mut self.usage);
                self.phase = MessagePhase::Started;
                Ok(DecoderStep::Pending)
            }
            ProtocolEvent::ContentBlockStart {
                index,
                content_block,
            } => {
                self.expect_started("content_block_start")?;
                if let Some((open, _)) = &self.open {
                    return Err(violation(format!(
                        "content_block_start {index} while block {open} is open"
                    )));
                }
                self.open = Some((index, open_block(content_block)));
                Ok(DecoderStep::Pending)
            }
            ProtocolEvent::ContentBlockDelta { index, delta } => {
                self.expect_started("content_block_delta")?;
                let block = self.open_block_at(index, "content_block_delta")?;
                apply_delta(block, delta)
            }
            ProtocolEvent::ContentBlockStop { index } => {
                self.expect_started("content_block_stop")?;
                self.open_block_at(index, "content_block_stop")?;
                let Some((_, block)) = self.open.take() else {
                    return Err(violation("content_block_stop with no open block"));
                };
                Ok(self.close(block))
            }
            ProtocolEvent::MessageDelta { delta, usage } => {
                self.expect_started("message_delta")?;
                self.expect_no_open_block("message_delta")?;
                if delta.stop_reason.is_some() {
                    self.stop_reason = delta.stop_reason;
                }
                if let Some(usage) = usage {
                    usage.merge_into(&mut self.usage);
                }
                self.phase = MessagePhase::Finalizing;
                Ok(DecoderStep::Pending)
            }
            ProtocolEvent::MessageStop => {
                if !matches!(self.phase, MessagePhase::Started | MessagePhase::Finalizing) {
                    return Err(violation(format!(
                        "message_stop in phase {:?}",
                        self.phase
                    )));
                }
                self.expect_no_open_block("message_stop")?;
                self.phase = MessagePhase::Done;
                let stop_reason = self
                    .stop_reason
                    .as_deref()
                    .map_or(StopReason::EndTurn, StopReason::from_wire);
                Ok(DecoderStep::Complete(TurnResult {
                    blocks: std::mem::take(&mut self.blocks),
                    stop_reason,
                    usage: self.usage,
                }))
            }
        }
    }

    /// Signal end of input.
    ///
    /// # Errors
    ///
    /// [`DecodeError::Truncated`] unless `message_stop` was seen.
    pub fn finish(&self) -> Result<(), DecodeError> {
        if self.phase == MessagePhase::Done {
            Ok(())
        } else {
            Err(DecodeError::Truncated)
        }
    }

    /// Feed `stream` through the decoder, calling `on_delta` for every live
    /// increment, until the message completes.
    ///
    /// On error the decoder keeps whatever it had assembled, so the caller
    /// can recover it with [`StreamDecoder::into_partial`].
    ///
    /// # Errors
    ///
    /// As [`decode_stream`].
    pub async fn drive<F>(
        &mut self,
        stream: &mut ProtocolStream,
        mut on_delta: F,
    ) -> Result<TurnResult, DecodeError>
    where
        F: FnMut(LiveDelta),
    {
        while let Some(event) = stream.next().await {
            match self.feed(event?)? {
                DecoderStep::Pending => {}
                DecoderStep::Delta(delta) => on_delta(delta),
                DecoderStep::Complete(result) => return Ok(result),
            }
        }
        self.finish()?;
        Err(DecodeError::Truncated)
    }

    /// Content assembled before the call failed.
    ///
    /// Closed blocks come first, then the open text or reasoning buffer.
    /// A tool invocation whose block never closed has no usable input and
    /// is left out, as is a backend-run invocation with no result yet.
    #[must_use]
    pub fn into_partial(self) -> Vec<ContentBlock> {
        let mut blocks = self.blocks;
        match self.open.map(|(_, block)| block) {
            Some(OpenBlock::Text(text)) if !text.is_empty() => {
                blocks.push(ContentBlock::Text { text });
            }
            Some(OpenBlock::Reasoning { text, signature }) if !text.is_empty() => {
                blocks.push(ContentBlock::Reasoning { text, signature });
            }
            Some(OpenBlock::Redacted(data)) => blocks.push(ContentBlock::RedactedReasoning { data }),
            Some(OpenBlock::RemoteResult {
                tool_use_id,
                content,
            }) => blocks.push(ContentBlock::RemoteToolResult {
                tool_use_id,
                content,
            }),
            _ => {}
        }
        let answered: Vec<String> = blocks
            .iter()
            .filter_map(|block| match block {
                ContentBlock::RemoteToolResult { tool_use_id, .. } => Some(tool_use_id.clone()),
                _ => None,
            })
            .collect();
        blocks.retain(|block| match block {
            ContentBlock::RemoteToolInvocation { id, .. } => answered.contains(id),
            _ => true,
        });
        blocks
    }

    fn expect_started(&self, event: &str) -> Result<(), DecodeError> {
        match self.phase {
            MessagePhase::Started => Ok(()),
            MessagePhase::Idle => Err(violation(format!("{event} before message_start"))),
            MessagePhase::Finalizing => Err(violation(format!("{event} after message_delta"))),
            MessagePhase::Done => Err(violation(format!("{event} after message_stop"))),
        }
    }

    fn expect_no_open_block(&self, event: &str) -> Result<(), DecodeError> {
        match &self.open {
            Some((index, _)) => Err(violation(format!("{event} while block {index} is open"))),
            None => Ok(()),
        }
    }

    fn open_block_at(&mut self, index: usize, event: &str) -> Result<&mut OpenBlock, DecodeError> {
        match &mut self.open {
            None => Err(violation(format!("{event} {index} with no open block"))),
            Some((open, _)) if *open != index => Err(violation(format!(
                "{event} {index} does not match open block {open}"
            ))),
            Some((_, block)) => Ok(block),
        }
    }

    fn close(&mut self, block: OpenBlock) -> DecoderStep {
        match block {
            OpenBlock::Text(text) => {
                if !text.is_empty() {
                    self.blocks.push(ContentBlock::Text { text });
                }
                DecoderStep::Pending
            }
            OpenBlock::Reasoning { text, signature } => {
                self.blocks.push(ContentBlock::Reasoning { text, signature });
                DecoderStep::Pending
            }
            OpenBlock::Redacted(data) => {
                self.blocks.push(ContentBlock::RedactedReasoning { data });
                DecoderStep::Pending
            }
            OpenBlock::Tool { id, name, json } => {
                let input = parse_tool_input(&name, &json);
                self.blocks.push(ContentBlock::ToolInvocation {
                    id,
                    name: name.clone(),
                    input: input.clone(),
                });
                DecoderStep::Delta(LiveDelta::ToolInvocation { name, input })
            }
            OpenBlock::Remote {
                id,
                name,
                input,
                json,
            } => {
                let input = if json.trim().is_empty() {
                    input
                } else {
                    parse_tool_input(&name, &json)
                };
                self.blocks.push(ContentBlock::RemoteToolInvocation {
                    id,
                    name: name.clone(),
                    input: input.clone(),
                });
                DecoderStep::Delta(LiveDelta::ToolInvocation { name, input })
            }
            OpenBlock::RemoteResult {
                tool_use_id,
                content,
            } => {
                self.blocks.push(ContentBlock::RemoteToolResult {
                    tool_use_id,
                    content,
                });
                DecoderStep::Pending
            }
            OpenBlock::Ignored => DecoderStep::Pending,
        }
    }
}

fn violation(message: impl Into<String>) -> DecodeError {
    DecodeError::Protocol(message.into())
}

fn open_block(start: BlockStart) -> OpenBlock {
    match start {
        BlockStart::Text { text } => OpenBlock::Text(text),
        BlockStart::Thinking { thinking } => OpenBlock::Reasoning {
            text: thinking,
            signature: None,
        },
        BlockStart::RedactedThinking { data } => OpenBlock::Redacted(data),
        BlockStart::ToolUse { id, name } => OpenBlock::Tool {
            id,
            name,
            json: String::new(),
        },
        BlockStart::ServerToolUse { id, name, input } => OpenBlock::Remote {
            id,
            name,
            input,
            json: String::new(),
        },
        BlockStart::WebSearchToolResult {
            tool_use_id,
            content,
        } => OpenBlock::RemoteResult {
            tool_use_id,
            content,
        },
        BlockStart::Unknown => OpenBlock::Ignored,
    }
}

fn apply_delta(block: &mut OpenBlock, delta: BlockDelta) -> Result<DecoderStep, DecodeError> {
    match (block, delta) {
        (_, BlockDelta::Unknown) | (OpenBlock::Ignored, _) => Ok(DecoderStep::Pending),
        (OpenBlock::Text(buf), BlockDelta::TextDelta { text }) => {
            buf.push_str(&text);
            Ok(DecoderStep::Delta(LiveDelta::Text(text)))
        }
        (OpenBlock::Reasoning { text, .. }, BlockDelta::ThinkingDelta { thinking }) => {
            text.push_str(&thinking);
            Ok(DecoderStep::Delta(LiveDelta::Reasoning(thinking)))
        }
        (OpenBlock::Reasoning { signature: sig, .. }, BlockDelta::SignatureDelta { signature }) => {
            sig.get_or_insert_with(String::new).push_str(&signature);
            Ok(DecoderStep::Pending)
        }
        (
            OpenBlock::Tool { json, .. } | OpenBlock::Remote { json, .. },
            BlockDelta::InputJsonDelta { partial_json },
        ) => {
            json.push_str(&partial_json);
            Ok(DecoderStep::Pending)
        }
        (block, delta) => Err(violation(format!(
            "{} delta on a {} block",
            delta_kind(&delta),
            block.kind()
        ))),
    }
}

fn delta_kind(delta: &BlockDelta) -> &'static str {
    match delta {
        BlockDelta::TextDelta { .. } => "text_delta",
        BlockDelta::ThinkingDelta { .. } => "thinking_delta",
        BlockDelta::SignatureDelta { .. } => "signature_delta",
        BlockDelta::InputJsonDelta { .. } => "input_json_delta",
        BlockDelta::Unknown => "unknown",
    }
}

/// Parse accumulated tool input. Empty or malformed input becomes `{}`.
fn parse_tool_input(name: &str, json: &str) -> serde_json::Value {
    if json.trim().is_empty() {
        return serde_json::json!({});
    }
    match serde_json::from_str::<serde_json::Value>(json) {
        Ok(value) => value,
        Err(err) => {
            tracing::warn!(tool = name, error = %err, "turnwise.decode.malformed_tool_input");
            serde_json::json!({})
        }
    }
}

/// Drive a decoder over `stream`, calling `on_delta` for every live
/// increment in stream order.
///
/// Returns as soon as `message_stop` is decoded; anything after it is not
/// read.
///
/// # Errors
///
/// Any [`DecodeError`]: backend error events, protocol violations,
/// transport failures and streams that end early.
pub async fn decode_stream<F>(
    mut stream: ProtocolStream,
    on_delta: F,
) -> Result<TurnResult, DecodeError>
where
    F: FnMut(LiveDelta),
{
    StreamDecoder::new().drive(&mut stream, on_delta).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use turnwise_types::{MessageDeltaBody, MessageStart, ProviderError, WireError, WireUsage};

    fn start() -> ProtocolEvent {
        ProtocolEvent::MessageStart {
            message: MessageStart {
                id: "msg_1".into(),
                model: "claude-test".into(),
                usage: WireUsage {
                    input_tokens: Some(25),
                    output_tokens: Some(1),
                    ..WireUsage::default()
                },
            },
        }
    }

    fn block_start(index: usize, content_block: BlockStart) -> ProtocolEvent {
        ProtocolEvent::ContentBlockStart {
            index,
            content_block,
        }
    }

    fn delta(index: usize, delta: BlockDelta) -> ProtocolEvent {
        ProtocolEvent::ContentBlockDelta { index, delta }
    }

    fn text(index: usize, t: &str) -> ProtocolEvent {
        delta(index, BlockDelta::TextDelta { text: t.into() })
    }

    fn json_part(index: usize, part: &str) -> ProtocolEvent {
        delta(
            index,
            BlockDelta::InputJsonDelta {
                partial_json: part.into(),
            },
        )
    }

    fn stop(index: usize) -> ProtocolEvent {
        ProtocolEvent::ContentBlockStop { index }
    }

    fn message_delta(reason: &str, output: u64) -> ProtocolEvent {
        ProtocolEvent::MessageDelta {
            delta: MessageDeltaBody {
                stop_reason: Some(reason.into()),
            },
            usage: Some(WireUsage {
                output_tokens: Some(output),
                ..WireUsage::default()
            }),
        }
    }

    fn run(events: Vec<ProtocolEvent>) -> (Vec<LiveDelta>, Result<TurnResult, DecodeError>) {
        let mut decoder = StreamDecoder::new();
        let mut deltas = Vec::new();
        for event in events {
            match decoder.feed(event) {
                Ok(DecoderStep::Pending) => {}
                Ok(DecoderStep::Delta(d)) => deltas.push(d),
                Ok(DecoderStep::Complete(result)) => return (deltas, Ok(result)),
                Err(err) => return (deltas, Err(err)),
            }
        }
        let err = decoder.finish().err().unwrap_or(DecodeError::Truncated);
        (deltas, Err(err))
    }

    fn text_block_start(index: usize) -> ProtocolEvent {
        block_start(
            index,
            BlockStart::Text {
                text: String::new(),
            },
        )
    }

    #[test]
    fn text_in_three_deltas() {
        let (deltas, result) = run(vec![
            start(),
            text_block_start(0),
            text(0, "a"),
            text(0, "b"),
            text(0, "c"),
            stop(0),
            message_delta("end_turn", 3),
            ProtocolEvent::MessageStop,
        ]);
        assert_eq!(
            deltas,
            vec![
                LiveDelta::Text("a".into()),
                LiveDelta::Text("b".into()),
                LiveDelta::Text("c".into()),
            ]
        );
        let result = result.unwrap();
        assert_eq!(result.blocks, vec![ContentBlock::text("abc")]);
        assert_eq!(result.stop_reason, StopReason::EndTurn);
        assert_eq!(result.usage.input_tokens, 25);
        assert_eq!(result.usage.output_tokens, 3);
    }

    #[test]
    fn tool_input_is_assembled_from_fragments() {
        let (deltas, result) = run(vec![
            start(),
            block_start(
                0,
                BlockStart::ToolUse {
                    id: "toolu_1".into(),
                    name: "crm_search".into(),
                },
            ),
            json_part(0, r#"{"query": "Ac"#),
            json_part(0, r#"me", "limit": 2}"#),
            stop(0),
            message_delta("tool_use", 10),
            ProtocolEvent::MessageStop,
        ]);
        let result = result.unwrap();
        assert_eq!(result.stop_reason, StopReason::ToolUse);
        let expected = json!({"query": "Acme", "limit": 2});
        assert_eq!(
            result.blocks,
            vec![ContentBlock::ToolInvocation {
                id: "toolu_1".into(),
                name: "crm_search".into(),
                input: expected.clone(),
            }]
        );
        assert_eq!(
            deltas,
            vec![LiveDelta::ToolInvocation {
                name: "crm_search".into(),
                input: expected,
            }]
        );
    }

    #[test]
    fn malformed_or_empty_tool_json_becomes_empty_object() {
        for fragments in [vec![r#"{"query": "#], vec![]] {
            let mut events = vec![
                start(),
                block_start(
                    0,
                    BlockStart::ToolUse {
                        id: "toolu_1".into(),
                        name: "recall".into(),
                    },
                ),
            ];
            events.extend(fragments.into_iter().map(|f| json_part(0, f)));
            events.extend([stop(0), message_delta("tool_use", 1), ProtocolEvent::MessageStop]);
            let result = run(events).1.unwrap();
            assert_eq!(result.tool_invocations()[0].input, json!({}));
        }
    }

    #[test]
    fn reasoning_keeps_signature() {
        let result = run(vec![
            start(),
            block_start(
                0,
                BlockStart::Thinking {
                    thinking: String::new(),
                },
            ),
            delta(
                0,
                BlockDelta::ThinkingDelta {
                    thinking: "Let me check".into(),
                },
            ),
            delta(
                0,
                BlockDelta::SignatureDelta {
                    signature: "sig==".into(),
                },
            ),
            stop(0),
            text_block_start(1),
            text(1, "Done."),
            stop(1),
            message_delta("end_turn", 9),
            ProtocolEvent::MessageStop,
        ])
        .1
        .unwrap();
        assert_eq!(
            result.blocks[0],
            ContentBlock::Reasoning {
                text: "Let me check".into(),
                signature: Some("sig==".into()),
            }
        );
        assert_eq!(result.blocks[1], ContentBlock::text("Done."));
    }

    #[test]
    fn remote_tool_blocks_are_kept_whole() {
        let (deltas, result) = run(vec![
            start(),
            block_start(
                0,
                BlockStart::ServerToolUse {
                    id: "srvtoolu_1".into(),
                    name: "web_search".into(),
                    input: json!({"query": "ETG intake dates"}),
                },
            ),
            stop(0),
            block_start(
                1,
                BlockStart::WebSearchToolResult {
                    tool_use_id: "srvtoolu_1".into(),
                    content: json!([{"type": "web_search_result", "url": "https://example.org"}]),
                },
            ),
            stop(1),
            message_delta("end_turn", 4),
            ProtocolEvent::MessageStop,
        ]);
        let result = result.unwrap();
        assert!(result.tool_invocations().is_empty());
        assert!(matches!(
            &result.blocks[0],
            ContentBlock::RemoteToolInvocation { name, input, .. }
                if name == "web_search" && input["query"] == "ETG intake dates"
        ));
        assert!(matches!(
            &result.blocks[1],
            ContentBlock::RemoteToolResult { tool_use_id, .. } if tool_use_id == "srvtoolu_1"
        ));
        assert_eq!(deltas.len(), 1);
    }

    #[test]
    fn empty_text_block_is_dropped() {
        let result = run(vec![
            start(),
            text_block_start(0),
            stop(0),
            message_delta("end_turn", 0),
            ProtocolEvent::MessageStop,
        ])
        .1
        .unwrap();
        assert!(result.blocks.is_empty());
    }

    #[test]
    fn ping_and_unknown_are_ignored() {
        let result = run(vec![
            ProtocolEvent::Ping,
            start(),
            ProtocolEvent::Unknown,
            block_start(0, BlockStart::Unknown),
            delta(0, BlockDelta::TextDelta { text: "x".into() }),
            stop(0),
            text_block_start(1),
            delta(1, BlockDelta::Unknown),
            text(1, "ok"),
            ProtocolEvent::Ping,
            stop(1),
            message_delta("end_turn", 1),
            ProtocolEvent::MessageStop,
        ])
        .1
        .unwrap();
        assert_eq!(result.blocks, vec![ContentBlock::text("ok")]);
    }

    #[test]
    fn protocol_violations_are_errors() {
        let cases: Vec<Vec<ProtocolEvent>> = vec![
            // event before message_start
            vec![text_block_start(0)],
            // duplicate message_start
            vec![start(), start()],
            // start while a block is open
            vec![start(), text_block_start(0), text_block_start(1)],
            // delta with no open block
            vec![start(), text(0, "x")],
            // stop for the wrong index
            vec![start(), text_block_start(0), stop(1)],
            // text delta into a tool block
            vec![
                start(),
                block_start(
                    0,
                    BlockStart::ToolUse {
                        id: "t".into(),
                        name: "n".into(),
                    },
                ),
                text(0, "x"),
            ],
            // message_stop with a block open
            vec![start(), text_block_start(0), ProtocolEvent::MessageStop],
        ];
        for events in cases {
            let err = run(events.clone()).1.unwrap_err();
            assert!(
                matches!(err, DecodeError::Protocol(_)),
                "{events:?} gave {err:?}"
            );
        }
    }

    #[test]
    fn events_after_done_are_rejected() {
        let mut decoder = StreamDecoder::new();
        decoder.feed(start()).unwrap();
        decoder.feed(ProtocolEvent::MessageStop).unwrap();
        assert_eq!(decoder.phase(), MessagePhase::Done);
        assert!(decoder.feed(text_block_start(0)).is_err());
        assert!(decoder.feed(ProtocolEvent::MessageStop).is_err());
    }

    #[test]
    fn missing_stop_reason_is_end_turn() {
        let result = run(vec![start(), ProtocolEvent::MessageStop]).1.unwrap();
        assert_eq!(result.stop_reason, StopReason::EndTurn);
    }

    #[test]
    fn error_event_aborts() {
        let (deltas, result) = run(vec![
            start(),
            text_block_start(0),
            text(0, "partial"),
            ProtocolEvent::Error {
                error: WireError {
                    kind: "overloaded_error".into(),
                    message: "Overloaded".into(),
                },
            },
        ]);
        assert_eq!(deltas, vec![LiveDelta::Text("partial".into())]);
        assert!(matches!(
            result,
            Err(DecodeError::Remote { kind, .. }) if kind == "overloaded_error"
        ));
    }

    #[test]
    fn partial_keeps_closed_blocks_and_open_text() {
        let mut decoder = StreamDecoder::new();
        let events = vec![
            start(),
            block_start(
                0,
                BlockStart::RedactedThinking {
                    data: "opaque".into(),
                },
            ),
            stop(0),
            block_start(
                1,
                BlockStart::ToolUse {
                    id: "toolu_1".into(),
                    name: "recall".into(),
                },
            ),
            json_part(1, r#"{"key":"a"}"#),
            stop(1),
            text_block_start(2),
            text(2, "Part"),
            text(2, "ial"),
        ];
        for event in events {
            decoder.feed(event).unwrap();
        }
        let err = decoder
            .feed(ProtocolEvent::Error {
                error: WireError {
                    kind: "api_error".into(),
                    message: "boom".into(),
                },
            })
            .unwrap_err();
        assert!(matches!(err, DecodeError::Remote { .. }));
        assert_eq!(
            decoder.into_partial(),
            vec![
                ContentBlock::RedactedReasoning {
                    data: "opaque".into()
                },
                ContentBlock::ToolInvocation {
                    id: "toolu_1".into(),
                    name: "recall".into(),
                    input: json!({"key": "a"}),
                },
                ContentBlock::text("Partial"),
            ]
        );
    }

    #[test]
    fn partial_leaves_out_unclosed_tools_and_unanswered_remote_calls() {
        let mut decoder = StreamDecoder::new();
        let events = vec![
            start(),
            block_start(
                0,
                BlockStart::ServerToolUse {
                    id: "srvtoolu_1".into(),
                    name: "web_search".into(),
                    input: json!({"query": "grants"}),
                },
            ),
            stop(0),
            block_start(
                1,
                BlockStart::ToolUse {
                    id: "toolu_2".into(),
                    name: "recall".into(),
                },
            ),
            json_part(1, r#"{"ke"#),
        ];
        for event in events {
            decoder.feed(event).unwrap();
        }
        assert!(decoder.into_partial().is_empty());
    }

    #[test]
    fn ending_early_is_truncated() {
        let (_, result) = run(vec![start(), text_block_start(0), text(0, "cut")]);
        assert!(matches!(result, Err(DecodeError::Truncated)));
    }

    #[tokio::test]
    async fn decode_stream_forwards_in_order() {
        let events = vec![
            Ok(start()),
            Ok(text_block_start(0)),
            Ok(text(0, "Hel")),
            Ok(text(0, "lo")),
            Ok(stop(0)),
            Ok(message_delta("end_turn", 2)),
            Ok(ProtocolEvent::MessageStop),
        ];
        let stream: ProtocolStream = Box::pin(futures::stream::iter(events));
        let mut seen = Vec::new();
        let result = decode_stream(stream, |d| seen.push(d)).await.unwrap();
        assert_eq!(seen.len(), 2);
        assert_eq!(result.blocks, vec![ContentBlock::text("Hello")]);
    }

    #[tokio::test]
    async fn decode_stream_surfaces_transport_and_truncation() {
        let events = vec![
            Ok(start()),
            Err(ProviderError::Network("reset by peer".into())),
        ];
        let stream: ProtocolStream = Box::pin(futures::stream::iter(events));
        let err = decode_stream(stream, |_| {}).await.unwrap_err();
        assert!(matches!(err, DecodeError::Transport(_)));

        let stream: ProtocolStream = Box::pin(futures::stream::iter(vec![Ok(start())]));
        let err = decode_stream(stream, |_| {}).await.unwrap_err();
        assert!(matches!(err, DecodeError::Truncated));
    }
}
