//! Server-Sent Events framing for the Anthropic streaming response.
//!
//! Bytes are buffered until a full line is available, so chunk boundaries
//! may fall anywhere, including inside a multi-byte UTF-8 sequence. Lines
//! are assembled into events and a blank line dispatches the event.
//!
//! Reference: <https://html.spec.whatwg.org/multipage/server-sent-events.html>

use futures::{Stream, StreamExt};
use turnwise_types::{ProtocolEvent, ProtocolStream, ProviderError};

use crate::error::map_reqwest_error;

/// Turn an HTTP body into a stream of protocol events.
pub(crate) fn protocol_events(
    byte_stream: impl Stream<Item = Result<bytes::Bytes, reqwest::Error>> + Send + 'static,
) -> ProtocolStream {
    Box::pin(frame(byte_stream.map(|chunk| chunk.map_err(map_reqwest_error))))
}

/// Frame any fallible byte stream. Separated from [`protocol_events`] so the
/// framing can be driven without an HTTP response.
pub(crate) fn frame<S, B>(
    byte_stream: S,
) -> impl Stream<Item = Result<ProtocolEvent, ProviderError>> + Send + 'static
where
    S: Stream<Item = Result<B, ProviderError>> + Send + 'static,
    B: AsRef<[u8]> + Send + 'static,
{
    async_stream::stream! {
        let mut framer = SseFramer::default();
        let mut bytes_stream = std::pin::pin!(byte_stream);

        while let Some(chunk) = bytes_stream.next().await {
            let chunk = match chunk {
                Ok(c) => c,
                Err(e) => {
                    yield Err(e);
                    return;
                }
            };
            for event in framer.push(chunk.as_ref()) {
                let failed = event.is_err();
                yield event;
                if failed {
                    return;
                }
            }
        }

        for event in framer.finish() {
            yield event;
        }
    }
}

/// Incremental SSE parser state.
#[derive(Debug, Default)]
pub(crate) struct SseFramer {
    /// Raw bytes of the current incomplete line.
    pending: Vec<u8>,
    /// Value of the last `event:` field.
    event_type: Option<String>,
    /// Accumulated `data:` lines.
    data: String,
}

impl SseFramer {
    /// Feed a chunk and return every event it completes.
    pub(crate) fn push(&mut self, chunk: &[u8]) -> Vec<Result<ProtocolEvent, ProviderError>> {
        self.pending.extend_from_slice(chunk);
        let mut out = Vec::new();

        while let Some(pos) = self.pending.iter().position(|b| *b == b'\n') {
            let raw: Vec<u8> = self.pending.drain(..=pos).collect();
            let line = match std::str::from_utf8(&raw[..raw.len() - 1]) {
                Ok(s) => s.trim_end_matches('\r'),
                Err(e) => {
                    out.push(Err(ProviderError::InvalidResponse(format!(
                        "UTF-8 decode error in SSE line: {e}"
                    ))));
                    return out;
                }
            };
            if let Some(event) = self.process_line(line) {
                out.push(event);
            }
        }
        out
    }

    /// Flush at end of body. A trailing event without its blank line is
    /// still dispatched.
    pub(crate) fn finish(&mut self) -> Vec<Result<ProtocolEvent, ProviderError>> {
        let mut out = Vec::new();
        if !self.pending.is_empty() {
            let raw = std::mem::take(&mut self.pending);
            match String::from_utf8(raw) {
                Ok(line) => {
                    if let Some(event) = self.process_line(line.trim_end_matches('\r')) {
                        out.push(event);
                    }
                }
                Err(e) => {
                    out.push(Err(ProviderError::InvalidResponse(format!(
                        "UTF-8 decode error in SSE line: {e}"
                    ))));
                    return out;
                }
            }
        }
        if let Some(event) = self.dispatch() {
            out.push(event);
        }
        out
    }

    fn process_line(&mut self, line: &str) -> Option<Result<ProtocolEvent, ProviderError>> {
        if line.is_empty() {
            return self.dispatch();
        }
        if line.starts_with(':') {
            return None;
        }

        let (field, value) = match line.split_once(':') {
            Some((f, v)) => (f, v.strip_prefix(' ').unwrap_or(v)),
            None => (line, ""),
        };
        match field {
            "event" => self.event_type = Some(value.to_string()),
            "data" => {
                if !self.data.is_empty() {
                    self.data.push('\n');
                }
                self.data.push_str(value);
            }
            // id, retry and unknown fields carry nothing we use
            _ => {}
        }
        None
    }

    fn dispatch(&mut self) -> Option<Result<ProtocolEvent, ProviderError>> {
        let event_type = self.event_type.take();
        let data = std::mem::take(&mut self.data);
        if data.is_empty() || data == "[DONE]" {
            return None;
        }

        match serde_json::from_str::<ProtocolEvent>(&data) {
            Ok(event) => Some(Ok(event)),
            Err(e) => Some(Err(ProviderError::InvalidResponse(format!(
                "JSON parse error in SSE event {}: {e}",
                event_type.as_deref().unwrap_or("<untyped>")
            )))),
        }
    }
}
