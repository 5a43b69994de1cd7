use bytes::Bytes;
use futures_util::stream::{self, Stream, StreamExt};
use serde_json::Value;
use std::collections::VecDeque;
use std::fmt::Display;
use std::pin::Pin;

use super::{TextStream, UpstreamError};

/// Splits an event-stream body into `data:` payloads.
///
/// Lines are cut on raw bytes so a multi-byte character split across two
/// network chunks is decoded only once the whole line has arrived.
#[derive(Debug, Default)]
pub(super) struct SseLineBuffer {
    pending: Vec<u8>,
}

impl SseLineBuffer {
    pub(super) fn push(&mut self, chunk: &[u8]) -> Vec<String> {
        self.pending.extend_from_slice(chunk);
        let mut payloads = Vec::new();
        while let Some(newline_pos) = self.pending.iter().position(|byte| *byte == b'\n') {
            let line: Vec<u8> = self.pending.drain(..=newline_pos).collect();
            if let Some(data) = data_payload(&line) {
                payloads.push(data);
            }
        }
        payloads
    }

    /// Flushes a trailing line that was not newline-terminated.
    pub(super) fn finish(&mut self) -> Option<String> {
        if self.pending.is_empty() {
            return None;
        }
        let line = std::mem::take(&mut self.pending);
        data_payload(&line)
    }
}

fn data_payload(line: &[u8]) -> Option<String> {
    let line = String::from_utf8_lossy(line);
    let line = line.trim();
    if line.is_empty() || line.starts_with(':') {
        return None;
    }
    strip_sse_data_prefix(line).map(str::to_string)
}

fn strip_sse_data_prefix(line: &str) -> Option<&str> {
    if let Some(data) = line.strip_prefix("data: ") {
        return Some(data);
    }
    line.strip_prefix("data:").map(|value| value.trim_start())
}

#[derive(Debug, PartialEq, Eq)]
pub(super) enum StreamSignal {
    Text(String),
    Stop,
    Error(String),
    Skip,
}

pub(super) fn interpret_event(data: &str) -> StreamSignal {
    let Ok(event) = serde_json::from_str::<Value>(data) else {
        return StreamSignal::Skip;
    };
    match event.get("type").and_then(Value::as_str) {
        Some("content_block_delta") => event
            .pointer("/delta/text")
            .and_then(Value::as_str)
            .filter(|text| !text.is_empty())
            .map(|text| StreamSignal::Text(text.to_string()))
            .unwrap_or(StreamSignal::Skip),
        Some("message_stop") => StreamSignal::Stop,
        Some("error") => {
            let message = event
                .pointer("/error/message")
                .and_then(Value::as_str)
                .unwrap_or("stream error");
            StreamSignal::Error(message.to_string())
        }
        _ => StreamSignal::Skip,
    }
}

struct DecodeState<E> {
    body: Pin<Box<dyn Stream<Item = Result<Bytes, E>> + Send>>,
    lines: SseLineBuffer,
    queued: VecDeque<Result<String, UpstreamError>>,
    finished: bool,
}

impl<E> DecodeState<E> {
    fn absorb(&mut self, payloads: Vec<String>) {
        for data in payloads {
            if self.finished {
                break;
            }
            match interpret_event(&data) {
                StreamSignal::Text(text) => self.queued.push_back(Ok(text)),
                StreamSignal::Stop => self.finished = true,
                StreamSignal::Error(message) => {
                    self.queued.push_back(Err(UpstreamError::Service(message)));
                    self.finished = true;
                }
                StreamSignal::Skip => {}
            }
        }
    }
}

/// Turns a messages event-stream body into text deltas.
pub(super) fn text_deltas<S, E>(body: S) -> TextStream
where
    S: Stream<Item = Result<Bytes, E>> + Send + 'static,
    E: Display + Send + 'static,
{
    let state = DecodeState {
        body: Box::pin(body),
        lines: SseLineBuffer::default(),
        queued: VecDeque::new(),
        finished: false,
    };
    let deltas = stream::unfold(state, |mut state| async move {
        loop {
            if let Some(item) = state.queued.pop_front() {
                return Some((item, state));
            }
            if state.finished {
                return None;
            }
            match state.body.next().await {
                Some(Ok(chunk)) => {
                    let payloads = state.lines.push(&chunk);
                    state.absorb(payloads);
                }
                Some(Err(err)) => {
                    state.finished = true;
                    return Some((Err(UpstreamError::Transport(err.to_string())), state));
                }
                None => {
                    let trailing = state.lines.finish().into_iter().collect();
                    state.absorb(trailing);
                    state.finished = true;
                }
            }
        }
    });
    Box::pin(deltas)
}
