//! Incremental server-sent-event parsing for streamed generations.
//!
//! Network reads split the event stream at arbitrary byte offsets, so a
//! `data:` line may arrive across several chunks. [`SseLineBuffer`] holds the
//! unterminated tail between reads and only decodes complete lines.

use std::collections::VecDeque;
use std::pin::Pin;
use std::time::Duration;

use bytes::Bytes;
use futures_util::stream::{BoxStream, Stream, StreamExt};
use tracing::debug;

use crate::error::{InferenceError, InferenceResult};
use crate::types::GenerateContentResponse;

/// Lazy, forward-only sequence of generated text chunks.
pub type TextStream = BoxStream<'static, InferenceResult<String>>;

const DATA_PREFIX: &str = "data:";
const DONE_SENTINEL: &str = "[DONE]";

/// Line assembler for an SSE byte stream.
#[derive(Debug, Default)]
pub struct SseLineBuffer {
    pending: Vec<u8>,
}

impl SseLineBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one network read; returns the text of every complete data line.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<String> {
        self.pending.extend_from_slice(chunk);

        let mut texts = Vec::new();
        while let Some(pos) = self.pending.iter().position(|&b| b == b'\n') {
            let line: Vec<u8> = self.pending.drain(..=pos).collect();
            if let Some(text) = decode_line(&line) {
                texts.push(text);
            }
        }
        texts
    }

    /// Decode whatever is left once the transport has closed.
    pub fn finish(&mut self) -> Option<String> {
        let rest = std::mem::take(&mut self.pending);
        decode_line(&rest)
    }

    /// Bytes held back waiting for a line terminator.
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }
}

/// Text carried by one SSE line, if it is a well-formed, non-empty data event.
fn decode_line(raw: &[u8]) -> Option<String> {
    // '\n' never occurs inside a multi-byte sequence, so lines are whole UTF-8
    let line = String::from_utf8_lossy(raw);
    let line = line.trim_end_matches(['\n', '\r']);

    let payload = line.strip_prefix(DATA_PREFIX)?.trim_start();
    if payload.is_empty() || payload == DONE_SENTINEL {
        return None;
    }

    match serde_json::from_str::<GenerateContentResponse>(payload) {
        Ok(response) => Some(response.into_text()).filter(|t| !t.is_empty()),
        Err(e) => {
            debug!(error = %e, len = payload.len(), "Skipping malformed stream chunk");
            None
        }
    }
}

struct StreamState<S> {
    body: Pin<Box<S>>,
    buffer: SseLineBuffer,
    ready: VecDeque<String>,
    finished: bool,
}

/// Turn a response body into a [`TextStream`].
///
/// Chunks are yielded in arrival order. The body is only polled when the
/// consumer asks for the next chunk, so dropping the stream stops the read.
/// A gap longer than `idle_timeout` between reads ends the stream with
/// [`InferenceError::Timeout`].
pub fn text_stream<S, E>(body: S, idle_timeout: Duration) -> TextStream
where
    S: Stream<Item = Result<Bytes, E>> + Send + 'static,
    E: Into<InferenceError> + Send + 'static,
{
    let state = StreamState {
        body: Box::pin(body),
        buffer: SseLineBuffer::new(),
        ready: VecDeque::new(),
        finished: false,
    };

    futures_util::stream::unfold(state, move |mut st| async move {
        loop {
            if let Some(text) = st.ready.pop_front() {
                return Some((Ok(text), st));
            }
            if st.finished {
                return None;
            }

            match tokio::time::timeout(idle_timeout, st.body.next()).await {
                Ok(Some(Ok(bytes))) => {
                    let texts = st.buffer.push(&bytes);
                    st.ready.extend(texts);
                }
                Ok(Some(Err(e))) => {
                    st.finished = true;
                    return Some((Err(e.into()), st));
                }
                Ok(None) => {
                    st.finished = true;
                    st.ready.extend(st.buffer.finish());
                }
                Err(_) => {
                    st.finished = true;
                    return Some((Err(InferenceError::Timeout(idle_timeout.as_secs())), st));
                }
            }
        }
    })
    .boxed()
}
