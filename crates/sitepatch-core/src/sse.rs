//! Decoding of chat-completion event streams.
//!
//! The transport delivers arbitrary byte fragments. Each fragment is run
//! through an incremental UTF-8 decoder (a character split across two
//! fragments is held until its remaining bytes arrive), then cut into
//! lines. Lines of the form `data: {json}` contribute
//! `choices[0].delta.content`; `data: [DONE]` ends the stream. Everything
//! else, including malformed JSON, is ignored.
//!
//! ```rust
//! use sitepatch_core::sse::SseDecoder;
//!
//! let mut decoder = SseDecoder::default();
//! let mut text = decoder.push(b"data: {\"choices\":[{\"delta\":{\"content\":\"Hel\"}}]}\nda").concat();
//! text += &decoder.push(b"ta: {\"choices\":[{\"delta\":{\"content\":\"lo\"}}]}\ndata: [DONE]\n").concat();
//! assert_eq!(text, "Hello");
//! assert!(decoder.is_done());
//! ```

use crate::Result;
use bytes::Bytes;
use futures::stream::{self, Stream, StreamExt};
use serde::Deserialize;
use std::collections::VecDeque;
use tracing::trace;

/// Prefix of every payload line.
pub const DATA_PREFIX: &str = "data: ";
/// Payload that terminates the stream.
pub const DONE_SENTINEL: &str = "[DONE]";

/// Stateful UTF-8 decoder for fragmented input.
///
/// Incomplete trailing sequences are buffered; invalid sequences become
/// U+FFFD.
#[derive(Debug, Default, Clone)]
pub struct Utf8Decoder {
    pending: Vec<u8>,
}

impl Utf8Decoder {
    /// Decodes `bytes`, holding back an incomplete trailing character.
    pub fn decode(&mut self, bytes: &[u8]) -> String {
        self.pending.extend_from_slice(bytes);
        let mut out = String::with_capacity(self.pending.len());
        let mut start = 0;

        while start < self.pending.len() {
            match std::str::from_utf8(&self.pending[start..]) {
                Ok(valid) => {
                    out.push_str(valid);
                    start = self.pending.len();
                },
                Err(err) => {
                    let valid_end = start + err.valid_up_to();
                    out.push_str(&String::from_utf8_lossy(&self.pending[start..valid_end]));
                    match err.error_len() {
                        Some(invalid) => {
                            out.push(char::REPLACEMENT_CHARACTER);
                            start = valid_end + invalid;
                        },
                        None => {
                            start = valid_end;
                            break;
                        },
                    }
                },
            }
        }

        self.pending.drain(..start);
        out
    }

    /// Flushes whatever is still buffered, replacing it if incomplete.
    pub fn finish(&mut self) -> String {
        let rest = String::from_utf8_lossy(&self.pending).into_owned();
        self.pending.clear();
        rest
    }
}

#[derive(Debug, Deserialize)]
struct CompletionChunk {
    #[serde(default)]
    choices: Vec<ChunkChoice>,
}

#[derive(Debug, Deserialize)]
struct ChunkChoice {
    #[serde(default)]
    delta: Option<ChunkDelta>,
}

#[derive(Debug, Deserialize)]
struct ChunkDelta {
    #[serde(default)]
    content: Option<String>,
}

enum Line {
    Delta(String),
    Done,
    Ignored,
}

fn classify(line: &str) -> Line {
    let Some(payload) = line.strip_prefix(DATA_PREFIX) else {
        trace!(len = line.len(), "ignoring non-data line");
        return Line::Ignored;
    };
    let payload = payload.trim();
    if payload == DONE_SENTINEL {
        return Line::Done;
    }
    match serde_json::from_str::<CompletionChunk>(payload) {
        Ok(chunk) => chunk
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.delta)
            .and_then(|delta| delta.content)
            .filter(|content| !content.is_empty())
            .map_or(Line::Ignored, Line::Delta),
        Err(err) => {
            trace!(error = %err, "ignoring malformed data line");
            Line::Ignored
        },
    }
}

/// Incremental decoder from raw event-stream bytes to content deltas.
#[derive(Debug, Default, Clone)]
pub struct SseDecoder {
    utf8: Utf8Decoder,
    line: String,
    done: bool,
}

impl SseDecoder {
    /// Feeds one transport fragment, returning the deltas it completed.
    ///
    /// Once `[DONE]` has been seen, further input is discarded.
    pub fn push(&mut self, bytes: &[u8]) -> Vec<String> {
        if self.done {
            return Vec::new();
        }
        let text = self.utf8.decode(bytes);
        self.line.push_str(&text);

        let mut deltas = Vec::new();
        let mut consumed = 0;
        while let Some(offset) = self.line[consumed..].find('\n') {
            let end = consumed + offset;
            match classify(&self.line[consumed..end]) {
                Line::Delta(delta) => deltas.push(delta),
                Line::Done => {
                    self.done = true;
                    self.line.clear();
                    return deltas;
                },
                Line::Ignored => {},
            }
            consumed = end + 1;
        }
        self.line.drain(..consumed);
        deltas
    }

    /// Ends the input, treating a held-back final line as complete.
    pub fn finish(&mut self) -> Vec<String> {
        if self.done {
            return Vec::new();
        }
        let tail = self.utf8.finish();
        self.line.push_str(&tail);
        let line = std::mem::take(&mut self.line);
        self.done = true;
        match classify(&line) {
            Line::Delta(delta) => vec![delta],
            Line::Done | Line::Ignored => Vec::new(),
        }
    }

    /// Whether the terminating sentinel (or the end of input) was reached.
    pub const fn is_done(&self) -> bool {
        self.done
    }
}

/// Decodes a complete event-stream capture in one go.
pub fn decode_all(bytes: &[u8]) -> String {
    let mut decoder = SseDecoder::default();
    let mut text = decoder.push(bytes).concat();
    text.push_str(&decoder.finish().concat());
    text
}

struct DeltaState<S> {
    body: S,
    decoder: SseDecoder,
    ready: VecDeque<String>,
    finished: bool,
}

/// Turns a transport body into a lazy stream of content deltas.
///
/// The body is not polled again after `[DONE]`. A transport error is
/// yielded once and ends the stream.
pub fn content_deltas<S>(body: S) -> impl Stream<Item = Result<String>> + Send
where
    S: Stream<Item = Result<Bytes>> + Send + Unpin,
{
    let state = DeltaState {
        body,
        decoder: SseDecoder::default(),
        ready: VecDeque::new(),
        finished: false,
    };

    stream::unfold(state, |mut state| async move {
        loop {
            if let Some(delta) = state.ready.pop_front() {
                return Some((Ok(delta), state));
            }
            if state.finished || state.decoder.is_done() {
                return None;
            }
            match state.body.next().await {
                Some(Ok(bytes)) => state.ready.extend(state.decoder.push(&bytes)),
                Some(Err(err)) => {
                    state.finished = true;
                    return Some((Err(err), state));
                },
                None => {
                    state.ready.extend(state.decoder.finish());
                    state.finished = true;
                },
            }
        }
    })
}

/// Drains a transport body and concatenates its content deltas.
pub async fn collect_content<S>(body: S) -> Result<String>
where
    S: Stream<Item = Result<Bytes>> + Send + Unpin,
{
    let mut deltas = std::pin::pin!(content_deltas(body));
    let mut text = String::new();
    while let Some(delta) = deltas.next().await {
        text.push_str(&delta?);
    }
    Ok(text)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::Error;
    use proptest::prelude::*;

    fn frame(content: &str) -> String {
        let chunk = serde_json::json!({ "choices": [{ "delta": { "content": content } }] });
        format!("data: {chunk}\n")
    }

    fn body(parts: Vec<Vec<u8>>) -> impl Stream<Item = Result<Bytes>> + Send + Unpin {
        stream::iter(parts.into_iter().map(|p| Ok(Bytes::from(p))))
    }

    #[test]
    fn utf8_decoder_holds_split_characters() {
        let bytes = "héllo ✓".as_bytes();
        let split = bytes.iter().position(|&b| b == 0xC3).unwrap() + 1;
        let mut decoder = Utf8Decoder::default();
        let first = decoder.decode(&bytes[..split]);
        assert_eq!(first, "h");
        let second = decoder.decode(&bytes[split..]);
        assert_eq!(second, "éllo ✓");
        assert_eq!(decoder.finish(), "");
    }

    #[test]
    fn utf8_decoder_replaces_invalid_bytes() {
        let mut decoder = Utf8Decoder::default();
        assert_eq!(decoder.decode(b"a\xFFb"), "a\u{FFFD}b");
        assert_eq!(decoder.decode(b"\xE2\x9C"), "");
        assert_eq!(decoder.finish(), "\u{FFFD}");
    }

    #[test]
    fn ignores_noise_and_malformed_lines() {
        let input = format!(
            ": keep-alive\nevent: ping\ndata: {{not json\n{}data: {{\"choices\":[]}}\ndata: {{\"choices\":[{{\"delta\":{{}}}}]}}\n{}",
            frame("a"),
            frame("b")
        );
        assert_eq!(decode_all(input.as_bytes()), "ab");
    }

    #[test]
    fn stops_at_done_sentinel() {
        let input = format!("{}data: [DONE]\n{}", frame("kept"), frame("dropped"));
        let mut decoder = SseDecoder::default();
        assert_eq!(decoder.push(input.as_bytes()), vec!["kept".to_string()]);
        assert!(decoder.is_done());
        assert!(decoder.push(frame("later").as_bytes()).is_empty());
    }

    #[test]
    fn done_sentinel_tolerates_surrounding_whitespace() {
        let input = format!("{}data:  [DONE] \r\n{}", frame("x"), frame("y"));
        assert_eq!(decode_all(input.as_bytes()), "x");
    }

    #[test]
    fn final_line_without_newline_is_processed() {
        let input = frame("tail");
        assert_eq!(decode_all(input.trim_end().as_bytes()), "tail");
    }

    #[test]
    fn crlf_framing() {
        let input = frame("a").replace('\n', "\r\n");
        assert_eq!(decode_all(input.as_bytes()), "a");
    }

    #[tokio::test]
    async fn collects_fragmented_body() {
        let text = format!("{}{}data: [DONE]\n", frame("<h1>"), frame("Hi</h1>"));
        let parts = text.as_bytes().chunks(5).map(<[u8]>::to_vec).collect();
        assert_eq!(collect_content(body(parts)).await.unwrap(), "<h1>Hi</h1>");
    }

    #[tokio::test]
    async fn body_is_not_polled_after_done() {
        let parts = vec![
            Ok(Bytes::from(format!("{}data: [DONE]\n", frame("ok")))),
            Err(Error::Other("should never be read".into())),
        ];
        let text = collect_content(stream::iter(parts)).await.unwrap();
        assert_eq!(text, "ok");
    }

    #[tokio::test]
    async fn transport_error_ends_stream() {
        let parts = vec![
            Ok(Bytes::from(frame("partial"))),
            Err(Error::Other("connection reset".into())),
        ];
        let deltas: Vec<_> = content_deltas(stream::iter(parts)).collect().await;
        assert_eq!(deltas.len(), 2);
        assert_eq!(deltas[0].as_ref().unwrap(), "partial");
        assert!(matches!(deltas[1], Err(Error::Other(_))));
    }

    proptest! {
        #[test]
        fn fragmentation_does_not_change_output(
            words in proptest::collection::vec("[a-zé✓ <>/\"\\\\]{0,12}", 1..8),
            cuts in proptest::collection::vec(any::<prop::sample::Index>(), 0..12),
        ) {
            let mut text = words.iter().map(|w| frame(w)).collect::<String>();
            text.push_str("data: [DONE]\n");
            let bytes = text.as_bytes();

            let mut points: Vec<usize> = cuts.iter().map(|c| c.index(bytes.len() + 1)).collect();
            points.sort_unstable();
            points.dedup();

            let mut decoder = SseDecoder::default();
            let mut pieced = String::new();
            let mut last = 0;
            for point in points.into_iter().chain(std::iter::once(bytes.len())) {
                pieced.push_str(&decoder.push(&bytes[last..point]).concat());
                last = point;
            }
            pieced.push_str(&decoder.finish().concat());

            prop_assert_eq!(pieced, words.concat());
        }
    }
}
