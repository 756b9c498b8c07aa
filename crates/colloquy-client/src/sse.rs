//! Incremental decoding of the backend's turn-event frames.
//!
//! The turn channel is Server-Sent Events carrying one JSON event per
//! `data:` frame. The event discriminator lives inside the JSON payload
//! rather than in SSE `event:` fields, so the decoder only assembles
//! `data:` lines (multi-line data joined on blank-line boundaries) and
//! ignores every other SSE field. Decoding is chunk-boundary safe and
//! handles both `\n` and `\r\n` line endings.

use std::collections::VecDeque;
use std::pin::Pin;
use std::task::{Context, Poll};

use bytes::Bytes;
use colloquy_core::{TransportError, TurnEvent};
use futures::Stream;

/// Assembles `data:` frames from a byte stream fed chunk by chunk.
#[derive(Debug, Default)]
pub struct SseFrameDecoder {
    buffer: Vec<u8>,
    data_lines: Vec<String>,
}

impl SseFrameDecoder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Feeds one chunk and returns the frames it completed.
    pub fn feed(&mut self, chunk: &[u8]) -> Vec<String> {
        self.buffer.extend_from_slice(chunk);
        let mut frames = Vec::new();
        while let Some(pos) = self.buffer.iter().position(|&b| b == b'\n') {
            let raw: Vec<u8> = self.buffer.drain(..=pos).collect();
            let mut line = String::from_utf8_lossy(&raw[..pos]).into_owned();
            if line.ends_with('\r') {
                line.pop();
            }
            if let Some(frame) = self.process_line(&line) {
                frames.push(frame);
            }
        }
        frames
    }

    /// Flushes the final frame at end of stream; a stream may close without
    /// a trailing blank line.
    pub fn finish(&mut self) -> Option<String> {
        if !self.buffer.is_empty() {
            let raw = std::mem::take(&mut self.buffer);
            let mut line = String::from_utf8_lossy(&raw).into_owned();
            if line.ends_with('\r') {
                line.pop();
            }
            if let Some(frame) = self.process_line(&line) {
                return Some(frame);
            }
        }
        self.take_frame()
    }

    fn process_line(&mut self, line: &str) -> Option<String> {
        if line.is_empty() {
            return self.take_frame();
        }
        if let Some(data) = line.strip_prefix("data:") {
            let data = data.strip_prefix(' ').unwrap_or(data);
            self.data_lines.push(data.to_string());
        }
        // Every other field (`event:`, `id:`, `retry:`, comments) is
        // ignored: the discriminator lives inside the JSON payload.
        None
    }

    fn take_frame(&mut self) -> Option<String> {
        if self.data_lines.is_empty() {
            return None;
        }
        let frame = self.data_lines.join("\n");
        self.data_lines.clear();
        Some(frame)
    }
}

/// A stream adapter that decodes [`TurnEvent`]s from an SSE byte stream.
///
/// Frames that fail to deserialize are logged and skipped: one bad frame
/// must not kill the turn.
pub struct TurnEventStream<S> {
    inner: S,
    decoder: SseFrameDecoder,
    pending: VecDeque<String>,
    done: bool,
}

impl<S> TurnEventStream<S> {
    #[must_use]
    pub fn new(inner: S) -> Self {
        Self {
            inner,
            decoder: SseFrameDecoder::new(),
            pending: VecDeque::new(),
            done: false,
        }
    }
}

impl<S> Stream for TurnEventStream<S>
where
    S: Stream<Item = Result<Bytes, TransportError>> + Unpin,
{
    type Item = Result<TurnEvent, TransportError>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();
        loop {
            while let Some(frame) = this.pending.pop_front() {
                match serde_json::from_str::<TurnEvent>(&frame) {
                    Ok(event) => return Poll::Ready(Some(Ok(event))),
                    Err(err) => {
                        tracing::warn!("[TurnEventStream] Skipping undecodable frame: {}", err);
                    }
                }
            }

            if this.done {
                return Poll::Ready(None);
            }

            match Pin::new(&mut this.inner).poll_next(cx) {
                Poll::Ready(Some(Ok(bytes))) => {
                    this.pending.extend(this.decoder.feed(&bytes));
                }
                Poll::Ready(Some(Err(err))) => return Poll::Ready(Some(Err(err))),
                Poll::Ready(None) => {
                    this.done = true;
                    if let Some(frame) = this.decoder.finish() {
                        this.pending.push_back(frame);
                    }
                }
                Poll::Pending => return Poll::Pending,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use colloquy_core::EventKind;
    use futures::StreamExt;

    fn bytes_stream(chunks: Vec<&str>) -> impl Stream<Item = Result<Bytes, TransportError>> + Unpin {
        futures::stream::iter(
            chunks
                .into_iter()
                .map(|s| Ok(Bytes::from(s.to_string())))
                .collect::<Vec<_>>(),
        )
    }

    async fn collect(chunks: Vec<&str>) -> Vec<TurnEvent> {
        TurnEventStream::new(bytes_stream(chunks))
            .map(|item| item.unwrap())
            .collect()
            .await
    }

    #[test]
    fn decoder_emits_frame_on_blank_line() {
        let mut decoder = SseFrameDecoder::new();
        assert!(decoder.feed(b"data: {\"type\":\"start\"}\n").is_empty());
        assert_eq!(decoder.feed(b"\n"), vec![r#"{"type":"start"}"#]);
    }

    #[test]
    fn decoder_joins_multiline_data() {
        let mut decoder = SseFrameDecoder::new();
        decoder.feed(b"data: line1\n");
        decoder.feed(b"data: line2\n");
        assert_eq!(decoder.feed(b"\n"), vec!["line1\nline2"]);
    }

    #[test]
    fn decoder_is_chunk_boundary_safe() {
        let mut decoder = SseFrameDecoder::new();
        assert!(decoder.feed(b"dat").is_empty());
        assert!(decoder.feed(b"a: hel").is_empty());
        assert!(decoder.feed(b"lo\n").is_empty());
        assert_eq!(decoder.feed(b"\n"), vec!["hello"]);
    }

    #[test]
    fn decoder_handles_crlf_and_no_space_after_colon() {
        let mut decoder = SseFrameDecoder::new();
        decoder.feed(b"data:compact\r\n");
        assert_eq!(decoder.feed(b"\r\n"), vec!["compact"]);
    }

    #[test]
    fn decoder_ignores_comments_and_other_fields() {
        let mut decoder = SseFrameDecoder::new();
        decoder.feed(b": keepalive\n");
        decoder.feed(b"event: message\n");
        decoder.feed(b"id: 7\n");
        decoder.feed(b"retry: 1500\n");
        decoder.feed(b"data: payload\n");
        assert_eq!(decoder.feed(b"\n"), vec!["payload"]);
    }

    #[test]
    fn finish_flushes_frame_without_trailing_blank_line() {
        let mut decoder = SseFrameDecoder::new();
        decoder.feed(b"data: tail");
        assert_eq!(decoder.finish(), Some("tail".to_string()));
        assert_eq!(decoder.finish(), None);
    }

    #[tokio::test]
    async fn stream_decodes_turn_events() {
        let events = collect(vec![
            "data: {\"type\":\"start\"}\n\n",
            "data: {\"type\":\"content\",\"content\":\"Hi\"}\n\n",
            "data: {\"type\":\"done\"}\n\n",
        ])
        .await;

        assert_eq!(events.len(), 3);
        assert_eq!(events[0].kind, EventKind::Start);
        assert_eq!(events[1].kind, EventKind::Content);
        assert_eq!(events[1].content.as_deref(), Some("Hi"));
        assert_eq!(events[2].kind, EventKind::Done);
    }

    #[tokio::test]
    async fn stream_decodes_event_split_across_chunks() {
        let events = collect(vec![
            "data: {\"type\":\"con",
            "tent\",\"content\":\" there\"}\n",
            "\n",
        ])
        .await;

        assert_eq!(events.len(), 1);
        assert_eq!(events[0].content.as_deref(), Some(" there"));
    }

    #[tokio::test]
    async fn undecodable_frames_are_skipped() {
        let events = collect(vec![
            "data: not json at all\n\n",
            "data: {\"type\":\"done\"}\n\n",
        ])
        .await;

        assert_eq!(events.len(), 1);
        assert_eq!(events[0].kind, EventKind::Done);
    }

    #[tokio::test]
    async fn final_event_without_trailing_blank_line_is_emitted() {
        let events = collect(vec!["data: {\"type\":\"done\"}"]).await;
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].kind, EventKind::Done);
    }

    #[tokio::test]
    async fn transport_errors_pass_through() {
        let chunks: Vec<Result<Bytes, TransportError>> = vec![
            Ok(Bytes::from_static(b"data: {\"type\":\"start\"}\n\n")),
            Err(TransportError::connection("connection reset", true)),
        ];
        let mut stream = TurnEventStream::new(futures::stream::iter(chunks));

        assert!(stream.next().await.unwrap().is_ok());
        assert!(stream.next().await.unwrap().is_err());
    }

    #[tokio::test]
    async fn empty_stream_yields_nothing() {
        assert!(collect(vec![]).await.is_empty());
    }

    #[tokio::test]
    async fn unknown_event_kinds_still_decode() {
        let events = collect(vec!["data: {\"type\":\"keepalive\"}\n\n"]).await;
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].kind, EventKind::Unknown);
    }
}
