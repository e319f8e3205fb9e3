//! Newline-delimited JSON framing for streamed Ollama responses.
//!
//! Chunks from the HTTP body can split a frame anywhere, including inside a
//! multi-byte character, so bytes are buffered until a `\n` arrives.

use std::collections::VecDeque;
use std::fmt::Display;

use futures::stream::{self, BoxStream, Stream, StreamExt};
use tracing::debug;

use qwen_core::{QwenError, TextStream};

/// What one frame contributed to the stream.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Frame {
    pub text: Option<String>,
    /// The server marked this as the last frame.
    pub done: bool,
}

/// Accumulates raw bytes and hands out complete lines.
#[derive(Debug, Default)]
pub struct LineBuffer {
    buf: Vec<u8>,
}

impl LineBuffer {
    /// Append a chunk and return every line it completed, without the `\n`.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<Vec<u8>> {
        self.buf.extend_from_slice(chunk);
        let mut lines = Vec::new();
        while let Some(pos) = self.buf.iter().position(|b| *b == b'\n') {
            let mut line: Vec<u8> = self.buf.drain(..=pos).collect();
            line.pop();
            lines.push(line);
        }
        lines
    }

    /// Whatever is left once the body ends.
    pub fn finish(&mut self) -> Option<Vec<u8>> {
        if self.buf.iter().all(u8::is_ascii_whitespace) {
            self.buf.clear();
            None
        } else {
            Some(std::mem::take(&mut self.buf))
        }
    }
}

struct FrameState<F> {
    body: BoxStream<'static, Result<Vec<u8>, String>>,
    lines: LineBuffer,
    pending: VecDeque<Result<String, QwenError>>,
    finished: bool,
    decode: F,
}

impl<F> FrameState<F>
where
    F: Fn(&str) -> Result<Frame, QwenError>,
{
    fn accept(&mut self, raw: Vec<u8>) {
        if self.finished {
            return;
        }
        let Ok(line) = String::from_utf8(raw) else {
            debug!("Skipping frame with invalid UTF-8");
            return;
        };
        let line = line.trim();
        if line.is_empty() {
            return;
        }
        match (self.decode)(line) {
            Ok(frame) => {
                if let Some(text) = frame.text.filter(|t| !t.is_empty()) {
                    self.pending.push_back(Ok(text));
                }
                self.finished = frame.done;
            }
            Err(e) => {
                self.pending.push_back(Err(e));
                self.finished = true;
            }
        }
    }
}

/// Turn an HTTP body into a stream of text fragments.
///
/// `decode` maps one line to a frame. The stream ends after a `done` frame,
/// after the first error, or when the body ends.
pub fn frame_stream<S, B, E, F>(body: S, decode: F) -> TextStream
where
    S: Stream<Item = Result<B, E>> + Send + 'static,
    B: AsRef<[u8]>,
    E: Display,
    F: Fn(&str) -> Result<Frame, QwenError> + Send + 'static,
{
    let state = FrameState {
        body: body
            .map(|chunk| chunk.map(|b| b.as_ref().to_vec()).map_err(|e| e.to_string()))
            .boxed(),
        lines: LineBuffer::default(),
        pending: VecDeque::new(),
        finished: false,
        decode,
    };

    stream::unfold(state, |mut st| async move {
        loop {
            if let Some(item) = st.pending.pop_front() {
                return Some((item, st));
            }
            if st.finished {
                return None;
            }
            match st.body.next().await {
                Some(Ok(chunk)) => {
                    for line in st.lines.push(&chunk) {
                        st.accept(line);
                    }
                }
                Some(Err(e)) => {
                    st.finished = true;
                    st.pending
                        .push_back(Err(QwenError::Protocol(format!("stream interrupted: {e}"))));
                }
                None => {
                    if let Some(rest) = st.lines.finish() {
                        st.accept(rest);
                    }
                    st.finished = true;
                }
            }
        }
    })
    .boxed()
}
