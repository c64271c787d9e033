//! Incremental server-sent-event framing.

use bytes::{Bytes, BytesMut};

/// Splits a chunked SSE byte stream into complete frames.
///
/// A frame ends at the first blank line (`\n\n` or `\r\n\r\n`). Bytes after
/// the last boundary stay buffered until the next chunk arrives, so frames
/// and multi-byte characters split across chunks come out whole.
#[derive(Debug, Default)]
pub struct SseFrameSplitter {
    buffer: BytesMut,
}

impl SseFrameSplitter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a chunk and returns every frame it completed, each still
    /// carrying the blank line that terminated it upstream.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<Bytes> {
        self.buffer.extend_from_slice(chunk);

        let mut frames = Vec::new();
        while let Some((end, separator_len)) = find_boundary(&self.buffer) {
            frames.push(self.buffer.split_to(end + separator_len).freeze());
        }
        frames
    }

    /// Returns whatever is left once the upstream has ended, if it holds
    /// more than whitespace. The tail never saw its blank line, so it is
    /// closed with `\n\n`.
    pub fn finish(&mut self) -> Option<Bytes> {
        let rest = self.buffer.split().freeze();
        if rest.iter().all(|b| b.is_ascii_whitespace()) {
            None
        } else {
            let mut frame = BytesMut::from(&trim_trailing_newlines(rest)[..]);
            frame.extend_from_slice(b"\n\n");
            Some(frame.freeze())
        }
    }
}

fn find_boundary(buf: &[u8]) -> Option<(usize, usize)> {
    let lf = find(buf, b"\n\n").map(|pos| (pos, 2));
    let crlf = find(buf, b"\r\n\r\n").map(|pos| (pos, 4));
    match (lf, crlf) {
        (Some(a), Some(b)) => Some(if a.0 <= b.0 { a } else { b }),
        (a, b) => a.or(b),
    }
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack
        .windows(needle.len())
        .position(|window| window == needle)
}

fn trim_trailing_newlines(mut frame: Bytes) -> Bytes {
    let keep = frame
        .iter()
        .rposition(|b| *b != b'\n' && *b != b'\r')
        .map(|i| i + 1)
        .unwrap_or(0);
    frame.truncate(keep);
    frame
}

/// Joins the `data:` lines of a frame the way an SSE client would.
///
/// Returns `None` when the frame carries no data (comments, `event:`-only
/// frames) or is not UTF-8.
pub fn frame_data(frame: &[u8]) -> Option<String> {
    let text = std::str::from_utf8(frame).ok()?;
    let data: Vec<&str> = text
        .lines()
        .filter_map(|line| line.strip_prefix("data:"))
        .map(|value| value.strip_prefix(' ').unwrap_or(value))
        .collect();

    if data.is_empty() {
        None
    } else {
        Some(data.join("\n"))
    }
}
