//! Response normalization for `/api/analyze`
//!
//! Turns either a finished answer or a live upstream SSE body into the frame
//! stream the front end consumes. Both outputs are infallible streams: every
//! failure after the response has started is delivered as an error frame.

pub mod normalize;
pub mod sse;

pub use normalize::{error_frame, normalized_frame, rewrite_frame, NormalizedEvent};
pub use sse::SseFrameSplitter;

use crate::ai::ByteStream;
use bytes::Bytes;
use futures::stream::{self, BoxStream, StreamExt};
use std::convert::Infallible;

pub type FrameStream = BoxStream<'static, Result<Bytes, Infallible>>;

/// Exactly one normalized frame holding the whole answer.
pub fn buffered_stream(text: String) -> FrameStream {
    Box::pin(stream::once(async move {
        Ok::<_, Infallible>(normalized_frame(&text))
    }))
}

struct RelayState {
    upstream: Option<ByteStream>,
    splitter: SseFrameSplitter,
}

/// Forwards upstream frames one for one, in arrival order.
///
/// Error frames are rewritten, everything else passes through unchanged. A
/// transport failure produces a single error frame and ends the stream. The
/// upstream body is owned by the returned stream, so dropping it (client
/// disconnect) closes the upstream connection.
pub fn relay_stream(upstream: ByteStream) -> FrameStream {
    let state = RelayState {
        upstream: Some(upstream),
        splitter: SseFrameSplitter::new(),
    };

    let frames = stream::unfold(state, |mut state| async move {
        let upstream = state.upstream.as_mut()?;
        let next = upstream.next().await;
        let out: Vec<Bytes> = match next {
            Some(Ok(chunk)) => {
                tracing::trace!("Upstream chunk ({} bytes)", chunk.len());
                state.splitter.push(&chunk).into_iter().map(rewrite_frame).collect()
            }
            Some(Err(e)) => {
                tracing::error!("Upstream stream failed: {}", e);
                state.upstream = None;
                vec![error_frame(&e.to_string())]
            }
            None => {
                tracing::debug!("Upstream stream finished");
                state.upstream = None;
                state.splitter.finish().map(rewrite_frame).into_iter().collect()
            }
        };
        Some((stream::iter(out.into_iter().map(Ok::<Bytes, Infallible>)), state))
    });

    Box::pin(frames.flatten())
}
