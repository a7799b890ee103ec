//! Aggregation of streamed completions.

use promptgate_core::{ChunkReceiver, ProviderError};
use tokio_stream::StreamExt;
use tokio_stream::wrappers::ReceiverStream;
use tracing::trace;

/// Drain `rx` and concatenate every fragment in arrival order.
///
/// Stops at the first `done` chunk or when the sender closes. The first
/// error item aborts aggregation and is returned as-is.
pub async fn collect_stream(rx: ChunkReceiver) -> Result<String, ProviderError> {
    let mut stream = ReceiverStream::new(rx);
    let mut text = String::new();
    let mut fragments = 0usize;

    while let Some(item) = stream.next().await {
        let chunk = item?;
        if let Some(content) = chunk.content {
            text.push_str(&content);
            fragments += 1;
        }
        if chunk.done {
            break;
        }
    }

    trace!(fragments, chars = text.len(), "Stream aggregated");
    Ok(text)
}
