use super::client::ByteStream;
use super::types::anthropic::{parse_feed_line, FeedLine};
use super::types::StreamFragment;
use anyhow::{anyhow, Result};
use eventsource_stream::Eventsource;
use futures::StreamExt;
use log::{error, trace, warn};
use tokio::sync::mpsc;

const DONE_SENTINEL: &str = "[DONE]";

/// Convert the upstream byte stream into an ordered fragment stream
///
/// Returns when the feed ends, on `message_stop`, or after sending a single `Err`.
/// Malformed lines are logged and skipped.
///
/// # Arguments
/// * `stream` - upstream response body
/// * `tx_event` - parsed fragment sender
pub async fn handle_anthropic_stream(
    stream: ByteStream,
    tx_event: mpsc::UnboundedSender<Result<StreamFragment>>,
) {
    let mut stream = stream.eventsource();

    loop {
        let sse = match stream.next().await {
            Some(Ok(sse)) => sse,
            None => return,
            Some(Err(e)) => {
                let error_msg = format!("SSE Error: {}", e);
                error!("{}", error_msg);
                let _ = tx_event.send(Err(anyhow!(error_msg)));
                return;
            }
        };

        trace!("Generation SSE: [{}] {}", sse.event, sse.data);

        // Consecutive `data:` lines arrive joined by '\n'; each one is its own fragment.
        for line in sse.data.lines() {
            let line = line.trim();
            if line.is_empty() || line == DONE_SENTINEL {
                continue;
            }

            match parse_feed_line(line) {
                Ok(FeedLine::Fragment(fragment)) => {
                    if tx_event.send(Ok(fragment)).is_err() {
                        return;
                    }
                }
                Ok(FeedLine::Ignored) => {}
                Ok(FeedLine::Stop) => return,
                Ok(FeedLine::Error(message)) => {
                    error!("Generation stream aborted by provider: {}", message);
                    let _ = tx_event.send(Err(anyhow!(message)));
                    return;
                }
                Err(e) => {
                    warn!("Skipping malformed SSE line: {}", e);
                }
            }
        }
    }
}
