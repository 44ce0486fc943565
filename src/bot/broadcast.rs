//! Batched mass-mention for `tag-all`.

use std::num::NonZeroUsize;
use std::time::Duration;

use tokio::time::sleep;
use tracing::debug;

use super::client::{ChatClient, OutgoingMessage, Participant};
use super::error::ClientError;

/// Split participants into contiguous batches of at most `size`, order kept.
pub fn plan(participants: &[Participant], size: NonZeroUsize) -> Vec<&[Participant]> {
    participants.chunks(size.get()).collect()
}

/// One message mentioning every participant of `batch`.
pub fn batch_message(batch: &[Participant]) -> OutgoingMessage {
    let mentions: Vec<_> = batch.iter().map(Participant::contact).collect();
    let text = mentions
        .iter()
        .map(|c| c.mention_token())
        .collect::<Vec<_>>()
        .join(" ");
    OutgoingMessage::with_mentions(text, mentions)
}

/// Mention all `participants` in `chat_id`, one batch at a time with `delay`
/// between batches. Stops at the first failed send.
///
/// Returns the number of batches sent.
pub async fn broadcast(
    client: &dyn ChatClient,
    chat_id: i64,
    participants: &[Participant],
    size: NonZeroUsize,
    delay: Duration,
) -> Result<usize, ClientError> {
    let batches = plan(participants, size);
    let total = batches.len();

    for (i, batch) in batches.into_iter().enumerate() {
        client.send_message(chat_id, batch_message(batch)).await?;
        debug!("Sent tag batch {}/{} ({} mentions) to chat {}", i + 1, total, batch.len(), chat_id);

        if i + 1 < total {
            sleep(delay).await;
        }
    }

    Ok(total)
}
