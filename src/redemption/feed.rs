//! Notification sources feeding the [`RedemptionQueue`].
//!
//! * [`replay_fixture`]: one canned notification from a JSON file, for
//!   exercising the call path without the streaming platform.
//! * [`read_lines`]: newline-delimited JSON notifications, one per line.

use std::path::Path;

use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tokio_util::sync::CancellationToken;

use super::event::{EventError, RedemptionEvent};
use super::queue::{Admission, RedemptionQueue};

/// Decode the notification stored at `path` and submit it.
pub async fn replay_fixture(
    path: &Path,
    queue: &RedemptionQueue,
) -> Result<Admission, EventError> {
    let json = tokio::fs::read_to_string(path).await?;
    let event = RedemptionEvent::from_json(&json)?;
    log::info!(
        "replaying '{}' from {} ({})",
        event.reward_title,
        event.caller,
        path.display()
    );
    Ok(queue.submit(event))
}

/// Submit every notification read from `reader` until it is exhausted, the
/// queue closes or `cancel` fires.  Lines that do not decode are skipped.
///
/// Returns the number of redemptions accepted.
pub async fn read_lines<R>(
    reader: R,
    queue: &RedemptionQueue,
    cancel: &CancellationToken,
) -> Result<usize, EventError>
where
    R: AsyncBufRead + Unpin,
{
    let mut lines = reader.lines();
    let mut accepted = 0;

    loop {
        let line = tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            line = lines.next_line() => match line? {
                Some(line) => line,
                None => break,
            },
        };
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let event = match RedemptionEvent::from_json(line) {
            Ok(event) => event,
            Err(e) => {
                log::warn!("skipping notification: {e}");
                continue;
            }
        };
        match queue.submit(event) {
            Admission::Accepted => accepted += 1,
            Admission::Rejected => {}
            Admission::Closed => {
                log::debug!("queue closed, no longer reading notifications");
                break;
            }
        }
    }
    Ok(accepted)
}
