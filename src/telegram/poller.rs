//! Long-polling update loop.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::client::BotApi;
use super::gateway::TelegramError;
use super::types::Update;

/// Pause after a failed `getUpdates` call.
const ERROR_BACKOFF: Duration = Duration::from_secs(5);

/// Polls `getUpdates` and forwards every update to the dispatcher.
#[derive(Debug)]
pub struct UpdatePoller {
    api: Arc<BotApi>,
}

impl UpdatePoller {
    #[must_use]
    pub fn new(api: Arc<BotApi>) -> Self {
        Self { api }
    }

    /// Spawns the polling task.
    ///
    /// The task ends when the receiver is dropped; abort the handle to stop
    /// it earlier.
    pub fn start(self) -> (mpsc::Receiver<Update>, JoinHandle<()>) {
        let (tx, rx) = mpsc::channel::<Update>(64);

        let handle = tokio::spawn(async move {
            info!("Update poller started");
            let mut offset: Option<i64> = None;

            loop {
                match self.api.get_updates(offset).await {
                    Ok(updates) => {
                        for update in updates {
                            offset = Some(next_offset(offset, update.update_id));
                            if tx.send(update).await.is_err() {
                                info!("Dispatcher gone, stopping poller");
                                return;
                            }
                        }
                    }
                    Err(TelegramError::FloodWait(seconds)) => {
                        tokio::time::sleep(Duration::from_secs(u64::from(seconds))).await;
                    }
                    Err(e) => {
                        warn!("getUpdates failed: {}", e);
                        tokio::time::sleep(ERROR_BACKOFF).await;
                    }
                }
                debug!("Poll cycle done, offset {:?}", offset);
            }
        });

        (rx, handle)
    }
}

/// Acknowledges `update_id`; the offset never moves backwards.
fn next_offset(current: Option<i64>, update_id: i64) -> i64 {
    current.map_or(update_id + 1, |off| off.max(update_id + 1))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_next_offset() {
        assert_eq!(next_offset(None, 10), 11);
        assert_eq!(next_offset(Some(11), 12), 13);
        assert_eq!(next_offset(Some(20), 12), 20);
    }
}
