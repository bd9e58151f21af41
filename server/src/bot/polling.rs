// paygate/server/src/bot/polling.rs

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use super::UpdateQueue;
use crate::services::TelegramClient;

const LONG_POLL_SECS: u64 = 30;
const MAX_BACKOFF: Duration = Duration::from_secs(60);

/// Long-polls `getUpdates` until `shutdown` flips to true, pushing updates onto `updates` in
/// arrival order. A failed poll backs off exponentially up to a minute.
pub async fn run_polling(telegram: Arc<TelegramClient>, updates: UpdateQueue, mut shutdown: watch::Receiver<bool>) {
  if let Err(e) = telegram.delete_webhook().await {
    warn!(error = %e, "Could not clear a previously registered webhook.");
  }
  info!("Telegram long polling started.");

  let mut offset: i64 = 0;
  let mut backoff = Duration::from_secs(1);
  loop {
    let polled = tokio::select! {
      _ = shutdown.changed() => break,
      polled = telegram.get_updates(offset, LONG_POLL_SECS) => polled,
    };

    match polled {
      Ok(batch) => {
        backoff = Duration::from_secs(1);
        if !batch.is_empty() {
          debug!(count = batch.len(), "Received updates.");
        }
        for update in batch {
          offset = offset.max(update.update_id + 1);
          if let Err(e) = updates.push(update).await {
            warn!(error = %e, "Update worker is gone; stopping long polling.");
            return;
          }
        }
      }
      Err(e) => {
        warn!(error = %e, backoff_secs = backoff.as_secs(), "getUpdates failed; backing off.");
        tokio::select! {
          _ = shutdown.changed() => break,
          _ = tokio::time::sleep(backoff) => {}
        }
        backoff = (backoff * 2).min(MAX_BACKOFF);
      }
    }
  }
  info!("Telegram long polling stopped.");
}
