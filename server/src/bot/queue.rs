// paygate/server/src/bot/queue.rs

//! Single consumer for chat updates. Updates are dispatched one at a time in the order they
//! were pushed, whichever source (webhook or long polling) they came from.

use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::debug;

use super::Dispatcher;
use crate::errors::{AppError, Result as AppResult};
use crate::services::telegram::Update;

#[derive(Clone)]
pub struct UpdateQueue {
  tx: mpsc::Sender<Update>,
}

impl UpdateQueue {
  /// Waits for room when the queue is full.
  pub async fn push(&self, update: Update) -> AppResult<()> {
    self
      .tx
      .send(update)
      .await
      .map_err(|_| AppError::Internal("update worker has stopped".to_string()))
  }
}

/// Starts the worker. It exits once every [`UpdateQueue`] handle is dropped and the backlog
/// is drained.
pub fn spawn_update_worker(dispatcher: Arc<Dispatcher>, capacity: usize) -> (UpdateQueue, JoinHandle<()>) {
  let (tx, mut rx) = mpsc::channel::<Update>(capacity.max(1));
  let worker = tokio::spawn(async move {
    while let Some(update) = rx.recv().await {
      dispatcher.dispatch(update).await;
    }
    debug!("Update queue closed.");
  });
  (UpdateQueue { tx }, worker)
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::bot::test_support::*;
  use paygate::EntryStep;

  #[tokio::test]
  async fn updates_are_handled_in_push_order() {
    let h = bot_harness();
    let (queue, worker) = spawn_update_worker(h.dispatcher.clone(), 2);

    for update in [
      text_update(OWNER, "/add_product"),
      text_update(OWNER, "Members Club"),
      photo_update(OWNER, "cover"),
      text_update(OWNER, "99"),
      text_update(OWNER, "Monthly access"),
    ] {
      queue.push(update).await.unwrap();
    }
    drop(queue);
    worker.await.unwrap();

    assert_eq!(h.engine.catalog_entry.current_step(OWNER), None::<EntryStep>);
    let products = h.engine.catalog.list().await.unwrap();
    assert_eq!(products.len(), 1);
    assert_eq!(products[0].name, "Members Club");
    assert_eq!(products[0].description, "Monthly access");
  }

  #[tokio::test]
  async fn push_fails_once_the_worker_is_gone() {
    let h = bot_harness();
    let (queue, worker) = spawn_update_worker(h.dispatcher.clone(), 1);
    worker.abort();
    let _ = worker.await;
    assert!(queue.push(text_update(BUYER, "/start")).await.is_err());
  }
}
