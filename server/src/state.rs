// paygate/server/src/state.rs
use crate::bot::UpdateQueue;
use paygate::Paygate;

#[derive(Clone)]
pub struct AppState {
  pub engine: Paygate,
  /// Feeds the single ordered update worker.
  pub updates: UpdateQueue,
  /// Expected `X-Telegram-Bot-Api-Secret-Token`; `None` when updates arrive by long polling.
  pub telegram_secret: Option<String>,
}
