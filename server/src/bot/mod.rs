// paygate/server/src/bot/mod.rs

pub mod commands;
pub mod dispatcher;
pub mod polling;
pub mod queue;
pub mod replies;

#[cfg(test)]
pub(crate) mod test_support;

pub use dispatcher::Dispatcher;
pub use polling::run_polling;
pub use queue::{spawn_update_worker, UpdateQueue};
