// paygate/server/src/web/handlers/mod.rs

pub mod telegram_handlers;
pub mod webhook_handlers;
