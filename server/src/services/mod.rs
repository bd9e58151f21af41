// paygate/server/src/services/mod.rs

pub mod telegram;
pub mod zapupi;

pub use telegram::TelegramClient;
pub use zapupi::ZapupiGateway;
