// paygate/src/payment/mod.rs

pub mod gateway;
pub mod settlement;
pub mod signature;
pub mod webhook;

pub use gateway::{event_for_status, CreateOrderResponse, GatewayCheckout, PaymentGateway};
pub use settlement::{Settlement, SettlementReport};
pub use signature::SignatureVerifier;
pub use webhook::{WebhookIngestor, WebhookOutcome, WebhookPayload};
