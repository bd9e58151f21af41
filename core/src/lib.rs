// paygate/src/lib.rs

//! Paygate: sell access to a restricted group for a UPI payment.
//!
//! The engine covers:
//!  - An order lifecycle state machine (CREATED → PENDING → PAID → PROVISIONED, or FAILED/EXPIRED).
//!  - HMAC-authenticated ingestion of payment gateway notifications.
//!  - Exactly-once issuance of a single-use, 24 hour invitation per paid order.
//!  - A step-by-step catalog entry conversation for the administrator.
//!  - A per-user rate limiter and a fire-and-forget audit sink.
//!
//! Persistence, the payment gateway and the chat transport are traits; the host supplies them.

pub mod access;
pub mod audit;
pub mod buyer;
pub mod domain;
pub mod engine;
pub mod error;
pub mod flow;
pub mod payment;
pub mod rate_limit;
pub mod settings;
pub mod store;
pub mod transport;

// --- Re-exports for the Public API ---

pub use crate::domain::ids::{ChatId, GatewayReference, MediaRef, OrderId, ProductId, UserId};
pub use crate::domain::invitation::{Invitation, INVITATION_MAX_USES, INVITATION_TTL_HOURS};
pub use crate::domain::money::{Amount, AmountParseError};
pub use crate::domain::order::{InvitationAttach, Order, OrderEvent, OrderState};
pub use crate::domain::product::{Product, ProductDraft};

pub use crate::access::{AccessProvisioner, ProvisionOutcome};
pub use crate::audit::{AuditEvent, AuditSink, ChannelAuditSink, PaymentProof, TracingAuditSink};
pub use crate::buyer::{BuyerFlow, Checkout, VerifyOutcome};
pub use crate::engine::{Paygate, PaygateDeps, SweepReport};
pub use crate::error::{PaygateError, PaygateResult};
pub use crate::flow::{CatalogEntryFlow, EntryInput, EntryReply, EntryStep};
pub use crate::payment::{
  CreateOrderResponse, GatewayCheckout, PaymentGateway, Settlement, SettlementReport, SignatureVerifier,
  WebhookIngestor, WebhookOutcome,
};
pub use crate::rate_limit::RateLimiter;
pub use crate::settings::EngineSettings;
pub use crate::store::{CatalogRepository, CatalogStore, InMemoryCatalogRepository, InMemoryOrderRepository, OrderRepository, OrderStore};
pub use crate::transport::ChatTransport;
