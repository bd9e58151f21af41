// paygate/src/payment/webhook.rs

use serde::Deserialize;
use std::sync::Arc;
use tracing::{info, instrument, warn};

use super::gateway::event_for_status;
use super::settlement::{Settlement, SettlementReport};
use super::signature::SignatureVerifier;
use crate::domain::ids::GatewayReference;
use crate::error::{PaygateError, PaygateResult};
use crate::store::OrderStore;

/// Body of an inbound payment notification. Unknown fields are ignored.
#[derive(Debug, Clone, Deserialize)]
pub struct WebhookPayload {
  pub status: String,
  #[serde(default)]
  pub order_reference: Option<String>,
  /// The gateway's name for the reference; `order_reference` wins when both are present.
  #[serde(default)]
  pub order_id: Option<String>,
}

impl WebhookPayload {
  pub fn reference(&self) -> Option<GatewayReference> {
    [self.order_reference.as_deref(), self.order_id.as_deref()]
      .into_iter()
      .flatten()
      .map(str::trim)
      .find(|r| !r.is_empty())
      .map(GatewayReference::new)
  }
}

/// What happened to an authenticated notification. Every variant is acknowledged to the
/// gateway; only authentication, parse and storage failures are errors.
#[derive(Debug, Clone)]
pub enum WebhookOutcome {
  Applied(SettlementReport),
  /// The status does not settle a payment.
  IgnoredStatus { status: String },
  /// No order carries this gateway reference.
  UnknownOrder { reference: GatewayReference },
}

pub struct WebhookIngestor {
  verifier: SignatureVerifier,
  orders: OrderStore,
  settlement: Arc<Settlement>,
}

impl WebhookIngestor {
  pub fn new(verifier: SignatureVerifier, orders: OrderStore, settlement: Arc<Settlement>) -> Self {
    Self {
      verifier,
      orders,
      settlement,
    }
  }

  /// Authenticates `raw_body` against `signature` before looking at its contents.
  #[instrument(name = "webhook::ingest", skip_all, fields(body_len = raw_body.len()))]
  pub async fn ingest(&self, raw_body: &[u8], signature: Option<&str>) -> PaygateResult<WebhookOutcome> {
    if let Err(e) = self.verifier.verify(raw_body, signature) {
      warn!(error = %e, "Rejected payment notification.");
      return Err(e);
    }

    let payload: WebhookPayload =
      serde_json::from_slice(raw_body).map_err(|e| PaygateError::MalformedPayload(e.to_string()))?;

    let Some(reference) = payload.reference() else {
      return Err(PaygateError::MalformedPayload("no order reference in payload".to_string()));
    };

    let Some(event) = event_for_status(&payload.status) else {
      info!(status = %payload.status, "Notification status does not settle a payment; ignored.");
      return Ok(WebhookOutcome::IgnoredStatus { status: payload.status });
    };

    let Some(order) = self.orders.find_by_gateway_reference(&reference).await? else {
      warn!(reference = %reference, "Notification for unknown order reference; ignored.");
      return Ok(WebhookOutcome::UnknownOrder { reference });
    };

    info!(order_id = %order.id, event = ?event, "Applying payment notification.");
    let report = self.settlement.apply(order.id, event).await?;
    Ok(WebhookOutcome::Applied(report))
  }
}
