// paygate/src/payment/gateway.rs

//! Outbound payment gateway seam and the wire shapes it speaks.

use async_trait::async_trait;
use serde::Deserialize;

use crate::domain::ids::GatewayReference;
use crate::domain::money::Amount;
use crate::domain::order::OrderEvent;
use crate::error::{PaygateError, PaygateResult};

/// A remote order the buyer can now pay.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GatewayCheckout {
  pub payment_url: String,
}

#[async_trait]
pub trait PaymentGateway: Send + Sync {
  /// Creates the remote order. A non-success answer is a [`PaygateError::Gateway`].
  async fn create_order(&self, amount: Amount, reference: &GatewayReference) -> PaygateResult<GatewayCheckout>;

  /// One-shot status lookup. `Ok(None)` when the gateway has nothing conclusive to report
  /// or does not support lookups.
  async fn query_status(&self, _reference: &GatewayReference) -> PaygateResult<Option<OrderEvent>> {
    Ok(None)
  }
}

/// Response body of the create-order call: `{status, payment_url}`.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateOrderResponse {
  pub status: String,
  #[serde(default)]
  pub payment_url: Option<String>,
  #[serde(default)]
  pub message: Option<String>,
}

impl CreateOrderResponse {
  pub fn into_checkout(self) -> PaygateResult<GatewayCheckout> {
    if !self.status.eq_ignore_ascii_case("success") {
      return Err(PaygateError::Gateway(format!(
        "gateway answered '{}'{}",
        self.status,
        self.message.map(|m| format!(": {}", m)).unwrap_or_default()
      )));
    }
    match self.payment_url {
      Some(url) if !url.trim().is_empty() => Ok(GatewayCheckout { payment_url: url }),
      _ => Err(PaygateError::Gateway("gateway returned no payment_url".to_string())),
    }
  }
}

/// Maps the gateway's status vocabulary onto order events. Statuses that do not settle
/// the payment map to `None`.
pub fn event_for_status(status: &str) -> Option<OrderEvent> {
  match status.trim().to_ascii_lowercase().as_str() {
    "completed" | "complete" | "success" | "successful" | "paid" | "captured" => Some(OrderEvent::GatewayPaid),
    "failed" | "failure" | "cancelled" | "canceled" | "declined" | "rejected" | "expired" => {
      Some(OrderEvent::GatewayFailed)
    }
    _ => None,
  }
}
