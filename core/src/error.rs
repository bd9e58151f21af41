// paygate/src/error.rs
use anyhow::Error as AnyhowError;
use thiserror::Error;

use crate::domain::ids::ProductId;

#[derive(Debug, Error)]
pub enum PaygateError {
  /// Signature mismatch on an inbound payment event, or a non-admin attempting an admin action.
  #[error("Unauthorized: {0}")]
  Unauthorized(String),

  #[error("Product not found: {0}")]
  ProductNotFound(ProductId),

  #[error("Order not found: {0}")]
  OrderNotFound(String),

  #[error("Validation failed: {0}")]
  Validation(String),

  /// Gateway unreachable or answered with a non-success status.
  #[error("Payment gateway error: {0}")]
  Gateway(String),

  /// Outbound message or invite-link delivery failed.
  #[error("Delivery failed: {0}")]
  Delivery(String),

  /// The payload was authenticated but could not be understood.
  #[error("Malformed payload: {0}")]
  MalformedPayload(String),

  #[error("Storage error. Source: {source}")]
  Storage {
    #[source]
    source: AnyhowError,
  },
}

impl PaygateError {
  /// Wraps any repository-level failure.
  pub fn storage(err: impl Into<AnyhowError>) -> Self {
    PaygateError::Storage { source: err.into() }
  }

  /// True for errors a buyer can fix by simply trying again.
  pub fn is_retryable(&self) -> bool {
    matches!(self, PaygateError::Gateway(_) | PaygateError::Delivery(_))
  }
}

impl From<AnyhowError> for PaygateError {
  fn from(err: AnyhowError) -> Self {
    // Avoid Storage(Storage(..)) when a PaygateError travelled through anyhow.
    match err.downcast::<PaygateError>() {
      Ok(inner) => inner,
      Err(err) => PaygateError::Storage { source: err },
    }
  }
}

pub type PaygateResult<T, E = PaygateError> = std::result::Result<T, E>;
