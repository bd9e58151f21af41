// paygate/src/domain/ids.rs

//! Identifier newtypes. Chat-side identifiers are the transport's signed 64-bit ids.

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// A chat user (buyer or administrator).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(pub i64);

/// Any chat destination: a private chat, the paid group, the audit channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChatId(pub i64);

impl From<UserId> for ChatId {
  // A private chat with a user shares the user's id.
  fn from(user: UserId) -> Self {
    ChatId(user.0)
  }
}

impl fmt::Display for UserId {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}", self.0)
  }
}

impl fmt::Display for ChatId {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}", self.0)
  }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProductId(String);

impl ProductId {
  pub fn new(id: impl Into<String>) -> Self {
    ProductId(id.into())
  }

  /// Counter-derived id, `prod_<n>`.
  pub fn from_sequence(n: u64) -> Self {
    ProductId(format!("prod_{}", n))
  }

  pub fn as_str(&self) -> &str {
    &self.0
  }
}

impl fmt::Display for ProductId {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(&self.0)
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OrderId(pub Uuid);

impl OrderId {
  pub fn generate() -> Self {
    OrderId(Uuid::new_v4())
  }

  pub fn parse(raw: &str) -> Option<Self> {
    Uuid::parse_str(raw).ok().map(OrderId)
  }
}

impl fmt::Display for OrderId {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}", self.0)
  }
}

/// Reference sent to the gateway as its `order_id` and echoed back in webhooks.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GatewayReference(String);

impl GatewayReference {
  pub fn generate() -> Self {
    GatewayReference(format!("pg_{}", Uuid::new_v4().simple()))
  }

  pub fn new(raw: impl Into<String>) -> Self {
    GatewayReference(raw.into())
  }

  pub fn as_str(&self) -> &str {
    &self.0
  }
}

impl fmt::Display for GatewayReference {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(&self.0)
  }
}

/// Opaque handle to media held by the chat transport (a Telegram `file_id`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MediaRef(String);

impl MediaRef {
  pub fn new(raw: impl Into<String>) -> Self {
    MediaRef(raw.into())
  }

  pub fn as_str(&self) -> &str {
    &self.0
  }
}
