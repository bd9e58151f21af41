// paygate/src/domain/invitation.rs

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use super::ids::OrderId;

/// Lifetime of every invitation, counted from issuance.
pub const INVITATION_TTL_HOURS: i64 = 24;

/// Every invitation admits exactly one member.
pub const INVITATION_MAX_USES: u32 = 1;

/// A single-use, expiring credential for the restricted group.
///
/// The `token` names the remote invite link so the two can be matched up later;
/// `link` is filled in once the transport has materialized it.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Invitation {
  pub order_id: OrderId,
  pub token: String,
  pub max_uses: u32,
  pub created_at: DateTime<Utc>,
  pub expires_at: DateTime<Utc>,
  pub link: Option<String>,
}

impl Invitation {
  pub fn mint(order_id: OrderId, now: DateTime<Utc>) -> Self {
    Invitation {
      order_id,
      token: Uuid::new_v4().simple().to_string(),
      max_uses: INVITATION_MAX_USES,
      created_at: now,
      expires_at: now + Duration::hours(INVITATION_TTL_HOURS),
      link: None,
    }
  }

  pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
    now >= self.expires_at
  }
}

// The token is a credential; keep it out of logs.
impl fmt::Debug for Invitation {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("Invitation")
      .field("order_id", &self.order_id)
      .field("token", &"[REDACTED]")
      .field("max_uses", &self.max_uses)
      .field("created_at", &self.created_at)
      .field("expires_at", &self.expires_at)
      .field("link_materialized", &self.link.is_some())
      .finish()
  }
}
