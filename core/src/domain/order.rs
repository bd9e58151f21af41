// paygate/src/domain/order.rs

//! The order record and its lifecycle table.
//!
//! ```text
//! CREATED ──GatewayPending──▶ PENDING ──GatewayPaid──▶ PAID ──(invitation attached)──▶ PROVISIONED
//!    │                           │ └────GatewayFailed──▶ FAILED
//!    └────────Timeout────────────┴──────Timeout────────▶ EXPIRED
//! ```
//!
//! Anything not in the table is ignored: the state stays put and the caller is told nothing changed.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::ids::{GatewayReference, OrderId, ProductId, UserId};
use super::invitation::Invitation;
use super::money::Amount;
use super::product::Product;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderState {
  Created,
  Pending,
  Paid,
  Failed,
  Provisioned,
  Expired,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OrderEvent {
  GatewayPending,
  GatewayPaid,
  GatewayFailed,
  Timeout,
}

impl OrderState {
  pub const ALL: [OrderState; 6] = [
    OrderState::Created,
    OrderState::Pending,
    OrderState::Paid,
    OrderState::Failed,
    OrderState::Provisioned,
    OrderState::Expired,
  ];

  /// The transition table. `None` means the event is not accepted in this state.
  pub fn next(self, event: OrderEvent) -> Option<OrderState> {
    use OrderEvent::*;
    use OrderState::*;
    match (self, event) {
      (Created, GatewayPending) => Some(Pending),
      (Pending, GatewayPaid) => Some(Paid),
      (Pending, GatewayFailed) => Some(Failed),
      (Created | Pending, Timeout) => Some(Expired),
      _ => None,
    }
  }

  pub fn is_terminal(self) -> bool {
    matches!(self, OrderState::Failed | OrderState::Provisioned | OrderState::Expired)
  }

  /// States the expiry sweep may time out.
  pub fn is_awaiting_payment(self) -> bool {
    matches!(self, OrderState::Created | OrderState::Pending)
  }

  pub fn as_str(self) -> &'static str {
    match self {
      OrderState::Created => "created",
      OrderState::Pending => "pending",
      OrderState::Paid => "paid",
      OrderState::Failed => "failed",
      OrderState::Provisioned => "provisioned",
      OrderState::Expired => "expired",
    }
  }
}

impl fmt::Display for OrderState {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

impl FromStr for OrderState {
  type Err = String;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    OrderState::ALL
      .into_iter()
      .find(|state| state.as_str() == s)
      .ok_or_else(|| format!("unknown order state '{}'", s))
  }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
  pub id: OrderId,
  pub buyer: UserId,
  pub product_id: ProductId,
  pub amount: Amount,
  pub state: OrderState,
  pub created_at: DateTime<Utc>,
  pub updated_at: DateTime<Utc>,
  pub gateway_reference: GatewayReference,
  pub invitation: Option<Invitation>,
}

/// Result of offering an invitation to an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InvitationAttach {
  Attached,
  AlreadyIssued,
  NotPaid,
}

impl Order {
  /// Binds the buyer to this product at its current price.
  pub fn open(buyer: UserId, product: &Product, now: DateTime<Utc>) -> Self {
    Order {
      id: OrderId::generate(),
      buyer,
      product_id: product.id.clone(),
      amount: product.price,
      state: OrderState::Created,
      created_at: now,
      updated_at: now,
      gateway_reference: GatewayReference::generate(),
      invitation: None,
    }
  }

  /// Applies `event` if the table allows it. Returns whether the state changed.
  pub fn apply(&mut self, event: OrderEvent, now: DateTime<Utc>) -> bool {
    match self.state.next(event) {
      Some(next) => {
        self.state = next;
        self.updated_at = now;
        true
      }
      None => false,
    }
  }

  /// Compare-and-set: attach only while PAID with no invitation, and move to PROVISIONED
  /// in the same step.
  pub fn try_attach_invitation(&mut self, invitation: Invitation, now: DateTime<Utc>) -> InvitationAttach {
    if self.invitation.is_some() {
      return InvitationAttach::AlreadyIssued;
    }
    if self.state != OrderState::Paid {
      return InvitationAttach::NotPaid;
    }
    self.invitation = Some(invitation);
    self.state = OrderState::Provisioned;
    self.updated_at = now;
    InvitationAttach::Attached
  }

  /// Stores the materialized link unless one is already on record, and returns the one that is.
  /// `None` when the order has no invitation.
  pub fn record_invite_link(&mut self, link: String, now: DateTime<Utc>) -> Option<String> {
    let invitation = self.invitation.as_mut()?;
    match &invitation.link {
      Some(existing) => Some(existing.clone()),
      None => {
        invitation.link = Some(link.clone());
        self.updated_at = now;
        Some(link)
      }
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::domain::ids::MediaRef;
  use crate::domain::product::ProductDraft;

  fn order() -> Order {
    let product = ProductDraft {
      name: "Club".to_string(),
      image: MediaRef::new("img"),
      price: Amount::from_paise(19_900).unwrap_or_default(),
      description: "access".to_string(),
    }
    .publish(ProductId::new("prod_1"), Utc::now());
    Order::open(UserId(1), &product, Utc::now())
  }

  #[test]
  fn terminal_states_accept_nothing() {
    let events = [
      OrderEvent::GatewayPending,
      OrderEvent::GatewayPaid,
      OrderEvent::GatewayFailed,
      OrderEvent::Timeout,
    ];
    for state in [OrderState::Failed, OrderState::Provisioned, OrderState::Expired] {
      assert!(state.is_terminal());
      for event in events {
        assert_eq!(state.next(event), None, "{} accepted {:?}", state, event);
      }
    }
  }

  #[test]
  fn paid_waits_for_provisioning_only() {
    assert_eq!(OrderState::Paid.next(OrderEvent::Timeout), None);
    assert_eq!(OrderState::Paid.next(OrderEvent::GatewayFailed), None);
    assert_eq!(OrderState::Created.next(OrderEvent::GatewayPaid), None);
  }

  #[test]
  fn invitation_attaches_once_and_only_when_paid() {
    let mut order = order();
    let now = Utc::now();
    assert_eq!(
      order.try_attach_invitation(Invitation::mint(order.id, now), now),
      InvitationAttach::NotPaid
    );

    assert!(order.apply(OrderEvent::GatewayPending, now));
    assert!(order.apply(OrderEvent::GatewayPaid, now));
    assert_eq!(
      order.try_attach_invitation(Invitation::mint(order.id, now), now),
      InvitationAttach::Attached
    );
    assert_eq!(order.state, OrderState::Provisioned);
    assert_eq!(
      order.try_attach_invitation(Invitation::mint(order.id, now), now),
      InvitationAttach::AlreadyIssued
    );
  }

  #[test]
  fn first_recorded_link_wins() {
    let mut order = order();
    let now = Utc::now();
    assert_eq!(order.record_invite_link("https://t.me/+a".to_string(), now), None);
    order.apply(OrderEvent::GatewayPending, now);
    order.apply(OrderEvent::GatewayPaid, now);
    order.try_attach_invitation(Invitation::mint(order.id, now), now);
    assert_eq!(
      order.record_invite_link("https://t.me/+a".to_string(), now).as_deref(),
      Some("https://t.me/+a")
    );
    assert_eq!(
      order.record_invite_link("https://t.me/+b".to_string(), now).as_deref(),
      Some("https://t.me/+a")
    );
  }

  #[test]
  fn state_names_round_trip_through_storage_text() {
    for state in OrderState::ALL {
      assert_eq!(state.as_str().parse::<OrderState>(), Ok(state));
    }
    assert!("refunded".parse::<OrderState>().is_err());
  }
}
