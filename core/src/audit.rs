// paygate/src/audit.rs

//! Append-only audit trail.
//!
//! Recording is fire-and-forget: [`AuditSink::record`] never blocks and never fails from the
//! caller's point of view. Losing an audit record is acceptable; holding up a payment
//! transition because the audit channel is slow is not.

use chrono::Utc;
use std::sync::Arc;
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::domain::ids::{ChatId, MediaRef, OrderId, ProductId, UserId};
use crate::domain::money::Amount;
use crate::transport::ChatTransport;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PaymentProof {
  Screenshot(MediaRef),
  Text(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuditEvent {
  ProductAdded {
    product_id: ProductId,
    name: String,
    price: Amount,
  },
  ProductReplaced {
    product_id: ProductId,
    name: String,
    price: Amount,
  },
  OrderCreated {
    buyer: UserId,
    order_id: OrderId,
    product_id: ProductId,
    amount: Amount,
  },
  OrderPaid {
    buyer: UserId,
    order_id: OrderId,
    amount: Amount,
  },
  PaymentFailed {
    buyer: UserId,
    order_id: OrderId,
    amount: Amount,
  },
  /// Carries only the fact that an invitation exists, never its token or link.
  InvitationIssued {
    buyer: UserId,
    order_id: OrderId,
    amount: Amount,
  },
  InvitationDeliveryFailed {
    buyer: UserId,
    order_id: OrderId,
    reason: String,
  },
  OrderExpired {
    buyer: UserId,
    order_id: OrderId,
  },
  PaymentProofSubmitted {
    buyer: UserId,
    username: Option<String>,
    order_id: Option<OrderId>,
    proof: PaymentProof,
  },
  BotAddedToGroup {
    chat: ChatId,
    title: String,
  },
  /// An administrator announcement. Only a short preview of the text is kept.
  BroadcastSent {
    preview: String,
    recipients: usize,
    delivered: usize,
  },
}

impl AuditEvent {
  pub fn kind(&self) -> &'static str {
    match self {
      AuditEvent::ProductAdded { .. } => "product_added",
      AuditEvent::ProductReplaced { .. } => "product_replaced",
      AuditEvent::OrderCreated { .. } => "order_created",
      AuditEvent::OrderPaid { .. } => "order_paid",
      AuditEvent::PaymentFailed { .. } => "payment_failed",
      AuditEvent::InvitationIssued { .. } => "invitation_issued",
      AuditEvent::InvitationDeliveryFailed { .. } => "invitation_delivery_failed",
      AuditEvent::OrderExpired { .. } => "order_expired",
      AuditEvent::PaymentProofSubmitted { .. } => "payment_proof_submitted",
      AuditEvent::BotAddedToGroup { .. } => "bot_added_to_group",
      AuditEvent::BroadcastSent { .. } => "broadcast_sent",
    }
  }

  /// Media to attach to the audit message, if any.
  pub fn photo(&self) -> Option<&MediaRef> {
    match self {
      AuditEvent::PaymentProofSubmitted {
        proof: PaymentProof::Screenshot(media),
        ..
      } => Some(media),
      _ => None,
    }
  }

  /// Human readable message body for the audit channel.
  pub fn render(&self) -> String {
    match self {
      AuditEvent::ProductAdded { product_id, name, price } => {
        format!("New product added:\nID: {}\nName: {}\nPrice: {}", product_id, name, price)
      }
      AuditEvent::ProductReplaced { product_id, name, price } => {
        format!("Product replaced:\nID: {}\nName: {}\nPrice: {}", product_id, name, price)
      }
      AuditEvent::OrderCreated {
        buyer,
        order_id,
        product_id,
        amount,
      } => format!(
        "🧾 Order created\nUser: {}\nOrder: {}\nProduct: {}\nAmount: {}",
        buyer, order_id, product_id, amount
      ),
      AuditEvent::OrderPaid { buyer, order_id, amount } => {
        format!("✅ PAYMENT CONFIRMED\nUser: {}\nOrder: {}\nAmount: {}", buyer, order_id, amount)
      }
      AuditEvent::PaymentFailed { buyer, order_id, amount } => {
        format!("❌ Payment FAILED\nUser: {}\nOrder: {}\nAmount: {}", buyer, order_id, amount)
      }
      AuditEvent::InvitationIssued { buyer, order_id, amount } => format!(
        "🎟️ Invitation issued\nUser: {}\nOrder: {}\nAmount: {}\nInvite: issued (single use, 24h)",
        buyer, order_id, amount
      ),
      AuditEvent::InvitationDeliveryFailed { buyer, order_id, reason } => format!(
        "⚠️ Invitation delivery failed\nUser: {}\nOrder: {}\nError: {}",
        buyer, order_id, reason
      ),
      AuditEvent::OrderExpired { buyer, order_id } => {
        format!("⌛ Order expired\nUser: {}\nOrder: {}", buyer, order_id)
      }
      AuditEvent::PaymentProofSubmitted {
        buyer,
        username,
        order_id,
        proof,
      } => {
        let who = username.as_deref().unwrap_or("No username");
        let order = order_id.map_or_else(|| "none open".to_string(), |id| id.to_string());
        let detail = match proof {
          PaymentProof::Screenshot(_) => "Type: Photo".to_string(),
          PaymentProof::Text(text) => format!("Transaction ID: {}", text),
        };
        format!(
          "💰 Payment verification request\nUser: {} (@{})\nOrder: {}\n{}",
          buyer, who, order, detail
        )
      }
      AuditEvent::BotAddedToGroup { chat, title } => format!("New group: {} (ID: {})", title, chat),
      AuditEvent::BroadcastSent {
        preview,
        recipients,
        delivered,
      } => format!(
        "📣 Broadcast sent\nReached: {} of {} buyers\nMessage: {}",
        delivered, recipients, preview
      ),
    }
  }
}

pub trait AuditSink: Send + Sync {
  fn record(&self, event: AuditEvent);
}

/// Writes audit records to the log only.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingAuditSink;

impl AuditSink for TracingAuditSink {
  fn record(&self, event: AuditEvent) {
    info!(audit = event.kind(), "{}", event.render());
  }
}

/// Forwards audit records to a chat channel through a bounded queue and a background task.
#[derive(Debug, Clone)]
pub struct ChannelAuditSink {
  tx: mpsc::Sender<AuditEvent>,
}

impl ChannelAuditSink {
  /// Starts the forwarding task. Must be called from within a Tokio runtime.
  pub fn spawn(transport: Arc<dyn ChatTransport>, channel: ChatId, capacity: usize) -> (Self, JoinHandle<()>) {
    let (tx, mut rx) = mpsc::channel::<AuditEvent>(capacity.max(1));
    let handle = tokio::spawn(async move {
      while let Some(event) = rx.recv().await {
        let text = format!("[{}]\n{}", Utc::now().format("%Y-%m-%d %H:%M:%S"), event.render());
        let sent = match event.photo() {
          Some(photo) => transport.send_photo(channel, photo, &text).await,
          None => transport.send_text(channel, &text).await,
        };
        match sent {
          Ok(()) => debug!(audit = event.kind(), "Audit record forwarded."),
          Err(e) => warn!(audit = event.kind(), error = %e, "Failed to forward audit record."),
        }
      }
      debug!("Audit channel closed; forwarder exiting.");
    });
    (ChannelAuditSink { tx }, handle)
  }
}

impl AuditSink for ChannelAuditSink {
  fn record(&self, event: AuditEvent) {
    match self.tx.try_send(event) {
      Ok(()) => {}
      Err(TrySendError::Full(event)) => {
        warn!(audit = event.kind(), "Audit queue full; dropping record.");
      }
      Err(TrySendError::Closed(event)) => {
        warn!(audit = event.kind(), "Audit forwarder gone; dropping record.");
      }
    }
  }
}
