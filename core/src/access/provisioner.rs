// paygate/src/access/provisioner.rs

use chrono::Utc;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

use crate::audit::{AuditEvent, AuditSink};
use crate::domain::ids::{ChatId, OrderId};
use crate::domain::invitation::Invitation;
use crate::domain::order::{InvitationAttach, Order, OrderState};
use crate::error::{PaygateError, PaygateResult};
use crate::store::OrderStore;
use crate::transport::ChatTransport;

/// What a call to [`AccessProvisioner::provision`] did.
#[derive(Debug, Clone)]
pub enum ProvisionOutcome {
  /// This call minted the order's invitation. `delivered` reports whether the buyer got it.
  Issued { order: Order, delivered: bool },
  /// The order already had an invitation; nothing new was minted.
  AlreadyIssued { order: Order },
  /// The order is not PAID.
  NotEligible { order: Order },
}

impl ProvisionOutcome {
  pub fn order(&self) -> &Order {
    match self {
      ProvisionOutcome::Issued { order, .. }
      | ProvisionOutcome::AlreadyIssued { order }
      | ProvisionOutcome::NotEligible { order } => order,
    }
  }
}

/// Turns a PAID order into exactly one single-use, 24h invitation to the restricted group.
///
/// Issuance is a compare-and-set on the order record: the invitation is attached and the
/// order moved to PROVISIONED in one step, so concurrent callers for the same order see
/// exactly one winner. The remote link is materialized after that commit; delivery
/// failures never roll the commit back and can be retried with [`AccessProvisioner::redeliver`].
pub struct AccessProvisioner {
  orders: OrderStore,
  transport: Arc<dyn ChatTransport>,
  audit: Arc<dyn AuditSink>,
  group: ChatId,
}

impl AccessProvisioner {
  pub fn new(orders: OrderStore, transport: Arc<dyn ChatTransport>, audit: Arc<dyn AuditSink>, group: ChatId) -> Self {
    Self {
      orders,
      transport,
      audit,
      group,
    }
  }

  #[instrument(name = "provisioner::provision", skip_all, fields(order_id = %order_id))]
  pub async fn provision(&self, order_id: OrderId) -> PaygateResult<ProvisionOutcome> {
    let order = self.orders.get(order_id).await?;
    if order.invitation.is_some() {
      debug!("Invitation already issued; nothing to do.");
      return Ok(ProvisionOutcome::AlreadyIssued { order });
    }
    if order.state != OrderState::Paid {
      debug!(state = %order.state, "Order not eligible for provisioning.");
      return Ok(ProvisionOutcome::NotEligible { order });
    }

    let invitation = Invitation::mint(order.id, Utc::now());
    let attached = self.orders.attach_invitation(order_id, invitation).await?;
    let order = match attached.outcome {
      InvitationAttach::Attached => attached.order,
      InvitationAttach::AlreadyIssued => {
        debug!("Another caller issued the invitation first.");
        return Ok(ProvisionOutcome::AlreadyIssued { order: attached.order });
      }
      InvitationAttach::NotPaid => {
        return Ok(ProvisionOutcome::NotEligible { order: attached.order });
      }
    };

    info!(buyer = %order.buyer, amount = %order.amount, "Invitation issued; order provisioned.");
    self.audit.record(AuditEvent::InvitationIssued {
      buyer: order.buyer,
      order_id: order.id,
      amount: order.amount,
    });

    match self.deliver(order.clone()).await {
      Ok(order) => Ok(ProvisionOutcome::Issued { order, delivered: true }),
      Err(e) => {
        warn!(error = %e, "Invitation issued but delivery failed; retry with redeliver.");
        self.audit.record(AuditEvent::InvitationDeliveryFailed {
          buyer: order.buyer,
          order_id: order.id,
          reason: e.to_string(),
        });
        Ok(ProvisionOutcome::Issued { order, delivered: false })
      }
    }
  }

  /// Sends the order's existing invitation again, materializing its link first if an
  /// earlier attempt never got that far. Never mints.
  #[instrument(name = "provisioner::redeliver", skip_all, fields(order_id = %order_id))]
  pub async fn redeliver(&self, order_id: OrderId) -> PaygateResult<Order> {
    let order = self.orders.get(order_id).await?;
    self.deliver(order).await
  }

  async fn deliver(&self, order: Order) -> PaygateResult<Order> {
    let invitation = order
      .invitation
      .clone()
      .ok_or_else(|| PaygateError::Validation(format!("order {} has no invitation", order.id)))?;
    if invitation.is_expired(Utc::now()) {
      return Err(PaygateError::Delivery("invitation has expired".to_string()));
    }

    let (order, link) = match invitation.link.clone() {
      Some(link) => (order, link),
      None => {
        let created = self.transport.create_invite_link(self.group, &invitation).await?;
        let order = self.orders.record_invite_link(order.id, created).await?;
        // A concurrent redelivery may have stored its link first; the stored one wins.
        let link = order
          .invitation
          .as_ref()
          .and_then(|inv| inv.link.clone())
          .ok_or_else(|| PaygateError::Delivery("invite link was not recorded".to_string()))?;
        (order, link)
      }
    };

    let text = format!(
      "✅ Payment verified successfully!\n\n\
       🎟️ Your one-time invite link:\n{}\n\n\
       ⚠️ This link expires in 24 hours and can only be used once.",
      link
    );
    self.transport.send_text(ChatId::from(order.buyer), &text).await?;
    info!(buyer = %order.buyer, "Invitation delivered.");
    Ok(order)
  }
}
