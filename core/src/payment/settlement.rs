// paygate/src/payment/settlement.rs

use std::sync::Arc;
use tracing::instrument;

use crate::access::{AccessProvisioner, ProvisionOutcome};
use crate::audit::{AuditEvent, AuditSink};
use crate::domain::ids::OrderId;
use crate::domain::order::{OrderEvent, OrderState};
use crate::error::PaygateResult;
use crate::store::{OrderStore, TransitionReport};

#[derive(Debug, Clone)]
pub struct SettlementReport {
  pub transition: TransitionReport,
  /// Present when the order was PAID after the transition and provisioning ran.
  pub provisioning: Option<ProvisionOutcome>,
}

/// Applies a payment event to an order and follows a PAID result through to provisioning.
///
/// Shared by the webhook ingestor and the buyer-initiated status check so both paths
/// reach the same transitions and the same single invitation.
pub struct Settlement {
  orders: OrderStore,
  provisioner: Arc<AccessProvisioner>,
  audit: Arc<dyn AuditSink>,
}

impl Settlement {
  pub fn new(orders: OrderStore, provisioner: Arc<AccessProvisioner>, audit: Arc<dyn AuditSink>) -> Self {
    Self {
      orders,
      provisioner,
      audit,
    }
  }

  #[instrument(name = "settlement::apply", skip_all, fields(order_id = %order_id, event = ?event))]
  pub async fn apply(&self, order_id: OrderId, event: OrderEvent) -> PaygateResult<SettlementReport> {
    let transition = self.orders.transition(order_id, event).await?;
    let order = &transition.order;

    if transition.changed {
      match order.state {
        OrderState::Paid => self.audit.record(AuditEvent::OrderPaid {
          buyer: order.buyer,
          order_id: order.id,
          amount: order.amount,
        }),
        OrderState::Failed => self.audit.record(AuditEvent::PaymentFailed {
          buyer: order.buyer,
          order_id: order.id,
          amount: order.amount,
        }),
        OrderState::Expired => self.audit.record(AuditEvent::OrderExpired {
          buyer: order.buyer,
          order_id: order.id,
        }),
        _ => {}
      }
    }

    // Also covers a PAID order whose earlier provisioning attempt never committed, so a
    // redelivered event finishes the job. Storage errors propagate and invite that retry.
    let provisioning = if order.state == OrderState::Paid {
      Some(self.provisioner.provision(order_id).await?)
    } else {
      None
    };

    Ok(SettlementReport {
      transition,
      provisioning,
    })
  }
}
