// paygate/src/buyer.rs

//! Buyer-facing operations: browse, purchase, check a payment, submit a proof.

use std::sync::Arc;
use tracing::{info, instrument, warn};

use crate::access::{AccessProvisioner, ProvisionOutcome};
use crate::audit::{AuditEvent, AuditSink, PaymentProof};
use crate::domain::ids::{OrderId, ProductId, UserId};
use crate::domain::order::{Order, OrderEvent, OrderState};
use crate::domain::product::Product;
use crate::error::{PaygateError, PaygateResult};
use crate::payment::{PaymentGateway, Settlement};
use crate::store::{CatalogStore, OrderStore};

/// A PENDING order and the URL the buyer pays at.
#[derive(Debug, Clone)]
pub struct Checkout {
  pub order: Order,
  pub payment_url: String,
}

#[derive(Debug, Clone)]
pub enum VerifyOutcome {
  /// The order is provisioned and its invitation was sent to the buyer.
  InviteSent(Order),
  AwaitingPayment(Order),
  Failed(Order),
  Expired(Order),
}

pub struct BuyerFlow {
  catalog: CatalogStore,
  orders: OrderStore,
  gateway: Arc<dyn PaymentGateway>,
  settlement: Arc<Settlement>,
  provisioner: Arc<AccessProvisioner>,
  audit: Arc<dyn AuditSink>,
}

impl BuyerFlow {
  pub fn new(
    catalog: CatalogStore,
    orders: OrderStore,
    gateway: Arc<dyn PaymentGateway>,
    settlement: Arc<Settlement>,
    provisioner: Arc<AccessProvisioner>,
    audit: Arc<dyn AuditSink>,
  ) -> Self {
    Self {
      catalog,
      orders,
      gateway,
      settlement,
      provisioner,
      audit,
    }
  }

  pub async fn catalog(&self) -> PaygateResult<Vec<Product>> {
    self.catalog.list().await
  }

  pub async fn product(&self, product_id: &ProductId) -> PaygateResult<Product> {
    self.catalog.get(product_id).await
  }

  /// Opens an order and asks the gateway for a pay URL. PENDING is recorded before the URL
  /// is handed back, so a fast webhook always finds the order ready to accept payment.
  ///
  /// A gateway failure leaves the order CREATED; the expiry sweep cleans it up.
  #[instrument(name = "buyer::purchase", skip_all, fields(buyer = %buyer, product_id = %product_id))]
  pub async fn purchase(&self, buyer: UserId, product_id: &ProductId) -> PaygateResult<Checkout> {
    let order = self.orders.create_order(buyer, product_id).await?;
    self.audit.record(AuditEvent::OrderCreated {
      buyer,
      order_id: order.id,
      product_id: order.product_id.clone(),
      amount: order.amount,
    });

    let checkout = match self.gateway.create_order(order.amount, &order.gateway_reference).await {
      Ok(checkout) => checkout,
      Err(e) => {
        warn!(order_id = %order.id, error = %e, "Gateway refused to create the payment order.");
        return Err(e);
      }
    };

    let report = self.orders.transition(order.id, OrderEvent::GatewayPending).await?;
    info!(order_id = %order.id, "Checkout ready.");
    Ok(Checkout {
      order: report.order,
      payment_url: checkout.payment_url,
    })
  }

  /// The buyer's "I paid" button. Asks the gateway once if the order is still PENDING, and
  /// (re)sends the invitation if the order is paid. Orders of other buyers look missing.
  #[instrument(name = "buyer::verify", skip_all, fields(buyer = %buyer, order_id = %order_id))]
  pub async fn verify(&self, buyer: UserId, order_id: OrderId) -> PaygateResult<VerifyOutcome> {
    let mut order = self.orders.get(order_id).await?;
    if order.buyer != buyer {
      warn!("Verify requested for another buyer's order.");
      return Err(PaygateError::OrderNotFound(order_id.to_string()));
    }

    if order.state == OrderState::Pending {
      match self.gateway.query_status(&order.gateway_reference).await {
        Ok(Some(event)) => {
          let report = self.settlement.apply(order_id, event).await?;
          if let Some(ProvisionOutcome::Issued { order, delivered: true }) = report.provisioning {
            return Ok(VerifyOutcome::InviteSent(order));
          }
          order = self.orders.get(order_id).await?;
        }
        Ok(None) => {}
        // The webhook can still settle the order; report what we know.
        Err(e) => warn!(error = %e, "Gateway status lookup failed."),
      }
    }

    match order.state {
      OrderState::Paid | OrderState::Provisioned => match self.provisioner.provision(order_id).await? {
        ProvisionOutcome::Issued { order, delivered: true } => Ok(VerifyOutcome::InviteSent(order)),
        ProvisionOutcome::NotEligible { order } => Ok(VerifyOutcome::AwaitingPayment(order)),
        _ => Ok(VerifyOutcome::InviteSent(self.provisioner.redeliver(order_id).await?)),
      },
      OrderState::Created | OrderState::Pending => Ok(VerifyOutcome::AwaitingPayment(order)),
      OrderState::Failed => Ok(VerifyOutcome::Failed(order)),
      OrderState::Expired => Ok(VerifyOutcome::Expired(order)),
    }
  }

  /// Newest first.
  pub async fn orders(&self, buyer: UserId) -> PaygateResult<Vec<Order>> {
    let mut orders = self.orders.orders_for_buyer(buyer).await?;
    orders.reverse();
    Ok(orders)
  }

  /// Forwards a manual payment proof to the audit channel, tagged with the buyer's latest
  /// open order if there is one. Never changes order state.
  #[instrument(name = "buyer::submit_proof", skip_all, fields(buyer = %buyer))]
  pub async fn submit_proof(
    &self,
    buyer: UserId,
    username: Option<String>,
    proof: PaymentProof,
  ) -> PaygateResult<Option<Order>> {
    let open = self.orders.latest_open_order(buyer).await?;
    self.audit.record(AuditEvent::PaymentProofSubmitted {
      buyer,
      username,
      order_id: open.as_ref().map(|o| o.id),
      proof,
    });
    info!(has_open_order = open.is_some(), "Payment proof forwarded for review.");
    Ok(open)
  }
}
