// paygate/src/store/order_store.rs

use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, instrument, warn};

use super::catalog_store::CatalogStore;
use super::repository::{AttachResult, OrderRepository};
use crate::domain::ids::{GatewayReference, OrderId, ProductId, UserId};
use crate::domain::invitation::Invitation;
use crate::domain::order::{Order, OrderEvent, OrderState};
use crate::error::{PaygateError, PaygateResult};

/// Outcome of [`OrderStore::transition`].
#[derive(Debug, Clone)]
pub struct TransitionReport {
  pub order: Order,
  pub event: OrderEvent,
  pub previous: OrderState,
  /// `false` when the event was outside the allowed set and nothing happened.
  pub changed: bool,
}

/// The single source of truth for payment state.
#[derive(Clone)]
pub struct OrderStore {
  orders: Arc<dyn OrderRepository>,
  catalog: CatalogStore,
  order_ttl: Duration,
}

impl OrderStore {
  pub fn new(orders: Arc<dyn OrderRepository>, catalog: CatalogStore, order_ttl: Duration) -> Self {
    Self {
      orders,
      catalog,
      order_ttl,
    }
  }

  /// Opens an order in CREATED with the product's current price frozen onto it.
  #[instrument(name = "order_store::create_order", skip_all, fields(buyer = %buyer, product_id = %product_id))]
  pub async fn create_order(&self, buyer: UserId, product_id: &ProductId) -> PaygateResult<Order> {
    let product = self.catalog.get(product_id).await?;
    let order = Order::open(buyer, &product, Utc::now());
    self.orders.insert(order.clone()).await?;
    info!(order_id = %order.id, amount = %order.amount, "Order created.");
    Ok(order)
  }

  /// Offers `event` to the order. Events outside the allowed set are logged and ignored;
  /// only a missing order is an error.
  #[instrument(name = "order_store::transition", skip_all, fields(order_id = %order_id, event = ?event))]
  pub async fn transition(&self, order_id: OrderId, event: OrderEvent) -> PaygateResult<TransitionReport> {
    let applied = self
      .orders
      .apply_event(order_id, event, Utc::now())
      .await?
      .ok_or_else(|| PaygateError::OrderNotFound(order_id.to_string()))?;

    if applied.changed {
      info!(from = %applied.previous, to = %applied.order.state, "Order transitioned.");
    } else {
      debug!(state = %applied.order.state, "Event not applicable in current state; ignored.");
    }

    Ok(TransitionReport {
      order: applied.order,
      event,
      previous: applied.previous,
      changed: applied.changed,
    })
  }

  pub async fn get(&self, order_id: OrderId) -> PaygateResult<Order> {
    self
      .orders
      .get(order_id)
      .await?
      .ok_or_else(|| PaygateError::OrderNotFound(order_id.to_string()))
  }

  pub async fn find_by_gateway_reference(&self, reference: &GatewayReference) -> PaygateResult<Option<Order>> {
    self.orders.find_by_gateway_reference(reference).await
  }

  pub async fn orders_for_buyer(&self, buyer: UserId) -> PaygateResult<Vec<Order>> {
    self.orders.list_for_buyer(buyer).await
  }

  /// The buyer's most recent order that has not been settled yet.
  pub async fn latest_open_order(&self, buyer: UserId) -> PaygateResult<Option<Order>> {
    let orders = self.orders.list_for_buyer(buyer).await?;
    Ok(orders.into_iter().rev().find(|order| order.state.is_awaiting_payment()))
  }

  pub async fn state_counts(&self) -> PaygateResult<Vec<(OrderState, u64)>> {
    self.orders.state_counts().await
  }

  pub async fn buyers(&self) -> PaygateResult<Vec<UserId>> {
    self.orders.distinct_buyers().await
  }

  pub(crate) async fn attach_invitation(&self, order_id: OrderId, invitation: Invitation) -> PaygateResult<AttachResult> {
    self
      .orders
      .attach_invitation(order_id, invitation, Utc::now())
      .await?
      .ok_or_else(|| PaygateError::OrderNotFound(order_id.to_string()))
  }

  pub(crate) async fn record_invite_link(&self, order_id: OrderId, link: String) -> PaygateResult<Order> {
    self
      .orders
      .record_invite_link(order_id, link, Utc::now())
      .await?
      .ok_or_else(|| PaygateError::OrderNotFound(order_id.to_string()))
  }

  /// Times out every order still awaiting payment after the configured TTL.
  /// Returns the orders that actually moved to EXPIRED.
  #[instrument(name = "order_store::expire_stale", skip_all)]
  pub async fn expire_stale(&self, now: DateTime<Utc>) -> PaygateResult<Vec<Order>> {
    let ttl = chrono::Duration::from_std(self.order_ttl).unwrap_or_else(|_| chrono::Duration::hours(1));
    let candidates = self.orders.awaiting_payment_before(now - ttl).await?;

    let mut expired = Vec::new();
    for order_id in candidates {
      // A webhook may have settled the order since it was listed; the table decides.
      match self.transition(order_id, OrderEvent::Timeout).await {
        Ok(report) if report.changed => expired.push(report.order),
        Ok(_) => {}
        Err(e) => warn!(order_id = %order_id, error = %e, "Failed to expire order."),
      }
    }
    if !expired.is_empty() {
      info!(count = expired.len(), "Expired stale orders.");
    }
    Ok(expired)
  }
}
