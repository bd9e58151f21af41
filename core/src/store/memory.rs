// paygate/src/store/memory.rs

//! In-memory repositories. State is lost on restart; use them for tests and single-process
//! deployments without a database.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use std::collections::{BTreeSet, HashMap};
use std::sync::atomic::{AtomicU64, Ordering};

use super::keyed::KeyedCells;
use super::repository::{AppliedEvent, AttachResult, CatalogRepository, OrderRepository};
use crate::domain::ids::{GatewayReference, OrderId, ProductId, UserId};
use crate::domain::invitation::Invitation;
use crate::domain::order::{Order, OrderEvent, OrderState};
use crate::domain::product::{Product, ProductDraft};
use crate::error::{PaygateError, PaygateResult};

#[derive(Debug, Default)]
pub struct InMemoryOrderRepository {
  orders: KeyedCells<OrderId, Order>,
  by_reference: RwLock<HashMap<GatewayReference, OrderId>>,
}

impl InMemoryOrderRepository {
  pub fn new() -> Self {
    Self::default()
  }
}

#[async_trait]
impl OrderRepository for InMemoryOrderRepository {
  async fn insert(&self, order: Order) -> PaygateResult<()> {
    let id = order.id;
    let reference = order.gateway_reference.clone();
    // Hold the index lock across both inserts so a lookup never sees one without the other.
    {
      let mut index = self.by_reference.write();
      if index.contains_key(&reference) {
        return Err(PaygateError::storage(anyhow::anyhow!(
          "duplicate gateway reference {}",
          reference
        )));
      }
      if !self.orders.insert_new(id, order) {
        return Err(PaygateError::storage(anyhow::anyhow!("duplicate order id {}", id)));
      }
      index.insert(reference, id);
    }
    Ok(())
  }

  async fn get(&self, id: OrderId) -> PaygateResult<Option<Order>> {
    Ok(self.orders.get(&id))
  }

  async fn find_by_gateway_reference(&self, reference: &GatewayReference) -> PaygateResult<Option<Order>> {
    let id = self.by_reference.read().get(reference).copied();
    Ok(id.and_then(|id| self.orders.get(&id)))
  }

  async fn apply_event(&self, id: OrderId, event: OrderEvent, now: DateTime<Utc>) -> PaygateResult<Option<AppliedEvent>> {
    Ok(self.orders.with(&id, |order| {
      let previous = order.state;
      let changed = order.apply(event, now);
      AppliedEvent {
        order: order.clone(),
        previous,
        changed,
      }
    }))
  }

  async fn attach_invitation(
    &self,
    id: OrderId,
    invitation: Invitation,
    now: DateTime<Utc>,
  ) -> PaygateResult<Option<AttachResult>> {
    Ok(self.orders.with(&id, |order| {
      let outcome = order.try_attach_invitation(invitation, now);
      AttachResult {
        order: order.clone(),
        outcome,
      }
    }))
  }

  async fn record_invite_link(&self, id: OrderId, link: String, now: DateTime<Utc>) -> PaygateResult<Option<Order>> {
    Ok(self.orders.with(&id, |order| {
      order.record_invite_link(link, now);
      order.clone()
    }))
  }

  async fn list_for_buyer(&self, buyer: UserId) -> PaygateResult<Vec<Order>> {
    let mut orders = self.orders.collect(|order| order.buyer == buyer);
    orders.sort_by_key(|order| order.created_at);
    Ok(orders)
  }

  async fn awaiting_payment_before(&self, cutoff: DateTime<Utc>) -> PaygateResult<Vec<OrderId>> {
    Ok(
      self
        .orders
        .collect(|order| order.state.is_awaiting_payment() && order.created_at < cutoff)
        .into_iter()
        .map(|order| order.id)
        .collect(),
    )
  }

  async fn state_counts(&self) -> PaygateResult<Vec<(OrderState, u64)>> {
    let mut counts: HashMap<OrderState, u64> = HashMap::new();
    for order in self.orders.collect(|_| true) {
      *counts.entry(order.state).or_default() += 1;
    }
    Ok(
      OrderState::ALL
        .into_iter()
        .map(|state| (state, counts.get(&state).copied().unwrap_or(0)))
        .collect(),
    )
  }

  async fn distinct_buyers(&self) -> PaygateResult<Vec<UserId>> {
    let buyers: BTreeSet<UserId> = self.orders.collect(|_| true).into_iter().map(|order| order.buyer).collect();
    Ok(buyers.into_iter().collect())
  }
}

#[derive(Debug, Default)]
pub struct InMemoryCatalogRepository {
  products: KeyedCells<ProductId, Product>,
  sequence: AtomicU64,
}

impl InMemoryCatalogRepository {
  pub fn new() -> Self {
    Self::default()
  }
}

#[async_trait]
impl CatalogRepository for InMemoryCatalogRepository {
  async fn insert_new(&self, draft: ProductDraft, now: DateTime<Utc>) -> PaygateResult<Product> {
    let n = self.sequence.fetch_add(1, Ordering::SeqCst) + 1;
    let product = draft.publish(ProductId::from_sequence(n), now);
    if !self.products.insert_new(product.id.clone(), product.clone()) {
      return Err(PaygateError::storage(anyhow::anyhow!("duplicate product id {}", product.id)));
    }
    Ok(product)
  }

  async fn replace(&self, id: &ProductId, draft: ProductDraft, now: DateTime<Utc>) -> PaygateResult<Option<Product>> {
    Ok(self.products.with(id, |current| {
      *current = current.replaced_by(draft, now);
      current.clone()
    }))
  }

  async fn get(&self, id: &ProductId) -> PaygateResult<Option<Product>> {
    Ok(self.products.get(id))
  }

  async fn list(&self) -> PaygateResult<Vec<Product>> {
    let mut products = self.products.collect(|_| true);
    products.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));
    Ok(products)
  }
}
