// paygate/src/store/repository.rs

//! Persistence seams. Implementations must make every method atomic with respect to the
//! single record it touches; `apply_event`, `attach_invitation` and `record_invite_link`
//! are read-modify-write operations and must be serialized per order.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::domain::ids::{GatewayReference, OrderId, ProductId, UserId};
use crate::domain::invitation::Invitation;
use crate::domain::order::{InvitationAttach, Order, OrderEvent, OrderState};
use crate::domain::product::{Product, ProductDraft};
use crate::error::PaygateResult;

/// What happened when an event was offered to an order.
#[derive(Debug, Clone)]
pub struct AppliedEvent {
  pub order: Order,
  pub previous: OrderState,
  pub changed: bool,
}

#[derive(Debug, Clone)]
pub struct AttachResult {
  pub order: Order,
  pub outcome: InvitationAttach,
}

#[async_trait]
pub trait OrderRepository: Send + Sync {
  async fn insert(&self, order: Order) -> PaygateResult<()>;

  async fn get(&self, id: OrderId) -> PaygateResult<Option<Order>>;

  async fn find_by_gateway_reference(&self, reference: &GatewayReference) -> PaygateResult<Option<Order>>;

  /// Runs [`Order::apply`] under the order's lock. `None` if the order does not exist.
  async fn apply_event(&self, id: OrderId, event: OrderEvent, now: DateTime<Utc>) -> PaygateResult<Option<AppliedEvent>>;

  /// Runs [`Order::try_attach_invitation`] under the order's lock.
  async fn attach_invitation(
    &self,
    id: OrderId,
    invitation: Invitation,
    now: DateTime<Utc>,
  ) -> PaygateResult<Option<AttachResult>>;

  /// Runs [`Order::record_invite_link`] under the order's lock and returns the updated order.
  async fn record_invite_link(&self, id: OrderId, link: String, now: DateTime<Utc>) -> PaygateResult<Option<Order>>;

  async fn list_for_buyer(&self, buyer: UserId) -> PaygateResult<Vec<Order>>;

  /// Orders still in CREATED or PENDING that were created before `cutoff`.
  async fn awaiting_payment_before(&self, cutoff: DateTime<Utc>) -> PaygateResult<Vec<OrderId>>;

  async fn state_counts(&self) -> PaygateResult<Vec<(OrderState, u64)>>;

  /// Every user that has placed at least one order, ascending by id.
  async fn distinct_buyers(&self) -> PaygateResult<Vec<UserId>>;
}

#[async_trait]
pub trait CatalogRepository: Send + Sync {
  /// Assigns the next `prod_<n>` id and stores the product.
  async fn insert_new(&self, draft: ProductDraft, now: DateTime<Utc>) -> PaygateResult<Product>;

  /// Full replacement of an existing product. `None` if the id is unknown.
  async fn replace(&self, id: &ProductId, draft: ProductDraft, now: DateTime<Utc>) -> PaygateResult<Option<Product>>;

  async fn get(&self, id: &ProductId) -> PaygateResult<Option<Product>>;

  /// All products, oldest first.
  async fn list(&self) -> PaygateResult<Vec<Product>>;
}
