// paygate/server/src/db/orders.rs

//! Orders in PostgreSQL. Read-modify-write operations lock the row with `FOR UPDATE` inside a
//! transaction and run the same domain methods the in-memory repository runs.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use paygate::store::{AppliedEvent, AttachResult};
use paygate::{
  GatewayReference, Invitation, InvitationAttach, Order, OrderEvent, OrderId, OrderRepository, OrderState,
  PaygateError, PaygateResult, UserId,
};
use sqlx::types::Json;
use sqlx::{PgPool, Postgres, Transaction};
use std::collections::HashMap;

use crate::models::{OrderRow, ORDER_COLUMNS};

#[derive(Clone)]
pub struct PgOrderRepository {
  pool: PgPool,
}

impl PgOrderRepository {
  pub fn new(pool: PgPool) -> Self {
    Self { pool }
  }

  async fn lock(tx: &mut Transaction<'_, Postgres>, id: OrderId) -> PaygateResult<Option<Order>> {
    let row: Option<OrderRow> = sqlx::query_as(&format!(
      "SELECT {} FROM orders WHERE id = $1 FOR UPDATE",
      ORDER_COLUMNS
    ))
    .bind(id.0)
    .fetch_optional(&mut **tx)
    .await
    .map_err(PaygateError::storage)?;
    row.map(to_order).transpose()
  }

  async fn write_back(tx: &mut Transaction<'_, Postgres>, order: &Order) -> PaygateResult<()> {
    sqlx::query("UPDATE orders SET state = $2, invitation = $3, updated_at = $4 WHERE id = $1")
      .bind(order.id.0)
      .bind(order.state.as_str())
      .bind(order.invitation.clone().map(Json))
      .bind(order.updated_at)
      .execute(&mut **tx)
      .await
      .map_err(PaygateError::storage)?;
    Ok(())
  }

  /// Locks the order, hands it to `f`, and persists it when `f` reports a change.
  async fn modify<R>(&self, id: OrderId, f: impl FnOnce(&mut Order) -> (bool, R) + Send) -> PaygateResult<Option<(Order, R)>>
  where
    R: Send,
  {
    let mut tx = self.pool.begin().await.map_err(PaygateError::storage)?;
    let Some(mut order) = Self::lock(&mut tx, id).await? else {
      tx.rollback().await.map_err(PaygateError::storage)?;
      return Ok(None);
    };
    let (changed, result) = f(&mut order);
    if changed {
      Self::write_back(&mut tx, &order).await?;
    }
    tx.commit().await.map_err(PaygateError::storage)?;
    Ok(Some((order, result)))
  }
}

fn to_order(row: OrderRow) -> PaygateResult<Order> {
  Order::try_from(row).map_err(PaygateError::storage)
}

#[async_trait]
impl OrderRepository for PgOrderRepository {
  async fn insert(&self, order: Order) -> PaygateResult<()> {
    sqlx::query(&format!(
      "INSERT INTO orders ({}) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)",
      ORDER_COLUMNS
    ))
    .bind(order.id.0)
    .bind(order.buyer.0)
    .bind(order.product_id.as_str())
    .bind(order.amount.paise())
    .bind(order.state.as_str())
    .bind(order.gateway_reference.as_str())
    .bind(order.invitation.clone().map(Json))
    .bind(order.created_at)
    .bind(order.updated_at)
    .execute(&self.pool)
    .await
    .map_err(PaygateError::storage)?;
    Ok(())
  }

  async fn get(&self, id: OrderId) -> PaygateResult<Option<Order>> {
    let row: Option<OrderRow> = sqlx::query_as(&format!("SELECT {} FROM orders WHERE id = $1", ORDER_COLUMNS))
      .bind(id.0)
      .fetch_optional(&self.pool)
      .await
      .map_err(PaygateError::storage)?;
    row.map(to_order).transpose()
  }

  async fn find_by_gateway_reference(&self, reference: &GatewayReference) -> PaygateResult<Option<Order>> {
    let row: Option<OrderRow> = sqlx::query_as(&format!(
      "SELECT {} FROM orders WHERE gateway_reference = $1",
      ORDER_COLUMNS
    ))
    .bind(reference.as_str())
    .fetch_optional(&self.pool)
    .await
    .map_err(PaygateError::storage)?;
    row.map(to_order).transpose()
  }

  async fn apply_event(&self, id: OrderId, event: OrderEvent, now: DateTime<Utc>) -> PaygateResult<Option<AppliedEvent>> {
    let modified = self
      .modify(id, move |order| {
        let previous = order.state;
        let changed = order.apply(event, now);
        (changed, (previous, changed))
      })
      .await?;
    Ok(modified.map(|(order, (previous, changed))| AppliedEvent {
      order,
      previous,
      changed,
    }))
  }

  async fn attach_invitation(
    &self,
    id: OrderId,
    invitation: Invitation,
    now: DateTime<Utc>,
  ) -> PaygateResult<Option<AttachResult>> {
    let modified = self
      .modify(id, move |order| {
        let outcome = order.try_attach_invitation(invitation, now);
        (outcome == InvitationAttach::Attached, outcome)
      })
      .await?;
    Ok(modified.map(|(order, outcome)| AttachResult { order, outcome }))
  }

  async fn record_invite_link(&self, id: OrderId, link: String, now: DateTime<Utc>) -> PaygateResult<Option<Order>> {
    let modified = self
      .modify(id, move |order| {
        let had_link = order.invitation.as_ref().is_some_and(|inv| inv.link.is_some());
        let stored = order.record_invite_link(link, now);
        (!had_link && stored.is_some(), ())
      })
      .await?;
    Ok(modified.map(|(order, ())| order))
  }

  async fn list_for_buyer(&self, buyer: UserId) -> PaygateResult<Vec<Order>> {
    let rows: Vec<OrderRow> = sqlx::query_as(&format!(
      "SELECT {} FROM orders WHERE buyer_id = $1 ORDER BY created_at ASC",
      ORDER_COLUMNS
    ))
    .bind(buyer.0)
    .fetch_all(&self.pool)
    .await
    .map_err(PaygateError::storage)?;
    rows.into_iter().map(to_order).collect()
  }

  async fn awaiting_payment_before(&self, cutoff: DateTime<Utc>) -> PaygateResult<Vec<OrderId>> {
    let ids: Vec<uuid::Uuid> =
      sqlx::query_scalar("SELECT id FROM orders WHERE state IN ('created', 'pending') AND created_at < $1")
        .bind(cutoff)
        .fetch_all(&self.pool)
        .await
        .map_err(PaygateError::storage)?;
    Ok(ids.into_iter().map(OrderId).collect())
  }

  async fn state_counts(&self) -> PaygateResult<Vec<(OrderState, u64)>> {
    let rows: Vec<(String, i64)> = sqlx::query_as("SELECT state, COUNT(*) FROM orders GROUP BY state")
      .fetch_all(&self.pool)
      .await
      .map_err(PaygateError::storage)?;
    let counts: HashMap<String, i64> = rows.into_iter().collect();
    Ok(
      OrderState::ALL
        .into_iter()
        .map(|state| {
          let n = counts.get(state.as_str()).copied().unwrap_or(0);
          (state, u64::try_from(n).unwrap_or(0))
        })
        .collect(),
    )
  }

  async fn distinct_buyers(&self) -> PaygateResult<Vec<UserId>> {
    let ids: Vec<i64> = sqlx::query_scalar("SELECT DISTINCT buyer_id FROM orders ORDER BY buyer_id")
      .fetch_all(&self.pool)
      .await
      .map_err(PaygateError::storage)?;
    Ok(ids.into_iter().map(UserId).collect())
  }
}
