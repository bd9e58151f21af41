// paygate/server/src/models/order.rs

use chrono::{DateTime, Utc};
use paygate::{Amount, GatewayReference, Invitation, Order, OrderId, OrderState, ProductId, UserId};
use sqlx::types::Json;
use sqlx::FromRow;
use uuid::Uuid;

use crate::errors::AppError;

pub const ORDER_COLUMNS: &str =
  "id, buyer_id, product_id, amount_paise, state, gateway_reference, invitation, created_at, updated_at";

#[derive(Debug, Clone, FromRow)]
pub struct OrderRow {
  pub id: Uuid,
  pub buyer_id: i64,
  pub product_id: String,
  pub amount_paise: i64,
  pub state: String,
  pub gateway_reference: String,
  pub invitation: Option<Json<Invitation>>,
  pub created_at: DateTime<Utc>,
  pub updated_at: DateTime<Utc>,
}

impl TryFrom<OrderRow> for Order {
  type Error = AppError;

  fn try_from(row: OrderRow) -> Result<Self, Self::Error> {
    let state = row
      .state
      .parse::<OrderState>()
      .map_err(|e| AppError::Internal(format!("order {}: {}", row.id, e)))?;
    let amount = Amount::from_paise(row.amount_paise)
      .ok_or_else(|| AppError::Internal(format!("order {}: negative amount", row.id)))?;
    Ok(Order {
      id: OrderId(row.id),
      buyer: UserId(row.buyer_id),
      product_id: ProductId::new(row.product_id),
      amount,
      state,
      created_at: row.created_at,
      updated_at: row.updated_at,
      gateway_reference: GatewayReference::new(row.gateway_reference),
      invitation: row.invitation.map(|Json(invitation)| invitation),
    })
  }
}
