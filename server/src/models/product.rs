// paygate/server/src/models/product.rs

use chrono::{DateTime, Utc};
use paygate::{Amount, MediaRef, Product, ProductId};
use sqlx::FromRow;

use crate::errors::AppError;

pub const PRODUCT_COLUMNS: &str = "id, name, image_ref, price_paise, description, created_at, updated_at";

#[derive(Debug, Clone, FromRow)]
pub struct ProductRow {
  pub id: String,
  pub name: String,
  pub image_ref: String,
  pub price_paise: i64,
  pub description: String,
  pub created_at: DateTime<Utc>,
  pub updated_at: DateTime<Utc>,
}

impl TryFrom<ProductRow> for Product {
  type Error = AppError;

  fn try_from(row: ProductRow) -> Result<Self, Self::Error> {
    let price = Amount::from_paise(row.price_paise)
      .ok_or_else(|| AppError::Internal(format!("product {}: negative price", row.id)))?;
    Ok(Product {
      id: ProductId::new(row.id),
      name: row.name,
      image: MediaRef::new(row.image_ref),
      price,
      description: row.description,
      created_at: row.created_at,
      updated_at: row.updated_at,
    })
  }
}
