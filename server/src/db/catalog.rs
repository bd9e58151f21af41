// paygate/server/src/db/catalog.rs

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use paygate::{CatalogRepository, PaygateError, PaygateResult, Product, ProductDraft, ProductId};
use sqlx::PgPool;

use crate::models::{ProductRow, PRODUCT_COLUMNS};

#[derive(Clone)]
pub struct PgCatalogRepository {
  pool: PgPool,
}

impl PgCatalogRepository {
  pub fn new(pool: PgPool) -> Self {
    Self { pool }
  }
}

fn to_product(row: ProductRow) -> PaygateResult<Product> {
  Product::try_from(row).map_err(PaygateError::storage)
}

#[async_trait]
impl CatalogRepository for PgCatalogRepository {
  async fn insert_new(&self, draft: ProductDraft, now: DateTime<Utc>) -> PaygateResult<Product> {
    let row: ProductRow = sqlx::query_as(&format!(
      "INSERT INTO products (id, name, image_ref, price_paise, description, created_at, updated_at) \
       VALUES ('prod_' || nextval('product_seq'), $1, $2, $3, $4, $5, $5) \
       RETURNING {}",
      PRODUCT_COLUMNS
    ))
    .bind(&draft.name)
    .bind(draft.image.as_str())
    .bind(draft.price.paise())
    .bind(&draft.description)
    .bind(now)
    .fetch_one(&self.pool)
    .await
    .map_err(PaygateError::storage)?;
    to_product(row)
  }

  async fn replace(&self, id: &ProductId, draft: ProductDraft, now: DateTime<Utc>) -> PaygateResult<Option<Product>> {
    let row: Option<ProductRow> = sqlx::query_as(&format!(
      "UPDATE products SET name = $2, image_ref = $3, price_paise = $4, description = $5, updated_at = $6 \
       WHERE id = $1 RETURNING {}",
      PRODUCT_COLUMNS
    ))
    .bind(id.as_str())
    .bind(&draft.name)
    .bind(draft.image.as_str())
    .bind(draft.price.paise())
    .bind(&draft.description)
    .bind(now)
    .fetch_optional(&self.pool)
    .await
    .map_err(PaygateError::storage)?;
    row.map(to_product).transpose()
  }

  async fn get(&self, id: &ProductId) -> PaygateResult<Option<Product>> {
    let row: Option<ProductRow> = sqlx::query_as(&format!("SELECT {} FROM products WHERE id = $1", PRODUCT_COLUMNS))
      .bind(id.as_str())
      .fetch_optional(&self.pool)
      .await
      .map_err(PaygateError::storage)?;
    row.map(to_product).transpose()
  }

  async fn list(&self) -> PaygateResult<Vec<Product>> {
    let rows: Vec<ProductRow> = sqlx::query_as(&format!(
      "SELECT {} FROM products ORDER BY created_at ASC, id ASC",
      PRODUCT_COLUMNS
    ))
    .fetch_all(&self.pool)
    .await
    .map_err(PaygateError::storage)?;
    rows.into_iter().map(to_product).collect()
  }
}
