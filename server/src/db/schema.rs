// paygate/server/src/db/schema.rs

use sqlx::PgPool;
use tracing::info;

use crate::errors::Result;

/// Idempotent; runs on every start.
const STATEMENTS: &[&str] = &[
  "CREATE SEQUENCE IF NOT EXISTS product_seq",
  r#"CREATE TABLE IF NOT EXISTS products (
    id TEXT PRIMARY KEY,
    name TEXT NOT NULL,
    image_ref TEXT NOT NULL,
    price_paise BIGINT NOT NULL CHECK (price_paise >= 0),
    description TEXT NOT NULL,
    created_at TIMESTAMPTZ NOT NULL,
    updated_at TIMESTAMPTZ NOT NULL
  )"#,
  r#"CREATE TABLE IF NOT EXISTS orders (
    id UUID PRIMARY KEY,
    buyer_id BIGINT NOT NULL,
    product_id TEXT NOT NULL REFERENCES products (id),
    amount_paise BIGINT NOT NULL CHECK (amount_paise >= 0),
    state TEXT NOT NULL,
    gateway_reference TEXT NOT NULL UNIQUE,
    invitation JSONB,
    created_at TIMESTAMPTZ NOT NULL,
    updated_at TIMESTAMPTZ NOT NULL
  )"#,
  "CREATE INDEX IF NOT EXISTS orders_buyer_idx ON orders (buyer_id, created_at)",
  "CREATE INDEX IF NOT EXISTS orders_state_idx ON orders (state, created_at)",
];

pub async fn bootstrap(pool: &PgPool) -> Result<()> {
  for statement in STATEMENTS {
    sqlx::query(statement).execute(pool).await?;
  }
  info!("Database schema is up to date.");
  Ok(())
}
