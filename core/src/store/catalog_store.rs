// paygate/src/store/catalog_store.rs

use chrono::Utc;
use std::sync::Arc;
use tracing::{info, instrument};

use super::repository::CatalogRepository;
use crate::domain::ids::ProductId;
use crate::domain::product::{Product, ProductDraft};
use crate::error::{PaygateError, PaygateResult};

/// Read access to the catalog for everyone; writes only through the catalog entry flow.
#[derive(Clone)]
pub struct CatalogStore {
  repo: Arc<dyn CatalogRepository>,
}

impl CatalogStore {
  pub fn new(repo: Arc<dyn CatalogRepository>) -> Self {
    Self { repo }
  }

  pub async fn get(&self, id: &ProductId) -> PaygateResult<Product> {
    self
      .repo
      .get(id)
      .await?
      .ok_or_else(|| PaygateError::ProductNotFound(id.clone()))
  }

  pub async fn list(&self) -> PaygateResult<Vec<Product>> {
    self.repo.list().await
  }

  #[instrument(name = "catalog_store::publish", skip_all, fields(name = %draft.name))]
  pub(crate) async fn publish(&self, draft: ProductDraft) -> PaygateResult<Product> {
    let product = self.repo.insert_new(draft, Utc::now()).await?;
    info!(product_id = %product.id, price = %product.price, "Product published.");
    Ok(product)
  }

  #[instrument(name = "catalog_store::replace", skip_all, fields(product_id = %id))]
  pub(crate) async fn replace(&self, id: &ProductId, draft: ProductDraft) -> PaygateResult<Product> {
    let product = self
      .repo
      .replace(id, draft, Utc::now())
      .await?
      .ok_or_else(|| PaygateError::ProductNotFound(id.clone()))?;
    info!(price = %product.price, "Product replaced.");
    Ok(product)
  }
}
