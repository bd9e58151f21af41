// paygate/src/domain/product.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::ids::{MediaRef, ProductId};
use super::money::Amount;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
  pub id: ProductId,
  pub name: String,
  pub image: MediaRef,
  pub price: Amount,
  pub description: String,
  pub created_at: DateTime<Utc>,
  pub updated_at: DateTime<Utc>,
}

/// The fields collected by a completed catalog entry run, before an id is assigned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProductDraft {
  pub name: String,
  pub image: MediaRef,
  pub price: Amount,
  pub description: String,
}

impl ProductDraft {
  pub fn publish(self, id: ProductId, now: DateTime<Utc>) -> Product {
    Product {
      id,
      name: self.name,
      image: self.image,
      price: self.price,
      description: self.description,
      created_at: now,
      updated_at: now,
    }
  }
}

impl Product {
  /// Replacement keeps the id and the original creation time.
  pub fn replaced_by(&self, draft: ProductDraft, now: DateTime<Utc>) -> Product {
    Product {
      created_at: self.created_at,
      ..draft.publish(self.id.clone(), now)
    }
  }

  /// Short catalog line used in chat listings.
  pub fn summary(&self) -> String {
    let preview: String = self.description.chars().take(50).collect();
    let ellipsis = if self.description.chars().count() > 50 { "..." } else { "" };
    format!("• {}\n  💰 {}\n  {}{}", self.name, self.price, preview, ellipsis)
  }
}
