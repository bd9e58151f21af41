// paygate/src/flow/catalog_entry.rs

//! Admin conversation that collects a product one field at a time.
//!
//! NAME → IMAGE → PRICE → DESCRIPTION → commit. Each step accepts one kind of input and
//! re-prompts on anything else without advancing. Sessions live only in memory, one per
//! admin identity, and end on commit, cancel, or idle timeout.

use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, instrument, warn};

use crate::audit::{AuditEvent, AuditSink};
use crate::domain::ids::{MediaRef, ProductId, UserId};
use crate::domain::money::Amount;
use crate::domain::product::{Product, ProductDraft};
use crate::error::{PaygateError, PaygateResult};
use crate::store::CatalogStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntryStep {
  Name,
  Image,
  Price,
  Description,
}

impl EntryStep {
  /// 1-based position shown to the admin.
  pub fn number(self) -> u8 {
    match self {
      EntryStep::Name => 1,
      EntryStep::Image => 2,
      EntryStep::Price => 3,
      EntryStep::Description => 4,
    }
  }

  pub fn prompt(self) -> &'static str {
    match self {
      EntryStep::Name => "📦 Enter product name:",
      EntryStep::Image => "🖼️ Please send the product image:",
      EntryStep::Price => "💰 Enter product price (e.g., 99.99):",
      EntryStep::Description => "📝 Enter product description:",
    }
  }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EntryInput {
  Text(String),
  Photo(MediaRef),
  /// Anything the transport could not classify as text or an image.
  Other,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EntryReply {
  /// Moved to (or started at) this step.
  Prompt(EntryStep),
  /// Input rejected; the session is still at `step`.
  Reprompt { step: EntryStep, reason: String },
  Committed(Product),
  Cancelled,
  /// The session had been idle too long and was discarded.
  Expired,
  NoSession,
}

#[derive(Debug)]
struct EntrySession {
  step: EntryStep,
  replacing: Option<ProductId>,
  name: Option<String>,
  image: Option<MediaRef>,
  price: Option<Amount>,
  description: Option<String>,
  last_activity: Instant,
}

impl EntrySession {
  fn new(replacing: Option<ProductId>, now: Instant) -> Self {
    Self {
      step: EntryStep::Name,
      replacing,
      name: None,
      image: None,
      price: None,
      description: None,
      last_activity: now,
    }
  }
}

/// What handling one input under the session lock decided.
enum Advance {
  Reply(EntryReply),
  Commit {
    draft: ProductDraft,
    replacing: Option<ProductId>,
    session: EntrySession,
  },
}

pub struct CatalogEntryFlow {
  admin: UserId,
  catalog: CatalogStore,
  audit: Arc<dyn AuditSink>,
  idle_timeout: Duration,
  sessions: Mutex<HashMap<UserId, EntrySession>>,
}

impl CatalogEntryFlow {
  pub fn new(admin: UserId, catalog: CatalogStore, audit: Arc<dyn AuditSink>, idle_timeout: Duration) -> Self {
    Self {
      admin,
      catalog,
      audit,
      idle_timeout,
      sessions: Mutex::new(HashMap::new()),
    }
  }

  pub fn is_admin(&self, user: UserId) -> bool {
    user == self.admin
  }

  /// Starts a fresh session, discarding any partial one.
  pub fn start(&self, user: UserId) -> PaygateResult<EntryReply> {
    self.start_at(user, None, Instant::now())
  }

  /// Starts a session whose commit replaces `product_id` wholesale.
  pub async fn start_replacement(&self, user: UserId, product_id: &ProductId) -> PaygateResult<EntryReply> {
    self.ensure_admin(user)?;
    self.catalog.get(product_id).await?;
    self.start_at(user, Some(product_id.clone()), Instant::now())
  }

  fn start_at(&self, user: UserId, replacing: Option<ProductId>, now: Instant) -> PaygateResult<EntryReply> {
    self.ensure_admin(user)?;
    let previous = self.sessions.lock().insert(user, EntrySession::new(replacing, now));
    if previous.is_some() {
      debug!(user = %user, "Discarded unfinished catalog entry session.");
    }
    info!(user = %user, "Catalog entry session started.");
    Ok(EntryReply::Prompt(EntryStep::Name))
  }

  fn ensure_admin(&self, user: UserId) -> PaygateResult<()> {
    if self.is_admin(user) {
      Ok(())
    } else {
      warn!(user = %user, "Non-admin attempted catalog entry.");
      Err(PaygateError::Unauthorized("catalog entry is restricted to the administrator".to_string()))
    }
  }

  pub fn has_session(&self, user: UserId) -> bool {
    self.sessions.lock().contains_key(&user)
  }

  pub fn current_step(&self, user: UserId) -> Option<EntryStep> {
    self.sessions.lock().get(&user).map(|s| s.step)
  }

  pub fn cancel(&self, user: UserId) -> EntryReply {
    match self.sessions.lock().remove(&user) {
      Some(_) => {
        info!(user = %user, "Catalog entry session cancelled.");
        EntryReply::Cancelled
      }
      None => EntryReply::NoSession,
    }
  }

  pub async fn handle(&self, user: UserId, input: EntryInput) -> PaygateResult<EntryReply> {
    self.handle_at(user, input, Instant::now()).await
  }

  #[instrument(name = "catalog_entry::handle", skip_all, fields(user = %user))]
  pub async fn handle_at(&self, user: UserId, input: EntryInput, now: Instant) -> PaygateResult<EntryReply> {
    if !self.is_admin(user) {
      return Ok(EntryReply::NoSession);
    }

    // The guard is dropped at the end of this block, before any await.
    let advance = {
      let mut sessions = self.sessions.lock();
      let Some(session) = sessions.get_mut(&user) else {
        return Ok(EntryReply::NoSession);
      };
      if now.saturating_duration_since(session.last_activity) >= self.idle_timeout {
        sessions.remove(&user);
        info!("Catalog entry session expired.");
        return Ok(EntryReply::Expired);
      }
      session.last_activity = now;

      match Self::apply_input(session, input) {
        Some(reply) => Advance::Reply(reply),
        None => match sessions.remove(&user) {
          Some(session) => Self::into_commit(session)?,
          None => Advance::Reply(EntryReply::NoSession),
        },
      }
    };

    match advance {
      Advance::Reply(reply) => Ok(reply),
      Advance::Commit {
        draft,
        replacing,
        session,
      } => self.commit(user, draft, replacing, session).await,
    }
  }

  /// Returns `None` once DESCRIPTION was accepted and the session is ready to commit.
  fn apply_input(session: &mut EntrySession, input: EntryInput) -> Option<EntryReply> {
    let step = session.step;
    let reprompt = |reason: &str| {
      Some(EntryReply::Reprompt {
        step,
        reason: reason.to_string(),
      })
    };

    match (step, input) {
      (EntryStep::Name, EntryInput::Text(text)) => {
        let name = text.trim();
        if name.is_empty() {
          return reprompt("❌ Product name cannot be empty.");
        }
        session.name = Some(name.to_string());
        session.step = EntryStep::Image;
        Some(EntryReply::Prompt(EntryStep::Image))
      }
      (EntryStep::Image, EntryInput::Photo(media)) => {
        session.image = Some(media);
        session.step = EntryStep::Price;
        Some(EntryReply::Prompt(EntryStep::Price))
      }
      (EntryStep::Price, EntryInput::Text(text)) => match text.parse::<Amount>() {
        Ok(price) => {
          session.price = Some(price);
          session.step = EntryStep::Description;
          Some(EntryReply::Prompt(EntryStep::Description))
        }
        Err(e) => reprompt(&format!("❌ Invalid price format ({}). Enter a number (e.g., 99.99):", e)),
      },
      (EntryStep::Description, EntryInput::Text(text)) => {
        let description = text.trim();
        if description.is_empty() {
          return reprompt("❌ Product description cannot be empty.");
        }
        session.description = Some(description.to_string());
        None
      }
      (EntryStep::Image, _) => reprompt("❌ Please send a valid image."),
      (_, _) => reprompt("❌ Please send text for this step."),
    }
  }

  fn into_commit(mut session: EntrySession) -> PaygateResult<Advance> {
    let draft = match (
      session.name.clone(),
      session.image.clone(),
      session.price,
      session.description.take(),
    ) {
      (Some(name), Some(image), Some(price), Some(description)) => ProductDraft {
        name,
        image,
        price,
        description,
      },
      _ => {
        return Err(PaygateError::Validation(
          "catalog entry session reached commit with missing fields".to_string(),
        ))
      }
    };
    Ok(Advance::Commit {
      draft,
      replacing: session.replacing.clone(),
      session,
    })
  }

  async fn commit(
    &self,
    user: UserId,
    draft: ProductDraft,
    replacing: Option<ProductId>,
    session: EntrySession,
  ) -> PaygateResult<EntryReply> {
    let published = match &replacing {
      Some(id) => self.catalog.replace(id, draft).await,
      None => self.catalog.publish(draft).await,
    };

    let product = match published {
      Ok(product) => product,
      Err(e) => {
        // Put the session back at DESCRIPTION so the admin can resend it.
        warn!(error = %e, "Failed to commit catalog entry; session kept at description step.");
        self.sessions.lock().entry(user).or_insert(session);
        return Err(e);
      }
    };

    let event = match replacing {
      Some(_) => AuditEvent::ProductReplaced {
        product_id: product.id.clone(),
        name: product.name.clone(),
        price: product.price,
      },
      None => AuditEvent::ProductAdded {
        product_id: product.id.clone(),
        name: product.name.clone(),
        price: product.price,
      },
    };
    self.audit.record(event);
    info!(product_id = %product.id, "Catalog entry committed.");
    Ok(EntryReply::Committed(product))
  }

  /// Drops sessions idle for longer than the timeout. Returns how many were dropped.
  pub fn sweep_idle_at(&self, now: Instant) -> usize {
    let mut sessions = self.sessions.lock();
    let before = sessions.len();
    sessions.retain(|_, s| now.saturating_duration_since(s.last_activity) < self.idle_timeout);
    let dropped = before - sessions.len();
    if dropped > 0 {
      debug!(dropped, "Discarded idle catalog entry sessions.");
    }
    dropped
  }

  pub fn sweep_idle(&self) -> usize {
    self.sweep_idle_at(Instant::now())
  }
}
