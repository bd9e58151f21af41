// paygate/src/engine.rs

//! Defines `Paygate`, the wired-up set of engine components a host application drives.

use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, instrument};

use crate::access::AccessProvisioner;
use crate::audit::{AuditEvent, AuditSink};
use crate::buyer::BuyerFlow;
use crate::domain::ids::{ChatId, UserId};
use crate::error::PaygateResult;
use crate::flow::CatalogEntryFlow;
use crate::payment::{PaymentGateway, Settlement, SignatureVerifier, WebhookIngestor};
use crate::rate_limit::RateLimiter;
use crate::settings::EngineSettings;
use crate::store::{CatalogRepository, CatalogStore, OrderRepository, OrderStore};
use crate::transport::ChatTransport;

/// Everything the engine needs from its host.
pub struct PaygateDeps {
  pub orders: Arc<dyn OrderRepository>,
  pub catalog: Arc<dyn CatalogRepository>,
  pub transport: Arc<dyn ChatTransport>,
  pub gateway: Arc<dyn PaymentGateway>,
  pub audit: Arc<dyn AuditSink>,
  pub verifier: SignatureVerifier,
  /// The single administrator identity.
  pub admin: UserId,
  /// The restricted group invitations admit to.
  pub group: ChatId,
}

/// Cheap to clone; all components are shared.
#[derive(Clone)]
pub struct Paygate {
  pub catalog: CatalogStore,
  pub orders: OrderStore,
  pub provisioner: Arc<AccessProvisioner>,
  pub settlement: Arc<Settlement>,
  pub webhooks: Arc<WebhookIngestor>,
  pub buyers: Arc<BuyerFlow>,
  pub catalog_entry: Arc<CatalogEntryFlow>,
  pub rate_limiter: Arc<RateLimiter>,
  pub audit: Arc<dyn AuditSink>,
  settings: EngineSettings,
}

/// Counts from one [`Paygate::sweep`] pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepReport {
  pub expired_orders: usize,
  pub dropped_sessions: usize,
  pub pruned_rate_limits: usize,
}

impl Paygate {
  pub fn new(deps: PaygateDeps, settings: EngineSettings) -> Self {
    let catalog = CatalogStore::new(deps.catalog);
    let orders = OrderStore::new(deps.orders, catalog.clone(), settings.order_ttl);
    let provisioner = Arc::new(AccessProvisioner::new(
      orders.clone(),
      deps.transport,
      deps.audit.clone(),
      deps.group,
    ));
    let settlement = Arc::new(Settlement::new(orders.clone(), provisioner.clone(), deps.audit.clone()));
    let webhooks = Arc::new(WebhookIngestor::new(deps.verifier, orders.clone(), settlement.clone()));
    let buyers = Arc::new(BuyerFlow::new(
      catalog.clone(),
      orders.clone(),
      deps.gateway,
      settlement.clone(),
      provisioner.clone(),
      deps.audit.clone(),
    ));
    let catalog_entry = Arc::new(CatalogEntryFlow::new(
      deps.admin,
      catalog.clone(),
      deps.audit.clone(),
      settings.session_idle_timeout,
    ));
    let rate_limiter = Arc::new(RateLimiter::new(settings.rate_limit_interval));

    Paygate {
      catalog,
      orders,
      provisioner,
      settlement,
      webhooks,
      buyers,
      catalog_entry,
      rate_limiter,
      audit: deps.audit,
      settings,
    }
  }

  pub fn settings(&self) -> &EngineSettings {
    &self.settings
  }

  /// Expires stale orders, drops idle catalog entry sessions, and prunes rate limit state.
  #[instrument(name = "paygate::sweep", skip_all)]
  pub async fn sweep(&self, now: DateTime<Utc>) -> PaygateResult<SweepReport> {
    let expired = self.orders.expire_stale(now).await?;
    for order in &expired {
      self.audit.record(AuditEvent::OrderExpired {
        buyer: order.buyer,
        order_id: order.id,
      });
    }
    let instant = Instant::now();
    let report = SweepReport {
      expired_orders: expired.len(),
      dropped_sessions: self.catalog_entry.sweep_idle_at(instant),
      pruned_rate_limits: self.rate_limiter.prune_at(instant),
    };
    debug!(?report, "Sweep finished.");
    Ok(report)
  }
}
