// tests/common/mod.rs
#![allow(dead_code)] // Each test binary uses a different subset.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use paygate::{
  Amount, AuditEvent, AuditSink, ChatId, ChatTransport, EngineSettings, EntryInput, EntryReply, GatewayCheckout,
  GatewayReference, InMemoryCatalogRepository, InMemoryOrderRepository, Invitation, MediaRef, OrderEvent,
  PaygateError, PaygateResult, Paygate, PaygateDeps, PaymentGateway, Product, SignatureVerifier, UserId,
};
use std::sync::{
  atomic::{AtomicBool, AtomicUsize, Ordering},
  Arc,
};
use tracing::Level;

pub const ADMIN: UserId = UserId(1);
pub const BUYER: UserId = UserId(4242);
pub const OTHER_BUYER: UserId = UserId(5151);
pub const GROUP: ChatId = ChatId(-100_200_300);
pub const WEBHOOK_SECRET: &str = "test-webhook-secret";

// --- Fakes ---

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreatedLink {
  pub group: ChatId,
  pub max_uses: u32,
  pub expires_at: DateTime<Utc>,
  pub link: String,
}

/// Records everything sent through it. Can be told to fail link creation or sends.
#[derive(Default)]
pub struct RecordingTransport {
  pub texts: Mutex<Vec<(ChatId, String)>>,
  pub photos: Mutex<Vec<(ChatId, MediaRef, String)>>,
  pub links: Mutex<Vec<CreatedLink>>,
  pub fail_links: AtomicBool,
  pub fail_texts: AtomicBool,
}

impl RecordingTransport {
  pub fn link_count(&self) -> usize {
    self.links.lock().len()
  }

  pub fn texts_to(&self, chat: ChatId) -> Vec<String> {
    self
      .texts
      .lock()
      .iter()
      .filter(|(to, _)| *to == chat)
      .map(|(_, text)| text.clone())
      .collect()
  }
}

#[async_trait]
impl ChatTransport for RecordingTransport {
  async fn send_text(&self, chat: ChatId, text: &str) -> PaygateResult<()> {
    if self.fail_texts.load(Ordering::SeqCst) {
      return Err(PaygateError::Delivery("send_text disabled".to_string()));
    }
    self.texts.lock().push((chat, text.to_string()));
    Ok(())
  }

  async fn send_photo(&self, chat: ChatId, photo: &MediaRef, caption: &str) -> PaygateResult<()> {
    self.photos.lock().push((chat, photo.clone(), caption.to_string()));
    Ok(())
  }

  async fn create_invite_link(&self, group: ChatId, invitation: &Invitation) -> PaygateResult<String> {
    if self.fail_links.load(Ordering::SeqCst) {
      return Err(PaygateError::Delivery("create_invite_link disabled".to_string()));
    }
    // Yield so concurrent callers interleave on the multi-threaded runtime.
    tokio::task::yield_now().await;
    let link = format!("https://t.me/+{}", invitation.token);
    self.links.lock().push(CreatedLink {
      group,
      max_uses: invitation.max_uses,
      expires_at: invitation.expires_at,
      link: link.clone(),
    });
    Ok(link)
  }
}

#[derive(Default)]
pub struct FakeGateway {
  pub created: Mutex<Vec<(Amount, GatewayReference)>>,
  pub fail_create: AtomicBool,
  pub status: Mutex<Option<OrderEvent>>,
  pub status_queries: AtomicUsize,
}

impl FakeGateway {
  pub fn set_status(&self, event: Option<OrderEvent>) {
    *self.status.lock() = event;
  }
}

#[async_trait]
impl PaymentGateway for FakeGateway {
  async fn create_order(&self, amount: Amount, reference: &GatewayReference) -> PaygateResult<GatewayCheckout> {
    if self.fail_create.load(Ordering::SeqCst) {
      return Err(PaygateError::Gateway("gateway answered 'error': merchant disabled".to_string()));
    }
    self.created.lock().push((amount, reference.clone()));
    Ok(GatewayCheckout {
      payment_url: format!("https://pay.example/checkout/{}", reference),
    })
  }

  async fn query_status(&self, _reference: &GatewayReference) -> PaygateResult<Option<OrderEvent>> {
    self.status_queries.fetch_add(1, Ordering::SeqCst);
    Ok(*self.status.lock())
  }
}

#[derive(Default)]
pub struct MemoryAuditSink {
  pub events: Mutex<Vec<AuditEvent>>,
}

impl MemoryAuditSink {
  pub fn kinds(&self) -> Vec<&'static str> {
    self.events.lock().iter().map(|e| e.kind()).collect()
  }

  pub fn count(&self, kind: &str) -> usize {
    self.events.lock().iter().filter(|e| e.kind() == kind).count()
  }
}

impl AuditSink for MemoryAuditSink {
  fn record(&self, event: AuditEvent) {
    self.events.lock().push(event);
  }
}

// --- Harness ---

pub struct Harness {
  pub engine: Paygate,
  pub transport: Arc<RecordingTransport>,
  pub gateway: Arc<FakeGateway>,
  pub audit: Arc<MemoryAuditSink>,
  pub verifier: SignatureVerifier,
}

pub fn harness() -> Harness {
  harness_with(EngineSettings::default())
}

pub fn harness_with(settings: EngineSettings) -> Harness {
  let transport = Arc::new(RecordingTransport::default());
  let gateway = Arc::new(FakeGateway::default());
  let audit = Arc::new(MemoryAuditSink::default());
  let verifier = SignatureVerifier::new(WEBHOOK_SECRET).expect("test secret is valid");

  let engine = Paygate::new(
    PaygateDeps {
      orders: Arc::new(InMemoryOrderRepository::new()),
      catalog: Arc::new(InMemoryCatalogRepository::new()),
      transport: transport.clone(),
      gateway: gateway.clone(),
      audit: audit.clone(),
      verifier: verifier.clone(),
      admin: ADMIN,
      group: GROUP,
    },
    settings,
  );

  Harness {
    engine,
    transport,
    gateway,
    audit,
    verifier,
  }
}

impl Harness {
  /// Publishes a product by walking the admin through the whole catalog entry conversation.
  pub async fn seed_product(&self, name: &str, price: &str) -> Product {
    let flow = &self.engine.catalog_entry;
    flow.start(ADMIN).expect("admin may start");
    let inputs = [
      EntryInput::Text(name.to_string()),
      EntryInput::Photo(MediaRef::new(format!("photo-{}", name))),
      EntryInput::Text(price.to_string()),
      EntryInput::Text(format!("{} description", name)),
    ];
    let mut last = EntryReply::NoSession;
    for input in inputs {
      last = flow.handle(ADMIN, input).await.expect("entry step succeeds");
    }
    match last {
      EntryReply::Committed(product) => product,
      other => panic!("Expected a committed product, got {:?}", other),
    }
  }

  /// A webhook body for `reference` and a valid signature for it.
  pub fn signed_webhook(&self, status: &str, reference: &GatewayReference) -> (Vec<u8>, String) {
    let body = serde_json::json!({ "status": status, "order_reference": reference.as_str() })
      .to_string()
      .into_bytes();
    let signature = self.verifier.sign(&body);
    (body, signature)
  }
}

// --- Helper for Tracing Setup (call once per test run if needed) ---
use once_cell::sync::Lazy;
static TRACING_INIT: Lazy<()> = Lazy::new(|| {
  tracing_subscriber::fmt()
    .with_max_level(Level::DEBUG)
    .with_test_writer() // Important for tests to capture output
    .try_init()
    .ok();
});

pub fn setup_tracing() {
  Lazy::force(&TRACING_INIT);
}
