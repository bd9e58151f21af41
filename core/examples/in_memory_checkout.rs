// paygate/examples/in_memory_checkout.rs

use async_trait::async_trait;
use paygate::{
  Amount, ChatId, ChatTransport, EngineSettings, EntryInput, EntryReply, GatewayCheckout, GatewayReference,
  InMemoryCatalogRepository, InMemoryOrderRepository, Invitation, MediaRef, PaygateError, PaygateResult, Paygate,
  PaygateDeps, PaymentGateway, SignatureVerifier, TracingAuditSink, UserId,
};
use std::sync::Arc;
use tracing::info;

// 1. A transport that prints instead of talking to a chat service.
struct StdoutTransport;

#[async_trait]
impl ChatTransport for StdoutTransport {
  async fn send_text(&self, chat: ChatId, text: &str) -> PaygateResult<()> {
    info!("-> {}: {}", chat, text);
    Ok(())
  }

  async fn send_photo(&self, chat: ChatId, photo: &MediaRef, caption: &str) -> PaygateResult<()> {
    info!("-> {}: [photo {}] {}", chat, photo.as_str(), caption);
    Ok(())
  }

  async fn create_invite_link(&self, _group: ChatId, invitation: &Invitation) -> PaygateResult<String> {
    Ok(format!("https://t.me/+example{}", invitation.order_id))
  }
}

// 2. A gateway that hands out a fake pay URL.
struct LocalGateway;

#[async_trait]
impl PaymentGateway for LocalGateway {
  async fn create_order(&self, amount: Amount, reference: &GatewayReference) -> PaygateResult<GatewayCheckout> {
    Ok(GatewayCheckout {
      payment_url: format!("http://localhost/pay/{}?amount={}", reference, amount.to_decimal_string()),
    })
  }
}

#[tokio::main]
async fn main() -> Result<(), PaygateError> {
  tracing_subscriber::fmt().with_max_level(tracing::Level::INFO).init();

  info!("--- In-memory checkout example ---");

  let admin = UserId(1);
  let buyer = UserId(2);
  let verifier = SignatureVerifier::new("example-secret")?;

  let engine = Paygate::new(
    PaygateDeps {
      orders: Arc::new(InMemoryOrderRepository::new()),
      catalog: Arc::new(InMemoryCatalogRepository::new()),
      transport: Arc::new(StdoutTransport),
      gateway: Arc::new(LocalGateway),
      audit: Arc::new(TracingAuditSink),
      verifier: verifier.clone(),
      admin,
      group: ChatId(-100),
    },
    EngineSettings::default(),
  );

  // 3. The admin adds a product.
  engine.catalog_entry.start(admin)?;
  let mut reply = EntryReply::NoSession;
  for input in [
    EntryInput::Text("Premium Group".into()),
    EntryInput::Photo(MediaRef::new("cover-image")),
    EntryInput::Text("99.00".into()),
    EntryInput::Text("Lifetime access".into()),
  ] {
    reply = engine.catalog_entry.handle(admin, input).await?;
  }
  let EntryReply::Committed(product) = reply else {
    return Err(PaygateError::Validation(format!("unexpected reply {:?}", reply)));
  };

  // 4. A buyer checks out, then the gateway reports the payment.
  let checkout = engine.buyers.purchase(buyer, &product.id).await?;
  info!("Pay at: {}", checkout.payment_url);

  let body = serde_json::json!({
    "status": "completed",
    "order_reference": checkout.order.gateway_reference.as_str(),
  })
  .to_string();
  let signature = verifier.sign(body.as_bytes());
  let outcome = engine.webhooks.ingest(body.as_bytes(), Some(&signature)).await?;
  info!("Webhook outcome: {:?}", outcome);

  let order = engine.orders.get(checkout.order.id).await?;
  info!("Final order state: {}", order.state);
  Ok(())
}
