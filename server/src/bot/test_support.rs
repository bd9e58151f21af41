// paygate/server/src/bot/test_support.rs

//! In-process fakes for exercising the dispatcher without the Bot API or a gateway.

use async_trait::async_trait;
use parking_lot::Mutex;
use paygate::{
  Amount, AuditEvent, AuditSink, ChatId, ChatTransport, EngineSettings, GatewayCheckout, GatewayReference,
  InMemoryCatalogRepository, InMemoryOrderRepository, Invitation, MediaRef, Paygate, PaygateDeps, PaygateResult,
  PaymentGateway, SignatureVerifier, UserId,
};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use super::Dispatcher;
use crate::errors::{AppError, Result as AppResult};
use crate::services::telegram::{BotApi, CallbackQuery, Chat, InlineKeyboardMarkup, Message, PhotoSize, Update, User};

pub const SECRET: &str = "webhook-secret";
pub const OWNER: UserId = UserId(42);
pub const BUYER: UserId = UserId(7);
pub const GROUP: ChatId = ChatId(-100_123);

pub struct SilentTransport;

#[async_trait]
impl ChatTransport for SilentTransport {
  async fn send_text(&self, _chat: ChatId, _text: &str) -> PaygateResult<()> {
    Ok(())
  }

  async fn send_photo(&self, _chat: ChatId, _photo: &MediaRef, _caption: &str) -> PaygateResult<()> {
    Ok(())
  }

  async fn create_invite_link(&self, _group: ChatId, invitation: &Invitation) -> PaygateResult<String> {
    Ok(format!("https://t.me/+{}", invitation.order_id))
  }
}

pub struct StaticGateway;

#[async_trait]
impl PaymentGateway for StaticGateway {
  async fn create_order(&self, _amount: Amount, reference: &GatewayReference) -> PaygateResult<GatewayCheckout> {
    Ok(GatewayCheckout {
      payment_url: format!("https://pay.example/{}", reference),
    })
  }
}

#[derive(Default)]
pub struct RecordingAudit {
  pub events: Mutex<Vec<AuditEvent>>,
}

impl RecordingAudit {
  pub fn count(&self, kind: &str) -> usize {
    self.events.lock().iter().filter(|e| e.kind() == kind).count()
  }
}

impl AuditSink for RecordingAudit {
  fn record(&self, event: AuditEvent) {
    self.events.lock().push(event);
  }
}

/// Records every outbound Bot API call in order.
#[derive(Default)]
pub struct RecordingBot {
  pub messages: Mutex<Vec<(ChatId, String)>>,
  pub photos: Mutex<Vec<(ChatId, MediaRef, String)>>,
  pub answered: Mutex<Vec<(String, Option<String>)>>,
  /// Chats whose messages fail as if the user had blocked the bot.
  pub unreachable: Mutex<HashSet<ChatId>>,
}

impl RecordingBot {
  pub fn texts_to(&self, chat: ChatId) -> Vec<String> {
    self
      .messages
      .lock()
      .iter()
      .filter(|(c, _)| *c == chat)
      .map(|(_, text)| text.clone())
      .collect()
  }

  pub fn last_text_to(&self, chat: ChatId) -> Option<String> {
    self.texts_to(chat).pop()
  }
}

#[async_trait]
impl BotApi for RecordingBot {
  async fn send_message(&self, chat: ChatId, text: &str, _keyboard: Option<&InlineKeyboardMarkup>) -> AppResult<()> {
    if self.unreachable.lock().contains(&chat) {
      return Err(AppError::Telegram("Forbidden: bot was blocked by the user".to_string()));
    }
    self.messages.lock().push((chat, text.to_string()));
    Ok(())
  }

  async fn send_photo_with(
    &self,
    chat: ChatId,
    photo: &MediaRef,
    caption: &str,
    _keyboard: Option<&InlineKeyboardMarkup>,
  ) -> AppResult<()> {
    self.photos.lock().push((chat, photo.clone(), caption.to_string()));
    Ok(())
  }

  async fn answer_callback_query(&self, callback_id: &str, text: Option<&str>) -> AppResult<()> {
    self.answered.lock().push((callback_id.to_string(), text.map(str::to_string)));
    Ok(())
  }
}

pub struct BotHarness {
  pub engine: Paygate,
  pub bot: Arc<RecordingBot>,
  pub audit: Arc<RecordingAudit>,
  pub dispatcher: Arc<Dispatcher>,
}

pub fn engine_with(audit: Arc<dyn AuditSink>, settings: EngineSettings) -> Paygate {
  Paygate::new(
    PaygateDeps {
      orders: Arc::new(InMemoryOrderRepository::new()),
      catalog: Arc::new(InMemoryCatalogRepository::new()),
      transport: Arc::new(SilentTransport),
      gateway: Arc::new(StaticGateway),
      audit,
      verifier: SignatureVerifier::new(SECRET).unwrap(),
      admin: OWNER,
      group: GROUP,
    },
    settings,
  )
}

/// A dispatcher whose rate limit window outlasts any test.
pub fn bot_harness() -> BotHarness {
  let audit = Arc::new(RecordingAudit::default());
  let settings = EngineSettings {
    rate_limit_interval: Duration::from_secs(3600),
    ..EngineSettings::default()
  };
  let engine = engine_with(audit.clone(), settings);
  let bot = Arc::new(RecordingBot::default());
  let dispatcher = Arc::new(Dispatcher::new(engine.clone(), bot.clone(), OWNER));
  BotHarness {
    engine,
    bot,
    audit,
    dispatcher,
  }
}

fn private_chat(user: UserId) -> Chat {
  Chat {
    id: user.0,
    kind: "private".to_string(),
    title: None,
  }
}

fn sender(user: UserId) -> User {
  User {
    id: user.0,
    username: Some(format!("user{}", user.0)),
  }
}

pub fn text_update(user: UserId, text: &str) -> Update {
  Update {
    update_id: 0,
    message: Some(Message {
      from: Some(sender(user)),
      chat: private_chat(user),
      text: Some(text.to_string()),
      photo: None,
    }),
    callback_query: None,
    my_chat_member: None,
  }
}

pub fn photo_update(user: UserId, file_id: &str) -> Update {
  Update {
    update_id: 0,
    message: Some(Message {
      from: Some(sender(user)),
      chat: private_chat(user),
      text: None,
      photo: Some(vec![PhotoSize {
        file_id: file_id.to_string(),
        width: 800,
        height: 600,
      }]),
    }),
    callback_query: None,
    my_chat_member: None,
  }
}

pub fn callback_update(user: UserId, id: &str, data: &str) -> Update {
  Update {
    update_id: 0,
    message: None,
    callback_query: Some(CallbackQuery {
      id: id.to_string(),
      from: sender(user),
      data: Some(data.to_string()),
      message: None,
    }),
    my_chat_member: None,
  }
}

impl BotHarness {
  /// Walks the admin through the four entry steps.
  pub async fn add_product(&self, name: &str, price: &str) -> paygate::Product {
    self.dispatcher.dispatch(text_update(OWNER, "/add_product")).await;
    self.dispatcher.dispatch(text_update(OWNER, name)).await;
    self.dispatcher.dispatch(photo_update(OWNER, "photo-1")).await;
    self.dispatcher.dispatch(text_update(OWNER, price)).await;
    self.dispatcher.dispatch(text_update(OWNER, "Monthly access")).await;
    let products = self.engine.catalog.list().await.unwrap();
    products.into_iter().find(|p| p.name == name).unwrap()
  }
}
