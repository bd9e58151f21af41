// paygate/server/src/bot/dispatcher.rs

//! Routes Telegram updates to the engine and renders the results back into chat.

use paygate::{
  AuditEvent, ChatId, EntryInput, EntryReply, OrderId, Paygate, PaygateError, PaygateResult, PaymentProof,
  ProductId, UserId, VerifyOutcome,
};
use std::sync::Arc;
use tracing::{debug, error, info, instrument, warn};

use super::commands::{CallbackAction, Command};
use super::replies;
use crate::errors::Result as AppResult;
use crate::services::telegram::{
  BotApi, CallbackQuery, ChatMemberUpdated, InlineKeyboardButton, InlineKeyboardMarkup, Message, Update,
};

/// Audit records keep this many characters of a broadcast.
const BROADCAST_PREVIEW_CHARS: usize = 100;

pub struct Dispatcher {
  engine: Paygate,
  telegram: Arc<dyn BotApi>,
  owner: UserId,
}

impl Dispatcher {
  pub fn new(engine: Paygate, telegram: Arc<dyn BotApi>, owner: UserId) -> Self {
    Self { engine, telegram, owner }
  }

  /// Handles one update. Failures are logged here; nothing propagates to the update source.
  #[instrument(name = "bot::dispatch", skip_all, fields(update_id = update.update_id))]
  pub async fn dispatch(&self, update: Update) {
    let result = if let Some(callback) = update.callback_query {
      self.on_callback(callback).await
    } else if let Some(member) = update.my_chat_member {
      self.on_membership(member).await
    } else if let Some(message) = update.message {
      self.on_message(message).await
    } else {
      debug!("Ignoring update without a handled payload.");
      Ok(())
    };

    if let Err(e) = result {
      error!(error = %e, "Failed to handle update.");
    }
  }

  async fn on_message(&self, message: Message) -> AppResult<()> {
    if !message.chat.is_private() {
      return Ok(());
    }
    let Some(from) = message.from.as_ref() else {
      return Ok(());
    };
    let user = UserId(from.id);
    let chat = ChatId(message.chat.id);

    if let Some(command) = message.text.as_deref().and_then(Command::parse) {
      return self.on_command(user, chat, command).await;
    }

    if self.engine.catalog_entry.has_session(user) {
      let input = match (message.largest_photo(), message.text.clone()) {
        (Some(photo), _) => EntryInput::Photo(photo),
        (None, Some(text)) => EntryInput::Text(text),
        (None, None) => EntryInput::Other,
      };
      let text = match self.engine.catalog_entry.handle(user, input).await {
        Ok(reply) => replies::entry_reply(&reply),
        Err(e) => self.describe(&e).to_string(),
      };
      return self.telegram.send_message(chat, &text, None).await;
    }

    // Only buyers submit payment proofs.
    if user == self.owner {
      return self.telegram.send_message(chat, replies::NO_SESSION_HINT, None).await;
    }

    let proof = match (message.largest_photo(), message.text.clone()) {
      (Some(photo), _) => PaymentProof::Screenshot(photo),
      (None, Some(text)) if !text.trim().is_empty() => PaymentProof::Text(text.trim().to_string()),
      _ => return Ok(()),
    };
    if !self.allow(user) {
      return self.telegram.send_message(chat, replies::RATE_LIMITED, None).await;
    }
    let text = match self.engine.buyers.submit_proof(user, from.username.clone(), proof).await {
      Ok(_) => replies::PROOF_RECEIVED,
      Err(e) => self.describe(&e),
    };
    self.telegram.send_message(chat, text, None).await
  }

  #[instrument(name = "bot::command", skip_all, fields(user = %user, command = ?command))]
  async fn on_command(&self, user: UserId, chat: ChatId, command: Command) -> AppResult<()> {
    let is_admin = self.engine.catalog_entry.is_admin(user);
    let text = match command {
      Command::Start if is_admin => replies::ADMIN_HELP.to_string(),
      Command::Start => {
        if !self.allow(user) {
          replies::RATE_LIMITED.to_string()
        } else {
          return self.show_catalog(chat).await;
        }
      }
      Command::AddProduct => self.render_entry(self.engine.catalog_entry.start(user)),
      Command::ReplaceProduct(None) if is_admin => replies::REPLACE_USAGE.to_string(),
      Command::ReplaceProduct(None) => self.describe(&PaygateError::Unauthorized("replace_product".to_string())).to_string(),
      Command::ReplaceProduct(Some(product_id)) => {
        self.render_entry(self.engine.catalog_entry.start_replacement(user, &product_id).await)
      }
      Command::Cancel => replies::entry_reply(&self.engine.catalog_entry.cancel(user)),
      Command::Products => match self.engine.buyers.catalog().await {
        Ok(products) => replies::catalog_listing(&products),
        Err(e) => self.describe(&e).to_string(),
      },
      Command::Orders => match self.engine.buyers.orders(user).await {
        Ok(orders) => replies::order_listing(&orders),
        Err(e) => self.describe(&e).to_string(),
      },
      Command::Stats if is_admin => match self.stats().await {
        Ok(text) => text,
        Err(e) => self.describe(&e).to_string(),
      },
      Command::Stats => self.describe(&PaygateError::Unauthorized("stats".to_string())).to_string(),
      Command::Broadcast(None) if is_admin => replies::BROADCAST_USAGE.to_string(),
      Command::Broadcast(Some(text)) if is_admin => match self.broadcast(&text).await {
        Ok(text) => text,
        Err(e) => self.describe(&e).to_string(),
      },
      Command::Broadcast(_) => self.describe(&PaygateError::Unauthorized("broadcast".to_string())).to_string(),
      Command::Unknown(name) => {
        debug!(name = %name, "Unknown command.");
        replies::UNKNOWN_COMMAND.to_string()
      }
    };
    self.telegram.send_message(chat, &text, None).await
  }

  async fn show_catalog(&self, chat: ChatId) -> AppResult<()> {
    let products = match self.engine.buyers.catalog().await {
      Ok(products) => products,
      Err(e) => return self.telegram.send_message(chat, self.describe(&e), None).await,
    };
    if products.is_empty() {
      return self.telegram.send_message(chat, replies::EMPTY_CATALOG, None).await;
    }

    self.telegram.send_message(chat, replies::BUYER_WELCOME, None).await?;
    for product in &products {
      let keyboard = InlineKeyboardMarkup {
        inline_keyboard: vec![vec![InlineKeyboardButton::callback(
          format!("🛒 Buy for {}", product.price),
          CallbackAction::Buy(product.id.clone()).encode(),
        )]],
      };
      self
        .telegram
        .send_photo_with(chat, &product.image, &replies::product_caption(product), Some(&keyboard))
        .await?;
    }
    Ok(())
  }

  async fn stats(&self) -> PaygateResult<String> {
    let counts = self.engine.orders.state_counts().await?;
    let products = self.engine.catalog.list().await?.len();
    Ok(replies::stats(&counts, products))
  }

  /// Sends `text` to every buyer on record. Undeliverable chats are counted, not retried.
  #[instrument(name = "bot::broadcast", skip_all)]
  async fn broadcast(&self, text: &str) -> PaygateResult<String> {
    let buyers = self.engine.orders.buyers().await?;
    let mut delivered = 0;
    for buyer in &buyers {
      match self.telegram.send_message(ChatId::from(*buyer), text, None).await {
        Ok(()) => delivered += 1,
        Err(e) => debug!(buyer = %buyer, error = %e, "Broadcast not delivered."),
      }
    }
    info!(recipients = buyers.len(), delivered, "Broadcast finished.");
    self.engine.audit.record(AuditEvent::BroadcastSent {
      preview: text.chars().take(BROADCAST_PREVIEW_CHARS).collect(),
      recipients: buyers.len(),
      delivered,
    });
    Ok(replies::broadcast_done(delivered, buyers.len()))
  }

  async fn on_callback(&self, callback: CallbackQuery) -> AppResult<()> {
    let user = UserId(callback.from.id);
    let chat = callback
      .message
      .as_ref()
      .map(|m| ChatId(m.chat.id))
      .unwrap_or_else(|| ChatId::from(user));
    let action = callback.data.as_deref().and_then(CallbackAction::parse);

    // Telegram keeps the button spinning until the query is answered.
    let notice = match &action {
      Some(_) if !self.allow(user) => Some(replies::RATE_LIMITED),
      _ => None,
    };
    if let Err(e) = self.telegram.answer_callback_query(&callback.id, notice).await {
      warn!(error = %e, "Failed to answer callback query.");
    }
    if notice.is_some() {
      return Ok(());
    }

    match action {
      Some(CallbackAction::Buy(product_id)) => self.on_buy(user, chat, product_id).await,
      Some(CallbackAction::Verify(order_id)) => self.on_verify(user, chat, order_id).await,
      None => {
        warn!(user = %user, "Unrecognised callback payload.");
        Ok(())
      }
    }
  }

  #[instrument(name = "bot::buy", skip_all, fields(user = %user, product_id = %product_id))]
  async fn on_buy(&self, user: UserId, chat: ChatId, product_id: ProductId) -> AppResult<()> {
    let checkout = match self.engine.buyers.purchase(user, &product_id).await {
      Ok(checkout) => checkout,
      Err(e) => return self.telegram.send_message(chat, self.describe(&e), None).await,
    };
    let product = self.engine.buyers.product(&product_id).await?;
    let keyboard = InlineKeyboardMarkup {
      inline_keyboard: vec![
        vec![InlineKeyboardButton::link("💳 Pay", checkout.payment_url.clone())],
        vec![InlineKeyboardButton::callback(
          "✅ I've paid",
          CallbackAction::Verify(checkout.order.id).encode(),
        )],
      ],
    };
    info!(order_id = %checkout.order.id, "Checkout sent to buyer.");
    self
      .telegram
      .send_message(chat, &replies::checkout(&product, &checkout.order), Some(&keyboard))
      .await
  }

  #[instrument(name = "bot::verify", skip_all, fields(user = %user, order_id = %order_id))]
  async fn on_verify(&self, user: UserId, chat: ChatId, order_id: OrderId) -> AppResult<()> {
    let text = match self.engine.buyers.verify(user, order_id).await {
      // The provisioner already sent the invite message.
      Ok(VerifyOutcome::InviteSent(_)) => return Ok(()),
      Ok(VerifyOutcome::AwaitingPayment(_)) => replies::AWAITING_PAYMENT,
      Ok(VerifyOutcome::Failed(_)) => replies::PAYMENT_FAILED,
      Ok(VerifyOutcome::Expired(_)) => replies::ORDER_EXPIRED,
      Err(e) => self.describe(&e),
    };
    self.telegram.send_message(chat, text, None).await
  }

  async fn on_membership(&self, update: ChatMemberUpdated) -> AppResult<()> {
    let joined = matches!(update.new_chat_member.status.as_str(), "member" | "administrator");
    if !update.chat.is_group() || !joined {
      return Ok(());
    }
    let title = update.chat.title.clone().unwrap_or_else(|| "Untitled".to_string());
    info!(chat = update.chat.id, "Bot added to a group.");
    self.engine.audit.record(AuditEvent::BotAddedToGroup {
      chat: ChatId(update.chat.id),
      title: title.clone(),
    });
    self
      .telegram
      .send_message(ChatId::from(self.owner), &replies::bot_added(&title, update.chat.id), None)
      .await
  }

  fn render_entry(&self, reply: PaygateResult<EntryReply>) -> String {
    match reply {
      Ok(reply) => replies::entry_reply(&reply),
      Err(e) => self.describe(&e).to_string(),
    }
  }

  /// The admin is never throttled.
  fn allow(&self, user: UserId) -> bool {
    user == self.owner || self.engine.rate_limiter.allow(user)
  }

  fn describe(&self, err: &PaygateError) -> &'static str {
    match err {
      PaygateError::Storage { .. } | PaygateError::Validation(_) | PaygateError::MalformedPayload(_) => {
        error!(error = %err, "Engine error while handling a chat update.");
      }
      _ => debug!(error = %err, "Reporting engine error to user."),
    }
    replies::user_error(err)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::bot::test_support::*;
  use paygate::EntryStep;

  const OTHER_BUYER: UserId = UserId(8);

  #[tokio::test]
  async fn start_is_throttled_for_buyers_but_not_the_admin() {
    let h = bot_harness();
    h.add_product("Members Club", "99").await;
    let buyer_chat = ChatId::from(BUYER);

    h.dispatcher.dispatch(text_update(BUYER, "/start")).await;
    assert_eq!(h.bot.texts_to(buyer_chat), vec![replies::BUYER_WELCOME.to_string()]);
    assert_eq!(h.bot.photos.lock().len(), 1);

    h.dispatcher.dispatch(text_update(BUYER, "/start")).await;
    assert_eq!(h.bot.last_text_to(buyer_chat).as_deref(), Some(replies::RATE_LIMITED));
    assert_eq!(h.bot.photos.lock().len(), 1);

    for _ in 0..3 {
      h.dispatcher.dispatch(text_update(OWNER, "/start")).await;
      assert_eq!(h.bot.last_text_to(ChatId::from(OWNER)).as_deref(), Some(replies::ADMIN_HELP));
    }
  }

  #[tokio::test]
  async fn buy_verify_and_proofs_share_one_throttle() {
    let h = bot_harness();
    let product = h.add_product("Members Club", "99").await;
    let buyer_chat = ChatId::from(BUYER);

    h.dispatcher.dispatch(callback_update(BUYER, "cb1", &format!("buy:{}", product.id))).await;
    assert!(h.bot.last_text_to(buyer_chat).unwrap().starts_with("🧾 Order created"));
    let order_id = h.engine.buyers.orders(BUYER).await.unwrap()[0].id;

    h.dispatcher.dispatch(callback_update(BUYER, "cb2", &format!("verify:{}", order_id))).await;
    let answered = h.bot.answered.lock().clone();
    assert_eq!(answered[0], ("cb1".to_string(), None));
    assert_eq!(answered[1], ("cb2".to_string(), Some(replies::RATE_LIMITED.to_string())));

    h.dispatcher.dispatch(text_update(BUYER, "UTR 123456789012")).await;
    assert_eq!(h.bot.last_text_to(buyer_chat).as_deref(), Some(replies::RATE_LIMITED));
    assert_eq!(h.audit.count("payment_proof_submitted"), 0);
  }

  #[tokio::test]
  async fn buyer_proof_is_forwarded_once_allowed() {
    let h = bot_harness();
    h.dispatcher.dispatch(photo_update(BUYER, "receipt")).await;
    assert_eq!(h.bot.last_text_to(ChatId::from(BUYER)).as_deref(), Some(replies::PROOF_RECEIVED));
    assert_eq!(h.audit.count("payment_proof_submitted"), 1);
  }

  #[tokio::test]
  async fn admin_commands_are_refused_to_buyers() {
    let h = bot_harness();
    let product = h.add_product("Members Club", "99").await;
    let unauthorized = replies::user_error(&PaygateError::Unauthorized(String::new()));

    for command in [
      "/stats".to_string(),
      "/replace_product".to_string(),
      format!("/replace_product {}", product.id),
      "/broadcast hello".to_string(),
      "/add_product".to_string(),
    ] {
      h.dispatcher.dispatch(text_update(BUYER, &command)).await;
      assert_eq!(h.bot.last_text_to(ChatId::from(BUYER)).as_deref(), Some(unauthorized), "{}", command);
    }
    assert!(!h.engine.catalog_entry.has_session(BUYER));
    assert_eq!(h.audit.count("broadcast_sent"), 0);

    h.dispatcher.dispatch(text_update(OWNER, "/stats")).await;
    assert!(h.bot.last_text_to(ChatId::from(OWNER)).unwrap().starts_with("📊 Stats"));
  }

  #[tokio::test]
  async fn session_input_goes_to_the_entry_flow() {
    let h = bot_harness();
    h.dispatcher.dispatch(text_update(OWNER, "/add_product")).await;
    h.dispatcher.dispatch(text_update(OWNER, "Members Club")).await;
    assert_eq!(h.engine.catalog_entry.current_step(OWNER), Some(EntryStep::Image));

    h.dispatcher.dispatch(photo_update(OWNER, "cover")).await;
    assert_eq!(h.engine.catalog_entry.current_step(OWNER), Some(EntryStep::Price));
    assert!(h.bot.last_text_to(ChatId::from(OWNER)).unwrap().starts_with("Step 3/4"));
    assert_eq!(h.audit.count("payment_proof_submitted"), 0);
  }

  #[tokio::test]
  async fn admin_input_outside_a_session_is_not_a_proof() {
    let h = bot_harness();
    h.dispatcher.dispatch(photo_update(OWNER, "screenshot")).await;
    h.dispatcher.dispatch(text_update(OWNER, "just chatting")).await;
    assert_eq!(h.audit.count("payment_proof_submitted"), 0);
    assert_eq!(
      h.bot.texts_to(ChatId::from(OWNER)),
      vec![replies::NO_SESSION_HINT.to_string(), replies::NO_SESSION_HINT.to_string()]
    );
  }

  #[tokio::test]
  async fn callbacks_are_always_answered() {
    let h = bot_harness();
    h.dispatcher.dispatch(callback_update(BUYER, "garbage", "refund:prod_1")).await;
    h.dispatcher.dispatch(callback_update(OTHER_BUYER, "missing", "buy:prod_404")).await;
    h.dispatcher.dispatch(callback_update(OTHER_BUYER, "throttled", "buy:prod_404")).await;

    let ids: Vec<String> = h.bot.answered.lock().iter().map(|(id, _)| id.clone()).collect();
    assert_eq!(ids, vec!["garbage", "missing", "throttled"]);
    assert_eq!(
      h.bot.texts_to(ChatId::from(OTHER_BUYER)),
      vec![replies::user_error(&PaygateError::ProductNotFound(paygate::ProductId::new("prod_404"))).to_string()]
    );
  }

  #[tokio::test]
  async fn broadcast_reaches_every_reachable_buyer() {
    let h = bot_harness();
    let product = h.add_product("Members Club", "99").await;
    h.engine.buyers.purchase(BUYER, &product.id).await.unwrap();
    h.engine.buyers.purchase(OTHER_BUYER, &product.id).await.unwrap();
    h.engine.buyers.purchase(BUYER, &product.id).await.unwrap();
    h.bot.unreachable.lock().insert(ChatId::from(OTHER_BUYER));

    h.dispatcher.dispatch(text_update(OWNER, "/broadcast")).await;
    assert_eq!(h.bot.last_text_to(ChatId::from(OWNER)).as_deref(), Some(replies::BROADCAST_USAGE));

    h.dispatcher.dispatch(text_update(OWNER, "/broadcast New drop tonight!")).await;
    assert_eq!(h.bot.texts_to(ChatId::from(BUYER)), vec!["New drop tonight!".to_string()]);
    assert_eq!(
      h.bot.last_text_to(ChatId::from(OWNER)),
      Some(replies::broadcast_done(1, 2))
    );
    assert_eq!(h.audit.count("broadcast_sent"), 1);
  }
}
