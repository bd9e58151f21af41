// paygate/server/src/services/telegram.rs

//! Minimal Telegram Bot API client: the update types the bot reads and the methods it calls.

use async_trait::async_trait;
use paygate::{ChatId, ChatTransport, Invitation, MediaRef, PaygateError, PaygateResult};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::time::Duration;
use tracing::{debug, instrument};

use crate::errors::{AppError, Result as AppResult};

const API_BASE: &str = "https://api.telegram.org";

// --- Inbound types ---

#[derive(Debug, Clone, Deserialize)]
pub struct Update {
  pub update_id: i64,
  #[serde(default)]
  pub message: Option<Message>,
  #[serde(default)]
  pub callback_query: Option<CallbackQuery>,
  #[serde(default)]
  pub my_chat_member: Option<ChatMemberUpdated>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Message {
  #[serde(default)]
  pub from: Option<User>,
  pub chat: Chat,
  #[serde(default)]
  pub text: Option<String>,
  #[serde(default)]
  pub photo: Option<Vec<PhotoSize>>,
}

impl Message {
  /// The largest rendition's file id.
  pub fn largest_photo(&self) -> Option<MediaRef> {
    self
      .photo
      .as_ref()
      .and_then(|sizes| sizes.iter().max_by_key(|p| p.width * p.height))
      .map(|p| MediaRef::new(p.file_id.clone()))
  }
}

#[derive(Debug, Clone, Deserialize)]
pub struct User {
  pub id: i64,
  #[serde(default)]
  pub username: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Chat {
  pub id: i64,
  #[serde(rename = "type")]
  pub kind: String,
  #[serde(default)]
  pub title: Option<String>,
}

impl Chat {
  pub fn is_private(&self) -> bool {
    self.kind == "private"
  }

  pub fn is_group(&self) -> bool {
    matches!(self.kind.as_str(), "group" | "supergroup")
  }
}

#[derive(Debug, Clone, Deserialize)]
pub struct PhotoSize {
  pub file_id: String,
  #[serde(default)]
  pub width: i64,
  #[serde(default)]
  pub height: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CallbackQuery {
  pub id: String,
  pub from: User,
  #[serde(default)]
  pub data: Option<String>,
  #[serde(default)]
  pub message: Option<Message>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChatMemberUpdated {
  pub chat: Chat,
  pub new_chat_member: ChatMember,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChatMember {
  pub status: String,
}

// --- Outbound types ---

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct InlineKeyboardMarkup {
  pub inline_keyboard: Vec<Vec<InlineKeyboardButton>>,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct InlineKeyboardButton {
  pub text: String,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub callback_data: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub url: Option<String>,
}

impl InlineKeyboardButton {
  pub fn callback(text: impl Into<String>, data: impl Into<String>) -> Self {
    Self {
      text: text.into(),
      callback_data: Some(data.into()),
      url: None,
    }
  }

  pub fn link(text: impl Into<String>, url: impl Into<String>) -> Self {
    Self {
      text: text.into(),
      callback_data: None,
      url: Some(url.into()),
    }
  }
}

#[derive(Debug, Deserialize)]
struct ApiResponse<T> {
  ok: bool,
  #[serde(default = "Option::default")]
  result: Option<T>,
  #[serde(default)]
  description: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChatInviteLink {
  invite_link: String,
}

/// The Bot API calls made while answering updates.
#[async_trait]
pub trait BotApi: Send + Sync {
  async fn send_message(&self, chat: ChatId, text: &str, keyboard: Option<&InlineKeyboardMarkup>) -> AppResult<()>;

  async fn send_photo_with(
    &self,
    chat: ChatId,
    photo: &MediaRef,
    caption: &str,
    keyboard: Option<&InlineKeyboardMarkup>,
  ) -> AppResult<()>;

  /// Stops the button's loading spinner, optionally showing `text` as a toast.
  async fn answer_callback_query(&self, callback_id: &str, text: Option<&str>) -> AppResult<()>;
}

// --- Client ---

pub struct TelegramClient {
  http: reqwest::Client,
  /// `https://api.telegram.org/bot<token>`; never logged.
  endpoint: String,
}

impl TelegramClient {
  pub fn new(bot_token: &str) -> Result<Self, reqwest::Error> {
    // Long polling holds requests open for up to 30s.
    let http = reqwest::Client::builder().timeout(Duration::from_secs(45)).build()?;
    Ok(Self {
      http,
      endpoint: format!("{}/bot{}", API_BASE, bot_token),
    })
  }

  async fn call<T: DeserializeOwned>(&self, method: &str, params: serde_json::Value) -> AppResult<T> {
    let response: ApiResponse<T> = self
      .http
      .post(format!("{}/{}", self.endpoint, method))
      .json(&params)
      .send()
      .await?
      .json()
      .await?;
    match (response.ok, response.result) {
      (true, Some(result)) => Ok(result),
      _ => Err(AppError::Telegram(format!(
        "{} failed: {}",
        method,
        response.description.unwrap_or_else(|| "no description".to_string())
      ))),
    }
  }

  pub async fn get_updates(&self, offset: i64, timeout_secs: u64) -> AppResult<Vec<Update>> {
    self
      .call(
        "getUpdates",
        json!({
          "offset": offset,
          "timeout": timeout_secs,
          "allowed_updates": ["message", "callback_query", "my_chat_member"],
        }),
      )
      .await
  }

  pub async fn set_webhook(&self, url: &str, secret_token: &str) -> AppResult<()> {
    let _: bool = self
      .call(
        "setWebhook",
        json!({
          "url": url,
          "secret_token": secret_token,
          "allowed_updates": ["message", "callback_query", "my_chat_member"],
        }),
      )
      .await?;
    Ok(())
  }

  pub async fn delete_webhook(&self) -> AppResult<()> {
    let _: bool = self.call("deleteWebhook", json!({})).await?;
    Ok(())
  }
}

#[async_trait]
impl BotApi for TelegramClient {
  async fn send_message(&self, chat: ChatId, text: &str, keyboard: Option<&InlineKeyboardMarkup>) -> AppResult<()> {
    let mut params = json!({ "chat_id": chat.0, "text": text, "disable_web_page_preview": true });
    if let Some(keyboard) = keyboard {
      params["reply_markup"] = serde_json::to_value(keyboard).map_err(|e| AppError::Internal(e.to_string()))?;
    }
    let _: serde_json::Value = self.call("sendMessage", params).await?;
    Ok(())
  }

  async fn send_photo_with(
    &self,
    chat: ChatId,
    photo: &MediaRef,
    caption: &str,
    keyboard: Option<&InlineKeyboardMarkup>,
  ) -> AppResult<()> {
    let mut params = json!({ "chat_id": chat.0, "photo": photo.as_str(), "caption": caption });
    if let Some(keyboard) = keyboard {
      params["reply_markup"] = serde_json::to_value(keyboard).map_err(|e| AppError::Internal(e.to_string()))?;
    }
    let _: serde_json::Value = self.call("sendPhoto", params).await?;
    Ok(())
  }

  async fn answer_callback_query(&self, callback_id: &str, text: Option<&str>) -> AppResult<()> {
    let mut params = json!({ "callback_query_id": callback_id });
    if let Some(text) = text {
      params["text"] = json!(text);
    }
    let _: bool = self.call("answerCallbackQuery", params).await?;
    Ok(())
  }
}

fn delivery(err: AppError) -> PaygateError {
  PaygateError::Delivery(err.to_string())
}

#[async_trait]
impl ChatTransport for TelegramClient {
  async fn send_text(&self, chat: ChatId, text: &str) -> PaygateResult<()> {
    self.send_message(chat, text, None).await.map_err(delivery)
  }

  async fn send_photo(&self, chat: ChatId, photo: &MediaRef, caption: &str) -> PaygateResult<()> {
    self.send_photo_with(chat, photo, caption, None).await.map_err(delivery)
  }

  #[instrument(name = "telegram::create_invite_link", skip_all, fields(order_id = %invitation.order_id))]
  async fn create_invite_link(&self, group: ChatId, invitation: &Invitation) -> PaygateResult<String> {
    let name: String = format!("order {}", invitation.order_id).chars().take(32).collect();
    let link: ChatInviteLink = self
      .call(
        "createChatInviteLink",
        json!({
          "chat_id": group.0,
          "name": name,
          "member_limit": invitation.max_uses,
          "expire_date": invitation.expires_at.timestamp(),
        }),
      )
      .await
      .map_err(delivery)?;
    debug!("Invite link created.");
    Ok(link.invite_link)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn parses_a_photo_message_update() {
    let raw = r#"{
      "update_id": 10,
      "message": {
        "message_id": 5,
        "from": {"id": 42, "is_bot": false, "first_name": "Asha", "username": "asha"},
        "chat": {"id": 42, "type": "private"},
        "photo": [
          {"file_id": "small", "width": 90, "height": 90},
          {"file_id": "large", "width": 1280, "height": 960}
        ]
      }
    }"#;
    let update: Update = serde_json::from_str(raw).unwrap();
    let message = update.message.unwrap();
    assert!(message.chat.is_private());
    assert_eq!(message.largest_photo().unwrap().as_str(), "large");
    assert_eq!(message.from.unwrap().username.as_deref(), Some("asha"));
  }

  #[test]
  fn parses_callback_and_membership_updates() {
    let raw = r#"{"update_id": 11, "callback_query": {"id": "cb1", "from": {"id": 7, "first_name": "B"}, "data": "buy:prod_1"}}"#;
    let update: Update = serde_json::from_str(raw).unwrap();
    assert_eq!(update.callback_query.unwrap().data.as_deref(), Some("buy:prod_1"));

    let raw = r#"{"update_id": 12, "my_chat_member": {
      "chat": {"id": -100, "type": "supergroup", "title": "Paid"},
      "from": {"id": 1, "first_name": "Owner"},
      "new_chat_member": {"status": "administrator", "user": {"id": 99, "first_name": "bot"}}
    }}"#;
    let update: Update = serde_json::from_str(raw).unwrap();
    let member = update.my_chat_member.unwrap();
    assert!(member.chat.is_group());
    assert_eq!(member.new_chat_member.status, "administrator");
  }

  #[test]
  fn keyboard_omits_unset_fields() {
    let keyboard = InlineKeyboardMarkup {
      inline_keyboard: vec![vec![
        InlineKeyboardButton::link("💳 Pay", "https://pay.example"),
        InlineKeyboardButton::callback("✅ I've paid", "verify:abc"),
      ]],
    };
    let value = serde_json::to_value(&keyboard).unwrap();
    assert_eq!(
      value,
      json!({"inline_keyboard": [[
        {"text": "💳 Pay", "url": "https://pay.example"},
        {"text": "✅ I've paid", "callback_data": "verify:abc"}
      ]]})
    );
  }
}
