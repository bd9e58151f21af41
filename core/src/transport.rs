// paygate/src/transport.rs

//! The narrow slice of the chat transport the engine depends on.

use async_trait::async_trait;

use crate::domain::ids::{ChatId, MediaRef};
use crate::domain::invitation::Invitation;
use crate::error::PaygateResult;

#[async_trait]
pub trait ChatTransport: Send + Sync {
  async fn send_text(&self, chat: ChatId, text: &str) -> PaygateResult<()>;

  async fn send_photo(&self, chat: ChatId, photo: &MediaRef, caption: &str) -> PaygateResult<()>;

  /// Creates the remote invite link for `invitation` in `group`, honouring its
  /// `max_uses` and `expires_at`, and returns the link URL.
  async fn create_invite_link(&self, group: ChatId, invitation: &Invitation) -> PaygateResult<String>;
}
