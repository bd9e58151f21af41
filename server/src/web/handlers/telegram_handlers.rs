// paygate/server/src/web/handlers/telegram_handlers.rs

use actix_web::{web, HttpRequest, HttpResponse};
use serde_json::json;
use subtle::ConstantTimeEq;
use tracing::{debug, error, instrument, warn};

use crate::services::telegram::Update;
use crate::state::AppState;

pub const TELEGRAM_SECRET_HEADER: &str = "X-Telegram-Bot-Api-Secret-Token";

fn secret_matches(provided: Option<&str>, expected: &str) -> bool {
  provided.is_some_and(|provided| bool::from(provided.as_bytes().ct_eq(expected.as_bytes())))
}

/// Telegram webhook updates. The update is queued for the ordered worker and acknowledged
/// without waiting for it to be handled.
#[instrument(name = "handler::telegram_update", skip_all)]
pub async fn telegram_update_handler(app_state: web::Data<AppState>, req: HttpRequest, body: web::Bytes) -> HttpResponse {
  let Some(expected) = app_state.telegram_secret.as_deref() else {
    return HttpResponse::NotFound().finish();
  };
  let provided = req.headers().get(TELEGRAM_SECRET_HEADER).and_then(|h| h.to_str().ok());
  if !secret_matches(provided, expected) {
    warn!("Rejected Telegram update with a wrong secret token.");
    return HttpResponse::Unauthorized().json(json!({ "error": "unauthorized" }));
  }

  let update: Update = match serde_json::from_slice(&body) {
    Ok(update) => update,
    Err(e) => {
      // Telegram would redeliver a rejected update forever.
      warn!(error = %e, "Unreadable Telegram update dropped.");
      return HttpResponse::Ok().finish();
    }
  };

  debug!(update_id = update.update_id, "Telegram update accepted.");
  if let Err(e) = app_state.updates.push(update).await {
    // A non-2xx makes Telegram redeliver once the worker is back.
    error!(error = %e, "Could not queue Telegram update.");
    return HttpResponse::ServiceUnavailable().finish();
  }
  HttpResponse::Ok().finish()
}
