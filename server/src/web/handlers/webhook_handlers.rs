// paygate/server/src/web/handlers/webhook_handlers.rs

use actix_web::{web, HttpRequest, HttpResponse};
use paygate::WebhookOutcome;
use serde_json::json;
use tracing::{info, instrument};

use crate::errors::AppError;
use crate::state::AppState;

pub const SIGNATURE_HEADER: &str = "X-Zapupi-Signature";

/// Payment gateway notifications. Anything authenticated is acknowledged with 200 so the
/// gateway stops retrying; storage failures answer 500 so it tries again.
#[instrument(name = "handler::payment_webhook", skip_all, fields(body_len = body.len()))]
pub async fn payment_webhook_handler(
  app_state: web::Data<AppState>,
  req: HttpRequest,
  body: web::Bytes,
) -> Result<HttpResponse, AppError> {
  let signature = req.headers().get(SIGNATURE_HEADER).and_then(|h| h.to_str().ok());

  match app_state.engine.webhooks.ingest(&body, signature).await? {
    WebhookOutcome::Applied(report) => info!(
      order_id = %report.transition.order.id,
      state = %report.transition.order.state.as_str(),
      changed = report.transition.changed,
      "Payment notification applied."
    ),
    WebhookOutcome::IgnoredStatus { status } => info!(status = %status, "Payment notification acknowledged without effect."),
    WebhookOutcome::UnknownOrder { .. } => info!("Payment notification for an unknown order acknowledged."),
  }

  Ok(HttpResponse::Ok().json(json!({ "status": "ok" })))
}
