// paygate/server/src/web/routes.rs

use actix_web::web;

use crate::web::handlers::{telegram_handlers, webhook_handlers};

async fn health_check_handler() -> actix_web::HttpResponse {
  actix_web::HttpResponse::Ok().json(serde_json::json!({ "status": "ok" }))
}

pub fn configure_app_routes(cfg: &mut web::ServiceConfig) {
  cfg
    .service(
      web::scope("/api/v1")
        .route("/health", web::get().to(health_check_handler))
        .service(
          web::scope("/webhooks").route("/payment", web::post().to(webhook_handlers::payment_webhook_handler)),
        ),
    )
    .route("/telegram/updates", web::post().to(telegram_handlers::telegram_update_handler));
}
