// paygate/server/src/main.rs

mod bot;
mod config;
mod db;
mod errors;
mod models;
mod services;
mod state;
mod web;

use crate::bot::Dispatcher;
use crate::config::AppConfig;
use crate::db::{PgCatalogRepository, PgOrderRepository};
use crate::errors::{AppError, Result as AppResult};
use crate::services::{TelegramClient, ZapupiGateway};
use crate::state::AppState;

use actix_web::{web as actix_data, App, HttpServer};
use chrono::Utc;
use paygate::{
  CatalogRepository, ChannelAuditSink, ChatTransport, InMemoryCatalogRepository, InMemoryOrderRepository,
  OrderRepository, Paygate, PaygateDeps, SignatureVerifier,
};
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use tokio::sync::watch;
use tokio::time::MissedTickBehavior;
use tracing::{error, info, warn};
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::EnvFilter;

/// Telegram updates waiting for the dispatcher before pushes start to wait.
const UPDATE_BUFFER: usize = 256;

#[actix_web::main]
async fn main() -> std::io::Result<()> {
  tracing_subscriber::fmt()
    .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
    .with_span_events(FmtSpan::CLOSE)
    .init();

  tracing::info!("Starting paygate server...");

  let app_config = match AppConfig::from_env() {
    Ok(cfg) => Arc::new(cfg),
    Err(e) => {
      error!(error = %e, "Failed to load application configuration.");
      return Err(std::io::Error::other(e.to_string()));
    }
  };

  if let Err(e) = run(app_config).await {
    error!(error = %e, "Server stopped with an error.");
    return Err(std::io::Error::other(e.to_string()));
  }
  Ok(())
}

async fn repositories(config: &AppConfig) -> AppResult<(Arc<dyn OrderRepository>, Arc<dyn CatalogRepository>)> {
  let Some(database_url) = config.database_url.as_deref() else {
    warn!("DATABASE_URL is not set; orders and products live in memory and are lost on restart.");
    return Ok((
      Arc::new(InMemoryOrderRepository::new()),
      Arc::new(InMemoryCatalogRepository::new()),
    ));
  };

  let pool = PgPoolOptions::new().max_connections(10).connect(database_url).await?;
  info!("Successfully connected to the database.");
  db::schema::bootstrap(&pool).await?;
  Ok((
    Arc::new(PgOrderRepository::new(pool.clone())),
    Arc::new(PgCatalogRepository::new(pool)),
  ))
}

async fn run(config: Arc<AppConfig>) -> AppResult<()> {
  let settings = config.engine_settings();
  let (orders, catalog) = repositories(&config).await?;

  let telegram = Arc::new(TelegramClient::new(&config.bot_token)?);
  let transport: Arc<dyn ChatTransport> = telegram.clone();
  let (audit, audit_task) = ChannelAuditSink::spawn(transport.clone(), config.log_channel_id, settings.audit_buffer);
  let gateway = ZapupiGateway::new(
    config.zapupi_base_url.clone(),
    config.zapupi_api_key.clone(),
    config.zapupi_secret.clone(),
    config.payment_redirect_url.clone(),
  )?;

  let engine = Paygate::new(
    PaygateDeps {
      orders,
      catalog,
      transport,
      gateway: Arc::new(gateway),
      audit: Arc::new(audit),
      verifier: SignatureVerifier::new(&config.zapupi_secret)?,
      admin: config.owner_id,
      group: config.paid_group_id,
    },
    settings,
  );
  let dispatcher = Arc::new(Dispatcher::new(engine.clone(), telegram.clone(), config.owner_id));
  let (updates, update_worker) = bot::spawn_update_worker(dispatcher, UPDATE_BUFFER);

  let sweeper = {
    let engine = engine.clone();
    let mut ticker = tokio::time::interval(config.sweep_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    tokio::spawn(async move {
      loop {
        ticker.tick().await;
        match engine.sweep(Utc::now()).await {
          Ok(report) if report.expired_orders > 0 => info!(expired = report.expired_orders, "Expired stale orders."),
          Ok(_) => {}
          Err(e) => warn!(error = %e, "Sweep failed; retrying next tick."),
        }
      }
    })
  };

  let (shutdown_tx, shutdown_rx) = watch::channel(false);
  let telegram_secret = match config.public_url.as_deref() {
    Some(public_url) => {
      let secret = uuid::Uuid::new_v4().simple().to_string();
      telegram
        .set_webhook(&format!("{}/telegram/updates", public_url), &secret)
        .await?;
      info!("Telegram webhook registered.");
      Some(secret)
    }
    None => None,
  };
  let poller = telegram_secret
    .is_none()
    .then(|| tokio::spawn(bot::run_polling(telegram.clone(), updates.clone(), shutdown_rx)));

  let app_state = AppState {
    engine,
    updates,
    telegram_secret,
  };

  let server_address = format!("{}:{}", config.server_host, config.server_port);
  tracing::info!("Attempting to bind server to {}...", server_address);

  let served = HttpServer::new(move || {
    App::new()
      .app_data(actix_data::Data::new(app_state.clone()))
      .wrap(tracing_actix_web::TracingLogger::default())
      .configure(web::configure_app_routes)
  })
  .bind(&server_address)
  .map_err(|e| AppError::Internal(format!("Failed to bind {}: {}", server_address, e)))?
  .run()
  .await
  .map_err(|e| AppError::Internal(e.to_string()));

  info!("HTTP server stopped; shutting down background tasks.");
  let _ = shutdown_tx.send(true);
  if let Some(poller) = poller {
    if let Err(e) = poller.await {
      warn!(error = %e, "Polling task ended abnormally.");
    }
  }
  sweeper.abort();
  update_worker.abort();
  audit_task.abort();
  served
}
