// paygate/server/src/config.rs

use crate::errors::{AppError, Result};
use dotenvy::dotenv;
use paygate::{ChatId, EngineSettings, UserId};
use std::env;
use std::fmt;
use std::time::Duration;

pub const DEFAULT_ZAPUPI_BASE_URL: &str = "https://api.zapupi.com/api";

#[derive(Clone)]
pub struct AppConfig {
  pub bot_token: String,
  pub owner_id: UserId,
  pub zapupi_api_key: String,
  pub zapupi_secret: String,
  pub zapupi_base_url: String,
  pub payment_redirect_url: Option<String>,
  pub paid_group_id: ChatId,
  pub log_channel_id: ChatId,

  /// Telegram webhook mode when set; long polling otherwise.
  pub public_url: Option<String>,
  pub server_host: String,
  pub server_port: u16,
  /// PostgreSQL repositories when set; in-memory otherwise.
  pub database_url: Option<String>,

  pub order_ttl: Duration,
  pub session_idle_timeout: Duration,
  pub rate_limit_interval: Duration,
  pub sweep_interval: Duration,
}

impl AppConfig {
  pub fn from_env() -> Result<Self> {
    dotenv().ok(); // Load .env file if present
    Self::from_lookup(|name| env::var(name).ok())
  }

  /// Builds the config from any variable source. `lookup` returns `None` for unset keys.
  pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
    let get_env = |var_name: &str| {
      lookup(var_name)
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .ok_or_else(|| AppError::Config(format!("Missing environment variable '{}'", var_name)))
    };
    let optional = |var_name: &str| get_env(var_name).ok();
    let parse_i64 = |var_name: &str| -> Result<i64> {
      get_env(var_name)?
        .parse::<i64>()
        .map_err(|e| AppError::Config(format!("Invalid {}: {}", var_name, e)))
    };
    let parse_u64_or = |var_name: &str, default: u64| -> Result<u64> {
      match optional(var_name) {
        Some(raw) => raw
          .parse::<u64>()
          .map_err(|e| AppError::Config(format!("Invalid {}: {}", var_name, e))),
        None => Ok(default),
      }
    };

    let bot_token = get_env("BOT_TOKEN")?;
    let owner_id = UserId(parse_i64("OWNER_ID")?);
    let zapupi_api_key = get_env("ZAPUPI_API_KEY")?;
    let zapupi_secret = get_env("ZAPUPI_SECRET")?;
    let paid_group_id = ChatId(parse_i64("PAID_GROUP_ID")?);
    let log_channel_id = ChatId(parse_i64("LOG_CHANNEL_ID")?);

    let zapupi_base_url = optional("ZAPUPI_BASE_URL")
      .unwrap_or_else(|| DEFAULT_ZAPUPI_BASE_URL.to_string())
      .trim_end_matches('/')
      .to_string();
    let payment_redirect_url = optional("PAYMENT_REDIRECT_URL");
    let public_url = optional("PUBLIC_URL").map(|url| url.trim_end_matches('/').to_string());

    let server_host = optional("SERVER_HOST").unwrap_or_else(|| "127.0.0.1".to_string());
    let server_port = optional("SERVER_PORT")
      .unwrap_or_else(|| "8080".to_string())
      .parse::<u16>()
      .map_err(|e| AppError::Config(format!("Invalid SERVER_PORT: {}", e)))?;
    let database_url = optional("DATABASE_URL");

    let order_ttl = Duration::from_secs(parse_u64_or("ORDER_TTL_SECS", 3600)?);
    let session_idle_timeout = Duration::from_secs(parse_u64_or("SESSION_IDLE_SECS", 900)?);
    let rate_limit_interval = Duration::from_millis(parse_u64_or("RATE_LIMIT_MILLIS", 2000)?);
    let sweep_interval = Duration::from_secs(parse_u64_or("SWEEP_INTERVAL_SECS", 60)?.max(1));

    tracing::info!("Application configuration loaded successfully.");

    Ok(Self {
      bot_token,
      owner_id,
      zapupi_api_key,
      zapupi_secret,
      zapupi_base_url,
      payment_redirect_url,
      paid_group_id,
      log_channel_id,
      public_url,
      server_host,
      server_port,
      database_url,
      order_ttl,
      session_idle_timeout,
      rate_limit_interval,
      sweep_interval,
    })
  }

  pub fn engine_settings(&self) -> EngineSettings {
    EngineSettings {
      order_ttl: self.order_ttl,
      session_idle_timeout: self.session_idle_timeout,
      rate_limit_interval: self.rate_limit_interval,
      ..EngineSettings::default()
    }
  }
}

impl fmt::Debug for AppConfig {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("AppConfig")
      .field("bot_token", &"[REDACTED]")
      .field("owner_id", &self.owner_id)
      .field("zapupi_api_key", &"[REDACTED]")
      .field("zapupi_secret", &"[REDACTED]")
      .field("zapupi_base_url", &self.zapupi_base_url)
      .field("paid_group_id", &self.paid_group_id)
      .field("log_channel_id", &self.log_channel_id)
      .field("public_url", &self.public_url)
      .field("server_host", &self.server_host)
      .field("server_port", &self.server_port)
      .field("database_url", &self.database_url.as_ref().map(|_| "[REDACTED]"))
      .finish_non_exhaustive()
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use std::collections::HashMap;

  fn required() -> HashMap<&'static str, &'static str> {
    HashMap::from([
      ("BOT_TOKEN", "123:abc"),
      ("OWNER_ID", "42"),
      ("ZAPUPI_API_KEY", "key"),
      ("ZAPUPI_SECRET", "secret"),
      ("PAID_GROUP_ID", "-100123"),
      ("LOG_CHANNEL_ID", "-100456"),
    ])
  }

  fn load(vars: &HashMap<&'static str, &'static str>) -> Result<AppConfig> {
    AppConfig::from_lookup(|name| vars.get(name).map(|v| v.to_string()))
  }

  #[test]
  fn defaults_apply_when_optional_keys_are_unset() {
    let config = load(&required()).unwrap();
    assert_eq!(config.owner_id, UserId(42));
    assert_eq!(config.paid_group_id, ChatId(-100123));
    assert_eq!(config.zapupi_base_url, DEFAULT_ZAPUPI_BASE_URL);
    assert_eq!(config.server_port, 8080);
    assert_eq!(config.order_ttl, Duration::from_secs(3600));
    assert_eq!(config.rate_limit_interval, Duration::from_millis(2000));
    assert!(config.database_url.is_none());
    assert!(config.public_url.is_none());
  }

  #[test]
  fn every_required_key_is_fatal_when_missing() {
    for key in required().keys() {
      let mut vars = required();
      vars.remove(key);
      match load(&vars) {
        Err(AppError::Config(msg)) => assert!(msg.contains(key), "{}", msg),
        other => panic!("Expected Config error for {}, got {:?}", key, other.map(|_| ())),
      }
    }
  }

  #[test]
  fn bad_numbers_are_rejected() {
    let mut vars = required();
    vars.insert("OWNER_ID", "not-a-number");
    assert!(matches!(load(&vars), Err(AppError::Config(_))));

    let mut vars = required();
    vars.insert("SERVER_PORT", "99999");
    assert!(matches!(load(&vars), Err(AppError::Config(_))));
  }

  #[test]
  fn debug_output_redacts_secrets() {
    let config = load(&required()).unwrap();
    let rendered = format!("{:?}", config);
    assert!(!rendered.contains("123:abc"));
    assert!(!rendered.contains("secret\""));
  }
}
