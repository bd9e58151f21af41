// paygate/server/src/services/zapupi.rs

use async_trait::async_trait;
use paygate::payment::event_for_status;
use paygate::{Amount, CreateOrderResponse, GatewayCheckout, GatewayReference, OrderEvent, PaygateError, PaygateResult, PaymentGateway};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{info, instrument, warn};

#[derive(Serialize)]
struct CreateOrderForm<'a> {
  token_key: &'a str,
  secret_key: &'a str,
  amount: String,
  order_id: &'a str,
  #[serde(skip_serializing_if = "Option::is_none")]
  redirect_url: Option<&'a str>,
}

#[derive(Serialize)]
struct OrderStatusForm<'a> {
  token_key: &'a str,
  secret_key: &'a str,
  order_id: &'a str,
}

#[derive(Debug, Deserialize)]
struct OrderStatusResponse {
  status: String,
  #[serde(default)]
  data: Option<OrderStatusData>,
}

#[derive(Debug, Deserialize)]
struct OrderStatusData {
  #[serde(default)]
  status: Option<String>,
}

/// Zapupi UPI gateway client.
pub struct ZapupiGateway {
  http: reqwest::Client,
  base_url: String,
  api_key: String,
  secret: String,
  redirect_url: Option<String>,
}

impl ZapupiGateway {
  pub fn new(base_url: String, api_key: String, secret: String, redirect_url: Option<String>) -> Result<Self, reqwest::Error> {
    let http = reqwest::Client::builder().timeout(Duration::from_secs(15)).build()?;
    Ok(Self {
      http,
      base_url,
      api_key,
      secret,
      redirect_url,
    })
  }

  fn gateway_error(context: &str, err: reqwest::Error) -> PaygateError {
    PaygateError::Gateway(format!("{}: {}", context, err.without_url()))
  }
}

#[async_trait]
impl PaymentGateway for ZapupiGateway {
  #[instrument(name = "zapupi::create_order", skip_all, fields(reference = %reference, amount = %amount))]
  async fn create_order(&self, amount: Amount, reference: &GatewayReference) -> PaygateResult<GatewayCheckout> {
    let form = CreateOrderForm {
      token_key: &self.api_key,
      secret_key: &self.secret,
      amount: amount.to_decimal_string(),
      order_id: reference.as_str(),
      redirect_url: self.redirect_url.as_deref(),
    };

    let response = self
      .http
      .post(format!("{}/create-order", self.base_url))
      .form(&form)
      .send()
      .await
      .map_err(|e| Self::gateway_error("create-order request failed", e))?;

    let http_status = response.status();
    let body: CreateOrderResponse = response
      .json()
      .await
      .map_err(|e| Self::gateway_error(&format!("create-order answered {} with an unreadable body", http_status), e))?;

    let checkout = body.into_checkout()?;
    info!("Gateway order created.");
    Ok(checkout)
  }

  #[instrument(name = "zapupi::query_status", skip_all, fields(reference = %reference))]
  async fn query_status(&self, reference: &GatewayReference) -> PaygateResult<Option<OrderEvent>> {
    let form = OrderStatusForm {
      token_key: &self.api_key,
      secret_key: &self.secret,
      order_id: reference.as_str(),
    };

    let response = self
      .http
      .post(format!("{}/order-status", self.base_url))
      .form(&form)
      .send()
      .await
      .map_err(|e| Self::gateway_error("order-status request failed", e))?;
    let body: OrderStatusResponse = response
      .json()
      .await
      .map_err(|e| Self::gateway_error("order-status answered with an unreadable body", e))?;

    if !body.status.eq_ignore_ascii_case("success") {
      warn!(status = %body.status, "Gateway status lookup was not successful.");
      return Ok(None);
    }
    let payment_status = body.data.and_then(|d| d.status).unwrap_or_default();
    Ok(event_for_status(&payment_status))
  }
}
