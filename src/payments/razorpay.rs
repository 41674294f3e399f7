use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::{
    config::RazorpayConfig,
    error::{AppError, Result},
    payments::{GatewayOrder, PaymentGateway},
};

const ORDERS_URL: &str = "https://api.razorpay.com/v1/orders";

/// Razorpay orders API client. One instance is built at startup and shared;
/// `reqwest::Client` pools connections internally.
pub struct RazorpayClient {
    http: reqwest::Client,
    key_id: String,
    key_secret: String,
}

#[derive(Serialize)]
struct CreateOrderBody<'a> {
    amount: i64,
    currency: &'a str,
    receipt: &'a str,
}

#[derive(Deserialize)]
struct OrderResponse {
    id: String,
    amount: i64,
    currency: String,
}

#[derive(Deserialize)]
struct ErrorResponse {
    error: ErrorBody,
}

#[derive(Deserialize)]
struct ErrorBody {
    description: String,
}

impl RazorpayClient {
    pub fn new(config: &RazorpayConfig) -> Option<Self> {
        if !config.enabled {
            return None;
        }

        match (config.key_id.clone(), config.key_secret.clone()) {
            (Some(key_id), Some(key_secret)) => Some(Self {
                http: reqwest::Client::new(),
                key_id,
                key_secret,
            }),
            _ => {
                tracing::warn!("Razorpay enabled but missing key configuration");
                None
            }
        }
    }
}

#[async_trait]
impl PaymentGateway for RazorpayClient {
    async fn create_order(
        &self,
        amount_minor: i64,
        currency: &str,
        receipt_id: &str,
    ) -> Result<GatewayOrder> {
        let body = CreateOrderBody {
            amount: amount_minor,
            currency,
            receipt: receipt_id,
        };

        let response = self
            .http
            .post(ORDERS_URL)
            .basic_auth(&self.key_id, Some(&self.key_secret))
            .json(&body)
            .send()
            .await
            .map_err(|e| AppError::Gateway(format!("Razorpay request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let description = response
                .json::<ErrorResponse>()
                .await
                .map(|e| e.error.description)
                .unwrap_or_else(|_| "unknown error".to_string());
            return Err(AppError::Gateway(format!(
                "Razorpay rejected order ({}): {}",
                status, description
            )));
        }

        let order: OrderResponse = response
            .json()
            .await
            .map_err(|e| AppError::Gateway(format!("Invalid Razorpay response: {}", e)))?;

        Ok(GatewayOrder {
            order_id: order.id,
            amount_minor: order.amount,
            currency: order.currency,
        })
    }
}
