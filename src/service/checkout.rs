use std::time::Duration;

use async_trait::async_trait;
use log::{error, info};
use serde::Deserialize;

use crate::errors::AppError;

const STRIPE_SESSIONS_URL: &str = "https://api.stripe.com/v1/checkout/sessions";

/// Hosted payment page provider. Returns the URL the visitor is sent to.
#[async_trait]
pub trait CheckoutGateway: Send + Sync {
    async fn create_session(&self, price_id: &str, origin: &str) -> Result<String, AppError>;
}

pub struct StripeCheckout {
    secret_key: String,
    client: reqwest::Client,
}

impl StripeCheckout {
    pub fn new(secret_key: String) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(15))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());
        Self { secret_key, client }
    }
}

#[derive(Deserialize)]
struct StripeSession {
    url: Option<String>,
}

#[async_trait]
impl CheckoutGateway for StripeCheckout {
    async fn create_session(&self, price_id: &str, origin: &str) -> Result<String, AppError> {
        let success_url = format!("{origin}/pricing/success");
        let cancel_url = format!("{origin}/pricing/cancel");
        let params = [
            ("payment_method_types[]", "card"),
            ("mode", "subscription"),
            ("line_items[0][price]", price_id),
            ("line_items[0][quantity]", "1"),
            ("success_url", success_url.as_str()),
            ("cancel_url", cancel_url.as_str()),
        ];
        let res = self
            .client
            .post(STRIPE_SESSIONS_URL)
            .basic_auth(&self.secret_key, None::<&str>)
            .form(&params)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| {
                error!("stripe checkout failed: {e}");
                AppError::Gateway("checkout session failed".to_string())
            })?;
        let session: StripeSession = res.json().await.map_err(|e| {
            error!("stripe returned an unreadable session: {e}");
            AppError::Gateway("checkout session failed".to_string())
        })?;
        let url = session
            .url
            .ok_or_else(|| AppError::Gateway("checkout session has no url".to_string()))?;
        info!("checkout session created for price {price_id}");
        Ok(url)
    }
}

/// Used when no secret key is configured.
pub struct DisabledCheckout;

#[async_trait]
impl CheckoutGateway for DisabledCheckout {
    async fn create_session(&self, _price_id: &str, _origin: &str) -> Result<String, AppError> {
        Err(AppError::Gateway("checkout is not configured".to_string()))
    }
}
