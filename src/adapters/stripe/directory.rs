//! Stripe payment directory adapter.
//!
//! Implements the `PaymentDirectory` port against the Stripe REST API:
//! customer retrieval (email resolution for events that only carry a
//! customer ID) and checkout line-item lookup (product allow-list check).
//!
//! # Security
//!
//! The API key is held in a `secrecy::SecretString` and only exposed for
//! the basic-auth header of each request.

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;

use crate::domain::entitlement::WebhookError;
use crate::ports::{CheckoutLineItem, PaymentDirectory};

/// Stripe API configuration.
#[derive(Clone)]
pub struct StripeConfig {
    /// Stripe secret API key (sk_live_... or sk_test_...).
    api_key: SecretString,

    /// Base URL for the Stripe API (default: https://api.stripe.com).
    api_base_url: String,
}

impl StripeConfig {
    /// Create a new Stripe configuration.
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: SecretString::new(api_key.into()),
            api_base_url: "https://api.stripe.com".to_string(),
        }
    }

    /// Set a custom API base URL (for testing).
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.api_base_url = url.into();
        self
    }
}

/// Stripe implementation of the PaymentDirectory port.
pub struct StripePaymentDirectory {
    config: StripeConfig,
    http_client: reqwest::Client,
}

impl StripePaymentDirectory {
    /// Create a new directory adapter with the given configuration.
    pub fn new(config: StripeConfig) -> Self {
        Self {
            config,
            http_client: reqwest::Client::new(),
        }
    }
}

/// Stripe Customer object (only the fields we read).
#[derive(Debug, Deserialize)]
struct StripeCustomer {
    email: Option<String>,

    #[serde(default)]
    deleted: bool,
}

/// Line-item list response from the checkout sessions API.
#[derive(Debug, Deserialize)]
struct LineItemList {
    #[serde(default)]
    data: Vec<LineItem>,
}

#[derive(Debug, Deserialize)]
struct LineItem {
    price: Option<LineItemPrice>,
}

#[derive(Debug, Deserialize)]
struct LineItemPrice {
    id: String,
    product: String,
}

#[async_trait]
impl PaymentDirectory for StripePaymentDirectory {
    async fn customer_email(&self, customer_id: &str) -> Result<Option<String>, WebhookError> {
        let url = format!("{}/v1/customers/{}", self.config.api_base_url, customer_id);

        let response = self
            .http_client
            .get(&url)
            .basic_auth(self.config.api_key.expose_secret(), Option::<&str>::None)
            .send()
            .await
            .map_err(|e| WebhookError::Provider(e.to_string()))?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }

        if !response.status().is_success() {
            let error_text = response.text().await.unwrap_or_default();
            tracing::error!(error = %error_text, "Stripe customer retrieval failed");
            return Err(WebhookError::Provider(format!(
                "Stripe API error: {}",
                error_text
            )));
        }

        let customer: StripeCustomer = response
            .json()
            .await
            .map_err(|e| WebhookError::Provider(format!("Invalid Stripe response: {}", e)))?;

        if customer.deleted {
            return Ok(None);
        }

        Ok(customer.email)
    }

    async fn checkout_line_item(
        &self,
        session_id: &str,
    ) -> Result<Option<CheckoutLineItem>, WebhookError> {
        let url = format!(
            "{}/v1/checkout/sessions/{}/line_items?limit=1",
            self.config.api_base_url, session_id
        );

        let response = self
            .http_client
            .get(&url)
            .basic_auth(self.config.api_key.expose_secret(), Option::<&str>::None)
            .send()
            .await
            .map_err(|e| WebhookError::Provider(e.to_string()))?;

        if !response.status().is_success() {
            let error_text = response.text().await.unwrap_or_default();
            tracing::error!(error = %error_text, "Stripe line-item lookup failed");
            return Err(WebhookError::Provider(format!(
                "Stripe API error: {}",
                error_text
            )));
        }

        let list: LineItemList = response
            .json()
            .await
            .map_err(|e| WebhookError::Provider(format!("Invalid Stripe response: {}", e)))?;

        Ok(list.data.into_iter().next().and_then(|item| {
            item.price.map(|price| CheckoutLineItem {
                product_id: price.product,
                price_id: Some(price.id),
            })
        }))
    }
}
