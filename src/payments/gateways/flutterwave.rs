use crate::payments::error::{PaymentError, PaymentResult};
use crate::payments::gateway::PaymentGateway;
use crate::payments::http::GatewayTransport;
use crate::payments::resolver::PayloadResolver;
use crate::payments::store::{DomainReader, ProcessStore};
use crate::payments::types::{
    placeholder_email, GatewayTag, PaymentProcess, ProcessAttributes, ProcessKey, RequestContext,
    ResolvedTarget, ShopProfile, TargetKind,
};
use async_trait::async_trait;
use chrono::Utc;
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::Value as JsonValue;
use std::sync::Arc;
use tracing::info;

const PAYMENT_OPTIONS: &str = "card,account,ussd,mobilemoneyghana";

#[derive(Debug, Clone)]
pub struct FlutterwaveConfig {
    pub payment_id: i64,
    pub secret_key: String,
    pub title: String,
    pub description: String,
    pub logo: String,
    pub currency: Option<String>,
    pub base_url: String,
    pub timeout_secs: u64,
}

impl FlutterwaveConfig {
    pub fn from_env() -> PaymentResult<Self> {
        let secret_key = std::env::var("FLUTTERWAVE_SECRET_KEY").map_err(|_| {
            PaymentError::ConfigurationMissing {
                gateway: GatewayTag::FlutterWave.to_string(),
                detail: "FLUTTERWAVE_SECRET_KEY environment variable is required".to_string(),
            }
        })?;

        Ok(Self {
            payment_id: std::env::var("FLUTTERWAVE_PAYMENT_ID")
                .ok()
                .and_then(|v| v.parse::<i64>().ok())
                .unwrap_or(1),
            secret_key,
            title: std::env::var("FLUTTERWAVE_TITLE").unwrap_or_default(),
            description: std::env::var("FLUTTERWAVE_DESCRIPTION").unwrap_or_default(),
            logo: std::env::var("FLUTTERWAVE_LOGO").unwrap_or_default(),
            currency: std::env::var("FLUTTERWAVE_CURRENCY").ok(),
            base_url: std::env::var("FLUTTERWAVE_BASE_URL")
                .unwrap_or_else(|_| "https://api.flutterwave.com/v3".to_string()),
            timeout_secs: std::env::var("FLUTTERWAVE_TIMEOUT_SECS")
                .ok()
                .and_then(|v| v.parse::<u64>().ok())
                .unwrap_or(30),
        })
    }

    /// Hydrates the typed config from a stored gateway-configuration blob
    /// (the `payment_payloads` row for the FlutterWave descriptor).
    pub fn from_value(payment_id: i64, payload: &JsonValue) -> PaymentResult<Self> {
        let secret_key = payload
            .get("flw_sk")
            .and_then(|v| v.as_str())
            .filter(|v| !v.trim().is_empty())
            .ok_or_else(|| PaymentError::ConfigurationMissing {
                gateway: GatewayTag::FlutterWave.to_string(),
                detail: "flw_sk is required in the stored payload".to_string(),
            })?
            .to_string();

        let text = |key: &str| {
            payload
                .get(key)
                .and_then(|v| v.as_str())
                .unwrap_or_default()
                .to_string()
        };

        Ok(Self {
            payment_id,
            secret_key,
            title: text("title"),
            description: text("description"),
            logo: text("logo"),
            currency: payload
                .get("currency")
                .and_then(|v| v.as_str())
                .map(|v| v.to_string()),
            base_url: "https://api.flutterwave.com/v3".to_string(),
            timeout_secs: 30,
        })
    }

    pub fn validate(&self) -> PaymentResult<()> {
        if self.secret_key.trim().is_empty() {
            return Err(PaymentError::ConfigurationMissing {
                gateway: GatewayTag::FlutterWave.to_string(),
                detail: "secret key is empty".to_string(),
            });
        }
        if !self.base_url.starts_with("https://") {
            return Err(PaymentError::ValidationError {
                message: "flutterwave base url must use https".to_string(),
                field: Some("base_url".to_string()),
            });
        }
        Ok(())
    }
}

pub struct FlutterwaveGateway {
    config: FlutterwaveConfig,
    transport: Arc<dyn GatewayTransport>,
    reader: Arc<dyn DomainReader>,
    resolver: PayloadResolver,
    store: Arc<dyn ProcessStore>,
}

impl FlutterwaveGateway {
    pub fn new(
        config: FlutterwaveConfig,
        transport: Arc<dyn GatewayTransport>,
        reader: Arc<dyn DomainReader>,
        store: Arc<dyn ProcessStore>,
    ) -> Self {
        let resolver = PayloadResolver::new(reader.clone());
        Self {
            config,
            transport,
            reader,
            resolver,
            store,
        }
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.config.base_url, path)
    }

    fn customer(&self, ctx: &RequestContext) -> (String, String) {
        match &ctx.user {
            Some(user) => (
                format!("{} {}", user.firstname, user.lastname),
                user.email.clone().unwrap_or_else(placeholder_email),
            ),
            None => ("firstname lastname".to_string(), placeholder_email()),
        }
    }

    /// Gateway request body for an order checkout. Amount is in minor units:
    /// total price scaled by 100 and rounded to two decimals.
    fn build_order_request(
        &self,
        key: &str,
        before: &ResolvedTarget,
        trx_ref: &str,
        amount: Decimal,
        ctx: &RequestContext,
    ) -> JsonValue {
        let (name, email) = self.customer(ctx);
        serde_json::json!({
            "tx_ref": trx_ref,
            "amount": amount,
            "currency": before.currency.to_uppercase(),
            "payment_options": PAYMENT_OPTIONS,
            "redirect_url": format!(
                "{}/order-stripe-success?{}={}",
                ctx.host_base_url, key, before.model_id
            ),
            "customer": {
                "name": name,
                "email": email,
            },
            "customizations": {
                "title": self.config.title,
                "description": self.config.description,
                "logo": self.config.logo,
            }
        })
    }

    async fn submit(&self, request: &JsonValue) -> PaymentResult<FlutterwaveEnvelope> {
        let body = self
            .transport
            .post_json(
                &self.endpoint("/payments"),
                Some(&self.config.secret_key),
                request,
            )
            .await?;
        let envelope: FlutterwaveEnvelope =
            serde_json::from_value(body).map_err(|e| PaymentError::GatewayRejected {
                gateway: GatewayTag::FlutterWave.to_string(),
                message: format!("malformed gateway response: {}", e),
            })?;

        if envelope.status == "error" {
            return Err(PaymentError::GatewayRejected {
                gateway: GatewayTag::FlutterWave.to_string(),
                message: envelope
                    .message
                    .unwrap_or_else(|| "payment initiation rejected".to_string()),
            });
        }
        Ok(envelope)
    }

    fn payment_link(envelope: &FlutterwaveEnvelope) -> PaymentResult<String> {
        envelope
            .data
            .as_ref()
            .and_then(|data| data.get("link"))
            .and_then(|link| link.as_str())
            .map(|link| link.to_string())
            .ok_or_else(|| PaymentError::GatewayRejected {
                gateway: GatewayTag::FlutterWave.to_string(),
                message: "missing payment link in gateway response".to_string(),
            })
    }
}

#[async_trait]
impl PaymentGateway for FlutterwaveGateway {
    async fn initiate_order_payment(
        &self,
        payload: &JsonValue,
        ctx: &RequestContext,
    ) -> PaymentResult<PaymentProcess> {
        let (key, before) = self.resolver.resolve(payload).await?;
        let trx_ref = format!("{}-{}", before.model_id, Utc::now().timestamp());
        let amount = (before.total_price * Decimal::from(100)).round_dp(2);

        let request = self.build_order_request(&key, &before, &trx_ref, amount, ctx);
        let envelope = self.submit(&request).await?;
        let link = Self::payment_link(&envelope)?;

        info!(tx_ref = %trx_ref, model_id = before.model_id, "flutterwave order payment initiated");

        self.store
            .upsert_process(
                ProcessKey {
                    user_id: ctx.user_id(),
                    model_id: before.model_id,
                    model_type: before.kind,
                },
                ProcessAttributes {
                    id: trx_ref,
                    data: serde_json::json!({
                        "url": link,
                        "price": amount,
                        "cart": request,
                        "payment_id": self.config.payment_id,
                    }),
                },
            )
            .await
    }

    async fn initiate_subscription_payment(
        &self,
        payload: &JsonValue,
        shop: &ShopProfile,
        currency: Option<&str>,
        ctx: &RequestContext,
    ) -> PaymentResult<PaymentProcess> {
        let subscription_id = payload
            .get("subscription_id")
            .and_then(|v| v.as_i64())
            .ok_or_else(|| PaymentError::InvalidPaymentTarget {
                message: "subscription_id is required".to_string(),
            })?;
        let subscription = self
            .reader
            .find_subscription(subscription_id)
            .await?
            .ok_or_else(|| PaymentError::InvalidPaymentTarget {
                message: format!("subscription {} does not exist", subscription_id),
            })?;

        let trx_ref = format!("{}-{}", subscription.id, Utc::now().timestamp());
        // Stored gateway currency wins over the caller-supplied one.
        let currency = self
            .config
            .currency
            .clone()
            .or_else(|| currency.map(|c| c.to_string()))
            .unwrap_or_else(|| subscription.currency.clone())
            .to_lowercase();

        let (name, email, phone) = match &shop.seller {
            Some(seller) => (
                format!("{} {}", seller.firstname, seller.lastname),
                seller.email.clone().unwrap_or_else(placeholder_email),
                seller.phone.clone(),
            ),
            None => ("firstname lastname".to_string(), placeholder_email(), None),
        };

        let request = serde_json::json!({
            "tx_ref": trx_ref,
            "amount": subscription.price,
            "currency": currency,
            "payment_options": PAYMENT_OPTIONS,
            "redirect_url": format!(
                "{}/subscription-stripe-success?subscription_id={}",
                ctx.host_base_url, subscription.id
            ),
            "customer": {
                "name": name,
                "phonenumber": phone,
                "email": email,
            },
            "customizations": {
                "title": self.config.title,
                "description": self.config.description,
                "logo": self.config.logo,
            }
        });

        let envelope = self.submit(&request).await?;
        let link = Self::payment_link(&envelope)?;

        info!(tx_ref = %trx_ref, shop_id = shop.id, "flutterwave subscription payment initiated");

        self.store
            .upsert_process(
                ProcessKey {
                    user_id: ctx.user_id(),
                    model_id: subscription.id,
                    model_type: TargetKind::Subscription,
                },
                ProcessAttributes {
                    id: trx_ref,
                    data: serde_json::json!({
                        "url": link,
                        "price": subscription.price.round_dp(2) * Decimal::from(100),
                        "shop_id": shop.id,
                        "subscription_id": subscription.id,
                        "payment_id": self.config.payment_id,
                    }),
                },
            )
            .await
    }

    fn tag(&self) -> GatewayTag {
        GatewayTag::FlutterWave
    }
}

#[derive(Debug, Deserialize)]
struct FlutterwaveEnvelope {
    #[serde(default)]
    status: String,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    data: Option<JsonValue>,
}
