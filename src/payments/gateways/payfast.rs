use crate::payments::error::{PaymentError, PaymentResult};
use crate::payments::gateway::PaymentGateway;
use crate::payments::http::GatewayTransport;
use crate::payments::resolver::PayloadResolver;
use crate::payments::signature::generate_signature;
use crate::payments::store::{DomainReader, ProcessStore, TransactionLedger};
use crate::payments::types::{
    placeholder_email, GatewayTag, NewLedgerEntry, PaymentProcess, ProcessAttributes, ProcessKey,
    RequestContext, ResolvedTarget, ShopProfile, TargetKind, TransactionStatus,
};
use async_trait::async_trait;
use chrono::Utc;
use rust_decimal::Decimal;
use serde_json::Value as JsonValue;
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

const PRODUCTION_HOST: &str = "www.payfast.co.za";
const SANDBOX_HOST: &str = "sandbox.payfast.co.za";

/// PayFast's published sandbox merchant account.
const SANDBOX_MERCHANT_ID: i64 = 10000100;
const SANDBOX_MERCHANT_KEY: &str = "46f0cd694581a";

#[derive(Debug, Clone)]
pub struct PayFastConfig {
    pub payment_id: i64,
    pub merchant_id: Option<i64>,
    pub merchant_key: Option<String>,
    pub pass_phrase: Option<String>,
    pub sandbox: bool,
    pub timeout_secs: u64,
}

impl PayFastConfig {
    pub fn from_env() -> PaymentResult<Self> {
        Ok(Self {
            payment_id: std::env::var("PAYFAST_PAYMENT_ID")
                .ok()
                .and_then(|v| v.parse::<i64>().ok())
                .unwrap_or(2),
            merchant_id: std::env::var("PAYFAST_MERCHANT_ID")
                .ok()
                .and_then(|v| v.parse::<i64>().ok()),
            merchant_key: std::env::var("PAYFAST_MERCHANT_KEY").ok(),
            pass_phrase: std::env::var("PAYFAST_PASS_PHRASE").ok(),
            sandbox: std::env::var("PAYFAST_SANDBOX")
                .map(|v| v == "true" || v == "1")
                .unwrap_or(true),
            timeout_secs: std::env::var("PAYFAST_TIMEOUT_SECS")
                .ok()
                .and_then(|v| v.parse::<u64>().ok())
                .unwrap_or(30),
        })
    }

    /// Hydrates the typed config from a stored gateway-configuration blob.
    pub fn from_value(payment_id: i64, payload: &JsonValue) -> PaymentResult<Self> {
        let merchant_id = match payload.get("merchant_id") {
            Some(JsonValue::Number(n)) => n.as_i64(),
            Some(JsonValue::String(s)) => s.trim().parse::<i64>().ok(),
            _ => None,
        };
        Ok(Self {
            payment_id,
            merchant_id,
            merchant_key: payload
                .get("merchant_key")
                .and_then(|v| v.as_str())
                .map(|v| v.to_string()),
            pass_phrase: payload
                .get("pass_phrase")
                .and_then(|v| v.as_str())
                .map(|v| v.to_string()),
            sandbox: payload
                .get("sandbox")
                .and_then(|v| v.as_bool())
                .unwrap_or(true),
            timeout_secs: 30,
        })
    }

    pub fn validate(&self) -> PaymentResult<()> {
        if !self.sandbox && (self.merchant_id.is_none() || self.merchant_key.is_none()) {
            return Err(PaymentError::ConfigurationMissing {
                gateway: GatewayTag::PayFast.to_string(),
                detail: "merchant_id and merchant_key are required outside sandbox".to_string(),
            });
        }
        Ok(())
    }

    /// Merchant credentials for the order flows, which have no sandbox
    /// fallback.
    fn merchant(&self) -> PaymentResult<(i64, &str)> {
        match (self.merchant_id, self.merchant_key.as_deref()) {
            (Some(id), Some(key)) => Ok((id, key)),
            _ => Err(PaymentError::ConfigurationMissing {
                gateway: GatewayTag::PayFast.to_string(),
                detail: "merchant_id and merchant_key are not configured".to_string(),
            }),
        }
    }

    fn onsite_process_url(&self) -> String {
        let host = if self.sandbox {
            SANDBOX_HOST
        } else {
            PRODUCTION_HOST
        };
        format!("https://{}/onsite/process", host)
    }
}

/// "order_id" becomes "Order", "cart_id" becomes "Cart".
fn item_name_from_key(key: &str) -> String {
    let base = key.strip_suffix("_id").unwrap_or(key);
    let mut chars = base.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
        None => String::new(),
    }
}

/// PayFast expects plain decimal amounts without trailing zeros.
fn amount_str(amount: Decimal) -> String {
    amount.normalize().to_string()
}

fn is_mobile(payload: &JsonValue) -> bool {
    payload.get("type").and_then(|v| v.as_str()) == Some("mobile")
}

fn fields_to_json(fields: &[(String, String)]) -> JsonValue {
    let mut map = serde_json::Map::new();
    for (key, value) in fields {
        map.insert(key.clone(), JsonValue::String(value.clone()));
    }
    JsonValue::Object(map)
}

/// Stored process payload: base attributes, overlaid with the resolved
/// "before" snapshot, overlaid with the request echo or gateway response.
fn merged_data(base: JsonValue, before: &ResolvedTarget, tail: JsonValue) -> JsonValue {
    let mut map = match base {
        JsonValue::Object(map) => map,
        _ => serde_json::Map::new(),
    };
    if let JsonValue::Object(entries) = before.to_json() {
        map.extend(entries);
    }
    if let JsonValue::Object(entries) = tail {
        map.extend(entries);
    }
    JsonValue::Object(map)
}

struct Customer {
    name_first: String,
    name_last: String,
    email: String,
}

impl Customer {
    fn from_ctx(ctx: &RequestContext) -> Self {
        match &ctx.user {
            Some(user) => Self {
                name_first: user.firstname.clone(),
                name_last: user.lastname.clone(),
                email: user.email.clone().unwrap_or_else(placeholder_email),
            },
            None => Self {
                name_first: "First Name".to_string(),
                name_last: "Last Name".to_string(),
                email: placeholder_email(),
            },
        }
    }
}

pub struct PayFastGateway {
    config: PayFastConfig,
    transport: Arc<dyn GatewayTransport>,
    reader: Arc<dyn DomainReader>,
    resolver: PayloadResolver,
    store: Arc<dyn ProcessStore>,
    ledger: Arc<dyn TransactionLedger>,
}

impl PayFastGateway {
    pub fn new(
        config: PayFastConfig,
        transport: Arc<dyn GatewayTransport>,
        reader: Arc<dyn DomainReader>,
        store: Arc<dyn ProcessStore>,
        ledger: Arc<dyn TransactionLedger>,
    ) -> Self {
        let resolver = PayloadResolver::new(reader.clone());
        Self {
            config,
            transport,
            reader,
            resolver,
            store,
            ledger,
        }
    }

    fn notify_url(ctx: &RequestContext, payment_uuid: &Uuid) -> String {
        format!(
            "{}/api/v1/webhook/pay-fast/payment?payment_id={}",
            ctx.host_base_url, payment_uuid
        )
    }

    /// Onsite request body in gateway field order. `merchant` is omitted for
    /// the mobile channel, which signs and submits on the device.
    fn build_body(
        merchant: Option<(i64, &str)>,
        return_url: &str,
        notify_url: &str,
        amount: Decimal,
        item_name: &str,
        customer: &Customer,
    ) -> Vec<(String, String)> {
        let mut body = Vec::with_capacity(10);
        if let Some((merchant_id, merchant_key)) = merchant {
            body.push(("merchant_id".to_string(), merchant_id.to_string()));
            body.push(("merchant_key".to_string(), merchant_key.to_string()));
        }
        body.push(("return_url".to_string(), return_url.to_string()));
        body.push(("cancel_url".to_string(), return_url.to_string()));
        body.push(("notify_url".to_string(), notify_url.to_string()));
        body.push(("amount".to_string(), amount_str(amount)));
        body.push(("name_first".to_string(), customer.name_first.clone()));
        body.push(("name_last".to_string(), customer.name_last.clone()));
        body.push(("item_name".to_string(), item_name.to_string()));
        body.push(("email_address".to_string(), customer.email.clone()));
        body
    }

    fn sign(&self, body: &mut Vec<(String, String)>) -> String {
        let signature = generate_signature(body, self.config.pass_phrase.as_deref());
        body.push(("signature".to_string(), signature.clone()));
        signature
    }

    /// POSTs the signed body to the onsite-process endpoint and extracts the
    /// gateway-issued payment identifier.
    async fn generate_payment_identifier(
        &self,
        body: &[(String, String)],
    ) -> PaymentResult<JsonValue> {
        let response = self
            .transport
            .post_form(&self.config.onsite_process_url(), body)
            .await?;
        if response.get("uuid").and_then(|v| v.as_str()).is_none() {
            warn!(sandbox = self.config.sandbox, "payfast onsite process returned no identifier");
            return Err(PaymentError::GatewayRejected {
                gateway: GatewayTag::PayFast.to_string(),
                message: "missing payment identifier in gateway response".to_string(),
            });
        }
        Ok(response)
    }

    async fn upsert(
        &self,
        ctx: &RequestContext,
        before: &ResolvedTarget,
        id: String,
        data: JsonValue,
    ) -> PaymentResult<PaymentProcess> {
        self.store
            .upsert_process(
                ProcessKey {
                    user_id: ctx.user_id(),
                    model_id: before.model_id,
                    model_type: before.kind,
                },
                ProcessAttributes { id, data },
            )
            .await
    }

    /// Splits an order charge into `split` sequential sub-payments, one child
    /// ledger row and one onsite submission each. A failed submission aborts
    /// the remaining iterations; rows already written stay as they are.
    pub async fn split_transaction(
        &self,
        payload: &JsonValue,
        ctx: &RequestContext,
    ) -> PaymentResult<Vec<PaymentProcess>> {
        let (key, before) = self.resolver.resolve(payload).await?;
        let merchant = self.config.merchant()?;
        let label = before.kind.label();
        let return_url = format!(
            "{}/order-stripe-success?{}={}",
            ctx.host_base_url, key, before.model_id
        );
        let payment_uuid = Uuid::new_v4();
        let notify_url = Self::notify_url(ctx, &payment_uuid);
        let customer = Customer::from_ctx(ctx);
        // Absent means a single payment; a present but non-positive count is
        // a caller bug, not a request for one charge.
        let split = match payload.get("split") {
            None => 1,
            Some(value) => value.as_i64().filter(|n| *n >= 1).ok_or_else(|| {
                PaymentError::ValidationError {
                    message: "split must be a positive integer".to_string(),
                    field: Some("split".to_string()),
                }
            })?,
        };
        let mobile = is_mobile(payload);

        let mut total_price = before.total_price.round_dp(2);
        let parent = self
            .ledger
            .split_parent(
                before.model_id,
                before.user_id,
                self.config.payment_id,
                total_price,
            )
            .await?;

        info!(
            model_id = before.model_id,
            split,
            parent_id = parent.id,
            "payfast split payment initiated"
        );

        let mut result = Vec::new();
        for _ in 0..split {
            // Whole-rand amounts only; the remainder rides on the last split.
            total_price = total_price.ceil();

            self.ledger
                .create_child(NewLedgerEntry {
                    order_id: before.model_id,
                    user_id: before.user_id,
                    payment_id: self.config.payment_id,
                    price: total_price / Decimal::from(100),
                    status: TransactionStatus::Progress,
                    status_description: Some(format!(
                        "Transaction for {} #{} with split",
                        label, before.model_id
                    )),
                    note: Some(format!("Split payment for {} #{}", label, before.model_id)),
                    perform_time: Some(Utc::now()),
                    parent_id: Some(parent.id),
                })
                .await?;

            let mut body = Self::build_body(
                Some(merchant),
                &return_url,
                &notify_url,
                total_price,
                &format!("{}#{}", key, before.model_id),
                &customer,
            );
            let signature = self.sign(&mut body);

            if mobile {
                result.push(
                    self.upsert(
                        ctx,
                        &before,
                        payment_uuid.to_string(),
                        merged_data(
                            serde_json::json!({
                                "price": total_price,
                                "payment_id": self.config.payment_id,
                                "sandbox": self.config.sandbox,
                                "signature": signature,
                            }),
                            &before,
                            fields_to_json(&body),
                        ),
                    )
                    .await?,
                );
            }

            let response = self.generate_payment_identifier(&body).await?;

            result.push(
                self.upsert(
                    ctx,
                    &before,
                    payment_uuid.to_string(),
                    merged_data(
                        serde_json::json!({
                            "price": total_price,
                            "payment_id": self.config.payment_id,
                            "sandbox": self.config.sandbox,
                            "signature": signature,
                        }),
                        &before,
                        response,
                    ),
                )
                .await?,
            );
        }

        Ok(result)
    }
}

#[async_trait]
impl PaymentGateway for PayFastGateway {
    async fn initiate_order_payment(
        &self,
        payload: &JsonValue,
        ctx: &RequestContext,
    ) -> PaymentResult<PaymentProcess> {
        let (key, before) = self.resolver.resolve(payload).await?;
        let total_price = before.total_price.round_dp(2);
        let return_url = format!(
            "{}/order-stripe-success?{}={}",
            ctx.host_base_url, key, before.model_id
        );
        let payment_uuid = Uuid::new_v4();
        let notify_url = Self::notify_url(ctx, &payment_uuid);
        let customer = Customer::from_ctx(ctx);
        let item_name = item_name_from_key(&key);

        if is_mobile(payload) {
            // Mobile clients complete the onsite flow themselves; no merchant
            // credentials leave the server and no submission happens here.
            let body = Self::build_body(
                None,
                &return_url,
                &notify_url,
                total_price,
                &item_name,
                &customer,
            );
            return self
                .upsert(
                    ctx,
                    &before,
                    payment_uuid.to_string(),
                    merged_data(
                        serde_json::json!({
                            "price": total_price,
                            "payment_id": self.config.payment_id,
                            "sandbox": self.config.sandbox,
                        }),
                        &before,
                        fields_to_json(&body),
                    ),
                )
                .await;
        }

        let merchant = self.config.merchant()?;
        let mut body = Self::build_body(
            Some(merchant),
            &return_url,
            &notify_url,
            total_price,
            &item_name,
            &customer,
        );
        let signature = self.sign(&mut body);
        let response = self.generate_payment_identifier(&body).await?;

        info!(
            payment_uuid = %payment_uuid,
            model_id = before.model_id,
            "payfast order payment initiated"
        );

        self.upsert(
            ctx,
            &before,
            payment_uuid.to_string(),
            merged_data(
                serde_json::json!({
                    "price": total_price,
                    "payment_id": self.config.payment_id,
                    "sandbox": self.config.sandbox,
                    "signature": signature,
                }),
                &before,
                response,
            ),
        )
        .await
    }

    async fn initiate_subscription_payment(
        &self,
        payload: &JsonValue,
        shop: &ShopProfile,
        _currency: Option<&str>,
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

        let return_url = format!(
            "{}/subscription-pay-fast?subscription_id={}",
            ctx.host_base_url, subscription.id
        );
        let payment_uuid = Uuid::new_v4();
        let notify_url = Self::notify_url(ctx, &payment_uuid);
        let customer = Customer::from_ctx(ctx);
        let amount = subscription.price.ceil();

        // Subscriptions may run before the merchant account is configured;
        // fall back to the shared sandbox merchant.
        let merchant_id = self.config.merchant_id.unwrap_or(SANDBOX_MERCHANT_ID);
        let merchant_key = self
            .config
            .merchant_key
            .as_deref()
            .unwrap_or(SANDBOX_MERCHANT_KEY);

        let mut body = Self::build_body(
            Some((merchant_id, merchant_key)),
            &return_url,
            &notify_url,
            amount,
            &format!("Subscription#{}", subscription.id),
            &customer,
        );
        let signature = self.sign(&mut body);
        let response = self.generate_payment_identifier(&body).await?;

        info!(
            payment_uuid = %payment_uuid,
            subscription_id = subscription.id,
            shop_id = shop.id,
            "payfast subscription payment initiated"
        );

        let mut data = serde_json::json!({
            "shop_id": shop.id,
            "url": notify_url,
            "price": amount,
            "subscription_id": subscription.id,
            "payment_id": self.config.payment_id,
            "sandbox": self.config.sandbox,
            "signature": signature,
        });
        if let (JsonValue::Object(map), JsonValue::Object(tail)) = (&mut data, response) {
            map.extend(tail);
        }

        self.store
            .upsert_process(
                ProcessKey {
                    user_id: ctx.user_id(),
                    model_id: subscription.id,
                    model_type: TargetKind::Subscription,
                },
                ProcessAttributes {
                    id: payment_uuid.to_string(),
                    data,
                },
            )
            .await
    }

    fn tag(&self) -> GatewayTag {
        GatewayTag::PayFast
    }
}
