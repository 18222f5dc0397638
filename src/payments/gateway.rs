use crate::payments::error::PaymentResult;
use crate::payments::types::{GatewayTag, PaymentProcess, RequestContext, ShopProfile};
use async_trait::async_trait;
use serde_json::Value as JsonValue;

/// A payment gateway adapter. Each initiation call is a single synchronous
/// flow: resolve the target, build the gateway request, sign it where the
/// gateway requires, submit, and record the accepted response as a
/// `PaymentProcess`. Rejections surface as errors; there is no retry here.
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    async fn initiate_order_payment(
        &self,
        payload: &JsonValue,
        ctx: &RequestContext,
    ) -> PaymentResult<PaymentProcess>;

    async fn initiate_subscription_payment(
        &self,
        payload: &JsonValue,
        shop: &ShopProfile,
        currency: Option<&str>,
        ctx: &RequestContext,
    ) -> PaymentResult<PaymentProcess>;

    fn tag(&self) -> GatewayTag;
}
