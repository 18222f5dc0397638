//! Integration tests for the payment layer's public surface
//!
//! Tests cover:
//! - Payload resolution against a fake domain
//! - Gateway tag and target kind parsing
//! - Factory gating of disabled/unregistered gateways
//! - Error classification (retryability, HTTP mapping)

use async_trait::async_trait;
use marketplace_payments::payments::error::{PaymentError, PaymentResult};
use marketplace_payments::payments::factory::{GatewayFactory, GatewayFactoryConfig};
use marketplace_payments::payments::gateways::{FlutterwaveConfig, PayFastConfig};
use marketplace_payments::payments::http::GatewayTransport;
use marketplace_payments::payments::resolver::PayloadResolver;
use marketplace_payments::payments::store::{
    DomainReader, ProcessStore, TransactionLedger,
};
use marketplace_payments::payments::types::{
    GatewayTag, LedgerTransaction, NewLedgerEntry, OrderSummary, PaymentProcess,
    ProcessAttributes, ProcessKey, SubscriptionPlan, TargetKind,
};
use rust_decimal::Decimal;
use serde_json::{json, Value as JsonValue};
use std::str::FromStr;
use std::sync::Arc;

struct FakeDomain;

#[async_trait]
impl DomainReader for FakeDomain {
    async fn find_order(&self, id: i64) -> PaymentResult<Option<OrderSummary>> {
        if id != 42 {
            return Ok(None);
        }
        Ok(Some(OrderSummary {
            id: 42,
            user_id: Some(7),
            total_price: Decimal::from(250),
            currency: "zar".to_string(),
            details: json!([]),
        }))
    }

    async fn find_order_for_cart(&self, cart_id: i64) -> PaymentResult<Option<OrderSummary>> {
        if cart_id == 9 {
            self.find_order(42).await
        } else {
            Ok(None)
        }
    }

    async fn find_subscription(&self, id: i64) -> PaymentResult<Option<SubscriptionPlan>> {
        if id != 3 {
            return Ok(None);
        }
        Ok(Some(SubscriptionPlan {
            id: 3,
            price: Decimal::from(49),
            currency: "usd".to_string(),
        }))
    }

    async fn prepare_order_details(&self, _order_id: i64) -> PaymentResult<()> {
        Ok(())
    }
}

#[tokio::test]
async fn resolver_maps_order_reference_to_before_record() {
    let resolver = PayloadResolver::new(Arc::new(FakeDomain));
    let (key, before) = resolver
        .resolve(&json!({"order_id": 42}))
        .await
        .expect("resolution should succeed");
    assert_eq!(key, "order_id");
    assert_eq!(before.model_id, 42);
    assert_eq!(before.kind, TargetKind::Order);
    assert_eq!(before.total_price, Decimal::from(250));
}

#[tokio::test]
async fn resolver_follows_cart_reference_to_its_order() {
    let resolver = PayloadResolver::new(Arc::new(FakeDomain));
    let (key, before) = resolver
        .resolve(&json!({"cart_id": 9}))
        .await
        .expect("resolution should succeed");
    assert_eq!(key, "cart_id");
    assert_eq!(before.model_id, 42);
}

#[tokio::test]
async fn resolver_rejects_empty_and_ambiguous_payloads() {
    let resolver = PayloadResolver::new(Arc::new(FakeDomain));

    let err = resolver
        .resolve(&json!({"note": "no reference"}))
        .await
        .expect_err("empty payload should fail");
    assert!(matches!(err, PaymentError::InvalidPaymentTarget { .. }));

    let err = resolver
        .resolve(&json!({"order_id": 42, "subscription_id": 3}))
        .await
        .expect_err("ambiguous payload should fail");
    assert!(matches!(err, PaymentError::InvalidPaymentTarget { .. }));
}

#[tokio::test]
async fn resolver_rejects_missing_domain_records() {
    let resolver = PayloadResolver::new(Arc::new(FakeDomain));
    let err = resolver
        .resolve(&json!({"order_id": 404}))
        .await
        .expect_err("unknown order should fail");
    assert!(matches!(err, PaymentError::InvalidPaymentTarget { .. }));
}

#[test]
fn gateway_tags_round_trip_through_strings() {
    for tag in [GatewayTag::FlutterWave, GatewayTag::PayFast, GatewayTag::Stripe] {
        assert_eq!(GatewayTag::from_str(tag.as_str()).unwrap(), tag);
    }
    assert_eq!(TargetKind::from_str("order").unwrap(), TargetKind::Order);
    assert!(TargetKind::from_str("coupon").is_err());
}

#[test]
fn error_classification_matches_transport_semantics() {
    let unreachable = PaymentError::GatewayUnreachable {
        message: "connect timeout".to_string(),
    };
    assert!(unreachable.is_retryable());
    assert_eq!(unreachable.http_status_code(), 503);

    let rejected = PaymentError::GatewayRejected {
        gateway: "pay_fast".to_string(),
        message: "declined".to_string(),
    };
    assert!(!rejected.is_retryable());
    assert_eq!(rejected.http_status_code(), 502);

    let invalid = PaymentError::InvalidPaymentTarget {
        message: "no recognized model reference".to_string(),
    };
    assert!(!invalid.is_retryable());
    assert_eq!(invalid.http_status_code(), 400);
}

#[test]
fn gateway_configs_validate_their_required_fields() {
    let flutterwave = FlutterwaveConfig::from_value(1, &json!({"flw_sk": "FLWSECK-x"}))
        .expect("payload should hydrate");
    assert!(flutterwave.validate().is_ok());
    assert!(FlutterwaveConfig::from_value(1, &json!({"title": "Shop"})).is_err());

    let payfast = PayFastConfig::from_value(
        2,
        &json!({"merchant_id": "10000100", "merchant_key": "46f0cd694581a", "sandbox": true}),
    )
    .expect("payload should hydrate");
    assert!(payfast.validate().is_ok());

    let production_without_merchant =
        PayFastConfig::from_value(2, &json!({"sandbox": false})).expect("payload should hydrate");
    assert!(production_without_merchant.validate().is_err());
}

struct NoopTransport;

#[async_trait]
impl GatewayTransport for NoopTransport {
    async fn post_json(
        &self,
        _url: &str,
        _bearer_token: Option<&str>,
        _body: &JsonValue,
    ) -> PaymentResult<JsonValue> {
        Err(PaymentError::GatewayUnreachable {
            message: "no transport in this test".to_string(),
        })
    }

    async fn post_form(
        &self,
        _url: &str,
        _fields: &[(String, String)],
    ) -> PaymentResult<JsonValue> {
        Err(PaymentError::GatewayUnreachable {
            message: "no transport in this test".to_string(),
        })
    }
}

struct NoopStore;

#[async_trait]
impl ProcessStore for NoopStore {
    async fn upsert_process(
        &self,
        _key: ProcessKey,
        _attributes: ProcessAttributes,
    ) -> PaymentResult<PaymentProcess> {
        Err(PaymentError::StoreError {
            message: "no store in this test".to_string(),
        })
    }
}

struct NoopLedger;

#[async_trait]
impl TransactionLedger for NoopLedger {
    async fn split_parent(
        &self,
        _order_id: i64,
        _user_id: Option<i64>,
        _payment_id: i64,
        _price: Decimal,
    ) -> PaymentResult<LedgerTransaction> {
        Err(PaymentError::StoreError {
            message: "no ledger in this test".to_string(),
        })
    }

    async fn create_child(&self, _entry: NewLedgerEntry) -> PaymentResult<LedgerTransaction> {
        Err(PaymentError::StoreError {
            message: "no ledger in this test".to_string(),
        })
    }
}

fn factory(config: GatewayFactoryConfig) -> GatewayFactory {
    GatewayFactory::new(
        config,
        Arc::new(NoopTransport),
        Arc::new(FakeDomain),
        Arc::new(NoopStore),
        Arc::new(NoopLedger),
    )
}

#[test]
fn factory_rejects_disabled_and_unregistered_gateways() {
    let factory = factory(GatewayFactoryConfig {
        enabled_gateways: vec![GatewayTag::PayFast, GatewayTag::Stripe],
        flutterwave: None,
        payfast: Some(PayFastConfig {
            payment_id: 2,
            merchant_id: Some(10000100),
            merchant_key: Some("46f0cd694581a".to_string()),
            pass_phrase: None,
            sandbox: true,
            timeout_secs: 5,
        }),
    });

    assert!(matches!(
        factory.get_gateway(GatewayTag::FlutterWave),
        Err(PaymentError::ValidationError { .. })
    ));
    assert!(matches!(
        factory.get_gateway(GatewayTag::Stripe),
        Err(PaymentError::ConfigurationMissing { .. })
    ));
    let payfast = factory
        .get_gateway(GatewayTag::PayFast)
        .expect("enabled gateway should build");
    assert_eq!(payfast.tag(), GatewayTag::PayFast);
}
