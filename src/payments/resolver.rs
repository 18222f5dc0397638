//! Payload resolution: maps a generic checkout payload onto exactly one
//! payable domain target and snapshots it into a "before" record.

use crate::payments::error::{PaymentError, PaymentResult};
use crate::payments::store::DomainReader;
use crate::payments::types::{ResolvedTarget, TargetKind};
use serde_json::Value as JsonValue;
use std::sync::Arc;
use tracing::debug;

/// Recognized model-reference keys, evaluated in order. Keys outside this
/// table are ignored; ambiguity is a count check over the matches.
pub const TARGET_RULES: &[(&str, TargetKind)] = &[
    ("order_id", TargetKind::Order),
    ("cart_id", TargetKind::Order),
    ("subscription_id", TargetKind::Subscription),
];

pub struct PayloadResolver {
    reader: Arc<dyn DomainReader>,
}

impl PayloadResolver {
    pub fn new(reader: Arc<dyn DomainReader>) -> Self {
        Self { reader }
    }

    /// Resolves the single recognized reference key in `payload` into its
    /// "before" record. Exactly one rule key must be present; for order
    /// targets the dependent order-detail rows are materialized before the
    /// record is returned.
    pub async fn resolve(&self, payload: &JsonValue) -> PaymentResult<(String, ResolvedTarget)> {
        let matches: Vec<(&str, TargetKind, i64)> = TARGET_RULES
            .iter()
            .filter_map(|(key, kind)| model_id(payload, key).map(|id| (*key, *kind, id)))
            .collect();

        let (key, kind, id) = match matches.as_slice() {
            [] => {
                return Err(PaymentError::InvalidPaymentTarget {
                    message: "no recognized model reference in payload".to_string(),
                })
            }
            [single] => *single,
            _ => {
                return Err(PaymentError::InvalidPaymentTarget {
                    message: format!(
                        "ambiguous model reference: {}",
                        matches
                            .iter()
                            .map(|(k, _, _)| *k)
                            .collect::<Vec<_>>()
                            .join(", ")
                    ),
                })
            }
        };

        let target = match kind {
            TargetKind::Order => {
                let order = if key == "cart_id" {
                    self.reader.find_order_for_cart(id).await?
                } else {
                    self.reader.find_order(id).await?
                }
                .ok_or_else(|| PaymentError::InvalidPaymentTarget {
                    message: format!("{} {} does not exist", key, id),
                })?;

                self.reader.prepare_order_details(order.id).await?;

                ResolvedTarget {
                    model_id: order.id,
                    kind: TargetKind::Order,
                    user_id: order.user_id,
                    total_price: order.total_price,
                    currency: order.currency,
                    extra: order.details,
                }
            }
            TargetKind::Subscription => {
                let subscription = self.reader.find_subscription(id).await?.ok_or_else(|| {
                    PaymentError::InvalidPaymentTarget {
                        message: format!("subscription {} does not exist", id),
                    }
                })?;
                ResolvedTarget {
                    model_id: subscription.id,
                    kind: TargetKind::Subscription,
                    user_id: None,
                    total_price: subscription.price,
                    currency: subscription.currency,
                    extra: JsonValue::Null,
                }
            }
        };

        debug!(key = key, model_id = target.model_id, model_type = %target.kind, "payment target resolved");
        Ok((key.to_string(), target))
    }
}

/// Reference ids arrive as JSON numbers or numeric strings.
fn model_id(payload: &JsonValue, key: &str) -> Option<i64> {
    match payload.get(key)? {
        JsonValue::Number(n) => n.as_i64(),
        JsonValue::String(s) => s.trim().parse::<i64>().ok(),
        _ => None,
    }
}
