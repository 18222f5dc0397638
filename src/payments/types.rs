use crate::payments::error::PaymentError;
use chrono::{DateTime, Utc};
use rand::distributions::Alphanumeric;
use rand::Rng;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::str::FromStr;

/// Gateway descriptor tags. `Stripe` is carried as reference data only;
/// no adapter is wired for it.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum GatewayTag {
    FlutterWave,
    PayFast,
    Stripe,
}

impl GatewayTag {
    pub fn as_str(&self) -> &'static str {
        match self {
            GatewayTag::FlutterWave => "flutter_wave",
            GatewayTag::PayFast => "pay_fast",
            GatewayTag::Stripe => "stripe",
        }
    }
}

impl std::fmt::Display for GatewayTag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for GatewayTag {
    type Err = PaymentError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_lowercase().as_str() {
            "flutter_wave" | "flutterwave" => Ok(GatewayTag::FlutterWave),
            "pay_fast" | "payfast" => Ok(GatewayTag::PayFast),
            "stripe" => Ok(GatewayTag::Stripe),
            _ => Err(PaymentError::ValidationError {
                message: format!("unsupported gateway tag: {}", value),
                field: Some("gateway".to_string()),
            }),
        }
    }
}

/// Closed enumeration of payable domain targets, stored in the
/// `model_type` column as its snake_case tag.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum TargetKind {
    Order,
    Subscription,
}

impl TargetKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TargetKind::Order => "order",
            TargetKind::Subscription => "subscription",
        }
    }

    /// Human-readable label used in ledger notes ("Order", "Subscription").
    pub fn label(&self) -> &'static str {
        match self {
            TargetKind::Order => "Order",
            TargetKind::Subscription => "Subscription",
        }
    }
}

impl std::fmt::Display for TargetKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for TargetKind {
    type Err = PaymentError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_lowercase().as_str() {
            "order" => Ok(TargetKind::Order),
            "subscription" => Ok(TargetKind::Subscription),
            _ => Err(PaymentError::ValidationError {
                message: format!("unknown model type: {}", value),
                field: Some("model_type".to_string()),
            }),
        }
    }
}

/// Authenticated caller snapshot, injected per call instead of read from an
/// ambient request context.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserContext {
    pub id: i64,
    pub firstname: String,
    pub lastname: String,
    pub email: Option<String>,
    pub phone: Option<String>,
}

/// Per-call request context: callback host and the (possibly anonymous)
/// current user.
#[derive(Debug, Clone)]
pub struct RequestContext {
    pub host_base_url: String,
    pub user: Option<UserContext>,
}

impl RequestContext {
    pub fn user_id(&self) -> Option<i64> {
        self.user.as_ref().map(|u| u.id)
    }
}

/// Placeholder for unauthenticated checkouts; the gateway still requires
/// a syntactically valid address.
pub fn placeholder_email() -> String {
    let local: String = rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(16)
        .map(char::from)
        .collect();
    format!("{}@gmail.com", local)
}

/// Order snapshot consumed from the domain read API.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderSummary {
    pub id: i64,
    pub user_id: Option<i64>,
    pub total_price: Decimal,
    pub currency: String,
    #[serde(default)]
    pub details: JsonValue,
}

/// Subscription snapshot consumed from the domain read API.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubscriptionPlan {
    pub id: i64,
    pub price: Decimal,
    pub currency: String,
}

/// Shop snapshot; its seller is the customer identity for subscription
/// checkouts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShopProfile {
    pub id: i64,
    pub seller: Option<UserContext>,
}

/// The resolved "before" record: the domain snapshot a gateway request is
/// built from.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResolvedTarget {
    pub model_id: i64,
    pub kind: TargetKind,
    pub user_id: Option<i64>,
    pub total_price: Decimal,
    pub currency: String,
    #[serde(default)]
    pub extra: JsonValue,
}

impl ResolvedTarget {
    /// Flat JSON form merged into the stored process payload.
    pub fn to_json(&self) -> JsonValue {
        serde_json::json!({
            "model_id": self.model_id,
            "model_type": self.kind.as_str(),
            "total_price": self.total_price,
            "currency": self.currency,
            "items": self.extra,
        })
    }
}

/// Upsert key for a payment process: at most one live row per tuple.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ProcessKey {
    pub user_id: Option<i64>,
    pub model_id: i64,
    pub model_type: TargetKind,
}

/// Attributes written on upsert: the external transaction id and the opaque
/// gateway payload.
#[derive(Debug, Clone)]
pub struct ProcessAttributes {
    pub id: String,
    pub data: JsonValue,
}

/// Pending transaction record bridging an initiated gateway request and its
/// eventual webhook confirmation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentProcess {
    pub id: String,
    pub user_id: Option<i64>,
    pub model_id: i64,
    pub model_type: TargetKind,
    pub data: JsonValue,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TransactionStatus {
    Progress,
    Paid,
    Canceled,
    Rejected,
}

impl TransactionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionStatus::Progress => "progress",
            TransactionStatus::Paid => "paid",
            TransactionStatus::Canceled => "canceled",
            TransactionStatus::Rejected => "rejected",
        }
    }
}

impl std::fmt::Display for TransactionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for TransactionStatus {
    type Err = PaymentError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_lowercase().as_str() {
            "progress" => Ok(TransactionStatus::Progress),
            "paid" => Ok(TransactionStatus::Paid),
            "canceled" => Ok(TransactionStatus::Canceled),
            "rejected" => Ok(TransactionStatus::Rejected),
            _ => Err(PaymentError::ValidationError {
                message: format!("unknown transaction status: {}", value),
                field: Some("status".to_string()),
            }),
        }
    }
}

/// Financial ledger entry. Split payments form a parent/children tree via
/// `parent_id`; a child never becomes a parent of its own ancestor.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerTransaction {
    pub id: i64,
    pub order_id: i64,
    pub user_id: Option<i64>,
    pub payment_id: i64,
    pub price: Decimal,
    pub status: TransactionStatus,
    pub status_description: Option<String>,
    pub note: Option<String>,
    pub perform_time: Option<DateTime<Utc>>,
    pub parent_id: Option<i64>,
    pub created_at: DateTime<Utc>,
}

/// Insert payload for a new ledger entry.
#[derive(Debug, Clone)]
pub struct NewLedgerEntry {
    pub order_id: i64,
    pub user_id: Option<i64>,
    pub payment_id: i64,
    pub price: Decimal,
    pub status: TransactionStatus,
    pub status_description: Option<String>,
    pub note: Option<String>,
    pub perform_time: Option<DateTime<Utc>>,
    pub parent_id: Option<i64>,
}
