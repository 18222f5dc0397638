use crate::database::error::DatabaseError;
use crate::payments::error::{PaymentError, PaymentResult};
use crate::payments::gateways::{FlutterwaveConfig, PayFastConfig};
use crate::payments::types::GatewayTag;
use serde_json::Value as JsonValue;
use sqlx::{FromRow, PgPool};

#[derive(Debug, FromRow)]
struct GatewayConfigRow {
    id: i64,
    payload: JsonValue,
}

/// Reads gateway descriptors and their configuration blobs. The `payments`
/// table is reference data keyed by tag; `payment_payloads` carries the
/// per-gateway credential blob.
pub struct GatewayConfigRepository {
    pool: PgPool,
}

impl GatewayConfigRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn fetch(&self, tag: GatewayTag) -> Result<Option<GatewayConfigRow>, DatabaseError> {
        sqlx::query_as::<_, GatewayConfigRow>(
            "SELECT p.id, pp.payload
             FROM payments p
             JOIN payment_payloads pp ON pp.payment_id = p.id
             WHERE p.tag = $1",
        )
        .bind(tag.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(DatabaseError::from_sqlx)
    }

    pub async fn flutterwave(&self) -> PaymentResult<FlutterwaveConfig> {
        let row = self
            .fetch(GatewayTag::FlutterWave)
            .await?
            .ok_or_else(|| missing(GatewayTag::FlutterWave))?;
        let config = FlutterwaveConfig::from_value(row.id, &row.payload)?;
        config.validate()?;
        Ok(config)
    }

    pub async fn payfast(&self) -> PaymentResult<PayFastConfig> {
        let row = self
            .fetch(GatewayTag::PayFast)
            .await?
            .ok_or_else(|| missing(GatewayTag::PayFast))?;
        let config = PayFastConfig::from_value(row.id, &row.payload)?;
        config.validate()?;
        Ok(config)
    }
}

fn missing(tag: GatewayTag) -> PaymentError {
    PaymentError::ConfigurationMissing {
        gateway: tag.to_string(),
        detail: "no payment row or payload is stored for this tag".to_string(),
    }
}
