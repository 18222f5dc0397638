use crate::payments::error::{PaymentError, PaymentResult};
use crate::payments::gateway::PaymentGateway;
use crate::payments::gateways::{
    FlutterwaveConfig, FlutterwaveGateway, PayFastConfig, PayFastGateway,
};
use crate::payments::http::GatewayTransport;
use crate::payments::store::{DomainReader, ProcessStore, TransactionLedger};
use crate::payments::types::GatewayTag;
use std::sync::Arc;

#[derive(Debug, Clone)]
pub struct GatewayFactoryConfig {
    pub enabled_gateways: Vec<GatewayTag>,
    pub flutterwave: Option<FlutterwaveConfig>,
    pub payfast: Option<PayFastConfig>,
}

impl GatewayFactoryConfig {
    pub fn from_env() -> PaymentResult<Self> {
        use std::str::FromStr;

        let enabled_raw = std::env::var("ENABLED_PAYMENT_GATEWAYS")
            .unwrap_or_else(|_| "flutter_wave,pay_fast".to_string());
        let mut enabled_gateways = Vec::new();
        for part in enabled_raw.split(',') {
            let value = part.trim();
            if value.is_empty() {
                continue;
            }
            enabled_gateways.push(GatewayTag::from_str(value)?);
        }

        let flutterwave = if enabled_gateways.contains(&GatewayTag::FlutterWave) {
            Some(FlutterwaveConfig::from_env()?)
        } else {
            None
        };
        let payfast = if enabled_gateways.contains(&GatewayTag::PayFast) {
            Some(PayFastConfig::from_env()?)
        } else {
            None
        };

        Ok(Self {
            enabled_gateways,
            flutterwave,
            payfast,
        })
    }

    pub fn validate(&self) -> PaymentResult<()> {
        if let Some(config) = &self.flutterwave {
            config.validate()?;
        }
        if let Some(config) = &self.payfast {
            config.validate()?;
        }
        Ok(())
    }
}

/// Builds gateway adapters over a shared transport and shared stores.
pub struct GatewayFactory {
    config: GatewayFactoryConfig,
    transport: Arc<dyn GatewayTransport>,
    reader: Arc<dyn DomainReader>,
    store: Arc<dyn ProcessStore>,
    ledger: Arc<dyn TransactionLedger>,
}

impl GatewayFactory {
    pub fn new(
        config: GatewayFactoryConfig,
        transport: Arc<dyn GatewayTransport>,
        reader: Arc<dyn DomainReader>,
        store: Arc<dyn ProcessStore>,
        ledger: Arc<dyn TransactionLedger>,
    ) -> Self {
        Self {
            config,
            transport,
            reader,
            store,
            ledger,
        }
    }

    pub fn get_gateway(&self, tag: GatewayTag) -> PaymentResult<Box<dyn PaymentGateway>> {
        if !self.config.enabled_gateways.contains(&tag) {
            return Err(PaymentError::ValidationError {
                message: format!("gateway {} is disabled", tag),
                field: Some("gateway".to_string()),
            });
        }

        match tag {
            GatewayTag::FlutterWave => Ok(Box::new(self.flutterwave()?)),
            GatewayTag::PayFast => Ok(Box::new(self.pay_fast()?)),
            GatewayTag::Stripe => Err(PaymentError::ConfigurationMissing {
                gateway: tag.to_string(),
                detail: "no adapter is registered for this gateway".to_string(),
            }),
        }
    }

    /// Concrete PayFast adapter, for callers that need the split flow the
    /// `PaymentGateway` trait does not expose.
    pub fn pay_fast(&self) -> PaymentResult<PayFastGateway> {
        let config = self
            .config
            .payfast
            .clone()
            .ok_or_else(|| PaymentError::ConfigurationMissing {
                gateway: GatewayTag::PayFast.to_string(),
                detail: "gateway configuration is not loaded".to_string(),
            })?;
        Ok(PayFastGateway::new(
            config,
            self.transport.clone(),
            self.reader.clone(),
            self.store.clone(),
            self.ledger.clone(),
        ))
    }

    fn flutterwave(&self) -> PaymentResult<FlutterwaveGateway> {
        let config = self
            .config
            .flutterwave
            .clone()
            .ok_or_else(|| PaymentError::ConfigurationMissing {
                gateway: GatewayTag::FlutterWave.to_string(),
                detail: "gateway configuration is not loaded".to_string(),
            })?;
        Ok(FlutterwaveGateway::new(
            config,
            self.transport.clone(),
            self.reader.clone(),
            self.store.clone(),
        ))
    }

    pub fn list_available_gateways(&self) -> Vec<GatewayTag> {
        self.config.enabled_gateways.clone()
    }
}
