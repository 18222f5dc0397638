//! Payment-processing layer for a marketplace backend: gateway adapters
//! (FlutterWave, PayFast), request signing, payload resolution, split
//! payments and the idempotent payment-process store the webhook layer
//! reconciles against.

pub mod config;
pub mod database;
pub mod logging;
pub mod payments;

pub use config::AppConfig;
pub use payments::{
    GatewayFactory, GatewayFactoryConfig, GatewayTag, PaymentError, PaymentGateway,
    PaymentProcess, PaymentResult, RequestContext, TargetKind,
};
