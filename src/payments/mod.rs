//! Payment orchestration: payload resolution, gateway adapters, request
//! signing and the idempotent payment-process store.

pub mod error;
pub mod factory;
pub mod gateway;
pub mod gateways;
pub mod http;
pub mod resolver;
pub mod signature;
pub mod store;
pub mod types;

pub use error::{PaymentError, PaymentResult};
pub use factory::{GatewayFactory, GatewayFactoryConfig};
pub use gateway::PaymentGateway;
pub use resolver::PayloadResolver;
pub use types::{GatewayTag, PaymentProcess, RequestContext, TargetKind};
