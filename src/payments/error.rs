use thiserror::Error;

pub type PaymentResult<T> = Result<T, PaymentError>;

#[derive(Debug, Clone, Error)]
pub enum PaymentError {
    #[error("Invalid payment target: {message}")]
    InvalidPaymentTarget { message: String },

    #[error("Gateway rejected: gateway={gateway}, message={message}")]
    GatewayRejected { gateway: String, message: String },

    #[error("Gateway unreachable: {message}")]
    GatewayUnreachable { message: String },

    #[error("Configuration missing: gateway={gateway}, detail={detail}")]
    ConfigurationMissing { gateway: String, detail: String },

    #[error("Validation error: {message}")]
    ValidationError {
        message: String,
        field: Option<String>,
    },

    #[error("Store error: {message}")]
    StoreError { message: String },
}

impl PaymentError {
    pub fn is_retryable(&self) -> bool {
        match self {
            PaymentError::InvalidPaymentTarget { .. } => false,
            PaymentError::GatewayRejected { .. } => false,
            PaymentError::GatewayUnreachable { .. } => true,
            PaymentError::ConfigurationMissing { .. } => false,
            PaymentError::ValidationError { .. } => false,
            PaymentError::StoreError { .. } => false,
        }
    }

    pub fn http_status_code(&self) -> u16 {
        match self {
            PaymentError::InvalidPaymentTarget { .. } => 400,
            PaymentError::GatewayRejected { .. } => 502,
            PaymentError::GatewayUnreachable { .. } => 503,
            PaymentError::ConfigurationMissing { .. } => 503,
            PaymentError::ValidationError { .. } => 400,
            PaymentError::StoreError { .. } => 500,
        }
    }

    pub fn user_message(&self) -> String {
        match self {
            PaymentError::InvalidPaymentTarget { message } => message.clone(),
            PaymentError::GatewayRejected { message, .. } => message.clone(),
            PaymentError::GatewayUnreachable { .. } => {
                "Payment gateway is temporarily unavailable".to_string()
            }
            PaymentError::ConfigurationMissing { gateway, .. } => {
                format!("Payment gateway {} is not configured", gateway)
            }
            PaymentError::ValidationError { message, .. } => message.clone(),
            PaymentError::StoreError { .. } => "Payment record could not be saved".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_http_status_mapping_is_correct() {
        assert_eq!(
            PaymentError::InvalidPaymentTarget {
                message: "no target".to_string()
            }
            .http_status_code(),
            400
        );
        assert_eq!(
            PaymentError::GatewayRejected {
                gateway: "pay_fast".to_string(),
                message: "declined".to_string()
            }
            .http_status_code(),
            502
        );
        assert_eq!(
            PaymentError::GatewayUnreachable {
                message: "timeout".to_string()
            }
            .http_status_code(),
            503
        );
    }

    #[test]
    fn only_transport_failures_are_retryable() {
        assert!(PaymentError::GatewayUnreachable {
            message: "connection reset".to_string()
        }
        .is_retryable());
        assert!(!PaymentError::GatewayRejected {
            gateway: "flutter_wave".to_string(),
            message: "declined".to_string()
        }
        .is_retryable());
        assert!(!PaymentError::InvalidPaymentTarget {
            message: "ambiguous".to_string()
        }
        .is_retryable());
    }

    #[test]
    fn rejected_message_is_surfaced_to_user() {
        let err = PaymentError::GatewayRejected {
            gateway: "flutter_wave".to_string(),
            message: "Invalid currency".to_string(),
        };
        assert_eq!(err.user_message(), "Invalid currency");
    }
}
