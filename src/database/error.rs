use thiserror::Error;

use crate::payments::error::PaymentError;

#[derive(Debug, Error)]
pub enum DatabaseError {
    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: String },

    #[error("query failed: {message}")]
    Query { message: String },

    #[error("connection failed: {message}")]
    Connection { message: String },
}

impl DatabaseError {
    pub fn from_sqlx(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::Io(_) => {
                Self::Connection {
                    message: err.to_string(),
                }
            }
            other => Self::Query {
                message: other.to_string(),
            },
        }
    }
}

/// Repository failures surface to the payment layer as store errors.
impl From<DatabaseError> for PaymentError {
    fn from(err: DatabaseError) -> Self {
        PaymentError::StoreError {
            message: err.to_string(),
        }
    }
}
