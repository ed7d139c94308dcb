use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::entities::order::{OrderStatus, PaymentMethod};

/// Standard JSON error body.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorResponse {
    /// HTTP status category (e.g. "Not Found", "Forbidden")
    pub error: String,
    /// Human-readable error description
    pub message: String,
    /// Additional machine-usable detail, e.g. the allowed transition
    /// set for a refused lifecycle change
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
    /// ISO 8601 timestamp when the error occurred
    pub timestamp: String,
}

#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error("Database error: {0}")]
    DatabaseError(#[from] sea_orm::error::DbErr),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Invalid operation: {0}")]
    InvalidOperation(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// Wrong role, unreachable target state, or terminal-state
    /// mutation. Persisted state is untouched.
    #[error("Transition from '{current}' refused")]
    ForbiddenTransition {
        current: OrderStatus,
        allowed: Vec<OrderStatus>,
    },

    /// Order total below the platform minimum for an online payment
    /// method. Recoverable: the buyer can switch to cash on delivery
    /// or add items; the method is never switched silently.
    #[error("Order total {total} is below the {minimum} minimum for {method} payments")]
    MinimumAmount {
        method: PaymentMethod,
        total: Decimal,
        minimum: Decimal,
    },

    #[error("Insufficient stock: {0}")]
    InsufficientStock(String),

    #[error("Payment failed: {0}")]
    PaymentFailed(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("External service error: {0}")]
    ExternalServiceError(String),

    #[error("Internal error: {0}")]
    InternalError(String),

    #[error("Other error: {0}")]
    Other(#[from] anyhow::Error),
}

impl From<validator::ValidationErrors> for ServiceError {
    fn from(err: validator::ValidationErrors) -> Self {
        ServiceError::ValidationError(err.to_string())
    }
}

impl ServiceError {
    /// Single source of truth for error-to-status mapping.
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::DatabaseError(_) | Self::InternalError(_) | Self::Other(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::ValidationError(_) | Self::InvalidInput(_) | Self::InvalidOperation(_) => {
                StatusCode::BAD_REQUEST
            }
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::Forbidden(_) | Self::ForbiddenTransition { .. } => StatusCode::FORBIDDEN,
            Self::MinimumAmount { .. } | Self::InsufficientStock(_) => {
                StatusCode::UNPROCESSABLE_ENTITY
            }
            Self::PaymentFailed(_) => StatusCode::PAYMENT_REQUIRED,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::ExternalServiceError(_) => StatusCode::BAD_GATEWAY,
        }
    }

    /// Message suitable for HTTP responses. Internal errors return a
    /// generic message instead of leaking implementation detail.
    pub fn response_message(&self) -> String {
        match self {
            Self::DatabaseError(_) => "Database error".to_string(),
            Self::InternalError(_) | Self::Other(_) => "Internal server error".to_string(),
            _ => self.to_string(),
        }
    }

    /// Extra caller-facing detail, where the variant carries some.
    pub fn response_details(&self) -> Option<String> {
        match self {
            Self::ForbiddenTransition { allowed, .. } => {
                if allowed.is_empty() {
                    Some("No transitions are permitted from a terminal status".to_string())
                } else {
                    let targets: Vec<String> = allowed.iter().map(ToString::to_string).collect();
                    Some(format!("Allowed transitions: {}", targets.join(", ")))
                }
            }
            Self::MinimumAmount { minimum, .. } => Some(format!(
                "Choose cash on delivery or increase the order to at least {minimum}"
            )),
            _ => None,
        }
    }
}

impl IntoResponse for ServiceError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = ErrorResponse {
            error: status.canonical_reason().unwrap_or("Error").to_string(),
            message: self.response_message(),
            details: self.response_details(),
            timestamp: chrono::Utc::now().to_rfc3339(),
        };
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn status_code_mapping() {
        assert_eq!(
            ServiceError::NotFound("x".into()).status_code(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            ServiceError::ValidationError("x".into()).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ServiceError::Unauthorized("x".into()).status_code(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            ServiceError::ForbiddenTransition {
                current: OrderStatus::Delivered,
                allowed: vec![],
            }
            .status_code(),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            ServiceError::MinimumAmount {
                method: PaymentMethod::Gcash,
                total: dec!(80),
                minimum: dec!(100),
            }
            .status_code(),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(
            ServiceError::InsufficientStock("x".into()).status_code(),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(
            ServiceError::PaymentFailed("x".into()).status_code(),
            StatusCode::PAYMENT_REQUIRED
        );
        assert_eq!(
            ServiceError::Conflict("x".into()).status_code(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            ServiceError::ExternalServiceError("x".into()).status_code(),
            StatusCode::BAD_GATEWAY
        );
    }

    #[test]
    fn internal_details_are_not_leaked() {
        assert_eq!(
            ServiceError::InternalError("secret path".into()).response_message(),
            "Internal server error"
        );
        assert_eq!(
            ServiceError::NotFound("Order missing".into()).response_message(),
            "Not found: Order missing"
        );
    }

    #[test]
    fn forbidden_transition_lists_allowed_targets() {
        let err = ServiceError::ForbiddenTransition {
            current: OrderStatus::Pending,
            allowed: vec![OrderStatus::Processing, OrderStatus::Cancelled],
        };
        assert_eq!(
            err.response_details().unwrap(),
            "Allowed transitions: processing, cancelled"
        );

        let terminal = ServiceError::ForbiddenTransition {
            current: OrderStatus::Delivered,
            allowed: vec![],
        };
        assert!(terminal
            .response_details()
            .unwrap()
            .contains("terminal"));
    }

    #[test]
    fn minimum_amount_offers_cod_fallback() {
        let err = ServiceError::MinimumAmount {
            method: PaymentMethod::Paypal,
            total: dec!(80),
            minimum: dec!(100),
        };
        assert!(err.to_string().contains("below the 100 minimum"));
        assert!(err.response_details().unwrap().contains("cash on delivery"));
    }
}
