//! Actor identity for authority checks.
//!
//! Session handling and credential verification are an upstream
//! collaborator's job (API gateway); requests arrive here already
//! authenticated, carrying `x-user-id` and `x-user-role` headers. Every
//! lifecycle and payment operation takes the [`ActorContext`]
//! explicitly rather than reading ambient user state.

use axum::{async_trait, extract::FromRequestParts, http::request::Parts};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::errors::ServiceError;

pub const USER_ID_HEADER: &str = "x-user-id";
pub const USER_ROLE_HEADER: &str = "x-user-role";

/// Marketplace role. Admins moderate; they have no transition
/// authority over orders.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
    ToSchema,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum Role {
    Buyer,
    Seller,
    Admin,
}

/// Who is performing an operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActorContext {
    pub user_id: Uuid,
    pub role: Role,
}

impl ActorContext {
    pub fn new(user_id: Uuid, role: Role) -> Self {
        Self { user_id, role }
    }

    pub fn buyer(user_id: Uuid) -> Self {
        Self::new(user_id, Role::Buyer)
    }

    pub fn seller(user_id: Uuid) -> Self {
        Self::new(user_id, Role::Seller)
    }

    pub fn admin(user_id: Uuid) -> Self {
        Self::new(user_id, Role::Admin)
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for ActorContext
where
    S: Send + Sync,
{
    type Rejection = ServiceError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let user_id = parts
            .headers
            .get(USER_ID_HEADER)
            .and_then(|value| value.to_str().ok())
            .ok_or_else(|| ServiceError::Unauthorized("Missing x-user-id header".to_string()))?
            .parse::<Uuid>()
            .map_err(|_| ServiceError::Unauthorized("x-user-id is not a valid UUID".to_string()))?;

        let role = parts
            .headers
            .get(USER_ROLE_HEADER)
            .and_then(|value| value.to_str().ok())
            .ok_or_else(|| ServiceError::Unauthorized("Missing x-user-role header".to_string()))?
            .parse::<Role>()
            .map_err(|_| {
                ServiceError::Unauthorized(
                    "x-user-role must be one of buyer, seller, admin".to_string(),
                )
            })?;

        Ok(ActorContext { user_id, role })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_parses_case_insensitively() {
        assert_eq!("buyer".parse::<Role>().unwrap(), Role::Buyer);
        assert_eq!("Seller".parse::<Role>().unwrap(), Role::Seller);
        assert_eq!("ADMIN".parse::<Role>().unwrap(), Role::Admin);
        assert!("superuser".parse::<Role>().is_err());
    }

    #[test]
    fn role_displays_lowercase() {
        assert_eq!(Role::Seller.to_string(), "seller");
    }
}
